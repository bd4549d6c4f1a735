//! Property tests for for-each classification and loop shape.
//!
//! Run with more cases:
//!   PROPTEST_CASES=1000 cargo test --test lowering_property

use proptest::prelude::*;

use javelin::ast::build::*;
use javelin::ast::{Method, Stmt, TypeExpr};
use javelin::codegen::MethodCode;
use javelin::config::CompilerOptions;
use javelin::foreach::LoopKind;
use javelin::span::Spanned;
use javelin::typeck::{Type, TypeEnv};
use javelin::{LoweredMethod, lower_method};

const PRIMITIVES: [(&str, char); 8] = [
    ("int", 'i'),
    ("long", 'l'),
    ("float", 'f'),
    ("double", 'd'),
    ("byte", 'b'),
    ("boolean", 'b'),
    ("char", 'c'),
    ("short", 's'),
];

const ITERABLES: [&str; 5] = ["Iterable", "Collection", "List", "Set", "ArrayList"];

fn lower_preserving(m: &mut Method) -> LoweredMethod {
    let mut env = TypeEnv::new();
    env.add_function("test", vec![], Type::boolean());
    let options = CompilerOptions { preserve_unused_locals: true, ..CompilerOptions::default() };
    lower_method(m, &env, &options).unwrap()
}

fn nested_array(elem: &str, depth: usize) -> Spanned<TypeExpr> {
    (0..depth).fold(ty(elem), |t, _| array_of(t))
}

/// `{ T y = x; [break;] }`, or with the break guarded by a call.
fn body(elem: Spanned<TypeExpr>, exit: Exit) -> Spanned<Stmt> {
    let mut stmts = vec![local("y", elem, Some(name("x")))];
    match exit {
        Exit::None => {}
        Exit::Break => stmts.push(brk(None)),
        Exit::Return => stmts.push(ret(None)),
        Exit::Conditional => stmts.push(if_stmt(call("test", vec![]), brk(None), None)),
    }
    block(stmts)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Exit {
    None,
    Break,
    Return,
    Conditional,
}

impl Exit {
    fn always_leaves(self) -> bool {
        matches!(self, Exit::Break | Exit::Return)
    }
}

fn arb_exit() -> impl Strategy<Value = Exit> {
    prop_oneof![Just(Exit::None), Just(Exit::Break), Just(Exit::Return), Just(Exit::Conditional)]
}

fn first_loop_info(m: &Method) -> &javelin::foreach::ForeachInfo {
    match &m.body.node.stmts[0].node {
        Stmt::Foreach(node) => &node.info,
        other => panic!("expected a loop, got {other:?}"),
    }
}

/// Every branch lands on a placed label inside the method.
fn assert_targets_placed(code: &MethodCode) {
    for instr in &code.instructions {
        if let Some(label) = instr.target() {
            let at = code.label_position(label).unwrap();
            assert!(at <= code.instructions.len(), "{code}");
        }
    }
}

proptest! {
    #[test]
    fn arrays_load_with_component_opcode(
        (elem, prefix) in prop::sample::select(PRIMITIVES.to_vec()),
        depth in 0usize..3,
        exit in arb_exit(),
    ) {
        let component = nested_array(elem, depth);
        let mut m = method(
            "m",
            vec![param("xs", array_of(component.clone()))],
            vec![foreach_stmt_with(component.clone(), body(component, exit))],
        );
        let lowered = lower_preserving(&mut m);
        prop_assert!(!lowered.has_errors(), "{:#?}", lowered.diagnostics);

        let info = first_loop_info(&m);
        let is_array = matches!(info.classification.kind(), Some(LoopKind::Array { .. }));
        prop_assert!(is_array);
        prop_assert_eq!(info.continue_target, !exit.always_leaves());

        let code = lowered.code.unwrap();
        let load = if depth > 0 { "aaload".to_string() } else { format!("{prefix}aload") };
        prop_assert_eq!(code.count(&load), 1);
        prop_assert_eq!(code.count("arraylength"), 1);
        prop_assert_eq!(code.back_edges().len(), usize::from(!exit.always_leaves()));
        prop_assert_eq!(code.count("iinc"), usize::from(!exit.always_leaves()));
        assert_targets_placed(&code);
    }

    #[test]
    fn iterables_classify_by_instantiation(
        class in prop::sample::select(ITERABLES.to_vec()),
        parameterized in any::<bool>(),
        exit in arb_exit(),
    ) {
        let (collection, declared) = if parameterized {
            (generic(class, vec![ty("String")]), ty("String"))
        } else {
            (ty(class), ty("Object"))
        };
        let mut m = method(
            "m",
            vec![param("xs", collection)],
            vec![foreach_stmt_with(declared.clone(), body(declared, exit))],
        );
        let lowered = lower_preserving(&mut m);
        prop_assert!(!lowered.has_errors(), "{:#?}", lowered.diagnostics);

        let info = first_loop_info(&m);
        match info.classification.kind() {
            Some(LoopKind::GenericIterable { .. }) => prop_assert!(parameterized),
            Some(LoopKind::RawIterable { .. }) => prop_assert!(!parameterized),
            other => prop_assert!(false, "unexpected kind {:?}", other),
        }

        let code = lowered.code.unwrap();
        let lines = code.lines();
        let dispatch = if class == "ArrayList" { "invokevirtual" } else { "invokeinterface" };
        prop_assert!(lines[1].starts_with(dispatch), "{}", code);
        prop_assert_eq!(code.count("checkcast"), usize::from(parameterized));
        prop_assert_eq!(
            lines.iter().filter(|l| l.ends_with("Iterator.hasNext()Z")).count(),
            1
        );
        prop_assert_eq!(code.back_edges().len(), usize::from(!exit.always_leaves()));
        assert_targets_placed(&code);
    }

    #[test]
    fn non_iterables_never_lower_the_loop(elem in prop::sample::select(vec!["int", "String", "Integer", "Object"])) {
        let mut m = method(
            "m",
            vec![param("xs", ty(elem))],
            vec![foreach("x", ty("Object"), name("xs"), Some(block(vec![])))],
        );
        let lowered = lower_preserving(&mut m);
        prop_assert!(lowered.has_errors());
        prop_assert!(first_loop_info(&m).classification.kind().is_none());
        prop_assert_eq!(lowered.code.unwrap().lines(), vec!["return".to_string()]);
    }
}

fn foreach_stmt_with(declared: Spanned<TypeExpr>, action: Spanned<Stmt>) -> Spanned<Stmt> {
    foreach("x", declared, name("xs"), Some(action))
}

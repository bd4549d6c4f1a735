//! Property tests for flow analysis over generated loop bodies.

use proptest::prelude::*;

use javelin::ast::build::*;
use javelin::ast::{Method, Stmt};
use javelin::config::CompilerOptions;
use javelin::context::MethodContext;
use javelin::diagnostics::Problem;
use javelin::flow::FlowInfo;
use javelin::flow::analyze::FlowAnalyzer;
use javelin::foreach::collect_loops;
use javelin::span::Spanned;
use javelin::typeck::{Type, TypeEnv, check_method};
use javelin::{LoweredMethod, lower_method};

fn env() -> TypeEnv {
    let mut env = TypeEnv::new();
    env.add_function("use", vec![Type::int()], Type::Void);
    env.add_function("test", vec![], Type::boolean());
    env
}

fn lower(m: &mut Method) -> LoweredMethod {
    lower_method(m, &env(), &CompilerOptions::default()).unwrap()
}

/// Statements that may appear in a loop body reading element `x`.
fn arb_simple_stmt() -> impl Strategy<Value = Spanned<Stmt>> {
    prop_oneof![
        4 => Just(expr_stmt(call("use", vec![name("x")]))),
        2 => Just(expr_stmt(assign("last", name("x")))),
        1 => Just(if_stmt(call("test", vec![]), brk(None), None)),
        1 => Just(if_stmt(call("test", vec![]), cont(None), None)),
        1 => Just(if_stmt(call("test", vec![]), ret(None), None)),
    ]
}

fn arb_body() -> impl Strategy<Value = Vec<Spanned<Stmt>>> {
    let leaf = prop::collection::vec(arb_simple_stmt(), 0..4);
    // One level of nesting; a nested loop may not redeclare its element.
    leaf.prop_recursive(1, 8, 4, |inner| {
        (prop::collection::vec(arb_simple_stmt(), 0..3), inner).prop_map(|(mut stmts, nested)| {
            stmts.push(foreach("y", ty("int"), name("xs"), Some(block(nested))));
            stmts
        })
    })
}

fn arb_terminator() -> impl Strategy<Value = Option<Spanned<Stmt>>> {
    prop_oneof![Just(None), Just(Some(brk(None))), Just(Some(ret(None))), Just(Some(cont(None)))]
}

/// `int last [= 0]; for (int x : xs) { body; [terminator] } use(last);`
fn program(initialized: bool, body: Vec<Spanned<Stmt>>, terminator: Option<Spanned<Stmt>>) -> Method {
    let mut action = body;
    action.extend(terminator);
    method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![
            local("last", ty("int"), initialized.then(|| int(0))),
            foreach("x", ty("int"), name("xs"), Some(block(action))),
            expr_stmt(call("use", vec![name("last")])),
        ],
    )
}

proptest! {
    #[test]
    fn lowering_is_deterministic(initialized in any::<bool>(), body in arb_body(), end in arb_terminator()) {
        let m = program(initialized, body, end);
        let mut a = m.clone();
        let mut b = m;
        let first = lower(&mut a);
        let second = lower(&mut b);
        prop_assert_eq!(&first.diagnostics, &second.diagnostics);
        prop_assert_eq!(&first.code, &second.code);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn loop_never_definitely_assigns_outer_locals(body in arb_body(), end in arb_terminator()) {
        let mut m = program(false, body, end);
        let lowered = lower(&mut m);
        let uninitialized = lowered
            .diagnostics
            .iter()
            .filter(|d| d.problem == Problem::UninitializedLocal)
            .count();
        prop_assert_eq!(uninitialized, 1, "{:#?}", lowered.diagnostics);
    }

    #[test]
    fn initialized_outer_local_is_never_reported(body in arb_body(), end in arb_terminator()) {
        let mut m = program(true, body, end);
        let lowered = lower(&mut m);
        prop_assert!(lowered.diagnostics.iter().all(|d| d.problem != Problem::UninitializedLocal));
    }

    #[test]
    fn loop_exit_state_is_a_fixed_point(
        initialized in any::<bool>(),
        body in arb_body(),
        end in arb_terminator(),
    ) {
        let env = env();
        let options = CompilerOptions::default();
        let mut m = program(initialized, body, end);
        let mut ctx = MethodContext::new(&env, &options);
        check_method(&mut m, &mut ctx);
        prop_assert!(!ctx.diagnostics.has_errors(), "{:#?}", ctx.diagnostics);

        let mut entry = FlowInfo::initial();
        for param in &m.params {
            if let Some(id) = param.binding {
                entry.mark_as_definitely_assigned(id);
            }
        }
        let mut analyzer = FlowAnalyzer::new(&mut ctx);
        let stmts = &mut m.body.node.stmts;
        let before = analyzer.analyze_stmt(&mut stmts[0], entry);
        let once = analyzer.analyze_stmt(&mut stmts[1], before);
        // Feeding the merged exit state back through the loop changes nothing.
        let twice = analyzer.analyze_stmt(&mut stmts[1], once.clone());
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn leaving_body_continues_only_through_continue(body in arb_body(), leave in prop_oneof![Just(brk(None)), Just(ret(None))]) {
        let mut m = program(true, body, Some(leave));
        let lowered = lower(&mut m);
        prop_assert!(!lowered.has_errors(), "{:#?}", lowered.diagnostics);
        let outer = &collect_loops(&m)[0];
        prop_assert_eq!(outer.depth, 0);

        // A `continue` in the body still reaches the increment.
        let continues = contains_continue(&m);
        prop_assert_eq!(outer.info.continue_target, continues);
    }
}

/// Whether the outer loop body has an unlabeled `continue` outside any
/// nested loop.
fn contains_continue(m: &Method) -> bool {
    fn scan(stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Continue(None) => true,
            Stmt::If { then_branch, else_branch, .. } => {
                scan(&then_branch.node) || else_branch.as_ref().is_some_and(|e| scan(&e.node))
            }
            Stmt::Block(block) => block.stmts.iter().any(|s| scan(&s.node)),
            _ => false,
        }
    }
    match &m.body.node.stmts[1].node {
        Stmt::Foreach(node) => node.action.as_ref().is_some_and(|a| scan(&a.node)),
        _ => false,
    }
}

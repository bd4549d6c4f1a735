mod common;
use common::{code_of, first_loop, lower};

use javelin::ast::BinOp;
use javelin::ast::build::*;
use javelin::diagnostics::{Problem, Severity};
use javelin::foreach::{Classification, ElementConversion, LoopKind};
use javelin::typeck::{PrimitiveType, Type};

#[test]
fn array_sum_end_to_end() {
    let mut m = method(
        "sum",
        vec![],
        vec![
            local("sum", ty("int"), Some(int(0))),
            foreach(
                "x",
                ty("int"),
                new_array(ty("int"), vec![int(1), int(2), int(3)]),
                Some(expr_stmt(compound(BinOp::Add, "sum", name("x")))),
            ),
        ],
    );
    let lowered = lower(&mut m);
    assert!(lowered.diagnostics.is_empty(), "{:#?}", lowered.diagnostics);

    let node = first_loop(&m);
    let resolution = node.info.classification.resolution().unwrap();
    assert!(matches!(resolution.kind, LoopKind::Array { .. }));
    assert_eq!(resolution.conversion, ElementConversion::None);
    assert!(node.info.continue_target);

    let code = lowered.code.unwrap();
    let text = code.to_string();
    assert!(
        text.contains(
            "    dup\n    astore 4\n    arraylength\n    istore 3\n    iconst 0\n    istore 2\n    goto L1\n  L0:\n    aload 4\n    iload 2\n    iaload\n    istore 1\n"
        ),
        "{text}"
    );
    assert!(
        text.contains("  L3:\n    iinc 2 1\n  L1:\n    iload 2\n    iload 3\n    if_icmplt L0\n  L2:\n    return\n"),
        "{text}"
    );

    let sum = code.local_variables.iter().find(|r| r.name == "sum").unwrap();
    assert_eq!((sum.slot, sum.start, sum.end), (0, 2, code.instructions.len()));
    let x = code.local_variables.iter().find(|r| r.name == "x").unwrap();
    assert_eq!(x.slot, 1);
    // x is live for the body only.
    assert!(x.end < code.instructions.len() - 4);
}

#[test]
fn raw_iterable_with_unused_element_still_advances() {
    let mut m = method(
        "drain",
        vec![param("list", ty("List"))],
        vec![foreach("o", ty("Object"), name("list"), Some(block(vec![])))],
    );
    let lowered = lower(&mut m);
    assert!(!lowered.has_errors());

    let node = first_loop(&m);
    let resolution = node.info.classification.resolution().unwrap();
    assert!(matches!(resolution.kind, LoopKind::RawIterable { .. }));
    assert_eq!(resolution.element_type, Type::object());
    assert_eq!(resolution.conversion, ElementConversion::None);

    assert_eq!(
        lowered.code.unwrap().lines(),
        [
            "aload 0",
            "invokeinterface java/util/List.iterator()Ljava/util/Iterator;",
            "astore 1",
            "goto L1",
            "aload 1",
            "invokeinterface java/util/Iterator.next()Ljava/lang/Object;",
            "pop",
            "aload 1",
            "invokeinterface java/util/Iterator.hasNext()Z",
            "ifne L0",
            "return",
        ]
    );
}

#[test]
fn unboxing_list_of_integer() {
    let mut m = method(
        "each",
        vec![param("list", generic("List", vec![ty("Integer")]))],
        vec![foreach("i", ty("int"), name("list"), Some(expr_stmt(call("use", vec![name("i")]))))],
    );
    let lowered = lower(&mut m);

    let boxing: Vec<_> = lowered.diagnostics.iter().filter(|d| d.problem == Problem::Autoboxing).collect();
    assert_eq!(boxing.len(), 1);
    assert_eq!(boxing[0].severity, Severity::Info);
    assert!(!lowered.has_errors());

    let node = first_loop(&m);
    let Classification::Resolved(resolution) = &node.info.classification else {
        panic!("loop was not resolved");
    };
    assert!(matches!(resolution.kind, LoopKind::GenericIterable { .. }));
    assert_eq!(resolution.element_type, Type::class("Integer"));

    let lines = lowered.code.unwrap().lines();
    let next = lines
        .iter()
        .position(|l| l == "invokeinterface java/util/Iterator.next()Ljava/lang/Object;")
        .unwrap();
    assert_eq!(
        lines[next + 1..next + 4],
        ["checkcast java/lang/Integer", "invokevirtual java/lang/Integer.intValue()I", "istore 1"]
    );
}

#[test]
fn unboxing_then_widening_list_of_integer_into_long() {
    let mut m = method(
        "each",
        vec![param("list", generic("List", vec![ty("Integer")]))],
        vec![foreach(
            "l",
            ty("long"),
            name("list"),
            Some(expr_stmt(call("useLong", vec![name("l")]))),
        )],
    );
    let lowered = lower(&mut m);
    assert!(!lowered.has_errors(), "{:#?}", lowered.diagnostics);
    assert_eq!(lowered.diagnostics.iter().filter(|d| d.problem == Problem::Autoboxing).count(), 1);

    let Classification::Resolved(resolution) = &first_loop(&m).info.classification else {
        panic!("loop was not resolved");
    };
    assert_eq!(
        resolution.conversion,
        ElementConversion::Unboxing { from: PrimitiveType::Int, to: PrimitiveType::Long }
    );

    let lines = lowered.code.unwrap().lines();
    let next = lines
        .iter()
        .position(|l| l == "invokeinterface java/util/Iterator.next()Ljava/lang/Object;")
        .unwrap();
    assert_eq!(
        lines[next + 1..next + 5],
        [
            "checkcast java/lang/Integer",
            "invokevirtual java/lang/Integer.intValue()I",
            "i2l",
            "lstore 1",
        ]
    );
    assert!(lines.contains(&"lload 1".to_string()));
}

#[test]
fn unboxing_then_widening_integer_array_into_long() {
    let code = code_of(method(
        "each",
        vec![param("xs", array_of(ty("Integer")))],
        vec![foreach(
            "l",
            ty("long"),
            name("xs"),
            Some(expr_stmt(call("useLong", vec![name("l")]))),
        )],
    ));
    let lines = code.lines();
    let load = lines.iter().position(|l| l == "aaload").unwrap();
    assert_eq!(
        lines[load + 1..load + 4],
        ["invokevirtual java/lang/Integer.intValue()I", "i2l", "lstore 1"]
    );
    assert_eq!(code.count("checkcast"), 0);
}

#[test]
fn generic_element_checkcast_to_declared_type() {
    let code = code_of(method(
        "m",
        vec![param("names", generic("ArrayList", vec![ty("String")]))],
        vec![foreach(
            "s",
            ty("String"),
            name("names"),
            Some(expr_stmt(call("useObject", vec![name("s")]))),
        )],
    ));
    let lines = code.lines();
    assert!(lines.contains(&"checkcast java/lang/String".to_string()));
    assert!(lines.contains(&"astore 2".to_string()));
}

#[test]
fn nested_loops_share_nothing_but_the_frame() {
    let code = code_of(method(
        "grid",
        vec![param("rows", array_of(array_of(ty("int"))))],
        vec![foreach(
            "row",
            array_of(ty("int")),
            name("rows"),
            Some(foreach("x", ty("int"), name("row"), Some(expr_stmt(call("use", vec![name("x")]))))),
        )],
    ));
    assert_eq!(code.count("if_icmplt"), 2);
    assert_eq!(code.count("iinc"), 2);
    assert_eq!(code.back_edges().len(), 2);
    // rows, row + 3 synthetics, x + 3 synthetics.
    assert_eq!(code.max_locals, 9);
}

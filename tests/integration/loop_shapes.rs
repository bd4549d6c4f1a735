mod common;
use common::{code_of, first_loop, lower, lower_with};

use javelin::ast::build::*;
use javelin::config::{ComplianceLevel, CompilerOptions};

#[test]
fn body_that_returns_tests_at_top() {
    let mut m = method(
        "first",
        vec![param("xs", array_of(ty("int")))],
        vec![foreach("x", ty("int"), name("xs"), Some(block(vec![expr_stmt(call("use", vec![name("x")])), ret(None)])))],
    );
    let lowered = lower(&mut m);
    assert!(!first_loop(&m).info.continue_target);
    let code = lowered.code.unwrap();
    assert!(code.back_edges().is_empty());
    assert_eq!(
        code.lines()[..5],
        ["aload 0", "dup", "astore 2", "arraylength", "ifeq L2"]
    );
    // Synthetic index and bound were never given slots.
    assert_eq!(code.max_locals, 3);
}

#[test]
fn iterator_body_that_breaks_tests_at_top() {
    let code = code_of(method(
        "first",
        vec![param("list", generic("List", vec![ty("String")]))],
        vec![foreach("s", ty("String"), name("list"), Some(block(vec![expr_stmt(call("useObject", vec![name("s")])), brk(None)])))],
    ));
    assert_eq!(
        code.lines()[..6],
        [
            "aload 0",
            "invokeinterface java/util/List.iterator()Ljava/util/Iterator;",
            "astore 2",
            "aload 2",
            "invokeinterface java/util/Iterator.hasNext()Z",
            "ifeq L2",
        ]
    );
    assert!(code.back_edges().is_empty());
    assert_eq!(code.count("goto"), 1);
}

#[test]
fn conditional_break_keeps_back_edge() {
    let mut m = method(
        "find",
        vec![param("xs", array_of(ty("int")))],
        vec![foreach(
            "x",
            ty("int"),
            name("xs"),
            Some(if_stmt(binary(javelin::ast::BinOp::Eq, name("x"), int(0)), brk(None), None)),
        )],
    );
    let code = lower(&mut m).code.unwrap();
    assert!(first_loop(&m).info.continue_target);
    assert_eq!(code.back_edges().len(), 1);
    assert_eq!(code.count("if_icmplt"), 1);
}

#[test]
fn continue_from_nested_branch() {
    let code = code_of(method(
        "skip",
        vec![param("xs", array_of(ty("int")))],
        vec![foreach(
            "x",
            ty("int"),
            name("xs"),
            Some(block(vec![
                if_stmt(call("test", vec![]), cont(None), None),
                expr_stmt(call("use", vec![name("x")])),
            ])),
        )],
    ));
    let text = code.to_string();
    // The continue jumps to the increment, not the test.
    assert!(text.contains("goto L3"), "{text}");
    assert!(text.contains("  L3:\n    iinc 2 1\n"), "{text}");
}

#[test]
fn unused_array_loop_is_only_evaluated() {
    let code = code_of(method(
        "m",
        vec![],
        vec![foreach("x", ty("int"), call("values", vec![]), Some(block(vec![])))],
    ));
    assert_eq!(code.lines(), ["invokestatic Main.values()[I", "pop", "return"]);
}

#[test]
fn empty_loop_at_old_compliance() {
    let options = CompilerOptions { compliance: ComplianceLevel::Jdk1_3, ..CompilerOptions::default() };
    let mut m = method(
        "drain",
        vec![param("list", ty("List"))],
        vec![foreach("o", ty("Object"), name("list"), Some(block(vec![])))],
    );
    let code = lower_with(&options, &mut m).code.unwrap();
    assert!(first_loop(&m).info.continue_target);
    assert!(!first_loop(&m).info.action_reachable);
    assert_eq!(code.count("ifne"), 1);
}

#[test]
fn labeled_break_leaves_both_loops() {
    let code = code_of(method(
        "search",
        vec![param("rows", array_of(array_of(ty("int"))))],
        vec![
            labeled(
                "outer",
                foreach(
                    "row",
                    array_of(ty("int")),
                    name("rows"),
                    Some(foreach(
                        "x",
                        ty("int"),
                        name("row"),
                        Some(if_stmt(call("test", vec![]), brk(Some("outer")), Some(expr_stmt(call("use", vec![name("x")]))))),
                    )),
                ),
            ),
            expr_stmt(call("use", vec![int(-1)])),
        ],
    ));
    // The labeled break targets the label's own exit, placed after the
    // outer loop's exit.
    let text = code.to_string();
    let target = code
        .instructions
        .iter()
        .filter_map(|i| i.target())
        .map(|l| code.label_position(l).unwrap())
        .max()
        .unwrap();
    assert_eq!(code.lines()[target], "iconst -1", "{text}");
    assert_eq!(code.back_edges().len(), 2);
}

#[test]
fn loop_after_return_is_not_generated() {
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![ret(None), foreach("x", ty("int"), name("xs"), Some(expr_stmt(call("use", vec![name("x")]))))],
    );
    let lowered = lower(&mut m);
    assert!(lowered.has_errors());
    assert_eq!(lowered.code.unwrap().lines(), ["return"]);
}

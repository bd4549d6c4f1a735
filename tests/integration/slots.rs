mod common;
use common::{code_of, lower, lower_with};

use javelin::ast::BinOp;
use javelin::ast::build::*;
use javelin::config::CompilerOptions;
use javelin::foreach::{COLLECTION_NAME, INDEX_NAME, MAX_NAME};

fn slot_of(scope: &javelin::typeck::scope::MethodScope, name: &str) -> Vec<Option<u16>> {
    scope.locals().filter(|(_, l)| l.name == name).map(|(_, l)| l.slot).collect()
}

#[test]
fn sibling_loops_reuse_slots() {
    let mut m = method(
        "twice",
        vec![param("xs", array_of(ty("int")))],
        vec![
            foreach("a", ty("int"), name("xs"), Some(expr_stmt(call("use", vec![name("a")])))),
            foreach("b", ty("int"), name("xs"), Some(expr_stmt(call("use", vec![name("b")])))),
        ],
    );
    let lowered = lower(&mut m);
    assert_eq!(slot_of(&lowered.scope, "a"), [Some(1)]);
    assert_eq!(slot_of(&lowered.scope, "b"), [Some(1)]);
    assert_eq!(slot_of(&lowered.scope, INDEX_NAME), [Some(2), Some(2)]);
    assert_eq!(slot_of(&lowered.scope, MAX_NAME), [Some(3), Some(3)]);
    assert_eq!(slot_of(&lowered.scope, COLLECTION_NAME), [Some(4), Some(4)]);
    assert_eq!(lowered.code.unwrap().max_locals, 5);
}

#[test]
fn wide_locals_take_two_slots() {
    let code = code_of(method(
        "m",
        vec![param("w", ty("double")), param("xs", array_of(ty("long")))],
        vec![foreach("x", ty("long"), name("xs"), Some(expr_stmt(call("useLong", vec![name("x")]))))],
    ));
    let lines = code.lines();
    assert!(lines.contains(&"aload 2".to_string()), "{lines:?}");
    assert!(lines.contains(&"laload".to_string()));
    assert!(lines.contains(&"lstore 3".to_string()));
    // w(2) xs(1) x(2) index max source
    assert_eq!(code.max_locals, 8);
}

#[test]
fn unused_user_local_is_dropped_unless_preserved() {
    let body = || {
        vec![
            local("unused", ty("int"), Some(int(5))),
            foreach("x", ty("int"), call("values", vec![]), Some(expr_stmt(call("use", vec![name("x")])))),
        ]
    };

    let mut m = method("m", vec![], body());
    let lowered = lower(&mut m);
    assert_eq!(slot_of(&lowered.scope, "unused"), [None]);
    assert_eq!(slot_of(&lowered.scope, "x"), [Some(0)]);

    let options = CompilerOptions { preserve_unused_locals: true, ..CompilerOptions::default() };
    let mut m = method("m", vec![], body());
    let lowered = lower_with(&options, &mut m);
    assert_eq!(slot_of(&lowered.scope, "unused"), [Some(0)]);
    assert_eq!(slot_of(&lowered.scope, "x"), [Some(1)]);
    let code = lowered.code.unwrap();
    assert_eq!(code.lines()[..2], ["iconst 5", "istore 0"]);
}

#[test]
fn synthetics_never_preserved_when_unused() {
    let options = CompilerOptions { preserve_unused_locals: true, ..CompilerOptions::default() };
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![foreach("x", ty("int"), name("xs"), Some(ret(None)))],
    );
    let lowered = lower_with(&options, &mut m);
    assert_eq!(slot_of(&lowered.scope, INDEX_NAME), [None]);
    assert_eq!(slot_of(&lowered.scope, MAX_NAME), [None]);
    assert_eq!(slot_of(&lowered.scope, COLLECTION_NAME), [Some(2)]);
}

#[test]
fn live_ranges_cover_user_locals_only_while_assigned() {
    let code = code_of(method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![
            local("total", ty("int"), Some(int(0))),
            foreach(
                "x",
                ty("int"),
                name("xs"),
                Some(block(vec![
                    local("twice", ty("int"), Some(binary(BinOp::Mul, name("x"), int(2)))),
                    expr_stmt(compound(BinOp::Add, "total", name("twice"))),
                ])),
            ),
            expr_stmt(call("use", vec![name("total")])),
        ],
    ));
    let range = |name: &str| code.local_variables.iter().find(|r| r.name == name).unwrap().clone();
    let x = range("x");
    let twice = range("twice");
    let total = range("total");
    assert!(x.start < twice.start && twice.end <= x.end);
    assert_eq!(total.end, code.instructions.len());
    assert!(code.local_variables.iter().all(|r| !r.name.starts_with(' ')));
}

mod common;
use common::{lower, lower_with};

use javelin::ast::build::*;
use javelin::config::{CompilerOptions, ReportLevel};
use javelin::diagnostics::{Problem, Severity};

fn messages(diags: &[javelin::diagnostics::Diagnostic], problem: Problem) -> Vec<String> {
    diags.iter().filter(|d| d.problem == problem).map(|d| d.msg.clone()).collect()
}

#[test]
fn assignment_inside_loop_is_not_definite_after_it() {
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![
            local("last", ty("int"), None),
            foreach("x", ty("int"), name("xs"), Some(expr_stmt(assign("last", name("x"))))),
            expr_stmt(call("use", vec![name("last")])),
        ],
    );
    let lowered = lower(&mut m);
    assert_eq!(
        messages(&lowered.diagnostics, Problem::UninitializedLocal),
        ["The local variable last may not have been initialized"]
    );
}

#[test]
fn element_is_assigned_inside_the_body() {
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![foreach("x", ty("int"), name("xs"), Some(expr_stmt(call("use", vec![name("x")]))))],
    );
    assert!(lower(&mut m).diagnostics.is_empty());
}

#[test]
fn final_outer_local_assigned_in_loop() {
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![
            final_local("f", ty("int"), None),
            foreach("x", ty("int"), name("xs"), Some(expr_stmt(assign("f", name("x"))))),
        ],
    );
    let lowered = lower(&mut m);
    assert_eq!(
        messages(&lowered.diagnostics, Problem::FinalReassignment),
        ["The final local variable f may already have been assigned"]
    );
}

#[test]
fn null_collection_is_an_error() {
    let mut m = method(
        "m",
        vec![],
        vec![
            local("list", generic("List", vec![ty("String")]), Some(null())),
            foreach("s", ty("String"), name("list"), Some(expr_stmt(call("useObject", vec![name("s")])))),
        ],
    );
    let lowered = lower(&mut m);
    assert_eq!(
        messages(&lowered.diagnostics, Problem::NullReference),
        ["Null pointer access: The variable list can only be null at this location"]
    );
}

#[test]
fn null_analysis_can_be_switched_off() {
    let options = CompilerOptions { null_analysis: false, ..CompilerOptions::default() };
    let mut m = method(
        "m",
        vec![],
        vec![
            local("list", generic("List", vec![ty("String")]), Some(null())),
            foreach("s", ty("String"), name("list"), None),
        ],
    );
    let lowered = lower_with(&options, &mut m);
    assert!(lowered.diagnostics.is_empty(), "{:#?}", lowered.diagnostics);
}

#[test]
fn null_assigned_late_in_body_is_a_potential_problem() {
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![
            local("s", ty("String"), Some(string("a"))),
            foreach(
                "x",
                ty("int"),
                name("xs"),
                Some(block(vec![
                    expr_stmt(method_call(name("s"), "length", vec![])),
                    expr_stmt(assign("s", null())),
                ])),
            ),
        ],
    );
    let lowered = lower(&mut m);
    let potential: Vec<_> = lowered.diagnostics.iter().filter(|d| d.problem == Problem::PotentialNullReference).collect();
    assert_eq!(potential.len(), 1);
    assert_eq!(potential[0].severity, Severity::Warning);
}

#[test]
fn jumps_outside_loops() {
    let mut m = method("m", vec![], vec![if_stmt(call("test", vec![]), brk(None), Some(cont(None)))]);
    let lowered = lower(&mut m);
    assert_eq!(
        messages(&lowered.diagnostics, Problem::InvalidJump),
        [
            "break cannot be used outside of a loop or a switch",
            "continue cannot be used outside of a loop",
        ]
    );
    assert!(lowered.code.is_none());
}

#[test]
fn statement_after_always_exiting_loop_body_is_reachable() {
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![
            foreach("x", ty("int"), name("xs"), Some(ret(None))),
            expr_stmt(call("use", vec![int(1)])),
        ],
    );
    let lowered = lower(&mut m);
    assert!(messages(&lowered.diagnostics, Problem::UnreachableCode).is_empty());
}

#[test]
fn element_type_mismatch_and_autoboxing_levels() {
    let mut m = method(
        "m",
        vec![param("names", generic("List", vec![ty("String")]))],
        vec![foreach("i", ty("int"), name("names"), None)],
    );
    let lowered = lower(&mut m);
    assert_eq!(
        messages(&lowered.diagnostics, Problem::TypeMismatch),
        ["Type mismatch: cannot convert from element type String to int"]
    );

    let options = CompilerOptions { autoboxing: ReportLevel::Warning, ..CompilerOptions::default() };
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![foreach("o", ty("Integer"), name("xs"), None)],
    );
    let lowered = lower_with(&options, &mut m);
    let boxing: Vec<_> = lowered.diagnostics.iter().filter(|d| d.problem == Problem::Autoboxing).collect();
    assert_eq!(boxing.len(), 1);
    assert_eq!(boxing[0].severity, Severity::Warning);
    assert_eq!(boxing[0].msg, "The expression of type int is boxed into Integer");
}

#[test]
fn not_iterable_collection() {
    let mut m = method("m", vec![param("n", ty("int"))], vec![foreach("x", ty("int"), name("n"), None)]);
    let lowered = lower(&mut m);
    assert_eq!(
        messages(&lowered.diagnostics, Problem::InvalidCollectionType),
        ["Can only iterate over an array or an instance of java.lang.Iterable"]
    );
}

#[test]
fn element_clashing_with_outer_local() {
    let mut m = method(
        "m",
        vec![param("xs", array_of(ty("int")))],
        vec![local("x", ty("int"), Some(int(0))), foreach("x", ty("int"), name("xs"), None)],
    );
    let lowered = lower(&mut m);
    assert_eq!(messages(&lowered.diagnostics, Problem::DuplicateLocal), ["Duplicate local variable x"]);
}

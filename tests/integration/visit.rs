mod common;
use common::lower;

use std::collections::BTreeSet;

use javelin::ast::build::*;
use javelin::ast::{BinOp, Expr, ForeachStmt, LocalDecl};
use javelin::foreach::{Classification, LoopKind, collect_loops};
use javelin::span::{Span, Spanned};
use javelin::visit::{Visitor, walk_expr, walk_foreach};

fn grid() -> javelin::ast::Method {
    method(
        "grid",
        vec![param("rows", array_of(array_of(ty("int")))), param("names", generic("List", vec![ty("String")]))],
        vec![
            foreach(
                "row",
                array_of(ty("int")),
                name("rows"),
                Some(foreach(
                    "x",
                    ty("int"),
                    name("row"),
                    Some(if_stmt(
                        binary(BinOp::Lt, name("x"), int(0)),
                        brk(None),
                        Some(expr_stmt(call("use", vec![name("x")]))),
                    )),
                )),
            ),
            labeled(
                "each",
                foreach("s", ty("String"), name("names"), Some(block(vec![expr_stmt(call("useObject", vec![name("s")])), ret(None)]))),
            ),
        ],
    )
}

#[test]
fn collected_loops_carry_lowering_results() {
    let mut m = grid();
    let lowered = lower(&mut m);
    assert!(!lowered.has_errors(), "{:#?}", lowered.diagnostics);

    let loops = collect_loops(&m);
    let summary: Vec<_> = loops.iter().map(|l| (l.element.as_str(), l.depth, l.info.continue_target)).collect();
    assert_eq!(summary, [("row", 0, true), ("x", 1, true), ("s", 0, false)]);

    assert!(matches!(loops[0].info.classification.kind(), Some(LoopKind::Array { .. })));
    assert!(matches!(loops[2].info.classification.kind(), Some(LoopKind::GenericIterable { .. })));
    assert!(loops.iter().all(|l| l.info.action_reachable));
}

#[test]
fn loops_are_pending_before_lowering() {
    let loops = collect_loops(&grid());
    assert_eq!(loops.len(), 3);
    assert!(loops.iter().all(|l| l.info.classification == Classification::Pending));
}

/// Names read inside loop bodies that are not declared by any loop.
#[derive(Default)]
struct FreeNames {
    declared: BTreeSet<String>,
    in_loop: usize,
    free: BTreeSet<String>,
}

impl Visitor for FreeNames {
    fn visit_foreach(&mut self, node: &ForeachStmt, _span: Span) {
        self.in_loop += 1;
        walk_foreach(self, node);
        self.in_loop -= 1;
    }

    fn visit_local_decl(&mut self, decl: &LocalDecl) {
        self.declared.insert(decl.name.node.clone());
        javelin::visit::walk_local_decl(self, decl);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        if let Expr::Name(n) = &expr.node
            && self.in_loop > 0
            && !self.declared.contains(&n.name)
        {
            self.free.insert(n.name.clone());
        }
        walk_expr(self, expr);
    }
}

#[test]
fn custom_visitor_tracks_loop_nesting() {
    let mut v = FreeNames::default();
    v.visit_method(&grid());
    // Collections are visited inside the loop, after the element.
    assert_eq!(v.free.into_iter().collect::<Vec<_>>(), ["names", "rows"]);
    assert_eq!(v.declared.into_iter().collect::<Vec<_>>(), ["row", "s", "x"]);
}

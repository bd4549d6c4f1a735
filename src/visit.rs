//! Read-only traversal of method bodies.
//!
//! Implement [`Visitor`] for a pass, overriding only the methods you need,
//! and call the matching `walk_*` function inside an override to keep the
//! default recursion. Omit the walk call to prune traversal at that node.
//!
//! Passes where most arms carry their own logic (resolution, flow analysis,
//! code generation) match on the tree directly instead.

use crate::ast::*;
use crate::span::{Span, Spanned};

pub trait Visitor: Sized {
    fn visit_method(&mut self, method: &Method) {
        walk_method(self, method);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    /// `span` covers the whole loop statement.
    fn visit_foreach(&mut self, node: &ForeachStmt, _span: Span) {
        walk_foreach(self, node);
    }

    fn visit_local_decl(&mut self, decl: &LocalDecl) {
        walk_local_decl(self, decl);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        walk_expr(self, expr);
    }
}

pub fn walk_method<V: Visitor>(v: &mut V, method: &Method) {
    v.visit_block(&method.body.node);
}

pub fn walk_block<V: Visitor>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &Spanned<Stmt>) {
    match &stmt.node {
        Stmt::Local(decl) => v.visit_local_decl(decl),
        Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::Block(block) => v.visit_block(block),
        Stmt::If { condition, then_branch, else_branch } => {
            v.visit_expr(condition);
            v.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        Stmt::Foreach(node) => v.visit_foreach(node, stmt.span),
        Stmt::Labeled { body, .. } => v.visit_stmt(body),
        Stmt::Return(Some(value)) => v.visit_expr(value),
        Stmt::Return(None) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty => {}
    }
}

/// Element declaration, then the collection, then the action.
pub fn walk_foreach<V: Visitor>(v: &mut V, node: &ForeachStmt) {
    v.visit_local_decl(&node.element);
    v.visit_expr(&node.collection);
    if let Some(action) = &node.action {
        v.visit_stmt(action);
    }
}

pub fn walk_local_decl<V: Visitor>(v: &mut V, decl: &LocalDecl) {
    if let Some(init) = &decl.init {
        v.visit_expr(init);
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Spanned<Expr>) {
    match &expr.node {
        Expr::IntLit(_) | Expr::BoolLit(_) | Expr::StringLit(_) | Expr::Null | Expr::Name(_) => {}
        Expr::NewArray { elements, .. } => {
            for element in elements {
                v.visit_expr(element);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Assign { value, .. } => v.visit_expr(value),
        Expr::Call { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::MethodCall { receiver, args, .. } => {
            v.visit_expr(receiver);
            for arg in args {
                v.visit_expr(arg);
            }
        }
    }
}

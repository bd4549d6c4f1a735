//! Terse constructors for syntax trees, used where there is no source text
//! to parse (tests, benches, embedding). Every node gets a dummy span.

use super::*;
use crate::span::Spanned;

// ── Types ────────────────────────────────────────────────────────────

pub fn ty(name: &str) -> Spanned<TypeExpr> {
    Spanned::dummy(TypeExpr::Named(name.to_string()))
}

pub fn generic(name: &str, args: Vec<Spanned<TypeExpr>>) -> Spanned<TypeExpr> {
    Spanned::dummy(TypeExpr::Generic { name: name.to_string(), args })
}

pub fn array_of(elem: Spanned<TypeExpr>) -> Spanned<TypeExpr> {
    Spanned::dummy(TypeExpr::Array(Box::new(elem)))
}

pub fn wildcard(bound: Option<Spanned<TypeExpr>>) -> Spanned<TypeExpr> {
    Spanned::dummy(TypeExpr::Wildcard { bound: bound.map(Box::new) })
}

// ── Expressions ──────────────────────────────────────────────────────

pub fn int(value: i32) -> Spanned<Expr> {
    Spanned::dummy(Expr::IntLit(value))
}

pub fn boolean(value: bool) -> Spanned<Expr> {
    Spanned::dummy(Expr::BoolLit(value))
}

pub fn string(value: &str) -> Spanned<Expr> {
    Spanned::dummy(Expr::StringLit(value.to_string()))
}

pub fn null() -> Spanned<Expr> {
    Spanned::dummy(Expr::Null)
}

pub fn name(name: &str) -> Spanned<Expr> {
    Spanned::dummy(Expr::Name(NameRef::new(name)))
}

pub fn new_array(elem: Spanned<TypeExpr>, elements: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    Spanned::dummy(Expr::NewArray { elem, elements })
}

pub fn binary(op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    Spanned::dummy(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
}

pub fn assign(target: &str, value: Spanned<Expr>) -> Spanned<Expr> {
    Spanned::dummy(Expr::Assign {
        target: Spanned::dummy(NameRef::new(target)),
        op: None,
        value: Box::new(value),
    })
}

/// `target op= value`
pub fn compound(op: BinOp, target: &str, value: Spanned<Expr>) -> Spanned<Expr> {
    Spanned::dummy(Expr::Assign {
        target: Spanned::dummy(NameRef::new(target)),
        op: Some(op),
        value: Box::new(value),
    })
}

pub fn call(name: &str, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    Spanned::dummy(Expr::Call { name: Spanned::dummy(name.to_string()), args })
}

pub fn method_call(receiver: Spanned<Expr>, method: &str, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    Spanned::dummy(Expr::MethodCall {
        receiver: Box::new(receiver),
        method: Spanned::dummy(method.to_string()),
        args,
    })
}

// ── Statements ───────────────────────────────────────────────────────

pub fn local_decl(name: &str, ty: Spanned<TypeExpr>, init: Option<Spanned<Expr>>) -> LocalDecl {
    LocalDecl {
        name: Spanned::dummy(name.to_string()),
        ty,
        init,
        is_final: false,
        binding: None,
    }
}

pub fn local(name: &str, ty: Spanned<TypeExpr>, init: Option<Spanned<Expr>>) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Local(local_decl(name, ty, init)))
}

pub fn final_local(name: &str, ty: Spanned<TypeExpr>, init: Option<Spanned<Expr>>) -> Spanned<Stmt> {
    let mut decl = local_decl(name, ty, init);
    decl.is_final = true;
    Spanned::dummy(Stmt::Local(decl))
}

pub fn expr_stmt(expr: Spanned<Expr>) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Expr(expr))
}

pub fn block(stmts: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Block(Block::new(stmts)))
}

pub fn if_stmt(condition: Spanned<Expr>, then_branch: Spanned<Stmt>, else_branch: Option<Spanned<Stmt>>) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    })
}

pub fn foreach_stmt(
    element: &str,
    element_ty: Spanned<TypeExpr>,
    collection: Spanned<Expr>,
    action: Option<Spanned<Stmt>>,
) -> ForeachStmt {
    ForeachStmt {
        element: local_decl(element, element_ty, None),
        collection,
        action: action.map(Box::new),
        info: ForeachInfo::default(),
    }
}

pub fn foreach(
    element: &str,
    element_ty: Spanned<TypeExpr>,
    collection: Spanned<Expr>,
    action: Option<Spanned<Stmt>>,
) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Foreach(foreach_stmt(element, element_ty, collection, action)))
}

pub fn labeled(label: &str, body: Spanned<Stmt>) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Labeled {
        label: Spanned::dummy(label.to_string()),
        body: Box::new(body),
    })
}

pub fn brk(label: Option<&str>) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Break(label.map(|l| Spanned::dummy(l.to_string()))))
}

pub fn cont(label: Option<&str>) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Continue(label.map(|l| Spanned::dummy(l.to_string()))))
}

pub fn ret(value: Option<Spanned<Expr>>) -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Return(value))
}

pub fn empty() -> Spanned<Stmt> {
    Spanned::dummy(Stmt::Empty)
}

// ── Declarations ─────────────────────────────────────────────────────

pub fn param(name: &str, ty: Spanned<TypeExpr>) -> Param {
    Param {
        name: Spanned::dummy(name.to_string()),
        ty,
        is_final: false,
        binding: None,
    }
}

/// A `void` static method.
pub fn method(name: &str, params: Vec<Param>, body: Vec<Spanned<Stmt>>) -> Method {
    Method {
        name: Spanned::dummy(name.to_string()),
        type_params: Vec::new(),
        params,
        return_type: None,
        body: Spanned::dummy(Block::new(body)),
    }
}

pub fn type_param(name: &str, bound: Option<Spanned<TypeExpr>>) -> TypeParam {
    TypeParam { name: name.to_string(), bound }
}

pub fn function(name: &str, params: Vec<Spanned<TypeExpr>>, return_type: Option<Spanned<TypeExpr>>) -> FunctionDecl {
    FunctionDecl {
        name: Spanned::dummy(name.to_string()),
        params,
        return_type,
    }
}

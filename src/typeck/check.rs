use crate::ast::*;
use crate::context::MethodContext;
use crate::diagnostics::Problem;
use crate::foreach;
use crate::span::{Span, Spanned};

use super::infer::binary_result;
use super::resolver::TypeResolver;
use super::scope::{LocalId, LocalVariable, MethodScope, ScopeId};
use super::types::{Type, TypeVariable};

/// Bind names, resolve types and classify loops for one method. Problems go
/// to `ctx.diagnostics`; resolution always completes.
pub fn check_method(method: &mut Method, ctx: &mut MethodContext) {
    for tp in &method.type_params {
        let bound = match &tp.bound {
            Some(b) => resolve_type(ctx, b),
            None => Type::object(),
        };
        ctx.type_vars.insert(
            tp.name.clone(),
            TypeVariable { name: tp.name.clone(), bound: Box::new(bound) },
        );
    }
    ctx.return_type = match &method.return_type {
        Some(t) => resolve_type(ctx, t),
        None => Type::Void,
    };
    for param in &mut method.params {
        let ty = resolve_type(ctx, &param.ty);
        let mut local = LocalVariable::new(param.name.node.clone(), ty, param.name.span);
        local.is_param = true;
        local.is_final = param.is_final;
        param.binding = Some(declare(ctx, MethodScope::ROOT, local));
    }
    method.body.node.scope = Some(MethodScope::ROOT);
    check_stmts(&mut method.body.node.stmts, ctx, MethodScope::ROOT);
}

pub(crate) fn resolve_type(ctx: &mut MethodContext, te: &Spanned<TypeExpr>) -> Type {
    match ctx.env.resolve_type_expr(&te.node, &ctx.type_vars) {
        Ok(ty) => ty,
        Err(msg) => {
            ctx.diagnostics.error(Problem::UnknownType, msg, te.span);
            Type::Unknown
        }
    }
}

/// Declare a local, reporting a clash with any visible local of the same name.
pub(crate) fn declare(ctx: &mut MethodContext, scope: ScopeId, local: LocalVariable) -> LocalId {
    if !local.is_synthetic && ctx.scope.lookup(scope, &local.name).is_some() {
        ctx.diagnostics.error(
            Problem::DuplicateLocal,
            format!("Duplicate local variable {}", local.name),
            local.span,
        );
    }
    ctx.scope.declare(scope, local)
}

/// Declare the variable of a local declaration (without its initializer).
pub(crate) fn declare_local(ctx: &mut MethodContext, decl: &mut LocalDecl, scope: ScopeId) -> Type {
    let ty = resolve_type(ctx, &decl.ty);
    let mut local = LocalVariable::new(decl.name.node.clone(), ty.clone(), decl.name.span);
    local.is_final = decl.is_final;
    decl.binding = Some(declare(ctx, scope, local));
    ty
}

fn check_stmts(stmts: &mut [Spanned<Stmt>], ctx: &mut MethodContext, scope: ScopeId) {
    for stmt in stmts {
        check_stmt(stmt, ctx, scope);
    }
}

pub(crate) fn check_stmt(stmt: &mut Spanned<Stmt>, ctx: &mut MethodContext, scope: ScopeId) {
    let span = stmt.span;
    match &mut stmt.node {
        Stmt::Local(decl) => {
            let ty = declare_local(ctx, decl, scope);
            if let Some(init) = &mut decl.init {
                let init_ty = check_expr(init, ctx, scope);
                check_assignable(ctx, &init_ty, &ty, init.span);
            }
        }
        Stmt::Expr(expr) => {
            check_expr(expr, ctx, scope);
        }
        Stmt::Block(block) => {
            let inner = ctx.scope.new_block(scope);
            block.scope = Some(inner);
            check_stmts(&mut block.stmts, ctx, inner);
        }
        Stmt::If { condition, then_branch, else_branch } => {
            let cond_ty = check_expr(condition, ctx, scope);
            check_assignable(ctx, &cond_ty, &Type::boolean(), condition.span);
            check_stmt(then_branch, ctx, scope);
            if let Some(else_branch) = else_branch {
                check_stmt(else_branch, ctx, scope);
            }
        }
        Stmt::Foreach(node) => foreach::classify::check_foreach(node, span, ctx, scope),
        Stmt::Labeled { body, .. } => check_stmt(body, ctx, scope),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty => {}
        Stmt::Return(value) => {
            let expected = ctx.return_type.clone();
            match value {
                Some(value) => {
                    let ty = check_expr(value, ctx, scope);
                    if expected == Type::Void {
                        ctx.diagnostics.error(
                            Problem::TypeMismatch,
                            "Void methods cannot return a value",
                            value.span,
                        );
                    } else {
                        check_assignable(ctx, &ty, &expected, value.span);
                    }
                }
                None if expected != Type::Void => {
                    ctx.diagnostics.error(
                        Problem::TypeMismatch,
                        format!("This method must return a result of type {expected}"),
                        span,
                    );
                }
                None => {}
            }
        }
    }
}

/// Report a mismatch unless `from` converts to `to` by assignment or widening.
/// Boxing in plain assignments is accepted silently.
fn check_assignable(ctx: &mut MethodContext, from: &Type, to: &Type, span: Span) {
    if ctx.env.is_assignment_compatible(from, to) || ctx.env.is_boxing_compatible(from, to) {
        return;
    }
    ctx.diagnostics.error(
        Problem::TypeMismatch,
        format!("Type mismatch: cannot convert from {from} to {to}"),
        span,
    );
}

pub(crate) fn check_expr(expr: &mut Spanned<Expr>, ctx: &mut MethodContext, scope: ScopeId) -> Type {
    let span = expr.span;
    match &mut expr.node {
        Expr::IntLit(_) => Type::int(),
        Expr::BoolLit(_) => Type::boolean(),
        Expr::StringLit(_) => Type::string(),
        Expr::Null => Type::Null,
        Expr::Name(name_ref) => match bind_name(name_ref, ctx, scope, span) {
            Some(id) => {
                ctx.scope.mark_used(id);
                ctx.local(id).ty.clone()
            }
            None => Type::Unknown,
        },
        Expr::NewArray { elem, elements } => {
            let elem_ty = resolve_type(ctx, elem);
            for element in elements {
                let ty = check_expr(element, ctx, scope);
                check_assignable(ctx, &ty, &elem_ty, element.span);
            }
            Type::array(elem_ty)
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = check_expr(lhs, ctx, scope);
            let r = check_expr(rhs, ctx, scope);
            match binary_result(*op, &l, &r) {
                Some(ty) => ty,
                None => {
                    ctx.diagnostics.error(
                        Problem::TypeMismatch,
                        format!("The operator {} is undefined for the argument type(s) {l}, {r}", op.symbol()),
                        span,
                    );
                    Type::Unknown
                }
            }
        }
        Expr::Assign { target, op, value } => {
            let target_span = target.span;
            let id = bind_name(&mut target.node, ctx, scope, target_span);
            // A compound assignment reads its target.
            if let (Some(id), Some(_)) = (id, op.as_ref()) {
                ctx.scope.mark_used(id);
            }
            let value_ty = check_expr(value, ctx, scope);
            let Some(id) = id else {
                return Type::Unknown;
            };
            let target_ty = ctx.local(id).ty.clone();
            match op {
                None => check_assignable(ctx, &value_ty, &target_ty, value.span),
                Some(op) => {
                    let numeric = !op.is_comparison()
                        && binary_result(*op, &target_ty, &value_ty).is_some_and(|t| t.is_primitive() || t.is_unknown());
                    if !numeric {
                        ctx.diagnostics.error(
                            Problem::TypeMismatch,
                            format!(
                                "The operator {}= is undefined for the argument type(s) {target_ty}, {value_ty}",
                                op.symbol()
                            ),
                            span,
                        );
                    }
                }
            }
            target_ty
        }
        Expr::Call { name, args } => {
            let arg_tys: Vec<Type> = args.iter_mut().map(|a| check_expr(a, ctx, scope)).collect();
            let Some(func) = ctx.env.function(&name.node) else {
                ctx.diagnostics.error(
                    Problem::UndefinedName,
                    format!("The method {}() is undefined", name.node),
                    name.span,
                );
                return Type::Unknown;
            };
            let (params, ret) = (func.params.clone(), func.return_type.clone());
            check_arguments(ctx, &name.node, &params, &arg_tys, args, span);
            ret
        }
        Expr::MethodCall { receiver, method, args } => {
            let recv_ty = check_expr(receiver, ctx, scope);
            let arg_tys: Vec<Type> = args.iter_mut().map(|a| check_expr(a, ctx, scope)).collect();
            if recv_ty.is_unknown() {
                return Type::Unknown;
            }
            let Some(resolved) = ctx.env.lookup_method(&recv_ty, &method.node) else {
                ctx.diagnostics.error(
                    Problem::UndefinedName,
                    format!("The method {}() is undefined for the type {recv_ty}", method.node),
                    method.span,
                );
                return Type::Unknown;
            };
            check_arguments(ctx, &method.node, &resolved.substituted.params, &arg_tys, args, span);
            resolved.substituted.return_type
        }
    }
}

fn bind_name(name_ref: &mut NameRef, ctx: &mut MethodContext, scope: ScopeId, span: Span) -> Option<LocalId> {
    let found = ctx.scope.lookup(scope, &name_ref.name);
    if found.is_none() {
        ctx.diagnostics.error(
            Problem::UndefinedName,
            format!("{} cannot be resolved to a variable", name_ref.name),
            span,
        );
    }
    name_ref.binding = found;
    found
}

fn check_arguments(
    ctx: &mut MethodContext,
    name: &str,
    params: &[Type],
    arg_tys: &[Type],
    args: &[Spanned<Expr>],
    span: Span,
) {
    if params.len() != arg_tys.len() {
        ctx.diagnostics.error(
            Problem::TypeMismatch,
            format!("The method {name} expects {} argument(s) but got {}", params.len(), arg_tys.len()),
            span,
        );
        return;
    }
    for ((param, arg_ty), arg) in params.iter().zip(arg_tys).zip(args) {
        check_assignable(ctx, arg_ty, param, arg.span);
    }
}

use crate::ast::{BinOp, Expr};
use crate::typeck::env::TypeEnv;
use crate::typeck::scope::MethodScope;
use crate::typeck::types::{PrimitiveType, Type};

/// Result type of a binary operator, `None` when the operator does not
/// apply to the operand types.
pub fn binary_result(op: BinOp, lhs: &Type, rhs: &Type) -> Option<Type> {
    if lhs.is_unknown() || rhs.is_unknown() {
        return Some(Type::Unknown);
    }
    match (lhs, rhs) {
        (Type::Primitive(a), Type::Primitive(b)) if a.is_numeric() && b.is_numeric() => {
            if op.is_comparison() {
                Some(Type::boolean())
            } else {
                Some(Type::Primitive(a.promote(*b)))
            }
        }
        (Type::Primitive(PrimitiveType::Boolean), Type::Primitive(PrimitiveType::Boolean))
            if matches!(op, BinOp::Eq | BinOp::Ne) =>
        {
            Some(Type::boolean())
        }
        (a, b) if a.is_reference() && b.is_reference() && matches!(op, BinOp::Eq | BinOp::Ne) => {
            Some(Type::boolean())
        }
        _ => None,
    }
}

/// Numeric type both operands are converted to before the operation.
pub fn operand_type(lhs: &Type, rhs: &Type) -> Option<PrimitiveType> {
    match (lhs, rhs) {
        (Type::Primitive(a), Type::Primitive(b)) if a.is_numeric() && b.is_numeric() => Some(a.promote(*b)),
        _ => None,
    }
}

/// Static type of an already-resolved expression.
pub fn expr_type(env: &TypeEnv, scope: &MethodScope, expr: &Expr) -> Type {
    match expr {
        Expr::IntLit(_) => Type::int(),
        Expr::BoolLit(_) => Type::boolean(),
        Expr::StringLit(_) => Type::string(),
        Expr::Null => Type::Null,
        Expr::Name(nr) => nr
            .binding
            .map(|id| scope.local(id).ty.clone())
            .unwrap_or(Type::Unknown),
        Expr::NewArray { elem, .. } => env
            .resolve_type_expr(&elem.node, &Default::default())
            .map(Type::array)
            .unwrap_or(Type::Unknown),
        Expr::Binary { op, lhs, rhs } => {
            let l = expr_type(env, scope, &lhs.node);
            let r = expr_type(env, scope, &rhs.node);
            binary_result(*op, &l, &r).unwrap_or(Type::Unknown)
        }
        Expr::Assign { target, .. } => target
            .node
            .binding
            .map(|id| scope.local(id).ty.clone())
            .unwrap_or(Type::Unknown),
        Expr::Call { name, .. } => env
            .function(&name.node)
            .map(|f| f.return_type.clone())
            .unwrap_or(Type::Unknown),
        Expr::MethodCall { receiver, method, .. } => {
            let recv = expr_type(env, scope, &receiver.node);
            env.lookup_method(&recv, &method.node)
                .map(|m| m.substituted.return_type)
                .unwrap_or(Type::Unknown)
        }
    }
}

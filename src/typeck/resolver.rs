//! Type queries the loop classifier depends on. `TypeEnv` answers them from
//! its class table; tests and embedders may supply their own resolver.

use super::env::TypeEnv;
use super::types::{PrimitiveType, Type};

/// How a type reaches the `Iterable` capability.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityInstantiation {
    /// `Iterable` with its type arguments erased.
    Raw,
    /// Arguments are still-unbound type parameters (`?`, `? extends B`),
    /// known only by their upper bounds.
    Unbound { bounds: Vec<Type> },
    /// Concrete arguments.
    Parameterized { args: Vec<Type> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterationCapability {
    pub instantiation: CapabilityInstantiation,
    /// Type the `iterator()` call is dispatched on.
    pub receiver: Type,
}

pub trait TypeResolver {
    fn find_iteration_capability(&self, ty: &Type) -> Option<IterationCapability>;
    fn is_assignment_compatible(&self, from: &Type, to: &Type) -> bool;
    fn is_boxing_compatible(&self, from: &Type, to: &Type) -> bool;
    fn boxed_type(&self, prim: PrimitiveType) -> Type;
    fn unboxed_type(&self, ty: &Type) -> Option<PrimitiveType>;
    fn is_interface(&self, ty: &Type) -> bool;
}

const ITERABLE: &str = "Iterable";

impl TypeResolver for TypeEnv {
    fn find_iteration_capability(&self, ty: &Type) -> Option<IterationCapability> {
        let found = self.find_supertype(ty, ITERABLE)?;
        let instantiation = if found.args.is_empty() {
            CapabilityInstantiation::Raw
        } else if let Some(bounds) = found.args.iter().map(Type::wildcard_bound).collect::<Option<Vec<_>>>() {
            CapabilityInstantiation::Unbound { bounds }
        } else {
            CapabilityInstantiation::Parameterized { args: found.args.clone() }
        };
        // A collection that is iterable only through a type variable bound
        // the erasure cannot see dispatches on Iterable itself.
        let erasure = ty.erasure();
        let receiver = if self.find_supertype(&erasure, ITERABLE).is_some() {
            erasure
        } else {
            Type::class(ITERABLE)
        };
        Some(IterationCapability { instantiation, receiver })
    }

    fn is_assignment_compatible(&self, from: &Type, to: &Type) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (Type::Primitive(a), Type::Primitive(b)) => a.widens_to(*b),
            (Type::Null, t) => t.is_reference(),
            (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Wildcard(_), _) => from
                .wildcard_bound()
                .is_some_and(|b| self.is_assignment_compatible(&b, to)),
            (_, Type::Class(c)) if c.name == "Object" => true,
            (Type::Array(a), Type::Array(b)) => {
                a.is_reference() && b.is_reference() && self.is_assignment_compatible(a, b)
            }
            (Type::Array(_), _) => false,
            (_, Type::Class(target)) => match self.find_supertype(from, &target.name) {
                // Raw on either side converts unchecked.
                Some(found) if found.args.is_empty() || target.args.is_empty() => true,
                Some(found) => {
                    found.args.len() == target.args.len()
                        && found
                            .args
                            .iter()
                            .zip(&target.args)
                            .all(|(f, t)| self.type_argument_contained(f, t))
                }
                None => false,
            },
            (Type::TypeVar(a), Type::TypeVar(b)) => a.name == b.name,
            _ => false,
        }
    }

    fn is_boxing_compatible(&self, from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Primitive(p), t) if t.is_reference() => {
                self.is_assignment_compatible(&self.boxed_type(*p), t)
            }
            (f, Type::Primitive(p)) if f.is_reference() => self
                .unboxed_type(f)
                .is_some_and(|u| u == *p || u.widens_to(*p)),
            _ => false,
        }
    }

    fn boxed_type(&self, prim: PrimitiveType) -> Type {
        Type::class(prim.wrapper())
    }

    fn unboxed_type(&self, ty: &Type) -> Option<PrimitiveType> {
        match ty.erasure() {
            Type::Class(c) => PrimitiveType::from_wrapper(&c.name),
            _ => None,
        }
    }

    fn is_interface(&self, ty: &Type) -> bool {
        match ty.erasure() {
            Type::Class(c) => self.class(&c.name).is_some_and(|info| info.is_interface),
            _ => false,
        }
    }
}

impl TypeEnv {
    fn type_argument_contained(&self, arg: &Type, target: &Type) -> bool {
        match target {
            Type::Wildcard(None) => true,
            Type::Wildcard(Some(bound)) => match arg {
                Type::Wildcard(_) => arg
                    .wildcard_bound()
                    .is_some_and(|b| self.is_assignment_compatible(&b, bound)),
                _ => self.is_assignment_compatible(arg, bound),
            },
            _ => arg == target,
        }
    }
}

use thiserror::Error;

use crate::ast::ForeachStmt;
use crate::context::MethodContext;
use crate::diagnostics::Problem;
use crate::span::Span;
use crate::typeck::check;
use crate::typeck::resolver::{CapabilityInstantiation, TypeResolver};
use crate::typeck::scope::{LocalVariable, MethodScope, ScopeId};
use crate::typeck::types::Type;

use super::{
    COLLECTION_NAME, Classification, ElementConversion, INDEX_NAME, LoopKind, LoopResolution,
    MAX_NAME,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("Can only iterate over an array or an instance of java.lang.Iterable")]
    NotIterable { found: Type },
    #[error(
        "Can only iterate over an array or an instance of java.lang.Iterable: \
         {found} instantiates Iterable with {arity} type arguments"
    )]
    BadArity { found: Type, arity: usize },
}

/// Strategy chosen for a collection, before synthetic locals exist.
#[derive(Debug, Clone, PartialEq)]
pub enum KindShape {
    Array,
    RawIterable { receiver: Type },
    GenericIterable { receiver: Type },
}

/// Problems found while classifying; the loop is still lowered.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    Mismatch { element: Type, declared: Type },
    /// `boxing` is true when a primitive element is boxed, false when a
    /// wrapper element is unboxed.
    Autoboxing { element: Type, declared: Type, boxing: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub shape: KindShape,
    pub element_type: Type,
    pub conversion: ElementConversion,
    pub findings: Vec<Finding>,
}

/// Decide how a loop over `collection` with a variable of type `declared`
/// is lowered.
pub fn classify<R: TypeResolver + ?Sized>(
    resolver: &R,
    declared: &Type,
    collection: &Type,
) -> Result<Classified, ClassifyError> {
    let (shape, element_type) = match collection {
        Type::Array(component) => (KindShape::Array, (**component).clone()),
        _ => {
            let capability = resolver
                .find_iteration_capability(collection)
                .ok_or_else(|| ClassifyError::NotIterable { found: collection.clone() })?;
            let receiver = capability.receiver;
            match capability.instantiation {
                CapabilityInstantiation::Raw => {
                    (KindShape::RawIterable { receiver }, Type::object())
                }
                CapabilityInstantiation::Unbound { bounds: args }
                | CapabilityInstantiation::Parameterized { args } => {
                    let [element] = <[Type; 1]>::try_from(args).map_err(|args| {
                        ClassifyError::BadArity { found: collection.clone(), arity: args.len() }
                    })?;
                    (KindShape::GenericIterable { receiver }, element)
                }
            }
        }
    };

    let mut findings = Vec::new();
    if !resolver.is_assignment_compatible(&element_type, declared)
        && !resolver.is_boxing_compatible(&element_type, declared)
    {
        findings.push(Finding::Mismatch {
            element: element_type.clone(),
            declared: declared.clone(),
        });
    }
    let conversion = element_conversion(resolver, &element_type, declared);
    let boxing = match conversion {
        ElementConversion::Boxing(_) | ElementConversion::BoxingThenWidening(_) => Some(true),
        ElementConversion::Unboxing { .. } => Some(false),
        ElementConversion::None | ElementConversion::Widening { .. } => None,
    };
    if let Some(boxing) = boxing {
        findings.push(Finding::Autoboxing {
            element: element_type.clone(),
            declared: declared.clone(),
            boxing,
        });
    }
    Ok(Classified { shape, element_type, conversion, findings })
}

/// Conversion from a produced element to the loop variable. Reference to
/// reference is `None`; the generator casts when needed.
pub fn element_conversion<R: TypeResolver + ?Sized>(
    resolver: &R,
    element: &Type,
    declared: &Type,
) -> ElementConversion {
    match (element.as_primitive(), declared.as_primitive()) {
        (Some(from), Some(to)) if from == to => ElementConversion::None,
        (Some(from), Some(to)) => ElementConversion::Widening { from, to },
        (None, Some(to)) => match resolver.unboxed_type(element) {
            Some(from) => ElementConversion::Unboxing { from, to },
            None => ElementConversion::None,
        },
        (Some(from), None) => {
            if resolver.boxed_type(from) == *declared {
                ElementConversion::Boxing(from)
            } else {
                ElementConversion::BoxingThenWidening(from)
            }
        }
        (None, None) => ElementConversion::None,
    }
}

/// Declare the synthetic locals of `shape` in the loop scope.
pub fn allocate_synthetics(
    scope: &mut MethodScope,
    loop_scope: ScopeId,
    shape: KindShape,
    collection: &Type,
    span: Span,
) -> LoopKind {
    let mut synthetic =
        |name: &str, ty: Type| scope.declare(loop_scope, LocalVariable::synthetic(name, ty, span));
    match shape {
        KindShape::Array => {
            let index = synthetic(INDEX_NAME, Type::int());
            let bound = synthetic(MAX_NAME, Type::int());
            let source = synthetic(COLLECTION_NAME, collection.clone());
            LoopKind::Array { index, bound, source }
        }
        KindShape::RawIterable { receiver } => LoopKind::RawIterable {
            iterator: synthetic(INDEX_NAME, Type::class("Iterator")),
            receiver,
        },
        KindShape::GenericIterable { receiver } => LoopKind::GenericIterable {
            iterator: synthetic(INDEX_NAME, Type::class("Iterator")),
            receiver,
        },
    }
}

/// Resolve a for-each statement: open the loop scope, declare the element,
/// check the collection, classify, then check the action inside the loop
/// scope.
pub fn check_foreach(node: &mut ForeachStmt, span: Span, ctx: &mut MethodContext, upper: ScopeId) {
    let scope = ctx.scope.new_block(upper);
    node.info.scope = Some(scope);
    let declared = check::declare_local(ctx, &mut node.element, scope);
    let collection = check::check_expr(&mut node.collection, ctx, scope);
    node.info.classification =
        resolve_foreach(ctx, scope, &declared, &collection, node.collection.span);
    if node.info.classification == Classification::Invalid {
        tracing::debug!(span = ?span, "for-each loop left unclassified");
    }
    if let Some(action) = &mut node.action {
        check::check_stmt(action, ctx, scope);
    }
}

/// Classify, report findings on the collection, and allocate synthetics.
pub fn resolve_foreach(
    ctx: &mut MethodContext,
    scope: ScopeId,
    declared: &Type,
    collection: &Type,
    collection_span: Span,
) -> Classification {
    // Already reported where the type failed to resolve.
    if declared.is_unknown() || collection.is_unknown() {
        return Classification::Invalid;
    }
    let classified = match classify(ctx.env, declared, collection) {
        Ok(classified) => classified,
        Err(err) => {
            ctx.diagnostics.error(Problem::InvalidCollectionType, err.to_string(), collection_span);
            return Classification::Invalid;
        }
    };
    for finding in &classified.findings {
        match finding {
            Finding::Mismatch { element, declared } => ctx.diagnostics.error(
                Problem::TypeMismatch,
                format!("Type mismatch: cannot convert from element type {element} to {declared}"),
                collection_span,
            ),
            Finding::Autoboxing { element, declared, boxing } => {
                let verb = if *boxing { "boxed" } else { "unboxed" };
                ctx.diagnostics.report(
                    Problem::Autoboxing,
                    ctx.options.autoboxing.severity(),
                    format!("The expression of type {element} is {verb} into {declared}"),
                    collection_span,
                );
            }
        }
    }
    let kind =
        allocate_synthetics(&mut ctx.scope, scope, classified.shape, collection, collection_span);
    tracing::debug!(
        kind = kind.name(),
        element = %classified.element_type,
        conversion = %classified.conversion,
        "classified for-each loop"
    );
    Classification::Resolved(LoopResolution {
        kind,
        element_type: classified.element_type,
        conversion: classified.conversion,
    })
}

use std::collections::HashMap;

use crate::config::CompilerOptions;
use crate::diagnostics::Diagnostics;
use crate::flow::FlowArena;
use crate::typeck::env::TypeEnv;
use crate::typeck::scope::{LocalId, LocalVariable, MethodScope};
use crate::typeck::types::{Type, TypeVariable};

/// Per-method compiler state, passed explicitly through resolve, flow
/// analysis and code generation.
pub struct MethodContext<'a> {
    pub env: &'a TypeEnv,
    pub options: &'a CompilerOptions,
    pub scope: MethodScope,
    pub flow_states: FlowArena,
    pub diagnostics: Diagnostics,
    pub type_vars: HashMap<String, TypeVariable>,
    pub return_type: Type,
    /// Set by flow analysis: control can fall off the end of the body.
    pub completes_normally: bool,
}

impl<'a> MethodContext<'a> {
    pub fn new(env: &'a TypeEnv, options: &'a CompilerOptions) -> Self {
        Self {
            env,
            options,
            scope: MethodScope::new(),
            flow_states: FlowArena::new(),
            diagnostics: Diagnostics::new(),
            type_vars: HashMap::new(),
            return_type: Type::Void,
            completes_normally: true,
        }
    }

    pub fn local(&self, id: LocalId) -> &LocalVariable {
        self.scope.local(id)
    }

    pub fn is_materialized(&self, id: LocalId) -> bool {
        self.scope.is_materialized(id, self.options.preserve_unused_locals)
    }
}

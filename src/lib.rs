pub mod ast;
pub mod codegen;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod flow;
pub mod foreach;
pub mod pretty;
pub mod span;
pub mod typeck;
pub mod visit;

use std::path::Path;

use ast::{CompilationUnit, Method};
use codegen::MethodCode;
use config::CompilerOptions;
use context::MethodContext;
use diagnostics::{CompileError, Diagnostic, Severity};
use typeck::env::TypeEnv;
use typeck::scope::MethodScope;

/// Result of lowering one method.
#[derive(Debug)]
pub struct LoweredMethod {
    pub name: String,
    /// Absent when errors left the method impossible to lower.
    pub code: Option<MethodCode>,
    pub diagnostics: Vec<Diagnostic>,
    /// Locals with their final frame slots.
    pub scope: MethodScope,
}

impl LoweredMethod {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

/// Resolve, analyze, assign slots and generate code for one method. The
/// tree is annotated in place.
///
/// Problems in the source are diagnostics; an `Err` means a compiler
/// invariant was violated on a method that resolved and analyzed cleanly.
pub fn lower_method(method: &mut Method, env: &TypeEnv, options: &CompilerOptions) -> Result<LoweredMethod, CompileError> {
    let mut ctx = MethodContext::new(env, options);
    typeck::check_method(method, &mut ctx);
    flow::analyze_method(method, &mut ctx);
    let frame = ctx.scope.compute_local_variable_positions(options.preserve_unused_locals);
    tracing::debug!(method = %method.name.node, max_locals = frame, "assigned frame slots");

    let code = match codegen::generate_method(method, &ctx) {
        Ok(code) => Some(code),
        Err(err) if ctx.diagnostics.has_errors() => {
            tracing::debug!(method = %method.name.node, error = %err, "skipping code for method with errors");
            None
        }
        Err(err) => return Err(err),
    };
    Ok(LoweredMethod {
        name: method.name.node.clone(),
        code,
        diagnostics: ctx.diagnostics.into_vec(),
        scope: ctx.scope,
    })
}

/// Lower every method of a unit against the classes and functions it
/// declares.
pub fn lower_unit(unit: &mut CompilationUnit, options: &CompilerOptions) -> Result<Vec<LoweredMethod>, CompileError> {
    let env = TypeEnv::from_unit(unit)?;
    unit.methods
        .iter_mut()
        .map(|m| lower_method(&mut m.node, &env, options))
        .collect()
}

/// Read a JSON compilation unit.
pub fn load_unit(path: &Path) -> Result<CompilationUnit, CompileError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CompileError::input(format!("cannot read unit: {e}"), path.to_path_buf()))?;
    serde_json::from_str(&text).map_err(|e| CompileError::input(format!("invalid unit: {e}"), path.to_path_buf()))
}

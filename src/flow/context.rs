//! Stack of enclosing jump targets seen by flow analysis. Each loop and
//! labeled statement pushes a record that collects the states arriving by
//! `break` and `continue`.

use thiserror::Error;

use crate::span::Span;
use crate::typeck::scope::{LocalId, MethodScope, ScopeId};

use super::FlowInfo;

#[derive(Debug, Clone)]
pub struct LoopingContext {
    /// The loop's own block scope.
    pub scope: ScopeId,
    /// State entering the loop.
    pub upstream: FlowInfo,
    pub inits_on_break: FlowInfo,
    pub inits_on_continue: FlowInfo,
    /// Assignments to final locals declared outside the loop.
    pub deferred_finals: Vec<(LocalId, Span)>,
    /// Dereferences whose nullness depends on earlier iterations.
    pub deferred_nulls: Vec<(LocalId, Span)>,
}

#[derive(Debug, Clone)]
pub struct LabelContext {
    pub name: String,
    /// The labeled statement is itself a loop, so `continue name` is legal.
    pub labels_loop: bool,
    pub inits_on_break: FlowInfo,
}

#[derive(Debug, Clone)]
pub enum FlowContext {
    Looping(LoopingContext),
    Label(LabelContext),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JumpError {
    #[error("break cannot be used outside of a loop or a switch")]
    BreakOutsideLoop,
    #[error("continue cannot be used outside of a loop")]
    ContinueOutsideLoop,
    #[error("The label {0} is missing")]
    UndefinedLabel(String),
    #[error("continue cannot be used with label {0}, which does not label a loop")]
    NotALoop(String),
}

#[derive(Debug, Default)]
pub struct FlowContextStack {
    records: Vec<FlowContext>,
}

impl FlowContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.records.len()
    }

    pub fn push_looping(&mut self, scope: ScopeId, upstream: FlowInfo) {
        self.records.push(FlowContext::Looping(LoopingContext {
            scope,
            upstream,
            inits_on_break: FlowInfo::dead_end(),
            inits_on_continue: FlowInfo::dead_end(),
            deferred_finals: Vec::new(),
            deferred_nulls: Vec::new(),
        }));
    }

    pub fn pop_looping(&mut self) -> Option<LoopingContext> {
        match self.records.pop() {
            Some(FlowContext::Looping(ctx)) => Some(ctx),
            Some(other) => {
                self.records.push(other);
                None
            }
            None => None,
        }
    }

    pub fn push_label(&mut self, name: &str, labels_loop: bool) {
        self.records.push(FlowContext::Label(LabelContext {
            name: name.to_string(),
            labels_loop,
            inits_on_break: FlowInfo::dead_end(),
        }));
    }

    pub fn pop_label(&mut self) -> Option<LabelContext> {
        match self.records.pop() {
            Some(FlowContext::Label(ctx)) => Some(ctx),
            Some(other) => {
                self.records.push(other);
                None
            }
            None => None,
        }
    }

    pub fn innermost_looping(&self) -> Option<&LoopingContext> {
        self.records.iter().rev().find_map(|r| match r {
            FlowContext::Looping(ctx) => Some(ctx),
            FlowContext::Label(_) => None,
        })
    }

    fn find_label(&self, name: &str) -> Option<usize> {
        self.records
            .iter()
            .rposition(|r| matches!(r, FlowContext::Label(l) if l.name == name))
    }

    fn innermost_looping_index(&self) -> Option<usize> {
        self.records.iter().rposition(|r| matches!(r, FlowContext::Looping(_)))
    }

    /// Merge `info` into the state collected by the targeted statement.
    pub fn record_break(&mut self, label: Option<&str>, info: &FlowInfo) -> Result<(), JumpError> {
        let index = match label {
            None => self.innermost_looping_index().ok_or(JumpError::BreakOutsideLoop)?,
            Some(name) => self.find_label(name).ok_or_else(|| JumpError::UndefinedLabel(name.to_string()))?,
        };
        match &mut self.records[index] {
            FlowContext::Looping(ctx) => ctx.inits_on_break = ctx.inits_on_break.merged_with(info),
            FlowContext::Label(ctx) => ctx.inits_on_break = ctx.inits_on_break.merged_with(info),
        }
        Ok(())
    }

    pub fn record_continue(&mut self, label: Option<&str>, info: &FlowInfo) -> Result<(), JumpError> {
        let index = self.continue_target(label)?;
        if let FlowContext::Looping(ctx) = &mut self.records[index] {
            ctx.inits_on_continue = ctx.inits_on_continue.merged_with(info);
        }
        Ok(())
    }

    /// Index of the loop a `continue` resumes. A labeled continue resumes
    /// the loop the label is attached to.
    fn continue_target(&self, label: Option<&str>) -> Result<usize, JumpError> {
        match label {
            None => self.innermost_looping_index().ok_or(JumpError::ContinueOutsideLoop),
            Some(name) => {
                let index = self.find_label(name).ok_or_else(|| JumpError::UndefinedLabel(name.to_string()))?;
                let FlowContext::Label(label_ctx) = &self.records[index] else {
                    return Err(JumpError::UndefinedLabel(name.to_string()));
                };
                match self.records.get(index + 1) {
                    Some(FlowContext::Looping(_)) if label_ctx.labels_loop => Ok(index + 1),
                    _ => Err(JumpError::NotALoop(name.to_string())),
                }
            }
        }
    }

    /// Defer the check of an assignment to a final local into every
    /// enclosing loop that does not declare it: a loop that runs again may
    /// assign it twice.
    pub fn record_setting_final(&mut self, local: LocalId, declared_in: ScopeId, span: Span, scopes: &MethodScope) {
        for record in self.records.iter_mut().rev() {
            if let FlowContext::Looping(ctx) = record {
                if scopes.is_within(declared_in, ctx.scope) {
                    break;
                }
                ctx.deferred_finals.push((local, span));
            }
        }
    }

    /// Defer a dereference of a local declared outside the innermost loop.
    /// Outside any loop, or for a local of the innermost loop, an unknown
    /// status is final and nothing is recorded.
    pub fn record_using_null_reference(
        &mut self,
        local: LocalId,
        declared_in: ScopeId,
        span: Span,
        scopes: &MethodScope,
    ) {
        let Some(FlowContext::Looping(ctx)) = self
            .records
            .iter_mut()
            .rev()
            .find(|r| matches!(r, FlowContext::Looping(_)))
        else {
            return;
        };
        if !scopes.is_within(declared_in, ctx.scope) {
            ctx.deferred_nulls.push((local, span));
        }
    }
}

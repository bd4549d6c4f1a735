use crate::ast::ForeachStmt;
use crate::codegen::instr::{ArrayKind, Cond, Instr, InvokeKind, Label, MethodRef};
use crate::codegen::lower::{Generator, JumpTarget};
use crate::diagnostics::CompileError;
use crate::flow::{FlowInfo, StateIndex};
use crate::span::Span;
use crate::typeck::resolver::TypeResolver;
use crate::typeck::scope::ScopeId;
use crate::typeck::types::Type;

use super::{Classification, ElementConversion, LoopKind, LoopResolution};

struct LoopLabels {
    action: Label,
    condition: Label,
    exit: Label,
    /// Only when the loop branches back from the bottom.
    next: Option<Label>,
}

impl<'c, 'a> Generator<'c, 'a> {
    /// Lower a for-each loop. `upper` is the scope enclosing the loop.
    ///
    /// With a continue target the test sits at the bottom and the entry
    /// jumps to it; otherwise the body runs at most once and the test is
    /// emitted before it.
    pub(crate) fn generate_foreach(
        &mut self,
        node: &ForeachStmt,
        span: Span,
        upper: ScopeId,
    ) -> Result<(), CompileError> {
        if !node.info.reachable {
            return Ok(());
        }
        let resolution = match &node.info.classification {
            Classification::Resolved(resolution) => resolution,
            Classification::Invalid => return Ok(()),
            Classification::Pending => {
                return Err(CompileError::codegen(format!(
                    "for-each over '{}' reached code generation unresolved",
                    node.element.name.node
                )));
            }
        };
        let scope = node
            .info
            .scope
            .ok_or_else(|| CompileError::codegen("for-each loop has no scope"))?;
        let element = node
            .element
            .binding
            .ok_or_else(|| {
                CompileError::codegen(format!("local '{}' was never bound", node.element.name.node))
            })?;
        let element_slot = self.ctx.local(element).slot;
        let has_empty_action = node.has_empty_action();
        let pc = self.code.position();

        // Nothing observes the elements: evaluate the array for its side
        // effects only.
        if has_empty_action && element_slot.is_none() && resolution.kind.is_array() {
            self.generate_expr(&node.collection, false)?;
            self.code.exit_user_scope(scope);
            self.restore_variables(upper, node.info.merged_state);
            self.code.record_positions_from(pc, span);
            return Ok(());
        }

        self.generate_expr(&node.collection, true)?;
        let continue_target = node.info.continue_target;
        self.generate_loop_init(&resolution.kind, continue_target)?;

        let action = self.code.new_label();
        let condition = self.code.new_label();
        let exit = self.code.new_label();
        let next = continue_target.then(|| self.code.new_label());
        let labels = LoopLabels { action, condition, exit, next };

        if labels.next.is_none() {
            self.code.place(labels.condition);
            let condition_pc = self.code.position();
            match &resolution.kind {
                LoopKind::Array { .. } => {
                    self.code.emit(Instr::ArrayLength);
                    self.code.emit(Instr::If(Cond::Eq, labels.exit));
                }
                LoopKind::RawIterable { iterator, .. }
                | LoopKind::GenericIterable { iterator, .. } => {
                    self.code.load(*iterator)?;
                    self.emit_has_next();
                    self.code.emit(Instr::If(Cond::Eq, labels.exit));
                }
            }
            self.code.record_positions_from(condition_pc, node.element.name.span);
        } else {
            self.code.emit(Instr::Goto(labels.condition));
        }

        self.code.place(labels.action);
        self.generate_next_element(node, resolution, scope)?;

        if !has_empty_action && node.info.action_reachable {
            if let Some(action) = &node.action {
                self.targets.push(JumpTarget::Loop {
                    break_label: labels.exit,
                    continue_label: labels.next,
                });
                let result = self.generate_stmt(action, scope);
                self.targets.pop();
                result?;
            }
        }
        self.code.remove_variable(element);
        if let Some(post) = self.flow_state(node.info.post_collection_state) {
            self.code.remove_not_definitely_assigned_variables(upper, post);
        }

        if let Some(next) = labels.next {
            self.code.place(next);
            let continuation_pc = self.code.position();
            match &resolution.kind {
                LoopKind::Array { index, bound, .. } => {
                    if !has_empty_action || element_slot.is_some() {
                        self.code.iinc(*index, 1)?;
                    }
                    self.code.place(labels.condition);
                    self.code.load(*index)?;
                    self.code.load(*bound)?;
                    self.code.emit(Instr::IfICmp(Cond::Lt, labels.action));
                }
                LoopKind::RawIterable { iterator, .. }
                | LoopKind::GenericIterable { iterator, .. } => {
                    self.code.place(labels.condition);
                    self.code.load(*iterator)?;
                    self.emit_has_next();
                    self.code.emit(Instr::If(Cond::Ne, labels.action));
                }
            }
            self.code.record_positions_from(continuation_pc, node.element.name.span);
        }

        for id in resolution.kind.synthetics() {
            self.code.remove_variable(id);
        }
        self.code.exit_user_scope(scope);
        self.restore_variables(upper, node.info.merged_state);
        self.code.place(labels.exit);
        self.code.record_positions_from(pc, span);
        tracing::trace!(
            kind = resolution.kind.name(),
            continue_target,
            instructions = self.code.position() - pc,
            "lowered for-each loop"
        );
        Ok(())
    }

    fn flow_state(&self, index: Option<StateIndex>) -> Option<&'c FlowInfo> {
        let ctx = self.ctx;
        index.and_then(|i| ctx.flow_states.get(i))
    }

    /// Reset open ranges in `scope` to what is definitely assigned at
    /// `state`.
    fn restore_variables(&mut self, scope: ScopeId, state: Option<StateIndex>) {
        if let Some(flow) = self.flow_state(state) {
            self.code.remove_not_definitely_assigned_variables(scope, flow);
            self.code.add_definitely_assigned_variables(scope, flow);
        }
    }

    /// Stash the collection (on the stack) in the loop's synthetics. An
    /// array loop without a continue target leaves the array on the stack
    /// for the test at the top.
    fn generate_loop_init(
        &mut self,
        kind: &LoopKind,
        continue_target: bool,
    ) -> Result<(), CompileError> {
        match kind {
            LoopKind::Array { index, bound, source } => {
                self.code.store(*source, true)?;
                if continue_target {
                    self.code.emit(Instr::ArrayLength);
                    self.code.store(*bound, false)?;
                    self.code.emit(Instr::IConst(0));
                    self.code.store(*index, false)?;
                }
            }
            LoopKind::RawIterable { iterator, receiver }
            | LoopKind::GenericIterable { iterator, receiver } => {
                let env = self.ctx.env;
                let invoke = if env.is_interface(receiver) {
                    InvokeKind::Interface
                } else {
                    InvokeKind::Virtual
                };
                self.code.emit(Instr::Invoke(
                    invoke,
                    MethodRef::new(
                        env.reference_name(receiver),
                        "iterator",
                        env.method_descriptor(&[], &Type::class("Iterator")),
                    ),
                ));
                self.code.store(*iterator, false)?;
            }
        }
        Ok(())
    }

    /// Fetch the current element into the element local, if it has a slot.
    fn generate_next_element(
        &mut self,
        node: &ForeachStmt,
        resolution: &LoopResolution,
        scope: ScopeId,
    ) -> Result<(), CompileError> {
        let Some(element) = node.element.binding else {
            return Ok(());
        };
        let materialized = self.ctx.local(element).slot.is_some();
        match &resolution.kind {
            LoopKind::Array { index, source, .. } => {
                if !materialized {
                    return Ok(());
                }
                self.code.load(*source)?;
                if self.ctx.local(*index).slot.is_some() {
                    self.code.load(*index)?;
                } else {
                    self.code.emit(Instr::IConst(0));
                }
                self.code.emit(Instr::ArrayLoad(ArrayKind::of(&resolution.element_type)));
                self.generate_element_conversion(resolution.conversion);
            }
            LoopKind::RawIterable { iterator, .. } | LoopKind::GenericIterable { iterator, .. } => {
                let env = self.ctx.env;
                self.code.load(*iterator)?;
                self.code.emit(Instr::Invoke(
                    InvokeKind::Interface,
                    MethodRef::new(
                        env.internal_name("Iterator"),
                        "next",
                        env.method_descriptor(&[], &Type::object()),
                    ),
                ));
                let declared = &self.ctx.local(element).ty;
                if !declared.is_object() {
                    if resolution.conversion == ElementConversion::None {
                        self.code.emit(Instr::CheckCast(env.reference_name(declared)));
                    } else {
                        let boxed = env.reference_name(&resolution.element_type);
                        self.code.emit(Instr::CheckCast(boxed));
                        self.generate_element_conversion(resolution.conversion);
                    }
                }
                if !materialized {
                    self.code.emit(Instr::Pop);
                    return Ok(());
                }
            }
        }
        self.code.store(element, false)?;
        self.code.add_variable(element);
        if let Some(post) = self.flow_state(node.info.post_collection_state) {
            self.code.add_definitely_assigned_variables(scope, post);
        }
        Ok(())
    }

    fn generate_element_conversion(&mut self, conversion: ElementConversion) {
        match conversion {
            ElementConversion::None => {}
            ElementConversion::Widening { from, to } => self.code.convert(from, to),
            ElementConversion::Boxing(p) | ElementConversion::BoxingThenWidening(p) => {
                self.box_primitive(p)
            }
            ElementConversion::Unboxing { from, to } => {
                self.unbox(from);
                self.code.convert(from, to);
            }
        }
    }

    fn emit_has_next(&mut self) {
        let env = self.ctx.env;
        self.code.emit(Instr::Invoke(
            InvokeKind::Interface,
            MethodRef::new(
                env.internal_name("Iterator"),
                "hasNext",
                env.method_descriptor(&[], &Type::boolean()),
            ),
        ));
    }
}

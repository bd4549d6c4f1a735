use std::collections::BTreeMap;

use crate::diagnostics::CompileError;
use crate::flow::FlowInfo;
use crate::span::Span;
use crate::typeck::scope::{LocalId, MethodScope, ScopeId};
use crate::typeck::types::PrimitiveType;

use super::instr::{Instr, Label, LocalVariableRange, MethodCode, ValueKind};

/// Instruction buffer for one method. Tracks label offsets, live ranges of
/// locals, and source positions alongside the instructions.
pub struct CodeStream<'s> {
    scope: &'s MethodScope,
    instructions: Vec<Instr>,
    labels: Vec<Option<usize>>,
    /// Ranges with whether they belong in the local variable table.
    ranges: Vec<(LocalVariableRange, bool)>,
    /// Locals with an open range, to the index of that range.
    live: BTreeMap<LocalId, usize>,
    positions: Vec<(usize, Span)>,
}

impl<'s> CodeStream<'s> {
    pub fn new(scope: &'s MethodScope) -> Self {
        Self {
            scope,
            instructions: Vec::new(),
            labels: Vec::new(),
            ranges: Vec::new(),
            live: BTreeMap::new(),
            positions: Vec::new(),
        }
    }

    /// Offset of the next instruction.
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    pub fn emit(&mut self, instr: Instr) {
        self.instructions.push(instr);
    }

    pub fn instructions(&self) -> &[Instr] {
        &self.instructions
    }

    // ── Labels ───────────────────────────────────────────────────────────

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    /// Bind `label` to the next instruction.
    pub fn place(&mut self, label: Label) {
        let pc = self.position();
        if let Some(slot) = self.labels.get_mut(label.0 as usize) {
            *slot = Some(pc);
        }
    }

    /// The last instruction never falls through and no label makes the
    /// next offset reachable.
    pub fn is_terminated(&self) -> bool {
        let pc = self.position();
        let ends_abruptly = matches!(self.instructions.last(), Some(Instr::Goto(_) | Instr::Return(_)));
        ends_abruptly && !self.labels.iter().any(|l| *l == Some(pc))
    }

    // ── Locals ───────────────────────────────────────────────────────────

    fn slot_of(&self, id: LocalId) -> Result<(u16, ValueKind), CompileError> {
        let local = self.scope.local(id);
        let slot = local.slot.ok_or_else(|| {
            CompileError::codegen(format!("local '{}' has no frame slot", local.name.trim()))
        })?;
        Ok((slot, ValueKind::of(&local.ty)))
    }

    pub fn load(&mut self, id: LocalId) -> Result<(), CompileError> {
        let (slot, kind) = self.slot_of(id)?;
        self.emit(Instr::Load(kind, slot));
        Ok(())
    }

    /// Store the value on top of the stack, leaving a copy when
    /// `value_required`. A store opens the local's range.
    pub fn store(&mut self, id: LocalId, value_required: bool) -> Result<(), CompileError> {
        let (slot, kind) = self.slot_of(id)?;
        if value_required {
            self.emit(if kind.is_wide() { Instr::Dup2 } else { Instr::Dup });
        }
        self.emit(Instr::Store(kind, slot));
        self.add_variable(id);
        Ok(())
    }

    pub fn iinc(&mut self, id: LocalId, delta: i16) -> Result<(), CompileError> {
        let (slot, _) = self.slot_of(id)?;
        self.emit(Instr::IInc(slot, delta));
        Ok(())
    }

    /// Primitive conversion; nothing when both share a computational kind.
    pub fn convert(&mut self, from: PrimitiveType, to: PrimitiveType) {
        let (from, to) = (ValueKind::of_primitive(from), ValueKind::of_primitive(to));
        if from != to {
            self.emit(Instr::Convert(from, to));
        }
    }

    pub fn pop_value(&mut self, kind: ValueKind) {
        self.emit(if kind.is_wide() { Instr::Pop2 } else { Instr::Pop });
    }

    // ── Live ranges ──────────────────────────────────────────────────────

    /// Open the range of a materialized local at the current offset.
    /// Synthetic locals are live while their loop runs but never reach the
    /// local variable table.
    pub fn add_variable(&mut self, id: LocalId) {
        let local = self.scope.local(id);
        let Some(slot) = local.slot else {
            return;
        };
        if self.live.contains_key(&id) {
            return;
        }
        let start = self.position();
        let range = LocalVariableRange { name: local.name.clone(), slot, start, end: start };
        self.ranges.push((range, !local.is_synthetic));
        self.live.insert(id, self.ranges.len() - 1);
    }

    pub fn remove_variable(&mut self, id: LocalId) {
        if let Some(range) = self.live.remove(&id) {
            self.ranges[range].0.end = self.position();
        }
    }

    /// Close every local declared in `scope` or a scope nested in it.
    pub fn exit_user_scope(&mut self, scope: ScopeId) {
        let leaving: Vec<LocalId> = self
            .live
            .keys()
            .copied()
            .filter(|id| self.scope.is_within(self.scope.local(*id).scope, scope))
            .collect();
        for id in leaving {
            self.remove_variable(id);
        }
    }

    fn tracks_range(&self, id: LocalId, scope: ScopeId) -> bool {
        let local = self.scope.local(id);
        local.slot.is_some() && !local.is_synthetic && !local.is_param && self.scope.is_within(scope, local.scope)
    }

    /// Open ranges for source locals visible in `scope` that `flow` shows
    /// definitely assigned.
    pub fn add_definitely_assigned_variables(&mut self, scope: ScopeId, flow: &FlowInfo) {
        if flow.is_unreachable() {
            return;
        }
        let opening: Vec<LocalId> = self
            .scope
            .locals()
            .map(|(id, _)| id)
            .filter(|id| self.tracks_range(*id, scope) && !self.live.contains_key(id) && flow.is_definitely_assigned(*id))
            .collect();
        for id in opening {
            self.add_variable(id);
        }
    }

    /// Close ranges of source locals that `flow` does not show definitely
    /// assigned.
    pub fn remove_not_definitely_assigned_variables(&mut self, scope: ScopeId, flow: &FlowInfo) {
        let closing: Vec<LocalId> = self
            .live
            .keys()
            .copied()
            .filter(|id| self.tracks_range(*id, scope) && !flow.is_definitely_assigned(*id))
            .collect();
        for id in closing {
            self.remove_variable(id);
        }
    }

    pub fn is_live(&self, id: LocalId) -> bool {
        self.live.contains_key(&id)
    }

    // ── Positions ────────────────────────────────────────────────────────

    /// Attribute the code emitted since `start` to `span`.
    pub fn record_positions_from(&mut self, start: usize, span: Span) {
        if self.position() > start {
            self.positions.push((start, span));
        }
    }

    pub fn finish(mut self, name: &str) -> Result<MethodCode, CompileError> {
        let open: Vec<LocalId> = self.live.keys().copied().collect();
        for id in open {
            self.remove_variable(id);
        }
        let labels = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, pc)| pc.ok_or_else(|| CompileError::codegen(format!("label L{i} was never placed in '{name}'"))))
            .collect::<Result<Vec<_>, _>>()?;
        let mut local_variables: Vec<LocalVariableRange> = self
            .ranges
            .into_iter()
            .filter(|(r, tabled)| *tabled && r.end > r.start)
            .map(|(r, _)| r)
            .collect();
        local_variables.sort_by_key(|r| (r.slot, r.start));
        self.positions.sort_by_key(|(pc, _)| *pc);
        Ok(MethodCode {
            name: name.to_string(),
            instructions: self.instructions,
            labels,
            max_locals: self.scope.max_locals(),
            local_variables,
            positions: self.positions,
        })
    }
}

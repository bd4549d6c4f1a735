use crate::span::Span;

use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

impl LocalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UseFlag {
    #[default]
    Unused,
    Used,
}

/// A local variable binding. Synthetic locals carry names no source
/// identifier can spell, so name lookup never finds them.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub name: String,
    pub ty: Type,
    pub scope: ScopeId,
    pub is_final: bool,
    pub is_param: bool,
    pub is_synthetic: bool,
    pub use_flag: UseFlag,
    /// Assigned after flow analysis; `None` means the local is never
    /// materialized in the frame.
    pub slot: Option<u16>,
    pub span: Span,
}

impl LocalVariable {
    pub fn new(name: impl Into<String>, ty: Type, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            scope: MethodScope::ROOT,
            is_final: false,
            is_param: false,
            is_synthetic: false,
            use_flag: UseFlag::Unused,
            slot: None,
            span,
        }
    }

    pub fn synthetic(name: &str, ty: Type, span: Span) -> Self {
        Self { is_synthetic: true, ..Self::new(name, ty, span) }
    }

    /// Slots taken in the frame.
    pub fn width(&self) -> u16 {
        if self.ty.is_wide() { 2 } else { 1 }
    }

    pub fn is_used(&self) -> bool {
        self.use_flag == UseFlag::Used
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockScope {
    pub parent: Option<ScopeId>,
    pub locals: Vec<LocalId>,
    pub children: Vec<ScopeId>,
}

/// Block-scope tree and local-variable arena of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodScope {
    locals: Vec<LocalVariable>,
    scopes: Vec<BlockScope>,
    max_locals: u16,
}

impl Default for MethodScope {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodScope {
    /// Holds the parameters and the method body's own declarations.
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn new() -> Self {
        Self {
            locals: Vec::new(),
            scopes: vec![BlockScope::default()],
            max_locals: 0,
        }
    }

    pub fn new_block(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(BlockScope { parent: Some(parent), ..BlockScope::default() });
        self.scopes[parent.index()].children.push(id);
        id
    }

    pub fn declare(&mut self, scope: ScopeId, mut local: LocalVariable) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        local.scope = scope;
        self.locals.push(local);
        self.scopes[scope.index()].locals.push(id);
        id
    }

    /// Innermost visible local named `name`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<LocalId> {
        let mut current = Some(scope);
        while let Some(s) = current {
            let block = &self.scopes[s.index()];
            if let Some(id) = block.locals.iter().rev().find(|id| self.locals[id.index()].name == name) {
                return Some(*id);
            }
            current = block.parent;
        }
        None
    }

    pub fn local(&self, id: LocalId) -> &LocalVariable {
        &self.locals[id.index()]
    }

    pub fn local_mut(&mut self, id: LocalId) -> &mut LocalVariable {
        &mut self.locals[id.index()]
    }

    pub fn locals(&self) -> impl Iterator<Item = (LocalId, &LocalVariable)> {
        self.locals.iter().enumerate().map(|(i, l)| (LocalId(i as u32), l))
    }

    pub fn scope(&self, id: ScopeId) -> &BlockScope {
        &self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    pub fn mark_used(&mut self, id: LocalId) {
        self.locals[id.index()].use_flag = UseFlag::Used;
    }

    /// Whether `scope` is `ancestor` or nested inside it.
    pub fn is_within(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(s) = current {
            if s == ancestor {
                return true;
            }
            current = self.scopes[s.index()].parent;
        }
        false
    }

    /// Whether the local gets a frame slot. Synthetic locals need an actual
    /// use; user locals are kept on request.
    pub fn is_materialized(&self, id: LocalId, preserve_unused: bool) -> bool {
        let local = self.local(id);
        local.is_param || local.is_used() || (preserve_unused && !local.is_synthetic)
    }

    /// Assign frame slots: a scope's materialized locals in declaration
    /// order, then each child scope starting at the same offset, so sibling
    /// scopes share slots. Returns the frame size.
    pub fn compute_local_variable_positions(&mut self, preserve_unused: bool) -> u16 {
        let max = self.assign_slots(Self::ROOT, 0, preserve_unused);
        self.max_locals = max;
        max
    }

    fn assign_slots(&mut self, scope: ScopeId, offset: u16, preserve_unused: bool) -> u16 {
        let mut next = offset;
        let locals = self.scopes[scope.index()].locals.clone();
        for id in locals {
            if self.is_materialized(id, preserve_unused) {
                let local = &mut self.locals[id.index()];
                local.slot = Some(next);
                next += local.width();
            } else {
                self.locals[id.index()].slot = None;
            }
        }
        let mut max = next;
        let children = self.scopes[scope.index()].children.clone();
        for child in children {
            max = max.max(self.assign_slots(child, next, preserve_unused));
        }
        max
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }
}

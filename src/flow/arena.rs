use crate::typeck::scope::LocalId;

use super::FlowInfo;

/// Handle to a recorded flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateIndex(u32);

/// Method-level store of flow checkpoints. Code generation reads them back
/// to decide which locals are live at loop entry and exit.
#[derive(Debug, Default, Clone)]
pub struct FlowArena {
    states: Vec<FlowInfo>,
}

impl FlowArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, info: &FlowInfo) -> StateIndex {
        let index = StateIndex(self.states.len() as u32);
        tracing::trace!(index = index.0, reachable = info.is_reachable(), "recorded flow checkpoint");
        self.states.push(info.clone());
        index
    }

    pub fn get(&self, index: StateIndex) -> Option<&FlowInfo> {
        self.states.get(index.0 as usize)
    }

    pub fn is_definitely_assigned(&self, index: StateIndex, id: LocalId) -> bool {
        self.get(index).is_some_and(|info| info.is_definitely_assigned(id))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

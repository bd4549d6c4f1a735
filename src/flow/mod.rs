//! Forward flow facts: definite and potential assignment, nullness of
//! reference locals, and reachability.

pub mod analyze;
pub mod arena;
pub mod context;

use std::collections::BTreeMap;

pub use analyze::analyze_method;
pub use arena::{FlowArena, StateIndex};

use crate::typeck::scope::LocalId;

/// Growable bitset over local ids. Bits past the stored words are zero.
#[derive(Debug, Clone, Default)]
pub struct VarSet {
    words: Vec<u64>,
}

impl VarSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: LocalId) {
        let (word, bit) = (id.index() >> 6, id.index() & 63);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    pub fn contains(&self, id: LocalId) -> bool {
        let (word, bit) = (id.index() >> 6, id.index() & 63);
        self.words.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }

    pub fn union_with(&mut self, other: &VarSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    pub fn intersect_with(&mut self, other: &VarSet) {
        for (i, w) in self.words.iter_mut().enumerate() {
            *w &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl PartialEq for VarSet {
    fn eq(&self, other: &Self) -> bool {
        let n = self.words.len().max(other.words.len());
        (0..n).all(|i| self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0))
    }
}

impl Eq for VarSet {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullStatus {
    #[default]
    Unknown,
    Null,
    NonNull,
    /// Null on at least one incoming path.
    PotentiallyNull,
}

impl NullStatus {
    /// Status where two paths meet.
    pub fn join(self, other: NullStatus) -> NullStatus {
        use NullStatus::*;
        if self == other {
            return self;
        }
        match (self, other) {
            (Null | PotentiallyNull, _) | (_, Null | PotentiallyNull) => PotentiallyNull,
            _ => Unknown,
        }
    }
}

/// Flow facts at one program point. An unreachable state treats every
/// local as definitely assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowInfo {
    reachable: bool,
    definite: VarSet,
    potential: VarSet,
    /// Only locals with a known status; absent means `Unknown`.
    nulls: BTreeMap<LocalId, NullStatus>,
}

impl FlowInfo {
    /// Reachable, nothing assigned.
    pub fn initial() -> Self {
        Self {
            reachable: true,
            definite: VarSet::new(),
            potential: VarSet::new(),
            nulls: BTreeMap::new(),
        }
    }

    /// The state after an abrupt exit.
    pub fn dead_end() -> Self {
        Self { reachable: false, ..Self::initial() }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn is_unreachable(&self) -> bool {
        !self.reachable
    }

    /// Unreachable and carrying no assignments.
    pub fn is_dead_end(&self) -> bool {
        !self.reachable && self.definite.is_empty() && self.potential.is_empty() && self.nulls.is_empty()
    }

    pub fn set_unreachable(&mut self) {
        self.reachable = false;
    }

    pub fn mark_as_definitely_assigned(&mut self, id: LocalId) {
        self.definite.insert(id);
        self.potential.insert(id);
    }

    pub fn is_definitely_assigned(&self, id: LocalId) -> bool {
        !self.reachable || self.definite.contains(id)
    }

    pub fn is_potentially_assigned(&self, id: LocalId) -> bool {
        self.potential.contains(id)
    }

    pub fn null_status(&self, id: LocalId) -> NullStatus {
        self.nulls.get(&id).copied().unwrap_or_default()
    }

    pub fn mark_null_status(&mut self, id: LocalId, status: NullStatus) {
        if status == NullStatus::Unknown {
            self.nulls.remove(&id);
        } else {
            self.nulls.insert(id, status);
        }
    }

    /// Copy with assignment facts only.
    pub fn null_info_less_copy(&self) -> Self {
        Self { nulls: BTreeMap::new(), ..self.clone() }
    }

    /// State where this path and `other` meet. An unreachable side only
    /// contributes potential assignments.
    pub fn merged_with(&self, other: &FlowInfo) -> FlowInfo {
        match (self.reachable, other.reachable) {
            (true, true) => {
                let mut merged = self.clone();
                merged.definite.intersect_with(&other.definite);
                merged.potential.union_with(&other.potential);
                merged.nulls = join_nulls(&self.nulls, &other.nulls);
                merged
            }
            (true, false) => {
                let mut merged = self.clone();
                merged.potential.union_with(&other.potential);
                merged
            }
            (false, true) => {
                let mut merged = other.clone();
                merged.potential.union_with(&self.potential);
                merged
            }
            (false, false) => {
                let mut merged = self.clone();
                merged.definite.intersect_with(&other.definite);
                merged.potential.union_with(&other.potential);
                merged.nulls.clear();
                merged
            }
        }
    }

    /// Add what `other` assigns. Reachability of `self` is kept; nullness
    /// known on a reachable `other` overrides.
    pub fn add_initializations_from(&mut self, other: &FlowInfo) {
        if other.is_dead_end() {
            return;
        }
        self.definite.union_with(&other.definite);
        self.potential.union_with(&other.potential);
        if other.reachable {
            for (id, status) in &other.nulls {
                self.nulls.insert(*id, *status);
            }
        }
    }

    /// Add what `other` might assign, and the nullness it might produce.
    pub fn add_potential_initializations_from(&mut self, other: &FlowInfo) {
        self.potential.union_with(&other.potential);
        if !other.reachable {
            return;
        }
        for (id, theirs) in &other.nulls {
            let ours = self.null_status(*id);
            let combined = match (ours, *theirs) {
                (NullStatus::Null, NullStatus::Null) => NullStatus::Null,
                (_, NullStatus::Null | NullStatus::PotentiallyNull) => NullStatus::PotentiallyNull,
                (NullStatus::Null, NullStatus::NonNull) => NullStatus::PotentiallyNull,
                (ours, _) => ours,
            };
            self.mark_null_status(*id, combined);
        }
    }
}

fn join_nulls(
    a: &BTreeMap<LocalId, NullStatus>,
    b: &BTreeMap<LocalId, NullStatus>,
) -> BTreeMap<LocalId, NullStatus> {
    let mut joined = BTreeMap::new();
    for id in a.keys().chain(b.keys()) {
        let status = a.get(id).copied().unwrap_or_default().join(b.get(id).copied().unwrap_or_default());
        if status != NullStatus::Unknown {
            joined.insert(*id, status);
        }
    }
    joined
}

/// Merge two branch states. A branch marked optimized is known never to be
/// taken: its state only contributes potential assignments, and when it is
/// a dead end and `allow_fake_dead_branch` holds, the other branch is kept
/// but marked unreachable.
pub fn merge_branches(
    a: FlowInfo,
    a_optimized: bool,
    b: FlowInfo,
    b_optimized: bool,
    allow_fake_dead_branch: bool,
) -> FlowInfo {
    if a_optimized {
        if a.is_dead_end() && allow_fake_dead_branch {
            let mut merged = b;
            merged.set_unreachable();
            return merged;
        }
        let mut merged = a;
        merged.add_potential_initializations_from(&b);
        return merged;
    }
    if b_optimized {
        if b.is_dead_end() && allow_fake_dead_branch {
            let mut merged = a;
            merged.set_unreachable();
            return merged;
        }
        let mut merged = b;
        merged.add_potential_initializations_from(&a);
        return merged;
    }
    a.merged_with(&b)
}

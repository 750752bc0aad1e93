//! Configured operator pool.

use {
    studybot_common::OperatorId,
    studybot_config::HandoffConfig,
    tracing::warn,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    id: OperatorId,
    name: Option<String>,
    capacity: usize,
}

/// Ordered list of eligible operators with their concurrency caps.
///
/// Iteration order is configuration order and is the routing tie-break.
/// Immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorDirectory {
    slots: Vec<Slot>,
}

impl OperatorDirectory {
    /// Build from `(operator, capacity)` pairs. Later duplicates are dropped.
    pub fn new(operators: impl IntoIterator<Item = (OperatorId, usize)>) -> Self {
        let mut dir = Self::default();
        for (id, capacity) in operators {
            dir.push(id, None, capacity);
        }
        dir
    }

    pub fn from_config(config: &HandoffConfig) -> Self {
        let mut dir = Self::default();
        for entry in &config.operators {
            let capacity = entry.max_active.unwrap_or(config.max_active_per_operator);
            dir.push(entry.id, entry.name.clone(), capacity);
        }
        dir
    }

    fn push(&mut self, id: OperatorId, name: Option<String>, capacity: usize) {
        if self.contains(id) {
            warn!(operator_id = %id, "duplicate operator in directory, ignoring");
            return;
        }
        self.slots.push(Slot { id, name, capacity });
    }

    /// Operators in tie-break order.
    pub fn operators(&self) -> impl Iterator<Item = OperatorId> + '_ {
        self.slots.iter().map(|s| s.id)
    }

    /// Max concurrent bindings; zero for identities outside the directory.
    pub fn capacity(&self, operator: OperatorId) -> usize {
        self.slot(operator).map_or(0, |s| s.capacity)
    }

    pub fn contains(&self, operator: OperatorId) -> bool {
        self.slot(operator).is_some()
    }

    pub fn display_name(&self, operator: OperatorId) -> Option<&str> {
        self.slot(operator).and_then(|s| s.name.as_deref())
    }

    pub fn total_capacity(&self) -> usize {
        self.slots.iter().map(|s| s.capacity).sum()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, operator: OperatorId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == operator)
    }
}

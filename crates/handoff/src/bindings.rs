//! User ↔ operator binding table.
//!
//! One map keyed by user is the only stored relation. Per-operator views
//! (`users_of`, `load`) are computed from it on demand so they cannot drift.

use std::collections::HashMap;

use {
    chrono::{DateTime, Utc},
    studybot_common::{OperatorId, UserId},
};

use crate::{Error, Result};

/// An active user/operator pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub user_id: UserId,
    pub operator_id: OperatorId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct BindingTable {
    by_user: HashMap<UserId, Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a binding. `capacity` is the operator's cap, re-checked here.
    pub fn bind(
        &mut self,
        user: UserId,
        operator: OperatorId,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> Result<Binding> {
        if let Some(existing) = self.by_user.get(&user) {
            return Err(Error::AlreadyBound {
                user,
                operator: existing.operator_id,
            });
        }
        if self.load(operator) >= capacity {
            return Err(Error::CapacityExceeded { operator, capacity });
        }
        let binding = Binding {
            user_id: user,
            operator_id: operator,
            created_at: now,
        };
        self.by_user.insert(user, binding.clone());
        Ok(binding)
    }

    /// Remove the user's binding. A second call reports `NotBound` and changes nothing.
    pub fn unbind(&mut self, user: UserId) -> Result<Binding> {
        self.by_user
            .remove(&user)
            .ok_or(Error::NotBound { user })
    }

    /// Remove `binding` only if it is still the user's current one.
    pub fn remove_exact(&mut self, binding: &Binding) -> bool {
        if self.by_user.get(&binding.user_id) == Some(binding) {
            self.by_user.remove(&binding.user_id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, user: UserId) -> Option<&Binding> {
        self.by_user.get(&user)
    }

    pub fn operator_of(&self, user: UserId) -> Option<OperatorId> {
        self.by_user.get(&user).map(|b| b.operator_id)
    }

    /// Users bound to `operator`, oldest binding first.
    pub fn users_of(&self, operator: OperatorId) -> Vec<UserId> {
        let mut bound: Vec<&Binding> = self
            .by_user
            .values()
            .filter(|b| b.operator_id == operator)
            .collect();
        bound.sort_by_key(|b| (b.created_at, b.user_id));
        bound.into_iter().map(|b| b.user_id).collect()
    }

    /// Current workload of `operator`.
    pub fn load(&self, operator: OperatorId) -> usize {
        self.by_user
            .values()
            .filter(|b| b.operator_id == operator)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.by_user.values()
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}

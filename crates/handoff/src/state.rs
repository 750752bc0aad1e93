//! The hand-off state machine, free of I/O.
//!
//! All methods take `&mut self`; the coordinator wraps one instance in a
//! mutex so each call is one atomic step.

use {
    chrono::{DateTime, Utc},
    studybot_common::{OperatorId, UserId},
    tracing::{debug, info},
};

use crate::{Binding, BindingTable, Error, OperatorDirectory, QueueEntry, Result, WaitQueue, route};

/// What happened to a hand-off request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Bound(Binding),
    Queued { position: usize },
}

/// One operator's view, for `/stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorStats {
    pub operator_id: OperatorId,
    pub active: usize,
    pub capacity: usize,
    /// Users currently bound to this operator, oldest first.
    pub users: Vec<UserId>,
    /// Users waiting for any operator.
    pub queued: usize,
}

impl OperatorStats {
    pub fn render(&self) -> String {
        let mut out = format!(
            "📊 Your conversations: {}/{}\n⏳ Waiting in queue: {}",
            self.active, self.capacity, self.queued
        );
        if !self.users.is_empty() {
            out.push_str("\n\nActive users:");
            for user in &self.users {
                out.push_str(&format!("\n• {user}  /reply_{user}  /end_{user}"));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorLoad {
    pub operator_id: OperatorId,
    pub load: usize,
    pub capacity: usize,
}

/// Point-in-time copy of the whole state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffSnapshot {
    pub operators: Vec<OperatorLoad>,
    pub bindings: Vec<Binding>,
    pub queue: Vec<UserId>,
}

#[derive(Debug)]
pub struct HandoffState {
    directory: OperatorDirectory,
    bindings: BindingTable,
    queue: WaitQueue,
}

impl HandoffState {
    pub fn new(directory: OperatorDirectory) -> Self {
        Self {
            directory,
            bindings: BindingTable::new(),
            queue: WaitQueue::new(),
        }
    }

    pub fn directory(&self) -> &OperatorDirectory {
        &self.directory
    }

    pub fn operator_of(&self, user: UserId) -> Option<OperatorId> {
        self.bindings.operator_of(user)
    }

    pub fn queue_position(&self, user: UserId) -> Option<usize> {
        self.queue.position(user)
    }

    pub fn has_waiting(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn binding_of(&self, user: UserId) -> Option<Binding> {
        self.bindings.get(user).cloned()
    }

    /// Route and bind, or queue when nobody has room.
    ///
    /// While anyone is waiting, newcomers join behind them even if a slot is
    /// free; only [`sweep`](Self::sweep) binds from the queue, in order. A
    /// user who is already queued keeps their place.
    pub fn request(&mut self, user: UserId, now: DateTime<Utc>) -> Result<RequestOutcome> {
        if let Some(operator) = self.bindings.operator_of(user) {
            return Err(Error::AlreadyBound { user, operator });
        }
        if !self.queue.is_empty() {
            let position = self.queue.enqueue(user, now);
            debug!(user_id = %user, position, "users already waiting, queued behind them");
            return Ok(RequestOutcome::Queued { position });
        }
        match self.try_bind(user, now) {
            Ok(binding) => Ok(RequestOutcome::Bound(binding)),
            Err(Error::NoOperatorAvailable) => {
                let position = self.queue.enqueue(user, now);
                debug!(user_id = %user, position, "no operator available, queued");
                Ok(RequestOutcome::Queued { position })
            },
            Err(e) => Err(e),
        }
    }

    fn try_bind(&mut self, user: UserId, now: DateTime<Utc>) -> Result<Binding> {
        if let Some(operator) = self.bindings.operator_of(user) {
            return Err(Error::AlreadyBound { user, operator });
        }
        let operator = route(&self.directory, &self.bindings).ok_or(Error::NoOperatorAvailable)?;
        let binding = self
            .bindings
            .bind(user, operator, self.directory.capacity(operator), now)?;
        self.queue.dequeue(user);
        info!(user_id = %user, operator_id = %operator, "user bound to operator");
        Ok(binding)
    }

    /// Bind queued users in arrival order until routing finds no capacity.
    ///
    /// Each binding comes with the queue entry it replaced so a failed
    /// notification can put the user back where they were.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<(Binding, QueueEntry)> {
        let mut bound = Vec::new();
        for user in self.queue.peek_all() {
            let Some(entry) = self.queue.entry(user).cloned() else {
                continue;
            };
            match self.try_bind(user, now) {
                Ok(binding) => bound.push((binding, entry)),
                Err(Error::NoOperatorAvailable) => break,
                Err(e) => {
                    // already bound through another path; the queue entry is stale
                    debug!(user_id = %user, error = %e, "dropping stale queue entry");
                    self.queue.dequeue(user);
                },
            }
        }
        bound
    }

    pub fn release(&mut self, user: UserId) -> Result<Binding> {
        let binding = self.bindings.unbind(user)?;
        info!(user_id = %user, operator_id = %binding.operator_id, "binding released");
        Ok(binding)
    }

    /// Release only if `user` is bound to `operator`.
    pub fn release_if(&mut self, user: UserId, operator: OperatorId) -> Option<Binding> {
        if self.bindings.operator_of(user) != Some(operator) {
            return None;
        }
        self.release(user).ok()
    }

    /// Undo a binding whose notification failed. With `requeue` the user goes
    /// back to the head of the queue with their original arrival time.
    pub fn rollback(&mut self, binding: &Binding, requeue: Option<QueueEntry>) -> bool {
        let removed = self.bindings.remove_exact(binding);
        if removed && let Some(entry) = requeue {
            self.queue.push_front(entry);
        }
        removed
    }

    pub fn cancel_wait(&mut self, user: UserId) -> bool {
        self.queue.dequeue(user)
    }

    pub fn take_reminders(&mut self) -> Vec<(UserId, usize)> {
        self.queue.take_unreminded()
    }

    pub fn stats(&self, operator: OperatorId) -> Result<OperatorStats> {
        if !self.directory.contains(operator) {
            return Err(Error::Unauthorized {
                identity: operator.0,
            });
        }
        let users = self.bindings.users_of(operator);
        Ok(OperatorStats {
            operator_id: operator,
            active: users.len(),
            capacity: self.directory.capacity(operator),
            users,
            queued: self.queue.len(),
        })
    }

    pub fn snapshot(&self) -> HandoffSnapshot {
        let mut bindings: Vec<Binding> = self.bindings.iter().cloned().collect();
        bindings.sort_by_key(|b| (b.created_at, b.user_id));
        HandoffSnapshot {
            operators: self
                .directory
                .operators()
                .map(|op| OperatorLoad {
                    operator_id: op,
                    load: self.bindings.load(op),
                    capacity: self.directory.capacity(op),
                })
                .collect(),
            bindings,
            queue: self.queue.peek_all(),
        }
    }

    /// Loads never exceed caps, and no user is both bound and queued.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        for op in self.directory.operators() {
            let users = self.bindings.users_of(op);
            assert_eq!(users.len(), self.bindings.load(op));
            assert!(users.len() <= self.directory.capacity(op), "operator {op} over cap");
            for user in users {
                assert_eq!(self.bindings.operator_of(user), Some(op));
                assert_eq!(self.queue.position(user), None);
            }
        }
    }
}

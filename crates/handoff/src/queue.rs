//! FIFO of users waiting for an operator.

use std::collections::VecDeque;

use {
    chrono::{DateTime, Utc},
    studybot_common::UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub enqueued_at: DateTime<Utc>,
    /// Set once the user has been sent a "still waiting" reminder.
    pub reminded: bool,
}

/// A user appears at most once.
#[derive(Debug, Default)]
pub struct WaitQueue {
    entries: VecDeque<QueueEntry>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the user unless already queued. Returns the 1-based position.
    pub fn enqueue(&mut self, user: UserId, now: DateTime<Utc>) -> usize {
        if let Some(pos) = self.position(user) {
            return pos;
        }
        self.entries.push_back(QueueEntry {
            user_id: user,
            enqueued_at: now,
            reminded: false,
        });
        self.entries.len()
    }

    /// Put a user back at the head, e.g. after a failed hand-off from a sweep.
    pub fn push_front(&mut self, entry: QueueEntry) {
        self.dequeue(entry.user_id);
        self.entries.push_front(entry);
    }

    /// Remove the user. Returns whether they were queued.
    pub fn dequeue(&mut self, user: UserId) -> bool {
        match self.entries.iter().position(|e| e.user_id == user) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            },
            None => false,
        }
    }

    /// 1-based position for display.
    pub fn position(&self, user: UserId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.user_id == user)
            .map(|idx| idx + 1)
    }

    pub fn entry(&self, user: UserId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.user_id == user)
    }

    /// Queued users in arrival order.
    pub fn peek_all(&self) -> Vec<UserId> {
        self.entries.iter().map(|e| e.user_id).collect()
    }

    /// Mark every not-yet-reminded entry and return it with its position.
    pub fn take_unreminded(&mut self) -> Vec<(UserId, usize)> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter(|(_, e)| !e.reminded)
            .map(|(idx, e)| {
                e.reminded = true;
                (e.user_id, idx + 1)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

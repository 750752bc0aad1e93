//! In-memory conversation state per user.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use {
    chrono::{DateTime, Utc},
    studybot_common::UserId,
    studybot_handoff::LeadContext,
};

use crate::{leads, profile::Profile};

/// Oldest lines are dropped past this.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Initial,
    CollectingInfo,
    ShowingResults,
    WaitingForOperator,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub name: Option<String>,
    pub stage: Stage,
    pub profile: Profile,
    pub history: Vec<String>,
    /// Highest interest score seen so far, 0..=10.
    pub interest_score: u8,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            name: None,
            stage: Stage::default(),
            profile: Profile::default(),
            history: Vec::new(),
            interest_score: 0,
            last_activity: Utc::now(),
        }
    }

    pub fn push_history(&mut self, line: impl Into<String>) {
        self.history.push(line.into());
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the user's session, created on first contact.
    pub fn get_or_create(&self, user: UserId) -> Session {
        let mut sessions = self.sessions();
        let session = sessions.entry(user).or_insert_with(|| Session::new(user));
        session.last_activity = Utc::now();
        session.clone()
    }

    /// Mutate the user's session in place and return what `f` returns.
    pub fn update<R>(&self, user: UserId, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions();
        let session = sessions.entry(user).or_insert_with(|| Session::new(user));
        session.last_activity = Utc::now();
        f(session)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

impl LeadContext for SessionStore {
    fn lead_summary(&self, user: UserId) -> String {
        leads::lead_report(&self.get_or_create(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_capped() {
        let mut session = Session::new(UserId(1));
        for i in 0..60 {
            session.push_history(format!("line {i}"));
        }
        assert_eq!(session.history.len(), HISTORY_LIMIT);
        assert_eq!(session.history[0], "line 10");
        assert_eq!(session.history[49], "line 59");
    }

    #[test]
    fn update_persists_and_creates() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let stage = store.update(UserId(7), |s| {
            s.stage = Stage::CollectingInfo;
            s.stage
        });
        assert_eq!(stage, Stage::CollectingInfo);
        assert_eq!(store.get_or_create(UserId(7)).stage, Stage::CollectingInfo);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_or_create_touches_activity() {
        let store = SessionStore::new();
        let first = store.get_or_create(UserId(3)).last_activity;
        let second = store.get_or_create(UserId(3)).last_activity;
        assert!(second >= first);
    }

    #[test]
    fn lead_summary_uses_session() {
        let store = SessionStore::new();
        store.update(UserId(42), |s| {
            s.interest_score = 8;
            s.push_history("User: when to apply?");
        });
        let summary = store.lead_summary(UserId(42));
        assert!(summary.contains("42"));
        assert!(summary.contains("8/10"));
        assert!(summary.contains("when to apply?"));
    }
}

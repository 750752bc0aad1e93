//! In-memory channel and lead context for tests.

use std::{collections::HashSet, sync::Mutex};

use {
    async_trait::async_trait,
    studybot_channels::{ChannelOutbound, InlineKeyboard},
    studybot_common::UserId,
};

use crate::LeadContext;

#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub to: String,
    pub text: String,
    pub buttons: Vec<String>,
}

/// Records every delivered message; chats marked with `fail_for` error out.
#[derive(Default)]
pub(crate) struct RecordingOutbound {
    sent: Mutex<Vec<Sent>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingOutbound {
    pub fn fail_for(&self, chat: impl Into<String>) {
        self.failing.lock().unwrap().insert(chat.into());
    }

    pub fn recover(&self, chat: &str) {
        self.failing.lock().unwrap().remove(chat);
    }

    pub fn sent_to(&self, chat: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.to == chat)
            .map(|s| s.text.clone())
            .collect()
    }

    pub fn last_to(&self, chat: &str) -> Option<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.to == chat)
            .cloned()
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send_text(
        &self,
        to: &str,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> studybot_channels::Result<()> {
        if self.failing.lock().unwrap().contains(to) {
            return Err(studybot_channels::Error::unavailable(format!("chat {to} unreachable")));
        }
        self.sent.lock().unwrap().push(Sent {
            to: to.to_string(),
            text: text.to_string(),
            buttons: keyboard
                .map(|kb| kb.buttons().map(|b| b.callback_data.clone()).collect())
                .unwrap_or_default(),
        });
        Ok(())
    }
}

pub(crate) struct StaticLeads;

impl LeadContext for StaticLeads {
    fn lead_summary(&self, user: UserId) -> String {
        format!("Lead {user}")
    }
}

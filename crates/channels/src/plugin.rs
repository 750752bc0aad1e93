use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    studybot_common::UserId,
};

use crate::Result;

// ── Inbound ─────────────────────────────────────────────────────────────────

/// Who sent an inbound update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub user_id: UserId,
    pub username: Option<String>,
    /// First and last name as shown by the platform.
    pub display_name: Option<String>,
}

impl Sender {
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            username: None,
            display_name: None,
        }
    }

    /// Best human label: display name, then `@username`, then the numeric id.
    #[must_use]
    pub fn label(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        if let Some(username) = &self.username {
            return format!("@{username}");
        }
        self.user_id.to_string()
    }
}

/// A text message (or command) from a private chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: Sender,
    /// Chat to reply into.
    pub chat_id: String,
    pub text: String,
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundCallback {
    pub sender: Sender,
    /// Chat that holds the pressed keyboard, if the platform still knows it.
    pub chat_id: Option<String>,
    pub data: String,
}

/// Receives everything a channel turns into bot input.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    /// A `/command` with the leading slash and any `@botname` suffix removed.
    async fn dispatch_command(&self, command: &str, args: &str, msg: InboundMessage);

    /// Plain text that is not a command.
    async fn dispatch_text(&self, msg: InboundMessage);

    /// Inline button press. The returned text, if any, is shown as a toast.
    async fn dispatch_callback(&self, callback: InboundCallback) -> Option<String>;
}

// ── Outbound ────────────────────────────────────────────────────────────────

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    #[must_use]
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Rows of inline buttons attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyboard with a single button.
    #[must_use]
    pub fn single(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self::new().row(vec![InlineButton::new(label, callback_data)])
    }

    #[must_use]
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    /// Append one button on its own row.
    #[must_use]
    pub fn button(self, label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        self.row(vec![InlineButton::new(label, callback_data)])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, to: &str, text: &str, keyboard: Option<&InlineKeyboard>)
    -> Result<()>;

    /// Send a "typing" indicator. No-op by default.
    async fn send_typing(&self, _to: &str) -> Result<()> {
        Ok(())
    }
}

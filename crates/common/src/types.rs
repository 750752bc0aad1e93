use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

/// Platform account id of an end-user talking to the bot.
///
/// On Telegram a private chat id equals the user id, so the same value
/// addresses both the person and the chat the bot writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Platform account id of a human operator.
///
/// Drawn from configuration at startup and never changed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub i64);

impl UserId {
    /// Chat address used by outbound senders.
    #[must_use]
    pub fn chat(self) -> String {
        self.0.to_string()
    }
}

impl OperatorId {
    #[must_use]
    pub fn chat(self) -> String {
        self.0.to_string()
    }

    /// The same account viewed as a regular bot user.
    #[must_use]
    pub fn as_user(self) -> UserId {
        UserId(self.0)
    }
}

impl From<UserId> for OperatorId {
    fn from(id: UserId) -> Self {
        Self(id.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl FromStr for OperatorId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

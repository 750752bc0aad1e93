use studybot_common::{OperatorId, UserId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Routing found no operator with spare capacity.
    #[error("no operator available")]
    NoOperatorAvailable,

    #[error("user {user} is already talking to operator {operator}")]
    AlreadyBound { user: UserId, operator: OperatorId },

    #[error("user {user} has no active operator conversation")]
    NotBound { user: UserId },

    #[error("operator {operator} is at capacity ({capacity})")]
    CapacityExceeded {
        operator: OperatorId,
        capacity: usize,
    },

    /// A notification to one party could not be delivered. The binding it
    /// belonged to has already been undone.
    #[error("delivery to {to} failed: {source}")]
    DeliveryFailure {
        to: String,
        #[source]
        source: studybot_channels::Error,
    },

    #[error("{identity} is not an operator")]
    Unauthorized { identity: i64 },

    #[error("operators are available {window}")]
    OutsideWorkingHours { window: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn delivery(to: impl Into<String>, source: studybot_channels::Error) -> Self {
        Self::DeliveryFailure {
            to: to.into(),
            source,
        }
    }
}

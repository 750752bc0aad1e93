//! Identifier types shared by the transport, the hand-off core and the consultant.

pub mod types;

pub use types::{OperatorId, UserId};

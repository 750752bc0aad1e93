//! Operator hand-off: who talks to whom, and who waits.
//!
//! The [`HandoffCoordinator`] owns one [`HandoffState`] (directory, binding
//! table, wait queue) behind a single lock. Every read-then-write step
//! (route + bind, unbind + sweep) happens inside that lock; notifications go
//! out after it is released and failed deliveries are compensated by undoing
//! the binding.

pub mod bindings;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod hours;
pub mod queue;
pub mod routing;
pub mod state;

#[cfg(test)]
mod testing;

pub use {
    bindings::{Binding, BindingTable},
    coordinator::{HandoffCoordinator, LeadContext, Party},
    directory::OperatorDirectory,
    error::{Error, Result},
    hours::WorkingHours,
    queue::{QueueEntry, WaitQueue},
    routing::route,
    state::{HandoffSnapshot, HandoffState, OperatorLoad, OperatorStats, RequestOutcome},
};

/// Callback data and command prefixes shared with the dialogue layer.
pub mod actions {
    pub const REPLY_TO_PREFIX: &str = "reply_to_";
    pub const END_CHAT_PREFIX: &str = "end_chat_";
    pub const OPERATOR_STATS: &str = "operator_stats";
    pub const LEAVE_QUEUE: &str = "leave_queue";
    pub const END_OPERATOR_CHAT: &str = "end_operator_chat";
    pub const THANKS_OPERATOR: &str = "thanks_operator";
    pub const CLARIFY_OPERATOR: &str = "clarify_operator";
    pub const RATE_OPERATOR: &str = "rate_operator";
}

//! Telegram transport: long-polling intake and Bot API delivery.
//!
//! Inbound updates become channel events for a `ChannelEventSink`; outbound
//! text goes through [`TelegramOutbound`].

pub mod bot;
pub mod error;
pub mod handlers;
pub mod outbound;

pub use {
    bot::{build_bot, start_polling},
    error::{Error, Result},
    outbound::TelegramOutbound,
};

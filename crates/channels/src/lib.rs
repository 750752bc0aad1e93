//! Channel abstractions between a messaging platform and the bot logic.
//!
//! A platform crate (Telegram) turns updates into [`InboundMessage`] /
//! [`InboundCallback`] values and hands them to a [`ChannelEventSink`]; the bot
//! logic answers through a [`ChannelOutbound`].

pub mod error;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::{
        ChannelEventSink, ChannelOutbound, InboundCallback, InboundMessage, InlineButton,
        InlineKeyboard, Sender,
    },
};

//! Turn Telegram updates into channel events.

use {
    teloxide::{
        prelude::*,
        types::{CallbackQuery, MediaKind, MessageKind, User},
    },
    tracing::{debug, warn},
};

use {
    studybot_channels::{ChannelEventSink, InboundCallback, InboundMessage, Sender},
    studybot_common::UserId,
};

use crate::Result;

/// Dispatch a private-chat message as a command or plain text.
pub async fn handle_message(
    msg: Message,
    bot_username: Option<&str>,
    sink: &dyn ChannelEventSink,
) -> Result<()> {
    if !msg.chat.is_private() {
        debug!(chat_id = msg.chat.id.0, "ignoring message outside a private chat");
        return Ok(());
    }
    let Some(sender) = msg.from.as_ref().and_then(sender_from_user) else {
        debug!(chat_id = msg.chat.id.0, "ignoring message without a sender");
        return Ok(());
    };
    let Some(text) = extract_text(&msg) else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let inbound = InboundMessage {
        sender,
        chat_id: msg.chat.id.0.to_string(),
        text: text.clone(),
    };
    match parse_command(&text, bot_username) {
        Some((command, args)) => sink.dispatch_command(&command, &args, inbound).await,
        None => sink.dispatch_text(inbound).await,
    }
    Ok(())
}

/// Dispatch a button press and answer the query so the spinner stops.
pub async fn handle_callback_query(
    query: CallbackQuery,
    bot: &Bot,
    sink: &dyn ChannelEventSink,
) -> Result<()> {
    let Some(data) = query.data.clone() else {
        bot.answer_callback_query(&query.id).await?;
        return Ok(());
    };
    let Some(sender) = sender_from_user(&query.from) else {
        bot.answer_callback_query(&query.id).await?;
        return Ok(());
    };
    let chat_id = query.message.as_ref().map(|m| m.chat().id.0.to_string());

    let toast = sink
        .dispatch_callback(InboundCallback {
            sender,
            chat_id,
            data,
        })
        .await;

    let answer = bot.answer_callback_query(&query.id);
    let result = match toast {
        Some(text) => answer.text(text).await,
        None => answer.await,
    };
    if let Err(e) = result {
        // the query may have expired while the sink was busy
        warn!(error = %e, "failed to answer callback query");
    }
    Ok(())
}

fn sender_from_user(user: &User) -> Option<Sender> {
    let id = i64::try_from(user.id.0).ok()?;
    Some(sender(
        id,
        &user.first_name,
        user.last_name.as_deref(),
        user.username.as_deref(),
    ))
}

fn sender(id: i64, first_name: &str, last_name: Option<&str>, username: Option<&str>) -> Sender {
    let name = format!("{first_name} {}", last_name.unwrap_or_default())
        .trim()
        .to_string();
    Sender {
        user_id: UserId(id),
        username: username.map(str::to_string),
        display_name: (!name.is_empty()).then_some(name),
    }
}

/// Text content of a message, including media captions.
fn extract_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.clone()),
            MediaKind::Photo(p) => p.caption.clone(),
            MediaKind::Document(d) => d.caption.clone(),
            _ => None,
        },
        _ => None,
    }
}

/// Split `/cmd@bot args` into `("cmd", "args")`.
///
/// Commands addressed to another bot are not ours and come back as `None`.
fn parse_command(text: &str, bot_username: Option<&str>) -> Option<(String, String)> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let command = match head.split_once('@') {
        Some((command, target)) => {
            if bot_username.is_some_and(|me| !me.eq_ignore_ascii_case(target)) {
                return None;
            }
            command
        },
        None => head,
    };
    if command.is_empty() {
        return None;
    }
    Some((command.to_string(), args.to_string()))
}

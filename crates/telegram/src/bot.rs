use std::{sync::Arc, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use studybot_channels::ChannelEventSink;

use crate::{Error, Result, handlers};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Build a bot whose HTTP timeout outlasts the long-polling timeout, so the
/// client doesn't abort the request before Telegram responds.
pub fn build_bot(token: &Secret<String>, poll_timeout_secs: u32) -> Result<Bot> {
    if token.expose_secret().trim().is_empty() {
        return Err(Error::message("telegram token is empty"));
    }
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(poll_timeout_secs) + 15))
        .build()?;
    Ok(Bot::with_client(token.expose_secret(), client))
}

/// Commands shown in the Telegram client's autocomplete.
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Start over"),
        BotCommand::new("help", "What the bot can do"),
        BotCommand::new("operator", "Talk to a person"),
        BotCommand::new("cancel", "Leave the operator queue"),
        BotCommand::new("end", "End the conversation with an operator"),
        BotCommand::new("stats", "Operator: active conversations"),
        BotCommand::new("help_operator", "Operator: command reference"),
    ]
}

/// Verify the token, clear any webhook and start the long-polling loop.
///
/// Updates are handed to `sink` until `cancel` fires. The returned handle
/// completes once the loop has exited.
pub async fn start_polling(
    bot: Bot,
    poll_timeout_secs: u32,
    sink: Arc<dyn ChannelEventSink>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>> {
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // long polling is refused while a webhook is set
    bot.delete_webhook().send().await?;

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?bot_username, "telegram bot connected (webhook cleared)");

    Ok(tokio::spawn(poll_loop(
        bot,
        bot_username,
        poll_timeout_secs,
        sink,
        cancel,
    )))
}

async fn poll_loop(
    bot: Bot,
    bot_username: Option<String>,
    poll_timeout_secs: u32,
    sink: Arc<dyn ChannelEventSink>,
    cancel: CancellationToken,
) {
    info!("starting telegram polling loop");
    let mut offset: i32 = 0;

    loop {
        let request = bot
            .get_updates()
            .offset(offset)
            .timeout(poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = request.send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    // one task per update so a slow LLM answer doesn't stall everyone
                    let bot = bot.clone();
                    let bot_username = bot_username.clone();
                    let sink = Arc::clone(&sink);
                    tokio::spawn(async move {
                        dispatch_update(update.kind, &bot, bot_username.as_deref(), sink.as_ref())
                            .await;
                    });
                }
            },
            Err(e) => {
                if is_conflict(&e) {
                    warn!(
                        "telegram polling stopped: another instance is already running with this token"
                    );
                    cancel.cancel();
                    break;
                }
                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(ERROR_BACKOFF) => {},
                }
            },
        }
    }
    info!("telegram polling stopped");
}

async fn dispatch_update(
    kind: UpdateKind,
    bot: &Bot,
    bot_username: Option<&str>,
    sink: &dyn ChannelEventSink,
) {
    match kind {
        UpdateKind::Message(msg) => {
            debug!(chat_id = msg.chat.id.0, "received telegram message");
            if let Err(e) = handlers::handle_message(msg, bot_username, sink).await {
                error!(error = %e, "error handling telegram message");
            }
        },
        UpdateKind::CallbackQuery(query) => {
            debug!(callback_data = ?query.data, "received telegram callback query");
            if let Err(e) = handlers::handle_callback_query(query, bot, sink).await {
                error!(error = %e, "error handling telegram callback query");
            }
        },
        other => debug!("ignoring non-message update: {other:?}"),
    }
}

fn is_conflict(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::TerminatedByOtherGetUpdates))
}

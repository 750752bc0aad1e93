use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatAction, ChatId, InlineKeyboardButton, InlineKeyboardMarkup},
    },
    tracing::{debug, warn},
};

use studybot_channels::{ChannelOutbound, Error, InlineKeyboard, Result};

/// Hard limit of the Bot API for one text message, in UTF-16 units. Counting
/// chars keeps us under it for everything outside the astral planes.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound message sender for Telegram.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn run_with_retry<T, F, Fut>(
        &self,
        to: &str,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = to,
                            operation,
                            retries,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = to,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn to_markup(keyboard: &InlineKeyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.callback_data.clone()))
            .collect::<Vec<_>>()
    }))
}

/// Split on line boundaries where possible so each part fits one message.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                parts.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}

#[async_trait]
impl ChannelOutbound for TelegramOutbound {
    async fn send_text(&self, to: &str, text: &str, keyboard: Option<&InlineKeyboard>) -> Result<()> {
        let chat_id = ChatId(to.parse::<i64>()?);
        let markup = keyboard.filter(|kb| !kb.is_empty()).map(to_markup);
        let parts = split_message(text, TELEGRAM_MAX_MESSAGE_LEN);
        let last = parts.len() - 1;

        for (i, part) in parts.iter().enumerate() {
            // buttons go under the final part
            let markup = if i == last { markup.clone() } else { None };
            self.run_with_retry(to, "send message", || {
                let request = self.bot.send_message(chat_id, part.as_str());
                match markup.clone() {
                    Some(m) => request.reply_markup(m),
                    None => request,
                }
                .send()
            })
            .await
            .map_err(|e| Error::external("telegram send message", e))?;
        }
        debug!(chat_id = to, text_len = text.len(), parts = parts.len(), "telegram message sent");
        Ok(())
    }

    async fn send_typing(&self, to: &str) -> Result<()> {
        let chat_id = ChatId(to.parse::<i64>()?);
        self.bot
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
            .map_err(|e| Error::external("telegram send chat action", e))?;
        Ok(())
    }
}

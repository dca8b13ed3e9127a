//! Telegram adapter (teloxide).
//!
//! Implements the `isb-core` messaging ports over the Telegram Bot API.

use std::path::Path;

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, InputFile},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use isb_core::{
    domain::{ChatId, Identity, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::{IdentityResolver, MessagingPort},
        types::{InlineButton, InlineKeyboard, ReplyMarkup},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token))
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!(retry_after = ?d, "telegram rate limit hit, retrying");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

/// Map the core markup onto Telegram's. One button per row.
pub fn tg_markup(markup: ReplyMarkup) -> Result<teloxide::types::ReplyMarkup> {
    match markup {
        // Selective so only the addressed admin gets the reply field.
        ReplyMarkup::ForceReply => Ok(teloxide::types::ReplyMarkup::ForceReply(ForceReply {
            selective: Some(true),
            ..ForceReply::new()
        })),
        ReplyMarkup::Inline(keyboard) => Ok(teloxide::types::ReplyMarkup::InlineKeyboard(
            tg_keyboard(keyboard)?,
        )),
    }
}

fn tg_keyboard(keyboard: InlineKeyboard) -> Result<InlineKeyboardMarkup> {
    let rows = keyboard
        .buttons
        .into_iter()
        .map(|b| {
            let button = match b {
                InlineButton::Callback { label, data } => {
                    InlineKeyboardButton::callback(label, data)
                }
                InlineButton::Url { label, url } => {
                    let url = reqwest::Url::parse(&url)
                        .map_err(|e| Error::Validation(format!("bad button url {url}: {e}")))?;
                    InlineKeyboardButton::url(label, url)
                }
            };
            Ok(vec![button])
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(InlineKeyboardMarkup::new(rows))
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef> {
        let markup = markup.map(tg_markup).transpose()?;
        let msg = self
            .with_retry(|| {
                let mut req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
                if let Some(m) = markup.clone() {
                    req = req.reply_markup(m);
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &Path,
        caption: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef> {
        if !photo.is_file() {
            return Err(Error::Transport(format!(
                "photo not found: {}",
                photo.display()
            )));
        }

        let markup = markup.map(tg_markup).transpose()?;
        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_photo(Self::tg_chat(chat_id), InputFile::file(photo.to_path_buf()))
                    .caption(caption.to_string());
                if let Some(m) = markup.clone() {
                    req = req.reply_markup(m);
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        self.with_retry(|| self.bot.answer_callback_query(callback_id.to_string()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityResolver for TelegramMessenger {
    async fn resolve(&self, id: UserId) -> Result<Identity> {
        let chat = self
            .with_retry(|| self.bot.get_chat(Self::tg_chat(ChatId::from(id))))
            .await?;
        Ok(handlers::identity_of(&chat))
    }
}

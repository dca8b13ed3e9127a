use crate::domain::{ChatId, Identity};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(TextMessage),
    Text(TextMessage),
    Callback(CallbackQuery),
    /// Anything the bot does not understand (stickers, voice, ...).
    Other(OtherMessage),
}

impl IncomingUpdate {
    pub fn sender(&self) -> &Identity {
        match self {
            IncomingUpdate::Command(m) | IncomingUpdate::Text(m) => &m.sender,
            IncomingUpdate::Callback(q) => &q.sender,
            IncomingUpdate::Other(m) => &m.sender,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            IncomingUpdate::Command(m) | IncomingUpdate::Text(m) => m.chat_id,
            IncomingUpdate::Callback(q) => q.chat_id,
            IncomingUpdate::Other(m) => m.chat_id,
        }
    }

    /// Text payload used for logging (message text or callback data).
    pub fn text(&self) -> &str {
        match self {
            IncomingUpdate::Command(m) | IncomingUpdate::Text(m) => &m.text,
            IncomingUpdate::Callback(q) => &q.data,
            IncomingUpdate::Other(_) => "",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub sender: Identity,
    pub text: String,
    pub reply_to: Option<ReplyTarget>,
}

/// The message an inbound text replied to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyTarget {
    pub text: String,
    pub from_bot: bool,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub chat_id: ChatId,
    pub sender: Identity,
    pub callback_id: String,
    pub data: String,
}

#[derive(Clone, Debug)]
pub struct OtherMessage {
    pub chat_id: ChatId,
    pub sender: Identity,
}

/// Interactive controls attached to an outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyMarkup {
    Inline(InlineKeyboard),
    /// Nudge the recipient's client to reply directly to this message.
    ForceReply,
}

/// Inline keyboard, one button per row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub buttons: Vec<InlineButton>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InlineButton {
    Callback { label: String, data: String },
    Url { label: String, url: String },
}

impl InlineButton {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Callback {
            label: label.into(),
            data: data.into(),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            label: label.into(),
            url: url.into(),
        }
    }
}

impl InlineKeyboard {
    pub fn new(buttons: Vec<InlineButton>) -> Self {
        Self { buttons }
    }
}

impl From<InlineKeyboard> for ReplyMarkup {
    fn from(k: InlineKeyboard) -> Self {
        ReplyMarkup::Inline(k)
    }
}

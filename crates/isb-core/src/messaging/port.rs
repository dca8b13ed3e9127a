use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, Identity, MessageRef, UserId},
    messaging::types::ReplyMarkup,
    Result,
};

/// Outbound side of the messenger.
///
/// Failures are `Error::Transport`; callers log them and move on since the
/// channel itself is what failed.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &Path,
        caption: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()>;
}

/// Maps a numeric id to a platform identity. Unknown ids are
/// `Error::UnknownIdentity`.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, id: UserId) -> Result<Identity>;
}

//! Per-update routing: admission, commands, greetings, menu callbacks and the
//! admin prompt workflow.
//!
//! Every failure is handled here. A send that fails is logged and audited,
//! never retried towards the user, and never stops the next update.

use std::{path::PathBuf, sync::Arc};

use crate::{
    access::{AccessGate, Decision},
    audit::{AuditEvent, AuditLogger},
    config::Config,
    domain::{ChatId, Identity},
    menu::{self, Screen, UNKNOWN_COMMAND_NOTICE},
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, IncomingUpdate, ReplyMarkup, TextMessage},
    },
    moderation::{Moderation, ModerationAction},
    rate_limit::Verdict,
    workflow::PromptWorkflow,
};

pub const SPAM_NOTICE: &str = "Вы отправляете запросы слишком часто, пожалуйста, перестаньте или \
нам придётся игнорировать вас.";
pub const AUTO_BAN_NOTICE: &str = "Извините, но мы вынуждены игнорировать ваши сообщения.";

const GREETINGS: [&str; 2] = ["hello", "привет"];

pub struct Conversation {
    gate: AccessGate,
    moderation: Arc<Moderation>,
    workflow: PromptWorkflow,
    messenger: Arc<dyn MessagingPort>,
    audit: Arc<AuditLogger>,
    enroll_url: String,
    pictures_dir: PathBuf,
}

impl Conversation {
    pub fn new(
        cfg: &Config,
        gate: AccessGate,
        moderation: Arc<Moderation>,
        messenger: Arc<dyn MessagingPort>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            gate,
            workflow: PromptWorkflow::new(moderation.clone()),
            moderation,
            messenger,
            audit,
            enroll_url: cfg.enroll_url.clone(),
            pictures_dir: cfg.pictures_dir.clone(),
        }
    }

    pub async fn handle(&self, update: IncomingUpdate) {
        let sender = update.sender().clone();
        let chat_id = update.chat_id();

        match self.gate.admit(&sender).await {
            Decision::Allow => {}
            Decision::RejectBanned => {
                tracing::info!(
                    id = sender.id,
                    name = sender.display_name(),
                    text = update.text(),
                    "Banned user tries to speak!"
                );
                self.audit.record(AuditEvent::banned(&sender, update.text()));
                self.answer_if_callback(&update).await;
                return;
            }
            Decision::RejectSpam(verdict) => {
                tracing::warn!(
                    id = sender.id,
                    name = sender.display_name(),
                    verdict = verdict.as_str(),
                    "Probably, spam detected!"
                );
                self.audit.record(AuditEvent::spam(&sender, verdict.as_str()));
                self.answer_if_callback(&update).await;
                let notice = if verdict == Verdict::Block && self.gate.auto_ban() {
                    AUTO_BAN_NOTICE
                } else {
                    SPAM_NOTICE
                };
                self.send_text(chat_id, &sender, notice, None).await;
                return;
            }
        }

        match update {
            IncomingUpdate::Command(msg) => self.on_command(msg).await,
            IncomingUpdate::Text(msg) => self.on_text(msg).await,
            IncomingUpdate::Callback(query) => self.on_callback(query).await,
            IncomingUpdate::Other(msg) => {
                tracing::info!(id = msg.sender.id, "Received unknown message!");
                self.audit.record(AuditEvent::message(&msg.sender, "other", ""));
                self.send_text(msg.chat_id, &msg.sender, UNKNOWN_COMMAND_NOTICE, None)
                    .await;
            }
        }
    }

    async fn on_command(&self, msg: TextMessage) {
        let text = msg.text.trim().to_lowercase();
        // `/start@SomeBot` addresses the same command in group chats.
        let command = text
            .split_whitespace()
            .next()
            .and_then(|c| c.split('@').next())
            .unwrap_or_default();

        tracing::info!(id = msg.sender.id, command, "Received new command message!");
        self.audit.record(AuditEvent::message(&msg.sender, "command", &text));

        match command {
            "/start" => {
                let screen = menu::start_screen(&self.enroll_url);
                self.send_screen(msg.chat_id, &msg.sender, screen).await;
            }
            "/console" if self.moderation.is_admin(msg.sender.user_id()).await => {
                self.send_screen(msg.chat_id, &msg.sender, menu::console_screen())
                    .await;
            }
            _ => {
                self.send_text(msg.chat_id, &msg.sender, UNKNOWN_COMMAND_NOTICE, None)
                    .await;
            }
        }
    }

    async fn on_text(&self, msg: TextMessage) {
        tracing::info!(id = msg.sender.id, "Received new text message!");
        self.audit.record(AuditEvent::message(&msg.sender, "text", &msg.text));

        let lowered = msg.text.trim().to_lowercase();
        if GREETINGS.contains(&lowered.as_str()) {
            let screen = menu::start_screen(&self.enroll_url);
            self.send_screen(msg.chat_id, &msg.sender, screen).await;
            return;
        }

        if let Some(reply_to) = msg.reply_to.as_ref().filter(|r| r.from_bot) {
            if self.moderation.is_admin(msg.sender.user_id()).await {
                if let Some(transition) = self
                    .workflow
                    .on_reply(&msg.sender, &reply_to.text, &msg.text)
                    .await
                {
                    self.send_text(msg.chat_id, &msg.sender, transition.notice(), None)
                        .await;
                    return;
                }
            }
        }

        self.send_text(msg.chat_id, &msg.sender, UNKNOWN_COMMAND_NOTICE, None)
            .await;
    }

    async fn on_callback(&self, query: CallbackQuery) {
        self.answer(&query).await;

        let data = query.data.to_lowercase();
        self.audit.record(AuditEvent::message(&query.sender, "callback", &data));

        if data.starts_with('!') {
            tracing::info!(id = query.sender.id, callback = %data, "Received new admin query!");
            if !self.moderation.is_admin(query.sender.user_id()).await {
                tracing::warn!(id = query.sender.id, "admin query from a non-admin ignored");
                return;
            }
            let Some(action) = ModerationAction::from_command(&data) else {
                tracing::debug!(callback = %data, "unknown admin query");
                return;
            };
            let (prompt, markup) = self.workflow.open(action);
            self.send_text(query.chat_id, &query.sender, prompt, Some(markup))
                .await;
            return;
        }

        tracing::info!(id = query.sender.id, callback = %data, "Received new user query!");
        match menu::screen_for(&data) {
            Some(screen) => self.send_screen(query.chat_id, &query.sender, screen).await,
            None => tracing::debug!(callback = %data, "unknown menu query"),
        }
    }

    async fn answer_if_callback(&self, update: &IncomingUpdate) {
        if let IncomingUpdate::Callback(query) = update {
            self.answer(query).await;
        }
    }

    async fn answer(&self, query: &CallbackQuery) {
        if let Err(e) = self
            .messenger
            .answer_callback_query(&query.callback_id)
            .await
        {
            tracing::warn!(id = query.sender.id, "failed to answer callback query: {e}");
        }
    }

    async fn send_screen(&self, chat_id: ChatId, to: &Identity, screen: Screen) {
        let markup = screen.keyboard.map(ReplyMarkup::from);
        let Some(photo) = screen.photo else {
            self.send_text(chat_id, to, screen.text, markup).await;
            return;
        };

        let path = self.pictures_dir.join(photo);
        if let Err(e) = self
            .messenger
            .send_photo(chat_id, &path, screen.text, markup)
            .await
        {
            tracing::error!(
                chat_id = chat_id.0,
                photo = %path.display(),
                "failed to send photo: {e}"
            );
            self.audit.record(AuditEvent::error(Some(to), &e.to_string()));
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        to: &Identity,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) {
        if let Err(e) = self.messenger.send_text(chat_id, text, markup).await {
            tracing::error!(chat_id = chat_id.0, "failed to send message: {e}");
            self.audit.record(AuditEvent::error(Some(to), &e.to_string()));
        }
    }
}

//! Test doubles shared by the unit tests in this crate.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    audit::AuditLogger,
    config::{Config, DEFAULT_ENROLL_URL},
    domain::{ChatId, Identity, MessageId, MessageRef, UserId},
    errors::Error,
    identity_store::IdentityStore,
    messaging::{
        port::{IdentityResolver, MessagingPort},
        types::ReplyMarkup,
    },
    moderation::Moderation,
    rate_limit::{RateLimiter, SpamPolicy},
    Result,
};

pub(crate) const ADMIN_ID: i64 = 1;

pub(crate) fn tmp_dir(prefix: &str) -> PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_nanos();
    let dir = PathBuf::from(format!("/tmp/{prefix}-{}-{ts}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Sent {
    Text {
        chat_id: ChatId,
        text: String,
        markup: Option<ReplyMarkup>,
    },
    Photo {
        chat_id: ChatId,
        photo: PathBuf,
        caption: String,
        markup: Option<ReplyMarkup>,
    },
}

impl Sent {
    pub(crate) fn text(&self) -> &str {
        match self {
            Sent::Text { text, .. } => text,
            Sent::Photo { caption, .. } => caption,
        }
    }

    pub(crate) fn markup(&self) -> Option<&ReplyMarkup> {
        match self {
            Sent::Text { markup, .. } | Sent::Photo { markup, .. } => markup.as_ref(),
        }
    }
}

/// Records everything sent through it. Optionally fails every send.
#[derive(Default)]
pub(crate) struct FakeMessenger {
    sent: Mutex<Vec<Sent>>,
    answered: Mutex<Vec<String>>,
    next_id: AtomicI32,
    fail: bool,
}

impl FakeMessenger {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.sent().iter().map(|s| s.text().to_string()).collect()
    }

    pub(crate) fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }

    fn record(&self, chat_id: ChatId, sent: Sent) -> Result<MessageRef> {
        if self.fail {
            return Err(Error::Transport("send failed".to_string()));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(self.next_id.fetch_add(1, Ordering::Relaxed)),
        })
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef> {
        self.record(
            chat_id,
            Sent::Text {
                chat_id,
                text: text.to_string(),
                markup,
            },
        )
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &Path,
        caption: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef> {
        self.record(
            chat_id,
            Sent::Photo {
                chat_id,
                photo: photo.to_path_buf(),
                caption: caption.to_string(),
                markup,
            },
        )
    }

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Transport("answer failed".to_string()));
        }
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}

/// Resolves a fixed set of ids to `user<id>`.
pub(crate) struct FakeResolver {
    known: HashSet<i64>,
}

impl FakeResolver {
    pub(crate) fn knowing(ids: &[i64]) -> Arc<Self> {
        Arc::new(Self {
            known: ids.iter().copied().collect(),
        })
    }
}

#[async_trait]
impl IdentityResolver for FakeResolver {
    async fn resolve(&self, id: UserId) -> Result<Identity> {
        if !self.known.contains(&id.0) {
            return Err(Error::Transport(format!("chat {} not found", id.0)));
        }
        let mut identity = Identity::new(id.0);
        identity.first_name = Some(format!("user{}", id.0));
        Ok(identity)
    }
}

pub(crate) fn test_config(root: &Path) -> Config {
    Config {
        telegram_bot_token: "test-token".to_string(),
        data_dir: root.join("Json"),
        pictures_dir: root.join("Pictures"),
        logs_dir: root.join("Logs"),
        audit_log_json: true,
        spam: SpamPolicy::default(),
        auto_ban_spammers: false,
        enroll_url: DEFAULT_ENROLL_URL.to_string(),
        console_enabled: false,
        initial_admins: vec![ADMIN_ID],
    }
}

pub(crate) struct Fixture {
    pub admin: Identity,
    pub moderation: Arc<Moderation>,
    pub limiter: Arc<RateLimiter>,
    pub messenger: Arc<FakeMessenger>,
    pub audit: Arc<AuditLogger>,
    pub cfg: Arc<Config>,
}

/// Fresh stores under a temp dir with user 1 as the only admin.
///
/// Works with or without a running runtime.
pub(crate) fn fixture(resolver: Arc<FakeResolver>) -> Fixture {
    fixture_with(resolver, FakeMessenger::default())
}

pub(crate) fn fixture_with(resolver: Arc<FakeResolver>, messenger: FakeMessenger) -> Fixture {
    let cfg = test_config(&tmp_dir("isb-fixture"));
    for dir in [&cfg.data_dir, &cfg.pictures_dir, &cfg.logs_dir] {
        std::fs::create_dir_all(dir).unwrap();
    }

    let mut admin = Identity::new(ADMIN_ID);
    admin.first_name = Some("Admin".to_string());
    std::fs::write(
        cfg.admins_file(),
        serde_json::to_string(&vec![admin.clone()]).unwrap(),
    )
    .unwrap();

    let admins = Arc::new(IdentityStore::open("admins", cfg.admins_file()).unwrap());
    let banned = Arc::new(IdentityStore::open("banned", cfg.banned_file()).unwrap());
    let audit = Arc::new(AuditLogger::new(&cfg.logs_dir, cfg.audit_log_json));
    let moderation = Arc::new(Moderation::new(admins, banned, resolver, audit.clone()));

    Fixture {
        admin,
        moderation,
        limiter: Arc::new(RateLimiter::new(cfg.spam)),
        messenger: Arc::new(messenger),
        audit,
        cfg: Arc::new(cfg),
    }
}

use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::ReplyMarkup},
    Result,
};

/// How often idle per-chat limiters are dropped.
const SWEEP_EVERY: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* Telegram API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls per chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),   // ~25/sec
            per_chat_min_interval: Duration::from_millis(350), // short menu bursts stay snappy
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = now.max(self.next);
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// Per-chat limiters plus the time of the last idle sweep.
#[derive(Debug)]
struct ChatLimiters {
    limiters: HashMap<i64, Arc<Mutex<IntervalLimiter>>>,
    last_sweep: Instant,
}

impl ChatLimiters {
    fn new() -> Self {
        Self {
            limiters: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }

    /// Drop limiters whose slot is already free and nobody else holds.
    /// A fresh limiter for the same chat behaves identically.
    fn sweep(&mut self, now: Instant) {
        self.limiters.retain(|_, lim| {
            Arc::strong_count(lim) > 1 || lim.try_lock().map_or(true, |l| l.next > now)
        });
        self.last_sweep = now;
    }
}

/// MessagingPort decorator that spaces outbound calls.
///
/// Best-effort defense against Telegram 429s when many senders are served at
/// once; the adapter still retries a single RetryAfter.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<ChatLimiters>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(ChatLimiters::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut per_chat = self.per_chat.lock().await;
        let now = Instant::now();
        if now.saturating_duration_since(per_chat.last_sweep) >= SWEEP_EVERY {
            per_chat.sweep(now);
        }
        per_chat
            .limiters
            .entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id.0).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_global(&self) {
        let wait = { self.global.lock().await.reserve() };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    #[cfg(test)]
    async fn tracked_chats(&self) -> usize {
        self.per_chat.lock().await.limiters.len()
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_text(chat_id, text, markup).await
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &Path,
        caption: &str,
        markup: Option<ReplyMarkup>,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_photo(chat_id, photo, caption, markup).await
    }

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        // No chat_id available here; apply global throttling only.
        self.throttle_global().await;
        self.inner.answer_callback_query(callback_id).await
    }
}

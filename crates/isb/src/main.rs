use std::{io, sync::Arc};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use isb_core::{
    access::AccessGate,
    audit::AuditLogger,
    config::Config,
    console::Console,
    conversation::Conversation,
    identity_store::IdentityStore,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    moderation::Moderation,
    rate_limit::RateLimiter,
};
use isb_telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> Result<(), isb_core::Error> {
    isb_core::logging::init("isb")?;

    let cfg = Arc::new(Config::load()?);

    let admins = Arc::new(IdentityStore::open("admins", cfg.admins_file())?);
    let banned = Arc::new(IdentityStore::open("banned", cfg.banned_file())?);
    admins.seed_if_empty(&cfg.initial_admins).await?;

    let audit = Arc::new(AuditLogger::new(&cfg.logs_dir, cfg.audit_log_json));

    let cancel = CancellationToken::new();
    let limiter = Arc::new(RateLimiter::new(cfg.spam));
    let timers = limiter.spawn_resets(cancel.clone());

    // Keep a 429 RetryAfter retry in the adapter; the decorator spaces sends.
    let telegram = Arc::new(TelegramMessenger::from_token(&cfg.telegram_bot_token));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        telegram.clone(),
        ThrottleConfig::default(),
    ));

    let moderation = Arc::new(Moderation::new(
        admins.clone(),
        banned.clone(),
        telegram.clone(),
        audit.clone(),
    ));
    let gate = AccessGate::new(admins, banned, limiter).with_auto_ban(cfg.auto_ban_spammers);
    let conversation = Arc::new(Conversation::new(
        &cfg,
        gate,
        moderation.clone(),
        messenger,
        audit.clone(),
    ));

    if cfg.console_enabled {
        let console = Console::new(moderation, Handle::current(), audit);
        let cancel = cancel.clone();
        std::thread::Builder::new()
            .name("isb-console".to_string())
            .spawn(move || {
                if let Err(e) = console.run(io::stdin().lock(), io::stdout(), &cancel) {
                    tracing::error!("console stopped: {e}");
                }
            })?;
    }

    let result = isb_telegram::router::run_polling(telegram.bot(), conversation).await;

    cancel.cancel();
    timers.shutdown().await;
    tracing::info!("Disabling the bot...");

    result.map_err(|e| isb_core::Error::Transport(format!("telegram bot failed: {e}")))
}

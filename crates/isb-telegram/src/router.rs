use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use isb_core::conversation::Conversation;

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<Conversation>,
}

/// Long-poll Telegram until Ctrl-C.
pub async fn run_polling(bot: Bot, conversation: Arc<Conversation>) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "Bot started..."),
        Err(e) => anyhow::bail!("telegram get_me failed: {e}"),
    }

    let state = Arc::new(AppState { conversation });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            tracing::debug!(update_id = upd.id, "unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

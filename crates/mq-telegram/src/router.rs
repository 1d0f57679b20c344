use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use mq_core::{cache::MembersCache, config::Config, roster::RosterBook};

use crate::handlers;

/// Interval between roster flushes to disk.
const ROSTER_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub cache: Arc<MembersCache>,
    pub roster: Arc<RosterBook>,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!(username = me.username(), "mq started");
    }
    tracing::info!(
        allowed_users = cfg.telegram_allowed_users.len(),
        cache_ttl_secs = cfg.members_cache_ttl.as_secs(),
        "configuration loaded"
    );

    let roster = Arc::new(RosterBook::load(cfg.roster_file.clone()).await?);
    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        cache: Arc::new(MembersCache::new(cfg.members_cache_ttl)),
        roster: roster.clone(),
    });

    let flusher = {
        let roster = roster.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(ROSTER_FLUSH_INTERVAL);
            loop {
                tick.tick().await;
                if let Err(e) = roster.save_if_dirty().await {
                    tracing::warn!(error = %e, "failed to save roster");
                }
            }
        })
    };

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    flusher.abort();
    roster.save_if_dirty().await?;
    Ok(())
}

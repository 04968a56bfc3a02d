mod bot;

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use rise_fall_bot::config::Config;
use rise_fall_bot::consensus::{ConsensusConfig, ConsensusEngine};
use rise_fall_bot::engine::SignalEngine;
use rise_fall_bot::feed::DerivFeed;
use rise_fall_bot::indicators::IndicatorRegistry;
use rise_fall_bot::lifecycle::SignalLifecycle;
use rise_fall_bot::models::CandleWindow;
use rise_fall_bot::notify::TelegramNotifier;
use rise_fall_bot::storage::MemoryCandleStore;

use bot::Bot;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    tracing::info!(
        symbol = %config.symbol,
        granularity = config.granularity_secs,
        "starting rise-fall bot"
    );

    let registry = Arc::new(IndicatorRegistry::from_config(&config)?);
    let engine = SignalEngine::new(
        registry,
        ConsensusEngine::new(ConsensusConfig {
            min_indicators: config.min_indicators,
            consensus_threshold: config.consensus_threshold,
            max_bonus_percentage: config.max_bonus_percentage,
            require_primary_consensus: config.require_primary_consensus,
        }),
    );

    let store = Arc::new(MemoryCandleStore::new());
    let notifier = Arc::new(TelegramNotifier::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    ));
    let lifecycle = SignalLifecycle::new(
        store,
        notifier,
        config.max_gale_level,
        config.signal_cooldown_secs,
        config.validation_cooldown_secs,
        config.granularity_secs,
    );

    let feed = DerivFeed::connect(
        &config.deriv_app_id,
        &config.deriv_token,
        &config.symbol,
        config.granularity_secs,
        config.max_candles,
    )
    .await?;

    let window = CandleWindow::new(config.max_candles);
    let mut bot = Bot::new(config.shared(), feed, engine, lifecycle, window);
    bot.run().await
}

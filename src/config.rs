use std::env;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::GaleLevel;

pub type SharedConfig = Arc<RwLock<Config>>;

/// Runtime configuration, sourced from the environment. Every knob has a
/// default so a bare `.env` with just the credentials is enough to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Market data
    pub deriv_token: String,
    pub deriv_app_id: String,
    pub symbol: String,
    pub granularity_secs: i64,
    pub max_candles: usize,

    // Notifications
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,

    // Consensus
    pub min_indicators: usize,
    pub consensus_threshold: f64,
    pub max_bonus_percentage: u8,
    pub require_primary_consensus: bool,

    // Signal gating
    pub min_confidence_to_send: u8,
    pub signal_cooldown_secs: i64,
    pub validation_cooldown_secs: i64,
    pub max_gale_level: GaleLevel,

    // Indicator families
    pub bb_enabled: bool,
    pub bb_window: usize,
    pub bb_window_dev: f64,
    pub ema_enabled: bool,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub hma_enabled: bool,
    pub hma_short_period: usize,
    pub hma_long_period: usize,
    pub micro_enabled: bool,
    pub micro_period: usize,
    pub micro_strength_threshold: f64,

    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        let env = |key: &str, default: &str| env::var(key).unwrap_or_else(|_| default.to_string());

        Self {
            deriv_token: env("DERIV_TOKEN", ""),
            deriv_app_id: env("DERIV_APP_ID", "1089"),
            symbol: env("SYMBOL", "R_25"),
            granularity_secs: env("GRANULARITY_SECS", "60").parse().unwrap_or(60),
            max_candles: env("MAX_CANDLES", "100").parse().unwrap_or(100),

            telegram_bot_token: env("TELEGRAM_BOT_TOKEN", ""),
            telegram_chat_id: env("TELEGRAM_CHAT_ID", ""),

            min_indicators: env("MIN_INDICATORS", "2").parse().unwrap_or(2),
            consensus_threshold: env("CONSENSUS_THRESHOLD", "0.6").parse().unwrap_or(0.6),
            max_bonus_percentage: env("MAX_BONUS_PERCENTAGE", "40").parse().unwrap_or(40),
            require_primary_consensus: env("REQUIRE_PRIMARY_CONSENSUS", "false")
                .parse()
                .unwrap_or(false),

            min_confidence_to_send: env("MIN_CONFIDENCE_TO_SEND", "20").parse().unwrap_or(20),
            signal_cooldown_secs: env("SIGNAL_COOLDOWN_SECS", "120").parse().unwrap_or(120),
            validation_cooldown_secs: env("VALIDATION_COOLDOWN_SECS", "0").parse().unwrap_or(0),
            max_gale_level: match env("MAX_GALE_LEVEL", "G2").to_uppercase().as_str() {
                "G1" => GaleLevel::G1,
                _ => GaleLevel::G2,
            },

            bb_enabled: env("BB_ENABLED", "true").parse().unwrap_or(true),
            bb_window: env("BB_WINDOW", "10").parse().unwrap_or(10),
            bb_window_dev: env("BB_WINDOW_DEV", "1.5").parse().unwrap_or(1.5),
            ema_enabled: env("EMA_ENABLED", "true").parse().unwrap_or(true),
            ema_fast_period: env("EMA_FAST_PERIOD", "9").parse().unwrap_or(9),
            ema_slow_period: env("EMA_SLOW_PERIOD", "21").parse().unwrap_or(21),
            hma_enabled: env("HMA_ENABLED", "true").parse().unwrap_or(true),
            hma_short_period: env("HMA_SHORT_PERIOD", "21").parse().unwrap_or(21),
            hma_long_period: env("HMA_LONG_PERIOD", "100").parse().unwrap_or(100),
            micro_enabled: env("MICRO_ENABLED", "true").parse().unwrap_or(true),
            micro_period: env("MICRO_PERIOD", "5").parse().unwrap_or(5),
            micro_strength_threshold: env("MICRO_STRENGTH_THRESHOLD", "0.6")
                .parse()
                .unwrap_or(0.6),

            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}

//! Shared fixtures for unit and integration tests.

use crate::config::Config;
use crate::models::{Candle, GaleLevel};

pub const BASE_EPOCH: i64 = 1_700_000_000;

/// Candles from (open, high, low, close) tuples, one minute apart.
pub fn make_candles(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            epoch: BASE_EPOCH + i as i64 * 60,
            open,
            high,
            low,
            close,
        })
        .collect()
}

/// Steadily rising bullish candles.
pub fn make_bullish_trend(n: usize, start: f64) -> Vec<Candle> {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start + i as f64 * 0.5;
            (open, open + 0.6, open - 0.1, open + 0.5)
        })
        .collect();
    make_candles(&data)
}

/// Steadily falling bearish candles.
pub fn make_bearish_trend(n: usize, start: f64) -> Vec<Candle> {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start - i as f64 * 0.5;
            (open, open + 0.1, open - 0.6, open - 0.5)
        })
        .collect();
    make_candles(&data)
}

/// Config with all defaults and every indicator enabled, built directly so
/// tests never race on process environment variables.
pub fn default_test_config() -> Config {
    Config {
        deriv_token: "test-token".to_string(),
        deriv_app_id: "1089".to_string(),
        symbol: "R_25".to_string(),
        granularity_secs: 60,
        max_candles: 100,
        telegram_bot_token: "test-bot".to_string(),
        telegram_chat_id: "test-chat".to_string(),
        min_indicators: 2,
        consensus_threshold: 0.6,
        max_bonus_percentage: 40,
        require_primary_consensus: false,
        min_confidence_to_send: 20,
        signal_cooldown_secs: 120,
        validation_cooldown_secs: 0,
        max_gale_level: GaleLevel::G2,
        bb_enabled: true,
        bb_window: 10,
        bb_window_dev: 1.5,
        ema_enabled: true,
        ema_fast_period: 9,
        ema_slow_period: 21,
        hma_enabled: true,
        hma_short_period: 21,
        hma_long_period: 100,
        micro_enabled: true,
        micro_period: 5,
        micro_strength_threshold: 0.6,
        log_level: "INFO".to_string(),
    }
}

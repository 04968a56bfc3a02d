//! Dual Hull moving average trend. Two HMA series at different periods must
//! agree on direction; the reported strength is coarse because the series
//! slope says little about magnitude at these short horizons.

use serde_json::json;

use super::{IndicatorReading, ReadingResult};
use crate::core::ta;
use crate::errors::BotError;
use crate::models::{Candle, TrendDirection};

/// Relative change per series above which the trend counts as pronounced.
const PRONOUNCED_CHANGE: f64 = 0.0005;
/// Change below this is indistinguishable from noise.
const NOISE_FLOOR: f64 = 5e-5;
const STRONG_STRENGTH: f64 = 0.8;
const WEAK_STRENGTH: f64 = 0.4;

/// Direction and relative change of one HMA series, last vs first value.
fn series_slope(values: &[f64], period: usize) -> Result<(TrendDirection, f64), BotError> {
    let series = ta::hull_moving_average(values, period)
        .ok_or_else(|| BotError::Computation(format!("HMA({period}) undefined")))?;
    let first = *series
        .first()
        .ok_or_else(|| BotError::Computation("empty HMA series".to_string()))?;
    let last = *series
        .last()
        .ok_or_else(|| BotError::Computation("empty HMA series".to_string()))?;
    let trend = if last > first {
        TrendDirection::Rise
    } else if last < first {
        TrendDirection::Fall
    } else {
        TrendDirection::Sideways
    };
    let change = if first != 0.0 {
        (last - first).abs() / first.abs()
    } else {
        0.0
    };
    Ok((trend, change))
}

pub fn analyze(candles: &[Candle], short_period: usize, long_period: usize) -> ReadingResult {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let (short_trend, short_change) = series_slope(&closes, short_period)?;
    let (long_trend, long_change) = series_slope(&closes, long_period)?;

    let trend = if short_trend == long_trend
        && short_trend.is_directional()
        && short_change > NOISE_FLOOR
        && long_change > NOISE_FLOOR
    {
        short_trend
    } else {
        TrendDirection::Sideways
    };

    let pronounced = short_change > PRONOUNCED_CHANGE && long_change > PRONOUNCED_CHANGE;
    let strength = if !trend.is_directional() {
        0.0
    } else if pronounced {
        STRONG_STRENGTH
    } else {
        WEAK_STRENGTH
    };

    let mut reading = IndicatorReading::new(trend);
    reading.strength = strength;
    reading.confidence = strength;
    reading = reading
        .with_diag("short_trend", json!(short_trend.to_string()))
        .with_diag("long_trend", json!(long_trend.to_string()))
        .with_diag("short_change", json!(short_change))
        .with_diag("long_change", json!(long_change));
    Ok(reading)
}

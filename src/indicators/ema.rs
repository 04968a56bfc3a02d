//! Fast/slow EMA crossover trend. Strength scales with the relative
//! separation of the two averages; confidence tracks strength since the
//! separation is the only evidence this family produces.

use serde_json::json;

use super::{IndicatorReading, ReadingResult};
use crate::core::ta;
use crate::errors::BotError;
use crate::models::{Candle, TrendDirection};

/// Relative separation is scaled by this factor before clamping to [0, 1].
const SEPARATION_SCALE: f64 = 1000.0;
/// Separation below this is indistinguishable from noise.
const MIN_SEPARATION: f64 = 5e-5;

pub fn analyze(candles: &[Candle], fast_period: usize, slow_period: usize) -> ReadingResult {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast = ta::ema(&closes, fast_period)
        .ok_or_else(|| BotError::Computation("fast EMA undefined".to_string()))?;
    let slow = ta::ema(&closes, slow_period)
        .ok_or_else(|| BotError::Computation("slow EMA undefined".to_string()))?;
    if slow == 0.0 {
        return Err(BotError::Computation("slow EMA is zero".to_string()));
    }

    let separation = (fast - slow).abs() / slow.abs();
    let trend = if separation < MIN_SEPARATION {
        TrendDirection::Sideways
    } else if fast > slow {
        TrendDirection::Rise
    } else {
        TrendDirection::Fall
    };
    let strength = if trend.is_directional() {
        (separation * SEPARATION_SCALE).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut reading = IndicatorReading::new(trend);
    reading.strength = strength;
    reading.confidence = strength;
    reading = reading
        .with_diag("fast", json!(fast))
        .with_diag("slow", json!(slow))
        .with_diag("separation", json!(separation));
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bearish_trend, make_bullish_trend, make_candles};

    #[test]
    fn uptrend_reads_rise() {
        let candles = make_bullish_trend(40, 100.0);
        let reading = analyze(&candles, 9, 21).unwrap();
        assert_eq!(reading.trend, TrendDirection::Rise);
        assert!(reading.strength > 0.0);
        assert!((reading.confidence - reading.strength).abs() < 1e-12);
    }

    #[test]
    fn downtrend_reads_fall() {
        let candles = make_bearish_trend(40, 200.0);
        let reading = analyze(&candles, 9, 21).unwrap();
        assert_eq!(reading.trend, TrendDirection::Fall);
    }

    #[test]
    fn flat_series_reads_sideways() {
        let data: Vec<(f64, f64, f64, f64)> =
            (0..40).map(|_| (100.0, 100.0, 100.0, 100.0)).collect();
        let reading = analyze(&make_candles(&data), 9, 21).unwrap();
        assert_eq!(reading.trend, TrendDirection::Sideways);
        assert_eq!(reading.strength, 0.0);
    }
}

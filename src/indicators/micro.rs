//! Micro-trend reading over the last few candles. Combines candle-pattern
//! detection, the bullish/bearish candle ratio, and close-to-close momentum
//! into one short-horizon score. Noisier than the averaged families, so its
//! confidence is discounted by recent volatility.

use serde_json::json;

use super::{IndicatorReading, ReadingResult};
use crate::core::ta;
use crate::errors::BotError;
use crate::models::{Candle, TrendDirection};

/// Body smaller than this fraction of the total range reads as a doji.
const DOJI_BODY_FRACTION: f64 = 0.1;
/// Wick at least this multiple of the body marks a hammer / shooting star.
const WICK_BODY_RATIO: f64 = 2.0;
/// Close-to-close drift below this relative size reads as consolidation.
const CONSOLIDATION_DRIFT: f64 = 0.0005;

/// Last-three-candle pattern and its directional score in [0, 1]
/// (1 bullish, 0 bearish, 0.5 neutral).
fn detect_pattern(candles: &[Candle]) -> (&'static str, f64) {
    if candles.len() < 3 {
        return ("insufficient_data", 0.5);
    }
    let tail = &candles[candles.len() - 3..];
    let (a, b, c) = (&tail[0], &tail[1], &tail[2]);

    let ascending = a.close < b.close && b.close < c.close;
    let descending = a.close > b.close && b.close > c.close;
    if ascending && tail.iter().all(Candle::is_bullish) {
        return ("three_ascending_bullish", 1.0);
    }
    if descending && tail.iter().all(Candle::is_bearish) {
        return ("three_descending_bearish", 0.0);
    }

    // Engulfing: the last body fully covers the previous, opposite-color body.
    if c.is_bullish() && b.is_bearish() && c.open <= b.close && c.close >= b.open {
        return ("bullish_engulfing", 1.0);
    }
    if c.is_bearish() && b.is_bullish() && c.open >= b.close && c.close <= b.open {
        return ("bearish_engulfing", 0.0);
    }

    let range = c.total_range();
    if range > 0.0 {
        let body = c.body();
        if body < range * DOJI_BODY_FRACTION {
            return ("doji", 0.5);
        }
        let lower_wick = c.open.min(c.close) - c.low;
        let upper_wick = c.high - c.open.max(c.close);
        if lower_wick >= body * WICK_BODY_RATIO && upper_wick < body {
            return ("hammer", 0.75);
        }
        if upper_wick >= body * WICK_BODY_RATIO && lower_wick < body {
            return ("shooting_star", 0.25);
        }
    }

    let drift = if a.close != 0.0 {
        (c.close - a.close).abs() / a.close.abs()
    } else {
        0.0
    };
    if drift < CONSOLIDATION_DRIFT {
        return ("sideways_consolidation", 0.5);
    }
    ("no_clear_pattern", 0.5)
}

pub fn analyze(candles: &[Candle], period: usize, strength_threshold: f64) -> ReadingResult {
    if candles.len() < period || period < 2 {
        return Err(BotError::Computation(
            "micro window shorter than period".to_string(),
        ));
    }
    let tail = &candles[candles.len() - period..];

    let bullish_score =
        tail.iter().filter(|c| c.is_bullish()).count() as f64 / period as f64;
    let bearish_score =
        tail.iter().filter(|c| c.is_bearish()).count() as f64 / period as f64;

    let changes: Vec<f64> = tail.windows(2).map(|w| w[1].close - w[0].close).collect();

    // Net close-to-close change, normalized by the window's full price range.
    let window_range = tail.iter().map(|c| c.high).fold(f64::MIN, f64::max)
        - tail.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let momentum = if window_range > 0.0 {
        ((tail[period - 1].close - tail[0].close) / window_range).clamp(-1.0, 1.0)
    } else {
        0.0
    };

    let (pattern, candle_score) = detect_pattern(tail);

    let combined_bullish = (bullish_score + candle_score + momentum.max(0.0)) / 3.0;
    let combined_bearish = (bearish_score + (1.0 - candle_score) + (-momentum).max(0.0)) / 3.0;

    // Bullish side wins ties.
    let (trend, strength) = if combined_bullish >= strength_threshold {
        (TrendDirection::Rise, combined_bullish)
    } else if combined_bearish >= strength_threshold {
        (TrendDirection::Fall, combined_bearish)
    } else {
        (TrendDirection::Sideways, combined_bullish.max(combined_bearish))
    };

    // Volatility ratio of the change series. Dispersion near the mean size
    // of the moves means churn, which discounts the confidence.
    let mean_abs = changes.iter().map(|c| c.abs()).sum::<f64>() / changes.len() as f64;
    let volatility = if mean_abs > 0.0 {
        (ta::stddev(&changes) / mean_abs).min(1.0)
    } else {
        1.0
    };

    let last = &tail[period - 1];
    let body_strength = if last.total_range() > 0.0 {
        last.body() / last.total_range()
    } else {
        0.0
    };
    let confidence = (body_strength * (1.0 - volatility) + strength * 0.5).min(1.0);

    let mut reading = IndicatorReading::new(trend);
    reading.strength = strength;
    reading.confidence = confidence;
    reading = reading
        .with_diag("pattern", json!(pattern))
        .with_diag("momentum", json!(momentum))
        .with_diag("volatility", json!(volatility))
        .with_diag("combined_bullish", json!(combined_bullish))
        .with_diag("combined_bearish", json!(combined_bearish));
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    #[test]
    fn three_ascending_bullish_candles_read_rise() {
        let candles = make_candles(&[
            (100.0, 100.6, 99.9, 100.5),
            (100.5, 101.1, 100.4, 101.0),
            (101.0, 101.6, 100.9, 101.5),
            (101.5, 102.1, 101.4, 102.0),
            (102.0, 102.6, 101.9, 102.5),
        ]);
        let reading = analyze(&candles, 5, 0.6).unwrap();
        assert_eq!(reading.trend, TrendDirection::Rise);
        assert_eq!(
            reading.diagnostics.get("pattern").unwrap(),
            "three_ascending_bullish"
        );
        assert!(reading.confidence > 0.0);
    }

    #[test]
    fn three_descending_bearish_candles_read_fall() {
        let candles = make_candles(&[
            (102.5, 102.6, 101.9, 102.0),
            (102.0, 102.1, 101.4, 101.5),
            (101.5, 101.6, 100.9, 101.0),
            (101.0, 101.1, 100.4, 100.5),
            (100.5, 100.6, 99.9, 100.0),
        ]);
        let reading = analyze(&candles, 5, 0.6).unwrap();
        assert_eq!(reading.trend, TrendDirection::Fall);
    }

    #[test]
    fn churn_reads_sideways() {
        let candles = make_candles(&[
            (100.0, 100.3, 99.7, 100.1),
            (100.1, 100.4, 99.8, 99.9),
            (99.9, 100.2, 99.6, 100.05),
            (100.05, 100.3, 99.7, 99.95),
            (99.95, 100.2, 99.6, 100.0),
        ]);
        let reading = analyze(&candles, 5, 0.6).unwrap();
        assert_eq!(reading.trend, TrendDirection::Sideways);
    }

    #[test]
    fn doji_detected() {
        let candles = make_candles(&[
            (100.0, 100.5, 99.5, 100.2),
            (100.2, 100.7, 99.7, 100.0),
            (100.0, 100.5, 99.5, 100.01),
        ]);
        let (pattern, score) = detect_pattern(&candles);
        assert_eq!(pattern, "doji");
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn window_shorter_than_period_errors() {
        let candles = make_candles(&[(100.0, 100.5, 99.5, 100.2)]);
        assert!(analyze(&candles, 5, 0.6).is_err());
    }
}

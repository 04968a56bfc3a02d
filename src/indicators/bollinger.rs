//! Bollinger-derived trend. Works on bands the cycle has already computed;
//! builds an additive strength score from four sub-conditions and applies a
//! safety filter that suppresses the vote on overextended or erratic price.

use serde_json::json;

use super::{IndicatorReading, ReadingResult};
use crate::core::ta::{self, BollingerBands};
use crate::errors::BotError;
use crate::models::{Candle, TrendDirection};

/// Minimum accumulated strength before a direction is reported at all.
const STRENGTH_FLOOR: f64 = 0.5;
/// Minimum strength before the indicator wants its vote counted.
const VOTE_FLOOR: f64 = 0.7;
/// Tolerance beyond the outer band that marks the move overextended.
const OVEREXTENSION: f64 = 0.005;
/// Relative distance that counts as "near" the outer band.
const BAND_PROXIMITY: f64 = 0.002;
/// Dynamic band-width threshold is normalized into this range.
const MIN_WIDTH_THRESHOLD: f64 = 0.001;
const MAX_WIDTH_THRESHOLD: f64 = 0.005;
const VOLATILITY_LOOKBACK: usize = 20;
/// Short-window volatility filter: window and allowed fraction of band span.
const SHORT_VOL_WINDOW: usize = 5;
const SHORT_VOL_FRACTION: f64 = 0.3;
/// Strength multiplier applied when short-window volatility is too high.
const VOLATILITY_DAMPING: f64 = 0.5;

/// Normalize mean historical rolling volatility into a band-width threshold.
fn dynamic_width_threshold(closes: &[f64]) -> f64 {
    let rolled = ta::rolling_stddev(closes, VOLATILITY_LOOKBACK);
    let defined: Vec<f64> = rolled.into_iter().filter(|v| v.is_finite()).collect();
    if defined.is_empty() {
        return MIN_WIDTH_THRESHOLD;
    }
    let mean = defined.iter().sum::<f64>() / defined.len() as f64;
    let max = defined.iter().fold(f64::MIN, |a, &b| a.max(b));
    if max <= 0.0 {
        return MIN_WIDTH_THRESHOLD;
    }
    MIN_WIDTH_THRESHOLD + (mean / max) * (MAX_WIDTH_THRESHOLD - MIN_WIDTH_THRESHOLD)
}

pub fn analyze(candles: &[Candle], bands: &BollingerBands, window: usize) -> ReadingResult {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let last_price = *closes
        .last()
        .ok_or_else(|| BotError::Computation("empty candle window".to_string()))?;
    if bands.middle == 0.0 || last_price == 0.0 {
        return Err(BotError::Computation(
            "degenerate bollinger bands".to_string(),
        ));
    }

    let band_width = (bands.upper - bands.lower) / bands.middle;
    let width_threshold = dynamic_width_threshold(&closes);

    // Band slope: current middle band vs the rolling mean one bar earlier.
    let middle_slope = if closes.len() > window {
        let prev = ta::sma(&closes[..closes.len() - 1], window).unwrap_or(bands.middle);
        bands.middle - prev
    } else {
        0.0
    };

    let upper_distance = (bands.upper - last_price) / last_price;
    let lower_distance = (last_price - bands.lower) / last_price;

    let mut strength: f64 = 0.0;
    if last_price > bands.middle {
        strength += 0.3;
        if middle_slope > 0.0 {
            strength += 0.2;
        }
        if band_width > width_threshold {
            strength += 0.3;
        }
        if upper_distance < BAND_PROXIMITY {
            strength += 0.2;
        }
    } else if last_price < bands.middle {
        strength += 0.3;
        if middle_slope < 0.0 {
            strength += 0.2;
        }
        if band_width > width_threshold {
            strength += 0.3;
        }
        if lower_distance < BAND_PROXIMITY {
            strength += 0.2;
        }
    }

    let mut trend = if strength >= STRENGTH_FLOOR {
        if last_price > bands.middle {
            TrendDirection::Rise
        } else {
            TrendDirection::Fall
        }
    } else {
        TrendDirection::Sideways
    };

    // Safety filter 1: price overextended beyond the relevant outer band.
    let mut should_vote = trend.is_directional() && strength >= VOTE_FLOOR;
    if trend == TrendDirection::Rise && last_price > bands.upper * (1.0 + OVEREXTENSION) {
        trend = TrendDirection::Unknown;
        strength = 0.0;
        should_vote = false;
    } else if trend == TrendDirection::Fall && last_price < bands.lower * (1.0 - OVEREXTENSION) {
        trend = TrendDirection::Unknown;
        strength = 0.0;
        should_vote = false;
    } else if closes.len() >= SHORT_VOL_WINDOW {
        // Safety filter 2: erratic short-window price action. The vote is
        // suppressed but the strength is only damped, not zeroed.
        let short_vol = ta::stddev(&closes[closes.len() - SHORT_VOL_WINDOW..]);
        if short_vol > (bands.upper - bands.lower) * SHORT_VOL_FRACTION {
            strength *= VOLATILITY_DAMPING;
            should_vote = false;
        }
    }

    let mut reading = IndicatorReading::new(trend);
    reading.strength = strength;
    reading.should_vote = Some(should_vote);
    reading = reading
        .with_diag("band_width", json!(band_width))
        .with_diag("width_threshold", json!(width_threshold))
        .with_diag("upper_distance", json!(upper_distance))
        .with_diag("lower_distance", json!(lower_distance));
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_candles;

    fn flat_then_rise() -> Vec<Candle> {
        let mut data: Vec<(f64, f64, f64, f64)> = (0..25)
            .map(|_| (100.0, 100.2, 99.8, 100.0))
            .collect();
        for i in 0..5 {
            let p = 100.0 + i as f64 * 0.05;
            data.push((p, p + 0.1, p - 0.02, p + 0.05));
        }
        make_candles(&data)
    }

    #[test]
    fn rising_price_near_upper_band_votes_rise() {
        let candles = flat_then_rise();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let bands = ta::bollinger_bands(&closes, 10, 1.5).unwrap();
        let reading = analyze(&candles, &bands, 10).unwrap();
        assert_eq!(reading.trend, TrendDirection::Rise);
        assert!(reading.strength >= STRENGTH_FLOOR);
    }

    #[test]
    fn overextended_price_suppresses_vote_and_zeroes_strength() {
        let candles = flat_then_rise();
        // Shrink the bands so the last close sits far above upper*1.005.
        let bands = BollingerBands {
            upper: 90.0,
            middle: 89.0,
            lower: 88.0,
        };
        let reading = analyze(&candles, &bands, 10).unwrap();
        assert_eq!(reading.trend, TrendDirection::Unknown);
        assert_eq!(reading.strength, 0.0);
        assert_eq!(reading.should_vote, Some(false));
    }

    #[test]
    fn erratic_short_window_damps_strength() {
        let mut data: Vec<(f64, f64, f64, f64)> =
            (0..25).map(|_| (100.0, 100.3, 99.7, 100.1)).collect();
        // Violent last few bars around a rising close.
        data.push((100.0, 103.0, 97.0, 102.0));
        data.push((102.0, 105.0, 98.0, 99.0));
        data.push((99.0, 104.0, 96.0, 103.0));
        data.push((103.0, 106.0, 97.0, 98.5));
        data.push((98.5, 105.0, 96.5, 103.5));
        let candles = make_candles(&data);
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let bands = ta::bollinger_bands(&closes, 10, 1.5).unwrap();
        let reading = analyze(&candles, &bands, 10).unwrap();
        assert_eq!(reading.should_vote, Some(false));
    }
}

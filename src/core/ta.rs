//! Standard numeric recipes shared by the trend indicators and the
//! base-confidence scorer. All functions operate on plain slices and return
//! `None` when the input is too short instead of panicking.

use crate::models::Candle;

#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Simple moving average of the last `window` values of `values`.
pub fn sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Sample standard deviation of a slice.
pub fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Rolling sample standard deviation; the first `window - 1` slots are NaN.
pub fn rolling_stddev(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for i in (window - 1)..values.len() {
        out[i] = stddev(&values[i + 1 - window..=i]);
    }
    out
}

/// Exponential moving average series with span semantics
/// (`alpha = 2 / (span + 1)`), seeded with the first value.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return Vec::new();
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

pub fn ema(values: &[f64], span: usize) -> Option<f64> {
    ema_series(values, span).last().copied()
}

/// Weighted mean with linearly increasing weights 1..=n.
fn weighted_mean(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let denom = (n * (n + 1)) as f64 / 2.0;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (i + 1) as f64 * v)
        .sum::<f64>()
        / denom
}

/// Rolling linearly-weighted moving average; leading `window - 1` slots NaN.
pub fn wma_series(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for i in (window - 1)..values.len() {
        out[i] = weighted_mean(&values[i + 1 - window..=i]);
    }
    out
}

/// Hull moving average: `2*WMA(n/2) - WMA(n)` smoothed by `WMA(floor(sqrt(n)))`.
/// Requires at least `period` samples. The leading undefined region is filled
/// with the first defined value so callers can compare across the window.
pub fn hull_moving_average(values: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || values.len() < period {
        return None;
    }

    let half = (period / 2).max(1);
    let wma_half = wma_series(values, half);
    let wma_full = wma_series(values, period);

    let raw: Vec<f64> = wma_half
        .iter()
        .zip(&wma_full)
        .map(|(h, f)| 2.0 * h - f)
        .collect();

    let sqrt_period = ((period as f64).sqrt() as usize).max(1);
    let mut hma = wma_series(&raw, sqrt_period);

    // NaN inputs inside a smoothing window poison its output; recompute the
    // first windows that straddle the undefined region of `raw`.
    for i in 0..hma.len() {
        if hma[i].is_nan() && i + 1 >= sqrt_period {
            let slice = &raw[i + 1 - sqrt_period..=i];
            if slice.iter().all(|v| v.is_finite()) {
                hma[i] = weighted_mean(slice);
            }
        }
    }

    let first_defined = hma.iter().copied().find(|v| v.is_finite())?;
    for v in &mut hma {
        if !v.is_finite() {
            *v = first_defined;
        }
    }
    Some(hma)
}

/// Bollinger bands over the last `window` closes.
pub fn bollinger_bands(closes: &[f64], window: usize, window_dev: f64) -> Option<BollingerBands> {
    if window < 2 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    let middle = tail.iter().sum::<f64>() / window as f64;
    let dev = stddev(tail);
    Some(BollingerBands {
        upper: middle + dev * window_dev,
        middle,
        lower: middle - dev * window_dev,
    })
}

/// RSI from rolling-mean average gains/losses over `window` periods.
pub fn rsi(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &deltas[deltas.len() - window..];
    let avg_gain = tail.iter().filter(|d| **d > 0.0).sum::<f64>() / window as f64;
    let avg_loss = -tail.iter().filter(|d| **d < 0.0).sum::<f64>() / window as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD line and signal line (latest values).
pub fn macd(
    closes: &[f64],
    window_fast: usize,
    window_slow: usize,
    window_sign: usize,
) -> Option<(f64, f64)> {
    if closes.len() < window_slow {
        return None;
    }
    let fast = ema_series(closes, window_fast);
    let slow = ema_series(closes, window_slow);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, window_sign);
    Some((*line.last()?, *signal.last()?))
}

/// Average true range over `window` periods (rolling-mean variant).
pub fn atr(candles: &[Candle], window: usize) -> Option<f64> {
    if window == 0 || candles.len() < window + 1 {
        return None;
    }
    let mut ranges = Vec::with_capacity(candles.len() - 1);
    for pair in candles.windows(2) {
        let prev_close = pair[0].close;
        let c = &pair[1];
        let tr = (c.high - c.low)
            .max((c.high - prev_close).abs())
            .max((c.low - prev_close).abs());
        ranges.push(tr);
    }
    sma(&ranges, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn sma_last_window() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert!((sma(&v, 2).unwrap() - 3.5).abs() < 1e-9);
        assert!(sma(&v, 5).is_none());
    }

    #[test]
    fn ema_follows_trend() {
        let v = ramp(50);
        let fast = ema(&v, 9).unwrap();
        let slow = ema(&v, 21).unwrap();
        assert!(fast > slow, "fast EMA should lead in an uptrend");
    }

    #[test]
    fn wma_weights_recent_values_more() {
        let v = vec![1.0, 2.0, 3.0];
        let w = wma_series(&v, 3);
        // (1*1 + 2*2 + 3*3) / 6 = 14/6
        assert!((w[2] - 14.0 / 6.0).abs() < 1e-9);
        assert!(w[0].is_nan() && w[1].is_nan());
    }

    #[test]
    fn hull_is_nondecreasing_on_monotonic_input() {
        let v = ramp(120);
        let hma = hull_moving_average(&v, 21).unwrap();
        assert_eq!(hma.len(), v.len());
        assert!(hma.iter().all(|x| x.is_finite()));
        for pair in hma.windows(2) {
            assert!(
                pair[1] >= pair[0] - 1e-9,
                "hull average regressed: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn hull_requires_period_samples() {
        assert!(hull_moving_average(&ramp(10), 21).is_none());
    }

    #[test]
    fn bollinger_band_ordering() {
        let mut v = ramp(20);
        v[10] += 5.0;
        let b = bollinger_bands(&v, 10, 1.5).unwrap();
        assert!(b.upper > b.middle && b.middle > b.lower);
    }

    #[test]
    fn rsi_bounds() {
        let up = rsi(&ramp(30), 14).unwrap();
        assert!((up - 100.0).abs() < 1e-9, "all gains should read 100");

        let down: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let r = rsi(&down, 14).unwrap();
        assert!((0.0..=100.0).contains(&r));
        assert!(r < 1.0, "all losses should read near 0, got {r}");
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let (line, signal) = macd(&ramp(80), 12, 26, 9).unwrap();
        assert!(line > 0.0);
        assert!(signal > 0.0);
    }

    #[test]
    fn atr_reflects_range() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| Candle {
                epoch: i * 60,
                open: 100.0,
                high: 102.0,
                low: 98.0,
                close: 100.0,
            })
            .collect();
        let a = atr(&candles, 14).unwrap();
        assert!((a - 4.0).abs() < 1e-9);
    }
}

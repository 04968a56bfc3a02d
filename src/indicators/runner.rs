//! Turns one spec plus one candle window into a canonical result. All
//! failure modes are folded into `IndicatorResult::errored` so one broken
//! indicator degrades the cycle instead of aborting it.

use tracing::warn;

use super::{spec::IndicatorParams, EvalContext, IndicatorResult, IndicatorSpec};
use super::{bollinger, ema, hull, micro};
use crate::errors::BotError;
use crate::models::Candle;

pub struct IndicatorRunner<'a> {
    spec: &'a IndicatorSpec,
}

impl<'a> IndicatorRunner<'a> {
    pub fn new(spec: &'a IndicatorSpec) -> Self {
        Self { spec }
    }

    pub fn evaluate(&self, candles: &[Candle], ctx: &EvalContext) -> IndicatorResult {
        let name = self.spec.kind.name();
        if candles.len() < self.spec.min_data_points {
            return IndicatorResult::errored(
                name,
                BotError::DataInsufficiency {
                    have: candles.len(),
                    need: self.spec.min_data_points,
                }
                .to_string(),
            );
        }

        let reading = match self.spec.params {
            IndicatorParams::Bollinger { window, .. } => match ctx.bands {
                Some(ref bands) => bollinger::analyze(candles, bands, window),
                None => Err(BotError::Computation(
                    "bollinger bands unavailable".to_string(),
                )),
            },
            IndicatorParams::Ema {
                fast_period,
                slow_period,
            } => ema::analyze(candles, fast_period, slow_period),
            IndicatorParams::Hull {
                short_period,
                long_period,
            } => hull::analyze(candles, short_period, long_period),
            IndicatorParams::Micro {
                period,
                strength_threshold,
            } => micro::analyze(candles, period, strength_threshold),
        };

        let reading = match reading {
            Ok(r) => r,
            Err(e) => return IndicatorResult::errored(name, e.to_string()),
        };

        let should_vote = reading
            .should_vote
            .unwrap_or_else(|| reading.trend.is_directional());

        let mut result = IndicatorResult {
            name: name.to_string(),
            trend: reading.trend,
            strength: reading.strength,
            confidence: reading.confidence,
            should_vote,
            weight: 0.0,
            valid_for_consensus: false,
            error: None,
            diagnostics: reading.diagnostics,
        };

        let raw_weight = self.spec.weight.apply(&result);
        result.weight = if raw_weight.is_finite() {
            raw_weight.clamp(0.0, self.spec.weight_max)
        } else {
            warn!(indicator = name, "non-finite weight, using fallback");
            1.0
        };
        result.valid_for_consensus = self.spec.validation.check(&result);
        result
    }
}

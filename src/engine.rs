//! One analysis cycle: run every enabled indicator over the closed-candle
//! window, put the results to a consensus vote, and score a signal
//! candidate when the vote carries.

use std::sync::Arc;

use tracing::{debug, info};

use crate::consensus::{
    self, ConfidenceBreakdown, ConsensusEngine, ConsensusVerdict, MIN_BASE_CONFIDENCE,
};
use crate::core::ta;
use crate::indicators::{
    EvalContext, IndicatorKind, IndicatorParams, IndicatorRegistry, IndicatorResult,
    IndicatorRunner,
};
use crate::models::{Candle, SignalDirection};

const RSI_WINDOW: usize = 14;
const ATR_WINDOW: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGN: usize = 9;

/// A consensus-backed direction with its scored confidence, ready to become
/// a signal if the caller's gates (cooldown, minimum confidence) pass.
#[derive(Debug, Clone)]
pub struct SignalCandidate {
    pub direction: SignalDirection,
    pub confidence: u8,
    pub breakdown: ConfidenceBreakdown,
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub results: Vec<IndicatorResult>,
    pub verdict: ConsensusVerdict,
    pub candidate: Option<SignalCandidate>,
}

pub struct SignalEngine {
    registry: Arc<IndicatorRegistry>,
    consensus: ConsensusEngine,
}

impl SignalEngine {
    pub fn new(registry: Arc<IndicatorRegistry>, consensus: ConsensusEngine) -> Self {
        Self {
            registry,
            consensus,
        }
    }

    pub fn registry(&self) -> &IndicatorRegistry {
        &self.registry
    }

    pub fn run_cycle(&self, candles: &[Candle]) -> CycleOutcome {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let bands = self
            .registry
            .get(IndicatorKind::Bollinger)
            .and_then(|spec| match spec.params {
                IndicatorParams::Bollinger { window, window_dev } => {
                    ta::bollinger_bands(&closes, window, window_dev)
                }
                _ => None,
            });
        let ctx = EvalContext { bands };

        let results: Vec<IndicatorResult> = self
            .registry
            .enabled()
            .map(|spec| IndicatorRunner::new(spec).evaluate(candles, &ctx))
            .collect();
        for r in &results {
            debug!(
                indicator = %r.name,
                trend = %r.trend,
                strength = r.strength,
                weight = r.weight,
                valid = r.valid_for_consensus,
                error = r.error.as_deref(),
                "indicator evaluated"
            );
        }

        let verdict = self.consensus.analyze(&results);
        if !verdict.has_consensus {
            debug!(reason = %verdict.reason, "no consensus");
            return CycleOutcome {
                results,
                verdict,
                candidate: None,
            };
        }

        let Some(signal_direction) = verdict.direction.and_then(|d| d.to_signal_direction())
        else {
            return CycleOutcome {
                results,
                verdict,
                candidate: None,
            };
        };
        let direction = signal_direction.to_trend_direction();

        // Base confidence needs a handful of auxiliary series. When any of
        // them is undefined on a short window, fall back to the floor.
        let base = match (
            ta::rsi(&closes, RSI_WINDOW),
            ta::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGN),
            ta::atr(candles, ATR_WINDOW),
            candles.last(),
            ctx.bands,
        ) {
            (Some(rsi), Some((macd, macd_signal)), Some(atr), Some(last), Some(bands)) => {
                consensus::base_confidence(
                    direction,
                    rsi,
                    macd,
                    macd_signal,
                    last.body(),
                    atr,
                    last.close,
                    &bands,
                )
            }
            _ => MIN_BASE_CONFIDENCE,
        };

        let breakdown = self
            .consensus
            .distribute_confidence(&results, direction, base);
        info!(
            direction = %signal_direction,
            base = breakdown.base,
            bonus = breakdown.bonus,
            confidence = breakdown.final_confidence,
            "signal candidate"
        );
        CycleOutcome {
            results,
            verdict,
            candidate: Some(SignalCandidate {
                direction: signal_direction,
                confidence: breakdown.final_confidence,
                breakdown,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ConsensusConfig;
    use crate::indicators::IndicatorRegistry;
    use crate::models::TrendDirection;
    use crate::test_helpers::{default_test_config, make_bullish_trend, make_candles};

    fn engine() -> SignalEngine {
        let cfg = default_test_config();
        let registry = Arc::new(IndicatorRegistry::from_config(&cfg).unwrap());
        SignalEngine::new(
            registry,
            ConsensusEngine::new(ConsensusConfig {
                min_indicators: cfg.min_indicators,
                consensus_threshold: cfg.consensus_threshold,
                max_bonus_percentage: cfg.max_bonus_percentage,
                require_primary_consensus: cfg.require_primary_consensus,
            }),
        )
    }

    #[test]
    fn uptrend_produces_rise_candidate() {
        let candles = make_bullish_trend(120, 100.0);
        let outcome = engine().run_cycle(&candles);
        assert!(outcome.verdict.has_consensus, "{}", outcome.verdict.reason);
        let candidate = outcome.candidate.expect("candidate expected");
        assert_eq!(candidate.direction, SignalDirection::Rise);
        assert!(candidate.confidence >= MIN_BASE_CONFIDENCE);
        assert!(candidate.confidence <= 100);
    }

    #[test]
    fn short_window_yields_no_candidate() {
        let candles = make_bullish_trend(4, 100.0);
        let outcome = engine().run_cycle(&candles);
        assert!(!outcome.verdict.has_consensus);
        assert!(outcome.candidate.is_none());
        assert!(outcome.results.iter().all(|r| r.error.is_some()));
    }

    #[test]
    fn flat_market_yields_no_candidate() {
        let data: Vec<(f64, f64, f64, f64)> = (0..120)
            .map(|i| {
                let wiggle = if i % 2 == 0 { 0.01 } else { -0.01 };
                (100.0, 100.05, 99.95, 100.0 + wiggle)
            })
            .collect();
        let outcome = engine().run_cycle(&make_candles(&data));
        assert!(outcome.candidate.is_none());
        assert!(outcome
            .results
            .iter()
            .filter(|r| r.error.is_none())
            .all(|r| r.trend != TrendDirection::Unknown));
    }
}

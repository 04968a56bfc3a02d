//! Weighted-vote consensus across indicator results, plus the confidence
//! model: a market-condition base score and a proportional bonus split
//! across the agreeing indicators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ta::BollingerBands;
use crate::indicators::IndicatorResult;
use crate::models::TrendDirection;

pub const MIN_BASE_CONFIDENCE: u8 = 20;
pub const MAX_BASE_CONFIDENCE: u8 = 60;

#[derive(Debug, Clone, Copy)]
pub struct ConsensusConfig {
    pub min_indicators: usize,
    pub consensus_threshold: f64,
    pub max_bonus_percentage: u8,
    /// When set, the Bollinger family must be among the winning voters.
    pub require_primary_consensus: bool,
}

/// Outcome of one consensus round. `reason` is a human-readable account of
/// why consensus was or was not reached, for logs and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusVerdict {
    pub has_consensus: bool,
    pub direction: Option<TrendDirection>,
    pub votes: BTreeMap<String, TrendDirection>,
    pub total_evaluated: usize,
    pub valid_count: usize,
    pub winning_votes: usize,
    pub agreement_pct: f64,
    pub reason: String,
}

impl ConsensusVerdict {
    fn rejected(total: usize, valid: usize, reason: String) -> Self {
        Self {
            has_consensus: false,
            direction: None,
            votes: BTreeMap::new(),
            total_evaluated: total,
            valid_count: valid,
            winning_votes: 0,
            agreement_pct: 0.0,
            reason,
        }
    }
}

/// Breakdown of the final confidence figure for one signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub base: u8,
    pub bonus: u8,
    pub weights: BTreeMap<String, f64>,
    pub bonuses: BTreeMap<String, u8>,
    pub final_confidence: u8,
}

pub struct ConsensusEngine {
    config: ConsensusConfig,
}

impl ConsensusEngine {
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, results: &[IndicatorResult]) -> ConsensusVerdict {
        let total = results.len();
        let valid: Vec<&IndicatorResult> =
            results.iter().filter(|r| r.valid_for_consensus).collect();

        if valid.len() < self.config.min_indicators {
            return ConsensusVerdict::rejected(
                total,
                valid.len(),
                format!(
                    "insufficient valid indicators: {}/{}",
                    valid.len(),
                    self.config.min_indicators
                ),
            );
        }

        let mut votes = BTreeMap::new();
        let mut rise = 0usize;
        let mut fall = 0usize;
        for r in &valid {
            votes.insert(r.name.clone(), r.trend);
            match r.trend {
                TrendDirection::Rise => rise += 1,
                TrendDirection::Fall => fall += 1,
                _ => {}
            }
        }

        let directional = rise + fall;
        if directional == 0 {
            return ConsensusVerdict::rejected(
                total,
                valid.len(),
                "no directional votes".to_string(),
            );
        }
        if rise == fall {
            return ConsensusVerdict::rejected(
                total,
                valid.len(),
                format!("tied vote: {rise} RISE vs {fall} FALL"),
            );
        }

        let (direction, winning) = if rise > fall {
            (TrendDirection::Rise, rise)
        } else {
            (TrendDirection::Fall, fall)
        };
        let agreement = winning as f64 / valid.len() as f64;
        if agreement < self.config.consensus_threshold {
            return ConsensusVerdict::rejected(
                total,
                valid.len(),
                format!(
                    "agreement {:.0}% below threshold {:.0}%",
                    agreement * 100.0,
                    self.config.consensus_threshold * 100.0
                ),
            );
        }

        if self.config.require_primary_consensus {
            let primary_agrees = valid.iter().any(|r| r.name == "BB" && r.trend == direction);
            if !primary_agrees {
                return ConsensusVerdict::rejected(
                    total,
                    valid.len(),
                    "primary indicator not among winning voters".to_string(),
                );
            }
        }

        debug!(
            %direction,
            winning,
            valid = valid.len(),
            agreement_pct = agreement * 100.0,
            "consensus reached"
        );
        ConsensusVerdict {
            has_consensus: true,
            direction: Some(direction),
            votes,
            total_evaluated: total,
            valid_count: valid.len(),
            winning_votes: winning,
            agreement_pct: agreement * 100.0,
            reason: format!("{winning}/{} indicators agree on {direction}", valid.len()),
        }
    }

    /// Split the bonus budget across the winning voters in proportion to
    /// their weights. Each share is floored, so the distributed total never
    /// exceeds the budget.
    pub fn distribute_confidence(
        &self,
        results: &[IndicatorResult],
        direction: TrendDirection,
        base: u8,
    ) -> ConfidenceBreakdown {
        let winners: Vec<&IndicatorResult> = results
            .iter()
            .filter(|r| r.valid_for_consensus && r.trend == direction)
            .collect();

        let total_weight: f64 = winners.iter().map(|r| r.weight).sum();
        let mut weights = BTreeMap::new();
        let mut bonuses = BTreeMap::new();
        let mut bonus_total: u16 = 0;

        for r in &winners {
            weights.insert(r.name.clone(), r.weight);
            let share = if total_weight > 0.0 {
                (self.config.max_bonus_percentage as f64 * r.weight / total_weight).floor() as u8
            } else {
                0
            };
            bonuses.insert(r.name.clone(), share);
            bonus_total += share as u16;
        }

        let final_confidence = (base as u16 + bonus_total).min(100) as u8;
        ConfidenceBreakdown {
            base,
            bonus: bonus_total.min(u8::MAX as u16) as u8,
            weights,
            bonuses,
            final_confidence,
        }
    }
}

/// Base confidence from market conditions at signal time. Starts at
/// `MIN_BASE_CONFIDENCE` and accumulates toward `MAX_BASE_CONFIDENCE`;
/// each condition only rewards alignment with the signal direction.
#[allow(clippy::too_many_arguments)]
pub fn base_confidence(
    direction: TrendDirection,
    rsi: f64,
    macd: f64,
    macd_signal: f64,
    body: f64,
    atr: f64,
    close: f64,
    bands: &BollingerBands,
) -> u8 {
    let mut score = MIN_BASE_CONFIDENCE as u16;

    match direction {
        TrendDirection::Rise => {
            if (55.0..=75.0).contains(&rsi) {
                score += 10;
            } else if (50.0..55.0).contains(&rsi) {
                score += 5;
            }
        }
        TrendDirection::Fall => {
            if (30.0..=50.0).contains(&rsi) {
                score += 10;
            } else if rsi > 50.0 && rsi <= 55.0 {
                score += 5;
            }
        }
        _ => {}
    }

    let macd_aligned = match direction {
        TrendDirection::Rise => macd > macd_signal,
        TrendDirection::Fall => macd < macd_signal,
        _ => false,
    };
    if macd_aligned {
        let diff = ((macd - macd_signal).abs() * 100.0) as u16;
        score += diff.clamp(5, 10);
    }

    if atr > 0.0 {
        if body >= 0.8 * atr {
            score += 10;
        } else if body >= 0.5 * atr {
            score += 7;
        } else if body >= 0.3 * atr {
            score += 4;
        }
    }

    match direction {
        TrendDirection::Rise => {
            if close > bands.upper {
                score += 10;
            } else if close > bands.middle {
                score += 5;
            }
        }
        TrendDirection::Fall => {
            if close < bands.lower {
                score += 10;
            } else if close < bands.middle {
                score += 5;
            }
        }
        _ => {}
    }

    score.min(MAX_BASE_CONFIDENCE as u16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ConsensusEngine {
        ConsensusEngine::new(ConsensusConfig {
            min_indicators: 2,
            consensus_threshold: 0.6,
            max_bonus_percentage: 40,
            require_primary_consensus: false,
        })
    }

    fn voter(name: &str, trend: TrendDirection, weight: f64) -> IndicatorResult {
        IndicatorResult {
            name: name.to_string(),
            trend,
            strength: 0.8,
            confidence: 0.8,
            should_vote: true,
            weight,
            valid_for_consensus: trend.is_directional(),
            error: None,
            diagnostics: Default::default(),
        }
    }

    #[test]
    fn too_few_valid_indicators_reject() {
        let results = vec![
            voter("BB", TrendDirection::Rise, 20.0),
            IndicatorResult::errored("EMA", "boom".to_string()),
        ];
        let verdict = engine().analyze(&results);
        assert!(!verdict.has_consensus);
        assert!(verdict.reason.contains("insufficient valid indicators: 1/2"));
    }

    #[test]
    fn tied_vote_rejects() {
        let results = vec![
            voter("BB", TrendDirection::Rise, 20.0),
            voter("EMA", TrendDirection::Rise, 10.0),
            voter("HMA", TrendDirection::Fall, 15.0),
            voter("Micro", TrendDirection::Fall, 12.0),
        ];
        let verdict = engine().analyze(&results);
        assert!(!verdict.has_consensus);
        assert!(verdict.reason.contains("tied vote"));
    }

    #[test]
    fn threshold_boundary() {
        // 3 of 5 valid voters agree: 60% meets the 0.6 threshold.
        let results = vec![
            voter("BB", TrendDirection::Rise, 20.0),
            voter("EMA", TrendDirection::Rise, 10.0),
            voter("HMA", TrendDirection::Rise, 15.0),
            voter("Micro", TrendDirection::Fall, 12.0),
            voter("X", TrendDirection::Fall, 5.0),
        ];
        let verdict = engine().analyze(&results);
        assert!(verdict.has_consensus);
        assert_eq!(verdict.direction, Some(TrendDirection::Rise));
        assert_eq!(verdict.winning_votes, 3);
        assert!((verdict.agreement_pct - 60.0).abs() < 1e-9);

        // 4 of 7 agreeing is 57.1%, just under the threshold.
        let results = vec![
            voter("BB", TrendDirection::Fall, 20.0),
            voter("EMA", TrendDirection::Fall, 10.0),
            voter("HMA", TrendDirection::Fall, 15.0),
            voter("Micro", TrendDirection::Fall, 12.0),
            voter("A", TrendDirection::Rise, 5.0),
            voter("B", TrendDirection::Rise, 5.0),
            voter("C", TrendDirection::Rise, 5.0),
        ];
        let verdict = engine().analyze(&results);
        assert!(
            !verdict.has_consensus,
            "4/7 agreement must fail: {}",
            verdict.reason
        );
        assert!(verdict.reason.contains("below threshold"));
    }

    #[test]
    fn sideways_and_errored_results_never_vote() {
        let results = vec![
            voter("BB", TrendDirection::Rise, 20.0),
            voter("EMA", TrendDirection::Rise, 10.0),
            voter("HMA", TrendDirection::Sideways, 15.0),
            IndicatorResult::errored("Micro", "boom".to_string()),
        ];
        let verdict = engine().analyze(&results);
        assert!(verdict.has_consensus);
        assert_eq!(verdict.total_evaluated, 4);
        assert_eq!(verdict.valid_count, 2);
        assert_eq!(verdict.winning_votes, 2);
        assert!(!verdict.votes.contains_key("HMA"));
        assert!(!verdict.votes.contains_key("Micro"));
    }

    #[test]
    fn primary_requirement_rejects_without_bb() {
        let eng = ConsensusEngine::new(ConsensusConfig {
            min_indicators: 2,
            consensus_threshold: 0.6,
            max_bonus_percentage: 40,
            require_primary_consensus: true,
        });
        let results = vec![
            voter("EMA", TrendDirection::Rise, 10.0),
            voter("HMA", TrendDirection::Rise, 15.0),
        ];
        let verdict = eng.analyze(&results);
        assert!(!verdict.has_consensus);
        assert!(verdict.reason.contains("primary indicator"));
    }

    #[test]
    fn majority_with_dissent_reaches_consensus() {
        let mut results = vec![
            voter("BB", TrendDirection::Rise, 25.0),
            voter("EMA", TrendDirection::Rise, 10.0),
            voter("HMA", TrendDirection::Fall, 15.0),
            voter("Micro", TrendDirection::Sideways, 0.0),
        ];
        results[0].strength = 0.8;
        results[1].strength = 0.6;
        results[2].strength = 0.5;

        let verdict = engine().analyze(&results);
        assert!(verdict.has_consensus);
        assert_eq!(verdict.direction, Some(TrendDirection::Rise));
        assert_eq!(verdict.valid_count, 3);
        assert_eq!(verdict.winning_votes, 2);
        assert!((verdict.agreement_pct - 200.0 / 3.0).abs() < 1e-6);

        // Only the two agreeing voters share the bonus budget.
        let breakdown =
            engine().distribute_confidence(&results, TrendDirection::Rise, 20);
        assert_eq!(breakdown.bonuses.len(), 2);
        assert_eq!(breakdown.bonuses["BB"], 28);
        assert_eq!(breakdown.bonuses["EMA"], 11);
        assert_eq!(breakdown.final_confidence, 59);
    }

    #[test]
    fn bonus_split_is_proportional_and_floored() {
        let results = vec![
            voter("BB", TrendDirection::Rise, 25.0),
            voter("EMA", TrendDirection::Rise, 10.0),
        ];
        let breakdown = engine().distribute_confidence(&results, TrendDirection::Rise, 30);
        // 40 * 25/35 = 28.57 -> 28; 40 * 10/35 = 11.43 -> 11
        assert_eq!(breakdown.bonuses["BB"], 28);
        assert_eq!(breakdown.bonuses["EMA"], 11);
        assert_eq!(breakdown.bonus, 39);
        assert_eq!(breakdown.final_confidence, 69);
    }

    #[test]
    fn exact_split_reaches_full_budget() {
        let results = vec![
            voter("BB", TrendDirection::Rise, 25.0),
            voter("HMA", TrendDirection::Rise, 15.0),
        ];
        let breakdown = engine().distribute_confidence(&results, TrendDirection::Rise, 20);
        assert_eq!(breakdown.bonuses["BB"], 25);
        assert_eq!(breakdown.bonuses["HMA"], 15);
        assert_eq!(breakdown.final_confidence, 60);
    }

    #[test]
    fn final_confidence_caps_at_100() {
        let results = vec![voter("BB", TrendDirection::Rise, 25.0)];
        let breakdown = engine().distribute_confidence(&results, TrendDirection::Rise, 95);
        assert_eq!(breakdown.final_confidence, 100);
    }

    #[test]
    fn zero_total_weight_yields_zero_bonus() {
        let results = vec![voter("BB", TrendDirection::Rise, 0.0)];
        let breakdown = engine().distribute_confidence(&results, TrendDirection::Rise, 20);
        assert_eq!(breakdown.bonus, 0);
        assert_eq!(breakdown.final_confidence, 20);
    }

    #[test]
    fn base_confidence_floor_and_cap() {
        let bands = BollingerBands {
            upper: 101.0,
            middle: 100.0,
            lower: 99.0,
        };
        // Nothing aligned: floor.
        let base = base_confidence(
            TrendDirection::Rise,
            20.0,
            -1.0,
            0.0,
            0.0,
            1.0,
            99.5,
            &bands,
        );
        assert_eq!(base, MIN_BASE_CONFIDENCE);

        // Everything aligned: capped at 60 even though raw sum exceeds it.
        let base = base_confidence(
            TrendDirection::Rise,
            60.0,
            1.0,
            0.0,
            1.0,
            1.0,
            101.5,
            &bands,
        );
        assert_eq!(base, MAX_BASE_CONFIDENCE);
    }

    #[test]
    fn base_confidence_fall_conditions() {
        let bands = BollingerBands {
            upper: 101.0,
            middle: 100.0,
            lower: 99.0,
        };
        // RSI 40 (+10), MACD below signal by 0.02 (+5), body 0.6*ATR (+7),
        // close below lower band (+10) = 20 + 32 -> capped path not hit, 52.
        let base = base_confidence(
            TrendDirection::Fall,
            40.0,
            -0.02,
            0.0,
            0.6,
            1.0,
            98.5,
            &bands,
        );
        assert_eq!(base, 52);
    }
}

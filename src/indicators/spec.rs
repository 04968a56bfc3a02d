//! Declarative per-indicator configuration. Weight formulas and validation
//! predicates are closed enums evaluated natively instead of runtime
//! expression strings.

use serde::{Deserialize, Serialize};

use super::{IndicatorKind, IndicatorResult};
use crate::config::Config;
use crate::errors::BotError;

/// How an indicator's influence on the confidence bonus is derived from its
/// own reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightStrategy {
    Fixed(f64),
    /// `strength * factor`
    Strength { factor: f64 },
    /// `strength * confidence * factor`
    StrengthConfidence { factor: f64 },
}

impl WeightStrategy {
    pub fn apply(self, result: &IndicatorResult) -> f64 {
        match self {
            WeightStrategy::Fixed(w) => w,
            WeightStrategy::Strength { factor } => result.strength * factor,
            WeightStrategy::StrengthConfidence { factor } => {
                result.strength * result.confidence * factor
            }
        }
    }
}

/// Predicate deciding whether a result may participate in consensus.
/// An errored result always fails, regardless of the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationRule {
    /// Trend must be RISE or FALL.
    Directional,
    /// Trend must be directional and the indicator itself must want to vote.
    VoteAndDirectional,
}

impl ValidationRule {
    pub fn check(self, result: &IndicatorResult) -> bool {
        if result.error.is_some() {
            return false;
        }
        match self {
            ValidationRule::Directional => result.trend.is_directional(),
            ValidationRule::VoteAndDirectional => {
                result.should_vote && result.trend.is_directional()
            }
        }
    }
}

/// Parameters for one indicator family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IndicatorParams {
    Bollinger { window: usize, window_dev: f64 },
    Ema { fast_period: usize, slow_period: usize },
    Hull { short_period: usize, long_period: usize },
    Micro { period: usize, strength_threshold: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub kind: IndicatorKind,
    pub enabled: bool,
    pub params: IndicatorParams,
    pub min_data_points: usize,
    pub weight: WeightStrategy,
    pub weight_max: f64,
    pub validation: ValidationRule,
}

/// The set of indicator specs active for a process. Read-mostly; a reload
/// builds a fresh registry and swaps it in whole so an in-flight cycle
/// never sees a half-updated set.
#[derive(Debug, Clone)]
pub struct IndicatorRegistry {
    specs: Vec<IndicatorSpec>,
}

impl IndicatorRegistry {
    pub fn from_config(cfg: &Config) -> Result<Self, BotError> {
        let specs = vec![
            IndicatorSpec {
                kind: IndicatorKind::Bollinger,
                enabled: cfg.bb_enabled,
                params: IndicatorParams::Bollinger {
                    window: cfg.bb_window,
                    window_dev: cfg.bb_window_dev,
                },
                min_data_points: cfg.bb_window,
                weight: WeightStrategy::Strength { factor: 25.0 },
                weight_max: 25.0,
                validation: ValidationRule::VoteAndDirectional,
            },
            IndicatorSpec {
                kind: IndicatorKind::Ema,
                enabled: cfg.ema_enabled,
                params: IndicatorParams::Ema {
                    fast_period: cfg.ema_fast_period,
                    slow_period: cfg.ema_slow_period,
                },
                min_data_points: cfg.ema_slow_period,
                weight: WeightStrategy::Fixed(10.0),
                weight_max: 10.0,
                validation: ValidationRule::Directional,
            },
            IndicatorSpec {
                kind: IndicatorKind::Hull,
                enabled: cfg.hma_enabled,
                params: IndicatorParams::Hull {
                    short_period: cfg.hma_short_period,
                    long_period: cfg.hma_long_period,
                },
                min_data_points: cfg.hma_long_period,
                weight: WeightStrategy::Fixed(15.0),
                weight_max: 15.0,
                validation: ValidationRule::Directional,
            },
            IndicatorSpec {
                kind: IndicatorKind::Micro,
                enabled: cfg.micro_enabled,
                params: IndicatorParams::Micro {
                    period: cfg.micro_period,
                    strength_threshold: cfg.micro_strength_threshold,
                },
                min_data_points: cfg.micro_period,
                weight: WeightStrategy::StrengthConfidence { factor: 20.0 },
                weight_max: 20.0,
                validation: ValidationRule::Directional,
            },
        ];

        let registry = Self { specs };
        if registry.enabled().next().is_none() {
            return Err(BotError::Configuration(
                "no indicators enabled".to_string(),
            ));
        }
        Ok(registry)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &IndicatorSpec> {
        self.specs.iter().filter(|s| s.enabled)
    }

    pub fn get(&self, kind: IndicatorKind) -> Option<&IndicatorSpec> {
        self.specs.iter().find(|s| s.kind == kind)
    }
}

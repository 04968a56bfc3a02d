pub mod bollinger;
pub mod ema;
pub mod hull;
pub mod micro;
pub mod runner;
pub mod spec;

pub use runner::IndicatorRunner;
pub use spec::{IndicatorParams, IndicatorRegistry, IndicatorSpec, ValidationRule, WeightStrategy};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::ta::BollingerBands;
use crate::errors::BotError;
use crate::models::TrendDirection;

/// The closed set of indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Bollinger,
    Ema,
    Hull,
    Micro,
}

impl IndicatorKind {
    pub fn name(self) -> &'static str {
        match self {
            IndicatorKind::Bollinger => "BB",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Hull => "HMA",
            IndicatorKind::Micro => "Micro",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-cycle values computed once and shared across runners. The Bollinger
/// indicator analyzes bands that the cycle has already computed (they also
/// feed the base-confidence scorer), so they are passed in rather than
/// recomputed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext {
    pub bands: Option<BollingerBands>,
}

/// What an indicator computation reports before weighting and validation.
/// `should_vote: None` means "derive from the trend" (directional => vote).
#[derive(Debug, Clone)]
pub struct IndicatorReading {
    pub trend: TrendDirection,
    pub strength: f64,
    pub confidence: f64,
    pub should_vote: Option<bool>,
    pub diagnostics: BTreeMap<String, serde_json::Value>,
}

impl IndicatorReading {
    pub fn new(trend: TrendDirection) -> Self {
        Self {
            trend,
            strength: 0.0,
            confidence: 0.0,
            should_vote: None,
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn with_diag(mut self, key: &str, value: serde_json::Value) -> Self {
        self.diagnostics.insert(key.to_string(), value);
        self
    }
}

pub type ReadingResult = Result<IndicatorReading, BotError>;

/// Canonical per-indicator output of one evaluation cycle. Created fresh
/// every cycle; the runner attaches the computed weight and validity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub name: String,
    pub trend: TrendDirection,
    pub strength: f64,
    pub confidence: f64,
    pub should_vote: bool,
    pub weight: f64,
    pub valid_for_consensus: bool,
    pub error: Option<String>,
    #[serde(default)]
    pub diagnostics: BTreeMap<String, serde_json::Value>,
}

impl IndicatorResult {
    pub fn errored(name: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            trend: TrendDirection::Unknown,
            strength: 0.0,
            confidence: 0.0,
            should_vote: false,
            weight: 0.0,
            valid_for_consensus: false,
            error: Some(error),
            diagnostics: BTreeMap::new(),
        }
    }
}

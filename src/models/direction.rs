use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional reading produced by a trend indicator. Only Rise and Fall
/// ever contribute a consensus vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Rise,
    Fall,
    Sideways,
    Unknown,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Rise => write!(f, "RISE"),
            TrendDirection::Fall => write!(f, "FALL"),
            TrendDirection::Sideways => write!(f, "SIDEWAYS"),
            TrendDirection::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl TrendDirection {
    pub fn is_directional(self) -> bool {
        matches!(self, TrendDirection::Rise | TrendDirection::Fall)
    }

    pub fn to_signal_direction(self) -> Option<SignalDirection> {
        match self {
            TrendDirection::Rise => Some(SignalDirection::Rise),
            TrendDirection::Fall => Some(SignalDirection::Fall),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalDirection {
    Rise,
    Fall,
}

impl SignalDirection {
    pub fn to_trend_direction(self) -> TrendDirection {
        match self {
            SignalDirection::Rise => TrendDirection::Rise,
            SignalDirection::Fall => TrendDirection::Fall,
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalDirection::Rise => write!(f, "RISE"),
            SignalDirection::Fall => write!(f, "FALL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Win,
    Loss,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "WIN"),
            Outcome::Loss => write!(f, "LOSS"),
        }
    }
}

/// Gale (martingale retry) ladder level. The ladder is bounded; G2 is the
/// last rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GaleLevel {
    G1,
    G2,
}

impl GaleLevel {
    pub fn next(self) -> Option<GaleLevel> {
        match self {
            GaleLevel::G1 => Some(GaleLevel::G2),
            GaleLevel::G2 => None,
        }
    }
}

impl fmt::Display for GaleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GaleLevel::G1 => write!(f, "G1"),
            GaleLevel::G2 => write!(f, "G2"),
        }
    }
}

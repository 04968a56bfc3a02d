use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candle::Candle;
use super::direction::{GaleLevel, Outcome, SignalDirection};

/// A directional trading signal bound to a future candle. Delivery-channel
/// identifiers are opaque to the engine; they are stored so outcome replies
/// can reference the original message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: String,
    pub direction: SignalDirection,
    pub confidence: u8,
    pub analyze_time: DateTime<Utc>,
    pub entry_time: DateTime<Utc>,
    /// Open time of the candle this signal is judged against.
    pub open_candle_epoch: i64,
    pub message_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub outcome: Option<Outcome>,
}

/// One martingale retry attempt, bound to the candle that follows a loss.
/// Carries its own OHLC so judgment survives process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaleItem {
    pub level: GaleLevel,
    pub epoch: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub outcome: Option<Outcome>,
}

impl GaleItem {
    pub fn candle(&self) -> Candle {
        Candle {
            epoch: self.epoch,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }
}

/// Unit of storage and lookup: a candle plus its signal and the ordered
/// gale ladder. Looked up by epoch or by signal id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleRecord {
    pub epoch: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub signal: Option<Signal>,
    #[serde(default)]
    pub gale_items: Vec<GaleItem>,
}

impl CandleRecord {
    pub fn new(epoch: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            epoch,
            open,
            high,
            low,
            close,
            signal: None,
            gale_items: Vec::new(),
        }
    }

    pub fn candle(&self) -> Candle {
        Candle {
            epoch: self.epoch,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }

    pub fn has_gale_items(&self) -> bool {
        !self.gale_items.is_empty()
    }

    pub fn latest_gale_item(&self) -> Option<&GaleItem> {
        self.gale_items.last()
    }

    pub fn latest_gale_item_mut(&mut self) -> Option<&mut GaleItem> {
        self.gale_items.last_mut()
    }

    /// The record's effective outcome: the latest gale item's outcome when
    /// the ladder is open, else the base signal's.
    pub fn effective_outcome(&self) -> Option<Outcome> {
        match self.latest_gale_item() {
            Some(item) => item.outcome,
            None => self.signal.as_ref().and_then(|s| s.outcome),
        }
    }

    /// The most recently judged attempt: its gale level (`None` for the
    /// base signal) and outcome. Rungs still awaiting their candle are
    /// skipped, so this stays stable while a fresh rung is pending.
    pub fn latest_settled_outcome(&self) -> Option<(Option<GaleLevel>, Outcome)> {
        for item in self.gale_items.iter().rev() {
            if let Some(outcome) = item.outcome {
                return Some((Some(item.level), outcome));
            }
        }
        self.signal
            .as_ref()
            .and_then(|s| s.outcome)
            .map(|outcome| (None, outcome))
    }
}

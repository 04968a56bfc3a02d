//! Market-data ingestion boundary. A feed yields a history batch on
//! (re)connect and per-tick OHLC updates afterwards.

pub mod deriv;

pub use deriv::DerivFeed;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::models::Candle;

/// Intra-candle update. `open_time` identifies the forming candle;
/// `epoch` is the timestamp of the tick that produced the update.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OhlcUpdate {
    #[serde(deserialize_with = "flexible_i64")]
    pub epoch: i64,
    #[serde(deserialize_with = "flexible_i64")]
    pub open_time: i64,
    #[serde(deserialize_with = "flexible_f64")]
    pub open: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub high: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub low: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub close: f64,
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Initial or post-reconnect batch of closed candles, oldest first.
    History(Vec<Candle>),
    Ohlc(OhlcUpdate),
}

#[async_trait]
pub trait CandleFeed: Send {
    /// Wait for the next event from the feed. An error means the stream is
    /// broken and the feed must be reconnected.
    async fn next_event(&mut self) -> Result<FeedEvent>;
}

/// Deriv serializes prices sometimes as numbers, sometimes as strings.
pub(crate) fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(i64),
        Str(String),
    }
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

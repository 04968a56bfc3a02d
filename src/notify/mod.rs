//! Outbound notification boundary. The lifecycle announces new signals and
//! replies with their outcomes through the `Notifier` trait.

pub mod telegram;

pub use telegram::TelegramNotifier;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CandleRecord, GaleItem, Signal};

/// Channel-side identifiers for a delivered announcement, kept so the
/// outcome can be sent as a reply to it.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryHandle {
    pub message_id: i64,
    pub chat_id: i64,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce a fresh signal. `price` is the close the analysis ran on.
    async fn announce_signal(&self, signal: &Signal, price: f64) -> Result<DeliveryHandle>;

    /// Report the settled (or gale-extended) outcome of a signal.
    async fn reply_outcome(&self, record: &CandleRecord) -> Result<()>;

    /// Announce a new gale ladder rung opened after a loss.
    async fn announce_gale(&self, signal: &Signal, item: &GaleItem) -> Result<()>;
}

//! Persistence boundary for candle records. The lifecycle only talks to the
//! `CandleStore` trait; backends plug in behind it.

pub mod memory;

pub use memory::MemoryCandleStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CandleRecord;

/// Keyed by candle epoch; signals are additionally reachable by their id.
#[async_trait]
pub trait CandleStore: Send + Sync {
    async fn save(&self, record: &CandleRecord) -> Result<()>;
    async fn find_by_epoch(&self, epoch: i64) -> Result<Option<CandleRecord>>;
    async fn find_by_signal_id(&self, signal_id: &str) -> Result<Option<CandleRecord>>;
    async fn update(&self, record: &CandleRecord) -> Result<()>;
}

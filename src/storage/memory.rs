//! In-memory candle store. The process keeps a bounded working set of live
//! records, so a map guarded by an async lock is enough.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CandleStore;
use crate::models::CandleRecord;

#[derive(Default)]
pub struct MemoryCandleStore {
    inner: RwLock<HashMap<i64, CandleRecord>>,
}

impl MemoryCandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl CandleStore for MemoryCandleStore {
    async fn save(&self, record: &CandleRecord) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(record.epoch, record.clone());
        Ok(())
    }

    async fn find_by_epoch(&self, epoch: i64) -> Result<Option<CandleRecord>> {
        Ok(self.inner.read().await.get(&epoch).cloned())
    }

    async fn find_by_signal_id(&self, signal_id: &str) -> Result<Option<CandleRecord>> {
        let map = self.inner.read().await;
        Ok(map
            .values()
            .find(|r| {
                r.signal
                    .as_ref()
                    .is_some_and(|s| s.signal_id == signal_id)
            })
            .cloned())
    }

    async fn update(&self, record: &CandleRecord) -> Result<()> {
        self.save(record).await
    }
}

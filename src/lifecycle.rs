//! Signal lifecycle: emission with cooldown gating, FIFO validation of
//! pending signals against closed candles, and the bounded gale ladder a
//! loss opens.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{error, info, warn};

use crate::engine::SignalCandidate;
use crate::models::{
    Candle, CandleRecord, CandleWindow, GaleItem, GaleLevel, Outcome, Signal, SignalDirection,
};
use crate::notify::Notifier;
use crate::storage::CandleStore;

const SIGNAL_ID_LEN: usize = 8;
const SIGNAL_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn generate_signal_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SIGNAL_ID_LEN)
        .map(|_| SIGNAL_ID_ALPHABET[rng.gen_range(0..SIGNAL_ID_ALPHABET.len())] as char)
        .collect()
}

/// WIN means the entry candle moved in the signalled direction.
fn judge(direction: SignalDirection, candle: &Candle) -> Outcome {
    let won = match direction {
        SignalDirection::Rise => candle.close > candle.open,
        SignalDirection::Fall => candle.close < candle.open,
    };
    if won {
        Outcome::Win
    } else {
        Outcome::Loss
    }
}

pub struct SignalLifecycle {
    store: Arc<dyn CandleStore>,
    notifier: Arc<dyn Notifier>,
    /// Signal ids awaiting validation, in emission order. Validation only
    /// ever looks at the head; later signals wait their turn.
    queue: VecDeque<String>,
    last_signal_time: Option<DateTime<Utc>>,
    last_validation_time: Option<DateTime<Utc>>,
    max_gale_level: GaleLevel,
    cooldown: Duration,
    validation_cooldown: Duration,
    granularity_secs: i64,
}

impl SignalLifecycle {
    pub fn new(
        store: Arc<dyn CandleStore>,
        notifier: Arc<dyn Notifier>,
        max_gale_level: GaleLevel,
        cooldown_secs: i64,
        validation_cooldown_secs: i64,
        granularity_secs: i64,
    ) -> Self {
        Self {
            store,
            notifier,
            queue: VecDeque::new(),
            last_signal_time: None,
            last_validation_time: None,
            max_gale_level,
            cooldown: Duration::seconds(cooldown_secs),
            validation_cooldown: Duration::seconds(validation_cooldown_secs),
            granularity_secs,
        }
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.last_signal_time
            .is_some_and(|last| now - last < self.cooldown)
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Turn a candidate into a live signal: persist it against the entry
    /// candle, announce it, and queue it for validation. The entry candle
    /// is the one opening right after the analysis candle.
    pub async fn emit(
        &mut self,
        candidate: &SignalCandidate,
        analysis_candle: &Candle,
    ) -> Result<Signal> {
        let now = Utc::now();
        let entry_epoch = analysis_candle.epoch + self.granularity_secs;
        let mut signal = Signal {
            signal_id: generate_signal_id(),
            direction: candidate.direction,
            confidence: candidate.confidence,
            analyze_time: now,
            entry_time: DateTime::from_timestamp(entry_epoch, 0).unwrap_or(now),
            open_candle_epoch: entry_epoch,
            message_id: None,
            chat_id: None,
            outcome: None,
        };

        // The entry candle has not formed yet; its OHLC is refreshed from
        // the live window at validation time.
        let mut record = CandleRecord::new(
            entry_epoch,
            analysis_candle.open,
            analysis_candle.high,
            analysis_candle.low,
            analysis_candle.close,
        );
        record.signal = Some(signal.clone());
        self.store.save(&record).await?;

        let handle = self
            .notifier
            .announce_signal(&signal, analysis_candle.close)
            .await?;
        signal.message_id = Some(handle.message_id);
        signal.chat_id = Some(handle.chat_id);
        record.signal = Some(signal.clone());
        self.store.update(&record).await?;

        self.queue.push_back(signal.signal_id.clone());
        self.last_signal_time = Some(now);
        info!(
            signal_id = %signal.signal_id,
            direction = %signal.direction,
            confidence = signal.confidence,
            entry_epoch,
            "signal emitted"
        );
        Ok(signal)
    }

    /// Validate every queued signal whose target candle has closed. Stops
    /// at the first head still waiting for its candle. Store and notifier
    /// failures are contained here: a signal that cannot be settled is
    /// logged and dropped so candle ingestion keeps running.
    pub async fn validate_pending(&mut self, window: &CandleWindow) {
        let now = Utc::now();
        if self
            .last_validation_time
            .is_some_and(|last| now - last < self.validation_cooldown)
        {
            return;
        }
        self.last_validation_time = Some(now);

        while let Some(signal_id) = self.queue.front().cloned() {
            let mut record = match self.store.find_by_signal_id(&signal_id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    error!(signal_id = %signal_id, "queued signal vanished from store, dropping");
                    self.queue.pop_front();
                    continue;
                }
                Err(e) => {
                    error!(signal_id = %signal_id, error = %e, "store lookup failed, dropping signal");
                    self.queue.pop_front();
                    continue;
                }
            };

            let target_epoch = record
                .latest_gale_item()
                .map(|g| g.epoch)
                .unwrap_or(record.epoch);
            let Some(candle) = window
                .closed()
                .iter()
                .rev()
                .find(|c| c.epoch == target_epoch)
                .cloned()
            else {
                // A strictly newer closed candle means the bound candle is
                // gone from the window (reconnect bootstrap past it); the
                // head can never be judged and must not block the queue.
                if window.last().is_some_and(|c| c.epoch > target_epoch) {
                    error!(
                        signal_id = %signal_id,
                        target_epoch,
                        "bound candle no longer in window, dropping signal"
                    );
                    self.queue.pop_front();
                    continue;
                }
                break;
            };

            let Some(direction) = record.signal.as_ref().map(|s| s.direction) else {
                warn!(signal_id = %signal_id, "record has no signal, dropping");
                self.queue.pop_front();
                continue;
            };
            let outcome = judge(direction, &candle);

            // Refresh the stored OHLC with the candle's final state and
            // settle the attempt it belongs to.
            let settled_level = match record.latest_gale_item_mut() {
                Some(item) => {
                    item.open = candle.open;
                    item.high = candle.high;
                    item.low = candle.low;
                    item.close = candle.close;
                    item.outcome = Some(outcome);
                    Some(item.level)
                }
                None => {
                    record.open = candle.open;
                    record.high = candle.high;
                    record.low = candle.low;
                    record.close = candle.close;
                    if let Some(signal) = record.signal.as_mut() {
                        signal.outcome = Some(outcome);
                    }
                    None
                }
            };

            // Open the next rung before persisting, so settlement and the
            // ladder extension land in the store as one write.
            let mut extension = None;
            if outcome == Outcome::Loss {
                let next_level = match settled_level {
                    Some(level) => level.next().filter(|l| *l <= self.max_gale_level),
                    None => Some(GaleLevel::G1).filter(|l| *l <= self.max_gale_level),
                };
                if let Some(level) = next_level {
                    let item = GaleItem {
                        level,
                        epoch: target_epoch + self.granularity_secs,
                        open: candle.close,
                        high: candle.close,
                        low: candle.close,
                        close: candle.close,
                        outcome: None,
                    };
                    record.gale_items.push(item.clone());
                    extension = Some(item);
                }
            }

            if let Err(e) = self.store.update(&record).await {
                error!(signal_id = %signal_id, error = %e, "failed to persist outcome, dropping signal");
                self.queue.pop_front();
                continue;
            }
            self.queue.pop_front();
            if extension.is_some() {
                self.queue.push_back(signal_id.clone());
            }

            // Delivery failures must not undo a settled attempt; the
            // outcome is already persisted.
            if let Err(e) = self.notifier.reply_outcome(&record).await {
                error!(signal_id = %signal_id, error = %e, "failed to deliver outcome reply");
            }
            if let Some(item) = &extension {
                info!(signal_id = %signal_id, level = %item.level, "loss, extending gale ladder");
                if let Some(signal) = record.signal.as_ref() {
                    if let Err(e) = self.notifier.announce_gale(signal, item).await {
                        error!(signal_id = %signal_id, error = %e, "failed to deliver gale announcement");
                    }
                }
            }
            info!(
                signal_id = %signal_id,
                %outcome,
                level = ?settled_level,
                epoch = target_epoch,
                "attempt settled"
            );
        }
    }
}

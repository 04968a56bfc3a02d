use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::OhlcUpdate;

/// One OHLC bar. `epoch` is the candle's open time in unix seconds and is
/// the candle's identity: a live candle keeps the same epoch across
/// intra-candle updates until it closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub epoch: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.epoch, 0).unwrap_or_default()
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn total_range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Bounded sliding buffer of closed candles plus the currently forming one.
/// Owned and mutated only by the event-ingestion path; indicator code gets
/// a read-only view of the closed candles.
#[derive(Debug, Clone, Default)]
pub struct CandleWindow {
    capacity: usize,
    candles: Vec<Candle>,
    current: Option<Candle>,
}

impl CandleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            candles: Vec::with_capacity(capacity),
            current: None,
        }
    }

    /// Replace the window contents with a fresh history batch. Called at
    /// startup and after a feed reconnect, when the old window is stale.
    pub fn bootstrap(&mut self, mut history: Vec<Candle>) {
        if history.len() > self.capacity {
            history.drain(..history.len() - self.capacity);
        }
        self.candles = history;
        self.current = None;
    }

    pub fn clear(&mut self) {
        self.candles.clear();
        self.current = None;
    }

    /// Apply a live OHLC update. An update sharing the forming candle's
    /// open time mutates it in place; a new open time closes the forming
    /// candle and returns it.
    pub fn apply(&mut self, update: &OhlcUpdate) -> Option<Candle> {
        let incoming = Candle {
            epoch: update.open_time,
            open: update.open,
            high: update.high,
            low: update.low,
            close: update.close,
        };

        match self.current.take() {
            Some(cur) if cur.epoch == update.open_time => {
                self.current = Some(incoming);
                None
            }
            Some(cur) => {
                self.push_closed(cur.clone());
                self.current = Some(incoming);
                Some(cur)
            }
            None => {
                self.current = Some(incoming);
                None
            }
        }
    }

    fn push_closed(&mut self, candle: Candle) {
        // The bootstrap history may already hold this candle's last state.
        if let Some(last) = self.candles.last_mut() {
            if last.epoch == candle.epoch {
                *last = candle;
                return;
            }
        }
        self.candles.push(candle);
        if self.candles.len() > self.capacity {
            let excess = self.candles.len() - self.capacity;
            self.candles.drain(..excess);
        }
    }

    /// Read-only snapshot of the closed candles, oldest first.
    pub fn closed(&self) -> &[Candle] {
        &self.candles
    }

    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Look up a candle by open time, checking closed candles first and
    /// then the forming one.
    pub fn find_by_epoch(&self, epoch: i64) -> Option<&Candle> {
        self.candles
            .iter()
            .rev()
            .find(|c| c.epoch == epoch)
            .or_else(|| self.current.as_ref().filter(|c| c.epoch == epoch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(epoch: i64, open_time: i64, o: f64, h: f64, l: f64, c: f64) -> OhlcUpdate {
        OhlcUpdate {
            epoch,
            open_time,
            open: o,
            high: h,
            low: l,
            close: c,
        }
    }

    #[test]
    fn candle_helpers() {
        let c = Candle {
            epoch: 1_700_000_000,
            open: 100.0,
            high: 115.0,
            low: 95.0,
            close: 110.0,
        };
        assert!((c.body() - 10.0).abs() < 1e-9);
        assert!((c.total_range() - 20.0).abs() < 1e-9);
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
    }

    #[test]
    fn same_open_time_mutates_in_place() {
        let mut w = CandleWindow::new(10);
        assert!(w.apply(&update(100, 60, 1.0, 1.0, 1.0, 1.0)).is_none());
        assert!(w.apply(&update(110, 60, 1.0, 2.0, 0.5, 1.5)).is_none());
        assert_eq!(w.len(), 0);
        assert!((w.current().unwrap().close - 1.5).abs() < 1e-9);
    }

    #[test]
    fn new_open_time_closes_candle() {
        let mut w = CandleWindow::new(10);
        w.apply(&update(100, 60, 1.0, 1.0, 1.0, 1.0));
        w.apply(&update(110, 60, 1.0, 2.0, 0.5, 1.5));
        let closed = w.apply(&update(121, 120, 1.5, 1.5, 1.5, 1.5));
        let closed = closed.expect("candle should close on open_time change");
        assert_eq!(closed.epoch, 60);
        assert!((closed.close - 1.5).abs() < 1e-9);
        assert_eq!(w.len(), 1);
        assert_eq!(w.current().unwrap().epoch, 120);
    }

    #[test]
    fn close_after_bootstrap_replaces_duplicate_epoch() {
        let mut w = CandleWindow::new(10);
        w.bootstrap(vec![
            Candle {
                epoch: 0,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
            },
            Candle {
                epoch: 60,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
            },
        ]);
        // Live updates for the candle the history batch already contained.
        w.apply(&update(70, 60, 1.0, 3.0, 1.0, 2.0));
        let closed = w.apply(&update(121, 120, 2.0, 2.0, 2.0, 2.0)).unwrap();
        assert_eq!(closed.epoch, 60);
        assert_eq!(w.len(), 2);
        assert!((w.last().unwrap().close - 2.0).abs() < 1e-9);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut w = CandleWindow::new(3);
        for i in 0..6 {
            w.apply(&update(i * 60, i * 60, 1.0, 1.0, 1.0, 1.0));
        }
        assert!(w.len() <= 3);
        assert_eq!(w.closed().first().unwrap().epoch, 120);
    }

    #[test]
    fn find_by_epoch_checks_forming_candle() {
        let mut w = CandleWindow::new(10);
        w.apply(&update(100, 60, 1.0, 1.0, 1.0, 1.0));
        assert!(w.find_by_epoch(60).is_some());
        assert!(w.find_by_epoch(120).is_none());
    }
}

//! Event loop wiring the feed, the analysis engine, and the signal
//! lifecycle together. One instance owns the candle window; everything it
//! reacts to arrives as a `FeedEvent`.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use rise_fall_bot::config::SharedConfig;
use rise_fall_bot::engine::SignalEngine;
use rise_fall_bot::feed::{CandleFeed, FeedEvent};
use rise_fall_bot::lifecycle::SignalLifecycle;
use rise_fall_bot::models::{Candle, CandleWindow};

pub struct Bot<F: CandleFeed> {
    config: SharedConfig,
    feed: F,
    engine: SignalEngine,
    lifecycle: SignalLifecycle,
    window: CandleWindow,
}

impl<F: CandleFeed> Bot<F> {
    pub fn new(
        config: SharedConfig,
        feed: F,
        engine: SignalEngine,
        lifecycle: SignalLifecycle,
        window: CandleWindow,
    ) -> Self {
        Self {
            config,
            feed,
            engine,
            lifecycle,
            window,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("bot started");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    return Ok(());
                }
                event = self.feed.next_event() => {
                    match event {
                        Ok(event) => self.handle_event(event).await,
                        Err(e) => {
                            warn!(error = %e, "feed error, stopping");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Per-event failures are logged and contained here; only the feed
    /// itself may stop the loop.
    async fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::History(candles) => {
                info!(count = candles.len(), "window bootstrapped");
                self.window.bootstrap(candles);
            }
            FeedEvent::Ohlc(update) => {
                if let Some(closed) = self.window.apply(&update) {
                    self.on_candle_close(closed).await;
                }
            }
        }
    }

    /// A closed candle first settles pending signals; only a quiet book
    /// may produce a new one.
    async fn on_candle_close(&mut self, closed: Candle) {
        debug!(epoch = closed.epoch, close = closed.close, "candle closed");
        self.lifecycle.validate_pending(&self.window).await;

        if self.lifecycle.has_pending() {
            debug!("signal pending validation, skipping analysis");
            return;
        }
        if self.lifecycle.in_cooldown(Utc::now()) {
            debug!("in cooldown, skipping analysis");
            return;
        }

        let outcome = self.engine.run_cycle(self.window.closed());
        let Some(candidate) = outcome.candidate else {
            return;
        };

        let min_confidence = self.config.read().await.min_confidence_to_send;
        if candidate.confidence < min_confidence {
            info!(
                confidence = candidate.confidence,
                min_confidence, "candidate below confidence floor, dropped"
            );
            return;
        }

        if let Err(e) = self.lifecycle.emit(&candidate, &closed).await {
            error!(error = %e, "failed to emit signal, skipping this cycle");
        }
    }
}

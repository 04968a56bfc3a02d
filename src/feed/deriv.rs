//! Deriv websocket feed. Authorizes, requests a candle history with a live
//! subscription, and translates the stream into `FeedEvent`s.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::{flexible_f64, flexible_i64, CandleFeed, FeedEvent, OhlcUpdate};
use crate::models::Candle;

const WS_HOST: &str = "wss://ws.derivws.com/websockets/v3";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct HistoryCandle {
    #[serde(deserialize_with = "flexible_i64")]
    epoch: i64,
    #[serde(deserialize_with = "flexible_f64")]
    open: f64,
    #[serde(deserialize_with = "flexible_f64")]
    high: f64,
    #[serde(deserialize_with = "flexible_f64")]
    low: f64,
    #[serde(deserialize_with = "flexible_f64")]
    close: f64,
}

impl From<HistoryCandle> for Candle {
    fn from(c: HistoryCandle) -> Self {
        Candle {
            epoch: c.epoch,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
        }
    }
}

pub struct DerivFeed {
    ws: WsStream,
    symbol: String,
    granularity_secs: i64,
    history_count: usize,
}

impl DerivFeed {
    /// Open the websocket and start the authorize handshake. The history
    /// subscription is requested once the authorize response arrives.
    pub async fn connect(
        app_id: &str,
        token: &str,
        symbol: &str,
        granularity_secs: i64,
        history_count: usize,
    ) -> Result<Self> {
        let url = format!("{WS_HOST}?app_id={app_id}");
        let (ws, _) = connect_async(&url)
            .await
            .context("deriv websocket connect failed")?;
        info!(symbol, "connected to deriv");

        let mut feed = Self {
            ws,
            symbol: symbol.to_string(),
            granularity_secs,
            history_count,
        };
        feed.send(json!({ "authorize": token })).await?;
        Ok(feed)
    }

    async fn send(&mut self, payload: serde_json::Value) -> Result<()> {
        self.ws
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("deriv websocket send failed")
    }

    async fn subscribe_candles(&mut self) -> Result<()> {
        self.send(json!({
            "ticks_history": self.symbol,
            "style": "candles",
            "granularity": self.granularity_secs,
            "count": self.history_count,
            "end": "latest",
            "adjust_start_time": 1,
            "subscribe": 1,
        }))
        .await
    }

    /// Decode one text frame. Returns `None` for protocol messages that do
    /// not surface as feed events.
    async fn handle_text(&mut self, text: &str) -> Result<Option<FeedEvent>> {
        let value: serde_json::Value =
            serde_json::from_str(text).context("deriv sent invalid json")?;

        if let Some(error) = value.get("error") {
            let code = error["code"].as_str().unwrap_or("unknown");
            let message = error["message"].as_str().unwrap_or("no message");
            bail!("deriv error {code}: {message}");
        }

        match value["msg_type"].as_str() {
            Some("authorize") => {
                debug!("authorized, subscribing to candles");
                self.subscribe_candles().await?;
                Ok(None)
            }
            Some("candles") => {
                let raw: Vec<HistoryCandle> = serde_json::from_value(value["candles"].clone())
                    .context("malformed candle history")?;
                let candles: Vec<Candle> = raw.into_iter().map(Candle::from).collect();
                info!(count = candles.len(), "candle history received");
                Ok(Some(FeedEvent::History(candles)))
            }
            Some("ohlc") => {
                let update: OhlcUpdate = serde_json::from_value(value["ohlc"].clone())
                    .context("malformed ohlc update")?;
                Ok(Some(FeedEvent::Ohlc(update)))
            }
            other => {
                debug!(msg_type = ?other, "ignoring message");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl CandleFeed for DerivFeed {
    async fn next_event(&mut self) -> Result<FeedEvent> {
        loop {
            let message = self
                .ws
                .next()
                .await
                .ok_or_else(|| anyhow!("deriv websocket closed"))??;
            match message {
                Message::Text(text) => {
                    if let Some(event) = self.handle_text(&text).await? {
                        return Ok(event);
                    }
                }
                Message::Ping(payload) => {
                    self.ws.send(Message::Pong(payload)).await?;
                }
                Message::Close(frame) => {
                    bail!("deriv closed the connection: {frame:?}");
                }
                _ => {}
            }
        }
    }
}

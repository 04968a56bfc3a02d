//! Telegram delivery via the Bot API. Messages are plain text; display
//! times are rendered in the channel's local timezone.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::America::Sao_Paulo;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{DeliveryHandle, Notifier};
use crate::models::{CandleRecord, GaleItem, Outcome, Signal};

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    client: reqwest::Client,
    token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
    chat: Chat,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

fn local_clock(time: DateTime<Utc>) -> String {
    time.with_timezone(&Sao_Paulo).format("%H:%M:%S").to_string()
}

pub(crate) fn compose_signal_message(signal: &Signal, price: f64) -> String {
    format!(
        "\u{1F4E1} NEW SIGNAL\n\n\
         Id: {}\n\
         Direction: {}\n\
         Confidence: {}%\n\
         Price: {:.4}\n\
         Analyzed at: {}\n\
         Entry at: {}",
        signal.signal_id,
        signal.direction,
        signal.confidence,
        price,
        local_clock(signal.analyze_time),
        local_clock(signal.entry_time),
    )
}

/// The reply names the most recently judged attempt, so a freshly opened
/// gale rung never reads as "pending".
pub(crate) fn compose_outcome_message(record: &CandleRecord) -> String {
    match record.latest_settled_outcome() {
        Some((level, outcome)) => {
            let level = level.map(|l| format!(" ({l})")).unwrap_or_default();
            match outcome {
                Outcome::Win => format!("\u{2705} WIN{level}"),
                Outcome::Loss => format!("\u{274C} LOSS{level}"),
            }
        }
        None => "\u{23F3} pending".to_string(),
    }
}

pub(crate) fn compose_gale_message(signal: &Signal, item: &GaleItem) -> String {
    let entry_time = DateTime::from_timestamp(item.epoch, 0).unwrap_or_default();
    format!(
        "\u{1F6A8} Gale {}\n\n\
         Id: {}\n\
         Direction: {}\n\
         Entry price: {:.4}\n\
         Entry at: {}",
        item.level,
        signal.signal_id,
        signal.direction,
        item.open,
        local_clock(entry_time),
    )
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            chat_id,
        }
    }

    async fn send(&self, text: String, reply_to: Option<i64>) -> Result<DeliveryHandle> {
        let mut body = json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        if let Some(message_id) = reply_to {
            body["reply_to_message_id"] = json!(message_id);
        }

        let url = format!("{API_BASE}/bot{}/sendMessage", self.token);
        let response: ApiResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("telegram request failed")?
            .json()
            .await
            .context("telegram response was not json")?;

        if !response.ok {
            return Err(anyhow!(
                "telegram rejected message: {}",
                response.description.unwrap_or_else(|| "unknown".to_string())
            ));
        }
        let sent = response
            .result
            .ok_or_else(|| anyhow!("telegram ok response without result"))?;
        Ok(DeliveryHandle {
            message_id: sent.message_id,
            chat_id: sent.chat.id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn announce_signal(&self, signal: &Signal, price: f64) -> Result<DeliveryHandle> {
        let handle = self
            .send(compose_signal_message(signal, price), None)
            .await?;
        info!(
            signal_id = %signal.signal_id,
            message_id = handle.message_id,
            "signal announced"
        );
        Ok(handle)
    }

    async fn reply_outcome(&self, record: &CandleRecord) -> Result<()> {
        let reply_to = record.signal.as_ref().and_then(|s| s.message_id);
        self.send(compose_outcome_message(record), reply_to).await?;
        Ok(())
    }

    async fn announce_gale(&self, signal: &Signal, item: &GaleItem) -> Result<()> {
        self.send(compose_gale_message(signal, item), signal.message_id)
            .await?;
        info!(
            signal_id = %signal.signal_id,
            level = %item.level,
            "gale announced"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GaleItem, GaleLevel, SignalDirection};
    use chrono::TimeZone;

    fn signal() -> Signal {
        Signal {
            signal_id: "ABCD1234".to_string(),
            direction: SignalDirection::Rise,
            confidence: 72,
            analyze_time: Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap(),
            entry_time: Utc.with_ymd_and_hms(2024, 6, 1, 15, 1, 0).unwrap(),
            open_candle_epoch: 1_717_254_060,
            message_id: None,
            chat_id: None,
            outcome: None,
        }
    }

    #[test]
    fn signal_message_contains_id_direction_and_times() {
        let text = compose_signal_message(&signal(), 1234.5678);
        assert!(text.contains("ABCD1234"));
        assert!(text.contains("RISE"));
        assert!(text.contains("72%"));
        assert!(text.contains("1234.5678"));
        // 15:00/15:01 UTC are 12:00/12:01 in Sao Paulo (UTC-3).
        assert!(text.contains("Analyzed at: 12:00:00"), "{text}");
        assert!(text.contains("Entry at: 12:01:00"), "{text}");
    }

    #[test]
    fn outcome_message_win() {
        let mut record = CandleRecord::new(600, 1.0, 2.0, 0.5, 1.5);
        let mut s = signal();
        s.outcome = Some(Outcome::Win);
        record.signal = Some(s);
        assert_eq!(compose_outcome_message(&record), "\u{2705} WIN");
    }

    #[test]
    fn outcome_message_terminal_gale_loss() {
        let mut record = CandleRecord::new(600, 1.0, 2.0, 0.5, 1.5);
        record.signal = Some(signal());
        record.gale_items.push(GaleItem {
            level: GaleLevel::G2,
            epoch: 720,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 0.9,
            outcome: Some(Outcome::Loss),
        });
        assert_eq!(compose_outcome_message(&record), "\u{274C} LOSS (G2)");
    }

    #[test]
    fn outcome_message_reports_settled_loss_not_fresh_rung() {
        let mut record = CandleRecord::new(600, 1.0, 2.0, 0.5, 1.5);
        let mut s = signal();
        s.outcome = Some(Outcome::Loss);
        record.signal = Some(s);
        // G1 opened but not yet judged.
        record.gale_items.push(GaleItem {
            level: GaleLevel::G1,
            epoch: 660,
            open: 1.5,
            high: 1.5,
            low: 1.5,
            close: 1.5,
            outcome: None,
        });
        assert_eq!(compose_outcome_message(&record), "\u{274C} LOSS");
    }

    #[test]
    fn gale_message_names_level_id_and_entry() {
        let item = GaleItem {
            level: GaleLevel::G1,
            // 2024-06-01 15:02:00 UTC.
            epoch: 1_717_254_120,
            open: 1234.5,
            high: 1234.5,
            low: 1234.5,
            close: 1234.5,
            outcome: None,
        };
        let text = compose_gale_message(&signal(), &item);
        assert!(text.contains("Gale G1"));
        assert!(text.contains("ABCD1234"));
        assert!(text.contains("1234.5000"));
        assert!(text.contains("Entry at: 12:02:00"), "{text}");
    }
}

use super::Notifier;
use crate::config::TelegramConfig;
use crate::core::{Alert, Direction};
use crate::error::NotifyError;
use async_trait::async_trait;
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        info!("Telegram notifier initialised");
        Ok(Self { client, config })
    }

    async fn post(&self, text: &str, parse_mode: Option<&str>) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, self.config.bot_token);
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            text,
            parse_mode,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let reply: TelegramResponse = response.json().await?;
        if !status.is_success() || !reply.ok {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: reply.description.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.post(&format_alert(alert), Some("Markdown")).await?;
        info!(
            "Telegram alert sent: {} {}%",
            alert.symbol,
            alert.formatted_change()
        );
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        self.post(text, None).await
    }
}

pub fn format_alert(alert: &Alert) -> String {
    let (emoji, trend) = match alert.direction {
        Direction::Increase => ("🚀", "📈"),
        Direction::Decrease => ("📉", "📉"),
    };
    let time_format = "%Y-%m-%d %H:%M:%S";

    format!(
        "{emoji} *Price Alert* {emoji}\n\n\
         🏦 Exchange: `Binance`\n\
         💱 Symbol: `{symbol}`\n\
         {trend} Change: *{change}%* ({direction})\n\n\
         💰 Current price: `{current}`\n\
         ⏰ Current time: {current_time}\n\n\
         📊 Base price: `{base}`\n\
         🕐 Base time: {base_time}",
        emoji = emoji,
        trend = trend,
        symbol = alert.symbol,
        change = alert.formatted_change(),
        direction = alert.direction,
        current = alert.current_price,
        current_time = alert.current_time.with_timezone(&Local).format(time_format),
        base = alert.base_price,
        base_time = alert.base_time.with_timezone(&Local).format(time_format),
    )
}

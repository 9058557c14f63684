//! Telegram Bot API channel (`POST /bot<token>/sendMessage`).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use courier_common::types::Notification;

use super::ChannelSender;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

pub struct TelegramSender {
    client: Client,
    bot_token: String,
    api_url: String,
}

impl TelegramSender {
    pub fn new(client: Client, bot_token: impl Into<String>) -> Self {
        Self {
            client,
            bot_token: bot_token.into(),
            api_url: TELEGRAM_API_URL.to_string(),
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let payload = json!({
            "chat_id": notification.chat_id,
            "text": notification.message,
        });

        let response = self
            .client
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API returned {status}: {body}");
        }

        tracing::debug!(
            notification_id = notification.id,
            chat_id = notification.chat_id,
            "Telegram message sent"
        );
        Ok(())
    }
}

//! Telegram delivery channel — message sending via Bot API.

use async_trait::async_trait;
use serde::Deserialize;

use pricetrack_core::error::{PriceTrackError, Result};
use pricetrack_core::traits::MessageSender;

pub struct TelegramSender {
    bot_token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TelegramApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

impl TelegramSender {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    /// Verify the token at startup.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| PriceTrackError::Channel(format!("getMe failed: {e}")))?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .map_err(|e| PriceTrackError::Channel(format!("Invalid getMe response: {e}")))?;
        body.result
            .ok_or_else(|| PriceTrackError::Channel("No bot info".into()))
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_message(&self, user_id: i64, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": user_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| PriceTrackError::Channel(format!("sendMessage failed: {e}")))?;

        let result: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| PriceTrackError::Channel(format!("Invalid send response: {e}")))?;

        if !result.ok {
            return Err(PriceTrackError::Channel(format!(
                "Send failed: {}",
                result.description.unwrap_or_default()
            )));
        }
        tracing::debug!("Message delivered to {user_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let sender = TelegramSender::new("123:abc");
        assert_eq!(
            sender.api_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_api_response_parsing() {
        let body: TelegramApiResponse<TelegramUser> = serde_json::from_str(
            r#"{"ok": true, "result": {"id": 99, "first_name": "PriceTrack", "username": "pricetrack_bot"}}"#,
        )
        .unwrap();
        assert!(body.ok);
        assert_eq!(body.result.unwrap().id, 99);
    }

    #[test]
    fn test_api_error_carries_description() {
        let body: TelegramApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"ok": false, "description": "Forbidden: bot was blocked"}"#)
                .unwrap();
        assert!(!body.ok);
        assert!(body.description.unwrap().contains("blocked"));
    }
}

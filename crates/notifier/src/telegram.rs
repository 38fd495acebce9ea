//! Telegram channel via the Bot API `sendMessage` method.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use relay_common::types::Channel;

use crate::channel::{ChannelHandler, DeliveryError, SkipReason};

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    ok: bool,
    result: Option<SentMessage>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Telegram channel handler.
pub struct TelegramChannel {
    bot_token: Option<String>,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramChannel {
    pub fn new(
        bot_token: Option<String>,
        client: reqwest::Client,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            bot_token,
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Markdown text: emphasised subject followed by the message.
pub fn render_text(subject: &str, message: &str) -> String {
    format!("*{}*\n\n{}", subject, message)
}

fn classify_telegram_error(error_code: u16, description: &str) -> DeliveryError {
    let message = format!("Telegram Error: {}", description);
    let lowered = description.to_ascii_lowercase();
    match error_code {
        401 | 404 => DeliveryError::Auth(message),
        400 if lowered.contains("chat not found") || lowered.contains("user not found") => {
            DeliveryError::InvalidAddress(message)
        }
        403 => DeliveryError::InvalidAddress(message),
        502..=504 => DeliveryError::Connectivity(message),
        _ => DeliveryError::Provider(message),
    }
}

#[async_trait]
impl ChannelHandler for TelegramChannel {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    fn is_configured(&self) -> bool {
        self.bot_token.is_some()
    }

    fn check_ready(&self, recipient: Option<&str>) -> Result<(), SkipReason> {
        if self.bot_token.is_none() {
            return Err(SkipReason::ProviderNotConfigured("Telegram bot token"));
        }
        if recipient.is_none() {
            return Err(SkipReason::MissingRecipient("Telegram chat id"));
        }
        Ok(())
    }

    async fn deliver(
        &self,
        subject: &str,
        message: &str,
        recipient: &str,
    ) -> Result<String, DeliveryError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| DeliveryError::Provider("Telegram bot token is not configured".into()))?;

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let payload = json!({
            "chat_id": recipient,
            "text": render_text(subject, message),
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::from_transport(&e))?;

        let status = response.status();
        // A body that is not the Bot API envelope is classified by status;
        // a body that never fully arrives is a transport failure.
        let body: Option<SendMessageResponse> = match response.json().await {
            Ok(body) => Some(body),
            Err(e) if e.is_decode() => None,
            Err(e) => return Err(DeliveryError::from_transport(&e)),
        };

        match body {
            Some(SendMessageResponse {
                ok: true,
                result: Some(sent),
                ..
            }) => Ok(sent.message_id.to_string()),
            Some(body) => Err(classify_telegram_error(
                body.error_code.unwrap_or(status.as_u16()),
                body.description
                    .as_deref()
                    .unwrap_or("no description returned"),
            )),
            None => Err(classify_telegram_error(
                status.as_u16(),
                &format!("unexpected response (HTTP {})", status),
            )),
        }
    }
}

//! WhatsApp channel via the Twilio Messages API.

use async_trait::async_trait;
use serde::Deserialize;

use relay_common::config::AppConfig;
use relay_common::types::Channel;

use crate::channel::{ChannelHandler, DeliveryError, SkipReason};

/// Addressing scheme Twilio expects on WhatsApp numbers.
const WHATSAPP_SCHEME: &str = "whatsapp:";

/// Signature line appended to every WhatsApp message.
pub const SIGNATURE: &str = "_Sent from Solusi Bangun Indonesia_";

/// Twilio account credentials plus the registered sender number.
#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
}

impl TwilioCredentials {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        Some(Self {
            account_sid: config.twilio_account_sid.clone()?,
            auth_token: config.twilio_auth_token.clone()?,
            from: config.twilio_whatsapp_from.clone()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

/// Error body returned by the Twilio REST API.
#[derive(Debug, Default, Deserialize)]
struct TwilioErrorBody {
    code: Option<u32>,
    message: Option<String>,
}

/// WhatsApp channel handler.
pub struct WhatsAppChannel {
    credentials: Option<TwilioCredentials>,
    client: reqwest::Client,
    api_base: String,
}

impl WhatsAppChannel {
    pub fn new(
        credentials: Option<TwilioCredentials>,
        client: reqwest::Client,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, account_sid
        )
    }
}

/// Prefix a number with the WhatsApp scheme unless it already carries it.
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_SCHEME) {
        number.to_string()
    } else {
        format!("{}{}", WHATSAPP_SCHEME, number)
    }
}

/// Body text: emphasised subject, message, signature.
pub fn render_body(subject: &str, message: &str) -> String {
    format!("*{}*\n\n{}\n\n{}", subject, message, SIGNATURE)
}

/// Map a Twilio error response onto the delivery error taxonomy.
fn classify_twilio_error(status: reqwest::StatusCode, body: &TwilioErrorBody) -> DeliveryError {
    let message = body
        .message
        .clone()
        .unwrap_or_else(|| format!("HTTP {}", status));
    let message = match body.code {
        Some(code) => format!("Twilio Error {}: {}", code, message),
        None => format!("Twilio Error: {}", message),
    };

    match (status.as_u16(), body.code) {
        (401, _) | (_, Some(20003)) => DeliveryError::Auth(message),
        // Invalid To/From number, not a mobile number, unknown WhatsApp channel address.
        (_, Some(21211 | 21212 | 21214 | 21614 | 63003 | 63007)) => {
            DeliveryError::InvalidAddress(message)
        }
        (502..=504, _) => DeliveryError::Connectivity(message),
        _ => DeliveryError::Provider(message),
    }
}

#[async_trait]
impl ChannelHandler for WhatsAppChannel {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn check_ready(&self, recipient: Option<&str>) -> Result<(), SkipReason> {
        if self.credentials.is_none() {
            return Err(SkipReason::ProviderNotConfigured("Twilio WhatsApp"));
        }
        if recipient.is_none() {
            return Err(SkipReason::MissingRecipient("WhatsApp number"));
        }
        Ok(())
    }

    async fn deliver(
        &self,
        subject: &str,
        message: &str,
        recipient: &str,
    ) -> Result<String, DeliveryError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or_else(|| DeliveryError::Provider("Twilio WhatsApp is not configured".into()))?;

        let form = [
            ("From", whatsapp_address(&creds.from)),
            ("To", whatsapp_address(recipient)),
            ("Body", render_body(subject, message)),
        ];

        let response = self
            .client
            .post(self.messages_url(&creds.account_sid))
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| DeliveryError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body: TwilioErrorBody = match response.json().await {
                Ok(body) => body,
                Err(e) if e.is_decode() => TwilioErrorBody::default(),
                Err(e) => return Err(DeliveryError::from_transport(&e)),
            };
            return Err(classify_twilio_error(status, &body));
        }

        let resource: MessageResource = response.json().await.map_err(|e| {
            if e.is_decode() {
                DeliveryError::Provider(format!("Unexpected Twilio response: {}", e))
            } else {
                DeliveryError::from_transport(&e)
            }
        })?;
        Ok(resource.sid)
    }
}

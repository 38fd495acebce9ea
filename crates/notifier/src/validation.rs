//! Top-level request validation.
//!
//! Only the envelope is checked here. Recipient validity belongs to each
//! channel handler, since a bad recipient must degrade that one channel
//! rather than reject the request.

use serde::Deserialize;
use serde_json::Value;

use relay_common::error::AppError;
use relay_common::types::{Channel, NotificationRequest, Recipients};

const INCOMPLETE_REQUEST: &str = "Subject, message and channels are required.";

#[derive(Debug, Deserialize)]
struct RawRequest {
    subject: Option<String>,
    message: Option<String>,
    channels: Option<Vec<String>>,
    #[serde(default)]
    recipients: Option<Value>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validate a raw JSON body into a [`NotificationRequest`].
pub fn validate(body: Value) -> Result<NotificationRequest, AppError> {
    let raw: RawRequest = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("{} ({})", INCOMPLETE_REQUEST, e)))?;

    let (Some(subject), Some(message), Some(names)) = (
        non_blank(raw.subject),
        non_blank(raw.message),
        raw.channels.filter(|c| !c.is_empty()),
    ) else {
        return Err(AppError::Validation(INCOMPLETE_REQUEST.to_string()));
    };

    let mut channels = Vec::with_capacity(names.len());
    for name in &names {
        let channel: Channel = name.parse().map_err(AppError::Validation)?;
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }

    Ok(NotificationRequest {
        subject,
        message,
        channels,
        recipients: raw.recipients.map(Recipients::from_value).unwrap_or_default(),
    })
}

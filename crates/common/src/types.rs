use serde::Serialize;
use serde_json::{Map, Value};

/// Delivery channels the relay knows how to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Whatsapp,
    Telegram,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Whatsapp, Channel::Telegram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Whatsapp => "whatsapp",
            Channel::Telegram => "telegram",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "whatsapp" => Ok(Channel::Whatsapp),
            "telegram" => Ok(Channel::Telegram),
            other => Err(format!("unknown channel '{}'", other)),
        }
    }
}

/// Outcome of a single channel within one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Success,
    Failed,
    Skipped,
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelStatus::Success => write!(f, "success"),
            ChannelStatus::Failed => write!(f, "failed"),
            ChannelStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Per-channel result returned to the caller.
///
/// `detail` is the provider's message identifier on success and a
/// human-readable diagnostic otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelResult {
    pub channel: Channel,
    pub status: ChannelStatus,
    pub detail: String,
}

impl ChannelResult {
    pub fn success(channel: Channel, detail: impl Into<String>) -> Self {
        Self {
            channel,
            status: ChannelStatus::Success,
            detail: detail.into(),
        }
    }

    pub fn failed(channel: Channel, detail: impl Into<String>) -> Self {
        Self {
            channel,
            status: ChannelStatus::Failed,
            detail: detail.into(),
        }
    }

    pub fn skipped(channel: Channel, detail: impl Into<String>) -> Self {
        Self {
            channel,
            status: ChannelStatus::Skipped,
            detail: detail.into(),
        }
    }
}

/// Channel-specific addresses supplied with a request.
///
/// Entries are kept loosely typed: a malformed entry only affects its own
/// channel, which skips with an invalid-recipient reason.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipients {
    entries: Map<String, Value>,
}

impl Recipients {
    /// Build from the request's `recipients` value. Anything other than a
    /// JSON object carries no recipients.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(entries) => Self { entries },
            _ => Self::default(),
        }
    }

    /// Set the recipient for `channel`.
    pub fn with(mut self, channel: Channel, address: impl Into<String>) -> Self {
        self.entries
            .insert(channel.as_str().to_string(), Value::String(address.into()));
        self
    }

    /// Recipient for `channel`. Telegram chat ids are frequently sent as
    /// JSON numbers and come back as their decimal text. Blank strings and
    /// non-scalar entries are absent.
    pub fn get(&self, channel: Channel) -> Option<String> {
        match self.entries.get(channel.as_str())? {
            Value::String(s) => Some(s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Raw text of an entry for `channel` that is present but neither a
    /// string nor a number.
    pub fn malformed(&self, channel: Channel) -> Option<String> {
        match self.entries.get(channel.as_str())? {
            Value::Null | Value::String(_) | Value::Number(_) => None,
            other => Some(other.to_string()),
        }
    }
}

/// A validated notification request.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub subject: String,
    pub message: String,
    /// Requested channels, deduplicated, in request order.
    pub channels: Vec<Channel>,
    pub recipients: Recipients,
}

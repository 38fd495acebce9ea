//! Channel handler capability and the skip / delivery error taxonomy.
//!
//! Every delivery channel implements [`ChannelHandler`]. The dispatcher asks
//! the handler whether it can run for a given recipient, then attempts a
//! single delivery. Both outcomes are converted into a [`ChannelResult`] by
//! the dispatcher, so handlers never build results themselves.

use async_trait::async_trait;
use thiserror::Error;

use relay_common::types::Channel;

/// Why a requested channel was not attempted. Recorded as `skipped`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("{0} is not configured")]
    ProviderNotConfigured(&'static str),

    #[error("no {0} recipient was provided")]
    MissingRecipient(&'static str),

    #[error("invalid {kind} recipient: {value}")]
    InvalidRecipient { kind: &'static str, value: String },
}

/// Classified provider failure. Recorded as `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Authentication with the provider failed: {0}")]
    Auth(String),

    #[error("The provider rejected the recipient address: {0}")]
    InvalidAddress(String),

    #[error("Could not reach the provider: {0}")]
    Connectivity(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl DeliveryError {
    /// Map a transport-level HTTP client error. Timeouts count as connectivity.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            DeliveryError::Connectivity(err.to_string())
        } else {
            DeliveryError::Provider(err.to_string())
        }
    }
}

/// A delivery channel backed by one external provider.
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Channel identifier this handler serves.
    fn channel(&self) -> Channel;

    /// Provider credentials/settings are present. No network access.
    fn is_configured(&self) -> bool;

    /// Check configuration and recipient validity before any network call.
    fn check_ready(&self, recipient: Option<&str>) -> Result<(), SkipReason>;

    /// Attempt a single delivery. Returns the provider's message identifier.
    async fn deliver(
        &self,
        subject: &str,
        message: &str,
        recipient: &str,
    ) -> Result<String, DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_messages_name_the_precondition() {
        assert_eq!(
            SkipReason::ProviderNotConfigured("Email transport").to_string(),
            "Email transport is not configured"
        );
        assert_eq!(
            SkipReason::MissingRecipient("Telegram chat id").to_string(),
            "no Telegram chat id recipient was provided"
        );
        assert_eq!(
            SkipReason::InvalidRecipient {
                kind: "email",
                value: "bad-address".into()
            }
            .to_string(),
            "invalid email recipient: bad-address"
        );
    }

    #[test]
    fn test_delivery_error_messages_are_distinguishable() {
        let messages = [
            DeliveryError::Auth("x".into()).to_string(),
            DeliveryError::InvalidAddress("x".into()).to_string(),
            DeliveryError::Connectivity("x".into()).to_string(),
            DeliveryError::Provider("x".into()).to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

//! Fan-out of one notification request across its requested channels.
//!
//! Each requested channel runs in its own task so a slow provider does not
//! hold back the others and a panic in one handler cannot abort its
//! siblings. Results are collected in request order regardless of which
//! task finishes first.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use relay_common::config::AppConfig;
use relay_common::types::{Channel, ChannelResult, NotificationRequest};

use crate::aggregator::DispatchOutcome;
use crate::channel::{ChannelHandler, SkipReason};
use crate::email::{EmailChannel, MailSender};
use crate::telegram::TelegramChannel;
use crate::whatsapp::{TwilioCredentials, WhatsAppChannel};

enum Pending {
    Done(ChannelResult),
    Running(Channel, JoinHandle<ChannelResult>),
}

/// Routes a request to the handler of every requested channel.
pub struct Dispatcher {
    handlers: Vec<Arc<dyn ChannelHandler>>,
}

impl Dispatcher {
    pub fn new(handlers: Vec<Arc<dyn ChannelHandler>>) -> Self {
        Self { handlers }
    }

    /// Build the standard email / WhatsApp / Telegram handlers from configuration.
    ///
    /// `mail_sender` is `None` when no mail account is configured.
    pub fn from_config(
        config: &AppConfig,
        mail_sender: Option<Arc<dyn MailSender>>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()?;

        let handlers: Vec<Arc<dyn ChannelHandler>> = vec![
            Arc::new(EmailChannel::new(mail_sender)),
            Arc::new(WhatsAppChannel::new(
                TwilioCredentials::from_config(config),
                client.clone(),
                config.twilio_api_base.clone(),
            )),
            Arc::new(TelegramChannel::new(
                config.telegram_bot_token.clone(),
                client,
                config.telegram_api_base.clone(),
            )),
        ];

        Ok(Self::new(handlers))
    }

    pub fn handler(&self, channel: Channel) -> Option<&Arc<dyn ChannelHandler>> {
        self.handlers.iter().find(|h| h.channel() == channel)
    }

    /// Configuration state of every known channel. No network calls.
    pub fn service_status(&self) -> Vec<(Channel, bool)> {
        Channel::ALL
            .iter()
            .map(|&channel| {
                let configured = self.handler(channel).is_some_and(|h| h.is_configured());
                (channel, configured)
            })
            .collect()
    }

    /// Attempt delivery on every requested channel and collect the results.
    pub async fn dispatch(&self, request: &NotificationRequest) -> DispatchOutcome {
        let span = tracing::info_span!(
            "dispatch",
            dispatch_id = %Uuid::new_v4(),
            channels = request.channels.len()
        );
        self.fan_out(request).instrument(span).await
    }

    async fn fan_out(&self, request: &NotificationRequest) -> DispatchOutcome {
        let subject: Arc<str> = Arc::from(request.subject.as_str());
        let message: Arc<str> = Arc::from(request.message.as_str());

        let pending: Vec<Pending> = request
            .channels
            .iter()
            .map(|&channel| match self.handler(channel) {
                Some(handler) => {
                    let task = attempt(
                        handler.clone(),
                        subject.clone(),
                        message.clone(),
                        request.recipients.get(channel),
                        request.recipients.malformed(channel),
                    );
                    Pending::Running(channel, tokio::spawn(task.in_current_span()))
                }
                None => Pending::Done(ChannelResult::skipped(
                    channel,
                    format!("no handler is registered for {}", channel),
                )),
            })
            .collect();

        let mut results = Vec::with_capacity(pending.len());
        for entry in pending {
            let result = match entry {
                Pending::Done(result) => result,
                Pending::Running(channel, task) => match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(channel = %channel, error = %e, "Channel handler aborted");
                        ChannelResult::failed(
                            channel,
                            format!("Channel handler aborted unexpectedly: {}", e),
                        )
                    }
                },
            };
            results.push(result);
        }

        DispatchOutcome::new(results)
    }
}

/// Gate, attempt and record a single channel.
async fn attempt(
    handler: Arc<dyn ChannelHandler>,
    subject: Arc<str>,
    message: Arc<str>,
    recipient: Option<String>,
    malformed: Option<String>,
) -> ChannelResult {
    let channel = handler.channel();

    // A provider that is not configured still takes precedence.
    if let Some(raw) = malformed {
        let reason = match handler.check_ready(None) {
            Ok(()) | Err(SkipReason::MissingRecipient(_)) => SkipReason::InvalidRecipient {
                kind: channel.as_str(),
                value: raw,
            },
            Err(other) => other,
        };
        tracing::warn!(channel = %channel, reason = %reason, "Channel skipped");
        return ChannelResult::skipped(channel, reason.to_string());
    }

    let recipient = match (handler.check_ready(recipient.as_deref()), recipient) {
        (Ok(()), Some(recipient)) => recipient,
        (Ok(()), None) => {
            let reason = SkipReason::MissingRecipient(channel.as_str());
            tracing::warn!(channel = %channel, reason = %reason, "Channel skipped");
            return ChannelResult::skipped(channel, reason.to_string());
        }
        (Err(reason), _) => {
            tracing::warn!(channel = %channel, reason = %reason, "Channel skipped");
            return ChannelResult::skipped(channel, reason.to_string());
        }
    };

    match handler.deliver(&subject, &message, &recipient).await {
        Ok(id) => {
            tracing::info!(channel = %channel, recipient = %recipient, message_id = %id, "Notification delivered");
            ChannelResult::success(channel, id)
        }
        Err(e) => {
            tracing::error!(channel = %channel, recipient = %recipient, error = %e, "Notification delivery failed");
            ChannelResult::failed(channel, e.to_string())
        }
    }
}

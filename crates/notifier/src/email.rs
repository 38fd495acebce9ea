//! Email channel delivered over SMTP.
//!
//! The channel itself only renders and gates; the actual transport sits
//! behind [`MailSender`] so the SMTP relay can be swapped out in tests.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use regex::Regex;
use uuid::Uuid;

use relay_common::config::AppConfig;
use relay_common::error::AppError;
use relay_common::types::Channel;

use crate::channel::{ChannelHandler, DeliveryError, SkipReason};

/// Tag prepended to every outgoing subject line.
pub const SUBJECT_TAG: &str = "[Anomaly Insight]";

/// Sender organisation shown in the HTML body.
pub const ORGANIZATION: &str = "Solusi Bangun Indonesia";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Syntactic check only: local-part "@" domain "." tld, no whitespace.
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_PATTERN.is_match(address)
}

/// A fully rendered mail ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Anything able to hand a rendered mail to a mail server.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Send the mail and return its message identifier.
    async fn send(&self, mail: &OutgoingMail) -> Result<String, DeliveryError>;
}

/// SMTP relay sender with implicit TLS and login credentials.
pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailSender {
    /// Build a sender from configuration. Returns `Ok(None)` when no mail account is set.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, AppError> {
        let (Some(user), Some(pass)) = (&config.email_user, &config.email_pass) else {
            return Ok(None);
        };

        let address = user
            .parse::<Address>()
            .map_err(|e| AppError::Config(format!("EMAIL_USER is not a valid address: {}", e)))?;
        let from = Mailbox::new(Some(config.email_sender_name.clone()), address);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| AppError::Config(format!("SMTP_HOST {}: {}", config.smtp_host, e)))?
            .credentials(Credentials::new(user.clone(), pass.clone()))
            .timeout(Some(Duration::from_secs(config.provider_timeout_secs)))
            .build();

        Ok(Some(Self { transport, from }))
    }

    /// Like [`from_config`](Self::from_config), but a broken mail setup only
    /// disables the email channel. The error is logged.
    pub fn load(config: &AppConfig) -> Option<Self> {
        match Self::from_config(config) {
            Ok(sender) => sender,
            Err(e) => {
                tracing::error!(error = %e, "Email transport could not be created; email channel disabled");
                None
            }
        }
    }

    /// Open a connection to the relay and log whether it accepted us.
    pub async fn verify(&self) {
        match self.transport.test_connection().await {
            Ok(true) => tracing::info!("Email transport is ready to send messages"),
            Ok(false) => tracing::warn!("Email transport connection test was not accepted"),
            Err(e) => tracing::error!(error = %e, "Email transport verification failed"),
        }
    }

    fn domain(&self) -> &str {
        self.from.email.domain()
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, DeliveryError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| DeliveryError::InvalidAddress(format!("{}: {}", mail.to, e)))?;

        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.domain());

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone())
            .map_err(|e| DeliveryError::Provider(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| classify_smtp_error(&e, &mail.to))?;

        Ok(message_id)
    }
}

/// Map an SMTP failure onto the delivery error taxonomy.
fn classify_smtp_error(err: &lettre::transport::smtp::Error, recipient: &str) -> DeliveryError {
    let reply = err
        .status()
        .map(|code| code.to_string().parse::<u16>().unwrap_or_default());
    classify_smtp_failure(reply, err.is_client(), recipient, &err.to_string())
}

fn classify_smtp_failure(
    reply: Option<u16>,
    client_side: bool,
    recipient: &str,
    raw: &str,
) -> DeliveryError {
    match reply {
        Some(code) => classify_smtp_reply(code, recipient, raw),
        None if client_side => DeliveryError::Provider(raw.to_string()),
        // No reply from the server: refused, reset, TLS handshake or timeout.
        None => DeliveryError::Connectivity(format!(
            "Check the internet connection or SMTP settings ({})",
            raw
        )),
    }
}

fn classify_smtp_reply(reply: u16, recipient: &str, raw: &str) -> DeliveryError {
    match reply {
        454 | 530 | 534 | 535 => DeliveryError::Auth(format!(
            "Check EMAIL_USER and the app password in EMAIL_PASS ({})",
            raw
        )),
        501 | 550 | 551 | 553 => {
            DeliveryError::InvalidAddress(format!("{} ({})", recipient, raw))
        }
        421 => DeliveryError::Connectivity(raw.to_string()),
        _ => DeliveryError::Provider(raw.to_string()),
    }
}

/// Render the HTML body. Subject and message are embedded verbatim.
pub fn render_html(subject: &str, message: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px;">
    <h2 style="color: #333; margin-bottom: 20px;">Notification from {org}</h2>
    <div style="background-color: white; padding: 20px; border-radius: 5px; border-left: 4px solid #007bff;">
      <h3 style="color: #333; margin-top: 0;">{subject}</h3>
      <p style="color: #666; line-height: 1.6;">{message}</p>
    </div>
    <div style="margin-top: 20px; font-size: 12px; color: #888;">
      <p>This message was sent automatically by the {org} system.</p>
    </div>
  </div>
</div>"#,
        org = ORGANIZATION,
        subject = subject,
        message = message,
    )
}

/// Email channel handler.
pub struct EmailChannel {
    sender: Option<Arc<dyn MailSender>>,
}

impl EmailChannel {
    pub fn new(sender: Option<Arc<dyn MailSender>>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ChannelHandler for EmailChannel {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    fn check_ready(&self, recipient: Option<&str>) -> Result<(), SkipReason> {
        if self.sender.is_none() {
            return Err(SkipReason::ProviderNotConfigured("Email transport"));
        }
        match recipient {
            None => Err(SkipReason::MissingRecipient("email")),
            Some(address) if !is_valid_email(address) => Err(SkipReason::InvalidRecipient {
                kind: "email",
                value: address.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    async fn deliver(
        &self,
        subject: &str,
        message: &str,
        recipient: &str,
    ) -> Result<String, DeliveryError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| DeliveryError::Provider("Email transport is not configured".into()))?;

        let mail = OutgoingMail {
            to: recipient.to_string(),
            subject: format!("{} {}", SUBJECT_TAG, subject),
            html: render_html(subject, message),
        };
        sender.send(&mail).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl MailSender for RecordingSender {
        async fn send(&self, mail: &OutgoingMail) -> Result<String, DeliveryError> {
            self.sent.lock().unwrap().push(mail.clone());
            Ok("<id-1@example.com>".to_string())
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("ops@example.com"));
        assert!(is_valid_email("a.b+tag@sub.example.co.id"));
        assert!(!is_valid_email("bad-address"));
        assert!(!is_valid_email("no-tld@example"));
        assert!(!is_valid_email("space in@example.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_unconfigured_transport_is_skipped_first() {
        let channel = EmailChannel::new(None);
        assert!(!channel.is_configured());
        assert_eq!(
            channel.check_ready(Some("ops@example.com")),
            Err(SkipReason::ProviderNotConfigured("Email transport"))
        );
    }

    #[test]
    fn test_recipient_gate() {
        let channel = EmailChannel::new(Some(Arc::new(RecordingSender::default())));
        assert_eq!(
            channel.check_ready(None),
            Err(SkipReason::MissingRecipient("email"))
        );
        assert!(matches!(
            channel.check_ready(Some("bad-address")),
            Err(SkipReason::InvalidRecipient { .. })
        ));
        assert_eq!(channel.check_ready(Some("ops@example.com")), Ok(()));
    }

    #[tokio::test]
    async fn test_deliver_renders_tagged_subject_and_html() {
        let sender = Arc::new(RecordingSender::default());
        let channel = EmailChannel::new(Some(sender.clone()));

        let id = channel
            .deliver("Kiln 3 anomaly", "Temperature <b>spike</b>", "ops@example.com")
            .await
            .unwrap();
        assert_eq!(id, "<id-1@example.com>");

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ops@example.com");
        assert_eq!(sent[0].subject, "[Anomaly Insight] Kiln 3 anomaly");
        assert!(sent[0].html.contains("<h3 style=\"color: #333; margin-top: 0;\">Kiln 3 anomaly</h3>"));
        assert!(sent[0].html.contains("Temperature <b>spike</b>"));
    }

    #[test]
    fn test_smtp_reply_classification() {
        assert!(matches!(
            classify_smtp_reply(535, "a@b.c", "535 5.7.8 bad credentials"),
            DeliveryError::Auth(_)
        ));
        assert!(matches!(
            classify_smtp_reply(553, "a@b.c", "553 mailbox name not allowed"),
            DeliveryError::InvalidAddress(_)
        ));
        assert!(matches!(
            classify_smtp_reply(421, "a@b.c", "421 service not available"),
            DeliveryError::Connectivity(_)
        ));
        assert!(matches!(
            classify_smtp_reply(552, "a@b.c", "552 message too large"),
            DeliveryError::Provider(_)
        ));
    }

    #[test]
    fn test_smtp_failure_without_reply() {
        assert!(matches!(
            classify_smtp_failure(None, false, "a@b.c", "connection refused"),
            DeliveryError::Connectivity(msg) if msg.contains("SMTP settings")
        ));
        assert!(matches!(
            classify_smtp_failure(None, true, "a@b.c", "client error: no recipients"),
            DeliveryError::Provider(_)
        ));
        assert!(matches!(
            classify_smtp_failure(Some(550), true, "a@b.c", "550 no such user"),
            DeliveryError::InvalidAddress(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_smtp_server_is_connectivity() {
        let sender = SmtpMailSender {
            transport: AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("127.0.0.1")
                .port(9)
                .timeout(Some(Duration::from_secs(2)))
                .build(),
            from: "relay@example.com".parse().unwrap(),
        };
        let mail = OutgoingMail {
            to: "ops@example.com".into(),
            subject: "Test".into(),
            html: "<p>Hi</p>".into(),
        };

        let err = sender.send(&mail).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Connectivity(_)), "got {:?}", err);
    }

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        AppConfig::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn test_smtp_sender_absent_without_credentials() {
        let config = config_from(&[]);
        assert!(SmtpMailSender::from_config(&config).unwrap().is_none());
        assert!(SmtpMailSender::load(&config).is_none());
    }

    #[test]
    fn test_invalid_mail_account_disables_sender() {
        let config = config_from(&[("EMAIL_USER", "hcsi.sbi"), ("EMAIL_PASS", "pw")]);
        assert!(matches!(
            SmtpMailSender::from_config(&config),
            Err(AppError::Config(msg)) if msg.contains("EMAIL_USER")
        ));
        assert!(SmtpMailSender::load(&config).is_none());
    }
}

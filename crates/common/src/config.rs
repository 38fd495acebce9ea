use serde::Deserialize;

/// Placeholder shipped in `.env` templates; treated as an unset bot token.
pub const TELEGRAM_TOKEN_PLACEHOLDER: &str = "your_telegram_bot_token";

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Interface the HTTP server binds to
    pub host: String,

    /// Port the HTTP server listens on (default: 8001)
    pub port: u16,

    /// Mail account used both as SMTP login and as the From address
    pub email_user: Option<String>,

    /// Mail account app password
    pub email_pass: Option<String>,

    /// Display name on the From header
    pub email_sender_name: String,

    /// SMTP relay host (implicit TLS)
    pub smtp_host: String,

    /// Twilio account SID
    pub twilio_account_sid: Option<String>,

    /// Twilio auth token
    pub twilio_auth_token: Option<String>,

    /// WhatsApp sender number registered with Twilio
    pub twilio_whatsapp_from: Option<String>,

    /// Twilio REST API base URL
    pub twilio_api_base: String,

    /// Telegram bot token
    pub telegram_bot_token: Option<String>,

    /// Telegram Bot API base URL
    pub telegram_api_base: String,

    /// Upper bound for a single provider call, in seconds (default: 10)
    pub provider_timeout_secs: u64,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    /// Allowed CORS origins; empty means permissive
    pub cors_allowed_origins: Vec<String>,

    /// Include internal error detail in 500 responses
    pub diagnostic_mode: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "8001".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
            email_user: var("EMAIL_USER"),
            email_pass: var("EMAIL_PASS"),
            email_sender_name: var("EMAIL_SENDER_NAME")
                .unwrap_or_else(|| "Anomaly Insight System".to_string()),
            smtp_host: var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            twilio_account_sid: var("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: var("TWILIO_AUTH_TOKEN"),
            twilio_whatsapp_from: var("TWILIO_WHATSAPP_FROM"),
            twilio_api_base: var("TWILIO_API_BASE")
                .unwrap_or_else(|| "https://api.twilio.com".to_string()),
            telegram_bot_token: var("TELEGRAM_BOT_TOKEN")
                .filter(|token| token != TELEGRAM_TOKEN_PLACEHOLDER),
            telegram_api_base: var("TELEGRAM_API_BASE")
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            provider_timeout_secs: var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PROVIDER_TIMEOUT_SECS must be a valid u64"))?,
            max_body_bytes: var("MAX_BODY_BYTES")
                .unwrap_or_else(|| "65536".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a valid usize"))?,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            diagnostic_mode: var("APP_ENV").is_some_and(|env| env == "development"),
            log_json: var("LOG_FORMAT").is_some_and(|format| format == "json"),
        })
    }

    /// Both halves of the mail login are present.
    pub fn email_configured(&self) -> bool {
        self.email_user.is_some() && self.email_pass.is_some()
    }

    /// Account SID, auth token and sender number are all present.
    pub fn whatsapp_configured(&self) -> bool {
        self.twilio_account_sid.is_some()
            && self.twilio_auth_token.is_some()
            && self.twilio_whatsapp_from.is_some()
    }

    pub fn telegram_configured(&self) -> bool {
        self.telegram_bot_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8001);
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.provider_timeout_secs, 10);
        assert!(config.cors_allowed_origins.is_empty());
        assert!(!config.diagnostic_mode);
        assert!(!config.email_configured());
        assert!(!config.whatsapp_configured());
        assert!(!config.telegram_configured());
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = config_from(&[("EMAIL_USER", "ops@example.com"), ("EMAIL_PASS", "  ")]).unwrap();
        assert_eq!(config.email_user.as_deref(), Some("ops@example.com"));
        assert!(config.email_pass.is_none());
        assert!(!config.email_configured());
    }

    #[test]
    fn test_telegram_placeholder_is_not_a_token() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", TELEGRAM_TOKEN_PLACEHOLDER)]).unwrap();
        assert!(config.telegram_bot_token.is_none());

        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
        assert!(config.telegram_configured());
    }

    #[test]
    fn test_whatsapp_requires_all_three_values() {
        let config = config_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
        ])
        .unwrap();
        assert!(!config.whatsapp_configured());

        let config = config_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_WHATSAPP_FROM", "whatsapp:+14155238886"),
        ])
        .unwrap();
        assert!(config.whatsapp_configured());
    }

    #[test]
    fn test_cors_origins_and_app_env() {
        let config = config_from(&[
            ("CORS_ALLOWED_ORIGINS", "http://localhost:5500, http://127.0.0.1:5500,"),
            ("APP_ENV", "development"),
        ])
        .unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:5500", "http://127.0.0.1:5500"]
        );
        assert!(config.diagnostic_mode);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("PROVIDER_TIMEOUT_SECS", "-1")]).is_err());
    }
}

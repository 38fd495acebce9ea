//! Notification relay API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use relay_common::config::AppConfig;
use relay_notifier::Dispatcher;
use relay_notifier::email::{MailSender, SmtpMailSender};

use relay_api::routes::create_app;
use relay_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (also reads .env, so RUST_LOG may come from there)
    let config = AppConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("relay_api=debug,relay_notifier=debug,tower_http=debug")
    });
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting notification relay API server...");

    // Mail transport; verification runs in the background and only logs
    let smtp = SmtpMailSender::load(&config).map(Arc::new);
    match &smtp {
        Some(sender) => {
            let sender = sender.clone();
            tokio::spawn(async move { sender.verify().await });
        }
        None if !config.email_configured() => {
            tracing::warn!("EMAIL_USER or EMAIL_PASS is not set; email channel disabled")
        }
        None => {}
    }
    let mail_sender = smtp.map(|sender| sender as Arc<dyn MailSender>);

    let dispatcher = Dispatcher::from_config(&config, mail_sender)?;
    for (channel, configured) in dispatcher.service_status() {
        tracing::info!(channel = %channel, configured, "Channel configuration");
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid HOST/PORT combination: {}", e))?;

    // Build application
    let state = AppState::new(config, dispatcher);
    let app = create_app(state);

    // Start server
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

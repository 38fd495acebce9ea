//! Notification dispatch and configuration status routes.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};

use relay_common::error::AppError;
use relay_common::types::ChannelResult;
use relay_notifier::validate;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/send-notification", post(send_notification))
        .route("/api/notifications/status", get(notification_status))
}

/// Response body for a processed dispatch (200 or 400).
#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<ChannelResult>,
}

/// POST /api/send-notification — Validate, dispatch and aggregate.
async fn send_notification(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    match dispatch(&state, payload).await {
        Ok(response) => response,
        Err(e) => e.into_response_with_detail(state.config.diagnostic_mode),
    }
}

async fn dispatch(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = match payload {
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Ok(rejection.into_response());
        }
        other => other,
    }
    .map_err(|e| {
        AppError::Validation(format!(
            "Subject, message and channels are required. ({})",
            e.body_text()
        ))
    })?;

    let request = validate(body).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected notification request");
    })?;

    let outcome = state.dispatcher.dispatch(&request).await;
    let verdict = outcome.verdict();
    let status = StatusCode::from_u16(verdict.status_code())
        .map_err(|e| AppError::Internal(format!("Invalid status code: {}", e)))?;

    tracing::info!(
        status = status.as_u16(),
        sent = outcome.success_channels().len(),
        failed = outcome.failed_channels().len(),
        skipped = outcome.skipped_channels().len(),
        "Notification request processed"
    );

    let body = SendNotificationResponse {
        success: verdict.is_success(),
        message: outcome.summary(),
        results: outcome.results,
    };
    Ok((status, Json(body)).into_response())
}

/// GET /api/notifications/status — Report configured channels without touching providers.
async fn notification_status(State(state): State<AppState>) -> Json<Value> {
    let services: serde_json::Map<String, Value> = state
        .dispatcher
        .service_status()
        .into_iter()
        .map(|(channel, configured)| {
            let label = if configured {
                "configured"
            } else {
                "not configured"
            };
            (channel.to_string(), json!(label))
        })
        .collect();

    Json(json!({ "success": true, "services": services }))
}

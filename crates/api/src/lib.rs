//! HTTP surface of the notification relay.
//!
//! Endpoints:
//! - POST /api/send-notification — fan a message out to the requested channels
//! - GET  /api/notifications/status — which channels are configured
//! - GET  /api/health — liveness check

pub mod routes;
pub mod state;

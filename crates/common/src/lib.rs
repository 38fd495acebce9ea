//! Shared configuration, error and data types for the notification relay.

pub mod config;
pub mod error;
pub mod types;

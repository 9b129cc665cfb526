//! Error types for the reconciliation engine
//!
//! This module defines all error types used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single entry of the provider's `errors` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderErrorDetail {
    /// Provider error code
    pub code: i64,
    /// Human-readable message
    pub message: String,
}

impl ProviderErrorDetail {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Core error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider answered with a non-success envelope or a non-200 status
    #[error("Provider error (HTTP {status}): {}", format_details(.errors))]
    Provider {
        /// HTTP status code of the response
        status: u16,
        /// Provider error list from the envelope
        errors: Vec<ProviderErrorDetail>,
    },

    /// Zone resolution produced no usable zone
    #[error("No zones found")]
    NoZonesFound,

    /// Record refresh left the store without any record
    #[error("No records found")]
    NoRecordsFound,

    /// Network failure reaching the provider or the IP-echo service
    #[error("Transport error: {0}")]
    Transport(String),

    /// IP-echo service answered but the answer was unusable
    #[error("IP source error: {0}")]
    IpSource(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Notification delivery failed
    #[error("Notification error: {0}")]
    Notification(String),
}

fn format_details(errors: &[ProviderErrorDetail]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider error
    pub fn provider(status: u16, errors: Vec<ProviderErrorDetail>) -> Self {
        Self::Provider { status, errors }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// HTTP status carried by a provider error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the IP observer should back off and retry the same tick
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::IpSource(_))
    }
}

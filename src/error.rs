//! Unified error handling for the tracesync library.
//!
//! This module provides a consistent error type for all sync operations,
//! so that the coordinator can distinguish fatal failures (bad credential,
//! engine unavailable) from tolerated ones, which travel as data instead.

use std::fmt;

/// Unified error type for sync orchestration operations.
#[derive(Debug, Clone)]
pub enum SyncError {
    /// No credential was available for the remote telemetry service
    MissingCredential,
    /// The analytics engine was not available at sync start
    EngineUnavailable { message: String },
    /// The analytics engine rejected a call
    EngineError { message: String },
    /// HTTP/API error
    HttpError {
        message: String,
        status_code: Option<u16>,
    },
    /// Response body could not be decoded
    ParseError { message: String },
    /// Preference store error
    PreferenceError { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::MissingCredential => {
                write!(f, "No credential available for telemetry service")
            }
            SyncError::EngineUnavailable { message } => {
                write!(f, "Analytics engine unavailable: {}", message)
            }
            SyncError::EngineError { message } => {
                write!(f, "Analytics engine error: {}", message)
            }
            SyncError::HttpError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            SyncError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            SyncError::PreferenceError { message } => {
                write!(f, "Preference error: {}", message)
            }
            SyncError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for SyncError {}

/// Result type alias for tracesync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

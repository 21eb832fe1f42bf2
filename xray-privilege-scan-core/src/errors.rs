//! Error types for the X-Ray privilege scan core
//!
//! The inference engine itself never fails on malformed trace data (data gaps are
//! logged and skipped), so these errors only describe decoding failures at the
//! crate boundary, invalid scan configuration and collaborator failures reported
//! through the source traits.

use thiserror::Error;

/// Result type alias for operations that can fail with [`ScanError`]
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors surfaced by the scan core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScanError {
    /// JSON decoding or encoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Scan configuration was rejected before any work started
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A policy document could not be decoded
    #[error("Invalid policy document: {message}")]
    PolicyDocument { message: String },

    /// A collaborator (trace, policy or role source) failed
    #[error("{source_name} failed: {message}")]
    Source {
        source_name: &'static str,
        message: String,
    },
}

impl ScanError {
    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a policy document error
    pub fn policy_document(message: impl Into<String>) -> Self {
        Self::PolicyDocument {
            message: message.into(),
        }
    }

    /// Create a collaborator error tagged with the source that raised it
    pub fn source(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Source {
            source_name,
            message: message.into(),
        }
    }
}

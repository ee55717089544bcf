// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the wadesk session engine.

use thiserror::Error;

/// The primary error type used across all wadesk traits and core operations.
#[derive(Debug, Error)]
pub enum WadeskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat transport errors (send, decrypt, fetch failures).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The transport connection is gone (browser target closed, protocol failure).
    ///
    /// Long-running operations such as history sync abort on this error
    /// instead of skipping to the next item.
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// LLM provider returned an error response.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required credential (API key) is not configured.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The remote service could not be reached.
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Input rejected by validation (one field, one command, one tool call).
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller is not allowed to act on the requested resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A history sync is already running for this session.
    #[error("sync already in progress for session {session}")]
    SyncInProgress { session: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WadeskError {
    /// Shorthand for a channel error without a source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for wrapping any error as a storage error.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// True when the transport is gone and retrying against it is pointless.
    pub fn is_transport_closed(&self) -> bool {
        matches!(self, Self::TransportClosed(_))
    }
}

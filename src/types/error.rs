//! Unified Error Type System
//!
//! Centralized error types for the coaching engine.
//! Provides error classification for channel fallback and degradation decisions.
//!
//! ## Error Categories
//!
//! - **NotFound**: Operation on an unregistered rep (surfaced to the caller)
//! - **Unavailable**: Store or channel is down (degrade, fall back)
//! - **Network**: Connectivity issues talking to a channel (fall back)
//! - **BadRequest**: Malformed input (resolve with fallback text)
//! - **Unknown**: Anything else (treated as unavailable by the dispatcher)

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for routing delivery and degradation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rep or record not registered - raise to caller
    NotFound,
    /// Store or channel unavailable - degrade and fall back
    Unavailable,
    /// Network/connectivity issues - fall back to next channel
    Network,
    /// Invalid input - don't retry
    BadRequest,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Network => write!(f, "NETWORK"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether a delivery failure in this category should move to the next channel
    pub fn should_fallback(&self) -> bool {
        matches!(self, Self::Unavailable | Self::Network | Self::Unknown)
    }

    /// Whether this failure is raised to orchestrator callers instead of swallowed
    pub fn is_caller_facing(&self) -> bool {
        matches!(self, Self::NotFound | Self::BadRequest)
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Classifies transport error text coming back from channel backends
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from a delivery channel
    pub fn classify(message: &str) -> ErrorCategory {
        let lower = message.to_lowercase();

        if lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("unreachable")
            || lower.contains("websocket")
        {
            return ErrorCategory::Network;
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("500")
            || lower.contains("service unavailable")
            || lower.contains("not configured")
            || lower.contains("circuit open")
        {
            return ErrorCategory::Unavailable;
        }

        if lower.contains("400") || lower.contains("invalid") || lower.contains("malformed") {
            return ErrorCategory::BadRequest;
        }

        ErrorCategory::Unknown
    }

    /// Classify HTTP status code directly
    pub fn classify_http_status(status: u16) -> ErrorCategory {
        match status {
            400 | 422 => ErrorCategory::BadRequest,
            404 => ErrorCategory::NotFound,
            408 | 504 => ErrorCategory::Network,
            429 | 500..=599 => ErrorCategory::Unavailable,
            _ => ErrorCategory::Unknown,
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum CoachError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Rep not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Transport failure on a delivery channel
    #[error("Delivery via {channel} failed: {message}")]
    Delivery { channel: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Not initialized: run 'repcoach init' first")]
    NotInitialized,
}

impl From<anyhow::Error> for CoachError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return CoachError::Io(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }
        CoachError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoachError>;

impl CoachError {
    /// Create a delivery error for a channel
    pub fn delivery(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error for a rep id
    pub fn not_found(rep_id: impl std::fmt::Display) -> Self {
        Self::NotFound(rep_id.to_string())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Classify this error for routing decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::InvalidInput(_) | Self::Json(_) => ErrorCategory::BadRequest,
            Self::Database(_) | Self::Storage(_) | Self::Config(_) | Self::NotInitialized => {
                ErrorCategory::Unavailable
            }
            Self::Io(_) | Self::Timeout { .. } => ErrorCategory::Network,
            Self::Delivery { message, .. } => ErrorClassifier::classify(message),
        }
    }

    /// Check if this error should trigger fallback to another channel
    pub fn should_fallback(&self) -> bool {
        self.category().should_fallback()
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| CoachError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| CoachError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

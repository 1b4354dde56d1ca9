//! Domain error types
//!
//! This module defines the error hierarchy for the mapping and submission pipeline.
//! All errors are domain-specific and don't expose third-party types.

use std::fmt;
use thiserror::Error;

/// Main error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum IvrError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Episode, manufacturer or submission identifier does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Manufacturer-required fields missing after mapping
    #[error("Mapping validation failed: {}", .errors.join("; "))]
    ValidationFailed {
        /// Validation errors reported by the rule validator
        errors: Vec<String>,
    },

    /// The e-signature service rejected or failed an operation
    #[error("Upstream service error: {0}")]
    UpstreamService(SubmissionErrorDetail),

    /// DocuSeal client errors without submission context
    #[error("DocuSeal error: {0}")]
    DocuSeal(#[from] DocuSealError),

    /// Caller-supplied parameters fail shape or type checks
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Status callback for a submission that is not on file
    #[error("Unknown callback: {0}")]
    UnknownCallback(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl IvrError {
    /// Builds a validation failure from the validator's error list
    pub fn validation_failed(errors: Vec<String>) -> Self {
        IvrError::ValidationFailed { errors }
    }

    /// Returns true for the not-found family of errors
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IvrError::NotFound(_) | IvrError::DocuSeal(DocuSealError::NotFound(_))
        )
    }
}

/// DocuSeal-specific errors
///
/// Errors that occur when interacting with the DocuSeal API.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Clone, Error)]
pub enum DocuSealError {
    /// Failed to connect to DocuSeal
    #[error("Failed to connect to DocuSeal: {0}")]
    ConnectionFailed(String),

    /// API key rejected (401)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Submission or document not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Response body could not be interpreted
    #[error("Invalid response from DocuSeal: {0}")]
    InvalidResponse(String),
}

impl DocuSealError {
    /// Whether a read request failing with this error may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DocuSealError::ConnectionFailed(_)
                | DocuSealError::Timeout(_)
                | DocuSealError::RateLimited(_)
                | DocuSealError::ServerError { .. }
        )
    }
}

/// Submission error details
///
/// Provides the context needed to retry a failed submission manually.
#[derive(Debug, Clone)]
pub struct SubmissionErrorDetail {
    /// Episode associated with the error
    pub episode_id: Option<String>,

    /// Manufacturer associated with the error
    pub manufacturer: Option<String>,

    /// Operation that was attempted (create, update, send, download)
    pub operation: Option<String>,

    /// Error message
    pub message: String,

    /// Whether the error is retryable
    pub retryable: bool,
}

impl SubmissionErrorDetail {
    /// Creates a new submission error detail
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            episode_id: None,
            manufacturer: None,
            operation: None,
            message: message.into(),
            retryable: false,
        }
    }

    /// Sets the episode ID
    pub fn with_episode_id(mut self, episode_id: impl Into<String>) -> Self {
        self.episode_id = Some(episode_id.into());
        self
    }

    /// Sets the manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Sets the attempted operation
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Marks the error as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for SubmissionErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref operation) = self.operation {
            write!(f, "{operation} failed")?;
        } else {
            write!(f, "operation failed")?;
        }
        if let Some(ref episode_id) = self.episode_id {
            write!(f, " for episode {episode_id}")?;
        }
        if let Some(ref manufacturer) = self.manufacturer {
            write!(f, " ({manufacturer})")?;
        }
        write!(f, ": {}", self.message)
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for IvrError {
    fn from(err: std::io::Error) -> Self {
        IvrError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for IvrError {
    fn from(err: serde_json::Error) -> Self {
        IvrError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for IvrError {
    fn from(err: toml::de::Error) -> Self {
        IvrError::Configuration(format!("TOML parse error: {err}"))
    }
}

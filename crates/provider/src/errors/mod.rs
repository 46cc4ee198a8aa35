//! Error types and retry classification for provider operations.
//!
//! This module provides:
//! - [`ProviderError`]: The error enum for every provider fetch
//! - [`RetryClass`]: Classification for determining retry behavior
//! - [`Retryable`]: The predicate the retry policy consults

mod retry;

pub use retry::{RetryClass, Retryable};

use thiserror::Error;

/// Errors that can occur while fetching data from the provider.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which determines whether the
/// retry policy should attempt the operation again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider could not be reached (DNS, refused connection, TLS).
    #[error("Connection failed: {provider} - {message}")]
    Connection { provider: String, message: String },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// The provider reported a temporary failure (HTTP 429, 5xx, or a
    /// server-side "try again" status).
    #[error("Transient provider failure: {provider} - {message}")]
    TransientRuntime { provider: String, message: String },

    /// Credentials were rejected. Retrying with the same credentials won't help.
    #[error("Authentication failed: {provider} - {message}")]
    Authentication { provider: String, message: String },

    /// The provider rejected the request shape (unknown field, bad identifier
    /// syntax, empty request).
    #[error("Malformed request: {provider} - {message}")]
    MalformedRequest { provider: String, message: String },

    /// The provider answered but the body could not be decoded.
    #[error("Invalid response: {provider} - {message}")]
    InvalidResponse { provider: String, message: String },

    /// Local configuration is incomplete or invalid.
    #[error("Provider configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ratiofeed_provider::errors::{ProviderError, RetryClass};
    ///
    /// let error = ProviderError::Timeout { provider: "BLOOMBERG".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = ProviderError::Authentication {
    ///     provider: "BLOOMBERG".to_string(),
    ///     message: "invalid_client".to_string(),
    /// };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // Transient errors - retry with backoff
            Self::Connection { .. } | Self::Timeout { .. } | Self::TransientRuntime { .. } => {
                RetryClass::WithBackoff
            }

            // Terminal errors - the same request will fail the same way
            Self::Authentication { .. }
            | Self::MalformedRequest { .. }
            | Self::InvalidResponse { .. }
            | Self::Configuration(_) => RetryClass::Never,
        }
    }

    /// Maps a reqwest transport error onto the retry-relevant taxonomy.
    pub fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else if err.is_connect() || err.is_request() {
            Self::Connection {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::InvalidResponse {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::TransientRuntime {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::WithBackoff
    }
}

//! Error types for the Streamgate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error::kind`] collapses
//! them into the coarse taxonomy the gateway surfaces to callers.

use thiserror::Error;

/// The top-level error type for all gateway operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Tenant resolution ---
    #[error("No provider configuration for tenant '{tenant_id}'")]
    ConfigNotFound { tenant_id: String },

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration store errors ---
    #[error("Configuration store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was malformed (e.g. empty question).
    InvalidInput,
    /// The tenant has no provider configuration.
    ConfigNotFound,
    /// The upstream provider failed (transport, auth, rate limit, bad response).
    UpstreamFailure,
    /// The configuration store failed.
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::ConfigNotFound { .. } => ErrorKind::ConfigNotFound,
            Error::Provider(_) => ErrorKind::UpstreamFailure,
            Error::Store(_) => ErrorKind::Internal,
        }
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Classify a `reqwest`-style transport failure message.
    pub fn transport(message: impl Into<String>, timed_out: bool) -> Self {
        if timed_out {
            ProviderError::Timeout(message.into())
        } else {
            ProviderError::Network(message.into())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Configuration store unavailable: {0}")]
    Unavailable(String),
}

//! Error types for market data operations.
//!
//! This module defines [`DseError`] which covers all error cases that can occur
//! when fetching, reconciling, or persisting exchange data.

use thiserror::Error;

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum DseError {
    /// Network-related errors (connection failures, timeouts, bad status).
    #[error("Network error: {0}")]
    Network(String),

    /// Error parsing data scraped from the exchange website.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache or archive store.
    #[error("Store error: {0}")]
    Store(String),

    /// The requested instrument or cache document does not exist.
    ///
    /// This is an expected steady state before the first successful fetch,
    /// not a fault.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An invalid parameter was provided by the caller.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl DseError {
    /// Returns true if this error represents an absent resource rather than
    /// a fault.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias using [`DseError`].
pub type Result<T> = std::result::Result<T, DseError>;

//! Centralised error handling for the Proof of Friendship client stack.
//!
//! Error variants are intentionally broad.  Fine-grained details should be
//! encoded in the error message instead of proliferating new variants per
//! crate; the chain and pipeline crates keep their own per-concern enums and
//! convert into [`PofError`] only at the outermost boundary.

use thiserror::Error;

/// A convenient `Result` alias tied to [`PofError`].
pub type Result<T, E = PofError> = std::result::Result<T, E>;

/// Top-level application error.
///
/// When mapping an external/foreign error, pick the *broadest* matching
/// category (e.g. any HTTP client error maps to `PofError::Network`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PofError {
    /// Invalid user input or domain-level validation failure.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Requested entity could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration loading or validation failed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Interaction with an external service / network endpoint failed.
    #[error("network error: {0}")]
    Network(String),

    /// (De)serialisation failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic catch-all for errors we don't categorise yet.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PofError {
    pub fn configuration<E: std::fmt::Display>(err: E) -> Self {
        Self::Configuration(err.to_string())
    }

    pub fn invalid_input<E: std::fmt::Display>(err: E) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

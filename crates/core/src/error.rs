//! Data-model error model.

use thiserror::Error;

/// Result type used across the data-model layer.
pub type CoreResult<T> = Result<T, CoreError>;

/// Data-model error.
///
/// Keep this focused on deterministic validation failures of the permission
/// data model. Store, loader and guard failures belong to their own crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A permission key was empty or only whitespace.
    #[error("invalid permission key: {0:?}")]
    InvalidKey(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl CoreError {
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

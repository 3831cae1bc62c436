//! Error types for recall-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the repository, deck and session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl CoreError {
    pub(crate) fn card_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("card {id}"))
    }

    pub(crate) fn deck_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("deck {id}"))
    }
}

//! Engine error taxonomy
//!
//! Flat tagged variants, no hierarchy: not-found and rule violations are
//! caller-correctable and never retried; storage failures are the one
//! retryable kind and are surfaced generically at the boundary without
//! leaking internals.

use shared::RuleViolation;
use thiserror::Error;

use crate::db::StorageError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("game not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Stable error code (wire contract)
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Validation(_) => "invalid_input",
            EngineError::Rule(rule) => rule.code(),
            EngineError::Storage(_) => "storage_error",
        }
    }

    /// Only system failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// constraints, missing references). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. empty name, out-of-range code).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A loosely-typed inbound value could not be turned into the expected type.
    #[error("invalid value for '{field}': {reason}")]
    Uncoercible { field: &'static str, reason: String },

    /// A domain rule was broken by well-typed input.
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn uncoercible(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Uncoercible {
            field,
            reason: reason.into(),
        }
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound(entity)
    }

    /// Whether this error belongs to the malformed-input family.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Uncoercible { .. })
    }
}

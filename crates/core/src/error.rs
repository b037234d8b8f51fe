//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error shared by the matrix crates.
///
/// Engine-specific errors (read-only grants, dependency conflicts, catalog
/// validation) convert into this taxonomy so callers that only care about the
/// broad category can match on a single type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input data failed validation (e.g. a malformed catalog).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced permission, page or module does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requested change conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The target is read-only in the current editing context.
    #[error("read-only: {0}")]
    ReadOnly(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn read_only(msg: impl Into<String>) -> Self {
        Self::ReadOnly(msg.into())
    }

    /// Whether the caller can retry after changing its request.
    ///
    /// Every variant except invariant violations is a request-level problem.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = DomainError::conflict("permission 7 is required by [8]");
        assert_eq!(err.to_string(), "conflict: permission 7 is required by [8]");

        let err = DomainError::not_found("page 'ecn.list'");
        assert!(err.to_string().contains("ecn.list"));
    }

    #[test]
    fn only_invariant_violations_are_unrecoverable() {
        assert!(DomainError::read_only("x").is_recoverable());
        assert!(DomainError::conflict("x").is_recoverable());
        assert!(DomainError::validation("x").is_recoverable());
        assert!(!DomainError::invariant("x").is_recoverable());
    }
}

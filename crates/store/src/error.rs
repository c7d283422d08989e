//! Store error taxonomy.

use thiserror::Error;

/// Errors returned by the remote record store, tagged with the
/// machine-readable codes the backend uses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The targeted record does not exist.
    #[error("record not found")]
    NotFound,

    /// Row-level access policy blocked the call. For verification reads this
    /// does not mean the antecedent write failed.
    #[error("access denied by row-level policy")]
    AccessDenied,

    /// The write was blocked by a constraint (e.g. a foreign reference).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Network/timeout failure; eligible for retry.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl StoreError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound => "not-found",
            StoreError::AccessDenied => "access-denied",
            StoreError::ConstraintViolation(_) => "constraint-violation",
            StoreError::Transient(_) => "transient",
        }
    }

    /// Returns true if the error is eligible for automatic retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// Returns true if the error came from row-level access policy.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, StoreError::AccessDenied)
    }

    /// Returns true if the targeted record was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StoreError::NotFound.code(), "not-found");
        assert_eq!(StoreError::AccessDenied.code(), "access-denied");
        assert_eq!(
            StoreError::ConstraintViolation("fk".into()).code(),
            "constraint-violation"
        );
        assert_eq!(StoreError::Transient("timeout".into()).code(), "transient");
    }

    #[test]
    fn test_classification() {
        assert!(StoreError::Transient("timeout".into()).is_transient());
        assert!(!StoreError::NotFound.is_transient());
        assert!(StoreError::AccessDenied.is_access_denied());
        assert!(StoreError::NotFound.is_not_found());
    }
}

//! Error types for the durable store and the repositories on top of it.

use thiserror::Error;

/// Errors surfaced by store and repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A unique natural key already exists. Resolved by re-read-and-retry,
    /// never shown to the end user.
    #[error("{entity} already exists: {key}")]
    Conflict { entity: &'static str, key: String },

    /// Input rejected before touching the store.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The store worker is gone. Propagated to the caller without retrying;
    /// the process stays up.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("document i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn conflict(entity: &'static str, key: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for store and repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StoreError::not_found("group", "g-1");
        assert_eq!(error.to_string(), "group not found: g-1");
        assert!(error.is_not_found());

        let error = StoreError::conflict("member", "ext-2");
        assert_eq!(error.to_string(), "member already exists: ext-2");
        assert!(error.is_conflict());
        assert!(!error.is_not_found());
    }
}

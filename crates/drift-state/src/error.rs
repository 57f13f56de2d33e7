//! Error types for drift-state operations.

use crate::Selector;
use thiserror::Error;

/// Result type alias for drift-state operations.
pub type DriftResult<T> = Result<T, DriftError>;

/// Errors that can occur during a snapshot transition.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Selector does not resolve to a node in the tree.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The selector that failed to resolve.
        path: Selector,
    },

    /// Collection index is out of bounds.
    #[error("index {index} out of bounds (len: {len}) at {path}")]
    IndexOutOfBounds {
        /// The selector to the collection.
        path: Selector,
        /// The index that was accessed.
        index: usize,
        /// The actual length of the collection.
        len: usize,
    },

    /// A node did not have the shape an operation requires.
    ///
    /// Also raised at commit time when a mutator returns a replacement
    /// whose shape is incompatible with the slot it replaces.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Where the mismatch occurred.
        path: Selector,
        /// The expected shape.
        expected: &'static str,
        /// The shape actually found.
        found: &'static str,
    },

    /// The commit machinery is in an unusable state (e.g. a writer
    /// panicked mid-transition and poisoned the cell).
    #[error("invalid transaction: {message}")]
    InvalidTransaction {
        /// Description of what went wrong.
        message: String,
    },

    /// JSON conversion error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DriftError {
    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Selector) -> Self {
        DriftError::PathNotFound { path }
    }

    /// Create an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(path: Selector, index: usize, len: usize) -> Self {
        DriftError::IndexOutOfBounds { path, index, len }
    }

    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: Selector, expected: &'static str, found: &'static str) -> Self {
        DriftError::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    /// Create an invalid transaction error.
    #[inline]
    pub fn invalid_transaction(message: impl Into<String>) -> Self {
        DriftError::InvalidTransaction {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select;

    #[test]
    fn test_error_display() {
        let err = DriftError::path_not_found(select!("relationships", "budgets", 0));
        assert_eq!(
            err.to_string(),
            "path not found: $.relationships.budgets[0]"
        );
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = DriftError::type_mismatch(select!("attributes"), "record", "collection");
        assert!(err.to_string().contains("expected record"));
        assert!(err.to_string().contains("found collection"));
    }

    #[test]
    fn test_index_out_of_bounds_display() {
        let err = DriftError::index_out_of_bounds(select!("items"), 7, 3);
        assert_eq!(err.to_string(), "index 7 out of bounds (len: 3) at $.items");
    }
}

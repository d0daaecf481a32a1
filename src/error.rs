//! Error types for decayrank.

use thiserror::Error;

/// Errors that can occur while configuring the store, assembling matrices, or
/// ranking candidates.
#[derive(Debug, Error)]
pub enum RecError {
    /// Invalid store configuration (bounds or decay). Raised at construction.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Row or column count disagreement between matrices.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Invalid parameter value (e.g. an id outside its universe).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A single malformed interaction record.
    #[error("invalid interaction record: {0}")]
    InvalidRecord(String),

    /// Configuration or parameter JSON could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecError {
    pub(crate) fn shape(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context,
            expected,
            actual,
        }
    }

    /// True for [`RecError::ShapeMismatch`].
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, RecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_message_names_context() {
        let err = RecError::shape("feature block rows", 3, 2);
        assert!(err.is_shape_mismatch());
        assert_eq!(
            err.to_string(),
            "shape mismatch in feature block rows: expected 3, got 2"
        );
    }
}

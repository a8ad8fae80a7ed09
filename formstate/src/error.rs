//! Error types

/// Result type for form operations.
pub type Result<T> = std::result::Result<T, FormError>;

/// Misuse of the tree shape.
///
/// Raised instead of silently corrupting the tree when an operation does not
/// fit the kind of node it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// A scalar value was assigned to an array-like node.
    #[error("cannot assign a scalar value to incremental field '{path}'")]
    ScalarOnIncremental { path: String },

    /// `add()` was called on a node whose children are not integer keyed.
    #[error("cannot add an entry to non-incremental field '{path}'")]
    AddOnNonIncremental { path: String },

    /// The largest integer key of a collection has no successor.
    #[error("no key left to add an entry to '{path}'")]
    KeyOverflow { path: String },
}

/// Errors raised by form construction and tree operations.
///
/// Validation failures are never reported through this type; they are
/// recorded on the field and read back through `error()` / `has_error()`.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// The tree shape does not allow the operation.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// No field exists at the given path.
    #[error("field '{path}' not found")]
    FieldNotFound { path: String },

    /// A declaration has an unrecognized shape.
    #[error("invalid declaration at '{path}': {reason}")]
    InvalidDeclaration { path: String, reason: String },

    /// JSON input could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormError {
    /// Creates a new field-not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::FieldNotFound { path: path.into() }
    }

    /// Creates a new invalid declaration error.
    pub fn invalid_declaration(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a structural misuse error.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_display() {
        let err: FormError = StructuralError::ScalarOnIncremental {
            path: "items".into(),
        }
        .into();
        assert!(err.is_structural());
        assert_eq!(
            err.to_string(),
            "cannot assign a scalar value to incremental field 'items'"
        );
    }

    #[test]
    fn test_invalid_declaration_display() {
        let err = FormError::invalid_declaration("user.tags", "expected an array of strings");
        assert!(err.to_string().contains("user.tags"));
        assert!(err.to_string().contains("expected an array"));
    }
}

/// Which validation pass produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rule evaluated in-process and surfaced through the sync stack.
    Sync,
    /// Rule resolved by an asynchronous check.
    Async,
}

/// Information about a single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Display name of the field (its label).
    pub field_name: String,
    /// Full path of the field.
    pub path: String,
    /// Error message.
    pub message: String,
    /// Pass that produced the error.
    pub kind: ErrorKind,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Result of validating one or more fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationResult {
    /// All fields passed validation.
    #[default]
    Valid,
    /// One or more fields failed validation.
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    /// Build a result from collected errors
    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }

    /// Check if all fields passed validation.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Check if any field failed validation.
    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// Get all validation errors.
    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    /// Get the first validation error (if any).
    pub fn first_error(&self) -> Option<&FieldError> {
        self.errors().first()
    }

    /// Get the path of the first invalid field (for focusing).
    pub fn first_invalid_path(&self) -> Option<&str> {
        self.first_error().map(|e| e.path.as_str())
    }

    /// Get the error recorded for `path`.
    pub fn error_for(&self, path: &str) -> Option<&FieldError> {
        self.errors().iter().find(|e| e.path == path)
    }
}

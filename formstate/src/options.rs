//! Form configuration

use serde::Deserialize;

/// Behaviour switches for a [`Form`](crate::form::Form).
///
/// # Example
///
/// ```
/// use formstate::options::FormOptions;
///
/// let options = FormOptions::default()
///     .with_validate_on_change(false)
///     .with_show_errors_on_init(true);
/// assert!(!options.validate_on_change);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// Validate every field once the tree is built.
    ///
    /// Default: false
    pub validate_on_init: bool,

    /// Surface errors found by the initial validation.
    ///
    /// Default: false
    pub show_errors_on_init: bool,

    /// Validate a field whenever its value changes.
    ///
    /// Default: true
    pub validate_on_change: bool,

    /// Surface errors found by change-triggered validation.
    ///
    /// Default: true
    pub show_errors_on_change: bool,

    /// Also validate a field's `related` paths when it is validated.
    ///
    /// Default: true
    pub validate_related: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_on_init: false,
            show_errors_on_init: false,
            validate_on_change: true,
            show_errors_on_change: true,
            validate_related: true,
        }
    }
}

impl FormOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validate_on_init(mut self, enabled: bool) -> Self {
        self.validate_on_init = enabled;
        self
    }

    pub fn with_show_errors_on_init(mut self, enabled: bool) -> Self {
        self.show_errors_on_init = enabled;
        self
    }

    pub fn with_validate_on_change(mut self, enabled: bool) -> Self {
        self.validate_on_change = enabled;
        self
    }

    pub fn with_show_errors_on_change(mut self, enabled: bool) -> Self {
        self.show_errors_on_change = enabled;
        self
    }

    pub fn with_validate_related(mut self, enabled: bool) -> Self {
        self.validate_related = enabled;
        self
    }

    /// Options that never validate implicitly.
    pub fn manual() -> Self {
        Self {
            validate_on_init: false,
            show_errors_on_init: false,
            validate_on_change: false,
            show_errors_on_change: false,
            validate_related: false,
        }
    }
}

//! Validation state of a field.
//!
//! Sync and async outcomes are tracked separately. Sync failures pile up on
//! a stack (most recent first) until [`Field::show_errors`] surfaces the
//! head; async outcomes are recorded first and surfaced by
//! [`Field::show_async_errors`].

use std::sync::atomic::Ordering;

use log::debug;

use super::Field;
use crate::state::batch;

/// Latest result of the asynchronous checks of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AsyncOutcome {
    /// No async check has completed since the last reset.
    #[default]
    Unknown,
    Valid,
    Invalid(String),
}

impl AsyncOutcome {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

impl Field {
    /// Push a sync failure on top of the error stack.
    pub fn invalidate(&self, message: impl Into<String>) {
        let message = message.into();
        self.inner.error_stack.update(|stack| stack.insert(0, message));
    }

    /// Replace the whole sync error stack.
    pub fn invalidate_all<I>(&self, messages: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.inner.error_stack.set(messages.into_iter().map(Into::into).collect());
    }

    /// Set the surfaced async error.
    pub fn invalidate_async(&self, message: impl Into<String>) {
        self.inner.error_async.set(Some(message.into()));
    }

    /// Record an async outcome without surfacing it.
    pub fn set_validation_async_data(&self, outcome: AsyncOutcome) {
        self.inner.async_outcome.set(outcome);
    }

    pub fn async_outcome(&self) -> AsyncOutcome {
        self.inner.async_outcome.get()
    }

    /// Forget every validation result and make errors visible again.
    ///
    /// Async checks dispatched before the reset can no longer write back.
    pub fn reset_validation(&self, deep: bool) {
        batch(|| {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            self.inner.show_error.set(true);
            self.inner.error_sync.set(None);
            self.inner.error_async.set(None);
            self.inner.async_outcome.set(AsyncOutcome::Unknown);
            self.inner.error_stack.set(Vec::new());
            if deep {
                for child in self.child_list() {
                    child.reset_validation(true);
                }
            }
        });
    }

    /// `false` hides errors without clearing them. `true` surfaces the most
    /// recent sync failure and empties the stack.
    pub fn show_errors(&self, show: bool) {
        if !show {
            self.inner.show_error.set(false);
            return;
        }
        batch(|| {
            let head = self.inner.error_stack.with(|stack| stack.first().cloned());
            self.inner.error_sync.set(head);
            self.inner.error_stack.set(Vec::new());
            self.inner.show_error.set(true);
        });
    }

    /// Surface the recorded async outcome.
    pub fn show_async_errors(&self) {
        let message = match self.inner.async_outcome.get() {
            AsyncOutcome::Invalid(message) => Some(message),
            _ => None,
        };
        self.inner.error_async.set(message);
    }

    /// Pending sync failures, most recent first
    pub fn error_stack(&self) -> Vec<String> {
        self.inner.error_stack.get()
    }

    pub fn error_sync(&self) -> Option<String> {
        self.inner.error_sync.get()
    }

    pub fn error_async(&self) -> Option<String> {
        self.inner.error_async.get()
    }

    /// The surfaced error, `None` while errors are hidden.
    pub fn error(&self) -> Option<String> {
        if !self.inner.show_error.get() {
            return None;
        }
        self.inner.error_async.get().or_else(|| self.inner.error_sync.get())
    }

    pub fn has_error(&self) -> bool {
        self.inner.async_outcome.with(AsyncOutcome::is_invalid)
            || self.inner.error_stack.with(|stack| !stack.is_empty())
            || self.inner.error_async.with(Option::is_some)
            || self.inner.error_sync.with(Option::is_some)
    }

    pub fn is_valid(&self) -> bool {
        !self.has_error()
    }

    /// Whether async checks are still in flight. Pending is not an error.
    pub fn is_validating(&self) -> bool {
        self.inner.validating.get() > 0
    }

    /// Register an async dispatch and return its generation.
    ///
    /// Only applying dispatches advance the generation, so an observe-only
    /// check never invalidates one that will write back.
    pub(crate) fn begin_async(&self, apply: bool) -> u64 {
        self.inner.validating.update(|n| *n += 1);
        if apply {
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.inner.generation.load(Ordering::SeqCst)
        }
    }

    /// Release a dispatch that will never finish, leaving results untouched.
    pub(crate) fn abandon_async(&self) {
        self.inner.validating.update(|n| *n = n.saturating_sub(1));
    }

    /// Apply the result of an async dispatch unless a newer one superseded it.
    pub(crate) fn finish_async(&self, generation: u64, error: Option<String>, apply: bool) {
        self.inner.validating.update(|n| *n = n.saturating_sub(1));

        let current = self.inner.generation.load(Ordering::SeqCst);
        if generation != current {
            debug!(
                "discarding stale async result for '{}' (generation {} < {})",
                self.path(),
                generation,
                current
            );
            return;
        }
        if !apply {
            return;
        }

        batch(|| match error {
            None => {
                self.set_validation_async_data(AsyncOutcome::Valid);
                self.show_async_errors();
            }
            Some(message) => {
                self.set_validation_async_data(AsyncOutcome::Invalid(message.clone()));
                self.invalidate_async(message);
                self.show_async_errors();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FormContext;
    use crate::overrides::ResolvedOverrides;

    fn field() -> Field {
        Field::new("f", "f", None, ResolvedOverrides::default(), false, FormContext::detached())
    }

    #[test]
    fn test_stack_is_most_recent_first() {
        let field = field();
        field.invalidate("first");
        field.invalidate("second");
        assert_eq!(field.error_stack(), ["second", "first"]);
        assert!(field.has_error());
        assert_eq!(field.error(), None);

        field.show_errors(true);
        assert_eq!(field.error().as_deref(), Some("second"));
        assert!(field.error_stack().is_empty());
    }

    #[test]
    fn test_invalidate_all_replaces_stack() {
        let field = field();
        field.invalidate("old");
        field.invalidate_all(["a", "b"]);
        assert_eq!(field.error_stack(), ["a", "b"]);

        field.show_errors(true);
        assert_eq!(field.error().as_deref(), Some("a"));
        assert!(field.error_stack().is_empty());
    }

    #[test]
    fn test_hidden_errors_still_count() {
        let field = field();
        field.invalidate("bad");
        field.show_errors(true);
        field.show_errors(false);
        assert_eq!(field.error(), None);
        assert!(field.has_error());

        field.reset_validation(false);
        assert!(field.is_valid());
    }

    #[test]
    fn test_async_outcome_surfaces() {
        let field = field();
        field.set_validation_async_data(AsyncOutcome::Invalid("taken".into()));
        assert!(field.has_error());
        assert_eq!(field.error(), None);

        field.show_async_errors();
        assert_eq!(field.error().as_deref(), Some("taken"));

        field.set_validation_async_data(AsyncOutcome::Valid);
        field.show_async_errors();
        assert_eq!(field.error(), None);
        assert!(field.is_valid());
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let field = field();
        let old = field.begin_async(true);
        let new = field.begin_async(true);
        assert!(field.is_validating());

        field.finish_async(old, Some("stale".into()), true);
        assert!(field.is_valid());

        field.finish_async(new, Some("fresh".into()), true);
        assert_eq!(field.error_async().as_deref(), Some("fresh"));
        assert!(!field.is_validating());
    }

    #[test]
    fn test_reset_validation_discards_in_flight() {
        let field = field();
        let generation = field.begin_async(true);
        field.reset_validation(false);
        field.finish_async(generation, Some("late".into()), true);
        assert!(field.is_valid());
    }
}

//! Shared per-form context reachable from every field.

use std::sync::{Arc, OnceLock, Weak};

use crate::field::Field;
use crate::form::FormInner;
use crate::overrides::Overrides;

/// What a field needs from the form that owns it.
///
/// Fields hold this by `Arc`; the form itself is only reachable through a
/// weak link so the tree never keeps its form alive.
pub(crate) struct FormContext {
    overrides: Overrides,
    form: OnceLock<Weak<FormInner>>,
}

impl FormContext {
    pub(crate) fn new(overrides: Overrides) -> Arc<Self> {
        Arc::new(Self {
            overrides,
            form: OnceLock::new(),
        })
    }

    /// Context for fields that don't belong to a form.
    #[cfg(test)]
    pub(crate) fn detached() -> Arc<Self> {
        Self::new(Overrides::default())
    }

    pub(crate) fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub(crate) fn attach(&self, form: &Arc<FormInner>) {
        if self.form.set(Arc::downgrade(form)).is_err() {
            log::warn!("form context is already attached");
        }
    }

    /// Called after a field's own value changed through its setter.
    pub(crate) fn value_changed(&self, field: &Field) {
        if let Some(form) = self.form.get().and_then(Weak::upgrade) {
            form.on_value_changed(field);
        }
    }
}

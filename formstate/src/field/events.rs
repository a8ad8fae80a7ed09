//! Input event adapters.
//!
//! UI layers translate their raw events into [`InputEvent`]s (or pass plain
//! values) and hand them to these handlers.

use serde_json::Value;

use super::Field;
use crate::error::Result;

/// The element an event originated from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTarget {
    pub value: Value,
    /// Checkbox state, when the element has one.
    pub checked: Option<bool>,
}

/// A UI event as seen by the field handlers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputEvent {
    pub target: Option<EventTarget>,
    pub default_prevented: bool,
}

impl InputEvent {
    /// Event from a text-like input
    pub fn input(value: impl Into<Value>) -> Self {
        Self {
            target: Some(EventTarget {
                value: value.into(),
                checked: None,
            }),
            default_prevented: false,
        }
    }

    /// Event from a checkbox
    pub fn checkbox(checked: bool) -> Self {
        Self {
            target: Some(EventTarget {
                value: Value::Bool(checked),
                checked: Some(checked),
            }),
            default_prevented: false,
        }
    }

    /// Event without a target element (e.g. a button click)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

/// What a change handler receives: an event or a raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Event(InputEvent),
    Value(Value),
}

impl From<InputEvent> for Change {
    fn from(event: InputEvent) -> Self {
        Self::Event(event)
    }
}

impl From<Value> for Change {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Change {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for Change {
    fn from(value: String) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for Change {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl Field {
    /// Set the value from a change.
    ///
    /// Boolean fields take the target's `checked` state when it has one,
    /// other fields the target's value. An event without a target changes
    /// nothing.
    pub fn sync(&self, change: impl Into<Change>) -> Result<()> {
        match change.into() {
            Change::Value(value) => self.set_value(value),
            Change::Event(InputEvent { target: None, .. }) => Ok(()),
            Change::Event(InputEvent {
                target: Some(target),
                ..
            }) => {
                let boolean = self.inner.value.with(Value::is_boolean);
                match target.checked {
                    Some(checked) if boolean => self.set_value(checked),
                    _ => self.set_value(target.value),
                }
            }
        }
    }

    pub fn on_change(&self, change: impl Into<Change>) -> Result<()> {
        self.sync(change)
    }

    pub fn on_toggle(&self, change: impl Into<Change>) -> Result<()> {
        self.sync(change)
    }

    /// Focus the field; it stays touched afterwards.
    pub fn on_focus(&self) {
        crate::state::batch(|| {
            self.inner.focused.replace_if_changed(true);
            self.inner.touched.replace_if_changed(true);
        });
    }

    pub fn on_blur(&self) {
        self.inner.focused.replace_if_changed(false);
    }

    pub fn on_clear(&self, event: &mut InputEvent) {
        event.prevent_default();
        self.clear(true);
    }

    pub fn on_reset(&self, event: &mut InputEvent) {
        event.prevent_default();
        self.reset(true);
    }

    pub fn on_add(&self, event: &mut InputEvent, path: Option<&str>) -> Result<String> {
        event.prevent_default();
        self.add(path)
    }

    pub fn on_del(&self, event: &mut InputEvent, key: &str) -> Option<Field> {
        event.prevent_default();
        self.del(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FormContext;
    use crate::declaration::Declaration;
    use crate::overrides::ResolvedOverrides;
    use serde_json::json;

    fn field(value: Value) -> Field {
        let decl = Declaration::Scalar(value);
        Field::new("f", "f", Some(&decl), ResolvedOverrides::default(), false, FormContext::detached())
    }

    #[test]
    fn test_checkbox_uses_checked() {
        let field = field(json!(false));
        field.on_toggle(InputEvent::checkbox(true)).unwrap();
        assert_eq!(field.value(), json!(true));
    }

    #[test]
    fn test_text_uses_target_value() {
        let field = field(json!(""));
        let mut event = InputEvent::input("hello");
        event.target.as_mut().unwrap().checked = Some(true);
        field.on_change(event).unwrap();
        assert_eq!(field.value(), json!("hello"));

        field.on_change("raw").unwrap();
        assert_eq!(field.value(), json!("raw"));

        field.on_change(InputEvent::empty()).unwrap();
        assert_eq!(field.value(), json!("raw"));
    }

    #[test]
    fn test_focus_is_sticky() {
        let field = field(json!(""));
        assert!(!field.is_touched());
        field.on_focus();
        field.on_blur();
        assert!(!field.is_focused());
        assert!(field.is_touched());
    }

    #[test]
    fn test_on_clear_prevents_default() {
        let field = field(json!("x"));
        let mut event = InputEvent::empty();
        field.on_clear(&mut event);
        assert!(event.default_prevented);
        assert_eq!(field.value(), json!(""));
    }
}

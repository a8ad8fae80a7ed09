//! Form fields.
//!
//! A [`Field`] is one node of the form tree. It owns reactive cells for its
//! value, interaction state and validation state, plus an ordered collection
//! of child fields. Every cell of a field notifies the field's signal, and
//! every child's signal is forwarded to its parent, so subscribing to a
//! field observes its whole subtree.

mod collection;
pub mod events;
mod validation;

pub use collection::Fields;
pub use events::{Change, EventTarget, InputEvent};
pub use validation::AsyncOutcome;

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::builder::FieldTreeBuilder;
use crate::context::FormContext;
use crate::declaration::{Declaration, join};
use crate::error::{FormError, Result, StructuralError};
use crate::overrides::ResolvedOverrides;
use crate::state::{Computed, Signal, State, Subscription, batch};
use crate::validation::RuleSpec;
use crate::value;

/// Handle to a field of a form tree.
///
/// Cloning is cheap; clones refer to the same field.
#[derive(Clone)]
pub struct Field {
    inner: Arc<FieldInner>,
}

pub(crate) struct FieldInner {
    key: String,
    path: String,
    name: String,

    initial: State<Value>,
    default: State<Value>,
    explicit_default: bool,
    value: State<Value>,
    label: State<String>,
    disabled: State<bool>,
    related: Vec<String>,
    rules: Option<RuleSpec>,
    validate: Option<Value>,

    focused: State<bool>,
    touched: State<bool>,
    show_error: State<bool>,

    error_sync: State<Option<String>>,
    error_async: State<Option<String>>,
    error_stack: State<Vec<String>>,
    async_outcome: State<AsyncOutcome>,
    validating: State<usize>,
    generation: AtomicU64,

    fields: State<Fields>,
    parent_link: Mutex<Option<Subscription>>,
    signal: Signal,
    context: Arc<FormContext>,
}

impl Field {
    /// Build a field from its declaration and the overrides for its path.
    ///
    /// Override properties win over declared ones. With `update`, the
    /// default is forced to `""`.
    pub(crate) fn new(
        key: &str,
        path: &str,
        decl: Option<&Declaration>,
        props: ResolvedOverrides,
        update: bool,
        context: Arc<FormContext>,
    ) -> Self {
        let composite = match decl {
            Some(Declaration::Composite(decl)) => Some(decl),
            _ => None,
        };
        let declared_value = match decl {
            Some(Declaration::Scalar(value)) => Some(value.clone()),
            Some(Declaration::Composite(decl)) => decl.value.clone(),
            None => None,
        };

        let initial = parse_initial(declared_value, props.value);
        let declared_default = composite.and_then(|decl| decl.default.clone());
        let explicit_default = update || props.default.is_some() || declared_default.is_some();
        let default = if update {
            Value::String(String::new())
        } else {
            props
                .default
                .or(declared_default)
                .filter(|v| !v.is_null())
                .unwrap_or_else(|| initial.clone())
        };

        let name = composite
            .and_then(|decl| decl.name.clone())
            .unwrap_or_else(|| key.to_string());
        let label = props
            .label
            .or_else(|| composite.and_then(|decl| decl.label.clone()))
            .unwrap_or_else(|| name.clone());
        let disabled = props.disabled.unwrap_or(false)
            || composite.and_then(|decl| decl.disabled).unwrap_or(false);

        let signal = Signal::new();
        let cell = |value| State::with_signal(value, signal.clone());

        let inner = FieldInner {
            key: key.to_string(),
            path: path.to_string(),
            name,
            value: cell(initial.clone()),
            initial: cell(initial),
            default: cell(default),
            explicit_default,
            label: State::with_signal(label, signal.clone()),
            disabled: State::with_signal(disabled, signal.clone()),
            related: props
                .related
                .or_else(|| composite.and_then(|decl| decl.related.clone()))
                .unwrap_or_default(),
            rules: props
                .rules
                .or_else(|| composite.and_then(|decl| decl.rules.clone())),
            validate: props
                .validate
                .or_else(|| composite.and_then(|decl| decl.validate.clone())),
            focused: State::with_signal(false, signal.clone()),
            touched: State::with_signal(false, signal.clone()),
            show_error: State::with_signal(true, signal.clone()),
            error_sync: State::with_signal(None, signal.clone()),
            error_async: State::with_signal(None, signal.clone()),
            error_stack: State::with_signal(Vec::new(), signal.clone()),
            async_outcome: State::with_signal(AsyncOutcome::Unknown, signal.clone()),
            validating: State::with_signal(0, signal.clone()),
            generation: AtomicU64::new(0),
            fields: State::with_signal(Fields::new(), signal.clone()),
            parent_link: Mutex::new(None),
            signal,
            context,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// The unnamed field at the top of a form tree.
    pub(crate) fn root(context: Arc<FormContext>) -> Self {
        Self::new("", "", None, ResolvedOverrides::default(), false, context)
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Local key under the parent
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Dot-delimited path from the root
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Logical name (defaults to the key)
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // ------------------------------------------------------------------
    // Value
    // ------------------------------------------------------------------

    /// Current value.
    ///
    /// An incremental field has no value of its own; it reports its
    /// children's values ordered by key.
    pub fn value(&self) -> Value {
        let fields = self.inner.fields.get();
        if fields.is_incremental() {
            return Value::Array(fields.ordered_by_key().iter().map(Field::value).collect());
        }
        self.inner.value.get()
    }

    /// Nested value of the whole subtree.
    ///
    /// Incremental fields become arrays, fields with named children become
    /// objects, leaves report their value.
    pub fn values(&self) -> Value {
        let fields = self.inner.fields.get();
        if fields.is_empty() {
            return self.inner.value.get();
        }
        if fields.is_incremental() {
            return Value::Array(fields.ordered_by_key().iter().map(Field::values).collect());
        }
        let map: Map<String, Value> = fields
            .iter()
            .map(|(key, field)| (key.to_string(), field.values()))
            .collect();
        Value::Object(map)
    }

    /// Assign a new value.
    ///
    /// Fails on incremental fields. When the initial value is numeric, the
    /// input is coerced to a number if it has a finite numeric reading.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        if self.is_incremental() {
            return Err(StructuralError::ScalarOnIncremental {
                path: self.path().to_string(),
            }
            .into());
        }
        if self.assign(value.into()) {
            self.inner.context.value_changed(self);
        }
        Ok(())
    }

    /// Write the own value without triggering change validation.
    fn assign(&self, value: Value) -> bool {
        let current = self.inner.value.get();
        if value::loose_eq(&current, &value) {
            return false;
        }
        let value = match self.inner.initial.get() {
            Value::Number(_) => value::to_number(&value).map(Value::Number).unwrap_or(value),
            _ => value,
        };
        self.inner.value.replace_if_changed(value)
    }

    pub fn initial(&self) -> Value {
        self.inner.initial.get()
    }

    pub fn default(&self) -> Value {
        self.inner.default.get()
    }

    /// Record the aggregated value of an incremental field as its starting
    /// point, unless a value was declared for it.
    pub(crate) fn capture_initial(&self) {
        if !self.is_incremental() || !value::is_blank(&self.inner.initial.get()) {
            return;
        }
        let aggregated = self.value();
        batch(|| {
            self.inner.initial.set(aggregated.clone());
            if !self.inner.explicit_default {
                self.inner.default.set(aggregated);
            }
        });
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn label(&self) -> String {
        self.inner.label.get()
    }

    pub fn set_label(&self, label: impl Into<String>) {
        self.inner.label.replace_if_changed(label.into());
    }

    pub fn disabled(&self) -> bool {
        self.inner.disabled.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.inner.disabled.replace_if_changed(disabled);
    }

    /// Paths validated together with this field
    pub fn related(&self) -> &[String] {
        &self.inner.related
    }

    pub fn rules(&self) -> Option<&RuleSpec> {
        self.inner.rules.as_ref()
    }

    /// Custom validator payload, passed through untouched
    pub fn validate(&self) -> Option<&Value> {
        self.inner.validate.as_ref()
    }

    pub fn is_focused(&self) -> bool {
        self.inner.focused.get()
    }

    /// True once the field has been focused
    pub fn is_touched(&self) -> bool {
        self.inner.touched.get()
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        !value::loose_eq(&self.inner.default.get(), &self.value())
    }

    pub fn is_pristine(&self) -> bool {
        !self.is_dirty()
    }

    pub fn is_default(&self) -> bool {
        self.is_pristine()
    }

    /// Numbers are never empty, booleans are empty when false, anything
    /// else when structurally empty.
    pub fn is_empty(&self) -> bool {
        match self.inner.value.get() {
            Value::Number(_) => false,
            Value::Bool(b) => !b,
            other => value::is_blank(&other),
        }
    }

    /// Has children, all integer keyed
    pub fn is_incremental(&self) -> bool {
        self.inner.fields.with(Fields::is_incremental)
    }

    // ------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------

    /// Snapshot of the children
    pub fn fields(&self) -> Fields {
        self.inner.fields.get()
    }

    pub fn has_child(&self, key: &str) -> bool {
        self.inner.fields.with(|fields| fields.contains(key))
    }

    /// Find a descendant by relative dotted path. The empty path is the
    /// field itself.
    pub fn select(&self, path: &str) -> Option<Field> {
        let mut current = self.clone();
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let next = current.inner.fields.with(|fields| fields.get(segment).cloned())?;
            current = next;
        }
        Some(current)
    }

    /// Visit every descendant depth-first, parents before children.
    pub fn each(&self, mut visitor: impl FnMut(&Field)) {
        self.walk(&mut visitor);
    }

    fn walk(&self, visitor: &mut dyn FnMut(&Field)) {
        for child in self.child_list() {
            visitor(&child);
            child.walk(visitor);
        }
    }

    fn child_list(&self) -> Vec<Field> {
        self.inner
            .fields
            .with(|fields| fields.iter().map(|(_, field)| field.clone()).collect())
    }

    /// Append an entry to an incremental collection.
    ///
    /// With a path, the entry is added to the descendant at that path.
    /// Returns the new key.
    pub fn add(&self, path: Option<&str>) -> Result<String> {
        if let Some(path) = path {
            let target = self.select(path).ok_or_else(|| FormError::not_found(join(self.path(), path)))?;
            return target.add(None);
        }

        let (has_children, incremental, key) = self
            .inner
            .fields
            .with(|fields| (!fields.is_empty(), fields.is_incremental(), fields.next_key()));
        if has_children && !incremental {
            return Err(StructuralError::AddOnNonIncremental {
                path: self.path().to_string(),
            }
            .into());
        }

        let Some(key) = key else {
            return Err(StructuralError::KeyOverflow {
                path: self.path().to_string(),
            }
            .into());
        };

        log::debug!("adding '{}' to '{}'", key, self.path());
        FieldTreeBuilder::new(self.context()).init_field(self, &key, None, false);
        Ok(key)
    }

    /// Remove the child at `key`. Removing a missing key does nothing.
    pub fn del(&self, key: &str) -> Option<Field> {
        let mut removed = None;
        batch(|| {
            self.inner.fields.update(|fields| removed = fields.remove(key));
        });
        if let Some(child) = &removed {
            child.unlink();
            log::debug!("removed '{}'", child.path());
        }
        removed
    }

    /// Insert a freshly built child and forward its changes here.
    pub(crate) fn attach_child(&self, child: Field) {
        batch(|| {
            let link = child.inner.signal.forward_to(&self.inner.signal);
            if let Ok(mut guard) = child.inner.parent_link.lock() {
                *guard = Some(link);
            }
            self.inner
                .fields
                .update(|fields| fields.insert(child.key().to_string(), child));
        });
    }

    fn unlink(&self) {
        if let Ok(mut guard) = self.inner.parent_link.lock() {
            guard.take();
        }
    }

    // ------------------------------------------------------------------
    // Reset / clear
    // ------------------------------------------------------------------

    /// Restore the default (or the initial value when they are equal).
    pub fn reset(&self, deep: bool) {
        batch(|| {
            if !self.is_incremental() {
                let default = self.inner.default.get();
                let initial = self.inner.initial.get();
                self.assign(if value::loose_eq(&default, &initial) { initial } else { default });
            }
            if deep {
                for child in self.child_list() {
                    child.reset(true);
                }
            }
        });
    }

    /// Reset validation and zero the value for its type.
    ///
    /// Null and object values are left as they are.
    pub fn clear(&self, deep: bool) {
        batch(|| {
            self.reset_validation(false);
            if let Some(zero) = value::zero_of(&self.inner.value.get()) {
                self.inner.value.replace_if_changed(zero);
            }
            if deep {
                for child in self.child_list() {
                    child.clear(true);
                }
            }
        });
    }

    // ------------------------------------------------------------------
    // Reactive bindings
    // ------------------------------------------------------------------

    /// Listen to changes of this field or any descendant.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.signal.subscribe(listener)
    }

    /// Derive a value from this field, recomputed on every change.
    pub fn computed<T, F>(&self, f: F) -> Computed<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&Field) -> T + Send + Sync + 'static,
    {
        let field = self.clone();
        Computed::new(&self.inner.signal, move || f(&field))
    }

    pub fn signal(&self) -> &Signal {
        &self.inner.signal
    }

    pub(crate) fn context(&self) -> &Arc<FormContext> {
        &self.inner.context
    }

    /// Whether both handles refer to the same field
    pub fn ptr_eq(&self, other: &Field) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Override value wins when present; `0` is a legitimate value, null is not.
fn parse_initial(declared: Option<Value>, separated: Option<Value>) -> Value {
    separated
        .filter(|v| !v.is_null())
        .or(declared)
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| Value::String(String::new()))
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("path", &self.inner.path)
            .field("value", &self.value())
            .field("fields", &self.inner.fields.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::FieldDecl;
    use serde_json::json;

    fn leaf(decl: Declaration) -> Field {
        Field::new("f", "f", Some(&decl), ResolvedOverrides::default(), false, FormContext::detached())
    }

    #[test]
    fn test_initial_from_declaration_and_overrides() {
        let field = leaf(Declaration::scalar("x"));
        assert_eq!(field.value(), json!("x"));
        assert_eq!(field.default(), json!("x"));
        assert_eq!(field.label(), "f");

        let props = ResolvedOverrides {
            value: Some(json!(0)),
            label: Some("Override".into()),
            ..Default::default()
        };
        let decl = Declaration::from(FieldDecl::new().with_value(5).with_label("Declared"));
        let field = Field::new("f", "f", Some(&decl), props, false, FormContext::detached());
        assert_eq!(field.value(), json!(0));
        assert_eq!(field.label(), "Override");
    }

    #[test]
    fn test_missing_declaration_is_empty_string() {
        let field = Field::new("f", "f", None, ResolvedOverrides::default(), false, FormContext::detached());
        assert_eq!(field.value(), json!(""));
        assert!(field.is_empty());
        assert!(field.is_pristine());
    }

    #[test]
    fn test_update_forces_empty_default() {
        let decl = Declaration::from(FieldDecl::new().with_value("a").with_default("b"));
        let field = Field::new("f", "f", Some(&decl), ResolvedOverrides::default(), true, FormContext::detached());
        assert_eq!(field.value(), json!("a"));
        assert_eq!(field.default(), json!(""));
    }

    #[test]
    fn test_numeric_coercion() {
        let field = leaf(Declaration::scalar(0));
        field.set_value("7").unwrap();
        assert_eq!(field.value(), json!(7));
        field.set_value("abc").unwrap();
        assert_eq!(field.value(), json!("abc"));
        field.set_value(" 0x1f ").unwrap();
        assert_eq!(field.value(), json!(31));
    }

    #[test]
    fn test_is_empty_by_type() {
        assert!(!leaf(Declaration::scalar(0)).is_empty());
        assert!(leaf(Declaration::scalar(false)).is_empty());
        assert!(!leaf(Declaration::scalar(true)).is_empty());
        assert!(leaf(Declaration::scalar(json!([]))).is_empty());
    }

    #[test]
    fn test_select_and_each() {
        let root = Field::root(FormContext::detached());
        FieldTreeBuilder::new(root.context()).init_fields(
            &root,
            &Declaration::map_from_json(&json!({ "user": { "fields": { "name": "x" } } }), "").unwrap(),
            false,
        );

        assert_eq!(root.select("user.name").map(|f| f.value()), Some(json!("x")));
        assert!(root.select("user.age").is_none());
        assert!(root.select("").is_some_and(|f| f.ptr_eq(&root)));

        let mut paths = Vec::new();
        root.each(|f| paths.push(f.path().to_string()));
        assert_eq!(paths, ["user", "user.name"]);
    }
}

//! The form: root of a field tree plus its validation wiring.

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;

use crate::builder::FieldTreeBuilder;
use crate::context::FormContext;
use crate::declaration::{Declaration, Declarations};
use crate::error::{FormError, Result};
use crate::field::Field;
use crate::options::FormOptions;
use crate::overrides::Overrides;
use crate::state::{Computed, Subscription, batch};
use crate::validation::{
    AsyncRuleFn, AsyncRuleInput, BoxFuture, ErrorKind, FieldError, Orchestrator, RuleEngine, Rules,
    ValidationResult,
};

/// A form: a tree of fields validated by one orchestrator.
///
/// # Example
///
/// ```
/// use formstate::prelude::*;
///
/// let form = Form::builder()
///     .with_field("username", FieldDecl::new().with_value("").with_rules("required|min:3"))
///     .with_field("age", FieldDecl::new().with_value(0).with_rules("numeric"))
///     .build();
///
/// form.set_value("username", "ab").unwrap();
/// assert_eq!(
///     form.select("username").and_then(|f| f.error()).as_deref(),
///     Some("The username must be at least 3 characters.")
/// );
///
/// form.set_value("age", "7").unwrap();
/// assert_eq!(form.values()["age"], 7);
/// ```
#[derive(Clone)]
pub struct Form {
    inner: Arc<FormInner>,
}

pub(crate) struct FormInner {
    root: Field,
    orchestrator: Orchestrator,
    options: FormOptions,
}

impl FormInner {
    /// Change hook for values assigned through a field's setter.
    pub(crate) fn on_value_changed(&self, field: &Field) {
        if !self.options.validate_on_change {
            return;
        }
        debug!("'{}' changed, validating", field.path());
        self.run_validation(field, self.options.show_errors_on_change);
    }

    /// Validate `field` and, when enabled, the fields it names as related.
    fn run_validation(&self, field: &Field, show: bool) {
        self.validate_one(field, show);

        if !self.options.validate_related {
            return;
        }
        for path in field.related() {
            match self.root.select(path) {
                Some(related) if !related.ptr_eq(field) => self.validate_one(&related, show),
                Some(_) => {}
                None => warn!("'{}' names unknown related field '{}'", field.path(), path),
            }
        }
    }

    fn validate_one(&self, field: &Field, show: bool) {
        batch(|| {
            field.reset_validation(false);
            self.orchestrator.validate_field(field, &self.root, true);
            if show {
                field.show_errors(true);
            }
        });
    }

    fn all_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        self.root.each(|field| fields.push(field.clone()));
        fields
    }
}

impl Form {
    pub fn builder() -> FormBuilder {
        FormBuilder::new()
    }

    /// The unnamed root field
    pub fn root(&self) -> &Field {
        &self.inner.root
    }

    pub fn options(&self) -> &FormOptions {
        &self.inner.options
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    /// Field at a dotted path
    pub fn select(&self, path: &str) -> Option<Field> {
        self.inner.root.select(path)
    }

    /// Field at a dotted path, or [`FormError::FieldNotFound`]
    pub fn field(&self, path: &str) -> Result<Field> {
        self.select(path).ok_or_else(|| FormError::not_found(path))
    }

    /// Visit every field depth-first
    pub fn each(&self, visitor: impl FnMut(&Field)) {
        self.inner.root.each(visitor);
    }

    /// Nested values of the whole form
    pub fn values(&self) -> Value {
        self.inner.root.values()
    }

    pub fn has_error(&self) -> bool {
        self.any(Field::has_error)
    }

    pub fn is_valid(&self) -> bool {
        !self.has_error()
    }

    pub fn is_dirty(&self) -> bool {
        self.any(Field::is_dirty)
    }

    pub fn is_pristine(&self) -> bool {
        !self.is_dirty()
    }

    /// Whether every leaf field is empty
    pub fn is_empty(&self) -> bool {
        !self.any(|field| field.fields().is_empty() && !field.is_empty())
    }

    /// Whether any async check is still running
    pub fn is_validating(&self) -> bool {
        self.any(Field::is_validating)
    }

    fn any(&self, predicate: impl Fn(&Field) -> bool) -> bool {
        self.inner.all_fields().iter().any(predicate)
    }

    /// Assign the value of the field at `path`.
    pub fn set_value(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.field(path)?.set_value(value)
    }

    /// Validate one field (and its related fields) and surface the result.
    ///
    /// Async rules are dispatched but not awaited. Returns whether the field
    /// passed its sync rules.
    pub fn validate_field(&self, path: &str) -> Result<bool> {
        let field = self.field(path)?;
        self.inner.run_validation(&field, true);
        Ok(field.error_sync().is_none())
    }

    /// Validate every field, wait for async checks and surface all errors.
    pub async fn validate(&self) -> ValidationResult {
        let fields = self.inner.all_fields();
        for field in &fields {
            field.reset_validation(false);
            self.inner.orchestrator.validate_field(field, &self.inner.root, true);
        }

        self.settle().await;

        let mut errors = Vec::new();
        for field in &fields {
            field.show_errors(true);
            let error = match (field.error_async(), field.error_sync()) {
                (Some(message), _) => Some((message, ErrorKind::Async)),
                (None, Some(message)) => Some((message, ErrorKind::Sync)),
                (None, None) => None,
            };
            if let Some((message, kind)) = error {
                errors.push(FieldError {
                    field_name: field.label(),
                    path: field.path().to_string(),
                    message,
                    kind,
                });
            }
        }

        debug!("form validated with {} errors", errors.len());
        ValidationResult::from_errors(errors)
    }

    /// Wait until every dispatched async check has completed.
    pub async fn settle(&self) {
        self.inner.orchestrator.settle().await;
    }

    /// Show or hide the errors of every field.
    pub fn show_errors(&self, show: bool) {
        batch(|| self.each(|field| field.show_errors(show)));
    }

    /// Restore every field to its default.
    pub fn reset(&self) {
        self.inner.root.reset(true);
    }

    /// Zero every field and forget validation results.
    pub fn clear(&self) {
        self.inner.root.clear(true);
    }

    /// Add fields declared in `decls` that don't exist yet.
    ///
    /// New fields get an empty default.
    pub fn update(&self, decls: &Declarations) {
        FieldTreeBuilder::new(self.inner.root.context()).init_fields(&self.inner.root, decls, true);
    }

    /// Register an asynchronous rule.
    pub fn register_async_rule<F, Fut>(&self, name: &str, message: &str, rule: F)
    where
        F: Fn(AsyncRuleInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.inner.orchestrator.register_async_rule(name, message, rule);
    }

    /// Listen to every change in the form.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.root.subscribe(listener)
    }

    /// Derive a value from the form, recomputed on every change.
    pub fn computed<T, F>(&self, f: F) -> Computed<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&Form) -> T + Send + Sync + 'static,
    {
        let form = self.clone();
        Computed::new(self.inner.root.signal(), move || f(&form))
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("values", &self.values())
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Builder for [`Form`].
#[derive(Default)]
pub struct FormBuilder {
    fields: Declarations,
    overrides: Overrides,
    options: FormOptions,
    engine: Option<Arc<dyn RuleEngine>>,
    async_rules: Vec<(String, String, AsyncRuleFn)>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add top-level declarations
    pub fn with_fields(mut self, fields: Declarations) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Add one top-level declaration
    pub fn with_field(mut self, key: impl Into<String>, decl: impl Into<Declaration>) -> Self {
        self.fields.insert(key.into(), decl.into());
        self
    }

    /// Add top-level declarations from a JSON object
    pub fn with_declaration(self, json: &Value) -> Result<Self> {
        let fields = Declaration::map_from_json(json, "")?;
        Ok(self.with_fields(fields))
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a custom rule engine instead of [`Rules`]
    pub fn with_engine(mut self, engine: Arc<dyn RuleEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Register an asynchronous rule before the tree is built, so
    /// validation on init already sees it.
    pub fn with_async_rule<F, Fut>(mut self, name: &str, message: &str, rule: F) -> Self
    where
        F: Fn(AsyncRuleInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let rule: AsyncRuleFn =
            Arc::new(move |input: AsyncRuleInput| -> BoxFuture<'static, bool> { Box::pin(rule(input)) });
        self.async_rules.push((name.to_string(), message.to_string(), rule));
        self
    }

    pub fn build(self) -> Form {
        let context = FormContext::new(self.overrides);
        let engine = self.engine.unwrap_or_else(|| Arc::new(Rules::new()));
        let orchestrator = Orchestrator::new(engine);
        for (name, message, rule) in self.async_rules {
            orchestrator.register_async_rule_fn(&name, &message, rule);
        }

        let inner = Arc::new(FormInner {
            root: Field::root(Arc::clone(&context)),
            orchestrator,
            options: self.options,
        });
        context.attach(&inner);
        FieldTreeBuilder::new(&context).init_fields(&inner.root, &self.fields, false);
        debug!("built form with {} top-level fields", self.fields.len());

        if inner.options.validate_on_init {
            for field in inner.all_fields() {
                inner.validate_one(&field, inner.options.show_errors_on_init);
            }
        }

        Form { inner }
    }
}

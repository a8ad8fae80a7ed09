//! Contract between the orchestrator and a rule engine.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::rules::Rule;

/// Type alias for boxed futures used in async validation.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Flat snapshot of every field's value, keyed by path.
pub type DataMap = HashMap<String, Value>;

/// Predicate behind an asynchronous rule.
pub type AsyncRuleFn = Arc<dyn Fn(AsyncRuleInput) -> BoxFuture<'static, bool> + Send + Sync>;

/// What an asynchronous rule gets to look at.
#[derive(Debug, Clone)]
pub struct AsyncRuleInput {
    /// Value of the field under validation.
    pub value: Value,
    /// Rule arguments (`unique:users` → `["users"]`).
    pub args: Vec<String>,
    /// Path of the field under validation.
    pub path: String,
    /// Snapshot of the whole form.
    pub data: Arc<DataMap>,
}

/// A validation request: data snapshot plus per-path rule bindings.
#[derive(Debug, Clone, Default)]
pub struct Check {
    pub data: Arc<DataMap>,
    pub rules: IndexMap<String, Vec<Rule>>,
    pub attributes: HashMap<String, String>,
}

impl Check {
    pub fn new(data: Arc<DataMap>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Bind rules to a path
    pub fn with_rules(mut self, path: impl Into<String>, rules: Vec<Rule>) -> Self {
        self.rules.insert(path.into(), rules);
        self
    }

    /// Set the display name used for `path` in messages
    pub fn with_attribute(mut self, path: impl Into<String>, name: impl Into<String>) -> Self {
        self.attributes.insert(path.into(), name.into());
        self
    }

    /// Display name for `path`, falling back to the path itself
    pub fn attribute<'a>(&'a self, path: &'a str) -> &'a str {
        self.attributes.get(path).map(String::as_str).unwrap_or(path)
    }

    /// Value at `path` in the snapshot (null when absent)
    pub fn value(&self, path: &str) -> &Value {
        self.data.get(path).unwrap_or(&Value::Null)
    }
}

/// Messages produced by a check, grouped by path in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBag {
    messages: IndexMap<String, Vec<String>>,
}

impl ErrorBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `path`
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.messages
            .entry(path.into())
            .or_default()
            .push(message.into());
    }

    /// First message for `path`
    pub fn first(&self, path: &str) -> Option<&str> {
        self.messages
            .get(path)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// All messages for `path`
    pub fn get(&self, path: &str) -> &[String] {
        self.messages.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when nothing failed
    pub fn passes(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn fails(&self) -> bool {
        !self.passes()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.messages.iter()
    }
}

/// A rule engine the orchestrator can drive.
///
/// The built-in implementation is [`Rules`](super::Rules); anything that can
/// check a snapshot against per-path rules can stand in for it.
pub trait RuleEngine: Send + Sync {
    /// Run synchronous rules.
    fn check(&self, check: &Check) -> ErrorBag;

    /// Run the bound rules, awaiting asynchronous ones.
    fn check_async(&self, check: Check) -> BoxFuture<'static, ErrorBag>;

    /// Register `name` as an asynchronous rule.
    fn register_async(&self, name: &str, message: &str, rule: AsyncRuleFn);
}

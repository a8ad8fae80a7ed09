//! Built-in rule engine.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use log::{trace, warn};
use serde_json::Value;

use super::engine::{AsyncRuleFn, AsyncRuleInput, BoxFuture, Check, DataMap, ErrorBag, RuleEngine};
use super::rules::Rule;
use crate::value;

/// What a synchronous rule gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Value under validation.
    pub value: &'a Value,
    /// Rule arguments.
    pub args: &'a [String],
    /// Snapshot of the whole form.
    pub data: &'a DataMap,
    /// Whether the field also declares `numeric` or `integer`.
    pub numeric: bool,
}

/// Type alias for sync validation rule closures.
type SyncRule = Arc<dyn Fn(&RuleContext<'_>) -> bool + Send + Sync>;

struct CustomRule {
    check: SyncRule,
    message: String,
    implicit: bool,
}

#[derive(Clone)]
struct AsyncEntry {
    check: AsyncRuleFn,
    message: String,
}

/// Rule engine with a validatorjs-style vocabulary.
///
/// Messages use `:attribute` for the field's display name and the rule's
/// parameter names (`:min`, `:max`, `:size`, ...) for its arguments.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use formstate::validation::{Check, DataMap, Rule, RuleEngine, Rules};
/// use serde_json::json;
///
/// let data: DataMap = [("username".to_string(), json!("ab"))].into_iter().collect();
/// let check = Check::new(Arc::new(data))
///     .with_rules("username", vec![Rule::new("required", &[]), Rule::new("min", &["3"])])
///     .with_attribute("username", "username");
///
/// let errors = Rules::new().check(&check);
/// assert_eq!(errors.first("username"), Some("The username must be at least 3 characters."));
/// ```
#[derive(Default)]
pub struct Rules {
    custom: RwLock<HashMap<String, CustomRule>>,
    async_rules: RwLock<HashMap<String, AsyncEntry>>,
}

impl Rules {
    /// Create an engine with only the built-in rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a custom synchronous rule.
    ///
    /// Like the built-ins (except `required`/`accepted`), it is skipped when
    /// the value is empty.
    pub fn register<F>(&self, name: impl Into<String>, message: impl Into<String>, f: F)
    where
        F: Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.insert_custom(name.into(), message.into(), Arc::new(f), false);
    }

    /// Add a custom synchronous rule that also runs on empty values.
    pub fn register_implicit<F>(&self, name: impl Into<String>, message: impl Into<String>, f: F)
    where
        F: Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.insert_custom(name.into(), message.into(), Arc::new(f), true);
    }

    /// Add an asynchronous rule from a closure.
    pub fn register_async_fn<F, Fut>(&self, name: &str, message: &str, f: F)
    where
        F: Fn(AsyncRuleInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let rule: AsyncRuleFn =
            Arc::new(move |input: AsyncRuleInput| -> BoxFuture<'static, bool> { Box::pin(f(input)) });
        self.register_async(name, message, rule);
    }

    /// Whether `name` is a registered asynchronous rule
    pub fn is_async(&self, name: &str) -> bool {
        self.async_rules
            .read()
            .map(|guard| guard.contains_key(name))
            .unwrap_or(false)
    }

    fn insert_custom(&self, name: String, message: String, check: SyncRule, implicit: bool) {
        if let Ok(mut guard) = self.custom.write() {
            guard.insert(
                name,
                CustomRule {
                    check,
                    message,
                    implicit,
                },
            );
        }
    }

    /// Run one synchronous rule. `None` means it passed or doesn't apply.
    fn evaluate(&self, rule: &Rule, ctx: &RuleContext<'_>, check: &Check, path: &str) -> Option<String> {
        if let Ok(custom) = self.custom.read()
            && let Some(custom) = custom.get(&rule.name)
        {
            if !custom.implicit && !is_present(ctx.value) {
                return None;
            }
            return (!(custom.check)(ctx)).then(|| format_message(&custom.message, rule, check, path));
        }

        if !is_implicit(&rule.name) && !is_present(ctx.value) {
            return None;
        }

        match builtin(rule, ctx) {
            Some(Ok(())) => None,
            Some(Err(template)) => Some(format_message(&template, rule, check, path)),
            None => {
                warn!("unknown validation rule '{}' on '{}'", rule.name, path);
                None
            }
        }
    }

    fn check_sync_part(&self, check: &Check, errors: &mut ErrorBag) {
        for (path, rules) in &check.rules {
            let numeric = declares_numeric(rules);
            let ctx_value = check.value(path);
            for rule in rules {
                if self.is_async(&rule.name) {
                    trace!("skipping async rule '{}' in sync check", rule.name);
                    continue;
                }
                let ctx = RuleContext {
                    value: ctx_value,
                    args: &rule.args,
                    data: &check.data,
                    numeric,
                };
                if let Some(message) = self.evaluate(rule, &ctx, check, path) {
                    errors.add(path.as_str(), message);
                }
            }
        }
    }
}

impl RuleEngine for Rules {
    fn check(&self, check: &Check) -> ErrorBag {
        let mut errors = ErrorBag::new();
        self.check_sync_part(check, &mut errors);
        errors
    }

    fn check_async(&self, check: Check) -> BoxFuture<'static, ErrorBag> {
        let mut errors = ErrorBag::new();
        self.check_sync_part(&check, &mut errors);

        // Resolve the async predicates now so the future owns everything.
        let mut jobs = Vec::new();
        if let Ok(registry) = self.async_rules.read() {
            for (path, rules) in &check.rules {
                for rule in rules {
                    if let Some(entry) = registry.get(&rule.name) {
                        jobs.push((path.clone(), rule.clone(), entry.clone()));
                    }
                }
            }
        }

        Box::pin(async move {
            for (path, rule, entry) in jobs {
                let value = check.value(&path).clone();
                if !is_present(&value) {
                    continue;
                }
                let input = AsyncRuleInput {
                    value,
                    args: rule.args.clone(),
                    path: path.clone(),
                    data: Arc::clone(&check.data),
                };
                if !(entry.check)(input).await {
                    let message = format_message(&entry.message, &rule, &check, &path);
                    errors.add(path, message);
                }
            }
            errors
        })
    }

    fn register_async(&self, name: &str, message: &str, rule: AsyncRuleFn) {
        if let Ok(mut guard) = self.async_rules.write() {
            guard.insert(
                name.to_string(),
                AsyncEntry {
                    check: rule,
                    message: message.to_string(),
                },
            );
        }
    }
}

// Built-in rules for JSON values

fn is_implicit(name: &str) -> bool {
    matches!(name, "required" | "accepted")
}

fn declares_numeric(rules: &[Rule]) -> bool {
    rules
        .iter()
        .any(|rule| matches!(rule.name.as_str(), "numeric" | "integer"))
}

/// The `required` test: null, blank strings and empty collections fail.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

enum Measure {
    Numeric(f64),
    Chars(f64),
    Items(f64),
}

fn measure(value: &Value, numeric: bool) -> Option<Measure> {
    match value {
        Value::Number(_) => as_f64(value).map(Measure::Numeric),
        Value::String(s) if numeric => as_f64(value)
            .map(Measure::Numeric)
            .or(Some(Measure::Chars(s.chars().count() as f64))),
        Value::String(s) => Some(Measure::Chars(s.chars().count() as f64)),
        Value::Array(items) => Some(Measure::Items(items.len() as f64)),
        _ => None,
    }
}

fn arg_f64(rule: &Rule, index: usize) -> Option<f64> {
    let parsed = rule.arg(index).and_then(|arg| arg.parse::<f64>().ok());
    if parsed.is_none() {
        warn!("rule '{}' expects a numeric argument at position {}", rule, index);
    }
    parsed
}

/// Pick the message variant for the measured kind.
fn sized(measure: &Measure, numeric: &str, chars: &str, items: &str) -> String {
    match measure {
        Measure::Numeric(_) => numeric,
        Measure::Chars(_) => chars,
        Measure::Items(_) => items,
    }
    .to_string()
}

fn pass_if(ok: bool, message: &str) -> Result<(), String> {
    if ok { Ok(()) } else { Err(message.to_string()) }
}

/// Evaluate a built-in rule. `None` for unknown names; `Err` carries the
/// message template.
fn builtin(rule: &Rule, ctx: &RuleContext<'_>) -> Option<Result<(), String>> {
    let value = ctx.value;
    let text = value::display(value);

    let outcome = match rule.name.as_str() {
        "required" => pass_if(is_present(value), "The :attribute field is required."),
        "accepted" => pass_if(
            matches!(value, Value::Bool(true))
                || value.as_i64() == Some(1)
                || matches!(text.as_str(), "on" | "yes" | "1" | "true"),
            "The :attribute must be accepted.",
        ),
        "boolean" => pass_if(
            value.is_boolean()
                || matches!(value.as_i64(), Some(0 | 1))
                || matches!(text.as_str(), "0" | "1" | "true" | "false"),
            "The :attribute field must be true or false.",
        ),
        "numeric" => pass_if(as_f64(value).is_some(), "The :attribute must be a number."),
        "integer" => pass_if(
            value.is_i64() || value.is_u64() || text.trim().parse::<i64>().is_ok(),
            "The :attribute must be an integer.",
        ),
        "string" => pass_if(value.is_string(), "The :attribute must be a string."),
        "array" => pass_if(value.is_array(), "The :attribute must be an array."),
        "alpha" => pass_if(
            value.is_string() && text.chars().all(char::is_alphabetic),
            "The :attribute field must contain only alphabetic characters.",
        ),
        "alpha_num" => pass_if(
            text.chars().all(char::is_alphanumeric),
            "The :attribute field must be alphanumeric.",
        ),
        "alpha_dash" => pass_if(
            text.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_'),
            "The :attribute field may only contain alpha-numeric characters, as well as dashes and underscores.",
        ),
        "email" => pass_if(
            email_address::EmailAddress::is_valid(&text),
            "The :attribute format is invalid.",
        ),
        "regex" => pass_if(matches_pattern(rule, &text), "The :attribute format is invalid."),
        "in" => pass_if(rule.args.contains(&text), "The selected :attribute is invalid."),
        "not_in" => pass_if(!rule.args.contains(&text), "The selected :attribute is invalid."),
        "same" => {
            let other = rule.arg(0).and_then(|path| ctx.data.get(path)).unwrap_or(&Value::Null);
            pass_if(value::loose_eq(value, other), "The :attribute and :same fields must match.")
        }
        "different" => {
            let other = rule.arg(0).and_then(|path| ctx.data.get(path)).unwrap_or(&Value::Null);
            pass_if(!value::loose_eq(value, other), "The :attribute and :different must be different.")
        }
        "min" | "max" | "size" => {
            // Unmeasurable values and malformed arguments don't fail the rule.
            let (Some(measured), Some(limit)) = (measure(value, ctx.numeric), arg_f64(rule, 0)) else {
                return Some(Ok(()));
            };
            let amount = amount_of(&measured);
            let (ok, message) = match rule.name.as_str() {
                "min" => (
                    amount >= limit,
                    sized(
                        &measured,
                        "The :attribute must be at least :min.",
                        "The :attribute must be at least :min characters.",
                        "The :attribute must have at least :min items.",
                    ),
                ),
                "max" => (
                    amount <= limit,
                    sized(
                        &measured,
                        "The :attribute may not be greater than :max.",
                        "The :attribute may not be greater than :max characters.",
                        "The :attribute may not have more than :max items.",
                    ),
                ),
                _ => (
                    amount == limit,
                    sized(
                        &measured,
                        "The :attribute must be :size.",
                        "The :attribute must be :size characters.",
                        "The :attribute must contain :size items.",
                    ),
                ),
            };
            pass_if(ok, &message)
        }
        "between" => {
            let (Some(measured), Some(low), Some(high)) =
                (measure(value, ctx.numeric), arg_f64(rule, 0), arg_f64(rule, 1))
            else {
                return Some(Ok(()));
            };
            let amount = amount_of(&measured);
            pass_if(
                amount >= low && amount <= high,
                &sized(
                    &measured,
                    "The :attribute field must be between :min and :max.",
                    "The :attribute field must be between :min and :max characters.",
                    "The :attribute must have between :min and :max items.",
                ),
            )
        }
        _ => return None,
    };

    Some(outcome)
}

fn amount_of(measure: &Measure) -> f64 {
    match measure {
        Measure::Numeric(n) | Measure::Chars(n) | Measure::Items(n) => *n,
    }
}

/// `regex:/pattern/flags`; only the `i` flag is understood.
fn matches_pattern(rule: &Rule, text: &str) -> bool {
    let Some(raw) = rule.arg(0) else {
        warn!("regex rule without a pattern");
        return false;
    };

    let (pattern, flags) = match raw.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((pattern, flags)) => (pattern, flags),
        None => (raw, ""),
    };
    let pattern = if flags.contains('i') {
        format!("(?i){pattern}")
    } else {
        pattern.to_string()
    };

    match regex::Regex::new(&pattern) {
        Ok(re) => re.is_match(text),
        Err(err) => {
            warn!("invalid regex rule '{}': {}", raw, err);
            false
        }
    }
}

/// Fill `:attribute` and the rule's parameter placeholders.
fn format_message(template: &str, rule: &Rule, check: &Check, path: &str) -> String {
    let mut message = template.replace(":attribute", check.attribute(path));

    let params: &[&str] = match rule.name.as_str() {
        "min" => &["min"],
        "max" => &["max"],
        "size" => &["size"],
        "between" => &["min", "max"],
        "same" => &["same"],
        "different" => &["different"],
        _ => &[],
    };
    for (index, param) in params.iter().enumerate() {
        let Some(arg) = rule.arg(index) else { continue };
        // Paths read better as their display names.
        let shown = if matches!(*param, "same" | "different") {
            check.attribute(arg)
        } else {
            arg
        };
        message = message.replace(&format!(":{param}"), shown);
    }
    message
}

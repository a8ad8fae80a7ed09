//! Per-path property overrides.
//!
//! The override store is consulted once, when a field is constructed. Each
//! category (values, labels, ...) is a JSON tree addressed by the field's
//! dotted path. A flat key such as `"user.name"` wins over the nested form
//! `{ "user": { "name": ... } }`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::validation::RuleSpec;

/// Property categories an override can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Values,
    Labels,
    Defaults,
    Disabled,
    Related,
    Validate,
    Rules,
}

/// Keyed-by-path source of property overrides.
///
/// # Example
///
/// ```
/// use formstate::overrides::{Category, Overrides};
/// use serde_json::json;
///
/// let overrides = Overrides::from_json_str(r#"{
///     "labels": { "user": { "name": "Full name" } },
///     "values": { "user.age": 30 }
/// }"#).unwrap();
///
/// assert_eq!(overrides.lookup(Category::Labels, "user.name"), Some(&json!("Full name")));
/// assert_eq!(overrides.lookup(Category::Values, "user.age"), Some(&json!(30)));
/// assert_eq!(overrides.lookup(Category::Values, "user.name"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub values: Value,
    pub labels: Value,
    pub defaults: Value,
    pub disabled: Value,
    pub related: Value,
    pub validate: Value,
    pub rules: Value,
}

impl Overrides {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a store from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets one override, stored under its flat dotted key.
    pub fn with(mut self, category: Category, path: impl Into<String>, value: impl Into<Value>) -> Self {
        let tree = self.category_mut(category);
        if !tree.is_object() {
            *tree = Value::Object(Default::default());
        }
        if let Value::Object(map) = tree {
            map.insert(path.into(), value.into());
        }
        self
    }

    /// Look up the override for `path`. Missing entries and explicit nulls
    /// are `None`.
    pub fn lookup(&self, category: Category, path: &str) -> Option<&Value> {
        let tree = self.category(category);
        if let Some(flat) = tree.get(path) {
            return Some(flat).filter(|v| !v.is_null());
        }

        let mut node = tree;
        for segment in path.split('.') {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node).filter(|v| !v.is_null())
    }

    /// Resolve every category for one path.
    pub fn resolve(&self, path: &str) -> ResolvedOverrides {
        let string = |category| {
            self.lookup(category, path)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        ResolvedOverrides {
            value: self.lookup(Category::Values, path).cloned(),
            label: string(Category::Labels),
            default: self.lookup(Category::Defaults, path).cloned(),
            disabled: self.lookup(Category::Disabled, path).and_then(Value::as_bool),
            related: self.lookup(Category::Related, path).and_then(|v| match v {
                Value::String(s) => Some(vec![s.clone()]),
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect(),
                _ => None,
            }),
            validate: self.lookup(Category::Validate, path).cloned(),
            rules: self.lookup(Category::Rules, path).and_then(RuleSpec::from_json),
        }
    }

    fn category(&self, category: Category) -> &Value {
        match category {
            Category::Values => &self.values,
            Category::Labels => &self.labels,
            Category::Defaults => &self.defaults,
            Category::Disabled => &self.disabled,
            Category::Related => &self.related,
            Category::Validate => &self.validate,
            Category::Rules => &self.rules,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut Value {
        match category {
            Category::Values => &mut self.values,
            Category::Labels => &mut self.labels,
            Category::Defaults => &mut self.defaults,
            Category::Disabled => &mut self.disabled,
            Category::Related => &mut self.related,
            Category::Validate => &mut self.validate,
            Category::Rules => &mut self.rules,
        }
    }
}

/// Overrides resolved for a single path. Absent entries are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedOverrides {
    pub value: Option<Value>,
    pub label: Option<String>,
    pub default: Option<Value>,
    pub disabled: Option<bool>,
    pub related: Option<Vec<String>>,
    pub validate: Option<Value>,
    pub rules: Option<RuleSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_lookup_through_arrays() {
        let overrides = Overrides {
            values: json!({ "items": [{ "qty": 1 }, { "qty": 2 }] }),
            ..Default::default()
        };
        assert_eq!(overrides.lookup(Category::Values, "items.1.qty"), Some(&json!(2)));
        assert_eq!(overrides.lookup(Category::Values, "items.5.qty"), None);
        assert_eq!(overrides.lookup(Category::Values, "items.x"), None);
    }

    #[test]
    fn test_flat_key_takes_precedence() {
        let overrides = Overrides {
            labels: json!({ "a.b": "flat", "a": { "b": "nested" } }),
            ..Default::default()
        };
        assert_eq!(overrides.lookup(Category::Labels, "a.b"), Some(&json!("flat")));
    }

    #[test]
    fn test_resolve_typed() {
        let overrides = Overrides::new()
            .with(Category::Disabled, "email", true)
            .with(Category::Rules, "email", "required|email")
            .with(Category::Related, "email", json!(["confirm"]))
            .with(Category::Values, "email", Value::Null);

        let resolved = overrides.resolve("email");
        assert_eq!(resolved.disabled, Some(true));
        assert_eq!(resolved.rules, Some(RuleSpec::from("required|email")));
        assert_eq!(resolved.related, Some(vec!["confirm".to_string()]));
        assert_eq!(resolved.value, None);
        assert_eq!(resolved.label, None);
    }

    #[test]
    fn test_from_json_str_partial() {
        let overrides = Overrides::from_json_str(r#"{ "defaults": { "age": 18 } }"#).unwrap();
        assert_eq!(overrides.lookup(Category::Defaults, "age"), Some(&json!(18)));
        assert_eq!(overrides.values, Value::Null);
    }
}

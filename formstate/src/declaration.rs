//! Field declarations.
//!
//! A declaration is the author-supplied description of a field's shape and
//! initial properties. It is either a bare scalar (the field's value, no
//! nested fields) or a composite with properties and nested `fields`.
//!
//! # Example
//!
//! ```
//! use formstate::declaration::{Declaration, FieldDecl};
//! use serde_json::json;
//!
//! let username = FieldDecl::new().with_value("").with_rules("required|min:3");
//! let from_json = Declaration::try_from(json!({ "value": "", "rules": "required|min:3" })).unwrap();
//! assert_eq!(Declaration::from(username), from_json);
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{FormError, Result};
use crate::validation::RuleSpec;

/// Ordered map of child key to declaration.
pub type Declarations = IndexMap<String, Declaration>;

/// Declared shape of one field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum Declaration {
    /// The field's value is this bool/number/string/array.
    Scalar(Value),
    /// A field with properties and optional nested fields.
    Composite(FieldDecl),
}

impl Declaration {
    /// Declare a scalar field
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    /// Parse a JSON declaration, reporting errors relative to `path`.
    pub fn from_json(value: &Value, path: &str) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Scalar(Value::String(String::new()))),
            Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                Ok(Self::Scalar(value.clone()))
            }
            Value::Object(map) => FieldDecl::from_json(map, path).map(Self::Composite),
        }
    }

    /// Parse a map of declarations keyed by field name
    pub fn map_from_json(value: &Value, path: &str) -> Result<Declarations> {
        let Value::Object(map) = value else {
            return Err(FormError::invalid_declaration(
                display_path(path),
                "expected an object of field declarations",
            ));
        };
        map.iter()
            .map(|(key, decl)| Ok((key.clone(), Self::from_json(decl, &join(path, key))?)))
            .collect()
    }

    /// Nested declarations, if any
    pub fn fields(&self) -> Option<&Declarations> {
        match self {
            Self::Scalar(_) => None,
            Self::Composite(decl) => decl.fields.as_ref(),
        }
    }
}

impl TryFrom<Value> for Declaration {
    type Error = FormError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json(&value, "")
    }
}

impl From<FieldDecl> for Declaration {
    fn from(decl: FieldDecl) -> Self {
        Self::Composite(decl)
    }
}

/// Properties of a composite declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDecl {
    pub name: Option<String>,
    pub value: Option<Value>,
    pub default: Option<Value>,
    pub label: Option<String>,
    pub disabled: Option<bool>,
    pub rules: Option<RuleSpec>,
    pub validate: Option<Value>,
    pub related: Option<Vec<String>>,
    pub fields: Option<Declarations>,
}

impl FieldDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn with_rules(mut self, rules: impl Into<RuleSpec>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn with_validate(mut self, validate: impl Into<Value>) -> Self {
        self.validate = Some(validate.into());
        self
    }

    pub fn with_related<I, S>(mut self, related: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related = Some(related.into_iter().map(Into::into).collect());
        self
    }

    /// Add a nested field declaration
    pub fn with_field(mut self, key: impl Into<String>, decl: impl Into<Declaration>) -> Self {
        self.fields
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), decl.into());
        self
    }

    fn from_json(map: &Map<String, Value>, path: &str) -> Result<Self> {
        let invalid = |prop: &str, reason: &str| {
            FormError::invalid_declaration(display_path(path), format!("'{prop}' {reason}"))
        };
        let present = |prop: &str| map.get(prop).filter(|v| !v.is_null());

        let string = |prop: &str| -> Result<Option<String>> {
            match present(prop) {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(invalid(prop, "must be a string")),
            }
        };

        let disabled = match present("disabled") {
            None => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => return Err(invalid("disabled", "must be a boolean")),
        };

        let rules = match present("rules") {
            None => None,
            Some(Value::String(s)) => Some(RuleSpec::Piped(s.clone())),
            Some(Value::Array(items)) => Some(RuleSpec::List(
                string_list(items).ok_or_else(|| invalid("rules", "must contain only strings"))?,
            )),
            Some(_) => return Err(invalid("rules", "must be a string or an array of strings")),
        };

        let related = match present("related") {
            None => None,
            Some(Value::String(s)) => Some(vec![s.clone()]),
            Some(Value::Array(items)) => Some(
                string_list(items).ok_or_else(|| invalid("related", "must contain only strings"))?,
            ),
            Some(_) => return Err(invalid("related", "must be an array of paths")),
        };

        let fields = match present("fields") {
            None => None,
            Some(value @ Value::Object(_)) => Some(Declaration::map_from_json(value, path)?),
            Some(_) => return Err(invalid("fields", "must be an object")),
        };

        Ok(Self {
            name: string("name")?,
            value: present("value").cloned(),
            default: present("default").cloned(),
            label: string("label")?,
            disabled,
            rules,
            validate: present("validate").cloned(),
            related,
            fields,
        })
    }
}

fn string_list(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Join a parent path and a key with a dot, omitting the dot at the root.
pub(crate) fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(
            Declaration::try_from(json!(true)).unwrap(),
            Declaration::Scalar(json!(true))
        );
        assert_eq!(
            Declaration::try_from(json!([1, 2])).unwrap(),
            Declaration::Scalar(json!([1, 2]))
        );
        assert_eq!(
            Declaration::try_from(Value::Null).unwrap(),
            Declaration::Scalar(json!(""))
        );
    }

    #[test]
    fn test_composite_with_nested_fields() {
        let decl = Declaration::try_from(json!({
            "label": "Address",
            "fields": {
                "street": "Main St",
                "zip": { "value": 1234, "rules": ["required", "numeric"] }
            }
        }))
        .unwrap();

        let fields = decl.fields().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["street", "zip"]);
        let Declaration::Composite(zip) = &fields["zip"] else {
            panic!("zip should be composite");
        };
        assert_eq!(zip.value, Some(json!(1234)));
        assert_eq!(
            zip.rules,
            Some(RuleSpec::List(vec!["required".into(), "numeric".into()]))
        );
    }

    #[test]
    fn test_invalid_shapes_report_path() {
        let err = Declaration::try_from(json!({
            "fields": { "tags": { "related": 5 } }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("tags"));

        let err = Declaration::try_from(json!({ "fields": [1, 2] })).unwrap_err();
        assert!(matches!(err, FormError::InvalidDeclaration { .. }));

        let err = Declaration::try_from(json!({ "disabled": "yes" })).unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_deserialize_via_serde() {
        let decl: Declaration =
            serde_json::from_str(r#"{ "value": "", "rules": "required|min:3" }"#).unwrap();
        let expected = FieldDecl::new().with_value("").with_rules("required|min:3");
        assert_eq!(decl, Declaration::Composite(expected));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", "0"), "a.0");
    }
}

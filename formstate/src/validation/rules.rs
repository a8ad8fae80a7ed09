//! Rule specs and rule parsing.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

/// Raw rule declaration of a field: `"required|min:3"` or a list of rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSpec {
    Piped(String),
    List(Vec<String>),
}

impl RuleSpec {
    /// Parse into individual rules, skipping empty segments.
    pub fn rules(&self) -> Vec<Rule> {
        match self {
            Self::Piped(s) => s.split('|').filter_map(Rule::parse).collect(),
            Self::List(items) => items.iter().filter_map(|item| Rule::parse(item)).collect(),
        }
    }

    /// Whether any rule has the given name
    pub fn contains(&self, name: &str) -> bool {
        self.rules().iter().any(|rule| rule.name == name)
    }

    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Piped(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            _ => None,
        }
    }
}

impl From<&str> for RuleSpec {
    fn from(s: &str) -> Self {
        Self::Piped(s.to_string())
    }
}

impl From<String> for RuleSpec {
    fn from(s: String) -> Self {
        Self::Piped(s)
    }
}

impl From<Vec<String>> for RuleSpec {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<&str>> for RuleSpec {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(str::to_string).collect())
    }
}

/// One parsed rule: `name:arg1,arg2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub name: String,
    pub args: Vec<String>,
}

impl Rule {
    /// Parse `name` or `name:args`. Returns `None` for blank input.
    ///
    /// `regex` takes its pattern verbatim since patterns may contain commas.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let (name, args) = match raw.split_once(':') {
            None => (raw, Vec::new()),
            Some(("regex", pattern)) => ("regex", vec![pattern.to_string()]),
            Some((name, args)) => (
                name,
                args.split(',').map(|arg| arg.trim().to_string()).collect(),
            ),
        };

        Some(Self {
            name: name.to_string(),
            args,
        })
    }

    /// Create a rule from a name and arguments
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Argument at `index`
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.name, self.args.join(","))
        }
    }
}

/// Split rules into (synchronous, asynchronous) by rule name.
///
/// A name absent from `async_names` is always synchronous.
pub fn partition(rules: Vec<Rule>, async_names: &HashSet<String>) -> (Vec<Rule>, Vec<Rule>) {
    rules
        .into_iter()
        .partition(|rule| !async_names.contains(&rule.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_piped() {
        let rules = RuleSpec::from("required|min:3||between:1, 5").rules();
        assert_eq!(
            rules,
            vec![
                Rule::new("required", &[]),
                Rule::new("min", &["3"]),
                Rule::new("between", &["1", "5"]),
            ]
        );
    }

    #[test]
    fn test_regex_keeps_commas() {
        let rule = Rule::parse("regex:/^[a-z]{1,3}$/").unwrap();
        assert_eq!(rule.args, vec!["/^[a-z]{1,3}$/".to_string()]);
    }

    #[test]
    fn test_partition_by_name() {
        let async_names: HashSet<String> = ["unique".to_string()].into_iter().collect();
        let rules = RuleSpec::from(vec!["required", "unique:users", "email"]).rules();
        let (sync, asynchronous) = partition(rules, &async_names);
        assert_eq!(sync.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), ["required", "email"]);
        assert_eq!(asynchronous, vec![Rule::new("unique", &["users"])]);
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(Rule::parse("in:a,b").unwrap().to_string(), "in:a,b");
        assert!(RuleSpec::from("required|email").contains("email"));
    }
}

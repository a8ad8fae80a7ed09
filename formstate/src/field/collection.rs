use indexmap::IndexMap;

use super::Field;

/// Ordered child collection of a field.
///
/// Keys keep insertion order. A collection whose keys all parse as integers
/// is incremental and behaves like a list.
#[derive(Clone, Default)]
pub struct Fields {
    entries: IndexMap<String, Field>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Children in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries.iter().map(|(key, field)| (key.as_str(), field))
    }

    pub(crate) fn insert(&mut self, key: String, field: Field) {
        self.entries.insert(key, field);
    }

    /// Remove a child, keeping the order of the others.
    pub(crate) fn remove(&mut self, key: &str) -> Option<Field> {
        self.entries.shift_remove(key)
    }

    /// Non-empty and integer keyed.
    pub fn is_incremental(&self) -> bool {
        !self.entries.is_empty() && self.entries.keys().all(|key| int_key(key).is_some())
    }

    /// Largest integer key, if any.
    pub fn max_key(&self) -> Option<i64> {
        self.entries.keys().filter_map(|key| int_key(key)).max()
    }

    /// Key for the next entry: `0` for an empty collection, else `max + 1`.
    ///
    /// Gaps left by deletions are never reused. `None` once the largest key
    /// has no successor.
    pub fn next_key(&self) -> Option<String> {
        match self.max_key() {
            Some(max) => max.checked_add(1).map(|next| next.to_string()),
            None => Some("0".to_string()),
        }
    }

    /// Children sorted by integer key. Non-integer keys sort last in
    /// insertion order.
    pub fn ordered_by_key(&self) -> Vec<Field> {
        let mut entries: Vec<(Option<i64>, &Field)> = self
            .entries
            .iter()
            .map(|(key, field)| (int_key(key), field))
            .collect();
        entries.sort_by_key(|(key, _)| key.unwrap_or(i64::MAX));
        entries.into_iter().map(|(_, field)| field.clone()).collect()
    }
}

fn int_key(key: &str) -> Option<i64> {
    key.parse().ok()
}

impl std::fmt::Debug for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FormContext;

    fn field(key: &str) -> Field {
        Field::new(key, key, None, Default::default(), false, FormContext::detached())
    }

    #[test]
    fn test_next_key() {
        let mut fields = Fields::new();
        assert_eq!(fields.next_key().as_deref(), Some("0"));

        fields.insert("0".into(), field("0"));
        fields.insert("4".into(), field("4"));
        assert_eq!(fields.next_key().as_deref(), Some("5"));
        assert!(fields.is_incremental());

        fields.insert("name".into(), field("name"));
        assert!(!fields.is_incremental());

        let mut full = Fields::new();
        full.insert(i64::MAX.to_string(), field("last"));
        assert_eq!(full.next_key(), None);
    }

    #[test]
    fn test_ordered_by_key() {
        let mut fields = Fields::new();
        fields.insert("10".into(), field("10"));
        fields.insert("2".into(), field("2"));
        let keys: Vec<String> = fields.ordered_by_key().iter().map(|f| f.key().to_string()).collect();
        assert_eq!(keys, ["2", "10"]);

        assert!(fields.remove("2").is_some());
        assert!(fields.remove("2").is_none());
        assert_eq!(fields.len(), 1);
    }
}

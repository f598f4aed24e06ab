//! Result rows and generated-key capture

use serde_json::{Map, Value as JsonValue};

use crate::value::BindValue;

/// Column name of the synthetic row reporting an affected-row count
pub const UPDATED: &str = "UPDATED";

/// Label for a generated key when no key column names are configured
pub const GENERATED_KEY: &str = "GENERATED_KEY";

/// One row of an execution result
///
/// An ordered list of `(column, value)` pairs. Column lookup ignores case;
/// inserting a column that already exists (ignoring case) replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyRow {
    columns: Vec<(String, BindValue)>,
}

impl KeyRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, builder-style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a column, replacing an existing column whose name matches ignoring case
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<BindValue>) {
        let name = name.into();
        let value = value.into();
        match self
            .columns
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.columns.push((name, value)),
        }
    }

    /// Look up a column ignoring case
    pub fn get(&self, name: &str) -> Option<&BindValue> {
        self.columns
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Iterate over columns in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build a row from a JSON object returned by the store
    pub fn from_json_object(object: &Map<String, JsonValue>) -> Self {
        let mut row = Self::new();
        for (name, value) in object {
            row.insert(name.clone(), BindValue::from_json(value));
        }
        row
    }
}

/// The rows produced by one execution
pub type ExecutionResult = Vec<KeyRow>;

/// Accumulates generated-key rows during an update
///
/// Handed to [`NamedParameterOperations::update_with_keys`](crate::NamedParameterOperations::update_with_keys),
/// which pushes one row per generated key set.
#[derive(Debug, Clone, Default)]
pub struct GeneratedKeyHolder {
    key_columns: Vec<String>,
    rows: Vec<KeyRow>,
}

impl GeneratedKeyHolder {
    /// Create an empty key holder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty key holder expecting the given key columns
    pub fn with_key_columns<I, S>(key_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_columns: key_columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// The key column names the caller expects
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Label for a single generated key value
    pub fn primary_key_column(&self) -> &str {
        self.key_columns
            .first()
            .map(String::as_str)
            .unwrap_or(GENERATED_KEY)
    }

    /// Record a generated-key row
    pub fn push(&mut self, row: KeyRow) {
        self.rows.push(row);
    }

    /// All captured rows in generation order
    pub fn key_list(&self) -> &[KeyRow] {
        &self.rows
    }

    /// The single generated key value, if exactly one row with one column was captured
    pub fn key(&self) -> Option<&BindValue> {
        match self.rows.as_slice() {
            [row] if row.len() == 1 => row.iter().next().map(|(_, v)| v),
            _ => None,
        }
    }

    /// Consume the holder, returning the captured rows
    pub fn into_key_list(self) -> Vec<KeyRow> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_ignores_case() {
        let row = KeyRow::new().with(UPDATED, 1);
        assert_eq!(row.get("UPDATED"), Some(&BindValue::Integer(1)));
        assert_eq!(row.get("updated"), Some(&BindValue::Integer(1)));
        assert_eq!(row.get("Updated"), Some(&BindValue::Integer(1)));
        assert_eq!(row.get("other"), None);
    }

    #[test]
    fn test_insert_replaces_ignoring_case_and_keeps_order() {
        let mut row = KeyRow::new().with("ID", 1).with("NAME", "a");
        row.insert("id", 2);
        let columns: Vec<_> = row.iter().collect();
        assert_eq!(
            columns,
            vec![("ID", &BindValue::Integer(2)), ("NAME", &BindValue::Text("a".into()))]
        );
    }

    #[test]
    fn test_from_json_object() {
        let object = json!({"id": 7, "created": "now"});
        let row = KeyRow::from_json_object(object.as_object().unwrap());
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("ID"), Some(&BindValue::Integer(7)));
    }

    #[test]
    fn test_key_holder_single_key() {
        let mut holder = GeneratedKeyHolder::with_key_columns(["ID"]);
        assert_eq!(holder.primary_key_column(), "ID");
        assert!(holder.key().is_none());

        holder.push(KeyRow::new().with("ID", 5));
        assert_eq!(holder.key(), Some(&BindValue::Integer(5)));
        assert_eq!(holder.into_key_list().len(), 1);
    }

    #[test]
    fn test_key_holder_default_label() {
        let holder = GeneratedKeyHolder::new();
        assert_eq!(holder.primary_key_column(), GENERATED_KEY);
        assert!(holder.key_list().is_empty());
    }

    #[test]
    fn test_key_holder_multiple_rows_has_no_single_key() {
        let mut holder = GeneratedKeyHolder::new();
        holder.push(KeyRow::new().with("ID", 1));
        holder.push(KeyRow::new().with("ID", 2));
        assert!(holder.key().is_none());
        assert_eq!(holder.key_list().len(), 2);
    }
}

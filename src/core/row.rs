use serde::Serialize;

use crate::core::Value;

/// One result row delivered by the driver.
///
/// Columns keep the order the driver emitted them in; lookup by name is
/// case-insensitive. A row is consumed exactly once to build one output
/// element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Builds a row from `(column, value)` pairs, preserving order.
    pub fn from_pairs<I, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, Value)>,
        N: Into<String>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Case-insensitive lookup by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    /// Value at a column position, in driver emission order.
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let row = Row::from_pairs([("LastName", Value::text("Doe")), ("age", Value::Integer(4))]);

        assert_eq!(row.get("lastname"), Some(&Value::text("Doe")));
        assert_eq!(row.get("LASTNAME"), Some(&Value::text("Doe")));
        assert_eq!(row.get("Age"), Some(&Value::Integer(4)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_order_preserved() {
        let row = Row::from_pairs([("b", Value::Integer(2)), ("a", Value::Integer(1))]);

        assert_eq!(row.columns(), &["b".to_string(), "a".to_string()]);
        assert_eq!(row.value_at(0), Some(&Value::Integer(2)));
    }
}

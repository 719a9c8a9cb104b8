use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::{RepoError, Result, Row, Value};
use crate::entity::Entity;

/// Whether an entity result covers all persistent properties or only a
/// selected subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityShape {
    /// Every declared property must be resolvable from the row.
    Full,
    /// Only returned columns are populated; the rest default.
    Partial,
}

/// Declared properties resolved against one row, in metadata order.
///
/// Column lookup already happened (case-insensitively); hydration reads
/// through the typed accessors, which default on absent or NULL columns
/// and fail only on genuine type mismatches.
pub struct PropertyValues<'r> {
    entity: &'static str,
    entries: Vec<(&'static str, Option<&'r Value>)>,
}

impl<'r> PropertyValues<'r> {
    pub fn get(&self, column: &str) -> Option<&'r Value> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, value)| *value)
    }

    fn mismatch(&self, column: &str, expected: &str, found: &Value) -> RepoError {
        RepoError::Mapping(format!(
            "Column '{column}' of entity '{}' holds {} where {expected} was expected",
            self.entity,
            found.type_name()
        ))
    }

    pub fn i64(&self, column: &str) -> Result<i64> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(0),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| self.mismatch(column, "INTEGER", v)),
        }
    }

    pub fn f64(&self, column: &str) -> Result<f64> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(0.0),
            Some(v) => v.as_f64().ok_or_else(|| self.mismatch(column, "FLOAT", v)),
        }
    }

    pub fn string(&self, column: &str) -> Result<String> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(v) => v
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| self.mismatch(column, "TEXT", v)),
        }
    }

    pub fn boolean(&self, column: &str) -> Result<bool> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(false),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.mismatch(column, "BOOLEAN", v)),
        }
    }

    pub fn uuid(&self, column: &str) -> Result<Uuid> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(Uuid::nil()),
            Some(v) => v.as_uuid().ok_or_else(|| self.mismatch(column, "UUID", v)),
        }
    }

    pub fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_timestamp()
                .map(Some)
                .ok_or_else(|| self.mismatch(column, "TIMESTAMP", v)),
        }
    }

    /// The raw value, `Null` when the column is absent.
    pub fn value(&self, column: &str) -> Value {
        self.get(column).cloned().unwrap_or(Value::Null)
    }
}

/// Maps one row to one entity instance.
///
/// Mapping is row-local and stateless. Full shape requires every
/// non-nullable, non-defaulted property to be present in the row;
/// partial shape lets absent columns fall back to property defaults.
pub fn map_entity<E: Entity>(row: &Row, shape: EntityShape) -> Result<E> {
    let meta = E::metadata();
    let mut entries = Vec::with_capacity(meta.properties.len());
    for property in meta.properties {
        let found = row.get(property.column);
        if found.is_none()
            && matches!(shape, EntityShape::Full)
            && !property.nullable
            && !property.has_default
        {
            return Err(RepoError::Mapping(format!(
                "Row is missing required column '{}' for entity '{}'",
                property.column, meta.entity
            )));
        }
        entries.push((property.column, found));
    }
    E::hydrate(&PropertyValues {
        entity: meta.entity,
        entries,
    })
}

/// Maps a scalar row (first column) to a count.
pub fn map_count(row: &Row) -> Result<u64> {
    let value = row
        .value_at(0)
        .ok_or_else(|| RepoError::Mapping("Count query produced an empty row".to_string()))?;
    let count = value.as_i64().ok_or_else(|| {
        RepoError::Mapping(format!(
            "Count query produced {} instead of a number",
            value.type_name()
        ))
    })?;
    u64::try_from(count)
        .map_err(|_| RepoError::Mapping(format!("Count query produced a negative count: {count}")))
}

/// Maps a scalar row (first column) to a boolean.
pub fn map_bool(row: &Row) -> Result<bool> {
    let value = row
        .value_at(0)
        .ok_or_else(|| RepoError::Mapping("Boolean query produced an empty row".to_string()))?;
    value.as_bool().ok_or_else(|| {
        RepoError::Mapping(format!(
            "Boolean query produced {} instead of a boolean",
            value.type_name()
        ))
    })
}

/// First column of a row, as-is.
pub fn map_scalar(row: &Row) -> Result<Value> {
    row.value_at(0)
        .cloned()
        .ok_or_else(|| RepoError::Mapping("Scalar query produced an empty row".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityMetadata, PropertyDescriptor};

    #[derive(Debug, PartialEq)]
    struct Person {
        id: i64,
        firstname: String,
        lastname: String,
        age: i64,
    }

    static PERSON_PROPERTIES: [PropertyDescriptor; 4] = [
        PropertyDescriptor::required("id"),
        PropertyDescriptor::required("firstname"),
        PropertyDescriptor::required("lastname"),
        PropertyDescriptor::defaulted("age"),
    ];
    static PERSON_METADATA: EntityMetadata = EntityMetadata {
        entity: "Person",
        table: "person",
        id_column: "id",
        properties: &PERSON_PROPERTIES,
    };

    impl Entity for Person {
        fn metadata() -> &'static EntityMetadata {
            &PERSON_METADATA
        }

        fn id_value(&self) -> Value {
            Value::Integer(self.id)
        }

        fn assign_id(&mut self, id: Value) {
            self.id = id.as_i64().unwrap_or_default();
        }

        fn property_values(&self) -> Vec<Value> {
            vec![
                Value::Integer(self.id),
                Value::text(&self.firstname),
                Value::text(&self.lastname),
                Value::Integer(self.age),
            ]
        }

        fn hydrate(p: &PropertyValues<'_>) -> Result<Self> {
            Ok(Self {
                id: p.i64("id")?,
                firstname: p.string("firstname")?,
                lastname: p.string("lastname")?,
                age: p.i64("age")?,
            })
        }
    }

    #[test]
    fn test_full_mapping_case_insensitive() {
        let row = Row::from_pairs([
            ("ID", Value::Integer(1)),
            ("FirstName", Value::text("Jo")),
            ("LASTNAME", Value::text("Doe")),
            ("age", Value::Integer(30)),
        ]);

        let person: Person = map_entity(&row, EntityShape::Full).unwrap();
        assert_eq!(
            person,
            Person {
                id: 1,
                firstname: "Jo".into(),
                lastname: "Doe".into(),
                age: 30
            }
        );
    }

    #[test]
    fn test_full_mapping_missing_required_column() {
        let row = Row::from_pairs([("id", Value::Integer(1))]);
        let err = map_entity::<Person>(&row, EntityShape::Full).unwrap_err();
        assert!(matches!(err, RepoError::Mapping(_)));
        assert!(err.to_string().contains("firstname"));
    }

    #[test]
    fn test_full_mapping_tolerates_missing_defaulted_column() {
        let row = Row::from_pairs([
            ("id", Value::Integer(1)),
            ("firstname", Value::text("Jo")),
            ("lastname", Value::text("Doe")),
        ]);

        let person: Person = map_entity(&row, EntityShape::Full).unwrap();
        assert_eq!(person.age, 0);
    }

    #[test]
    fn test_partial_mapping_defaults_unselected() {
        let row = Row::from_pairs([("lastname", Value::text("Doe"))]);

        let person: Person = map_entity(&row, EntityShape::Partial).unwrap();
        assert_eq!(person.lastname, "Doe");
        assert_eq!(person.firstname, "");
        assert_eq!(person.id, 0);
        assert_eq!(person.age, 0);
    }

    #[test]
    fn test_type_mismatch_reported() {
        let row = Row::from_pairs([
            ("id", Value::text("not-a-number")),
            ("firstname", Value::text("Jo")),
            ("lastname", Value::text("Doe")),
            ("age", Value::Integer(1)),
        ]);

        let err = map_entity::<Person>(&row, EntityShape::Full).unwrap_err();
        assert!(err.to_string().contains("INTEGER"));
    }

    #[test]
    fn test_scalar_mappings() {
        assert_eq!(
            map_count(&Row::from_pairs([("count", Value::Integer(5))])).unwrap(),
            5
        );
        assert!(map_count(&Row::from_pairs([("count", Value::Integer(-1))])).is_err());
        assert!(map_bool(&Row::from_pairs([("any", Value::Boolean(true))])).unwrap());
        assert_eq!(
            map_scalar(&Row::from_pairs([("v", Value::text("x"))])).unwrap(),
            Value::text("x")
        );
    }
}

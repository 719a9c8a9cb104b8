//! Shared test entity and row helpers.
#![allow(dead_code)]

use repoflow::mapper::PropertyValues;
use repoflow::{Entity, EntityMetadata, PropertyDescriptor, Result, Row, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Person {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub age: i64,
    /// Self-reported newness, for tests exercising that strategy.
    pub is_new: Option<bool>,
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
            is_new: None,
        })
    }

    fn reports_new(&self) -> Option<bool> {
        self.is_new
    }
}

pub fn person_row(id: i64, firstname: &str, lastname: &str, age: i64) -> Row {
    Row::from_pairs([
        ("id", Value::Integer(id)),
        ("firstname", Value::text(firstname)),
        ("lastname", Value::text(lastname)),
        ("age", Value::Integer(age)),
    ])
}

pub fn count_row(count: i64) -> Row {
    Row::from_pairs([("count", Value::Integer(count))])
}

use crate::core::{RepoError, Result, Value};
use crate::entity::{Entity, EntityMetadata};

/// Driver statements for the generic CRUD path, derived from entity
/// metadata at registration time. User SQL never flows through here.
#[derive(Debug, Clone)]
pub(crate) struct CrudStatements {
    pub select_by_id: String,
    pub select_all: String,
    /// Insert carrying an application-assigned identifier.
    pub insert_full: String,
    /// Insert leaving identifier generation to the database.
    pub insert_generated: String,
    pub update_by_id: String,
    pub delete_by_id: String,
    pub count: String,
    pub exists_by_id: String,
    id_index: usize,
}

impl CrudStatements {
    pub fn build(meta: &EntityMetadata) -> Result<Self> {
        let id_index = meta.id_property_index().ok_or_else(|| {
            RepoError::Configuration(format!(
                "Entity '{}' declares identifier column '{}' outside its property set",
                meta.entity, meta.id_column
            ))
        })?;

        let columns: Vec<&str> = meta.columns().collect();
        let non_id: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| *c != meta.id_column)
            .collect();
        if non_id.is_empty() {
            return Err(RepoError::Configuration(format!(
                "Entity '{}' has no persistent properties besides its identifier",
                meta.entity
            )));
        }

        let table = meta.table;
        let column_list = columns.join(", ");
        let id = meta.id_column;

        let placeholders = |n: usize| -> String {
            (1..=n)
                .map(|i| format!("${i}"))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let assignments = non_id
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c} = ${}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self {
            select_by_id: format!("SELECT {column_list} FROM {table} WHERE {id} = $1"),
            select_all: format!("SELECT {column_list} FROM {table}"),
            insert_full: format!(
                "INSERT INTO {table} ({column_list}) VALUES ({})",
                placeholders(columns.len())
            ),
            insert_generated: format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                non_id.join(", "),
                placeholders(non_id.len())
            ),
            update_by_id: format!(
                "UPDATE {table} SET {assignments} WHERE {id} = ${}",
                non_id.len() + 1
            ),
            delete_by_id: format!("DELETE FROM {table} WHERE {id} = $1"),
            count: format!("SELECT COUNT(*) FROM {table}"),
            exists_by_id: format!("SELECT COUNT(*) FROM {table} WHERE {id} = $1"),
            id_index,
        })
    }

    /// All property values, identifier included, in column order.
    pub fn insert_full_params<E: Entity>(&self, entity: &E) -> Vec<Value> {
        entity.property_values()
    }

    /// Property values without the identifier, for generated-key inserts.
    pub fn insert_generated_params<E: Entity>(&self, entity: &E) -> Vec<Value> {
        let mut values = entity.property_values();
        values.remove(self.id_index);
        values
    }

    /// Non-identifier values in column order, identifier last.
    pub fn update_params<E: Entity>(&self, entity: &E) -> Vec<Value> {
        let mut values = entity.property_values();
        let id = values.remove(self.id_index);
        values.push(id);
        values
    }
}

pub mod state;

use crate::core::{Result, Value};
use crate::mapper::PropertyValues;

pub use state::{EntityState, StateClassifier};

/// Describes one persistent property of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Column name the property maps to.
    pub column: &'static str,
    /// Whether the column may be NULL.
    pub nullable: bool,
    /// Whether the property has a usable default when the column is
    /// absent from a row.
    pub has_default: bool,
}

impl PropertyDescriptor {
    pub const fn required(column: &'static str) -> Self {
        Self {
            column,
            nullable: false,
            has_default: false,
        }
    }

    pub const fn nullable(column: &'static str) -> Self {
        Self {
            column,
            nullable: true,
            has_default: false,
        }
    }

    pub const fn defaulted(column: &'static str) -> Self {
        Self {
            column,
            nullable: false,
            has_default: true,
        }
    }
}

/// Per-entity-type persistence description.
///
/// Declared once per type as a `const` table; the repository derives its
/// CRUD statements from this, never from user SQL.
#[derive(Debug, Clone, Copy)]
pub struct EntityMetadata {
    /// Entity name, used in spans and error context.
    pub entity: &'static str,
    /// Backing table name.
    pub table: &'static str,
    /// Identifier column; must appear in `properties`.
    pub id_column: &'static str,
    /// All persistent properties in declaration order, identifier
    /// included.
    pub properties: &'static [PropertyDescriptor],
}

impl EntityMetadata {
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.properties.iter().map(|p| p.column)
    }

    pub fn id_property_index(&self) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| p.column == self.id_column)
    }
}

/// A domain type the repository can persist.
///
/// `property_values` must stay aligned with `metadata().properties`
/// order; the identifier is read and written through its own accessors
/// so the save path can reconcile generated keys.
pub trait Entity: Send + Sync + Sized + 'static {
    fn metadata() -> &'static EntityMetadata;

    /// Current identifier value. Unset (per [`Value::is_unset`]) means
    /// no identifier has been assigned yet.
    fn id_value(&self) -> Value;

    /// Writes a driver-generated identifier back onto the entity.
    fn assign_id(&mut self, id: Value);

    /// Property values aligned with `metadata().properties`.
    fn property_values(&self) -> Vec<Value>;

    /// Builds an instance from mapped row properties.
    fn hydrate(properties: &PropertyValues<'_>) -> Result<Self>;

    /// Self-reported newness, for types that track it themselves.
    /// `None` means the type has no such report.
    fn reports_new(&self) -> Option<bool> {
        None
    }
}

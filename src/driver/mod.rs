pub mod config;
pub mod stub;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{Row, Value};
use crate::query::BoundStatement;

pub use config::DriverConfig;

/// Failure surfaced by the driver collaborator.
///
/// The repository layer wraps these with invocation context but never
/// reinterprets them; connectivity problems, constraint violations and
/// syntax errors all pass through as the driver reported them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Connection failure: {0}")]
    Connection(String),

    #[error("Statement rejected: {0}")]
    Statement(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Driver failure: {0}")]
    Other(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Terminal outcome of an insert statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    pub rows_affected: u64,
    /// Generated identifier, when the driver produced one.
    pub generated_id: Option<Value>,
}

/// Hands out connections for single invocations.
///
/// Pooling, timeouts and transport concerns live behind this seam; the
/// repository layer acquires one connection per invocation and imposes
/// no timeouts of its own.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn acquire(&self) -> DriverResult<Box<dyn DriverConnection>>;
}

/// A non-blocking database connection.
///
/// Each invocation owns its connection exclusively for the duration of
/// the call; no statement or cursor is shared across invocations.
#[async_trait]
pub trait DriverConnection: Send + Sync + std::fmt::Debug {
    /// Runs a row-producing statement and returns its cursor.
    async fn run_query(&mut self, statement: &BoundStatement) -> DriverResult<Box<dyn RowCursor>>;

    /// Runs a data-modifying statement and reports the affected-row count.
    async fn run_update(&mut self, statement: &BoundStatement) -> DriverResult<u64>;

    /// Runs an insert statement, reporting the affected-row count and the
    /// generated identifier if the driver can return one.
    async fn run_insert(&mut self, statement: &BoundStatement) -> DriverResult<InsertOutcome>;
}

/// Pull-driven cursor over a statement's result rows.
///
/// Rows arrive in the order the driver emits them. The consumer pulls;
/// the driver is never asked for more rows than the consumer requested.
#[async_trait]
pub trait RowCursor: Send {
    async fn try_next(&mut self) -> DriverResult<Option<Row>>;

    /// Releases the statement and cursor resources. Must be idempotent;
    /// called on every exit path, including abandonment.
    fn release(&mut self);
}

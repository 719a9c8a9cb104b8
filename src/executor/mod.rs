pub mod stream;

use std::sync::Arc;
use tracing::{Level, event};
use uuid::Uuid;

use crate::core::{RepoError, Result, Row};
use crate::driver::{ConnectionFactory, DriverConnection, InsertOutcome};
use crate::query::{BoundStatement, ReturnShape};

pub use stream::{MappedStream, RowStream};

/// Identifies one repository invocation across spans and errors.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    query: String,
    invocation: Uuid,
}

impl ExecutionContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            invocation: Uuid::new_v4(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn invocation(&self) -> Uuid {
        self.invocation
    }
}

/// Terminal signal of a modifying query, projected per declared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOutcome {
    /// Completion only; the count was discarded.
    Done,
    /// Numeric affected-row count.
    Count(u64),
    /// Whether any row was affected.
    Affected(bool),
}

impl ModifyOutcome {
    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn any_affected(&self) -> Option<bool> {
        match self {
            Self::Affected(b) => Some(*b),
            _ => None,
        }
    }
}

/// Issues bound statements against driver connections.
///
/// One connection is acquired per invocation and owned by it
/// exclusively; read results come back as lazy streams, modifying
/// statements as a single terminal count. No call blocks the executing
/// context waiting on I/O.
#[derive(Clone)]
pub struct QueryExecutor {
    connections: Arc<dyn ConnectionFactory>,
}

impl QueryExecutor {
    pub fn new(connections: Arc<dyn ConnectionFactory>) -> Self {
        Self { connections }
    }

    async fn connect(&self, ctx: &ExecutionContext) -> Result<Box<dyn DriverConnection>> {
        self.connections
            .acquire()
            .await
            .map_err(|e| RepoError::execution(ctx.query(), ctx.invocation(), e))
    }

    /// Runs a read statement with "many" arity: an unbounded lazy
    /// sequence the caller pulls row by row.
    pub async fn fetch(
        &self,
        statement: &BoundStatement,
        ctx: &ExecutionContext,
    ) -> Result<RowStream> {
        let mut connection = self.connect(ctx).await?;
        let cursor = connection
            .run_query(statement)
            .await
            .map_err(|e| RepoError::execution(ctx.query(), ctx.invocation(), e))?;
        event!(Level::DEBUG, query = %ctx.query(), invocation = %ctx.invocation(), "cursor opened");
        Ok(RowStream::new(
            connection,
            cursor,
            ctx.query(),
            ctx.invocation(),
        ))
    }

    /// Runs a read statement with "single" arity: at most one row.
    ///
    /// A second row fails the invocation with `TooManyResults`; the
    /// cursor is released either way.
    pub async fn fetch_one(
        &self,
        statement: &BoundStatement,
        ctx: &ExecutionContext,
    ) -> Result<Option<Row>> {
        let mut rows = self.fetch(statement, ctx).await?;
        let first = rows.try_next().await?;
        if first.is_some() && rows.try_next().await?.is_some() {
            rows.abandon();
            return Err(RepoError::TooManyResults(ctx.query().to_string()));
        }
        Ok(first)
    }

    /// Runs a modifying statement. Never opens a cursor; the single
    /// terminal count is projected per the declared shape.
    pub async fn modify(
        &self,
        statement: &BoundStatement,
        shape: ReturnShape,
        ctx: &ExecutionContext,
    ) -> Result<ModifyOutcome> {
        let mut connection = self.connect(ctx).await?;
        let count = connection
            .run_update(statement)
            .await
            .map_err(|e| RepoError::execution(ctx.query(), ctx.invocation(), e))?;
        event!(
            Level::DEBUG,
            query = %ctx.query(),
            invocation = %ctx.invocation(),
            rows_affected = count,
            "modifying query completed"
        );
        match shape {
            ReturnShape::Void => Ok(ModifyOutcome::Done),
            ReturnShape::Count => Ok(ModifyOutcome::Count(count)),
            ReturnShape::Boolean => Ok(ModifyOutcome::Affected(count > 0)),
            other => Err(RepoError::Configuration(format!(
                "Query '{}' is modifying but declares shape {:?}",
                ctx.query(),
                other
            ))),
        }
    }

    /// Runs an insert statement, reporting the generated identifier when
    /// the driver produced one.
    pub async fn insert(
        &self,
        statement: &BoundStatement,
        ctx: &ExecutionContext,
    ) -> Result<InsertOutcome> {
        let mut connection = self.connect(ctx).await?;
        let outcome = connection
            .run_insert(statement)
            .await
            .map_err(|e| RepoError::execution(ctx.query(), ctx.invocation(), e))?;
        event!(
            Level::DEBUG,
            query = %ctx.query(),
            invocation = %ctx.invocation(),
            rows_affected = outcome.rows_affected,
            generated_id = outcome.generated_id.is_some(),
            "insert completed"
        );
        Ok(outcome)
    }
}

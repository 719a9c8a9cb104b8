//! Scripted in-memory driver.
//!
//! Stands in for the external driver collaborator in tests and demos:
//! results are queued ahead of time and consumed in execution order,
//! while every executed statement and cursor release is recorded for
//! inspection.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::{Row, Value};
use crate::driver::{
    ConnectionFactory, DriverConfig, DriverConnection, DriverError, DriverResult, InsertOutcome,
    RowCursor,
};
use crate::query::BoundStatement;

/// One scripted statement outcome.
#[derive(Debug, Clone)]
pub enum StubScript {
    /// A result set, delivered row by row as the consumer pulls.
    Rows(Vec<Row>),
    /// A result set that fails after the given rows were delivered.
    RowsThenError(Vec<Row>, DriverError),
    /// An affected-row count.
    Affected(u64),
    /// An insert outcome, optionally carrying a generated identifier.
    Insert {
        affected: u64,
        generated_id: Option<Value>,
    },
    /// Immediate failure.
    Fail(DriverError),
}

#[derive(Debug, Default)]
struct StubState {
    scripts: Mutex<VecDeque<StubScript>>,
    executed: Mutex<Vec<BoundStatement>>,
    cursors_opened: AtomicUsize,
    cursors_released: AtomicUsize,
    rows_delivered: AtomicUsize,
}

/// The stub connection factory. Cloning shares the script queue and the
/// recorded history.
#[derive(Clone, Default)]
pub struct StubDriver {
    state: Arc<StubState>,
    config: Option<DriverConfig>,
}

impl StubDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration on every acquisition, the way a real
    /// factory would before dialing.
    pub fn with_config(config: DriverConfig) -> Self {
        Self {
            state: Arc::default(),
            config: Some(config),
        }
    }

    pub fn script(&self, script: StubScript) {
        self.state.scripts.lock().unwrap().push_back(script);
    }

    pub fn script_rows(&self, rows: Vec<Row>) {
        self.script(StubScript::Rows(rows));
    }

    pub fn script_rows_then_error(&self, rows: Vec<Row>, error: DriverError) {
        self.script(StubScript::RowsThenError(rows, error));
    }

    pub fn script_affected(&self, count: u64) {
        self.script(StubScript::Affected(count));
    }

    pub fn script_insert(&self, affected: u64, generated_id: Option<Value>) {
        self.script(StubScript::Insert {
            affected,
            generated_id,
        });
    }

    pub fn script_error(&self, error: DriverError) {
        self.script(StubScript::Fail(error));
    }

    /// Every statement the driver was asked to run, in order.
    pub fn executed(&self) -> Vec<BoundStatement> {
        self.state.executed.lock().unwrap().clone()
    }

    pub fn cursors_opened(&self) -> usize {
        self.state.cursors_opened.load(Ordering::SeqCst)
    }

    pub fn cursors_released(&self) -> usize {
        self.state.cursors_released.load(Ordering::SeqCst)
    }

    /// Rows actually pulled off cursors so far.
    pub fn rows_delivered(&self) -> usize {
        self.state.rows_delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for StubDriver {
    async fn acquire(&self) -> DriverResult<Box<dyn DriverConnection>> {
        if let Some(config) = &self.config {
            config.validate().map_err(DriverError::Connection)?;
        }
        Ok(Box::new(StubConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct StubConnection {
    state: Arc<StubState>,
}

impl StubConnection {
    fn next_script(&self, statement: &BoundStatement) -> DriverResult<StubScript> {
        self.state.executed.lock().unwrap().push(statement.clone());
        self.state
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| {
                DriverError::Other(format!("No scripted result for: {}", statement.sql))
            })
    }
}

#[async_trait]
impl DriverConnection for StubConnection {
    async fn run_query(&mut self, statement: &BoundStatement) -> DriverResult<Box<dyn RowCursor>> {
        let (rows, trailing_error) = match self.next_script(statement)? {
            StubScript::Rows(rows) => (rows, None),
            StubScript::RowsThenError(rows, error) => (rows, Some(error)),
            StubScript::Fail(error) => return Err(error),
            StubScript::Affected(_) | StubScript::Insert { .. } => {
                return Err(DriverError::Statement(format!(
                    "Scripted a count outcome for a read statement: {}",
                    statement.sql
                )));
            }
        };

        self.state.cursors_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubCursor {
            rows: rows.into(),
            trailing_error,
            released: false,
            state: Arc::clone(&self.state),
        }))
    }

    async fn run_update(&mut self, statement: &BoundStatement) -> DriverResult<u64> {
        match self.next_script(statement)? {
            StubScript::Affected(count) => Ok(count),
            StubScript::Insert { affected, .. } => Ok(affected),
            // A driver attempting row delivery on a modifying statement
            // still reports only a count upstream.
            StubScript::Rows(rows) => Ok(rows.len() as u64),
            StubScript::RowsThenError(_, error) | StubScript::Fail(error) => Err(error),
        }
    }

    async fn run_insert(&mut self, statement: &BoundStatement) -> DriverResult<InsertOutcome> {
        match self.next_script(statement)? {
            StubScript::Insert {
                affected,
                generated_id,
            } => Ok(InsertOutcome {
                rows_affected: affected,
                generated_id,
            }),
            StubScript::Affected(count) => Ok(InsertOutcome {
                rows_affected: count,
                generated_id: None,
            }),
            StubScript::Fail(error) => Err(error),
            StubScript::Rows(_) | StubScript::RowsThenError(..) => {
                Err(DriverError::Statement(format!(
                    "Scripted a result set for an insert statement: {}",
                    statement.sql
                )))
            }
        }
    }
}

struct StubCursor {
    rows: VecDeque<Row>,
    trailing_error: Option<DriverError>,
    released: bool,
    state: Arc<StubState>,
}

#[async_trait]
impl RowCursor for StubCursor {
    async fn try_next(&mut self) -> DriverResult<Option<Row>> {
        if let Some(row) = self.rows.pop_front() {
            self.state.rows_delivered.fetch_add(1, Ordering::SeqCst);
            return Ok(Some(row));
        }
        if let Some(error) = self.trailing_error.take() {
            return Err(error);
        }
        Ok(None)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.cursors_released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub mod factory;
mod sql;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Level, event, info_span};

use crate::core::{RepoError, Result, Value};
use crate::entity::{Entity, EntityState, StateClassifier};
use crate::executor::{ExecutionContext, MappedStream, ModifyOutcome, QueryExecutor};
use crate::expr::ExpressionEvaluator;
use crate::mapper::{self, EntityShape};
use crate::query::{Arguments, BoundStatement, QueryDefinition, ReturnShape};

pub use factory::{RepositoryBuilder, RepositoryFactory, global, initialize};
pub(crate) use sql::CrudStatements;

/// Per-entity repository façade.
///
/// Every invocation runs the same pipeline: dispatch to the generic
/// CRUD path or a declared custom query, bind, execute, map, return.
/// Failures abort the invocation and surface the originating error; the
/// in-memory entity is never touched on a failed path.
pub struct Repository<E: Entity> {
    executor: QueryExecutor,
    evaluator: Arc<dyn ExpressionEvaluator>,
    classifier: StateClassifier<E>,
    queries: HashMap<String, Arc<QueryDefinition>>,
    crud: CrudStatements,
}

impl<E: Entity> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("queries", &self.queries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<E: Entity> Repository<E> {
    pub(crate) fn assemble(
        executor: QueryExecutor,
        evaluator: Arc<dyn ExpressionEvaluator>,
        classifier: StateClassifier<E>,
        queries: HashMap<String, Arc<QueryDefinition>>,
        crud: CrudStatements,
    ) -> Self {
        Self {
            executor,
            evaluator,
            classifier,
            queries,
            crud,
        }
    }

    fn context(&self, operation: &str) -> ExecutionContext {
        ExecutionContext::new(format!("{}.{operation}", E::metadata().entity))
    }

    pub async fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<E>> {
        let ctx = self.context("find_by_id");
        let span = info_span!(
            "repo.find_by_id",
            entity = E::metadata().entity,
            invocation = %ctx.invocation()
        );
        let _enter = span.enter();

        let statement = BoundStatement {
            sql: self.crud.select_by_id.clone(),
            params: vec![id.into()],
        };
        match self.executor.fetch_one(&statement, &ctx).await? {
            Some(row) => Ok(Some(mapper::map_entity(&row, EntityShape::Full)?)),
            None => Ok(None),
        }
    }

    /// All rows of the backing table as a lazy entity sequence.
    pub async fn find_all(&self) -> Result<MappedStream<E>> {
        let ctx = self.context("find_all");
        let statement = BoundStatement {
            sql: self.crud.select_all.clone(),
            params: Vec::new(),
        };
        let rows = self.executor.fetch(&statement, &ctx).await?;
        Ok(MappedStream::new(rows, |row| {
            mapper::map_entity(&row, EntityShape::Full)
        }))
    }

    /// Classifies the entity and routes to insert or update.
    ///
    /// On the insert path a driver-generated identifier is written back
    /// onto the entity after confirmed success, so re-classifying the
    /// same instance yields `Existing`.
    pub async fn save(&self, entity: &mut E) -> Result<()> {
        let state = self.classifier.classify(entity)?;
        let ctx = self.context("save");
        let span = info_span!(
            "repo.save",
            entity = E::metadata().entity,
            invocation = %ctx.invocation(),
            state = ?state
        );
        let _enter = span.enter();

        match state {
            EntityState::New => {
                let id_unset = entity.id_value().is_unset();
                let statement = if id_unset {
                    BoundStatement {
                        sql: self.crud.insert_generated.clone(),
                        params: self.crud.insert_generated_params(entity),
                    }
                } else {
                    BoundStatement {
                        sql: self.crud.insert_full.clone(),
                        params: self.crud.insert_full_params(entity),
                    }
                };
                let outcome = self.executor.insert(&statement, &ctx).await?;
                if id_unset {
                    if let Some(id) = outcome.generated_id {
                        entity.assign_id(id);
                    }
                }
                event!(Level::DEBUG, "entity inserted");
                Ok(())
            }
            EntityState::Existing => {
                let statement = BoundStatement {
                    sql: self.crud.update_by_id.clone(),
                    params: self.crud.update_params(entity),
                };
                // Zero affected rows is not an error for update.
                self.executor
                    .modify(&statement, ReturnShape::Count, &ctx)
                    .await?;
                event!(Level::DEBUG, "entity updated");
                Ok(())
            }
        }
    }

    /// Deletes the entity's row. Zero affected rows is not an error but
    /// is observable in the returned count.
    pub async fn delete(&self, entity: &E) -> Result<u64> {
        self.delete_by_id(entity.id_value()).await
    }

    pub async fn delete_by_id(&self, id: impl Into<Value>) -> Result<u64> {
        let ctx = self.context("delete");
        let span = info_span!(
            "repo.delete",
            entity = E::metadata().entity,
            invocation = %ctx.invocation()
        );
        let _enter = span.enter();

        let statement = BoundStatement {
            sql: self.crud.delete_by_id.clone(),
            params: vec![id.into()],
        };
        let outcome = self
            .executor
            .modify(&statement, ReturnShape::Count, &ctx)
            .await?;
        Ok(outcome.rows_affected().unwrap_or(0))
    }

    pub async fn count(&self) -> Result<u64> {
        let ctx = self.context("count");
        let statement = BoundStatement {
            sql: self.crud.count.clone(),
            params: Vec::new(),
        };
        let row = self
            .executor
            .fetch_one(&statement, &ctx)
            .await?
            .ok_or_else(|| RepoError::Mapping("Count query produced no row".to_string()))?;
        mapper::map_count(&row)
    }

    pub async fn exists_by_id(&self, id: impl Into<Value>) -> Result<bool> {
        let ctx = self.context("exists_by_id");
        let statement = BoundStatement {
            sql: self.crud.exists_by_id.clone(),
            params: vec![id.into()],
        };
        let row = self
            .executor
            .fetch_one(&statement, &ctx)
            .await?
            .ok_or_else(|| RepoError::Mapping("Exists query produced no row".to_string()))?;
        Ok(mapper::map_count(&row)? > 0)
    }

    /// Dispatches to a declared custom query by name.
    pub fn query(&self, name: &str) -> Result<QueryCall<'_, E>> {
        let definition = self.queries.get(name).cloned().ok_or_else(|| {
            RepoError::Configuration(format!(
                "No query named '{name}' registered for entity '{}'",
                E::metadata().entity
            ))
        })?;
        Ok(QueryCall {
            repository: self,
            definition,
            arguments: Arguments::new(),
        })
    }
}

/// One invocation of a declared custom query.
///
/// Arguments bind in declaration order; the terminal method must match
/// the declared return shape.
pub struct QueryCall<'r, E: Entity> {
    repository: &'r Repository<E>,
    definition: Arc<QueryDefinition>,
    arguments: Arguments,
}

impl<'r, E: Entity> std::fmt::Debug for QueryCall<'r, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCall")
            .field("definition", &self.definition)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

impl<'r, E: Entity> QueryCall<'r, E> {
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.push(name, value);
        self
    }

    fn entity_shape(&self) -> EntityShape {
        if self.definition.is_partial() {
            EntityShape::Partial
        } else {
            EntityShape::Full
        }
    }

    fn expect_shape(&self, wanted: ReturnShape) -> Result<()> {
        if self.definition.is_modifying() {
            return Err(RepoError::Configuration(format!(
                "Query '{}' is modifying; use execute()",
                self.definition.name()
            )));
        }
        if self.definition.shape() != wanted {
            return Err(RepoError::Configuration(format!(
                "Query '{}' declares shape {:?}, not {:?}",
                self.definition.name(),
                self.definition.shape(),
                wanted
            )));
        }
        Ok(())
    }

    fn prepare(&self) -> Result<(BoundStatement, ExecutionContext)> {
        let statement = self
            .definition
            .bind(&self.arguments, &*self.repository.evaluator)?;
        let ctx = ExecutionContext::new(format!(
            "{}.{}",
            E::metadata().entity,
            self.definition.name()
        ));
        Ok((statement, ctx))
    }

    /// Runs a [`ReturnShape::Single`] query.
    pub async fn fetch_one(self) -> Result<Option<E>> {
        self.expect_shape(ReturnShape::Single)?;
        let (statement, ctx) = self.prepare()?;
        let shape = self.entity_shape();
        match self.repository.executor.fetch_one(&statement, &ctx).await? {
            Some(row) => Ok(Some(mapper::map_entity(&row, shape)?)),
            None => Ok(None),
        }
    }

    /// Runs a [`ReturnShape::Collection`] query as a lazy sequence.
    pub async fn fetch_all(self) -> Result<MappedStream<E>> {
        self.expect_shape(ReturnShape::Collection)?;
        let (statement, ctx) = self.prepare()?;
        let shape = self.entity_shape();
        let rows = self.repository.executor.fetch(&statement, &ctx).await?;
        Ok(MappedStream::new(rows, move |row| {
            mapper::map_entity(&row, shape)
        }))
    }

    /// Runs a [`ReturnShape::Count`] read query.
    pub async fn fetch_count(self) -> Result<u64> {
        self.expect_shape(ReturnShape::Count)?;
        let (statement, ctx) = self.prepare()?;
        let row = self
            .repository
            .executor
            .fetch_one(&statement, &ctx)
            .await?
            .ok_or_else(|| RepoError::Mapping("Count query produced no row".to_string()))?;
        mapper::map_count(&row)
    }

    /// Runs a [`ReturnShape::Boolean`] read query.
    pub async fn fetch_exists(self) -> Result<bool> {
        self.expect_shape(ReturnShape::Boolean)?;
        let (statement, ctx) = self.prepare()?;
        let row = self
            .repository
            .executor
            .fetch_one(&statement, &ctx)
            .await?
            .ok_or_else(|| RepoError::Mapping("Boolean query produced no row".to_string()))?;
        mapper::map_bool(&row)
    }

    /// Runs a modifying query, projecting the terminal count per the
    /// declared shape. Execution errors surface even for the Void shape;
    /// only the successful completion signal is discarded.
    pub async fn execute(self) -> Result<ModifyOutcome> {
        if !self.definition.is_modifying() {
            return Err(RepoError::Configuration(format!(
                "Query '{}' is not modifying; use a fetch method",
                self.definition.name()
            )));
        }
        let (statement, ctx) = self.prepare()?;
        let span = info_span!(
            "repo.custom_modify",
            entity = E::metadata().entity,
            query = self.definition.name(),
            invocation = %ctx.invocation()
        );
        let _enter = span.enter();
        self.repository
            .executor
            .modify(&statement, self.definition.shape(), &ctx)
            .await
    }
}

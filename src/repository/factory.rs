use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::{RepoError, Result};
use crate::driver::ConnectionFactory;
use crate::entity::{Entity, StateClassifier};
use crate::executor::QueryExecutor;
use crate::expr::{ExpressionEvaluator, NoExpressions};
use crate::query::QueryDefinition;
use crate::repository::{CrudStatements, Repository};

lazy_static! {
    static ref GLOBAL_FACTORY: RwLock<Option<Arc<RepositoryFactory>>> = RwLock::new(None);
}

/// Registers the process-wide repository factory.
///
/// Intended for the application bootstrap step; repositories can also be
/// built from a locally held factory without touching the global.
pub fn initialize(factory: RepositoryFactory) {
    *GLOBAL_FACTORY.write().expect("factory registry poisoned") = Some(Arc::new(factory));
}

/// The process-wide factory registered through [`initialize`].
pub fn global() -> Result<Arc<RepositoryFactory>> {
    GLOBAL_FACTORY
        .read()
        .expect("factory registry poisoned")
        .clone()
        .ok_or_else(|| {
            RepoError::Configuration(
                "No global repository factory registered; call repository::initialize first"
                    .to_string(),
            )
        })
}

/// Builds repositories over one connection factory and one expression
/// evaluator.
pub struct RepositoryFactory {
    connections: Arc<dyn ConnectionFactory>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl RepositoryFactory {
    pub fn new(connections: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            connections,
            evaluator: Arc::new(NoExpressions),
        }
    }

    /// Wires in the external expression-language evaluator used by
    /// `:#{expr}` placeholders.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Starts declaring a repository for one entity type.
    pub fn repository<E: Entity>(&self) -> RepositoryBuilder<E> {
        RepositoryBuilder {
            executor: QueryExecutor::new(Arc::clone(&self.connections)),
            evaluator: Arc::clone(&self.evaluator),
            classifier: StateClassifier::default(),
            definitions: Vec::new(),
        }
    }
}

/// Registration surface for one repository.
///
/// Custom queries and the classification strategy are declared here,
/// then validated as a whole by [`build`](Self::build); declaration
/// mistakes are configuration errors at registration time, not call
/// time.
pub struct RepositoryBuilder<E: Entity> {
    executor: QueryExecutor,
    evaluator: Arc<dyn ExpressionEvaluator>,
    classifier: StateClassifier<E>,
    definitions: Vec<QueryDefinition>,
}

impl<E: Entity> RepositoryBuilder<E> {
    pub fn classify_with(mut self, classifier: StateClassifier<E>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn query(mut self, definition: QueryDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn build(self) -> Result<Repository<E>> {
        let crud = CrudStatements::build(E::metadata())?;

        let mut queries = HashMap::with_capacity(self.definitions.len());
        for definition in self.definitions {
            definition.validate()?;
            let name = definition.name().to_string();
            if queries.insert(name.clone(), Arc::new(definition)).is_some() {
                return Err(RepoError::Configuration(format!(
                    "Query '{name}' declared twice for entity '{}'",
                    E::metadata().entity
                )));
            }
        }

        Ok(Repository::assemble(
            self.executor,
            self.evaluator,
            self.classifier,
            queries,
            crud,
        ))
    }
}

//! A reactive repository layer.
//!
//! Declared query definitions on per-entity repositories are bound to
//! positional SQL and executed against a pluggable non-blocking driver;
//! results stream back as lazy asynchronous sequences.
//!
//! The crate deliberately owns only the repository layer. The database
//! driver (with its pooling and timeouts) and the expression-language
//! evaluator are external collaborators wired in through the
//! [`ConnectionFactory`] and [`ExpressionEvaluator`] seams.
//!
//! # Example
//!
//! ```ignore
//! use repoflow::{QueryDefinition, RepositoryFactory};
//! use std::sync::Arc;
//!
//! let factory = RepositoryFactory::new(Arc::new(my_driver));
//! let people = factory
//!     .repository::<Person>()
//!     .query(QueryDefinition::new(
//!         "by_lastname",
//!         "SELECT * FROM person WHERE lastname = :lastname",
//!     )?)
//!     .build()?;
//!
//! let mut rows = people.query("by_lastname")?
//!     .bind("lastname", "Doe")
//!     .fetch_all()
//!     .await?;
//! while let Some(person) = rows.try_next().await? {
//!     println!("{person:?}");
//! }
//! ```

pub mod core;
pub mod driver;
pub mod entity;
pub mod executor;
pub mod expr;
pub mod mapper;
pub mod query;
pub mod repository;

pub mod prelude;

// Re-export main types for convenience
pub use crate::core::{RepoError, Result, Row, Value};
pub use entity::{Entity, EntityMetadata, EntityState, PropertyDescriptor, StateClassifier};
pub use executor::{ExecutionContext, MappedStream, ModifyOutcome, QueryExecutor, RowStream};
pub use query::{Arguments, BoundStatement, QueryDefinition, ReturnShape};
pub use repository::{Repository, RepositoryBuilder, RepositoryFactory};

// Re-export the collaborator seams
pub use driver::{
    ConnectionFactory, DriverConfig, DriverConnection, DriverError, InsertOutcome, RowCursor,
};
pub use expr::{EvaluationError, ExpressionEvaluator, FnEvaluator};

//! Convenience re-exports for application code.

pub use crate::core::{RepoError, Result, Row, Value};
pub use crate::driver::{ConnectionFactory, DriverConfig, DriverError};
pub use crate::entity::{
    Entity, EntityMetadata, EntityState, PropertyDescriptor, StateClassifier,
};
pub use crate::executor::{MappedStream, ModifyOutcome, RowStream};
pub use crate::expr::{ExpressionEvaluator, FnEvaluator};
pub use crate::mapper::PropertyValues;
pub use crate::query::{Arguments, QueryDefinition, ReturnShape};
pub use crate::repository::{Repository, RepositoryBuilder, RepositoryFactory};

use std::fmt;
use std::sync::Arc;

use crate::core::{RepoError, Result};
use crate::entity::Entity;

/// Transient classification of an entity instance, computed per call and
/// never cached on the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// The instance has not been persisted; save routes to insert.
    New,
    /// The instance is already persisted; save routes to update.
    Existing,
}

/// Newness-detection strategy, selected per repository at registration
/// time and applied uniformly to every save against it.
pub enum StateClassifier<E: Entity> {
    /// Default: `New` iff the identifier holds its zero/absent value.
    IdInspection,
    /// Delegates verbatim to the entity's own newness report, bypassing
    /// identifier inspection entirely.
    SelfReporting,
    /// Injected classification logic.
    Custom(Arc<dyn Fn(&E) -> EntityState + Send + Sync>),
}

impl<E: Entity> StateClassifier<E> {
    pub fn custom(f: impl Fn(&E) -> EntityState + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn classify(&self, entity: &E) -> Result<EntityState> {
        match self {
            Self::IdInspection => Ok(if entity.id_value().is_unset() {
                EntityState::New
            } else {
                EntityState::Existing
            }),
            Self::SelfReporting => entity
                .reports_new()
                .map(|is_new| {
                    if is_new {
                        EntityState::New
                    } else {
                        EntityState::Existing
                    }
                })
                .ok_or_else(|| {
                    RepoError::Configuration(format!(
                        "Entity '{}' is registered as self-reporting but reports no newness",
                        E::metadata().entity
                    ))
                }),
            Self::Custom(f) => Ok(f(entity)),
        }
    }
}

impl<E: Entity> Default for StateClassifier<E> {
    fn default() -> Self {
        Self::IdInspection
    }
}

impl<E: Entity> Clone for StateClassifier<E> {
    fn clone(&self) -> Self {
        match self {
            Self::IdInspection => Self::IdInspection,
            Self::SelfReporting => Self::SelfReporting,
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<E: Entity> fmt::Debug for StateClassifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdInspection => f.write_str("StateClassifier::IdInspection"),
            Self::SelfReporting => f.write_str("StateClassifier::SelfReporting"),
            Self::Custom(_) => f.write_str("StateClassifier::Custom"),
        }
    }
}

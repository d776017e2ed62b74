//! Error types for Tributary operations.
//!
//! Errors fall into two groups:
//!
//! - **Rejections** (the caller's input cannot be applied): cycles, unresolved
//!   references under the strict policy, blocked deletes, unknown or duplicate
//!   entities. These leave the store exactly as it was before the operation.
//! - **Infrastructure failures**: database, I/O, serialization and
//!   configuration problems. These are propagated verbatim; Tributary never
//!   retries on its own.
//!
//! Every mutating operation runs inside a single transaction, so neither group
//! can leave a partially written edge set behind.

use thiserror::Error;

use crate::types::{DependencyPath, EntityId};

/// Result type for Tributary operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Tributary operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Saving the entity would make some dependency path revisit an entity.
    #[error("dependency contains cycle: {path}")]
    CyclicDependency {
        /// The first offending path that was found.
        path: DependencyPath,
    },

    /// The entity references names that do not exist in its scope.
    ///
    /// Only raised under `ReferencePolicy::Reject`.
    #[error("unresolved references: {}", names.join(", "))]
    UnresolvedReference {
        /// Names that could not be resolved, sorted.
        names: Vec<String>,
    },

    /// Deleting the entity is blocked because other entities depend on it.
    #[error("entity {name} is depended on by: {}", dependants.join(", "))]
    HasDependants {
        /// Name of the entity that was going to be deleted.
        name: String,
        /// Names of the entities that depend on it.
        dependants: Vec<String>,
    },

    /// Requested entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same kind, scope and name already exists
    #[error("duplicate entity: {0}")]
    Duplicate(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored column or manifest could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal invariant broken (e.g. a poisoned lock)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a cycle error for the given path.
    #[must_use]
    pub fn cycle(path: DependencyPath) -> Self {
        Self::CyclicDependency { path }
    }

    /// Build a not-found error for an entity ID.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::NotFound(format!("entity id: {id}"))
    }

    /// Returns `true` if the operation was rejected because of its input.
    ///
    /// Rejections are safe to report to the user as-is; the store is unchanged.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency { .. }
                | Self::UnresolvedReference { .. }
                | Self::HasDependants { .. }
                | Self::NotFound(_)
                | Self::Duplicate(_)
        )
    }

    /// Returns `true` if the operation failed because of the environment
    /// (database, file system, configuration).
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        !self.is_rejection()
    }
}

//! The dependency-graph engine.
//!
//! One generic engine serves every entity kind. Callers describe their entity
//! records through the [`Node`] trait and their storage through
//! [`GraphStore`](crate::store::GraphStore); the engine never opens or commits
//! transactions itself.
//!
//! ## Save flow
//!
//! ```text
//! scan ──> resolve ──> compose (cycle check) ──> reconcile own edges
//!                                                   │
//!                       commit <── reconcile <── propagate (cycle check)
//! ```
//!
//! Any error on the way leaves the caller's transaction uncommitted.

pub mod audit;
pub mod closure;
pub mod cycle;
pub mod order;
pub mod propagate;
pub mod reconcile;
pub mod scanner;

use tracing::{debug, info};

use crate::config::{DeletePolicy, ReferencePolicy};
use crate::error::{Error, Result};
use crate::store::{EdgeFilter, GraphStore};
use crate::template::Attributes;
use crate::types::{
    DeleteOutcome, DependencyEdge, Entity, EntityId, Kind, ReconcileStats, Scope,
};

pub use audit::audit;
pub use closure::{build_closure, compose, Closure};
pub use cycle::check_cycle;
pub use order::deployment_order;
pub use propagate::{propagate, rebuild_routes};
pub use reconcile::{reconcile, reconcile_outbound};
pub use scanner::{attribute_reference_names, direct_reference_names};

/// Capabilities the engine needs from an entity record.
pub trait Node {
    /// Database ID.
    fn id(&self) -> EntityId;

    /// Kind; names resolve against entities of the same kind only.
    fn kind(&self) -> Kind;

    /// Scope names are unique within.
    fn scope(&self) -> &Scope;

    /// Name other entities reference this one by.
    fn name(&self) -> &str;

    /// Templated attributes to scan for references.
    fn attributes(&self) -> &Attributes;

    /// Names declared as dependencies outside the attributes.
    fn explicit_dependencies(&self) -> &[String] {
        &[]
    }
}

impl Node for Entity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> Kind {
        self.kind
    }

    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn explicit_dependencies(&self) -> &[String] {
        &self.explicit_dependencies
    }
}

/// What a save did to the edge table.
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// The node's complete outbound closure after the save.
    pub edges: Vec<DependencyEdge>,
    /// Referenced names that were dropped because they did not resolve.
    pub unresolved: Vec<String>,
    /// Changes to the node's own edges.
    pub own: ReconcileStats,
    /// Changes to dependants' edges.
    pub dependants: ReconcileStats,
}

/// Recompute `node`'s closure and bring the store in line with it.
///
/// Must run inside the caller's transaction, after the node's record has been
/// written. On error the caller must roll back: earlier steps may already
/// have written edges.
///
/// # Errors
///
/// - `Error::CyclicDependency` from closure building or propagation
/// - `Error::UnresolvedReference` under `ReferencePolicy::Reject`
/// - storage errors, unchanged
pub fn save<N, S>(store: &S, node: &N, references: ReferencePolicy) -> Result<SaveReport>
where
    N: Node + ?Sized,
    S: GraphStore + ?Sized,
{
    let Closure { edges, unresolved } = build_closure(store, node, references)?;
    let own = reconcile_outbound(store, node.id(), &edges)?;
    let dependants = propagate(store, node.id(), &edges)?;

    info!(
        kind = %node.kind(),
        scope = %node.scope(),
        entity = node.name(),
        edges = edges.len(),
        own_inserted = own.inserted,
        own_deleted = own.deleted,
        dependants_inserted = dependants.inserted,
        dependants_deleted = dependants.deleted,
        "Saved entity dependencies"
    );

    Ok(SaveReport {
        edges,
        unresolved,
        own,
        dependants,
    })
}

/// Remove `node`'s edges according to `policy`.
///
/// Returns the IDs whose entity records the caller must delete (the node
/// first, then cascaded dependants) and how many edges were removed.
///
/// # Errors
///
/// `Error::HasDependants` under `DeletePolicy::Block` when anything depends on
/// the node; storage errors unchanged.
pub fn delete<N, S>(store: &S, node: &N, policy: DeletePolicy) -> Result<DeleteOutcome>
where
    N: Node + ?Sized,
    S: GraphStore + ?Sized,
{
    let id = node.id();
    let mut removed = vec![id];

    match policy {
        DeletePolicy::Block => {
            let dependants = store.dependant_names(id)?;
            if !dependants.is_empty() {
                return Err(Error::HasDependants {
                    name: node.name().to_string(),
                    dependants,
                });
            }
        }
        DeletePolicy::Orphan => {}
        DeletePolicy::Cascade => removed.extend(store.dependant_ids(&[id])?),
    }

    let mut edges_removed = 0;
    for target in &removed {
        edges_removed += store.delete_edges(&EdgeFilter::Containing(*target))?;
    }

    debug!(
        entity = node.name(),
        ?policy,
        removed = removed.len(),
        edges_removed,
        "Removed entity edges"
    );

    Ok(DeleteOutcome {
        removed,
        edges_removed,
    })
}

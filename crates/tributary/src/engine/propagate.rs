//! Repair of dependants' routes after an entity's closure changed.
//!
//! Every stored path spells out the whole chain, so a dependant `S` that
//! reaches `E` through any number of hops already has an edge whose path
//! contains `E`. Rewriting those edges in one pass fixes every transitive
//! dependant; no recursion over dependants is needed.
//!
//! ```text
//! old:  (S, D_old, [D_old … E … S])       right = [E … S]
//! new:  (E, D_new, [D_new … E])
//! out:  (S, D_new, [D_new …] ++ right)
//! ```

use tracing::{debug, warn};

use super::closure::EdgeSet;
use super::cycle::ensure_acyclic;
use super::reconcile::reconcile;
use crate::error::Result;
use crate::store::GraphStore;
use crate::types::{DependencyEdge, DependencyPath, EntityId, ReconcileStats};

/// Rebuild dependants' edges through `entity_id` from `new_edges`.
///
/// Pure: the reconstructed set for the given old routes. Each reconstructed
/// edge keeps the type of the route it replaces, since the last hop into the
/// dependant is unchanged.
///
/// # Errors
///
/// `Error::CyclicDependency` on the first reconstructed path that revisits an entity.
pub fn rebuild_routes(
    entity_id: EntityId,
    old_routes: &[DependencyEdge],
    new_edges: &[DependencyEdge],
) -> Result<Vec<DependencyEdge>> {
    let mut rebuilt = EdgeSet::default();

    for old in old_routes {
        let Some(right) = old.path.suffix_from(entity_id) else {
            warn!(
                entity_id = %entity_id,
                owner = %old.entity_id,
                path = %old.path,
                "Route does not pass through entity; leaving it unchanged"
            );
            continue;
        };

        for upstream in new_edges {
            let path = DependencyPath::splice(&upstream.path, right);
            let Some(edge) = DependencyEdge::along(old.entity_id, path, old.dep_type) else {
                continue;
            };
            ensure_acyclic(&edge)?;
            rebuilt.insert(edge);
        }
    }

    Ok(rebuilt.into_vec())
}

/// Propagate `entity_id`'s new closure to every entity that depends on it.
///
/// Routes that no longer exist are deleted; routes that do are upserted.
pub fn propagate<S: GraphStore + ?Sized>(
    store: &S,
    entity_id: EntityId,
    new_edges: &[DependencyEdge],
) -> Result<ReconcileStats> {
    let old_routes: Vec<DependencyEdge> = store
        .query_containing(entity_id)?
        .into_iter()
        .filter(|e| e.entity_id != entity_id)
        .collect();

    if old_routes.is_empty() {
        return Ok(ReconcileStats::default());
    }

    let rebuilt = rebuild_routes(entity_id, &old_routes, new_edges)?;
    let stats = reconcile(store, &old_routes, &rebuilt)?;

    debug!(
        entity_id = %entity_id,
        routes = old_routes.len(),
        rebuilt = rebuilt.len(),
        inserted = stats.inserted,
        deleted = stats.deleted,
        "Propagated closure to dependants"
    );
    Ok(stats)
}

//! Reconciliation of stored edges against a freshly computed set.
//!
//! Insert everything new first, then delete whatever old edge is no longer
//! produced. Re-applying an identical set writes nothing and deletes nothing.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::store::{EdgeFilter, GraphStore};
use crate::types::{DependencyEdge, EdgeKey, EntityId, ReconcileStats};

/// Replace `old` with `new` in the store.
///
/// `old` must be what the store currently holds for the affected slice of the
/// table; edges outside it are never touched.
pub fn reconcile<S: GraphStore + ?Sized>(
    store: &S,
    old: &[DependencyEdge],
    new: &[DependencyEdge],
) -> Result<ReconcileStats> {
    let inserted = store.upsert_edges(new)?;

    let keep: HashSet<EdgeKey> = new.iter().map(DependencyEdge::key).collect();
    let mut deleted = 0;
    for stale in old.iter().filter(|e| !keep.contains(&e.key())) {
        deleted += store.delete_edges(&EdgeFilter::key_of(stale))?;
    }

    Ok(ReconcileStats { inserted, deleted })
}

/// Make `entity_id`'s stored outbound edges equal to `new`.
pub fn reconcile_outbound<S: GraphStore + ?Sized>(
    store: &S,
    entity_id: EntityId,
    new: &[DependencyEdge],
) -> Result<ReconcileStats> {
    let old = store.query_outbound(entity_id)?;
    let stats = reconcile(store, &old, new)?;

    debug!(
        entity_id = %entity_id,
        inserted = stats.inserted,
        deleted = stats.deleted,
        "Reconciled outbound edges"
    );
    Ok(stats)
}

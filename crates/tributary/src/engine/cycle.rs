//! Cycle detection on materialized paths.
//!
//! Every stored path already spells out a full route, so a cycle is simply an
//! ID that appears twice in one path. No graph traversal is needed.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{DependencyEdge, EntityId};

/// Returns `true` if any ID repeats within `path`.
#[must_use]
pub fn check_cycle(path: &[EntityId]) -> bool {
    let mut seen = HashSet::with_capacity(path.len());
    !path.iter().all(|id| seen.insert(*id))
}

/// Reject `edge` with `Error::CyclicDependency` if its path revisits an entity.
pub(crate) fn ensure_acyclic(edge: &DependencyEdge) -> Result<()> {
    if edge.path.has_cycle() {
        tracing::debug!(
            entity_id = %edge.entity_id,
            path = %edge.path,
            "Rejecting cyclic dependency path"
        );
        return Err(Error::cycle(edge.path.clone()));
    }
    Ok(())
}

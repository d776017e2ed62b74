//! Integrity audit of the closure table.
//!
//! Checks the invariants every stored edge must satisfy. The engine never
//! writes an edge that fails them, so a violation points at manual edits,
//! an interrupted migration, or a bug.

use std::collections::HashSet;

use tracing::warn;

use crate::types::{AuditReport, DependencyEdge, EntityId, Violation, ViolationKind};

/// Audit `edges` against the set of existing entity IDs.
#[must_use]
pub fn audit(entity_ids: &[EntityId], edges: &[DependencyEdge]) -> AuditReport {
    let known: HashSet<EntityId> = entity_ids.iter().copied().collect();
    let mut with_self_edge = HashSet::new();
    let mut violations = Vec::new();

    for edge in edges {
        let mut flag = |kind| {
            violations.push(Violation {
                edge: Some(edge.clone()),
                entity_id: edge.entity_id,
                kind,
            });
        };

        if edge.path.has_cycle() {
            flag(ViolationKind::CyclicPath);
        }
        if edge.path.first() != Some(edge.dependency_id) || edge.path.last() != Some(edge.entity_id)
        {
            flag(ViolationKind::BadEndpoints);
        }
        if edge.path.ids().iter().any(|id| !known.contains(id)) {
            flag(ViolationKind::DanglingId);
        }
        if edge.is_self() && edge.path.len() == 1 {
            with_self_edge.insert(edge.entity_id);
        }
    }

    for id in entity_ids.iter().filter(|id| !with_self_edge.contains(id)) {
        violations.push(Violation {
            edge: None,
            entity_id: *id,
            kind: ViolationKind::MissingSelfEdge,
        });
    }

    for v in &violations {
        warn!(entity_id = %v.entity_id, violation = %v.kind, "Closure invariant violated");
    }

    AuditReport {
        entities_checked: entity_ids.len(),
        edges_checked: edges.len(),
        violations,
    }
}

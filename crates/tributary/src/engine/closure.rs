//! Closure construction for a single entity.
//!
//! The referenced entities' closures are already complete, so one level of
//! composition yields the entity's exact transitive closure:
//!
//! ```text
//! closure(E) = {E, E, [E]}
//!            ∪ { (E, D, P ++ [E]) | R ∈ refs(E), (R, D, P) ∈ closure(R) }
//! ```
//!
//! Any composed path that revisits an entity means saving E would close a
//! cycle; the whole computation is rejected and nothing is returned.

use std::collections::HashMap;

use tracing::debug;

use super::cycle::ensure_acyclic;
use super::scanner::DirectReferences;
use super::Node;
use crate::config::ReferencePolicy;
use crate::error::{Error, Result};
use crate::store::{GraphStore, ResolvedEntity};
use crate::types::{DependencyEdge, DependencyType, EdgeKey, EntityId};

/// An entity's freshly computed outbound closure.
#[derive(Debug, Clone, Default)]
pub struct Closure {
    /// Every outbound edge, self-edge first, deduplicated by natural key.
    pub edges: Vec<DependencyEdge>,
    /// Referenced names that did not resolve in the entity's scope.
    pub unresolved: Vec<String>,
}

/// Ordered, key-deduplicated edge collection.
///
/// When the same route arrives twice with different types, `Implicit` wins:
/// an attribute reference is the stronger declaration.
#[derive(Debug, Default)]
pub(crate) struct EdgeSet {
    edges: Vec<DependencyEdge>,
    index: HashMap<EdgeKey, usize>,
}

impl EdgeSet {
    pub(crate) fn insert(&mut self, edge: DependencyEdge) {
        match self.index.get(&edge.key()) {
            Some(&i) => {
                if edge.dep_type == DependencyType::Implicit {
                    self.edges[i].dep_type = DependencyType::Implicit;
                }
            }
            None => {
                self.index.insert(edge.key(), self.edges.len());
                self.edges.push(edge);
            }
        }
    }

    pub(crate) fn into_vec(self) -> Vec<DependencyEdge> {
        self.edges
    }
}

/// Compose `entity_id`'s closure from its resolved direct references.
///
/// Each reference carries the type of the hop into `entity_id`.
///
/// # Errors
///
/// `Error::CyclicDependency` on the first composed path that revisits an entity.
pub fn compose(
    entity_id: EntityId,
    references: &[(ResolvedEntity, DependencyType)],
) -> Result<Vec<DependencyEdge>> {
    let mut edges = EdgeSet::default();
    edges.insert(DependencyEdge::self_edge(entity_id));

    for (referenced, dep_type) in references {
        for upstream in &referenced.closure {
            let candidate = DependencyEdge {
                entity_id,
                dependency_id: upstream.dependency_id,
                path: upstream.path.extended(entity_id),
                dep_type: *dep_type,
            };
            ensure_acyclic(&candidate)?;
            edges.insert(candidate);
        }
    }

    Ok(edges.into_vec())
}

/// Scan, resolve and compose the closure of `node`.
///
/// Reads only; nothing is written to `store`.
///
/// # Errors
///
/// - `Error::CyclicDependency` if any composed path revisits an entity
/// - `Error::UnresolvedReference` if a name does not resolve and `policy` is `Reject`
/// - storage errors, unchanged
pub fn build_closure<N, S>(store: &S, node: &N, policy: ReferencePolicy) -> Result<Closure>
where
    N: Node + ?Sized,
    S: GraphStore + ?Sized,
{
    let refs = DirectReferences::of(node);
    if refs.is_empty() {
        return Ok(Closure {
            edges: vec![DependencyEdge::self_edge(node.id())],
            unresolved: Vec::new(),
        });
    }

    let names = refs.name_set();
    let resolved = store.find_by_names_with_closure(node.kind(), node.scope(), &names)?;

    let unresolved: Vec<String> = names
        .iter()
        .filter(|name| !resolved.iter().any(|r| &r.name == *name))
        .cloned()
        .collect();

    if !unresolved.is_empty() {
        match policy {
            ReferencePolicy::Ignore => debug!(
                entity = node.name(),
                unresolved = ?unresolved,
                "Dropping unresolved references"
            ),
            ReferencePolicy::Reject => {
                return Err(Error::UnresolvedReference { names: unresolved });
            }
        }
    }

    let references: Vec<(ResolvedEntity, DependencyType)> = resolved
        .into_iter()
        .map(|r| {
            let dep_type = refs.type_for(&r.name);
            (r, dep_type)
        })
        .collect();

    let edges = compose(node.id(), &references)?;
    debug!(
        entity = node.name(),
        entity_id = %node.id(),
        direct = references.len(),
        edges = edges.len(),
        "Built dependency closure"
    );

    Ok(Closure { edges, unresolved })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DependencyPath;

    fn path(ids: &[i64]) -> DependencyPath {
        DependencyPath::from(ids.iter().copied().map(EntityId).collect::<Vec<_>>())
    }

    fn resolved(id: i64, name: &str, paths: &[&[i64]]) -> ResolvedEntity {
        ResolvedEntity {
            id: EntityId(id),
            name: name.into(),
            closure: paths
                .iter()
                .map(|p| {
                    DependencyEdge::along(EntityId(id), path(p), DependencyType::Implicit).unwrap()
                })
                .collect(),
        }
    }

    #[test]
    fn no_references_yields_self_edge_only() {
        let edges = compose(EntityId(1), &[]).unwrap();
        assert_eq!(edges, vec![DependencyEdge::self_edge(EntityId(1))]);
    }

    #[test]
    fn composes_one_level_over_complete_closures() {
        // 2 depends on 1; 3 references 2.
        let r2 = resolved(2, "b", &[&[2], &[1, 2]]);
        let edges = compose(EntityId(3), &[(r2, DependencyType::Implicit)]).unwrap();

        let paths: Vec<_> = edges.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![path(&[3]), path(&[2, 3]), path(&[1, 2, 3])]);
        assert_eq!(edges[2].dependency_id, EntityId(1));
        assert!(edges.iter().all(|e| e.entity_id == EntityId(3)));
    }

    #[test]
    fn keeps_distinct_routes_to_same_dependency() {
        // Diamond: 4 -> {2, 3} -> 1
        let r2 = resolved(2, "b", &[&[2], &[1, 2]]);
        let r3 = resolved(3, "c", &[&[3], &[1, 3]]);
        let edges = compose(
            EntityId(4),
            &[(r2, DependencyType::Implicit), (r3, DependencyType::Implicit)],
        )
        .unwrap();

        let to_root: Vec<_> = edges
            .iter()
            .filter(|e| e.dependency_id == EntityId(1))
            .map(|e| e.path.clone())
            .collect();
        assert_eq!(to_root, vec![path(&[1, 2, 4]), path(&[1, 3, 4])]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let me = resolved(5, "me", &[&[5]]);
        let err = compose(EntityId(5), &[(me, DependencyType::Implicit)]).unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { path: ref cycle } if *cycle == path(&[5, 5])));
    }

    #[test]
    fn upstream_containing_self_is_a_cycle() {
        // 2's closure already routes through 1; 1 now references 2.
        let r2 = resolved(2, "b", &[&[2], &[1, 2]]);
        let err = compose(EntityId(1), &[(r2, DependencyType::Implicit)]).unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { .. }));
    }

    #[test]
    fn duplicate_route_prefers_implicit_type() {
        let mut set = EdgeSet::default();
        let explicit =
            DependencyEdge::along(EntityId(2), path(&[1, 2]), DependencyType::Explicit).unwrap();
        let implicit =
            DependencyEdge::along(EntityId(2), path(&[1, 2]), DependencyType::Implicit).unwrap();
        set.insert(explicit);
        set.insert(implicit);
        let edges = set.into_vec();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].dep_type, DependencyType::Implicit);
    }
}

//! Deployment ordering using petgraph.
//!
//! Only direct edges (paths of length two) are loaded into the graph; the
//! transitive ones add nothing to a topological order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{Error, Result};
use crate::types::{DependencyEdge, DependencyPath, Entity, EntityId};

/// Order `entities` so that every entity comes after everything it depends on.
///
/// Edges naming entities outside `entities` are ignored. Among entities that
/// are ready at the same time, the one earlier in `entities` goes first, so
/// passing entities sorted by name gives a stable result.
///
/// # Errors
///
/// `Error::CyclicDependency` if the stored direct edges form a cycle, which
/// indicates a corrupted edge table.
pub fn deployment_order<'a>(
    entities: &'a [Entity],
    edges: &[DependencyEdge],
) -> Result<Vec<&'a Entity>> {
    // Node indices match positions in `entities`.
    let mut graph: DiGraph<EntityId, ()> = DiGraph::with_capacity(entities.len(), edges.len());
    let node_map: HashMap<EntityId, NodeIndex> = entities
        .iter()
        .map(|e| (e.id, graph.add_node(e.id)))
        .collect();

    // Edge direction: dependency -> dependant.
    for edge in edges.iter().filter(|e| e.path.len() == 2) {
        if let (Some(&from), Some(&to)) = (
            node_map.get(&edge.dependency_id),
            node_map.get(&edge.entity_id),
        ) {
            graph.update_edge(from, to, ());
        }
    }

    let mut pending: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(entities.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(&entities[i]);
        for next in graph.neighbors_directed(NodeIndex::new(i), Direction::Outgoing) {
            let count = &mut pending[next.index()];
            *count -= 1;
            if *count == 0 {
                ready.push(Reverse(next.index()));
            }
        }
    }

    if order.len() < entities.len() {
        let stuck = pending
            .iter()
            .position(|count| *count > 0)
            .map_or(entities[0].id, |i| entities[i].id);
        return Err(Error::cycle(DependencyPath::single(stuck)));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Attributes;
    use crate::types::{DependencyType, Kind, Scope};

    fn entity(id: i64, name: &str) -> Entity {
        Entity {
            id: EntityId(id),
            kind: Kind::Resource,
            scope: Scope::new("p", "dev"),
            name: name.into(),
            attributes: Attributes::new(),
            explicit_dependencies: Vec::new(),
        }
    }

    fn edge(owner: i64, ids: &[i64]) -> DependencyEdge {
        DependencyEdge::along(
            EntityId(owner),
            DependencyPath::from(ids.iter().copied().map(EntityId).collect::<Vec<_>>()),
            DependencyType::Implicit,
        )
        .unwrap()
    }

    fn position(order: &[&Entity], name: &str) -> usize {
        order.iter().position(|e| e.name == name).unwrap()
    }

    #[test]
    fn dependencies_come_first() {
        let entities = vec![entity(1, "app"), entity(2, "db"), entity(3, "web")];
        let edges = vec![
            edge(1, &[1]),
            edge(1, &[2, 1]),
            edge(2, &[2]),
            edge(3, &[3]),
            edge(3, &[1, 3]),
            edge(3, &[2, 1, 3]),
        ];

        let order = deployment_order(&entities, &edges).unwrap();
        assert_eq!(order.len(), 3);
        assert!(position(&order, "db") < position(&order, "app"));
        assert!(position(&order, "app") < position(&order, "web"));
    }

    #[test]
    fn corrupted_cycle_is_reported() {
        let entities = vec![entity(1, "a"), entity(2, "b")];
        let edges = vec![edge(1, &[2, 1]), edge(2, &[1, 2])];
        assert!(matches!(
            deployment_order(&entities, &edges),
            Err(Error::CyclicDependency { .. })
        ));
    }

    #[test]
    fn independent_entities_keep_input_order() {
        let entities = vec![
            entity(1, "a"),
            entity(2, "b"),
            entity(3, "c"),
            entity(4, "d"),
        ];
        let edges: Vec<_> = (1..=4).map(|i| edge(i, &[i])).collect();

        let names: Vec<_> = deployment_order(&entities, &edges)
            .unwrap()
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn ready_entities_follow_input_order() {
        // d depends on a; b and c are free.
        let entities = vec![
            entity(1, "a"),
            entity(2, "b"),
            entity(3, "c"),
            entity(4, "d"),
        ];
        let edges = vec![edge(4, &[1, 4])];

        let names: Vec<_> = deployment_order(&entities, &edges)
            .unwrap()
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }
}

//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;

use tributary::{Config, Entity, EntityId, Kind, NewEntity, Scope, Tributary};

/// Scope used by every helper below.
pub fn scope() -> Scope {
    Scope::new("shop", "dev")
}

/// In-memory graph with the default configuration.
pub fn graph() -> Tributary {
    graph_with(Config::default())
}

/// In-memory graph with the given configuration.
pub fn graph_with(config: Config) -> Tributary {
    Tributary::open_in_memory(config).expect("failed to open in-memory graph")
}

/// A resource that references each of `deps` through an attribute token.
pub fn resource(name: &str, deps: &[&str]) -> NewEntity {
    deps.iter().fold(
        NewEntity::new(Kind::Resource, scope(), name),
        |entity, dep| entity.with_attribute(format!("{dep}_url"), &format!("${{res.{dep}.url}}")),
    )
}

/// Create a resource and return the stored entity.
pub fn create(graph: &Tributary, name: &str, deps: &[&str]) -> Entity {
    graph
        .create(resource(name, deps))
        .unwrap_or_else(|e| panic!("failed to create {name}: {e}"))
        .entity
}

/// Look up a resource's ID by name.
pub fn id_of(graph: &Tributary, name: &str) -> EntityId {
    graph
        .find_by_name(Kind::Resource, &scope(), name)
        .unwrap()
        .unwrap_or_else(|| panic!("no entity named {name}"))
        .id
}

/// Every stored outbound route of `name`, spelled with entity names.
pub fn routes(graph: &Tributary, name: &str) -> BTreeSet<Vec<String>> {
    let names: std::collections::HashMap<EntityId, String> = graph
        .list(Kind::Resource, &scope())
        .unwrap()
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect();

    graph
        .outbound_edges(id_of(graph, name))
        .unwrap()
        .into_iter()
        .map(|edge| edge.path.ids().iter().map(|id| names[id].clone()).collect())
        .collect()
}

/// Build an expected route set from name slices.
pub fn route_set(routes: &[&[&str]]) -> BTreeSet<Vec<String>> {
    routes
        .iter()
        .map(|r| r.iter().map(|s| (*s).to_string()).collect())
        .collect()
}

/// Names of the entities `name` depends on, sorted.
pub fn dependency_names(graph: &Tributary, name: &str) -> Vec<String> {
    let ids = graph.dependency_ids(id_of(graph, name), None).unwrap();
    let mut names: Vec<String> = ids
        .into_iter()
        .map(|id| graph.get(id).unwrap().unwrap().name)
        .collect();
    names.sort();
    names
}

/// Run the tributary binary in `dir`.
pub fn run_tributary_in_dir(dir: &std::path::Path, args: &[&str]) -> std::process::Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_tributary"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to execute tributary binary")
}

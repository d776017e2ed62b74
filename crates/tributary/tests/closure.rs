//! Integration tests for closure computation and propagation.
//!
//! These tests drive the engine through the public `Tributary` API against an
//! in-memory database:
//! - Closure completeness and the self-edge
//! - Cycle rejection leaving prior state untouched
//! - Idempotent re-saves
//! - Propagation to transitive dependants without re-saving them
//! - Reverse lookups

mod common;

use common::{create, dependency_names, graph, id_of, resource, route_set, routes, scope};
use rstest::rstest;
use tributary::{Attributes, DependencyEdge, Error, Kind, NewEntity, Scope};

#[test]
fn worked_scenario_builds_closure_and_rejects_cycle() {
    let graph = graph();

    let db = create(&graph, "res-db", &[]);
    assert_eq!(
        graph.outbound_edges(db.id).unwrap(),
        vec![DependencyEdge::self_edge(db.id)]
    );

    let app = graph
        .create(
            NewEntity::new(Kind::Resource, scope(), "res-app")
                .with_attribute("url", "${res.res-db.endpoint}"),
        )
        .unwrap();
    assert_eq!(
        routes(&graph, "res-app"),
        route_set(&[&["res-app"], &["res-db", "res-app"]])
    );
    assert_eq!(app.own.inserted, 2);

    create(&graph, "res-web", &["res-app"]);
    assert_eq!(
        routes(&graph, "res-web"),
        route_set(&[
            &["res-web"],
            &["res-app", "res-web"],
            &["res-db", "res-app", "res-web"],
        ])
    );

    let before = graph.audit().unwrap();
    let snapshot: Vec<_> = ["res-db", "res-app", "res-web"]
        .iter()
        .map(|n| routes(&graph, n))
        .collect();

    let mut attributes = Attributes::new();
    attributes.insert("upstream", "${res.res-web.url}");
    let err = graph
        .update_attributes(db.id, attributes, Vec::new())
        .unwrap_err();
    assert!(
        err.to_string().contains("dependency contains cycle"),
        "unexpected error: {err}"
    );
    assert!(err.is_rejection());

    // Rejected update left both attributes and edges as they were.
    let stored = graph.get(db.id).unwrap().unwrap();
    assert!(stored.attributes.is_empty());
    let after: Vec<_> = ["res-db", "res-app", "res-web"]
        .iter()
        .map(|n| routes(&graph, n))
        .collect();
    assert_eq!(snapshot, after);
    assert_eq!(before.edges_checked, graph.audit().unwrap().edges_checked);
}

#[test]
fn chain_closure_is_complete() {
    let graph = graph();
    create(&graph, "c", &[]);
    create(&graph, "b", &["c"]);
    create(&graph, "a", &["b"]);

    assert!(routes(&graph, "a").contains(&vec!["c".into(), "b".into(), "a".into()]));
    assert_eq!(dependency_names(&graph, "a"), vec!["b", "c"]);
}

#[test]
fn diamond_keeps_both_routes() {
    let graph = graph();
    create(&graph, "db", &[]);
    create(&graph, "cache", &["db"]);
    create(&graph, "api", &["db"]);
    create(&graph, "web", &["cache", "api"]);

    assert_eq!(
        routes(&graph, "web"),
        route_set(&[
            &["web"],
            &["api", "web"],
            &["cache", "web"],
            &["db", "api", "web"],
            &["db", "cache", "web"],
        ])
    );
    assert_eq!(dependency_names(&graph, "web"), vec!["api", "cache", "db"]);
}

#[test]
fn self_reference_is_rejected_and_nothing_is_stored() {
    let graph = graph();
    let err = graph.create(resource("loop", &["loop"])).unwrap_err();

    assert!(matches!(err, Error::CyclicDependency { .. }));
    assert!(
        graph
            .find_by_name(Kind::Resource, &scope(), "loop")
            .unwrap()
            .is_none()
    );
}

#[test]
fn resaving_identical_attributes_is_a_noop() {
    let graph = graph();
    create(&graph, "db", &[]);
    let app = create(&graph, "app", &["db"]);
    create(&graph, "web", &["app"]);

    let outcome = graph
        .update_attributes(app.id, app.attributes.clone(), Vec::new())
        .unwrap();
    assert!(outcome.own.is_noop(), "{:?}", outcome.own);
    assert!(outcome.dependants.is_noop(), "{:?}", outcome.dependants);

    let resaved = graph.resave(app.id).unwrap();
    assert!(resaved.own.is_noop());
    assert!(resaved.dependants.is_noop());
}

#[test]
fn new_upstream_propagates_to_transitive_dependants() {
    let graph = graph();
    let c = create(&graph, "c", &[]);
    create(&graph, "b", &["c"]);
    create(&graph, "a", &["b"]);
    create(&graph, "d", &[]);

    // Only C is re-saved; A and B pick up D through propagation.
    let mut attributes = Attributes::new();
    attributes.insert("d", "${res.d.host}");
    let outcome = graph.update_attributes(c.id, attributes, Vec::new()).unwrap();
    assert_eq!(outcome.dependants.inserted, 2);

    assert!(routes(&graph, "b").contains(&vec!["d".into(), "c".into(), "b".into()]));
    assert!(routes(&graph, "a").contains(&vec![
        "d".into(),
        "c".into(),
        "b".into(),
        "a".into()
    ]));
    assert!(graph.audit().unwrap().is_clean());
}

#[test]
fn dropped_upstream_disappears_from_dependants() {
    let graph = graph();
    create(&graph, "d", &[]);
    let c = create(&graph, "c", &["d"]);
    create(&graph, "b", &["c"]);
    create(&graph, "a", &["b"]);
    assert_eq!(dependency_names(&graph, "a"), vec!["b", "c", "d"]);

    let outcome = graph
        .update_attributes(c.id, Attributes::new(), Vec::new())
        .unwrap();
    assert_eq!(outcome.own.deleted, 1);
    assert_eq!(outcome.dependants.deleted, 2);

    assert_eq!(dependency_names(&graph, "a"), vec!["b", "c"]);
    assert_eq!(dependency_names(&graph, "b"), vec!["c"]);
    assert!(graph.audit().unwrap().is_clean());
}

#[test]
fn update_closing_cycle_is_rejected() {
    let graph = graph();
    let c = create(&graph, "c", &[]);
    create(&graph, "b", &["c"]);
    create(&graph, "a", &["b"]);
    let a_before = routes(&graph, "a");
    let b_before = routes(&graph, "b");

    // C -> A would close A -> B -> C -> A.
    let mut attributes = Attributes::new();
    attributes.insert("a", "${res.a.url}");
    let err = graph.update_attributes(c.id, attributes, Vec::new()).unwrap_err();
    assert!(matches!(err, Error::CyclicDependency { .. }));
    assert_eq!(dependency_names(&graph, "c"), Vec::<String>::new());
    assert_eq!(routes(&graph, "a"), a_before);
    assert_eq!(routes(&graph, "b"), b_before);
}

#[test]
fn nested_attribute_reference_creates_edge() {
    let graph = graph();
    create(&graph, "db", &[]);

    let attributes: Attributes =
        serde_json::from_str(r#"{"env":{"URL":"${res.db.url}"},"replicas":3}"#).unwrap();
    let outcome = graph
        .create(NewEntity {
            attributes,
            ..NewEntity::new(Kind::Resource, scope(), "app")
        })
        .unwrap();

    assert!(outcome.unresolved.is_empty());
    assert_eq!(routes(&graph, "app"), route_set(&[&["app"], &["db", "app"]]));
}

#[test]
fn dependant_ids_are_reverse_of_dependencies() {
    let graph = graph();
    create(&graph, "c", &[]);
    create(&graph, "b", &["c"]);
    create(&graph, "a", &["b"]);
    let (a, b, c) = (id_of(&graph, "a"), id_of(&graph, "b"), id_of(&graph, "c"));

    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(graph.dependant_ids(&[c]).unwrap(), expected);
    assert_eq!(graph.dependant_ids(&[b, c]).unwrap(), vec![a]);
    assert_eq!(graph.dependant_names(c).unwrap(), vec!["a", "b"]);
    assert!(graph.dependant_ids(&[]).unwrap().is_empty());
}

#[rstest]
#[case::other_kind(Kind::Service, scope())]
#[case::other_project(Kind::Resource, Scope::new("billing", "dev"))]
#[case::other_environment(Kind::Resource, Scope::new("shop", "prod"))]
fn names_resolve_only_within_kind_and_scope(#[case] kind: Kind, #[case] other: Scope) {
    let graph = graph();
    graph
        .create(NewEntity::new(kind, other, "db"))
        .unwrap();

    let app = graph.create(resource("app", &["db"])).unwrap();
    assert_eq!(app.unresolved, vec!["db".to_string()]);
    assert!(dependency_names(&graph, "app").is_empty());
}

#[test]
fn services_use_service_tokens() {
    let graph = graph();
    let svc_scope = scope();
    let auth = graph
        .create(NewEntity::new(Kind::Service, svc_scope.clone(), "auth"))
        .unwrap();
    let api = graph
        .create(
            NewEntity::new(Kind::Service, svc_scope.clone(), "api")
                .with_attribute("AUTH", "${service.auth.url}")
                .with_attribute("DB", "${res.db.url}"),
        )
        .unwrap();

    // The resource token is not a service dependency and is not reported.
    assert!(api.unresolved.is_empty());
    assert_eq!(
        graph.dependency_ids(api.entity.id, None).unwrap(),
        vec![auth.entity.id]
    );
}

#[test]
fn legacy_svc_token_references_resources() {
    let graph = graph();
    let db = create(&graph, "db", &[]);
    let app = graph
        .create(
            NewEntity::new(Kind::Resource, scope(), "app").with_attribute("DB", "${svc.db.host}"),
        )
        .unwrap();
    assert_eq!(
        graph.dependency_ids(app.entity.id, None).unwrap(),
        vec![db.id]
    );
}

//! # Tributary: Dependency Graph Engine for Infrastructure Entities
//!
//! Tributary tracks which resources and services depend on which, as declared
//! through `${<kind>.<name>.<path>}` reference tokens in their attributes or
//! through explicit dependency lists. For every entity it stores the complete
//! transitive closure of its dependencies as a table of materialized paths in
//! `SQLite`, keeps that table consistent when any entity changes, and refuses
//! every change that would introduce a cycle.
//!
//! ## Design Philosophy
//!
//! - **Reads are lookups** - "does X depend on Y" and "who depends on X" are single queries
//! - **Writes pay** - saving an entity recomputes its closure and repairs its dependants
//! - **All or nothing** - every mutation is one transaction; rejected saves change nothing
//! - **One engine** - resources and services share the same code through the [`Node`] trait
//!
//! ## Quick Start
//!
//! ```no_run
//! use tributary::{Config, Kind, NewEntity, Scope, Tributary};
//!
//! let graph = Tributary::open_in_memory(Config::default())?;
//! let scope = Scope::new("shop", "dev");
//!
//! let db = graph.create(NewEntity::new(Kind::Resource, scope.clone(), "db"))?;
//! let app = graph.create(
//!     NewEntity::new(Kind::Resource, scope.clone(), "app")
//!         .with_attribute("DATABASE_URL", "${res.db.url}"),
//! )?;
//!
//! assert_eq!(graph.dependant_ids(&[db.entity.id])?, vec![app.entity.id]);
//! # Ok::<(), tributary::Error>(())
//! ```

pub mod config;
pub mod engine;
mod error;
pub mod store;
pub mod template;
mod types;

pub use config::{Config, DeletePolicy, ReferencePolicy};
pub use engine::{check_cycle, Node};
pub use error::{Error, Result};
pub use store::{Database, EdgeFilter, GraphStore, ResolvedEntity, SqliteStore};
pub use template::{Attributes, Reference, Segment, Template, Value};
pub use types::{
    AuditReport, DeleteOutcome, DependencyEdge, DependencyPath, DependencyType, EdgeKey, Entity,
    EntityId, Kind, NewEntity, ReconcileStats, SaveOutcome, Scope, Violation, ViolationKind,
};

use std::collections::BTreeSet;

use tracing::info;

/// Dependency graph handle.
///
/// `Tributary` owns the database connection and applies the configured
/// policies. Every mutating method runs in its own `BEGIN IMMEDIATE`
/// transaction; reads see only committed state.
pub struct Tributary {
    db: Database,
    config: Config,
}

// The facade's errors are the crate-level `Error` variants, documented there.
#[allow(clippy::missing_errors_doc)]
impl Tributary {
    /// Open (or create) the database named by `config.database`.
    pub fn open(config: Config) -> Result<Self> {
        let db = Database::open(&config.database)?;
        Ok(Self { db, config })
    }

    /// Open a private in-memory graph. `config.database` is ignored.
    pub fn open_in_memory(config: Config) -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
            config,
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Mutations ===

    /// Create an entity and compute its dependency closure.
    ///
    /// Fails with `Error::Duplicate` if the name is taken in its kind and
    /// scope, and with `Error::CyclicDependency` if it would close a cycle.
    /// Either way nothing is written.
    pub fn create(&self, new: NewEntity) -> Result<SaveOutcome> {
        let references = self.config.references;
        let outcome = self.db.write(|store| {
            let entity = store.insert_entity(&new)?;
            save_entity(store, entity, references)
        })?;

        info!(id = %outcome.entity.id, name = %outcome.entity.name, "Created entity");
        Ok(outcome)
    }

    /// Replace an entity's attributes and explicit dependencies, then
    /// recompute its closure and repair every dependant.
    pub fn update_attributes(
        &self,
        id: EntityId,
        attributes: Attributes,
        explicit_dependencies: Vec<String>,
    ) -> Result<SaveOutcome> {
        let references = self.config.references;
        self.db.write(|store| {
            let entity = store.update_entity(id, &attributes, &explicit_dependencies)?;
            save_entity(store, entity, references)
        })
    }

    /// Recompute an entity's closure from its stored attributes.
    ///
    /// Picks up dependencies created after the entity was last saved.
    pub fn resave(&self, id: EntityId) -> Result<SaveOutcome> {
        let references = self.config.references;
        self.db.write(|store| {
            let entity = store
                .get_entity(id)?
                .ok_or_else(|| Error::entity_not_found(id))?;
            save_entity(store, entity, references)
        })
    }

    /// Create the entity, or update it if one with the same kind, scope and
    /// name already exists.
    pub fn apply(&self, new: NewEntity) -> Result<SaveOutcome> {
        let references = self.config.references;
        self.db.write(|store| {
            let entity = match store.find_entity(new.kind, &new.scope, &new.name)? {
                Some(existing) => store.update_entity(
                    existing.id,
                    &new.attributes,
                    &new.explicit_dependencies,
                )?,
                None => store.insert_entity(&new)?,
            };
            save_entity(store, entity, references)
        })
    }

    /// Delete an entity under `policy`.
    ///
    /// Under `DeletePolicy::Block` fails with `Error::HasDependants` while
    /// anything depends on the entity.
    pub fn delete(&self, id: EntityId, policy: DeletePolicy) -> Result<DeleteOutcome> {
        let outcome = self.db.write(|store| {
            let entity = store
                .get_entity(id)?
                .ok_or_else(|| Error::entity_not_found(id))?;
            let outcome = engine::delete(store, &entity, policy)?;
            store.delete_entities(&outcome.removed)?;
            Ok(outcome)
        })?;

        info!(
            id = %id,
            ?policy,
            removed = outcome.removed.len(),
            edges_removed = outcome.edges_removed,
            "Deleted entity"
        );
        Ok(outcome)
    }

    /// Delete an entity under the configured policy.
    pub fn delete_with_default_policy(&self, id: EntityId) -> Result<DeleteOutcome> {
        self.delete(id, self.config.delete_policy)
    }

    // === Entity queries ===

    /// Get an entity by ID.
    pub fn get(&self, id: EntityId) -> Result<Option<Entity>> {
        self.db.read(|store| store.get_entity(id))
    }

    /// Get an entity by name within its kind and scope.
    pub fn find_by_name(&self, kind: Kind, scope: &Scope, name: &str) -> Result<Option<Entity>> {
        self.db.read(|store| store.find_entity(kind, scope, name))
    }

    /// List the entities of `kind` in `scope`, ordered by name.
    pub fn list(&self, kind: Kind, scope: &Scope) -> Result<Vec<Entity>> {
        self.db.read(|store| store.list_entities(kind, scope))
    }

    /// Resolve `names` in `scope`, each with its stored outbound closure.
    pub fn find_by_names_with_closure(
        &self,
        kind: Kind,
        scope: &Scope,
        names: &BTreeSet<String>,
    ) -> Result<Vec<ResolvedEntity>> {
        self.db
            .read(|store| store.find_by_names_with_closure(kind, scope, names))
    }

    // === Graph queries ===

    /// Names the entity references directly, from attributes and explicit
    /// dependencies, sorted.
    pub fn direct_reference_names(&self, id: EntityId) -> Result<Vec<String>> {
        let entity = self.get(id)?.ok_or_else(|| Error::entity_not_found(id))?;
        Ok(engine::direct_reference_names(&entity))
    }

    /// Every stored outbound edge of the entity, self-edge included.
    pub fn outbound_edges(&self, id: EntityId) -> Result<Vec<DependencyEdge>> {
        self.db.read(|store| store.query_outbound(id))
    }

    /// IDs of everything the entity depends on, directly or transitively.
    ///
    /// With `dep_type` set, only routes whose last hop has that type count.
    pub fn dependency_ids(
        &self,
        id: EntityId,
        dep_type: Option<DependencyType>,
    ) -> Result<Vec<EntityId>> {
        let ids: BTreeSet<EntityId> = self
            .outbound_edges(id)?
            .into_iter()
            .filter(|e| !e.is_self())
            .filter(|e| dep_type.is_none_or(|t| e.dep_type == t))
            .map(|e| e.dependency_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// IDs of every entity that depends on any of `ids`, excluding `ids` themselves.
    pub fn dependant_ids(&self, ids: &[EntityId]) -> Result<Vec<EntityId>> {
        self.db.read(|store| store.dependant_ids(ids))
    }

    /// Names of every entity that depends on `id`.
    pub fn dependant_names(&self, id: EntityId) -> Result<Vec<String>> {
        self.db.read(|store| store.dependant_names(id))
    }

    /// The entities of `kind` in `scope`, dependencies first.
    pub fn deployment_order(&self, kind: Kind, scope: &Scope) -> Result<Vec<Entity>> {
        let (entities, edges) = self.db.read(|store| {
            Ok((
                store.list_entities(kind, scope)?,
                store.edges_in_scope(kind, scope)?,
            ))
        })?;
        let order = engine::deployment_order(&entities, &edges)?;
        Ok(order.into_iter().cloned().collect())
    }

    /// Check every stored edge against the closure invariants.
    pub fn audit(&self) -> Result<AuditReport> {
        let (ids, edges) = self
            .db
            .read(|store| Ok((store.all_entity_ids()?, store.all_edges()?)))?;
        Ok(engine::audit(&ids, &edges))
    }
}

fn save_entity(
    store: &SqliteStore<'_>,
    entity: Entity,
    references: ReferencePolicy,
) -> Result<SaveOutcome> {
    let report = engine::save(store, &entity, references)?;
    Ok(SaveOutcome {
        entity,
        edges: report.edges,
        unresolved: report.unresolved,
        own: report.own,
        dependants: report.dependants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> Tributary {
        Tributary::open_in_memory(Config::default()).unwrap()
    }

    fn scope() -> Scope {
        Scope::new("p", "dev")
    }

    #[test]
    fn create_stores_self_edge() {
        let graph = graph();
        let db = graph
            .create(NewEntity::new(Kind::Resource, scope(), "db"))
            .unwrap();

        assert_eq!(db.edges, vec![DependencyEdge::self_edge(db.entity.id)]);
        assert_eq!(graph.outbound_edges(db.entity.id).unwrap(), db.edges);
    }

    #[test]
    fn apply_updates_existing_entity_by_name() {
        let graph = graph();
        let db = graph
            .create(NewEntity::new(Kind::Resource, scope(), "db"))
            .unwrap();
        let first = graph
            .apply(NewEntity::new(Kind::Resource, scope(), "app"))
            .unwrap();
        let second = graph
            .apply(
                NewEntity::new(Kind::Resource, scope(), "app").with_attribute("DB", "${res.db.url}"),
            )
            .unwrap();

        assert_eq!(first.entity.id, second.entity.id);
        assert_eq!(
            graph.dependency_ids(second.entity.id, None).unwrap(),
            vec![db.entity.id]
        );
    }

    #[test]
    fn resave_picks_up_late_dependency() {
        let graph = graph();
        let app = graph
            .create(NewEntity::new(Kind::Resource, scope(), "app").with_attribute("DB", "${res.db.url}"))
            .unwrap();
        assert_eq!(app.unresolved, vec!["db".to_string()]);

        let db = graph
            .create(NewEntity::new(Kind::Resource, scope(), "db"))
            .unwrap();
        let resaved = graph.resave(app.entity.id).unwrap();

        assert!(resaved.unresolved.is_empty());
        assert_eq!(
            graph.dependency_ids(app.entity.id, None).unwrap(),
            vec![db.entity.id]
        );
    }

    #[test]
    fn missing_entity_is_not_found() {
        let graph = graph();
        assert!(matches!(graph.resave(EntityId(42)), Err(Error::NotFound(_))));
        assert!(matches!(
            graph.delete(EntityId(42), DeletePolicy::Block),
            Err(Error::NotFound(_))
        ));
        assert!(graph.get(EntityId(42)).unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let graph = graph();
        graph
            .create(NewEntity::new(Kind::Resource, scope(), "db"))
            .unwrap();
        assert!(matches!(
            graph.create(NewEntity::new(Kind::Resource, scope(), "db")),
            Err(Error::Duplicate(_))
        ));

        // Same name in another kind is a different entity.
        graph
            .create(NewEntity::new(Kind::Service, scope(), "db"))
            .unwrap();
    }
}

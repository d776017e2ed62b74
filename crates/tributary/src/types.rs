//! Domain types for Tributary.
//!
//! - **Entities**: `Entity`, `NewEntity` (stored in the `entities` table)
//! - **Edges**: `DependencyEdge`, `DependencyPath` (stored in `dependency_edges`)
//! - **Results**: `SaveOutcome`, `DeleteOutcome`, `AuditReport` (operation results)
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Entity kind | Enum not String | Kind tokens and name scoping depend on it |
//! | Path | Newtype over `Vec<EntityId>` | Cycle checks and splicing live with the data |
//! | Edge key | (entity, dependency, path) | Several routes between one pair are kept |
//! | Edge type | Not part of the key | Same route declared twice is one edge |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::cycle;
use crate::template::Attributes;

// ============================================================================
// Strongly-typed IDs
// ============================================================================

/// A strongly-typed entity ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Extract the raw i64 value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The project/environment pair that entity names are unique within.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Project identifier.
    pub project: String,
    /// Environment identifier.
    pub environment: String,
}

impl Scope {
    /// Create a scope.
    #[must_use]
    pub fn new(project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.environment)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Kinds of entities that take part in the dependency graph.
///
/// Each kind is a separate graph: names resolve only against entities of the
/// same kind in the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Deployable resource; referenced as `${res.<name>.<path>}` (or legacy `svc`).
    Resource,
    /// Service; referenced as `${service.<name>.<path>}`.
    Service,
}

impl Kind {
    /// Reference-token prefixes that point at entities of this kind.
    #[must_use]
    pub fn reference_tokens(&self) -> &'static [&'static str] {
        match self {
            Self::Resource => &["res", "svc"],
            Self::Service => &["service"],
        }
    }

    /// Returns `true` if `token` is a reference prefix for this kind.
    #[must_use]
    pub fn accepts_token(&self, token: &str) -> bool {
        self.reference_tokens().contains(&token)
    }

    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Service => "service",
        }
    }

    /// Parse from the database/CLI string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resource" | "res" => Some(Self::Resource),
            "service" => Some(Self::Service),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the last hop of an edge was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Discovered from an attribute reference token.
    Implicit,
    /// Declared by the user in the entity's explicit dependency list.
    Explicit,
}

impl DependencyType {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Implicit => "implicit",
            Self::Explicit => "explicit",
        }
    }
}

// ============================================================================
// Paths and edges
// ============================================================================

/// Ordered entity IDs from a dependency to a dependant, both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyPath(Vec<EntityId>);

impl DependencyPath {
    /// The trivial path `[id]`.
    #[must_use]
    pub fn single(id: EntityId) -> Self {
        Self(vec![id])
    }

    /// The IDs in this path.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.0
    }

    /// Number of IDs in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the path holds no IDs (never true for stored edges).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The dependency end of the path.
    #[must_use]
    pub fn first(&self) -> Option<EntityId> {
        self.0.first().copied()
    }

    /// The dependant end of the path.
    #[must_use]
    pub fn last(&self) -> Option<EntityId> {
        self.0.last().copied()
    }

    /// Returns `true` if the path routes through `id`.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.0.contains(&id)
    }

    /// Returns `true` if any ID repeats.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        cycle::check_cycle(&self.0)
    }

    /// This path with `id` appended (`P ++ [id]`).
    #[must_use]
    pub fn extended(&self, id: EntityId) -> Self {
        let mut ids = Vec::with_capacity(self.0.len() + 1);
        ids.extend_from_slice(&self.0);
        ids.push(id);
        Self(ids)
    }

    /// The segment of this path from `id` to the dependant end.
    ///
    /// `id` is only matched before the final position; a path ending at `id`
    /// belongs to `id` itself and has no downstream segment.
    #[must_use]
    pub fn suffix_from(&self, id: EntityId) -> Option<&[EntityId]> {
        let n = self.0.len();
        self.0[..n.saturating_sub(1)]
            .iter()
            .position(|&x| x == id)
            .map(|i| &self.0[i..])
    }

    /// Replace everything up to and including the pivot with `upstream`.
    ///
    /// `upstream` ends at the pivot and `downstream` starts with it, so the
    /// result is `upstream[..-1] ++ downstream`.
    #[must_use]
    pub fn splice(upstream: &DependencyPath, downstream: &[EntityId]) -> Self {
        let head = &upstream.0[..upstream.0.len().saturating_sub(1)];
        let mut ids = Vec::with_capacity(head.len() + downstream.len());
        ids.extend_from_slice(head);
        ids.extend_from_slice(downstream);
        Self(ids)
    }
}

impl From<Vec<EntityId>> for DependencyPath {
    fn from(ids: Vec<EntityId>) -> Self {
        Self(ids)
    }
}

impl fmt::Display for DependencyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.0 {
            if !first {
                f.write_str(" -> ")?;
            }
            write!(f, "{id}")?;
            first = false;
        }
        Ok(())
    }
}

/// Natural key of a stored edge.
pub type EdgeKey = (EntityId, EntityId, DependencyPath);

/// One concrete route by which `entity_id` depends on `dependency_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The dependant that owns this edge.
    pub entity_id: EntityId,
    /// The entity depended upon.
    pub dependency_id: EntityId,
    /// Route from `dependency_id` to `entity_id`, both inclusive.
    pub path: DependencyPath,
    /// How the last hop into `entity_id` was declared.
    pub dep_type: DependencyType,
}

impl DependencyEdge {
    /// The self-edge `{id, id, [id]}` every saved entity owns.
    #[must_use]
    pub fn self_edge(id: EntityId) -> Self {
        Self {
            entity_id: id,
            dependency_id: id,
            path: DependencyPath::single(id),
            dep_type: DependencyType::Implicit,
        }
    }

    /// Build an edge whose dependency is the first element of `path`.
    ///
    /// Returns `None` if the path is empty.
    #[must_use]
    pub fn along(entity_id: EntityId, path: DependencyPath, dep_type: DependencyType) -> Option<Self> {
        let dependency_id = path.first()?;
        Some(Self {
            entity_id,
            dependency_id,
            path,
            dep_type,
        })
    }

    /// Returns `true` for the self-edge.
    #[must_use]
    pub fn is_self(&self) -> bool {
        self.entity_id == self.dependency_id
    }

    /// The natural key used for deduplication and reconciliation.
    #[must_use]
    pub fn key(&self) -> EdgeKey {
        (self.entity_id, self.dependency_id, self.path.clone())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A named infrastructure entity taking part in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Database ID.
    pub id: EntityId,
    /// Resource or service.
    pub kind: Kind,
    /// Project/environment the name is unique within.
    pub scope: Scope,
    /// User-facing name, referenced from other entities' attributes.
    pub name: String,
    /// Templated configuration attributes.
    pub attributes: Attributes,
    /// Names the user declared as dependencies directly.
    #[serde(default)]
    pub explicit_dependencies: Vec<String>,
}

/// Data required to create an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntity {
    /// Resource or service.
    pub kind: Kind,
    /// Project/environment the name is unique within.
    pub scope: Scope,
    /// User-facing name.
    pub name: String,
    /// Templated configuration attributes.
    #[serde(default)]
    pub attributes: Attributes,
    /// Names the user declared as dependencies directly.
    #[serde(default)]
    pub explicit_dependencies: Vec<String>,
}

impl NewEntity {
    /// Create a new entity description with no attributes.
    #[must_use]
    pub fn new(kind: Kind, scope: Scope, name: impl Into<String>) -> Self {
        Self {
            kind,
            scope,
            name: name.into(),
            attributes: Attributes::new(),
            explicit_dependencies: Vec::new(),
        }
    }

    /// Add an attribute (builder style).
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, raw: &str) -> Self {
        self.attributes.insert(key, raw);
        self
    }

    /// Add an explicit dependency (builder style).
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.explicit_dependencies.push(name.into());
        self
    }
}

// ============================================================================
// Operation results
// ============================================================================

/// Edge counts from reconciling one set of stored edges with a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Edges written that were not stored before.
    pub inserted: usize,
    /// Stale edges deleted.
    pub deleted: usize,
}

impl ReconcileStats {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.deleted == 0
    }
}

impl std::ops::AddAssign for ReconcileStats {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.deleted += rhs.deleted;
    }
}

/// Result of saving an entity.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The entity as stored.
    pub entity: Entity,
    /// The entity's complete outbound closure after the save.
    pub edges: Vec<DependencyEdge>,
    /// Referenced names with no matching entity in scope.
    pub unresolved: Vec<String>,
    /// Changes to the entity's own edges.
    pub own: ReconcileStats,
    /// Changes to dependants' edges.
    pub dependants: ReconcileStats,
}

/// Result of deleting an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// IDs of every entity removed (the target plus cascaded dependants).
    pub removed: Vec<EntityId>,
    /// Number of edges removed.
    pub edges_removed: usize,
}

/// A stored edge that breaks a closure invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The offending edge, if the violation is about one edge.
    pub edge: Option<DependencyEdge>,
    /// Entity the violation concerns.
    pub entity_id: EntityId,
    /// What is wrong.
    pub kind: ViolationKind,
}

/// Categories of closure-table corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// An ID repeats within the path.
    CyclicPath,
    /// `path[0] != dependency_id` or `path[last] != entity_id`.
    BadEndpoints,
    /// The entity has no `{E, E, [E]}` edge.
    MissingSelfEdge,
    /// The path mentions an ID with no entity record.
    DanglingId,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CyclicPath => write!(f, "cyclic path"),
            Self::BadEndpoints => write!(f, "path endpoints do not match edge"),
            Self::MissingSelfEdge => write!(f, "missing self-edge"),
            Self::DanglingId => write!(f, "path references a missing entity"),
        }
    }
}

/// Result of an integrity audit over the whole edge table.
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    /// Number of entities inspected.
    pub entities_checked: usize,
    /// Number of edges inspected.
    pub edges_checked: usize,
    /// Everything that was found to be wrong.
    pub violations: Vec<Violation>,
}

impl AuditReport {
    /// Returns `true` if no violations were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

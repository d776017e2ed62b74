//! Database schema definition for Tributary.

/// Database schema definition.
pub(crate) const SCHEMA: &str = r"
-- Named infrastructure entities (resources and services)
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    project TEXT NOT NULL,
    environment TEXT NOT NULL,
    name TEXT NOT NULL,
    attributes TEXT NOT NULL DEFAULT '{}',          -- JSON object of raw template strings
    explicit_dependencies TEXT NOT NULL DEFAULT '[]', -- JSON array of names
    UNIQUE (kind, project, environment, name)
);

CREATE INDEX IF NOT EXISTS idx_entities_scope ON entities(kind, project, environment);

-- Materialized transitive closure: one row per concrete route.
-- path is a JSON array of entity ids from dependency_id to entity_id.
CREATE TABLE IF NOT EXISTS dependency_edges (
    entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    dependency_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    path TEXT NOT NULL,
    dep_type TEXT NOT NULL,
    PRIMARY KEY (entity_id, dependency_id, path)
);

CREATE INDEX IF NOT EXISTS idx_edges_dependency ON dependency_edges(dependency_id);
";

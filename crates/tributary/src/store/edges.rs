//! `GraphStore` implementation over the `dependency_edges` table.

use std::collections::BTreeSet;

use rusqlite::params;
use tracing::trace;

use super::helpers::{encode_ids, encode_path, row_to_edge, EDGE_COLUMNS};
use super::{EdgeFilter, GraphStore, ResolvedEntity, SqliteStore};
use crate::error::Result;
use crate::types::{DependencyEdge, EntityId, Kind, Scope};

impl SqliteStore<'_> {
    fn query_edges(&self, sql: &str, param: i64) -> Result<Vec<DependencyEdge>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let edges = stmt
            .query_map([param], row_to_edge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Every stored edge, ordered by owner then path.
    pub fn all_edges(&self) -> Result<Vec<DependencyEdge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM dependency_edges ORDER BY entity_id, path"
        ))?;
        let edges = stmt
            .query_map([], row_to_edge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Edges owned by entities of `kind` in `scope`.
    pub fn edges_in_scope(&self, kind: Kind, scope: &Scope) -> Result<Vec<DependencyEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.entity_id, d.dependency_id, d.path, d.dep_type
             FROM dependency_edges d
             JOIN entities e ON e.id = d.entity_id
             WHERE e.kind = ?1 AND e.project = ?2 AND e.environment = ?3
             ORDER BY d.entity_id, d.path",
        )?;
        let edges = stmt
            .query_map(
                params![kind.as_str(), scope.project, scope.environment],
                row_to_edge,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }
}

impl GraphStore for SqliteStore<'_> {
    fn find_by_names_with_closure(
        &self,
        kind: Kind,
        scope: &Scope,
        names: &BTreeSet<String>,
    ) -> Result<Vec<ResolvedEntity>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let names_json = serde_json::to_string(names)?;
        let matches: Vec<(EntityId, String)> = {
            let mut stmt = self.conn.prepare_cached(
                "SELECT id, name FROM entities
                 WHERE kind = ?1 AND project = ?2 AND environment = ?3
                   AND name IN (SELECT value FROM json_each(?4))
                 ORDER BY name, id",
            )?;
            stmt.query_map(
                params![kind.as_str(), scope.project, scope.environment, names_json],
                |row| Ok((EntityId(row.get(0)?), row.get(1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?
        };

        matches
            .into_iter()
            .map(|(id, name)| {
                let closure = self.query_outbound(id)?;
                Ok(ResolvedEntity { id, name, closure })
            })
            .collect()
    }

    fn upsert_edges(&self, edges: &[DependencyEdge]) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO dependency_edges (entity_id, dependency_id, path, dep_type)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(entity_id, dependency_id, path) DO UPDATE
                SET dep_type = excluded.dep_type
                WHERE dependency_edges.dep_type <> excluded.dep_type",
        )?;

        let mut written = 0;
        for edge in edges {
            let path = encode_path(&edge.path)?;
            written += stmt.execute(params![
                edge.entity_id.as_i64(),
                edge.dependency_id.as_i64(),
                path,
                edge.dep_type.as_str()
            ])?;
        }

        trace!(requested = edges.len(), written, "Upserted dependency edges");
        Ok(written)
    }

    fn query_outbound(&self, entity_id: EntityId) -> Result<Vec<DependencyEdge>> {
        self.query_edges(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM dependency_edges WHERE entity_id = ?1 ORDER BY path"
            ),
            entity_id.as_i64(),
        )
    }

    fn query_containing(&self, id: EntityId) -> Result<Vec<DependencyEdge>> {
        self.query_edges(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM dependency_edges
                 WHERE EXISTS (
                     SELECT 1 FROM json_each(dependency_edges.path) WHERE json_each.value = ?1
                 )
                 ORDER BY entity_id, path"
            ),
            id.as_i64(),
        )
    }

    fn delete_edges(&self, filter: &EdgeFilter) -> Result<usize> {
        let removed = match filter {
            EdgeFilter::Key {
                entity_id,
                dependency_id,
                path,
            } => self.conn.execute(
                "DELETE FROM dependency_edges
                 WHERE entity_id = ?1 AND dependency_id = ?2 AND path = ?3",
                params![entity_id.as_i64(), dependency_id.as_i64(), encode_path(path)?],
            )?,
            EdgeFilter::Containing(id) => self.conn.execute(
                "DELETE FROM dependency_edges
                 WHERE EXISTS (
                     SELECT 1 FROM json_each(dependency_edges.path) WHERE json_each.value = ?1
                 )",
                [id.as_i64()],
            )?,
        };

        trace!(?filter, removed, "Deleted dependency edges");
        Ok(removed)
    }

    fn dependant_ids(&self, ids: &[EntityId]) -> Result<Vec<EntityId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids_json = encode_ids(ids)?;
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT entity_id FROM dependency_edges
             WHERE dependency_id IN (SELECT value FROM json_each(?1))
               AND entity_id NOT IN (SELECT value FROM json_each(?1))
             ORDER BY entity_id",
        )?;
        let dependants = stmt
            .query_map([ids_json], |row| row.get::<_, i64>(0).map(EntityId::from))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(dependants)
    }

    fn dependant_names(&self, id: EntityId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT e.name FROM dependency_edges d
             JOIN entities e ON e.id = d.entity_id
             WHERE d.dependency_id = ?1 AND d.entity_id <> ?1
             ORDER BY e.name",
        )?;
        let names = stmt
            .query_map([id.as_i64()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

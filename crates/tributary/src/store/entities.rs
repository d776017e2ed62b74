//! Entity CRUD operations.

use rusqlite::{params, OptionalExtension};

use super::helpers::{encode_ids, row_to_entity, ENTITY_COLUMNS};
use super::SqliteStore;
use crate::error::{Error, Result};
use crate::template::Attributes;
use crate::types::{Entity, EntityId, Kind, NewEntity, Scope};

impl SqliteStore<'_> {
    /// Insert a new entity record.
    ///
    /// Edges are not touched; the caller runs the engine afterwards.
    ///
    /// # Errors
    ///
    /// `Error::Duplicate` if an entity with the same kind, scope and name exists.
    pub fn insert_entity(&self, new: &NewEntity) -> Result<Entity> {
        if self.find_entity(new.kind, &new.scope, &new.name)?.is_some() {
            return Err(Error::Duplicate(format!(
                "{} {} in {}",
                new.kind, new.name, new.scope
            )));
        }

        self.conn.execute(
            "INSERT INTO entities (kind, project, environment, name, attributes, explicit_dependencies)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.kind.as_str(),
                new.scope.project,
                new.scope.environment,
                new.name,
                serde_json::to_string(&new.attributes)?,
                serde_json::to_string(&new.explicit_dependencies)?,
            ],
        )?;

        Ok(Entity {
            id: EntityId(self.conn.last_insert_rowid()),
            kind: new.kind,
            scope: new.scope.clone(),
            name: new.name.clone(),
            attributes: new.attributes.clone(),
            explicit_dependencies: new.explicit_dependencies.clone(),
        })
    }

    /// Replace an entity's attributes and explicit dependencies.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the entity does not exist.
    pub fn update_entity(
        &self,
        id: EntityId,
        attributes: &Attributes,
        explicit_dependencies: &[String],
    ) -> Result<Entity> {
        let updated = self.conn.execute(
            "UPDATE entities SET attributes = ?2, explicit_dependencies = ?3 WHERE id = ?1",
            params![
                id.as_i64(),
                serde_json::to_string(attributes)?,
                serde_json::to_string(explicit_dependencies)?,
            ],
        )?;
        if updated == 0 {
            return Err(Error::entity_not_found(id));
        }

        self.get_entity(id)?
            .ok_or_else(|| Error::entity_not_found(id))
    }

    /// Get an entity by ID.
    pub fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        self.conn
            .query_row(
                &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
                [id.as_i64()],
                row_to_entity,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get an entity by its unique name within kind and scope.
    pub fn find_entity(&self, kind: Kind, scope: &Scope, name: &str) -> Result<Option<Entity>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {ENTITY_COLUMNS} FROM entities
                     WHERE kind = ?1 AND project = ?2 AND environment = ?3 AND name = ?4"
                ),
                params![kind.as_str(), scope.project, scope.environment, name],
                row_to_entity,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List entities of `kind` in `scope`, ordered by name.
    pub fn list_entities(&self, kind: Kind, scope: &Scope) -> Result<Vec<Entity>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities
             WHERE kind = ?1 AND project = ?2 AND environment = ?3
             ORDER BY name"
        ))?;
        let entities = stmt
            .query_map(
                params![kind.as_str(), scope.project, scope.environment],
                row_to_entity,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// IDs of every stored entity.
    pub fn all_entity_ids(&self) -> Result<Vec<EntityId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM entities ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0).map(EntityId::from))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Delete entity records. Remaining edges that name them cascade away.
    pub fn delete_entities(&self, ids: &[EntityId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = self.conn.execute(
            "DELETE FROM entities WHERE id IN (SELECT value FROM json_each(?1))",
            [encode_ids(ids)?],
        )?;
        Ok(removed)
    }
}

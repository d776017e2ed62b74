//! Helper functions for database row conversion and column encoding.
//!
//! JSON columns (`path`, `attributes`, `explicit_dependencies`) are always
//! written through the `encode_*` functions here so that equal values produce
//! byte-identical text; natural-key matching on `path` relies on that.

use rusqlite::types::Type;

use crate::template::Attributes;
use crate::types::{DependencyEdge, DependencyPath, DependencyType, Entity, EntityId, Kind, Scope};

/// SQL column list for the edge table.
///
/// Use with `row_to_edge` for consistent column ordering.
pub(crate) const EDGE_COLUMNS: &str = "entity_id, dependency_id, path, dep_type";

/// SQL column list for the entity table.
///
/// Use with `row_to_entity` for consistent column ordering.
pub(crate) const ENTITY_COLUMNS: &str =
    "id, kind, project, environment, name, attributes, explicit_dependencies";

fn conversion_error(col: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, Type::Text, message.into())
}

/// Parse an entity kind string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_kind(s: &str) -> rusqlite::Result<Kind> {
    Kind::parse(s).ok_or_else(|| {
        conversion_error(
            1,
            format!("Unknown entity kind '{s}' in database. Database may be corrupted or from a newer version."),
        )
    })
}

/// Parse a dependency type string from the database.
pub(crate) fn parse_dependency_type(s: &str) -> rusqlite::Result<DependencyType> {
    match s {
        "implicit" => Ok(DependencyType::Implicit),
        "explicit" => Ok(DependencyType::Explicit),
        unknown => Err(conversion_error(
            3,
            format!("Unknown dependency type '{unknown}' in database. Database may be corrupted or from a newer version."),
        )),
    }
}

/// Encode a path as its JSON array text.
pub(crate) fn encode_path(path: &DependencyPath) -> serde_json::Result<String> {
    serde_json::to_string(path)
}

/// Encode a list of entity IDs as a JSON array (for `json_each` parameters).
pub(crate) fn encode_ids(ids: &[EntityId]) -> serde_json::Result<String> {
    serde_json::to_string(ids)
}

fn decode_json<T: serde::de::DeserializeOwned>(col: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(e)))
}

/// Convert a row selected with `EDGE_COLUMNS` into an edge.
pub(crate) fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<DependencyEdge> {
    let path: String = row.get(2)?;
    let dep_type: String = row.get(3)?;

    Ok(DependencyEdge {
        entity_id: EntityId(row.get(0)?),
        dependency_id: EntityId(row.get(1)?),
        path: decode_json(2, &path)?,
        dep_type: parse_dependency_type(&dep_type)?,
    })
}

/// Convert a row selected with `ENTITY_COLUMNS` into an entity.
pub(crate) fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<Entity> {
    let kind: String = row.get(1)?;
    let attributes: String = row.get(5)?;
    let explicit: String = row.get(6)?;

    Ok(Entity {
        id: EntityId(row.get(0)?),
        kind: parse_kind(&kind)?,
        scope: Scope {
            project: row.get(2)?,
            environment: row.get(3)?,
        },
        name: row.get(4)?,
        attributes: decode_json::<Attributes>(5, &attributes)?,
        explicit_dependencies: decode_json(6, &explicit)?,
    })
}

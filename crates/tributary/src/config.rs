//! Configuration management for Tributary.
//!
//! Configuration lives in a YAML file (`tributary.yaml` by default):
//!
//! ```yaml
//! database: .tributary/graph.db
//! delete_policy: block      # block | orphan | cascade
//! references: ignore        # ignore | reject
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "tributary.yaml";

/// Default database location, relative to the working directory.
pub const DEFAULT_DATABASE: &str = ".tributary/graph.db";

/// What to do with entities that depend on an entity being deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Refuse the delete while anything depends on the entity.
    #[default]
    Block,
    /// Delete the entity and every route through it; dependants stay.
    Orphan,
    /// Delete the entity together with all of its transitive dependants.
    Cascade,
}

/// What to do with referenced names that match no entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Drop them; the save succeeds without those edges.
    #[default]
    Ignore,
    /// Fail the save with `Error::UnresolvedReference`.
    Reject,
}

/// Configuration for Tributary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the `SQLite` database.
    pub database: PathBuf,
    /// Policy applied by `Tributary::delete`.
    pub delete_policy: DeletePolicy,
    /// Policy for unresolved reference names.
    pub references: ReferencePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            delete_policy: DeletePolicy::default(),
            references: ReferencePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// `Error::Io` if the file exists but cannot be read, `Error::Config` if it
    /// is not valid configuration YAML.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// `Error::Config` for malformed YAML or unknown keys.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.delete_policy, DeletePolicy::Block);
        assert_eq!(config.references, ReferencePolicy::Ignore);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml("delete_policy: cascade\n").unwrap();
        assert_eq!(config.delete_policy, DeletePolicy::Cascade);
        assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE));
    }

    #[test]
    fn loads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "database: /tmp/graph.db\ndelete_policy: orphan\nreferences: reject\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/graph.db"));
        assert_eq!(config.delete_policy, DeletePolicy::Orphan);
        assert_eq!(config.references, ReferencePolicy::Reject);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_yaml("delete_policy: block\nretries: 3\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }
}

//! CLI command implementations.

mod display;

pub mod apply;
pub mod check;
pub mod delete;
pub mod deps;
pub mod order;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tributary::{Config, DeletePolicy, DependencyType, Entity, Kind, Scope, Tributary};

/// Kind and scope every command operates in.
pub struct Target {
    pub kind: Kind,
    pub scope: Scope,
}

/// Load the configuration and open the graph it names.
///
/// `db` overrides the configured database path.
pub fn open(db: Option<PathBuf>, config_path: &Path) -> Result<Tributary> {
    let mut config = Config::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(db) = db {
        config.database = db;
    }

    tracing::debug!(database = %config.database.display(), "Opening graph");
    Tributary::open(config.clone())
        .with_context(|| format!("opening database {}", config.database.display()))
}

/// Look up an entity by name, failing if it does not exist.
pub fn resolve(graph: &Tributary, target: &Target, name: &str) -> Result<Entity> {
    graph
        .find_by_name(target.kind, &target.scope, name)?
        .with_context(|| format!("no {} named '{name}' in {}", target.kind, target.scope))
}

/// Entity kind for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    /// Deployable resource
    #[value(alias = "res")]
    Resource,
    /// Service
    Service,
}

impl From<KindArg> for Kind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Resource => Kind::Resource,
            KindArg::Service => Kind::Service,
        }
    }
}

/// Delete policy for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicyArg {
    /// Refuse while anything depends on the entity
    Block,
    /// Delete the entity; dependants lose their routes through it
    Orphan,
    /// Delete the entity and everything that depends on it
    Cascade,
}

impl From<DeletePolicyArg> for DeletePolicy {
    fn from(arg: DeletePolicyArg) -> Self {
        match arg {
            DeletePolicyArg::Block => DeletePolicy::Block,
            DeletePolicyArg::Orphan => DeletePolicy::Orphan,
            DeletePolicyArg::Cascade => DeletePolicy::Cascade,
        }
    }
}

/// Dependency type for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyTypeArg {
    /// Declared through an attribute reference
    Implicit,
    /// Declared in the explicit dependency list
    Explicit,
}

impl From<DependencyTypeArg> for DependencyType {
    fn from(arg: DependencyTypeArg) -> Self {
        match arg {
            DependencyTypeArg::Implicit => DependencyType::Implicit,
            DependencyTypeArg::Explicit => DependencyType::Explicit,
        }
    }
}

//! `tributary apply` command implementation.
//!
//! Manifest format (YAML, or JSON since JSON is valid YAML):
//!
//! ```yaml
//! entities:
//!   - name: db
//!   - name: app
//!     attributes:
//!       DATABASE_URL: "${res.db.url}"
//!       replicas: 3
//!       env:
//!         CACHE_HOST: "${res.cache.host}"
//!   - name: worker
//!     kind: resource
//!     depends_on: [app]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;
use tributary::{Attributes, Kind, NewEntity, SaveOutcome, Tributary};

use super::Target;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    entities: Vec<ManifestEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntity {
    name: String,
    #[serde(default)]
    kind: Option<Kind>,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    depends_on: Vec<String>,
}

impl ManifestEntity {
    fn into_new_entity(self, target: &Target) -> NewEntity {
        NewEntity {
            kind: self.kind.unwrap_or(target.kind),
            scope: target.scope.clone(),
            name: self.name,
            attributes: self.attributes,
            explicit_dependencies: self.depends_on,
        }
    }
}

/// Run the apply command.
///
/// Entities are applied in manifest order. Entities whose references were
/// still unresolved are saved again once the whole manifest is in, so
/// forward references within one manifest resolve.
pub fn run(graph: &Tributary, target: &Target, manifest: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(manifest)
        .with_context(|| format!("reading {}", manifest.display()))?;
    let parsed: Manifest = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing {}", manifest.display()))?;

    if parsed.entities.is_empty() {
        println!("{}", "Manifest contains no entities.".dimmed());
        return Ok(());
    }

    let mut pending = Vec::new();
    for entry in parsed.entities {
        let new = entry.into_new_entity(target);
        let existed = graph
            .find_by_name(new.kind, &new.scope, &new.name)?
            .is_some();
        let name = new.name.clone();
        let outcome = graph
            .apply(new)
            .with_context(|| format!("applying {name}"))?;

        report(if existed { "updated" } else { "created" }, &outcome);
        if !outcome.unresolved.is_empty() {
            pending.push(outcome.entity.id);
        }
    }

    for id in pending {
        let outcome = graph.resave(id)?;
        if outcome.unresolved.is_empty() {
            report("resolved", &outcome);
        } else {
            println!(
                "  {} {}: unresolved {}",
                "!".yellow().bold(),
                outcome.entity.name,
                outcome.unresolved.join(", ").yellow()
            );
        }
    }

    Ok(())
}

fn report(action: &str, outcome: &SaveOutcome) {
    let dependencies = outcome.edges.iter().filter(|e| !e.is_self()).count();
    println!(
        "  {} {} {} ({} dependency routes)",
        "✓".green().bold(),
        action,
        outcome.entity.name.bold(),
        dependencies
    );
}

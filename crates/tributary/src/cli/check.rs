//! `tributary check` command implementation.

use anyhow::{bail, Result};
use colored::Colorize;
use tributary::Tributary;

/// Run the check command. Fails if any violation is found.
pub fn run(graph: &Tributary) -> Result<()> {
    let report = graph.audit()?;

    if report.is_clean() {
        println!(
            "{} ({} entities, {} edges checked)",
            "Dependency graph is consistent.".green(),
            report.entities_checked,
            report.edges_checked
        );
        return Ok(());
    }

    println!(
        "Found {} violations:",
        report.violations.len().to_string().red().bold()
    );
    for violation in &report.violations {
        match &violation.edge {
            Some(edge) => println!(
                "  {} entity {}: {} {}",
                "•".dimmed(),
                violation.entity_id,
                violation.kind,
                format!("[{}]", edge.path).dimmed()
            ),
            None => println!(
                "  {} entity {}: {}",
                "•".dimmed(),
                violation.entity_id,
                violation.kind
            ),
        }
    }

    bail!("dependency graph has {} violations", report.violations.len())
}

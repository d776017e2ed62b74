//! `tributary delete` command implementation.

use anyhow::Result;
use colored::Colorize;
use tributary::{DeletePolicy, Tributary};

use super::{resolve, Target};

/// Run the delete command.
///
/// Without `policy` the configured delete policy applies.
pub fn run(
    graph: &Tributary,
    target: &Target,
    name: &str,
    policy: Option<DeletePolicy>,
) -> Result<()> {
    let entity = resolve(graph, target, name)?;
    let policy = policy.unwrap_or(graph.config().delete_policy);

    let outcome = graph.delete(entity.id, policy)?;

    println!(
        "{} deleted {} ({} edges removed)",
        "✓".green().bold(),
        name.bold(),
        outcome.edges_removed
    );
    let cascaded = outcome.removed.len().saturating_sub(1);
    if cascaded > 0 {
        println!(
            "  {} {} dependant(s) removed by cascade",
            "•".dimmed(),
            cascaded.to_string().yellow()
        );
    }

    Ok(())
}

//! `tributary order` command implementation.

use anyhow::Result;
use colored::Colorize;
use tributary::Tributary;

use super::Target;

/// Run the order command.
pub fn run(graph: &Tributary, target: &Target) -> Result<()> {
    let order = graph.deployment_order(target.kind, &target.scope)?;

    if order.is_empty() {
        println!("{}", format!("No {} entities in {}.", target.kind, target.scope).dimmed());
        return Ok(());
    }

    println!(
        "{} order for {} ({}):",
        "Deployment".bold(),
        target.scope.to_string().cyan(),
        target.kind
    );
    for (i, entity) in order.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, entity.name);
    }

    Ok(())
}

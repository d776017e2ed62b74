//! `tributary deps` and `tributary dependants` command implementations.

use anyhow::Result;
use colored::Colorize;
use tributary::{DependencyType, Tributary};

use super::display::{print_list, Names};
use super::{resolve, Target};

/// Run the deps command.
///
/// Lists every dependency once, or every stored route with `paths`.
pub fn run(
    graph: &Tributary,
    target: &Target,
    name: &str,
    dep_type: Option<DependencyType>,
    paths: bool,
) -> Result<()> {
    let entity = resolve(graph, target, name)?;
    let names = Names::new(&graph.list(target.kind, &target.scope)?);

    println!("{} {}:", "Dependencies of".bold(), name.cyan().bold());

    let items: Vec<String> = if paths {
        graph
            .outbound_edges(entity.id)?
            .iter()
            .filter(|e| !e.is_self())
            .filter(|e| dep_type.is_none_or(|t| e.dep_type == t))
            .map(|e| {
                let dep_type = format!("({})", e.dep_type.as_str());
                format!("{} {}", names.path(&e.path), dep_type.dimmed())
            })
            .collect()
    } else {
        graph
            .dependency_ids(entity.id, dep_type)?
            .into_iter()
            .map(|id| names.get(id))
            .collect()
    };

    print_list(&items, "No dependencies.");
    Ok(())
}

/// Run the dependants command.
pub fn run_dependants(graph: &Tributary, target: &Target, name: &str) -> Result<()> {
    let entity = resolve(graph, target, name)?;
    let dependants = graph.dependant_names(entity.id)?;

    println!("{} {}:", "Dependants of".bold(), name.cyan().bold());
    print_list(&dependants, "Nothing depends on this entity.");
    Ok(())
}

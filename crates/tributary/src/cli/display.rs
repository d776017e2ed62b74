//! Common display utilities for CLI commands.

use std::collections::HashMap;

use colored::Colorize;
use tributary::{DependencyPath, Entity, EntityId};

const MAX_DISPLAY_ITEMS: usize = 20;

/// Entity names keyed by ID, for rendering paths.
pub struct Names(HashMap<EntityId, String>);

impl Names {
    pub fn new(entities: &[Entity]) -> Self {
        Self(entities.iter().map(|e| (e.id, e.name.clone())).collect())
    }

    /// Name of `id`, or `#id` if it is outside the listed entities.
    pub fn get(&self, id: EntityId) -> String {
        self.0
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("#{id}"))
    }

    /// Render a path as `db → app → web`.
    pub fn path(&self, path: &DependencyPath) -> String {
        path.ids()
            .iter()
            .map(|&id| self.get(id))
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// Print a bulleted list, truncated after `MAX_DISPLAY_ITEMS`.
pub fn print_list(items: &[String], empty_message: &str) {
    if items.is_empty() {
        println!("  {}", empty_message.dimmed());
        return;
    }

    for item in items.iter().take(MAX_DISPLAY_ITEMS) {
        println!("  {} {item}", "•".dimmed());
    }

    if items.len() > MAX_DISPLAY_ITEMS {
        println!(
            "  {} ... and {} more",
            "•".dimmed(),
            items.len() - MAX_DISPLAY_ITEMS
        );
    }
}

//! Direct reference discovery.
//!
//! Walks an entity's parsed attribute templates and collects the names of the
//! entities it references. Only tokens whose kind prefix belongs to the
//! entity's own kind count: a resource's `${service.api.url}` is not a
//! resource dependency.

use std::collections::BTreeSet;

use super::Node;
use crate::template::Attributes;
use crate::types::{DependencyType, Kind};

/// Names referenced from `attributes` by tokens of the given kind, deduplicated and sorted.
#[must_use]
pub fn attribute_reference_names(kind: Kind, attributes: &Attributes) -> BTreeSet<String> {
    attributes
        .references()
        .filter(|r| kind.accepts_token(&r.kind))
        .map(|r| r.name.clone())
        .collect()
}

/// Every name `node` depends on directly: attribute references plus explicit
/// dependencies, sorted and deduplicated.
#[must_use]
pub fn direct_reference_names<N: Node + ?Sized>(node: &N) -> Vec<String> {
    DirectReferences::of(node).names().cloned().collect()
}

/// A node's direct references, split by how they were declared.
#[derive(Debug, Default, Clone)]
pub(crate) struct DirectReferences {
    implicit: BTreeSet<String>,
    explicit: BTreeSet<String>,
}

impl DirectReferences {
    pub(crate) fn of<N: Node + ?Sized>(node: &N) -> Self {
        Self {
            implicit: attribute_reference_names(node.kind(), node.attributes()),
            explicit: node.explicit_dependencies().iter().cloned().collect(),
        }
    }

    /// All referenced names in sorted order.
    pub(crate) fn names(&self) -> impl Iterator<Item = &String> {
        self.implicit.union(&self.explicit)
    }

    /// All referenced names as an owned set (resolver input).
    pub(crate) fn name_set(&self) -> BTreeSet<String> {
        self.names().cloned().collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.implicit.is_empty() && self.explicit.is_empty()
    }

    /// Edge type for a hop into the node from `name`.
    ///
    /// Attribute references win over explicit declarations of the same name.
    pub(crate) fn type_for(&self, name: &str) -> DependencyType {
        if self.implicit.contains(name) {
            DependencyType::Implicit
        } else {
            DependencyType::Explicit
        }
    }
}

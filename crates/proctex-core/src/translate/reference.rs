//! Positions of graph elements within a procedural descriptor
//!
//! Built in two phases: every element is registered before any connection is
//! resolved, so a reference to a node declared later in the graph still
//! finds its position.

use indexmap::IndexSet;

/// Identity to position mapping for one descriptor collection.
///
/// Identities are tree paths on export and native names on import.
#[derive(Debug, Clone, Default)]
pub struct Positions {
    identities: IndexSet<String>,
}

impl Positions {
    /// Record an identity, returning its position
    pub fn register(&mut self, identity: impl Into<String>) -> usize {
        self.identities.insert_full(identity.into()).0
    }

    pub fn position(&self, identity: &str) -> Option<usize> {
        self.identities.get_index_of(identity)
    }

    pub fn identity(&self, position: usize) -> Option<&str> {
        self.identities.get_index(position).map(String::as_str)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.identities.iter().map(String::as_str)
    }
}

/// Positions of the nodes, inputs and outputs of one graph
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    pub nodes: Positions,
    pub inputs: Positions,
    pub outputs: Positions,
}

//! Parent-map construction.
//!
//! One recursive walk per snapshot per reconciliation pass. The map answers
//! "which parent did id X have in this snapshot" in O(1), which is what lets
//! the differ detect cross-parent moves without positional heuristics.

use std::collections::HashMap;

use washi_types::{NodeId, SnapshotNode};

/// `id → parent id` for one snapshot. Children of the root map to `None`.
///
/// The root itself is never a key. Nodes without an id are omitted — they
/// are unaddressable and always replaced wholesale by the differ.
#[derive(Debug, Default)]
pub struct ParentMap {
    entries: HashMap<NodeId, Option<NodeId>>,
}

impl ParentMap {
    /// Build the map by walking a snapshot tree once.
    pub fn build(root: &SnapshotNode) -> Self {
        let mut map = Self {
            entries: HashMap::new(),
        };
        for child in &root.children {
            map.walk(child, None);
        }
        map
    }

    fn walk(&mut self, node: &SnapshotNode, parent: Option<NodeId>) {
        if let Some(id) = node.id {
            self.entries.insert(id, parent);
        }
        for child in &node.children {
            // An id-less node is not a parent anyone can be found under;
            // its children attach to the nearest addressable ancestor.
            self.walk(child, node.id.or(parent));
        }
    }

    /// The parent recorded for `id`: `Some(None)` means "attached to root",
    /// outer `None` means the id does not appear in this snapshot.
    pub fn parent_of(&self, id: NodeId) -> Option<Option<NodeId>> {
        self.entries.get(&id).copied()
    }

    /// Check if `id` appears in this snapshot.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of addressable nodes in the snapshot (root excluded).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot has no addressable nodes below the root.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Comparable-value projection.
//!
//! A [`NodeValue`] is a node's fields without its child list — the shape
//! handed to the host editor's update operation. [`NodeValue::comparable`]
//! additionally strips the kind's volatile fields, producing the equality
//! key the differ uses to decide "did this node change". Volatile fields
//! (an image `src` with a reissued signed query string) would otherwise
//! trigger a spurious update on every pass.
//!
//! Both projections are pure and are never written back into a snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use washi_types::{NodeKind, PeerId, SnapshotNode};

/// A node's fields, projected without its child list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeValue {
    /// Content type.
    pub kind: NodeKind,
    /// Peer whose edit last produced this state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<PeerId>,
    /// Flat scalar/structured fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl NodeValue {
    /// Project a snapshot node: shallow-copy everything except the child list.
    pub fn of(node: &SnapshotNode) -> Self {
        Self {
            kind: node.kind,
            author: node.author,
            fields: node.fields.clone(),
        }
    }

    /// The equality key: this value with the kind's volatile fields removed.
    ///
    /// Removal rather than a placeholder keeps the comparison symmetric — a
    /// node that gained or lost a volatile field compares equal either way.
    pub fn comparable(&self) -> Self {
        let volatile = self.kind.volatile_fields();
        if volatile.is_empty() {
            return self.clone();
        }
        let mut fields = self.fields.clone();
        for name in volatile {
            fields.remove(*name);
        }
        Self {
            kind: self.kind,
            author: self.author,
            fields,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

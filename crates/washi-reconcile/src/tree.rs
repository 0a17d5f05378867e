//! Host-editor tree interface.
//!
//! The live tree is owned by the host editor; the reconciler drives it
//! exclusively through [`EditorTree`]. Every operation is synchronous — a
//! pass must complete atomically from the rendering layer's perspective, so
//! there is no suspension point anywhere in this trait.
//!
//! The id → key identity map is host-owned. The reconciler's read access is
//! [`EditorTree::lookup`]; new entries are registered by the host inside
//! [`EditorTree::deserialize_node`] when fresh nodes are instantiated.

use serde::{Deserialize, Serialize};

use washi_types::{NodeId, NodeKey, PeerId, SnapshotNode};

use crate::error::ReconcileError;
use crate::value::NodeValue;

/// Whether a change originated from the local peer or a remote collaborator.
///
/// Advisory metadata for presentation layers (remote-edit highlighting).
/// Never consulted by the reconciliation logic itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOrigin {
    /// The change was authored by this editor instance's own peer.
    Local,
    /// The change arrived from a remote collaborator.
    Remote,
}

/// Synchronous mutation surface of the host editor's live tree.
///
/// The reconciler holds no long-lived references to live nodes — it
/// re-resolves by id or key at each step, which naturally tolerates nodes
/// being replaced mid-pass.
pub trait EditorTree {
    /// The live root. A singleton owned by the host for the lifetime of the
    /// document; the reconciler never replaces or value-diffs it.
    fn root(&self) -> NodeKey;

    /// Identity-map read: the live key for a snapshot id, if one exists.
    fn lookup(&self, id: NodeId) -> Option<NodeKey>;

    /// Check if the live node can hold children.
    fn is_element(&self, key: NodeKey) -> bool;

    /// Position of `child` within `parent`'s child list, if attached there.
    fn child_index(&self, parent: NodeKey, child: NodeKey) -> Option<usize>;

    /// Remove `delete` children of `parent` starting at `index`, then insert
    /// `insert` at that position. Detached nodes stay alive in the host's
    /// slab — identity is preserved across detach/attach.
    fn splice_children(
        &mut self,
        parent: NodeKey,
        index: usize,
        delete: usize,
        insert: &[NodeKey],
    ) -> Result<(), ReconcileError>;

    /// Instantiate a whole serialized subtree as fresh live nodes and
    /// register their id → key entries. Partial construction is not
    /// supported: the subtree must be deserializable independently.
    fn deserialize_node(&mut self, node: &SnapshotNode) -> Result<NodeKey, ReconcileError>;

    /// Replace the live node's value with `value`, field-by-field. Fully
    /// replacing — no partial or deep-merge semantics.
    fn update_node(&mut self, key: NodeKey, value: &NodeValue) -> Result<(), ReconcileError>;

    /// Peer identity recorded on the live node, if any.
    fn author(&self, key: NodeKey) -> Option<PeerId>;

    /// Record the origin tag on the live node.
    fn set_origin(&mut self, key: NodeKey, origin: EditOrigin);

    /// Schedule the node for re-render. Idempotent: marking a node dirty
    /// twice is a no-op.
    fn mark_dirty(&mut self, key: NodeKey);
}

// ============================================================================
// Tests
// ============================================================================

//! Reference in-memory editor tree.
//!
//! A slab of [`LiveNode`]s keyed by [`NodeKey`], with the id ↔ key identity
//! map and a mutation journal. This is the substrate the reconciler is
//! tested against, and a working model of what a host editor must provide —
//! real hosts bind these operations to their own node objects instead.
//!
//! Detached nodes stay in the slab: a splice-out removes a key from a child
//! list, nothing more. Reclaiming unreachable nodes is host garbage
//! collection and out of the reconciler's hands.

use std::collections::{BTreeMap, HashMap};

use washi_types::{NodeId, NodeKey, NodeKind, PeerId, SnapshotNode};

use crate::error::ReconcileError;
use crate::tree::{EditOrigin, EditorTree};
use crate::value::NodeValue;

/// One node of the live tree.
#[derive(Clone, Debug)]
pub struct LiveNode {
    /// Snapshot identity, if the node is addressable.
    pub id: Option<NodeId>,
    /// Content type.
    pub kind: NodeKind,
    /// Peer whose edit last produced this state.
    pub author: Option<PeerId>,
    /// Flat scalar/structured fields.
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Ordered child handles.
    pub children: Vec<NodeKey>,
    /// Re-render scheduled.
    pub dirty: bool,
    /// Origin of the last applied change, if any change was applied.
    pub origin: Option<EditOrigin>,
}

/// One recorded live-tree mutation.
///
/// The journal is what lets tests assert exact mutation sets: zero entries
/// for an idempotent pass, exactly one `Update` for a single field change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Children removed and/or inserted on a parent.
    Splice {
        parent: NodeKey,
        index: usize,
        removed: usize,
        inserted: usize,
    },
    /// A node's value was replaced.
    Update { key: NodeKey },
    /// A node transitioned from clean to dirty.
    MarkDirty { key: NodeKey },
    /// A node's origin tag was written.
    SetOrigin { key: NodeKey, origin: EditOrigin },
}

/// In-memory live tree: slab + identity map + root singleton + journal.
#[derive(Debug)]
pub struct MemoryTree {
    nodes: HashMap<NodeKey, LiveNode>,
    index: HashMap<NodeId, NodeKey>,
    root: NodeKey,
    next_key: u64,
    journal: Vec<Mutation>,
}

impl MemoryTree {
    /// Create a tree holding only an empty root.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            index: HashMap::new(),
            root: NodeKey::from_raw(0),
            next_key: 0,
            journal: Vec::new(),
        };
        tree.root = tree.alloc(LiveNode {
            id: None,
            kind: NodeKind::Root,
            author: None,
            fields: BTreeMap::new(),
            children: Vec::new(),
            dirty: false,
            origin: None,
        });
        tree
    }

    /// Bootstrap a live tree from a snapshot. The journal starts empty —
    /// building the initial tree is not a reconciliation mutation.
    pub fn from_snapshot(snapshot: &SnapshotNode) -> Self {
        let mut tree = Self::new();
        let root = tree.root;
        if let Some(node) = tree.nodes.get_mut(&root) {
            node.id = snapshot.id;
            node.kind = snapshot.kind;
            node.author = snapshot.author;
            node.fields = snapshot.fields.clone();
        }
        if let Some(id) = snapshot.id {
            tree.index.insert(id, root);
        }
        let children: Vec<NodeKey> = snapshot
            .children
            .iter()
            .map(|c| tree.instantiate(c))
            .collect();
        if let Some(node) = tree.nodes.get_mut(&root) {
            node.children = children;
        }
        tree
    }

    fn alloc(&mut self, node: LiveNode) -> NodeKey {
        let key = NodeKey::from_raw(self.next_key);
        self.next_key += 1;
        self.nodes.insert(key, node);
        key
    }

    /// Instantiate a serialized subtree as fresh live nodes, registering
    /// id → key entries. A stale identity entry for the same id is replaced.
    fn instantiate(&mut self, node: &SnapshotNode) -> NodeKey {
        let children: Vec<NodeKey> = node.children.iter().map(|c| self.instantiate(c)).collect();
        let key = self.alloc(LiveNode {
            id: node.id,
            kind: node.kind,
            author: node.author,
            fields: node.fields.clone(),
            children,
            dirty: false,
            origin: None,
        });
        if let Some(id) = node.id {
            self.index.insert(id, key);
        }
        key
    }

    /// Get a live node by key.
    pub fn node(&self, key: NodeKey) -> Option<&LiveNode> {
        self.nodes.get(&key)
    }

    /// Get a live node by snapshot id.
    pub fn get(&self, id: NodeId) -> Option<&LiveNode> {
        self.index.get(&id).and_then(|key| self.nodes.get(key))
    }

    /// Number of nodes in the slab, detached nodes included.
    pub fn slab_len(&self) -> usize {
        self.nodes.len()
    }

    /// Drop the identity entry for `id` without touching the node.
    ///
    /// Host eviction surface; in tests it simulates a stale identity map.
    pub fn unregister(&mut self, id: NodeId) -> Option<NodeKey> {
        self.index.remove(&id)
    }

    /// Keys of all nodes currently marked dirty, in slab order.
    pub fn dirty_keys(&self) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.dirty)
            .map(|(k, _)| *k)
            .collect();
        keys.sort();
        keys
    }

    /// Clear all dirty marks (the host does this after a render).
    pub fn clear_dirty(&mut self) {
        for node in self.nodes.values_mut() {
            node.dirty = false;
        }
    }

    /// Take the mutation journal, leaving it empty.
    pub fn take_journal(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }

    /// Peek at the journal without clearing it.
    pub fn journal(&self) -> &[Mutation] {
        &self.journal
    }

    /// Re-serialize the live tree reachable from the root.
    pub fn snapshot(&self) -> SnapshotNode {
        self.serialize(self.root)
    }

    fn serialize(&self, key: NodeKey) -> SnapshotNode {
        let Some(node) = self.nodes.get(&key) else {
            // A dangling child handle — serialize a hole rather than panic.
            return SnapshotNode::root(Vec::new());
        };
        SnapshotNode {
            id: node.id,
            kind: node.kind,
            author: node.author,
            fields: node.fields.clone(),
            children: node.children.iter().map(|c| self.serialize(*c)).collect(),
        }
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorTree for MemoryTree {
    fn root(&self) -> NodeKey {
        self.root
    }

    fn lookup(&self, id: NodeId) -> Option<NodeKey> {
        self.index.get(&id).copied()
    }

    fn is_element(&self, key: NodeKey) -> bool {
        self.nodes
            .get(&key)
            .map(|n| n.kind.is_element())
            .unwrap_or(false)
    }

    fn child_index(&self, parent: NodeKey, child: NodeKey) -> Option<usize> {
        self.nodes
            .get(&parent)
            .and_then(|n| n.children.iter().position(|k| *k == child))
    }

    fn splice_children(
        &mut self,
        parent: NodeKey,
        index: usize,
        delete: usize,
        insert: &[NodeKey],
    ) -> Result<(), ReconcileError> {
        let node = self
            .nodes
            .get_mut(&parent)
            .ok_or(ReconcileError::UnknownKey(parent))?;
        let len = node.children.len();
        if index > len || index + delete > len {
            return Err(ReconcileError::SpliceOutOfBounds {
                key: parent,
                index,
                len,
            });
        }
        node.children
            .splice(index..index + delete, insert.iter().copied());
        self.journal.push(Mutation::Splice {
            parent,
            index,
            removed: delete,
            inserted: insert.len(),
        });
        Ok(())
    }

    fn deserialize_node(&mut self, node: &SnapshotNode) -> Result<NodeKey, ReconcileError> {
        Ok(self.instantiate(node))
    }

    fn update_node(&mut self, key: NodeKey, value: &NodeValue) -> Result<(), ReconcileError> {
        let node = self
            .nodes
            .get_mut(&key)
            .ok_or(ReconcileError::UnknownKey(key))?;
        // Fully replacing, field-by-field — fields absent from the value are
        // dropped, not merged around.
        node.kind = value.kind;
        node.author = value.author;
        node.fields = value.fields.clone();
        self.journal.push(Mutation::Update { key });
        Ok(())
    }

    fn author(&self, key: NodeKey) -> Option<PeerId> {
        self.nodes.get(&key).and_then(|n| n.author)
    }

    fn set_origin(&mut self, key: NodeKey, origin: EditOrigin) {
        if let Some(node) = self.nodes.get_mut(&key) {
            node.origin = Some(origin);
            self.journal.push(Mutation::SetOrigin { key, origin });
        }
    }

    fn mark_dirty(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.get_mut(&key) {
            if !node.dirty {
                node.dirty = true;
                self.journal.push(Mutation::MarkDirty { key });
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! The reconciliation pass: diff two snapshots, apply the difference to the
//! live tree.
//!
//! One [`ReconcilePass`] exists per (old, new) snapshot pair — created, run
//! to completion, discarded. It carries the two parent maps and the local
//! peer identity; everything else is re-resolved through the host editor at
//! each step.
//!
//! The diff is a single linear pass per sibling level, keyed by stable node
//! ids — not a general tree-edit-distance algorithm. The CRDT layer
//! preserves ids across merges, so id lookup is the correlation signal and
//! moves are detected in O(1) per node via the parent maps.
//!
//! Error policy: failures are contained at the smallest scope that can skip
//! them — a single node's value update, or a single subtree — and logged.
//! Siblings always proceed; the pass as a whole converges the rest of the
//! document.

use std::collections::HashMap;

use tracing::{debug, warn};

use washi_types::{NodeId, NodeKey, PeerId, SnapshotNode};

use crate::error::ReconcileError;
use crate::parent_map::ParentMap;
use crate::tree::{EditOrigin, EditorTree};
use crate::value::NodeValue;

/// Reconcile the live tree from `old` to `new`.
///
/// Builds both parent maps and diffs the root's children. The root node
/// itself is never replaced or value-diffed — it is a singleton owned by
/// the host editor for the lifetime of the document.
///
/// Callers must invoke this serially, in snapshot production order: pass
/// *n*'s `old` must be pass *n−1*'s `new` (modulo local edits the CRDT
/// layer folded in). The pass mutates the live tree that the next pass's
/// old parent map implicitly assumes is already caught up.
pub fn reconcile<T: EditorTree>(
    editor: &mut T,
    old: &SnapshotNode,
    new: &SnapshotNode,
    local_peer: PeerId,
) -> Result<(), ReconcileError> {
    let mut old_nodes = HashMap::new();
    index_snapshot(old, &mut old_nodes);
    let mut pass = ReconcilePass {
        editor,
        old_parents: ParentMap::build(old),
        new_parents: ParentMap::build(new),
        old_nodes,
        local_peer,
    };
    pass.diff_children(None, &old.children, &new.children)
}

/// Index a snapshot's addressable nodes by id, root excluded.
///
/// The differ resolves "the old serialized form of this id" through this
/// index when the id moved in from another parent and therefore has no
/// entry at the current sibling level — both its value comparison and the
/// removal of its old-side children depend on it.
fn index_snapshot<'s>(node: &'s SnapshotNode, out: &mut HashMap<NodeId, &'s SnapshotNode>) {
    for child in &node.children {
        if let Some(id) = child.id {
            out.insert(id, child);
        }
        index_snapshot(child, out);
    }
}

/// Ephemeral state for one reconciliation pass.
struct ReconcilePass<'a, T: EditorTree> {
    editor: &'a mut T,
    old_parents: ParentMap,
    new_parents: ParentMap,
    old_nodes: HashMap<NodeId, &'a SnapshotNode>,
    local_peer: PeerId,
}

impl<'a, T: EditorTree> ReconcilePass<'a, T> {
    /// Resolve a diff target to a live key capable of holding children.
    /// `None` is the root sentinel.
    fn resolve_parent(&self, parent_id: Option<NodeId>) -> Result<NodeKey, ReconcileError> {
        let Some(id) = parent_id else {
            return Ok(self.editor.root());
        };
        let key = self
            .editor
            .lookup(id)
            .ok_or(ReconcileError::ParentNotFound(id))?;
        if !self.editor.is_element(key) {
            return Err(ReconcileError::ParentNotElement(id));
        }
        Ok(key)
    }

    /// Diff one sibling level and recurse into matched children.
    fn diff_children(
        &mut self,
        parent_id: Option<NodeId>,
        old_children: &'a [SnapshotNode],
        new_children: &[SnapshotNode],
    ) -> Result<(), ReconcileError> {
        let parent_key = self.resolve_parent(parent_id)?;

        let old_index: HashMap<NodeId, usize> = old_children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.id.map(|id| (id, i)))
            .collect();
        let new_index: HashMap<NodeId, usize> = new_children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.id.map(|id| (id, i)))
            .collect();

        self.remove_stale_children(parent_key, old_children, &new_index);

        // Reconciliation pass — new order, left to right.
        for (target, child) in new_children.iter().enumerate() {
            let Some(id) = child.id else {
                // Unaddressable node: always instantiate-fresh.
                let key = self.editor.deserialize_node(child)?;
                self.editor.splice_children(parent_key, target, 0, &[key])?;
                continue;
            };

            let Some(key) = self.editor.lookup(id) else {
                // Brand-new id: the whole serialized subtree instantiates
                // independently, so no recursion below is needed.
                let key = self.editor.deserialize_node(child)?;
                self.editor.splice_children(parent_key, target, 0, &[key])?;
                continue;
            };

            self.place_child(parent_key, parent_id, id, key, target)?;

            // Value-change detection against the old serialized form of
            // this id — found at this sibling level, or anywhere in the old
            // snapshot for a node that moved in from another parent. An id
            // that is live but absent from the old snapshot entirely has
            // nothing to compare against; apply unconditionally and
            // converge.
            let old_child = old_index
                .get(&id)
                .map(|&i| &old_children[i])
                .or_else(|| self.old_nodes.get(&id).copied());
            let new_value = NodeValue::of(child);
            let changed = match old_child {
                Some(old) => NodeValue::of(old).comparable() != new_value.comparable(),
                None => true,
            };
            if changed {
                if let Err(err) = self.apply_value(id, &new_value) {
                    warn!("value update for {} failed: {}", id, err);
                }
            }

            // Descend whenever either side has children — old-side-only
            // children must still be removed.
            let old_sub = old_child.map(|o| o.children.as_slice()).unwrap_or(&[]);
            if !child.children.is_empty() || !old_sub.is_empty() {
                if let Err(err) = self.diff_children(Some(id), old_sub, &child.children) {
                    warn!("skipping subtree under {}: {}", id, err);
                }
            }
        }

        Ok(())
    }

    /// Removal pass: splice out old children whose id is absent from the new
    /// list. Iterating last-to-first keeps earlier live indices valid as
    /// later ones are removed.
    fn remove_stale_children(
        &mut self,
        parent_key: NodeKey,
        old_children: &'a [SnapshotNode],
        new_index: &HashMap<NodeId, usize>,
    ) {
        for child in old_children.iter().rev() {
            let Some(id) = child.id else {
                debug!("id-less old child is unaddressable, leaving to wholesale replacement");
                continue;
            };
            if new_index.contains_key(&id) {
                continue;
            }
            let Some(key) = self.editor.lookup(id) else {
                debug!("removed child {} has no live node, nothing to detach", id);
                continue;
            };
            let Some(idx) = self.editor.child_index(parent_key, key) else {
                // Already detached — a sibling subtree's cross-parent move
                // ran first.
                continue;
            };
            if let Err(err) = self.editor.splice_children(parent_key, idx, 1, &[]) {
                warn!("failed to detach {} from {}: {}", id, parent_key, err);
            }
        }
    }

    /// Place a matched child at its target position: cross-parent move,
    /// same-parent reorder, or nothing if it already sits there.
    ///
    /// Reparenting is always applied first; the insertion position is the
    /// new-list target index in the new parent, and same-parent reorder
    /// logic never applies to a node mid-reparent.
    fn place_child(
        &mut self,
        parent_key: NodeKey,
        parent_id: Option<NodeId>,
        id: NodeId,
        key: NodeKey,
        target: usize,
    ) -> Result<(), ReconcileError> {
        let old_parent = self.old_parents.parent_of(id);
        let new_parent = self.new_parents.parent_of(id);
        let moved = match (old_parent, new_parent) {
            // The root is the `None` parent, so moves to and from the root
            // level take this branch like any other reparent.
            (Some(prev), Some(next)) => prev != next,
            _ => false,
        };

        if moved {
            if let Some(prev) = old_parent {
                self.detach_from_previous_parent(id, key, prev);
            }
            self.editor.splice_children(parent_key, target, 0, &[key])?;
            return Ok(());
        }

        match self.editor.child_index(parent_key, key) {
            Some(current) if current == target => {}
            Some(current) => {
                // Move-in-place: splice out, re-insert at the target index.
                self.editor.splice_children(parent_key, current, 1, &[])?;
                self.editor.splice_children(parent_key, target, 0, &[key])?;
            }
            None => {
                // The maps say this is not a move, yet the live node is not
                // attached here — stale state from an earlier contained
                // failure. Converge to the new snapshot.
                warn!("live node {} missing from its parent, re-attaching", id);
                self.editor.splice_children(parent_key, target, 0, &[key])?;
            }
        }
        Ok(())
    }

    /// Detach a node from the live parent its old snapshot position names.
    ///
    /// A stale old-parent lookup skips the detach with a logged error; the
    /// caller still inserts into the new parent — converging to the new
    /// state beats preserving a now-meaningless prior location.
    fn detach_from_previous_parent(&mut self, id: NodeId, key: NodeKey, prev: Option<NodeId>) {
        let prev_key = match prev {
            None => Some(self.editor.root()),
            Some(pid) => self.editor.lookup(pid),
        };
        let Some(prev_key) = prev_key else {
            warn!("stale parent map entry for {}: previous parent missing, inserting without detach", id);
            return;
        };
        let Some(idx) = self.editor.child_index(prev_key, key) else {
            // Already detached by the removal pass of the previous parent.
            return;
        };
        if let Err(err) = self.editor.splice_children(prev_key, idx, 1, &[]) {
            warn!("failed to detach {} from previous parent: {}", id, err);
        }
    }

    /// Apply a new value to the live node for `id`, tag its origin, and
    /// schedule a re-render.
    fn apply_value(&mut self, id: NodeId, value: &NodeValue) -> Result<(), ReconcileError> {
        let key = self
            .editor
            .lookup(id)
            .ok_or(ReconcileError::NodeNotFound(id))?;
        self.editor
            .update_node(key, value)
            .map_err(|err| ReconcileError::UpdateRejected {
                id,
                reason: err.to_string(),
            })?;
        let origin = if self.editor.author(key) == Some(self.local_peer) {
            EditOrigin::Local
        } else {
            EditOrigin::Remote
        };
        self.editor.set_origin(key, origin);
        self.editor.mark_dirty(key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

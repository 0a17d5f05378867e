//! Incremental snapshot-to-live-tree reconciler for Washi documents.
//!
//! Every time the CRDT merge layer folds local and remote edits together it
//! produces a new full snapshot of the document tree. The live editor tree
//! cannot be replaced wholesale — that would destroy cursor position,
//! selection anchors, and cached layout — so this crate computes the minimal
//! set of structural and value mutations that turn the *old* snapshot into
//! the *new* one and applies them in place, tagging each changed node with
//! its local/remote origin.
//!
//! # Architecture
//!
//! ```text
//! CRDT layer ──(old snapshot, new snapshot)──▶ reconcile()
//!     ├── ParentMap::build ×2        id → parent id, per snapshot
//!     └── diff per sibling level     (recursive descent)
//!         ├── removal pass           back-to-front splice-outs
//!         ├── placement              insert / reorder / cross-parent move
//!         ├── NodeValue compare      volatile fields stripped
//!         └── apply_value            update + origin tag + dirty mark
//!                        │
//!                        ▼
//!              EditorTree (host editor)
//! ```
//!
//! # Guarantees
//!
//! - One pass is synchronous and run-to-completion; the rendering layer
//!   never observes a half-updated tree.
//! - Matched ids keep their live node object across reorders and
//!   cross-parent moves — external references and cursor anchors survive.
//! - Failures (stale identity entries, non-element parents, rejected
//!   updates) are contained to the affected node or subtree and logged;
//!   sibling subtrees still converge.
//!
//! [`MemoryTree`] is a reference host implementation backing the tests; real
//! editors implement [`EditorTree`] over their own node objects.

mod error;
mod memory;
mod parent_map;
mod pass;
mod tree;
mod value;

pub use error::ReconcileError;
pub use memory::{LiveNode, MemoryTree, Mutation};
pub use parent_map::ParentMap;
pub use pass::reconcile;
pub use tree::{EditOrigin, EditorTree};
pub use value::NodeValue;

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use washi_types::{NodeId, NodeKind, PeerId, SnapshotNode};

    /// Depth-first list of (id, comparable value) pairs for a whole tree.
    fn comparable_tree(node: &SnapshotNode) -> Vec<(Option<NodeId>, NodeValue)> {
        fn walk(node: &SnapshotNode, out: &mut Vec<(Option<NodeId>, NodeValue)>) {
            out.push((node.id, NodeValue::of(node).comparable()));
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(node, &mut out);
        out
    }

    /// Convergence check: re-serialize the live tree and compare to `new`
    /// through the comparable projection, recursively.
    fn assert_converged(tree: &MemoryTree, new: &SnapshotNode) {
        assert_eq!(comparable_tree(&tree.snapshot()), comparable_tree(new));
    }

    // ── Idempotence ─────────────────────────────────────────────────────

    #[test]
    fn test_idempotence_produces_zero_mutations() {
        let peer = PeerId::new();
        let snap = SnapshotNode::root(vec![
            SnapshotNode::element(NodeId::new(), NodeKind::Heading).with_field("level", 1),
            SnapshotNode::element(NodeId::new(), NodeKind::Paragraph).with_children(vec![
                SnapshotNode::text(NodeId::new(), "hello").with_author(peer),
                SnapshotNode::image(NodeId::new(), "https://cdn/x.png?sig=1"),
            ]),
            SnapshotNode::element(NodeId::new(), NodeKind::List).with_children(vec![
                SnapshotNode::element(NodeId::new(), NodeKind::ListItem)
                    .with_children(vec![SnapshotNode::text(NodeId::new(), "item")]),
            ]),
        ]);

        let mut tree = MemoryTree::from_snapshot(&snap);
        reconcile(&mut tree, &snap, &snap.clone(), peer).unwrap();

        assert!(tree.take_journal().is_empty());
        assert!(tree.dirty_keys().is_empty());
    }

    // ── Convergence ─────────────────────────────────────────────────────

    #[test]
    fn test_convergence_over_mixed_operations() {
        // One pass combining insert, delete, reorder, reparent, and a field
        // update, across two levels of nesting.
        let quote_a = NodeId::new();
        let quote_b = NodeId::new();
        let kept = NodeId::new();
        let dropped = NodeId::new();
        let moved = NodeId::new();
        let fresh = NodeId::new();

        let old = SnapshotNode::root(vec![
            SnapshotNode::element(quote_a, NodeKind::Quote).with_children(vec![
                SnapshotNode::text(kept, "kept"),
                SnapshotNode::element(moved, NodeKind::Paragraph)
                    .with_children(vec![SnapshotNode::text(NodeId::new(), "inner")]),
            ]),
            SnapshotNode::element(quote_b, NodeKind::Quote)
                .with_children(vec![SnapshotNode::text(dropped, "dropped")]),
        ]);
        let new = SnapshotNode::root(vec![
            SnapshotNode::element(quote_b, NodeKind::Quote).with_children(vec![
                SnapshotNode::element(moved, NodeKind::Paragraph)
                    .with_children(vec![SnapshotNode::text(fresh, "replacement")]),
            ]),
            SnapshotNode::element(quote_a, NodeKind::Quote)
                .with_children(vec![SnapshotNode::text(kept, "kept, edited")]),
        ]);

        let mut tree = MemoryTree::from_snapshot(&old);
        reconcile(&mut tree, &old, &new, PeerId::new()).unwrap();

        assert_converged(&tree, &new);
    }

    #[test]
    fn test_convergence_across_sequential_passes() {
        let peer = PeerId::new();
        let para = NodeId::new();
        let a = NodeId::new();
        let b = NodeId::new();

        let s0 = SnapshotNode::root(vec![
            SnapshotNode::element(para, NodeKind::Paragraph)
                .with_children(vec![SnapshotNode::text(a, "v1")]),
        ]);
        let s1 = SnapshotNode::root(vec![
            SnapshotNode::element(para, NodeKind::Paragraph)
                .with_children(vec![SnapshotNode::text(a, "v2"), SnapshotNode::text(b, "new")]),
        ]);
        let s2 = SnapshotNode::root(vec![
            SnapshotNode::element(para, NodeKind::Paragraph)
                .with_children(vec![SnapshotNode::text(b, "new")]),
            SnapshotNode::element(NodeId::new(), NodeKind::Paragraph),
        ]);

        let mut tree = MemoryTree::from_snapshot(&s0);
        reconcile(&mut tree, &s0, &s1, peer).unwrap();
        assert_converged(&tree, &s1);
        reconcile(&mut tree, &s1, &s2, peer).unwrap();
        assert_converged(&tree, &s2);
    }

    // ── Identity preservation ───────────────────────────────────────────

    #[test]
    fn test_identity_preserved_across_reparent() {
        let a = NodeId::new();
        let b = NodeId::new();
        let x = NodeId::new();
        let old = SnapshotNode::root(vec![
            SnapshotNode::element(a, NodeKind::Quote)
                .with_children(vec![SnapshotNode::element(x, NodeKind::Paragraph)]),
            SnapshotNode::element(b, NodeKind::Quote),
        ]);
        let new = SnapshotNode::root(vec![
            SnapshotNode::element(a, NodeKind::Quote),
            SnapshotNode::element(b, NodeKind::Quote)
                .with_children(vec![SnapshotNode::element(x, NodeKind::Paragraph)]),
        ]);

        let mut tree = MemoryTree::from_snapshot(&old);
        let key = tree.lookup(x).unwrap();
        let slab_before = tree.slab_len();
        reconcile(&mut tree, &old, &new, PeerId::new()).unwrap();

        // Same live node object — not destroyed and recreated.
        assert_eq!(tree.lookup(x), Some(key));
        assert_eq!(tree.slab_len(), slab_before);
        assert_converged(&tree, &new);
    }

    // ── Minimality ──────────────────────────────────────────────────────

    #[test]
    fn test_single_field_change_is_one_update_no_splices() {
        let heading = NodeId::new();
        let para = NodeId::new();
        let make = |level: i32| {
            SnapshotNode::root(vec![
                SnapshotNode::element(heading, NodeKind::Heading).with_field("level", level),
                SnapshotNode::element(para, NodeKind::Paragraph)
                    .with_children(vec![SnapshotNode::text(NodeId::new(), "body")]),
            ])
        };
        // Same text-node id on both sides.
        let old = make(1);
        let mut new = make(2);
        new.children[1] = old.children[1].clone();

        let mut tree = MemoryTree::from_snapshot(&old);
        reconcile(&mut tree, &old, &new, PeerId::new()).unwrap();

        let journal = tree.take_journal();
        let updates: Vec<_> = journal
            .iter()
            .filter(|m| matches!(m, Mutation::Update { .. }))
            .collect();
        let splices: Vec<_> = journal
            .iter()
            .filter(|m| matches!(m, Mutation::Splice { .. }))
            .collect();
        assert_eq!(updates.len(), 1);
        assert!(splices.is_empty());
        assert_eq!(tree.dirty_keys(), vec![tree.lookup(heading).unwrap()]);
    }

    // ── Insertion ordering ──────────────────────────────────────────────

    #[test]
    fn test_insertion_lands_between_siblings() {
        let a = NodeId::new();
        let b = NodeId::new();
        let x = NodeId::new();
        let old = SnapshotNode::root(vec![
            SnapshotNode::element(a, NodeKind::Paragraph),
            SnapshotNode::element(b, NodeKind::Paragraph),
        ]);
        let new = SnapshotNode::root(vec![
            SnapshotNode::element(a, NodeKind::Paragraph),
            SnapshotNode::element(x, NodeKind::Paragraph),
            SnapshotNode::element(b, NodeKind::Paragraph),
        ]);

        let mut tree = MemoryTree::from_snapshot(&old);
        reconcile(&mut tree, &old, &new, PeerId::new()).unwrap();

        let order: Vec<NodeId> = tree
            .node(tree.root())
            .unwrap()
            .children
            .iter()
            .map(|k| tree.node(*k).unwrap().id.unwrap())
            .collect();
        assert_eq!(order, vec![a, x, b]);
    }

    // ── Volatile-field insensitivity ────────────────────────────────────

    #[test]
    fn test_signed_url_churn_triggers_nothing() {
        let image = NodeId::new();
        let old = SnapshotNode::root(vec![SnapshotNode::image(image, "https://cdn/a.png?sig=aaa")]);
        let new = SnapshotNode::root(vec![SnapshotNode::image(image, "https://cdn/a.png?sig=bbb")]);

        let mut tree = MemoryTree::from_snapshot(&old);
        reconcile(&mut tree, &old, &new, PeerId::new()).unwrap();

        assert!(tree.take_journal().is_empty());
        // The live node keeps the URL it had — no update was applied.
        assert_eq!(
            tree.get(image).unwrap().fields.get("src"),
            Some(&serde_json::json!("https://cdn/a.png?sig=aaa"))
        );
    }

    #[test]
    fn test_volatile_plus_semantic_change_applies_full_value() {
        let image = NodeId::new();
        let old = SnapshotNode::root(vec![
            SnapshotNode::image(image, "https://cdn/a.png?sig=aaa").with_field("alt", "old"),
        ]);
        let new = SnapshotNode::root(vec![
            SnapshotNode::image(image, "https://cdn/a.png?sig=bbb").with_field("alt", "new"),
        ]);

        let mut tree = MemoryTree::from_snapshot(&old);
        reconcile(&mut tree, &old, &new, PeerId::new()).unwrap();

        // The applier receives the unstripped value: the fresh URL rides
        // along once a semantic field forces the update.
        let node = tree.get(image).unwrap();
        assert_eq!(node.fields.get("alt"), Some(&serde_json::json!("new")));
        assert_eq!(
            node.fields.get("src"),
            Some(&serde_json::json!("https://cdn/a.png?sig=bbb"))
        );
    }

    // ── Partial-failure containment ─────────────────────────────────────

    #[test]
    fn test_missing_identity_entry_does_not_block_sibling() {
        let z = NodeId::new();
        let w = NodeId::new();
        let old = SnapshotNode::root(vec![
            SnapshotNode::text(z, "z"),
            SnapshotNode::text(w, "w before"),
        ]);
        let new = SnapshotNode::root(vec![
            SnapshotNode::text(z, "z"),
            SnapshotNode::text(w, "w after"),
        ]);

        let mut tree = MemoryTree::from_snapshot(&old);
        // Simulate host eviction: Z's live node was detached and its
        // identity entry dropped, leaving the snapshot ahead of the tree.
        let z_key = tree.lookup(z).unwrap();
        let z_idx = tree.child_index(tree.root(), z_key).unwrap();
        tree.splice_children(tree.root(), z_idx, 1, &[]).unwrap();
        tree.unregister(z);
        tree.take_journal();

        reconcile(&mut tree, &old, &new, PeerId::new()).unwrap();

        // W's update applied despite Z's missing live node.
        assert_eq!(
            tree.get(w).unwrap().fields.get("text"),
            Some(&serde_json::json!("w after"))
        );
        // Z converged too — re-instantiated fresh, since it was unreachable
        // through the identity map.
        assert_converged(&tree, &new);
    }
}

//! Shared identity and document node types for Washi.
//!
//! This crate is the relational foundation: typed IDs and the serialized
//! document tree model. It has **no internal washi dependencies** — a pure
//! leaf crate that other crates build on.
//!
//! # Entity-Relationship Overview
//!
//! ```text
//! Snapshot (SnapshotNode tree) ← produced by the CRDT merge layer
//!     └── node has NodeId (stable identity across snapshots)
//!     └── node has author PeerId (who last edited it)
//!
//! Live tree ← owned by the host editor
//!     └── node addressed by NodeKey (slab handle, editor-local)
//!     └── identity map: NodeId ↔ NodeKey (host-owned)
//!
//! Peer (PeerId) ← a collaborator, or PeerId::system() for CRDT-synthesized nodes
//! ```
//!
//! # Key Types
//!
//! |------------------|--------------------------------------------------|
//! | Type             | Purpose                                          |
//! |------------------|--------------------------------------------------|
//! | [`NodeId`]       | Which document node (stable across snapshots)    |
//! | [`NodeKey`]      | Which live node (host slab handle)               |
//! | [`PeerId`]       | Which collaborator                               |
//! | [`NodeKind`]     | What a node is (paragraph, text, image, …)       |
//! | [`SnapshotNode`] | One node of a serialized document snapshot       |
//! |------------------|--------------------------------------------------|

pub mod ids;
pub mod node;

// Re-export primary types at crate root for convenience.
pub use ids::{NodeId, NodeKey, PeerId};
pub use node::{NodeKind, SnapshotNode};

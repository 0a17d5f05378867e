//! Error types for reconciliation.

use thiserror::Error;

use washi_types::{NodeId, NodeKey};

/// Errors that can occur while reconciling a snapshot pair against the live tree.
///
/// All of these are recovered at the smallest possible scope — a single node
/// update or a single subtree — so one stale mapping never prevents the rest
/// of the document from converging.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// An id present in a snapshot has no corresponding live node when one
    /// was expected to exist.
    #[error("no live node for id {0:?}")]
    NodeNotFound(NodeId),

    /// The node addressed as a diff target does not resolve to a live node.
    #[error("diff parent not found: {0:?}")]
    ParentNotFound(NodeId),

    /// The node addressed as a diff target cannot hold children.
    #[error("diff parent cannot hold children: {0:?}")]
    ParentNotElement(NodeId),

    /// The host editor rejected a value update.
    #[error("host editor rejected update of {id:?}: {reason}")]
    UpdateRejected { id: NodeId, reason: String },

    /// A child-list splice addressed a position past the end of the list.
    #[error("splice index {index} out of bounds for node {key:?} with {len} children")]
    SpliceOutOfBounds {
        key: NodeKey,
        index: usize,
        len: usize,
    },

    /// A live-tree handle did not resolve to a node in the host's slab.
    #[error("unknown live node key {0:?}")]
    UnknownKey(NodeKey),
}

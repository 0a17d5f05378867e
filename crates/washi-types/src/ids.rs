//! Typed identifiers for document nodes, peers, and live-tree handles.
//!
//! `NodeId` and `PeerId` wrap UUIDv7 (time-ordered, globally unique). They're
//! opaque on the wire (16 bytes) and display as standard UUID text for
//! logging. The `short()` form (first 8 hex chars) is for human-facing UI —
//! never used as a lookup key.
//!
//! `NodeKey` is different in kind: it addresses a node in the *live* editor
//! tree and is assigned by the host editor's slab, so it's a plain `u64`
//! handle with no global meaning. The id ↔ key association lives in the
//! host-owned identity map.
//!
//! `PeerId` also has a deterministic sentinel via `PeerId::system()`, derived
//! from UUIDv5 for nodes synthesized by the CRDT layer itself (document
//! skeleton, migration output) rather than authored by a person.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A document node identifier (UUIDv7), stable across snapshots and the live tree.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(uuid::Uuid);

/// A collaborating peer identifier (UUIDv7, or UUIDv5 for sentinels).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// First 8 hex characters — for human display only, not lookup.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Full 32-character hex string (no hyphens).
            pub fn to_hex(&self) -> String {
                self.0.as_simple().to_string()
            }

            /// The raw 16 bytes.
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            /// Reconstruct from 16 bytes.
            pub fn from_bytes(b: [u8; 16]) -> Self {
                Self(uuid::Uuid::from_bytes(b))
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// A nil / zero ID — for sentinel values only.
            pub fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }

            /// Check if this is the nil ID.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Full UUID with hyphens for log readability
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(NodeId, "NodeId");
impl_typed_id!(PeerId, "PeerId");

// ── PeerId sentinels ────────────────────────────────────────────────────────

/// Fixed namespace for deriving deterministic PeerIds via UUIDv5.
const WASHI_PEER_NS: uuid::Uuid = uuid::uuid!("3f1c9a72-6d45-4b08-9e31-b07d52c8fa19");

impl PeerId {
    /// The well-known "system" peer.
    ///
    /// Used for nodes the CRDT layer synthesizes itself (document skeleton,
    /// schema migration output). Deterministic: same value every time
    /// (UUIDv5 derived from `b"system"`).
    pub fn system() -> Self {
        Self(uuid::Uuid::new_v5(&WASHI_PEER_NS, b"system"))
    }
}

// ── NodeKey ─────────────────────────────────────────────────────────────────

/// Opaque handle addressing a node in the live editor tree.
///
/// Assigned by the host editor's slab, meaningful only within one editor
/// instance, and never serialized into snapshots. The reconciler obtains
/// keys exclusively through the host's identity map.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(u64);

impl NodeKey {
    /// Wrap a raw slab index. Host-editor use only.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw slab index.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({})", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Serialized document tree model.
//!
//! A [`SnapshotNode`] is one node of a full document snapshot as produced by
//! the CRDT merge layer: an optional stable identity, a kind tag, a flat
//! field map, and an ordered child list. Snapshots are immutable once
//! produced — the reconciler reads two of them (old, new) per pass and never
//! writes one back.
//!
//! ## Design: NodeKind + volatile fields
//!
//! `NodeKind` says what a node *is*; presentation-only mechanism lives in the
//! field map. Some kinds embed a field that is regenerated locally on every
//! serialization (an image `src` carrying a reissued signed query string) and
//! is therefore meaningless for change detection. Those are named by
//! [`NodeKind::volatile_fields`] so the reconciler's comparable projection
//! can strip them.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{NodeId, PeerId};

/// What a document node *is* (content type).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum NodeKind {
    /// The document root — a singleton owned by the host editor.
    Root,
    /// Block of flowing text children.
    #[default]
    Paragraph,
    /// Section heading. Level lives in the `level` field.
    Heading,
    /// Block quotation.
    Quote,
    /// Ordered or unordered list. Style lives in the `style` field.
    List,
    /// One list entry.
    #[serde(rename = "list_item")]
    #[strum(serialize = "list_item", serialize = "listitem")]
    ListItem,
    /// Fenced code block. Language lives in the `language` field.
    Code,
    /// Leaf run of styled text. Content lives in the `text` field.
    Text,
    /// Inline link wrapping text children. Target lives in the `url` field.
    Link,
    /// Embedded image. The `src` field is a display URL reissued locally
    /// with a fresh signed query string on every serialization.
    Image,
}

impl NodeKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::Quote => "quote",
            NodeKind::List => "list",
            NodeKind::ListItem => "list_item",
            NodeKind::Code => "code",
            NodeKind::Text => "text",
            NodeKind::Link => "link",
            NodeKind::Image => "image",
        }
    }

    /// Check if this kind can hold children in the live tree.
    pub fn is_element(&self) -> bool {
        !matches!(self, NodeKind::Text | NodeKind::Image)
    }

    /// Fields of this kind that are regenerated locally on serialization and
    /// must be ignored when deciding whether a node changed.
    pub fn volatile_fields(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Image => &["src"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One node of a serialized document snapshot.
///
/// Nodes without an `id` are unaddressable: they never appear in parent maps
/// or the identity map, and the reconciler always replaces them wholesale
/// rather than diffing them.
///
/// The field map is a `BTreeMap` so serialized forms are deterministic —
/// two snapshots of identical state serialize byte-identically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Stable identity, shared between snapshots and the live tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// Content type.
    pub kind: NodeKind,
    /// Peer whose edit last produced this node's state. Consumed only by
    /// origin tagging — never by the diff itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<PeerId>,
    /// Flat scalar/structured fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Ordered child sequence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    /// Create an element node of the given kind with no fields or children.
    pub fn element(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id: Some(id),
            kind,
            author: None,
            fields: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Create the document root with the given children.
    pub fn root(children: Vec<SnapshotNode>) -> Self {
        Self {
            id: None,
            kind: NodeKind::Root,
            author: None,
            fields: BTreeMap::new(),
            children,
        }
    }

    /// Create a leaf text node.
    pub fn text(id: NodeId, content: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            kind: NodeKind::Text,
            author: None,
            fields: BTreeMap::from([("text".to_string(), content.into().into())]),
            children: Vec::new(),
        }
    }

    /// Create an image node with a display URL.
    pub fn image(id: NodeId, src: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            kind: NodeKind::Image,
            author: None,
            fields: BTreeMap::from([("src".to_string(), src.into().into())]),
            children: Vec::new(),
        }
    }

    /// Set a field, replacing any previous value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set the authoring peer.
    pub fn with_author(mut self, peer: PeerId) -> Self {
        self.author = Some(peer);
        self
    }

    /// Replace the child list.
    pub fn with_children(mut self, children: Vec<SnapshotNode>) -> Self {
        self.children = children;
        self
    }

    /// Check if this node can hold children.
    pub fn is_element(&self) -> bool {
        self.kind.is_element()
    }

    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Find a node by id anywhere in this subtree (including self).
    pub fn find(&self, id: NodeId) -> Option<&SnapshotNode> {
        if self.id == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Total node count of this subtree (including self).
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SnapshotNode::node_count).sum::<usize>()
    }
}

// ============================================================================
// Tests
// ============================================================================

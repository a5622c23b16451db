#![forbid(unsafe_code)]

//! NodeSet type for XML canonicalization and transforms.
//!
//! A `NodeSet` is the document subset a reference selects: the nodes of a
//! parsed document identified by their `NodeId`.  Only the operations needed
//! by same-document references and the enveloped-signature transform exist.

use roxmltree::{Document, Node, NodeId};
use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// All nodes in the document.
    pub fn all(doc: &Document<'_>) -> Self {
        Self::tree_with_comments(doc.root())
    }

    /// All nodes except comments.  This is what `URI=""` selects.
    pub fn all_without_comments(doc: &Document<'_>) -> Self {
        Self::tree_without_comments(doc.root())
    }

    /// The subtree rooted at `root`, comments excluded.  This is what a
    /// `#id` reference selects.
    pub fn tree_without_comments(root: Node<'_, '_>) -> Self {
        let nodes = root
            .descendants()
            .filter(|n| !n.is_comment())
            .map(|n| n.id())
            .collect();
        Self { nodes }
    }

    /// The subtree rooted at `root`, comments included.
    pub fn tree_with_comments(root: Node<'_, '_>) -> Self {
        Self {
            nodes: root.descendants().map(|n| n.id()).collect(),
        }
    }

    pub fn contains(&self, node: Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn insert_id(&mut self, id: NodeId) {
        self.nodes.insert(id);
    }

    pub fn remove_id(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    /// Remove `root` and all its descendants.
    pub fn remove_subtree(&mut self, root: Node<'_, '_>) {
        for node in root.descendants() {
            self.nodes.remove(&node.id());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

//! The node graph.
//!
//! Nodes live in an arena ([`Graph`]) and refer to each other by [`NodeId`].
//! An alias in the source resolves to the id of the anchored node, so a node
//! reached through two paths is one node, and cycles need no special casing.

use std::ops::{Index, IndexMut};

use rtyaml_parse::CommentBundle;
use rtyaml_scanner::{Comment, Mark, ScalarStyle, TagDirective, Version};

/// Index of a node in its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// The three node kinds, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Scalar,
    Sequence,
    Mapping,
}

/// A reference from a parent (or the document) to a node.
///
/// Comments written around a scalar or an alias belong to the place that
/// refers to the node rather than to the node itself, since an aliased node
/// has one definition but many uses.
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub node: NodeId,
    pub comment: CommentBundle,
}

impl Child {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            comment: CommentBundle::default(),
        }
    }

    pub fn with_comment(node: NodeId, comment: CommentBundle) -> Self {
        Self { node, comment }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar {
        value: String,
        /// `None` when the style is left to the emitter.
        style: Option<ScalarStyle>,
        /// Folded line positions of a folded block scalar.
        folds: Vec<usize>,
    },
    Sequence {
        items: Vec<Child>,
        flow_style: bool,
    },
    Mapping {
        pairs: Vec<(Child, Child)>,
        flow_style: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Fully resolved tag.
    pub tag: String,
    pub kind: NodeKind,
    pub anchor: Option<String>,
    pub start: Mark,
    pub end: Mark,
    /// Comments before a collection and on its opening line.
    pub comment: CommentBundle,
    /// Trailing comments inside a collection, and the comment after a closing
    /// flow bracket.
    pub end_comment: CommentBundle,
}

impl Node {
    pub fn scalar(tag: impl Into<String>, value: impl Into<String>, style: Option<ScalarStyle>) -> Self {
        Self::new(
            tag,
            NodeKind::Scalar {
                value: value.into(),
                style,
                folds: Vec::new(),
            },
        )
    }

    pub fn sequence(tag: impl Into<String>, flow_style: bool) -> Self {
        Self::new(
            tag,
            NodeKind::Sequence {
                items: Vec::new(),
                flow_style,
            },
        )
    }

    pub fn mapping(tag: impl Into<String>, flow_style: bool) -> Self {
        Self::new(
            tag,
            NodeKind::Mapping {
                pairs: Vec::new(),
                flow_style,
            },
        )
    }

    fn new(tag: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            tag: tag.into(),
            kind,
            anchor: None,
            start: Mark::default(),
            end: Mark::default(),
            comment: CommentBundle::default(),
            end_comment: CommentBundle::default(),
        }
    }

    pub fn kind(&self) -> Kind {
        match self.kind {
            NodeKind::Scalar { .. } => Kind::Scalar,
            NodeKind::Sequence { .. } => Kind::Sequence,
            NodeKind::Mapping { .. } => Kind::Mapping,
        }
    }

    /// The scalar text, if this is a scalar node.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn items(&self) -> &[Child] {
        match &self.kind {
            NodeKind::Sequence { items, .. } => items,
            _ => &[],
        }
    }

    pub fn pairs(&self) -> &[(Child, Child)] {
        match &self.kind {
            NodeKind::Mapping { pairs, .. } => pairs,
            _ => &[],
        }
    }

    pub fn flow_style(&self) -> bool {
        match self.kind {
            NodeKind::Sequence { flow_style, .. } | NodeKind::Mapping { flow_style, .. } => flow_style,
            NodeKind::Scalar { .. } => false,
        }
    }
}

/// Arena holding every node of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

impl Index<NodeId> for Graph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Graph {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

/// Framing of one document in a stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    /// `---` was written.
    pub explicit_start: bool,
    /// `...` was written.
    pub explicit_end: bool,
    pub version: Option<Version>,
    pub tags: Vec<TagDirective>,
    /// Comments before `---` and on its line.
    pub start_comments: CommentBundle,
    /// Comments after the root node, up to the next document.
    pub end_comments: Vec<Comment>,
}

/// One composed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub graph: Graph,
    pub root: Child,
    pub info: DocumentInfo,
}

impl Document {
    pub fn root_node(&self) -> &Node {
        &self.graph[self.root.node]
    }
}

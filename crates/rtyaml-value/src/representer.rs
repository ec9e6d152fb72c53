//! Turns values back into node graphs for the serializer.

use std::collections::HashMap;
use std::fmt;

use rtyaml_parse::CommentBundle;
use rtyaml_scanner::{ScalarStyle, Version};
use rtyaml_tree::{Child, Document, DocumentInfo, Graph, Kind, Node, NodeId, NodeKind, tag};

use crate::{ItemMeta, Registry, TypeKey, Value};

type Result<T> = std::result::Result<T, RepresenterError>;

/// A value that has no node form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepresenterError {
    pub problem: String,
}

impl RepresenterError {
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
        }
    }
}

impl fmt::Display for RepresenterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.problem)
    }
}

impl std::error::Error for RepresenterError {}

/// Builds one [`Document`] per call to [`Representer::represent`].
///
/// A container reached twice becomes one node, so the serializer writes an
/// anchor and aliases for it. Scalars are shared the same way when they
/// carry the same anchor and compare equal.
pub struct Representer<'r> {
    registry: &'r Registry,
    version: Version,
    graph: Graph,
    containers: HashMap<usize, NodeId>,
    scalars: HashMap<String, (Value, NodeId)>,
    depth: usize,
    as_key: bool,
}

impl<'r> Representer<'r> {
    pub fn new(registry: &'r Registry, version: Version) -> Self {
        Self {
            registry,
            version,
            graph: Graph::new(),
            containers: HashMap::new(),
            scalars: HashMap::new(),
            depth: 0,
            as_key: false,
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn represent(&mut self, value: &Value) -> Result<Document> {
        self.depth = 0;
        self.as_key = false;
        let root = self.represent_data(value);
        let graph = std::mem::take(&mut self.graph);
        self.containers.clear();
        self.scalars.clear();
        Ok(Document {
            graph,
            root: root?,
            info: DocumentInfo::default(),
        })
    }

    /// The node for `value`, reusing the node of a value seen before.
    pub fn represent_data(&mut self, value: &Value) -> Result<Child> {
        let seen = match value {
            Value::Seq(seq) => self.containers.get(&seq.ptr()).copied(),
            Value::Map(map) => self.containers.get(&map.ptr()).copied(),
            Value::Object(_) => None,
            scalar => scalar.anchor().and_then(|anchor| {
                self.scalars
                    .get(&anchor)
                    .filter(|(previous, _)| previous == scalar)
                    .map(|&(_, id)| id)
            }),
        };
        if let Some(id) = seen {
            return Ok(Child::new(id));
        }

        let key = TypeKey::of(value);
        let represent = self
            .registry
            .representer_for(key)
            .ok_or_else(|| RepresenterError::new(format!("no representer for {key:?}")))?;
        represent(self, value)
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.graph.add(node)
    }

    pub fn set_tag(&mut self, id: NodeId, tag: impl Into<String>) {
        self.graph[id].tag = tag.into();
    }

    /// Add a scalar node, remembering it under its anchor.
    pub fn represent_scalar(
        &mut self,
        tag: &str,
        text: String,
        style: Option<ScalarStyle>,
        value: &Value,
    ) -> Child {
        let mut node = Node::scalar(tag, text, style);
        node.anchor = value.anchor();
        let id = self.graph.add(node);
        if let Some(anchor) = value.anchor() {
            self.scalars.insert(anchor, (value.clone(), id));
        }
        Child::new(id)
    }

    /// Represent an entry of a collection. The entry's value comments go onto
    /// a container created for it, or onto the reference otherwise.
    fn represent_entry(&mut self, value: &Value, comment: CommentBundle) -> Result<Child> {
        let before = self.graph.len();
        let mut child = self.represent_data(value)?;
        let fresh = child.node.0 >= before;
        if fresh && self.graph[child.node].kind() != Kind::Scalar {
            let node = &mut self.graph[child.node];
            let own = std::mem::take(&mut node.comment);
            node.comment = comment;
            node.comment.absorb(own);
        } else {
            child.comment = comment;
        }
        Ok(child)
    }

    fn represent_key(&mut self, key: &Value, comment: CommentBundle) -> Result<Child> {
        let as_key = std::mem::replace(&mut self.as_key, true);
        let child = self.represent_data(key);
        self.as_key = as_key;
        let mut child = child?;
        child.comment = comment;
        Ok(child)
    }
}

pub(crate) fn represent_null(r: &mut Representer<'_>, value: &Value) -> Result<Child> {
    let Value::Null(null) = value else {
        return Err(RepresenterError::new("expected a null"));
    };
    let text = match null.literal() {
        Some(literal) => literal,
        None if r.depth > 0 && !r.as_key => "",
        None => "null",
    };
    Ok(r.represent_scalar(tag::NULL, text.to_string(), None, value))
}

/// Booleans, numbers and timestamps: their text, written plain.
pub(crate) fn represent_scalar(r: &mut Representer<'_>, value: &Value) -> Result<Child> {
    let tag = match value {
        Value::Bool(_) => tag::BOOL,
        Value::Int(_) => tag::INT,
        Value::Float(_) => tag::FLOAT,
        Value::Timestamp(_) => tag::TIMESTAMP,
        other => {
            return Err(RepresenterError::new(format!(
                "expected a plain scalar, found {other:?}"
            )));
        }
    };
    let text = value.scalar_text(r.version).unwrap_or_default();
    Ok(r.represent_scalar(tag, text, None, value))
}

/// Strings and unknown-tag scalars, with their style and folds.
pub(crate) fn represent_str(r: &mut Representer<'_>, value: &Value) -> Result<Child> {
    let (tag, text, style, folds) = match value {
        Value::Str(s) => (tag::STR, s.value.clone(), s.style, s.folds.clone()),
        Value::Tagged(t) => (t.tag.as_str(), t.value.clone(), t.style, Vec::new()),
        other => {
            return Err(RepresenterError::new(format!(
                "expected a string, found {other:?}"
            )));
        }
    };
    let child = r.represent_scalar(tag, text, style, value);
    if let NodeKind::Scalar { folds: slot, .. } = &mut r.graph[child.node].kind {
        *slot = folds;
    }
    Ok(child)
}

pub(crate) fn represent_seq(r: &mut Representer<'_>, value: &Value) -> Result<Child> {
    let Value::Seq(seq) = value else {
        return Err(RepresenterError::new("expected a sequence"));
    };
    let (items, meta) = {
        let data = seq.data();
        (data.items.clone(), data.meta.clone())
    };

    let tag = meta.tag.as_deref().unwrap_or(tag::SEQ);
    let mut node = Node::sequence(tag, meta.flow_style.unwrap_or(false));
    node.anchor = meta.anchor.clone();
    node.comment = meta.start_comment.clone();
    node.end_comment = meta.end_comment.clone();
    let id = r.add_node(node);
    r.containers.insert(seq.ptr(), id);

    r.depth += 1;
    let mut children = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let comment = meta
            .item(&index)
            .map(|m| m.value_comment.clone())
            .unwrap_or_default();
        match r.represent_entry(item, comment) {
            Ok(child) => children.push(child),
            Err(err) => {
                r.depth -= 1;
                return Err(err);
            }
        }
    }
    r.depth -= 1;

    if let NodeKind::Sequence { items, .. } = &mut r.graph[id].kind {
        *items = children;
    }
    Ok(Child::new(id))
}

pub(crate) fn represent_map(r: &mut Representer<'_>, value: &Value) -> Result<Child> {
    let Value::Map(map) = value else {
        return Err(RepresenterError::new("expected a mapping"));
    };
    let (entries, merge, meta) = {
        let data = map.data();
        let entries: Vec<(Value, Value)> = data
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        (entries, data.merge.clone(), data.meta.clone())
    };

    let tag = meta.tag.as_deref().unwrap_or(tag::MAP);
    let mut node = Node::mapping(tag, meta.flow_style.unwrap_or(false));
    node.anchor = meta.anchor.clone();
    node.comment = meta.start_comment.clone();
    node.end_comment = meta.end_comment.clone();
    let id = r.add_node(node);
    r.containers.insert(map.ptr(), id);

    r.depth += 1;
    let pairs = represent_pairs(r, &entries, merge, &meta.items);
    r.depth -= 1;
    let pairs = pairs?;

    if let NodeKind::Mapping { pairs: slot, .. } = &mut r.graph[id].kind {
        *slot = pairs;
    }
    Ok(Child::new(id))
}

fn represent_pairs(
    r: &mut Representer<'_>,
    entries: &[(Value, Value)],
    merge: Option<crate::Merge>,
    items: &HashMap<Value, ItemMeta>,
) -> Result<Vec<(Child, Child)>> {
    let mut pairs = Vec::with_capacity(entries.len() + 1);
    let merge_at = merge.as_ref().map(|m| m.position.min(entries.len()));
    for (index, (key, value)) in entries.iter().enumerate() {
        if merge_at == Some(index)
            && let Some(merge) = &merge
        {
            pairs.push(represent_merge(r, merge)?);
        }
        let meta = items.get(key).cloned().unwrap_or_default();
        let key_child = r.represent_key(key, meta.key_comment)?;
        let value_child = r.represent_entry(value, meta.value_comment)?;
        pairs.push((key_child, value_child));
    }
    if merge_at == Some(entries.len())
        && let Some(merge) = &merge
    {
        pairs.push(represent_merge(r, merge)?);
    }
    Ok(pairs)
}

fn represent_merge(r: &mut Representer<'_>, merge: &crate::Merge) -> Result<(Child, Child)> {
    let key = r.add_node(Node::scalar(tag::MERGE, "<<", None));
    let key = Child::with_comment(key, merge.comment.clone());

    let value = if merge.sequence || merge.sources.len() != 1 {
        let id = r.add_node(Node::sequence(tag::SEQ, true));
        let mut children = Vec::with_capacity(merge.sources.len());
        for source in &merge.sources {
            children.push(r.represent_data(&Value::Map(source.clone()))?);
        }
        if let NodeKind::Sequence { items, .. } = &mut r.graph[id].kind {
            *items = children;
        }
        Child::new(id)
    } else {
        r.represent_data(&Value::Map(merge.sources[0].clone()))?
    };
    Ok((key, value))
}

pub(crate) fn represent_unregistered(_: &mut Representer<'_>, value: &Value) -> Result<Child> {
    let tag = match value {
        Value::Object(object) => object.tag.as_str(),
        _ => "?",
    };
    Err(RepresenterError::new(format!(
        "no representer registered for the host type behind {tag}"
    )))
}

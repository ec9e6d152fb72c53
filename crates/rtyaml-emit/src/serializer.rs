//! Walks a node graph and feeds the emitter, turning shared nodes into
//! anchors and aliases.

use std::collections::{HashMap, HashSet};

use rtyaml_parse::{CommentBundle, Event, EventData};
use rtyaml_scanner::{Comment, Version};
use rtyaml_tree::{Child, Document, Graph, Kind, NodeId, NodeKind, Resolver, Step};
use tracing::debug;

use crate::{Emitter, SerializerError};

type Result<T> = std::result::Result<T, SerializerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Fresh,
    Open,
    Closed,
}

/// Node graph to event stream.
///
/// Call [`open`](Self::open) once, [`serialize`](Self::serialize) per
/// document, then [`close`](Self::close).
pub struct Serializer {
    emitter: Emitter,
    resolver: Resolver,
    version: Option<Version>,
    explicit_start: bool,
    explicit_end: bool,
    lifecycle: Lifecycle,
    /// Per node seen in the current document, the anchor it is written with.
    anchors: HashMap<NodeId, Option<String>>,
    serialized: HashSet<NodeId>,
    /// Anchor names already present in the current document.
    taken: HashSet<String>,
    last_anchor_id: usize,
    /// Comments that followed the last `...` line, written before whatever
    /// comes next.
    trailing: Vec<Comment>,
}

impl Serializer {
    pub fn new(emitter: Emitter) -> Self {
        Self {
            emitter,
            resolver: Resolver::default(),
            version: None,
            explicit_start: false,
            explicit_end: false,
            lifecycle: Lifecycle::Fresh,
            anchors: HashMap::new(),
            serialized: HashSet::new(),
            taken: HashSet::new(),
            last_anchor_id: 0,
            trailing: Vec::new(),
        }
    }

    /// Version written as `%YAML` for documents that carry none.
    pub fn version(mut self, version: Option<Version>) -> Self {
        self.version = version;
        self
    }

    /// Start every document with `---`.
    pub fn explicit_start(mut self, explicit: bool) -> Self {
        self.explicit_start = explicit;
        self
    }

    /// End every document with `...`.
    pub fn explicit_end(mut self, explicit: bool) -> Self {
        self.explicit_end = explicit;
        self
    }

    /// The resolver that decides which tags can stay implicit. Register the
    /// same extra resolvers the loader used.
    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn open(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Fresh => {
                self.emitter.emit(Event::synthetic(EventData::StreamStart))?;
                self.lifecycle = Lifecycle::Open;
                Ok(())
            }
            Lifecycle::Open => Err(SerializerError::AlreadyOpened),
            Lifecycle::Closed => Err(SerializerError::Closed),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Fresh => Err(SerializerError::NotOpened),
            Lifecycle::Open => {
                let trailing = CommentBundle::new(std::mem::take(&mut self.trailing), None);
                self.emitter
                    .emit(Event::synthetic(EventData::StreamEnd).with_comment(trailing))?;
                self.lifecycle = Lifecycle::Closed;
                Ok(())
            }
            Lifecycle::Closed => Ok(()),
        }
    }

    /// The text written so far.
    pub fn finish(self) -> String {
        self.emitter.finish()
    }

    pub fn serialize(&mut self, document: &Document) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Fresh => return Err(SerializerError::NotOpened),
            Lifecycle::Closed => return Err(SerializerError::Closed),
            Lifecycle::Open => {}
        }
        let info = &document.info;
        let version = info.version.or(self.version);
        self.resolver.set_version(version.unwrap_or_default());
        debug!(?version, nodes = document.graph.len(), "serializing document");

        let mut start_comments = info.start_comments.clone();
        start_comments
            .pre
            .splice(0..0, std::mem::take(&mut self.trailing));
        self.emitter.emit(
            Event::synthetic(EventData::DocumentStart {
                explicit: info.explicit_start || self.explicit_start,
                version,
                tags: info.tags.clone(),
            })
            .with_comment(start_comments),
        )?;

        self.taken = document
            .graph
            .iter()
            .filter_map(|(_, node)| node.anchor.clone())
            .collect();
        self.anchor_node(&document.graph, document.root.node);
        self.serialize_node(&document.graph, &document.root, None, None)?;

        let explicit_end = info.explicit_end || self.explicit_end;
        let mut end_comments = info.end_comments.clone();
        let eol = match end_comments.iter().position(Comment::is_eol) {
            Some(index) if explicit_end => {
                self.trailing = end_comments.split_off(index + 1);
                end_comments.pop()
            }
            _ => None,
        };
        self.emitter.emit(
            Event::synthetic(EventData::DocumentEnd {
                explicit: explicit_end,
            })
            .with_comment(CommentBundle::new(end_comments, eol)),
        )?;

        self.anchors.clear();
        self.serialized.clear();
        self.taken.clear();
        Ok(())
    }

    /// Record every node reachable from `id`. A node reached twice gets an
    /// anchor, generated if it has none.
    fn anchor_node(&mut self, graph: &Graph, id: NodeId) {
        if let Some(anchor) = self.anchors.get(&id) {
            if anchor.is_none() {
                let name = self.generate_anchor();
                self.anchors.insert(id, Some(name));
            }
            return;
        }
        self.anchors.insert(id, graph[id].anchor.clone());
        match &graph[id].kind {
            NodeKind::Scalar { .. } => {}
            NodeKind::Sequence { items, .. } => {
                for item in items {
                    self.anchor_node(graph, item.node);
                }
            }
            NodeKind::Mapping { pairs, .. } => {
                for (key, value) in pairs {
                    self.anchor_node(graph, key.node);
                    self.anchor_node(graph, value.node);
                }
            }
        }
    }

    fn generate_anchor(&mut self) -> String {
        loop {
            self.last_anchor_id += 1;
            let name = format!("id{:03}", self.last_anchor_id);
            if !self.taken.contains(&name) {
                self.taken.insert(name.clone());
                return name;
            }
        }
    }

    fn serialize_node(
        &mut self,
        graph: &Graph,
        child: &Child,
        parent: Option<Kind>,
        step: Option<&Step>,
    ) -> Result<()> {
        let id = child.node;
        let anchor = self.anchors.get(&id).cloned().flatten();
        if !self.serialized.insert(id) {
            let event = Event::synthetic(EventData::Alias {
                anchor: anchor.unwrap_or_default(),
            })
            .with_comment(child.comment.clone());
            self.emitter.emit(event)?;
            return Ok(());
        }

        self.resolver.descend_resolver(parent, step);
        let node = &graph[id];
        let tag = (!node.tag.is_empty()).then(|| node.tag.clone());
        let mut comment = child.comment.clone();
        comment.absorb(node.comment.clone());

        match &node.kind {
            NodeKind::Scalar {
                value,
                style,
                folds,
            } => {
                let detected = self.resolver.resolve(Kind::Scalar, value, (true, false));
                let default = self.resolver.resolve(Kind::Scalar, value, (false, true));
                let event = Event::synthetic(EventData::Scalar {
                    anchor,
                    implicit: (node.tag == detected, node.tag == default),
                    tag,
                    value: value.clone(),
                    style: *style,
                    folds: folds.clone(),
                });
                self.emitter.emit(event.with_comment(comment))?;
            }
            NodeKind::Sequence { items, flow_style } => {
                let implicit = node.tag == self.resolver.resolve(Kind::Sequence, "", (false, false));
                let event = Event::synthetic(EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style: *flow_style,
                });
                self.emitter.emit(event.with_comment(comment))?;
                for (index, item) in items.iter().enumerate() {
                    let step = Step::Item(index);
                    self.serialize_node(graph, item, Some(Kind::Sequence), Some(&step))?;
                }
                self.emitter.emit(
                    Event::synthetic(EventData::SequenceEnd).with_comment(node.end_comment.clone()),
                )?;
            }
            NodeKind::Mapping { pairs, flow_style } => {
                let implicit = node.tag == self.resolver.resolve(Kind::Mapping, "", (false, false));
                let event = Event::synthetic(EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style: *flow_style,
                });
                self.emitter.emit(event.with_comment(comment))?;
                for (key, value) in pairs {
                    self.serialize_node(graph, key, Some(Kind::Mapping), Some(&Step::Key))?;
                    let step = Step::Value(graph[key.node].as_str().map(str::to_string));
                    self.serialize_node(graph, value, Some(Kind::Mapping), Some(&step))?;
                }
                self.emitter.emit(
                    Event::synthetic(EventData::MappingEnd).with_comment(node.end_comment.clone()),
                )?;
            }
        }

        self.resolver.ascend_resolver();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    use rtyaml_tree::{DocumentInfo, Node, compose_all, tag};

    fn dump(source: &str) -> String {
        let documents = compose_all(source).unwrap();
        let mut serializer = Serializer::new(Emitter::new());
        serializer.open().unwrap();
        for document in &documents {
            serializer.serialize(document).unwrap();
        }
        serializer.close().unwrap();
        serializer.finish()
    }

    #[test]
    fn test_round_trip_block_mapping() {
        let source = "a: 1\nb:\n  c: [x, y]\n  d: text\n";
        assert_eq!(dump(source), source);
    }

    #[test]
    fn test_round_trip_anchor_and_alias() {
        let source = "a: &x 1\nb: *x\n";
        assert_eq!(dump(source), source);
    }

    #[test]
    fn test_round_trip_eol_comment() {
        let source = "key: value  # comment\n";
        assert_eq!(dump(source), source);
    }

    #[test]
    fn test_tags() {
        // A core tag that only differs from the resolved one is expressed by
        // quoting instead.
        assert_eq!(
            dump("a: !custom x\nb: !!str 1\n"),
            "a: !custom x\nb: '1'\n"
        );
    }

    #[test]
    fn test_generated_anchor_for_shared_node() {
        let mut graph = Graph::new();
        let shared = graph.add(Node::scalar(tag::STR, "v", None));
        let mut root = Node::sequence(tag::SEQ, false);
        if let NodeKind::Sequence { items, .. } = &mut root.kind {
            items.push(Child::new(shared));
            items.push(Child::new(shared));
        }
        let root = graph.add(root);
        let document = Document {
            graph,
            root: Child::new(root),
            info: DocumentInfo::default(),
        };

        let mut serializer = Serializer::new(Emitter::new());
        serializer.open().unwrap();
        serializer.serialize(&document).unwrap();
        serializer.close().unwrap();
        assert_eq!(serializer.finish(), "- &id001 v\n- *id001\n");
    }

    #[test]
    fn test_comments_around_document_end() {
        let source = "a: 1\n... # done\n# tail\n";
        assert_eq!(dump(source), source);
    }

    #[test]
    fn test_explicit_markers() {
        let documents = compose_all("a: 1\n").unwrap();
        let mut serializer = Serializer::new(Emitter::new())
            .explicit_start(true)
            .explicit_end(true);
        serializer.open().unwrap();
        serializer.serialize(&documents[0]).unwrap();
        serializer.close().unwrap();
        assert_eq!(serializer.finish(), "---\na: 1\n...\n");
    }

    #[test]
    fn test_lifecycle_errors() {
        let documents = compose_all("a\n").unwrap();
        let mut serializer = Serializer::new(Emitter::new());
        assert_eq!(
            serializer.serialize(&documents[0]),
            Err(SerializerError::NotOpened)
        );
        assert_eq!(serializer.close(), Err(SerializerError::NotOpened));
        serializer.open().unwrap();
        assert_eq!(serializer.open(), Err(SerializerError::AlreadyOpened));
        serializer.close().unwrap();
        assert_eq!(serializer.close(), Ok(()));
        assert_eq!(
            serializer.serialize(&documents[0]),
            Err(SerializerError::Closed)
        );
        assert_eq!(serializer.open(), Err(SerializerError::Closed));
    }
}

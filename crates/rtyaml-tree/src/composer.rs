//! Builds node graphs from the event stream, one document at a time.

use std::collections::HashMap;

use rtyaml_parse::{Event, EventData, EventKind, Parser};
use rtyaml_scanner::{Mark, MarkedError, Stage, Version, Warning, WarningKind};
use tracing::{debug, warn};

use crate::resolver::Step;
use crate::{Child, Document, DocumentInfo, Graph, Kind, Node, NodeId, NodeKind, Resolver};

type Result<T> = std::result::Result<T, MarkedError>;

/// Collections nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 256;

/// Pulls events from a [`Parser`] and composes them into [`Document`]s.
///
/// Anchors are scoped to one document. An alias resolves to the id of the
/// anchored node, which is registered before its children are composed, so
/// a collection may contain itself.
pub struct Composer {
    parser: Parser,
    resolver: Resolver,
    /// Version forced by the caller, overriding `%YAML` directives.
    pinned: Option<Version>,
    anchors: HashMap<String, NodeId>,
    graph: Graph,
    warnings: Vec<Warning>,
    depth: usize,
    max_depth: usize,
}

impl Composer {
    pub fn new(parser: Parser) -> Self {
        Self {
            parser,
            resolver: Resolver::default(),
            pinned: None,
            anchors: HashMap::new(),
            graph: Graph::new(),
            warnings: Vec::new(),
            depth: 0,
            max_depth: MAX_DEPTH,
        }
    }

    pub fn from_str(text: &str) -> Result<Self> {
        Ok(Self::new(Parser::from_str(text)?))
    }

    /// Resolve every document with the rules of `version`, whatever its
    /// `%YAML` directive says.
    pub fn with_version(mut self, version: Option<Version>) -> Self {
        self.pinned = version;
        self
    }

    /// Reject collections nested deeper than `depth`.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Non-fatal conditions found so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Whether another document follows.
    pub fn check_node(&mut self) -> Result<bool> {
        if self.parser.check_event(&[EventKind::StreamStart])? {
            self.parser.get_event()?;
        }
        Ok(self
            .parser
            .peek_event()?
            .is_some_and(|event| event.kind() != EventKind::StreamEnd))
    }

    /// Compose the next document, or `None` at the end of the stream.
    pub fn get_node(&mut self) -> Result<Option<Document>> {
        if self.check_node()? {
            Ok(Some(self.compose_document()?))
        } else {
            Ok(None)
        }
    }

    /// Compose the only document of the stream. An empty stream gives `None`.
    pub fn get_single_node(&mut self) -> Result<Option<Document>> {
        let document = if self.check_node()? {
            Some(self.compose_document()?)
        } else {
            None
        };

        if let Some(event) = self.parser.get_event()?
            && event.kind() != EventKind::StreamEnd
        {
            let context_mark = document.as_ref().map(|d| d.root_node().start);
            return Err(
                MarkedError::new(Stage::Composer, "but found another document")
                    .with_context("expected a single document in the stream", context_mark)
                    .at(event.start),
            );
        }
        Ok(document)
    }

    fn next_event(&mut self) -> Result<Event> {
        self.parser.get_event()?.ok_or_else(|| {
            MarkedError::new(Stage::Composer, "found unexpected end of the event stream")
        })
    }

    fn compose_document(&mut self) -> Result<Document> {
        let Event {
            data,
            start,
            end,
            comment: start_comments,
        } = self.next_event()?;
        let (explicit, version, tags) = match data {
            EventData::DocumentStart {
                explicit,
                version,
                tags,
            } => (explicit, version, tags),
            other => return Err(unexpected("a document start", &Event::new(other, start, end))),
        };

        let effective = self.pinned.or(version).unwrap_or(Version::V1_2);
        self.resolver.set_version(effective);
        debug!(version = %effective, explicit, "Composing document");

        let root = self.compose_node(None, None)?;

        let Event {
            data,
            start,
            end,
            comment,
        } = self.next_event()?;
        let explicit_end = match data {
            EventData::DocumentEnd { explicit } => explicit,
            other => return Err(unexpected("a document end", &Event::new(other, start, end))),
        };
        let mut end_comments = comment.pre;
        end_comments.extend(comment.eol);
        if let Some(next) = self.parser.peek_event()?
            && next.kind() == EventKind::StreamEnd
        {
            end_comments.extend(next.comment.pre.iter().cloned());
        }

        self.anchors.clear();
        let graph = std::mem::take(&mut self.graph);
        debug!(nodes = graph.len(), "Composed document");

        Ok(Document {
            graph,
            root,
            info: DocumentInfo {
                explicit_start: explicit,
                explicit_end,
                version,
                tags,
                start_comments,
                end_comments,
            },
        })
    }

    fn compose_node(&mut self, parent: Option<Kind>, step: Option<Step>) -> Result<Child> {
        let Event {
            data,
            start,
            end,
            comment,
        } = self.next_event()?;

        let (anchor, mut node) = match data {
            EventData::Alias { anchor } => {
                let Some(&id) = self.anchors.get(&anchor) else {
                    return Err(MarkedError::new(
                        Stage::Composer,
                        format!("found undefined alias {anchor:?}"),
                    )
                    .at(start));
                };
                return Ok(Child::with_comment(id, comment));
            }
            EventData::Scalar {
                anchor,
                tag,
                implicit,
                value,
                style,
                folds,
            } => {
                self.resolver.descend_resolver(parent, step.as_ref());
                let tag = self.resolve_tag(tag, Kind::Scalar, &value, implicit);
                let mut node = Node::scalar(tag, value, style);
                if let NodeKind::Scalar { folds: slot, .. } = &mut node.kind {
                    *slot = folds;
                }
                node.end = end;
                (anchor, node)
            }
            EventData::SequenceStart {
                anchor,
                tag,
                flow_style,
                ..
            } => {
                self.resolver.descend_resolver(parent, step.as_ref());
                let tag = self.resolve_tag(tag, Kind::Sequence, "", (false, false));
                (anchor, Node::sequence(tag, flow_style))
            }
            EventData::MappingStart {
                anchor,
                tag,
                flow_style,
                ..
            } => {
                self.resolver.descend_resolver(parent, step.as_ref());
                let tag = self.resolve_tag(tag, Kind::Mapping, "", (false, false));
                (anchor, Node::mapping(tag, flow_style))
            }
            other => return Err(unexpected("a node", &Event::new(other, start, end))),
        };

        node.start = start;
        let kind = node.kind();
        let id = self.graph.add(node);
        if let Some(anchor) = anchor {
            self.register_anchor(anchor, id, start);
        }

        if kind != Kind::Scalar {
            if self.depth >= self.max_depth {
                return Err(MarkedError::new(
                    Stage::Composer,
                    format!("exceeded the nesting limit of {}", self.max_depth),
                )
                .with_context("while composing a collection", Some(start))
                .at(start));
            }
            self.depth += 1;
        }
        let child = match kind {
            Kind::Scalar => Child::with_comment(id, comment),
            Kind::Sequence => {
                self.graph[id].comment = comment;
                self.compose_sequence(id)?;
                Child::new(id)
            }
            Kind::Mapping => {
                self.graph[id].comment = comment;
                self.compose_mapping(id)?;
                Child::new(id)
            }
        };
        if kind != Kind::Scalar {
            self.depth -= 1;
        }
        self.resolver.ascend_resolver();
        Ok(child)
    }

    fn resolve_tag(
        &self,
        tag: Option<String>,
        kind: Kind,
        value: &str,
        implicit: (bool, bool),
    ) -> String {
        match tag {
            Some(tag) if tag != "!" => tag,
            _ => self.resolver.resolve(kind, value, implicit),
        }
    }

    fn register_anchor(&mut self, anchor: String, id: NodeId, mark: Mark) {
        if let Some(&previous) = self.anchors.get(&anchor) {
            let message = format!(
                "found duplicate anchor {anchor:?}; first occurrence at {}, second occurrence at {mark}",
                self.graph[previous].start
            );
            warn!("{message}");
            self.warnings
                .push(Warning::new(WarningKind::DuplicateAnchor, message, Some(mark)));
        }
        self.graph[id].anchor = Some(anchor.clone());
        self.anchors.insert(anchor, id);
    }

    fn compose_sequence(&mut self, id: NodeId) -> Result<()> {
        let mut index = 0;
        while !self.parser.check_event(&[EventKind::SequenceEnd])? {
            let item = self.compose_node(Some(Kind::Sequence), Some(Step::Item(index)))?;
            if let NodeKind::Sequence { items, .. } = &mut self.graph[id].kind {
                items.push(item);
            }
            index += 1;
        }
        self.close(id)
    }

    fn compose_mapping(&mut self, id: NodeId) -> Result<()> {
        while !self.parser.check_event(&[EventKind::MappingEnd])? {
            let key = self.compose_node(Some(Kind::Mapping), Some(Step::Key))?;
            let key_text = self.graph[key.node].as_str().map(str::to_string);
            let value = self.compose_node(Some(Kind::Mapping), Some(Step::Value(key_text)))?;
            if let NodeKind::Mapping { pairs, .. } = &mut self.graph[id].kind {
                pairs.push((key, value));
            }
        }
        self.close(id)
    }

    /// Consume a collection's end event.
    fn close(&mut self, id: NodeId) -> Result<()> {
        let end = self.next_event()?;
        let node = &mut self.graph[id];
        node.end = end.end;
        node.end_comment = end.comment;
        Ok(())
    }
}

fn unexpected(expected: &str, event: &Event) -> MarkedError {
    MarkedError::new(
        Stage::Composer,
        format!("expected {expected}, but found {:?}", event.kind()),
    )
    .at(event.start)
}

impl Iterator for Composer {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_node().transpose()
    }
}

#[cfg(test)]
mod tests;

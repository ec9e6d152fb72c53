//! Round-trip construction of host values from composed documents.
//!
//! Collections are built in two phases: the empty container is cached under
//! its node id before its entries are constructed, so an alias back to an
//! enclosing collection yields the same handle and cyclic documents load
//! without recursion.

use std::collections::{HashMap, HashSet};

use rtyaml_scanner::{MarkedError, ScalarStyle, Stage, Version, Warning, WarningKind};
use rtyaml_tree::{Composer, Document, Graph, Node, NodeId, NodeKind, tag};
use tracing::{debug, warn};

use crate::{Bool, Float, Int, Map, Merge, Null, Registry, Seq, Str, Tagged, Timestamp, Value};

type Result<T> = std::result::Result<T, MarkedError>;

/// What to do about a questionable but readable construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum Policy {
    /// Log it, record a [`Warning`] and go on.
    #[default]
    Warn,
    /// Fail with a constructor error.
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstructorOptions {
    /// Keep single and double quotes on loaded strings.
    pub preserve_quotes: bool,
    pub duplicate_keys: Policy,
    /// YAML 1.1 floats like `1e3`.
    pub mantissa_without_dot: Policy,
}

/// Builds [`Value`]s from node graphs, dispatching on tags through a
/// [`Registry`].
pub struct Constructor<'r> {
    registry: &'r Registry,
    options: ConstructorOptions,
    version: Version,
    constructed: HashMap<NodeId, Value>,
    in_progress: HashSet<NodeId>,
    warnings: Vec<Warning>,
}

impl<'r> Constructor<'r> {
    pub fn new(registry: &'r Registry, options: ConstructorOptions) -> Self {
        Self {
            registry,
            options,
            version: Version::V1_2,
            constructed: HashMap::new(),
            in_progress: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    pub fn options(&self) -> &ConstructorOptions {
        &self.options
    }

    /// Version of the document being constructed.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Compose and construct the next document of `composer`.
    pub fn get_data(&mut self, composer: &mut Composer) -> Result<Option<Value>> {
        let Some(document) = composer.get_node()? else {
            return Ok(None);
        };
        let version = composer.resolver_mut().version();
        self.construct_document(&document, version).map(Some)
    }

    /// Construct the only document of `composer`.
    pub fn get_single_data(&mut self, composer: &mut Composer) -> Result<Option<Value>> {
        let Some(document) = composer.get_single_node()? else {
            return Ok(None);
        };
        let version = composer.resolver_mut().version();
        self.construct_document(&document, version).map(Some)
    }

    /// Construct the root of `document`, with scalars read as `version`.
    pub fn construct_document(&mut self, document: &Document, version: Version) -> Result<Value> {
        self.version = version;
        debug!(%version, nodes = document.graph.len(), "Constructing document");
        let result = self.construct_object(&document.graph, document.root.node);
        self.constructed.clear();
        self.in_progress.clear();
        result
    }

    /// Construct the node `id`, or return the value already built for it.
    pub fn construct_object(&mut self, graph: &Graph, id: NodeId) -> Result<Value> {
        if let Some(value) = self.constructed.get(&id) {
            return Ok(value.clone());
        }
        let node = &graph[id];
        if self.in_progress.contains(&id) {
            return Err(MarkedError::new(Stage::Constructor, "found unconstructable recursive node")
                .with_context(format!("while constructing {}", tag::short(&node.tag)), Some(node.start))
                .at(node.start));
        }
        let Some(construct) = self.registry.constructor_for(&node.tag) else {
            return Err(MarkedError::new(
                Stage::Constructor,
                format!("could not determine a constructor for the tag {:?}", node.tag),
            )
            .at(node.start));
        };

        self.in_progress.insert(id);
        let value = construct(self, graph, id);
        self.in_progress.remove(&id);
        let value = value?;
        self.constructed.insert(id, value.clone());
        Ok(value)
    }

    /// Apply `policy` to a questionable construct.
    fn report(&mut self, policy: Policy, kind: WarningKind, error: MarkedError) -> Result<()> {
        match policy {
            Policy::Error => Err(error),
            Policy::Warn => {
                warn!("{}", error.problem);
                self.warnings
                    .push(Warning::new(kind, error.problem, error.problem_mark));
                Ok(())
            }
        }
    }

    fn duplicate_key(&mut self, mapping: &Node, key: &Node, shown: &Value) -> Result<()> {
        let error = MarkedError::new(Stage::Constructor, format!("found duplicate key {shown:?}"))
            .with_context("while constructing a mapping", Some(mapping.start))
            .at(key.start);
        let error = match self.options.duplicate_keys {
            Policy::Error => error.with_note("duplicate keys are not allowed under the Error policy"),
            Policy::Warn => error,
        };
        self.report(self.options.duplicate_keys, WarningKind::DuplicateKey, error)
    }

    /// Sources of a `<<` value: a mapping, an alias to one, or a sequence of
    /// those.
    fn merge_sources(&mut self, graph: &Graph, mapping: &Node, id: NodeId) -> Result<(Vec<Map>, bool)> {
        let node = &graph[id];
        let (ids, sequence): (Vec<NodeId>, bool) = match &node.kind {
            NodeKind::Mapping { .. } => (vec![id], false),
            NodeKind::Sequence { items, .. } => (items.iter().map(|item| item.node).collect(), true),
            NodeKind::Scalar { .. } => {
                return Err(MarkedError::new(
                    Stage::Constructor,
                    "expected a mapping or list of mappings for merging, but found a scalar",
                )
                .with_context("while constructing a mapping", Some(mapping.start))
                .at(node.start));
            }
        };

        let mut sources = Vec::with_capacity(ids.len());
        for source in ids {
            match self.construct_object(graph, source)? {
                Value::Map(map) => sources.push(map),
                _ => {
                    return Err(MarkedError::new(
                        Stage::Constructor,
                        "expected a mapping for merging",
                    )
                    .with_context("while constructing a mapping", Some(mapping.start))
                    .at(graph[source].start));
                }
            }
        }
        Ok((sources, sequence))
    }
}

/// Generated anchor names (`id001`) are not kept; the serializer makes new
/// ones.
fn kept_anchor(node: &Node) -> Option<String> {
    let anchor = node.anchor.as_deref()?;
    let generated = anchor.len() == 5
        && anchor.starts_with("id")
        && anchor[2..].bytes().all(|b| b.is_ascii_digit());
    (!generated).then(|| anchor.to_string())
}

fn scalar_parts(node: &Node) -> Result<(&str, Option<ScalarStyle>, &[usize])> {
    match &node.kind {
        NodeKind::Scalar { value, style, folds } => Ok((value, *style, folds)),
        other => Err(MarkedError::new(
            Stage::Constructor,
            format!(
                "expected a scalar node, but found a {}",
                match other {
                    NodeKind::Sequence { .. } => "sequence",
                    _ => "mapping",
                }
            ),
        )
        .with_context(format!("while constructing {}", tag::short(&node.tag)), Some(node.start))
        .at(node.start)),
    }
}

fn invalid(node: &Node, problem: String) -> MarkedError {
    MarkedError::new(Stage::Constructor, problem)
        .with_context(format!("while constructing {}", tag::short(&node.tag)), Some(node.start))
        .at(node.start)
}

/// Loaded style, with plain left to the emitter.
fn kept_style(style: Option<ScalarStyle>) -> Option<ScalarStyle> {
    style.filter(|style| *style != ScalarStyle::Plain)
}

pub(crate) fn construct_null(_: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    let (text, _, _) = scalar_parts(node)?;
    let mut null = Null::with_literal(text);
    null.anchor = kept_anchor(node);
    Ok(Value::Null(null))
}

pub(crate) fn construct_bool(c: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    let (text, _, _) = scalar_parts(node)?;
    let mut value = Bool::parse(text, c.version)
        .ok_or_else(|| invalid(node, format!("invalid boolean {text:?}")))?;
    value.anchor = kept_anchor(node);
    Ok(Value::Bool(value))
}

pub(crate) fn construct_int(c: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    let (text, _, _) = scalar_parts(node)?;
    let mut value = Int::parse(text, c.version).map_err(|problem| invalid(node, problem))?;
    value.anchor = kept_anchor(node);
    Ok(Value::Int(value))
}

pub(crate) fn construct_float(c: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    let (text, _, _) = scalar_parts(node)?;
    let parsed = Float::parse(text, c.version).map_err(|problem| invalid(node, problem))?;
    if parsed.mantissa_without_dot {
        let error = invalid(
            node,
            format!("float {text:?} has no '.' in its mantissa, which YAML 1.1 requires"),
        );
        c.report(
            c.options.mantissa_without_dot,
            WarningKind::MantissaWithoutDot,
            error,
        )?;
    }
    let mut value = parsed.float;
    value.anchor = kept_anchor(node);
    Ok(Value::Float(value))
}

pub(crate) fn construct_str(c: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    let (text, style, folds) = scalar_parts(node)?;
    let style = match kept_style(style) {
        Some(style) if style.is_quoted() && !c.options.preserve_quotes => None,
        style => style,
    };
    Ok(Value::Str(Str {
        value: text.to_string(),
        style,
        folds: folds.to_vec(),
        anchor: kept_anchor(node),
    }))
}

pub(crate) fn construct_timestamp(
    _: &mut Constructor<'_>,
    graph: &Graph,
    id: NodeId,
) -> Result<Value> {
    let node = &graph[id];
    let (text, _, _) = scalar_parts(node)?;
    let mut value = Timestamp::parse(text).map_err(|problem| invalid(node, problem))?;
    value.anchor = kept_anchor(node);
    Ok(Value::Timestamp(value))
}

/// A scalar kept as text under its tag: `!!binary`, `!!value`, unknown tags.
pub(crate) fn construct_tagged_scalar(
    _: &mut Constructor<'_>,
    graph: &Graph,
    id: NodeId,
) -> Result<Value> {
    let node = &graph[id];
    let (text, style, _) = scalar_parts(node)?;
    Ok(Value::Tagged(Tagged {
        tag: node.tag.clone(),
        value: text.to_string(),
        style: kept_style(style),
        anchor: kept_anchor(node),
    }))
}

/// Any node whose tag has no constructor. The tag is kept.
pub(crate) fn construct_undefined(
    c: &mut Constructor<'_>,
    graph: &Graph,
    id: NodeId,
) -> Result<Value> {
    match graph[id].kind {
        NodeKind::Scalar { .. } => construct_tagged_scalar(c, graph, id),
        NodeKind::Sequence { .. } => construct_seq(c, graph, id),
        NodeKind::Mapping { .. } => construct_map(c, graph, id),
    }
}

pub(crate) fn construct_seq(c: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    let NodeKind::Sequence { items, flow_style } = &node.kind else {
        return Err(invalid(node, "expected a sequence node".to_string()));
    };

    let seq = Seq::new();
    c.constructed.insert(id, Value::Seq(seq.clone()));
    {
        let mut data = seq.data_mut();
        let meta = &mut data.meta;
        meta.mark = Some(node.start);
        meta.flow_style = Some(*flow_style);
        meta.anchor = kept_anchor(node);
        meta.tag = (node.tag != tag::SEQ).then(|| node.tag.clone());
        meta.start_comment = node.comment.clone();
        meta.end_comment = node.end_comment.clone();
    }

    for (index, item) in items.iter().enumerate() {
        let value = c.construct_object(graph, item.node)?;
        let mut data = seq.data_mut();
        data.items.push(value);
        let meta = data.meta.item_mut(index);
        meta.value_comment = item.comment.clone();
        meta.value_mark = Some(graph[item.node].start);
    }
    Ok(Value::Seq(seq))
}

pub(crate) fn construct_map(c: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    let NodeKind::Mapping { pairs, flow_style } = &node.kind else {
        return Err(invalid(node, "expected a mapping node".to_string()));
    };

    let map = Map::new();
    c.constructed.insert(id, Value::Map(map.clone()));
    {
        let mut data = map.data_mut();
        let meta = &mut data.meta;
        meta.mark = Some(node.start);
        meta.flow_style = Some(*flow_style);
        meta.anchor = kept_anchor(node);
        meta.tag = (node.tag != tag::MAP).then(|| node.tag.clone());
        meta.start_comment = node.comment.clone();
        meta.end_comment = node.end_comment.clone();
    }

    let mut merge: Option<Merge> = None;
    for (key_child, value_child) in pairs {
        let key_node = &graph[key_child.node];

        if key_node.tag == tag::MERGE {
            if merge.is_some() {
                c.duplicate_key(node, key_node, &Value::from("<<"))?;
            }
            let (sources, sequence) = c.merge_sources(graph, node, value_child.node)?;
            merge = Some(Merge {
                position: map.data().entries.len(),
                sources,
                sequence,
                comment: key_child.comment.clone(),
            });
            continue;
        }

        if key_node.kind() != rtyaml_tree::Kind::Scalar && c.in_progress.contains(&key_child.node) {
            return Err(MarkedError::new(Stage::Constructor, "found unhashable key")
                .with_context("while constructing a mapping", Some(node.start))
                .at(key_node.start));
        }
        let key = c.construct_object(graph, key_child.node)?;
        let value = c.construct_object(graph, value_child.node)?;

        if map.data().entries.contains_key(&key) {
            c.duplicate_key(node, key_node, &key)?;
        }
        let mut data = map.data_mut();
        data.entries.insert(key.clone(), value);
        let meta = data.meta.item_mut(key);
        meta.key_comment = key_child.comment.clone();
        meta.value_comment = value_child.comment.clone();
        meta.key_mark = Some(key_node.start);
        meta.value_mark = Some(graph[value_child.node].start);
    }
    map.data_mut().merge = merge;
    Ok(Value::Map(map))
}

/// `!!set`: a mapping whose values are all null.
pub(crate) fn construct_set(c: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    for (_, value) in node.pairs() {
        let value_node = &graph[value.node];
        if value_node.tag != tag::NULL {
            return Err(MarkedError::new(
                Stage::Constructor,
                format!("expected a null value in a set, but found {}", tag::short(&value_node.tag)),
            )
            .with_context("while constructing a set", Some(node.start))
            .at(value_node.start));
        }
    }
    construct_map(c, graph, id)
}

/// `!!omap` and `!!pairs`: a sequence of one-entry mappings.
pub(crate) fn construct_pairs(c: &mut Constructor<'_>, graph: &Graph, id: NodeId) -> Result<Value> {
    let node = &graph[id];
    for item in node.items() {
        let item_node = &graph[item.node];
        if item_node.pairs().len() != 1 {
            return Err(MarkedError::new(
                Stage::Constructor,
                "expected a mapping of length 1",
            )
            .with_context(format!("while constructing {}", tag::short(&node.tag)), Some(node.start))
            .at(item_node.start));
        }
    }
    construct_seq(c, graph, id)
}

#[cfg(test)]
mod tests;

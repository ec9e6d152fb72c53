//! Writes an event stream as YAML text.
//!
//! The emitter mirrors the parser: an explicit [`State`] plus a stack of
//! continuation states, fed one event at a time. Collection starts are held
//! back until enough events are queued to tell an empty collection (written
//! in flow style) from a populated one.

use std::collections::{BTreeMap, VecDeque};

use rtyaml_parse::{Event, EventData, EventKind};
use rtyaml_scanner::{ScalarStyle, Version};
use rtyaml_tree::tag;
use tracing::trace;

use crate::analysis::{ScalarAnalysis, analyze_scalar};
use crate::{EmitterError, EmitterOptions};

mod write;

type Result<T> = std::result::Result<T, EmitterError>;

/// Longest key (anchor, tag and text together) written as a simple key.
const MAX_SIMPLE_KEY_LENGTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentRoot,
    DocumentEnd,
    FirstFlowSequenceItem,
    FlowSequenceItem,
    FirstFlowMappingKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    FirstBlockSequenceItem,
    BlockSequenceItem,
    FirstBlockMappingKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
    Nothing,
}

/// Where the node being written sits.
#[derive(Debug, Clone, Copy, Default)]
struct NodeContext {
    root: bool,
    sequence: bool,
    mapping: bool,
    simple_key: bool,
}

/// Indentation stack. Each entry holds the indent in effect before a level
/// was entered and whether that level is a sequence.
#[derive(Debug, Default)]
struct Indents {
    values: Vec<(Option<usize>, bool)>,
}

impl Indents {
    fn push(&mut self, indent: Option<usize>, sequence: bool) {
        self.values.push((indent, sequence));
    }

    fn pop(&mut self) -> Option<usize> {
        self.values.pop().and_then(|(indent, _)| indent)
    }

    /// Whether the level entered before the last one is a sequence.
    fn last_seq(&self) -> bool {
        self.values.len() >= 2 && self.values[self.values.len() - 2].1
    }

    /// The indent the last level was entered from.
    fn last_indent(&self) -> Option<usize> {
        self.values.last().and_then(|&(indent, _)| indent)
    }
}

fn default_tag_prefixes() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("!".to_string(), "!".to_string()),
        (tag::PREFIX.to_string(), "!!".to_string()),
    ])
}

/// Event-driven YAML writer.
pub struct Emitter {
    out: String,
    options: EmitterOptions,
    default_version: Version,
    version: Version,

    events: VecDeque<Event>,
    state: State,
    states: Vec<State>,

    indents: Indents,
    indent: Option<usize>,
    /// `[` or `{` per open flow collection.
    flow_context: Vec<char>,
    context: NodeContext,

    line: usize,
    column: usize,
    /// The last character written was whitespace.
    whitespace: bool,
    /// Only indentation has been written on the current line.
    indention: bool,
    /// The last document needs `...` before a directive can follow.
    open_ended: bool,
    /// Skip the line break of the next indent.
    no_newline: bool,
    /// The current item's leading comments were written by its parent.
    pre_done: bool,

    tag_prefixes: BTreeMap<String, String>,
    prepared_anchor: Option<String>,
    prepared_tag: Option<String>,
    analysis: Option<ScalarAnalysis>,
    style: Option<ScalarStyle>,
    /// Write the current empty null as `null`.
    null_text: bool,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    /// Create an emitter with default options.
    pub fn new() -> Self {
        Self::with_options(EmitterOptions::default())
    }

    pub fn with_options(options: EmitterOptions) -> Self {
        Self {
            out: String::new(),
            options,
            default_version: Version::V1_2,
            version: Version::V1_2,
            events: VecDeque::new(),
            state: State::StreamStart,
            states: Vec::new(),
            indents: Indents::default(),
            indent: None,
            flow_context: Vec::new(),
            context: NodeContext::default(),
            line: 0,
            column: 0,
            whitespace: true,
            indention: true,
            open_ended: false,
            no_newline: false,
            pre_done: false,
            tag_prefixes: default_tag_prefixes(),
            prepared_anchor: None,
            prepared_tag: None,
            analysis: None,
            style: None,
            null_text: false,
        }
    }

    pub fn options(&self) -> &EmitterOptions {
        &self.options
    }

    /// Version used for scalar analysis in documents without a `%YAML`
    /// directive.
    pub fn set_version(&mut self, version: Version) {
        self.default_version = version;
        self.version = version;
    }

    /// Text written so far.
    pub fn output(&self) -> &str {
        &self.out
    }

    /// Number of line breaks written so far.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Consume the emitter and return the text.
    pub fn finish(self) -> String {
        self.out
    }

    /// Queue `event` and write every event that no longer needs lookahead.
    pub fn emit(&mut self, event: Event) -> Result<()> {
        self.events.push_back(event);
        while !self.need_more_events() {
            let Some(event) = self.events.pop_front() else {
                break;
            };
            trace!(state = ?self.state, event = ?event.kind(), "emit");
            self.dispatch(&event)?;
        }
        Ok(())
    }

    fn need_more_events(&self) -> bool {
        let Some(first) = self.events.front() else {
            return true;
        };
        match first.kind() {
            EventKind::DocumentStart => self.need_events(1),
            EventKind::SequenceStart => self.need_events(2),
            EventKind::MappingStart => self.need_events(3),
            _ => false,
        }
    }

    fn need_events(&self, count: usize) -> bool {
        let mut level = 0i64;
        for event in self.events.iter().skip(1) {
            match event.kind() {
                EventKind::DocumentStart | EventKind::SequenceStart | EventKind::MappingStart => {
                    level += 1
                }
                EventKind::DocumentEnd | EventKind::SequenceEnd | EventKind::MappingEnd => {
                    level -= 1
                }
                EventKind::StreamEnd => level = -1,
                _ => {}
            }
            if level < 0 {
                return false;
            }
        }
        self.events.len() < count + 1
    }

    fn dispatch(&mut self, event: &Event) -> Result<()> {
        match self.state {
            State::StreamStart => self.expect_stream_start(event),
            State::FirstDocumentStart => self.expect_document_start(event, true),
            State::DocumentStart => self.expect_document_start(event, false),
            State::DocumentRoot => self.expect_document_root(event),
            State::DocumentEnd => self.expect_document_end(event),
            State::FirstFlowSequenceItem => self.expect_flow_sequence_item(event, true),
            State::FlowSequenceItem => self.expect_flow_sequence_item(event, false),
            State::FirstFlowMappingKey => self.expect_flow_mapping_key(event, true),
            State::FlowMappingKey => self.expect_flow_mapping_key(event, false),
            State::FlowMappingSimpleValue => self.expect_flow_mapping_simple_value(event),
            State::FlowMappingValue => self.expect_flow_mapping_value(event),
            State::FirstBlockSequenceItem | State::BlockSequenceItem => {
                self.expect_block_sequence_item(event)
            }
            State::FirstBlockMappingKey | State::BlockMappingKey => {
                self.expect_block_mapping_key(event)
            }
            State::BlockMappingSimpleValue => self.expect_block_mapping_simple_value(event),
            State::BlockMappingValue => self.expect_block_mapping_value(event),
            State::Nothing => Err(unexpected("nothing", event)),
        }
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().unwrap_or(State::Nothing)
    }

    fn flow_level(&self) -> usize {
        self.flow_context.len()
    }

    fn increase_indent(&mut self, flow: bool, sequence: bool, indentless: bool) {
        self.indents.push(self.indent, sequence);
        match self.indent {
            None => {
                self.indent = Some(if flow { self.options.best_indent() } else { 0 });
            }
            Some(indent) if !indentless => {
                let step = if self.indents.last_seq() {
                    self.options.best_sequence_indent()
                } else {
                    self.options.best_indent()
                };
                self.indent = Some(indent + step);
            }
            Some(_) => {}
        }
    }

    // Stream and documents.

    fn expect_stream_start(&mut self, event: &Event) -> Result<()> {
        match event.data {
            EventData::StreamStart => {
                self.state = State::FirstDocumentStart;
                Ok(())
            }
            _ => Err(unexpected("a stream start", event)),
        }
    }

    fn expect_document_start(&mut self, event: &Event, first: bool) -> Result<()> {
        match &event.data {
            EventData::DocumentStart {
                explicit,
                version,
                tags,
            } => {
                self.write_pre_comments(&event.comment.pre);
                if (version.is_some() || !tags.is_empty()) && self.open_ended {
                    self.write_indicator("...", true, false, false);
                    self.write_indent();
                }
                self.version = version.unwrap_or(self.default_version);
                if let Some(version) = version {
                    let text = prepare_version(*version)?;
                    self.write_directive(&format!("%YAML {text}"));
                }
                self.tag_prefixes = default_tag_prefixes();
                for directive in tags {
                    let handle = prepare_tag_handle(&directive.handle)?;
                    let prefix = self.prepare_tag_prefix(&directive.prefix)?;
                    self.write_directive(&format!("%TAG {handle} {prefix}"));
                    self.tag_prefixes
                        .insert(directive.prefix.clone(), directive.handle.clone());
                }
                let implicit = first
                    && !explicit
                    && !self.options.canonical
                    && version.is_none()
                    && tags.is_empty()
                    && !self.check_empty_document();
                if !implicit {
                    self.write_indent();
                    self.write_indicator("---", true, false, false);
                    if self.options.canonical {
                        self.write_indent();
                    }
                }
                if let Some(eol) = &event.comment.eol {
                    self.write_eol_comment(eol);
                }
                self.state = State::DocumentRoot;
                Ok(())
            }
            EventData::StreamEnd => {
                self.write_pre_comments(&event.comment.pre);
                self.state = State::Nothing;
                Ok(())
            }
            _ => Err(unexpected("a document start", event)),
        }
    }

    fn expect_document_end(&mut self, event: &Event) -> Result<()> {
        let EventData::DocumentEnd { explicit } = event.data else {
            return Err(unexpected("a document end", event));
        };
        self.write_indent();
        self.write_pre_comments(&event.comment.pre);
        if explicit {
            self.write_indicator("...", true, false, false);
            match &event.comment.eol {
                Some(eol) => self.write_eol_comment(eol),
                None => self.write_indent(),
            }
            self.open_ended = false;
        } else {
            self.open_ended = true;
        }
        self.state = State::DocumentStart;
        Ok(())
    }

    fn expect_document_root(&mut self, event: &Event) -> Result<()> {
        self.states.push(State::DocumentEnd);
        self.expect_node(
            event,
            NodeContext {
                root: true,
                ..NodeContext::default()
            },
        )
    }

    // Nodes.

    fn expect_node(&mut self, event: &Event, context: NodeContext) -> Result<()> {
        self.context = context;
        let pre_done = std::mem::take(&mut self.pre_done);
        match &event.data {
            EventData::Alias { .. } => {
                if !pre_done && !event.comment.pre.is_empty() {
                    self.write_value_comments(&event.comment.pre);
                }
                self.expect_alias(event)
            }
            EventData::Scalar { .. } => {
                if !pre_done && !event.comment.pre.is_empty() {
                    self.write_value_comments(&event.comment.pre);
                }
                if self.process_anchor(event, "&")? {
                    self.context.sequence = false;
                }
                self.process_tag(event)?;
                self.expect_scalar(event)
            }
            EventData::SequenceStart { flow_style, .. } => {
                self.process_anchor(event, "&")?;
                self.process_tag(event)?;
                let block = !(self.flow_level() > 0
                    || self.options.canonical
                    || *flow_style
                    || self.check_empty_sequence());
                self.write_start_comments(event, pre_done, block);
                if block {
                    self.expect_block_sequence();
                } else {
                    self.expect_flow_sequence();
                }
                Ok(())
            }
            EventData::MappingStart { flow_style, .. } => {
                self.process_anchor(event, "&")?;
                self.process_tag(event)?;
                let block = !(self.flow_level() > 0
                    || self.options.canonical
                    || *flow_style
                    || self.check_empty_mapping());
                self.write_start_comments(event, pre_done, false);
                if block {
                    self.expect_block_mapping();
                } else {
                    self.expect_flow_mapping();
                }
                Ok(())
            }
            _ => Err(unexpected("a node", event)),
        }
    }

    /// The eol and leading comments of a collection, written after its
    /// anchor and tag. A block sequence keeps the indentation state it had
    /// before the comments so it can still be written indentless.
    fn write_start_comments(&mut self, event: &Event, pre_done: bool, block_sequence: bool) {
        let indention = self.indention;
        if let Some(eol) = &event.comment.eol {
            self.write_eol_comment(eol);
            if block_sequence {
                self.indention = false;
                self.no_newline = true;
            }
        }
        if !pre_done && !event.comment.pre.is_empty() {
            self.write_pre_comments(&event.comment.pre);
            if block_sequence {
                self.indention = indention;
                self.no_newline = !indention;
            }
        }
    }

    /// Comments in front of a scalar or alias that is not an item: written
    /// on their own lines, then the line is indented for the value.
    fn write_value_comments(&mut self, comments: &[rtyaml_scanner::Comment]) {
        self.write_pre_comments(comments);
        self.increase_indent(true, false, false);
        self.write_indent();
        self.indent = self.indents.pop();
    }

    fn expect_alias(&mut self, event: &Event) -> Result<()> {
        match &event.data {
            EventData::Alias { anchor } if !anchor.is_empty() => {}
            _ => return Err(EmitterError::new("anchor is not specified for alias")),
        }
        self.process_anchor(event, "*")?;
        if let Some(eol) = &event.comment.eol
            && !self.context.simple_key
        {
            self.write_eol_comment(eol);
        }
        self.state = self.pop_state();
        Ok(())
    }

    fn expect_scalar(&mut self, event: &Event) -> Result<()> {
        self.increase_indent(true, false, false);
        self.process_scalar(event)?;
        self.indent = self.indents.pop();
        self.state = self.pop_state();
        Ok(())
    }

    // Flow sequences.

    fn expect_flow_sequence(&mut self) {
        // A flow collection pushed onto a fresh line by comments is indented
        // like a nested block.
        let force_indent = self.column == 0 && !self.context.root && !self.context.simple_key;
        if force_indent {
            self.increase_indent(true, true, false);
            self.write_indent();
        }
        self.write_indicator("[", true, true, false);
        if !force_indent {
            self.increase_indent(true, true, false);
        }
        self.flow_context.push('[');
        self.state = State::FirstFlowSequenceItem;
    }

    fn expect_flow_sequence_item(&mut self, event: &Event, first: bool) -> Result<()> {
        if event.kind() == EventKind::SequenceEnd {
            self.indent = self.indents.pop();
            self.flow_context.pop();
            if self.options.canonical && !first {
                self.write_indicator(",", false, false, false);
                self.write_indent();
            }
            self.close_flow(event, "]");
            self.state = self.pop_state();
            return Ok(());
        }

        if !first {
            if self.column == 0 {
                self.write_indent();
            }
            self.write_indicator(",", false, false, false);
        }
        self.write_item_comments(event);
        if self.options.canonical || self.column > self.options.best_width() {
            self.write_indent();
        }
        self.states.push(State::FlowSequenceItem);
        self.expect_node(
            event,
            NodeContext {
                sequence: true,
                ..NodeContext::default()
            },
        )
    }

    // Flow mappings.

    fn expect_flow_mapping(&mut self) {
        let force_indent = self.column == 0 && !self.context.root && !self.context.simple_key;
        if force_indent {
            self.increase_indent(true, false, false);
            self.write_indent();
        }
        self.write_indicator("{", true, true, false);
        if !force_indent {
            self.increase_indent(true, false, false);
        }
        self.flow_context.push('{');
        self.state = State::FirstFlowMappingKey;
    }

    fn expect_flow_mapping_key(&mut self, event: &Event, first: bool) -> Result<()> {
        if event.kind() == EventKind::MappingEnd {
            self.indent = self.indents.pop();
            self.flow_context.pop();
            if self.options.canonical && !first {
                self.write_indicator(",", false, false, false);
                self.write_indent();
            }
            self.close_flow(event, "}");
            self.state = self.pop_state();
            return Ok(());
        }

        if !first {
            if self.column == 0 {
                self.write_indent();
            }
            self.write_indicator(",", false, false, false);
        }
        self.write_item_comments(event);
        if self.options.canonical || self.column > self.options.best_width() {
            self.write_indent();
        }
        let key = NodeContext {
            mapping: true,
            ..NodeContext::default()
        };
        if !self.options.canonical && self.check_simple_key(event)? {
            self.states.push(State::FlowMappingSimpleValue);
            self.expect_node(
                event,
                NodeContext {
                    simple_key: true,
                    ..key
                },
            )
        } else {
            self.write_indicator("?", true, false, false);
            self.states.push(State::FlowMappingValue);
            self.expect_node(event, key)
        }
    }

    fn expect_flow_mapping_simple_value(&mut self, event: &Event) -> Result<()> {
        self.write_indicator(":", false, false, false);
        self.states.push(State::FlowMappingKey);
        self.expect_node(
            event,
            NodeContext {
                mapping: true,
                ..NodeContext::default()
            },
        )
    }

    fn expect_flow_mapping_value(&mut self, event: &Event) -> Result<()> {
        if self.options.canonical || self.column > self.options.best_width() {
            self.write_indent();
        }
        self.write_indicator(":", true, false, false);
        self.states.push(State::FlowMappingKey);
        self.expect_node(
            event,
            NodeContext {
                mapping: true,
                ..NodeContext::default()
            },
        )
    }

    /// Comments in front of a flow item, then back to the item's indent.
    fn write_item_comments(&mut self, event: &Event) {
        if event.comment.pre.is_empty() {
            return;
        }
        self.write_pre_comments(&event.comment.pre);
        self.write_indent();
        self.pre_done = true;
    }

    fn close_flow(&mut self, event: &Event, indicator: &str) {
        if !event.comment.pre.is_empty() {
            self.write_pre_comments(&event.comment.pre);
        }
        if self.column == 0 {
            self.write_indent();
        }
        self.write_indicator(indicator, false, false, false);
        match &event.comment.eol {
            Some(eol) => self.write_eol_comment(eol),
            None => self.no_newline = false,
        }
    }

    // Block sequences.

    fn expect_block_sequence(&mut self) {
        let indentless = self.context.mapping && !self.indention;
        self.increase_indent(false, true, indentless);
        self.state = State::FirstBlockSequenceItem;
    }

    fn expect_block_sequence_item(&mut self, event: &Event) -> Result<()> {
        if event.kind() == EventKind::SequenceEnd {
            self.write_pre_comments(&event.comment.pre);
            self.indent = self.indents.pop();
            self.state = self.pop_state();
            self.no_newline = false;
            return Ok(());
        }

        if !event.comment.pre.is_empty() {
            self.write_pre_comments(&event.comment.pre);
            self.pre_done = true;
        }
        let nonl = self.no_newline && self.column == 0;
        self.write_indent();
        let offset = self.options.sequence_dash_offset;
        let dash = format!("{}-", " ".repeat(offset));
        self.write_indicator(&dash, true, false, true);
        if nonl || offset + 2 > self.options.best_sequence_indent() {
            self.no_newline = true;
        }
        self.states.push(State::BlockSequenceItem);
        self.expect_node(
            event,
            NodeContext {
                sequence: true,
                ..NodeContext::default()
            },
        )
    }

    // Block mappings.

    fn expect_block_mapping(&mut self) {
        self.increase_indent(false, false, false);
        self.state = State::FirstBlockMappingKey;
    }

    fn expect_block_mapping_key(&mut self, event: &Event) -> Result<()> {
        if event.kind() == EventKind::MappingEnd {
            self.write_pre_comments(&event.comment.pre);
            self.indent = self.indents.pop();
            self.state = self.pop_state();
            return Ok(());
        }

        if !event.comment.pre.is_empty() {
            self.write_pre_comments(&event.comment.pre);
            self.pre_done = true;
        }
        self.write_indent();
        let key = NodeContext {
            mapping: true,
            ..NodeContext::default()
        };
        if self.check_simple_key(event)? {
            self.states.push(State::BlockMappingSimpleValue);
            self.expect_node(
                event,
                NodeContext {
                    simple_key: true,
                    ..key
                },
            )?;
            // `*a:` would read as an alias named `a:`.
            if event.kind() == EventKind::Alias {
                self.write_raw(" ");
            }
            Ok(())
        } else {
            self.write_indicator("?", true, false, true);
            self.states.push(State::BlockMappingValue);
            self.expect_node(event, key)
        }
    }

    fn expect_block_mapping_simple_value(&mut self, event: &Event) -> Result<()> {
        self.write_indicator(":", false, false, false);
        self.states.push(State::BlockMappingKey);
        self.expect_node(
            event,
            NodeContext {
                mapping: true,
                ..NodeContext::default()
            },
        )
    }

    fn expect_block_mapping_value(&mut self, event: &Event) -> Result<()> {
        self.write_indent();
        self.write_indicator(":", true, false, true);
        self.states.push(State::BlockMappingKey);
        self.expect_node(
            event,
            NodeContext {
                mapping: true,
                ..NodeContext::default()
            },
        )
    }

    // Checks.

    fn check_empty_sequence(&self) -> bool {
        self.events
            .front()
            .is_some_and(|next| next.kind() == EventKind::SequenceEnd)
    }

    fn check_empty_mapping(&self) -> bool {
        self.events
            .front()
            .is_some_and(|next| next.kind() == EventKind::MappingEnd)
    }

    fn check_empty_document(&self) -> bool {
        match self.events.front().map(|next| &next.data) {
            Some(EventData::Scalar {
                anchor,
                tag,
                implicit,
                value,
                ..
            }) => anchor.is_none() && (tag.is_none() || implicit.0) && value.is_empty(),
            _ => false,
        }
    }

    fn check_simple_key(&mut self, event: &Event) -> Result<bool> {
        let mut length = 0;
        if let Some(anchor) = event.anchor() {
            if self.prepared_anchor.is_none() {
                self.prepared_anchor = Some(prepare_anchor(anchor)?);
            }
            length += self.prepared_anchor.as_deref().map_or(0, str::len);
        }
        let tag = match &event.data {
            EventData::Scalar { tag, .. }
            | EventData::SequenceStart { tag, .. }
            | EventData::MappingStart { tag, .. } => tag.as_deref(),
            _ => None,
        };
        if let Some(tag) = tag {
            if self.prepared_tag.is_none() {
                self.prepared_tag = Some(self.prepare_tag(tag)?);
            }
            length += self.prepared_tag.as_deref().map_or(0, str::len);
        }

        let simple = match &event.data {
            EventData::Alias { .. } => true,
            EventData::Scalar { value, .. } => {
                let analysis = self.analysis_for(value);
                length += value.chars().count();
                !analysis.multiline
            }
            EventData::SequenceStart { flow_style, .. } => {
                *flow_style || self.check_empty_sequence()
            }
            EventData::MappingStart { flow_style, .. } => {
                *flow_style || self.check_empty_mapping()
            }
            _ => false,
        };
        Ok(length < MAX_SIMPLE_KEY_LENGTH && simple)
    }

    // Anchors, tags and scalars.

    fn process_anchor(&mut self, event: &Event, indicator: &str) -> Result<bool> {
        let Some(anchor) = event.anchor() else {
            self.prepared_anchor = None;
            return Ok(false);
        };
        let prepared = match self.prepared_anchor.take() {
            Some(prepared) => prepared,
            None => prepare_anchor(anchor)?,
        };
        self.write_indicator(&format!("{indicator}{prepared}"), true, false, false);
        self.no_newline = false;
        Ok(true)
    }

    fn process_tag(&mut self, event: &Event) -> Result<()> {
        let canonical = self.options.canonical;
        let tag = match &event.data {
            EventData::Scalar {
                tag,
                implicit,
                value,
                ..
            } => {
                let mut style = match self.style {
                    Some(style) => style,
                    None => self.choose_scalar_style(event),
                };
                if value.is_empty()
                    && style == ScalarStyle::SingleQuoted
                    && tag.as_deref() == Some(tag::NULL)
                {
                    self.null_text = true;
                    self.analysis = None;
                    style = self.choose_scalar_style(event);
                }
                self.style = Some(style);

                let plain = style == ScalarStyle::Plain;
                if (!canonical || tag.is_none())
                    && ((plain && implicit.0) || (!plain && implicit.1))
                {
                    self.prepared_tag = None;
                    return Ok(());
                }
                match tag.as_deref() {
                    None if implicit.0 => {
                        self.prepared_tag = None;
                        "!"
                    }
                    None => return Err(EmitterError::new("tag is not specified")),
                    Some(tag) => tag,
                }
            }
            EventData::SequenceStart { tag, implicit, .. }
            | EventData::MappingStart { tag, implicit, .. } => {
                if (!canonical || tag.is_none()) && *implicit {
                    self.prepared_tag = None;
                    return Ok(());
                }
                tag.as_deref()
                    .ok_or_else(|| EmitterError::new("tag is not specified"))?
            }
            _ => return Ok(()),
        };

        let prepared = match self.prepared_tag.take() {
            Some(prepared) => prepared,
            None => self.prepare_tag(tag)?,
        };
        if !prepared.is_empty() {
            self.write_indicator(&prepared, true, false, false);
            if self.context.sequence
                && self.flow_level() == 0
                && event.kind() == EventKind::Scalar
            {
                self.no_newline = true;
            }
        }
        Ok(())
    }

    /// The text written for a scalar event.
    fn scalar_text<'e>(&self, value: &'e str) -> &'e str {
        if self.null_text { "null" } else { value }
    }

    fn analysis_for(&mut self, value: &str) -> ScalarAnalysis {
        if let Some(analysis) = self.analysis {
            return analysis;
        }
        let text = self.scalar_text(value);
        let analysis = analyze_scalar(text, self.version, self.options.allow_unicode);
        self.analysis = Some(analysis);
        analysis
    }

    fn choose_scalar_style(&mut self, event: &Event) -> ScalarStyle {
        let EventData::Scalar {
            tag,
            implicit,
            value,
            style: requested,
            ..
        } = &event.data
        else {
            return ScalarStyle::Plain;
        };
        let analysis = self.analysis_for(value);
        let text = self.scalar_text(value);

        if *requested == Some(ScalarStyle::DoubleQuoted) || self.options.canonical {
            return ScalarStyle::DoubleQuoted;
        }
        let plain_requested = matches!(requested, None | Some(ScalarStyle::Plain));
        let custom_tag = tag.as_deref().is_some_and(|t| !t.starts_with(tag::PREFIX));
        if plain_requested
            && (implicit.0 || custom_tag || self.null_text)
            && !(self.context.simple_key && (analysis.empty || analysis.multiline))
        {
            let allowed = if self.flow_level() > 0 {
                analysis.allow_flow_plain
            } else {
                analysis.allow_block_plain
            };
            if allowed {
                return ScalarStyle::Plain;
            }
        }
        if let Some(block @ (ScalarStyle::Literal | ScalarStyle::Folded)) = *requested
            && self.flow_level() == 0
            && !self.context.simple_key
            && !analysis.special_characters
        {
            return block;
        }
        if plain_requested
            && analysis.allow_double_quoted
            && (text.contains('\'') || text.contains('\n'))
        {
            return ScalarStyle::DoubleQuoted;
        }
        if (plain_requested || *requested == Some(ScalarStyle::SingleQuoted))
            && analysis.allow_single_quoted
            && !(self.context.simple_key && analysis.multiline)
        {
            return ScalarStyle::SingleQuoted;
        }
        ScalarStyle::DoubleQuoted
    }

    fn process_scalar(&mut self, event: &Event) -> Result<()> {
        let EventData::Scalar { value, folds, .. } = &event.data else {
            return Err(unexpected("a scalar", event));
        };
        let style = match self.style.take() {
            Some(style) => style,
            None => self.choose_scalar_style(event),
        };
        let split = !self.context.simple_key;
        let text = self.scalar_text(value);
        // An empty plain item leaves the dash alone on its line.
        let empty = style == ScalarStyle::Plain && text.is_empty();
        if self.context.sequence && self.flow_level() == 0 {
            if empty {
                self.no_newline = false;
            } else {
                self.write_indent();
            }
        }

        let eol = if self.context.simple_key {
            None
        } else {
            event.comment.eol.as_ref()
        };
        match style {
            ScalarStyle::DoubleQuoted => self.write_double_quoted(text, split),
            ScalarStyle::SingleQuoted => self.write_single_quoted(text, split),
            ScalarStyle::Folded => self.write_folded(text, folds, eol),
            ScalarStyle::Literal => self.write_literal(text, eol),
            ScalarStyle::Plain => self.write_plain(text, split),
        }
        self.analysis = None;
        self.null_text = false;

        if !style.is_block()
            && let Some(eol) = eol
        {
            self.write_eol_comment(eol);
        }
        Ok(())
    }

    // Directive, tag and anchor text.

    fn prepare_tag_prefix(&self, prefix: &str) -> Result<String> {
        if prefix.is_empty() {
            return Err(EmitterError::new("tag prefix must not be empty"));
        }
        let (head, rest) = match prefix.strip_prefix('!') {
            Some(rest) => ("!", rest),
            None => ("", prefix),
        };
        Ok(format!("{head}{}", self.escape_uri(rest, false)))
    }

    fn prepare_tag(&self, tag: &str) -> Result<String> {
        if tag.is_empty() {
            return Err(EmitterError::new("tag must not be empty"));
        }
        if tag == "!" {
            return Ok(tag.to_string());
        }
        let mut handle = None;
        let mut suffix = tag;
        for (prefix, candidate) in &self.tag_prefixes {
            if tag.starts_with(prefix.as_str()) && (prefix == "!" || prefix.len() < tag.len()) {
                handle = Some(candidate.as_str());
                suffix = &tag[prefix.len()..];
            }
        }
        let suffix = self.escape_uri(suffix, handle != Some("!"));
        Ok(match handle {
            Some(handle) => format!("{handle}{suffix}"),
            None => format!("!<{suffix}>"),
        })
    }

    /// Percent-encode the characters a tag cannot hold literally.
    fn escape_uri(&self, text: &str, allow_bang: bool) -> String {
        let allow_hash = self.version >= Version::V1_2;
        let mut escaped = String::with_capacity(text.len());
        for ch in text.chars() {
            let keep = ch.is_ascii_alphanumeric()
                || "-;/?:@&=+$,_.~*'()[]".contains(ch)
                || (ch == '#' && allow_hash)
                || (ch == '!' && allow_bang);
            if keep {
                escaped.push(ch);
            } else {
                let mut buf = [0u8; 4];
                for byte in ch.encode_utf8(&mut buf).bytes() {
                    escaped.push_str(&format!("%{byte:02X}"));
                }
            }
        }
        escaped
    }
}

fn unexpected(expected: &str, event: &Event) -> EmitterError {
    EmitterError::new(format!(
        "expected {expected}, but got {:?}",
        event.kind()
    ))
}

fn prepare_version(version: Version) -> Result<String> {
    if version.major != 1 {
        return Err(EmitterError::new(format!(
            "unsupported YAML version: {version}"
        )));
    }
    Ok(version.to_string())
}

fn prepare_tag_handle(handle: &str) -> Result<&str> {
    if handle.is_empty() {
        return Err(EmitterError::new("tag handle must not be empty"));
    }
    if !handle.starts_with('!') || !handle.ends_with('!') {
        return Err(EmitterError::new(format!(
            "tag handle must start and end with '!': {handle:?}"
        )));
    }
    let inner = handle
        .strip_prefix('!')
        .and_then(|h| h.strip_suffix('!'))
        .unwrap_or_default();
    if let Some(ch) = inner
        .chars()
        .find(|&ch| !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'))
    {
        return Err(EmitterError::new(format!(
            "invalid character {ch:?} in the tag handle: {handle:?}"
        )));
    }
    Ok(handle)
}

fn prepare_anchor(anchor: &str) -> Result<String> {
    if anchor.is_empty() {
        return Err(EmitterError::new("anchor must not be empty"));
    }
    if let Some(ch) = anchor.chars().find(|&ch| {
        ch.is_whitespace() || ch.is_control() || ",[]{}".contains(ch) || ch == '\u{FEFF}'
    }) {
        return Err(EmitterError::new(format!(
            "invalid character {ch:?} in the anchor: {anchor:?}"
        )));
    }
    Ok(anchor.to_string())
}

#[cfg(test)]
mod tests;

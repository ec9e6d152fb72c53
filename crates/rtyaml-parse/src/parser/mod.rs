//! Pull-based event parser.
//!
//! An explicit state machine over the YAML grammar:
//!
//! ```text
//! stream   ::= STREAM-START implicit_document? explicit_document* STREAM-END
//! document ::= DIRECTIVE* DOCUMENT-START block_node? DOCUMENT-END*
//! node     ::= ALIAS | properties? (block_content | flow_content)
//! ```
//!
//! Every state consumes at most one significant token and produces one event.
//! Comment tokens are pulled aside as they are met and attached to the next
//! event that claims them.

use std::collections::BTreeMap;

use rtyaml_scanner::{
    Comment, CommentKind, Directive, Mark, MarkedError, ScalarStyle, Scanner, Stage, TagDirective,
    Token, TokenData, TokenKind, Version,
};
use tracing::trace;

use crate::{CommentBundle, Event, EventData, EventKind};


type Result<T> = std::result::Result<T, MarkedError>;

/// Tag handles every document starts with.
pub const DEFAULT_TAGS: [(&str, &str); 2] = [("!", "!"), ("!!", "tag:yaml.org,2002:")];

/// Parser states. Each one names the grammar position the next event is
/// produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
}

/// Turns tokens into events.
pub struct Parser {
    scanner: Scanner,
    current: Option<Event>,
    /// `None` once STREAM-END has been produced.
    state: Option<State>,
    states: Vec<State>,
    /// Start marks of the open collections.
    marks: Vec<Mark>,
    /// Tag handle to prefix, for the current document.
    tag_handles: BTreeMap<String, String>,
    /// Comment tokens read but not yet attached to an event.
    pending: Vec<Comment>,
}

impl Parser {
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            current: None,
            state: Some(State::StreamStart),
            states: Vec::new(),
            marks: Vec::new(),
            tag_handles: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn from_str(text: &str) -> Result<Self> {
        Ok(Self::new(Scanner::from_str(text)?))
    }

    /// Whether the next event is one of `kinds` (any event if empty).
    pub fn check_event(&mut self, kinds: &[EventKind]) -> Result<bool> {
        self.fill()?;
        Ok(match &self.current {
            Some(event) => kinds.is_empty() || kinds.contains(&event.kind()),
            None => false,
        })
    }

    /// The next event, without consuming it.
    pub fn peek_event(&mut self) -> Result<Option<&Event>> {
        self.fill()?;
        Ok(self.current.as_ref())
    }

    /// Consume and return the next event.
    pub fn get_event(&mut self) -> Result<Option<Event>> {
        self.fill()?;
        Ok(self.current.take())
    }

    fn fill(&mut self) -> Result<()> {
        if self.current.is_none()
            && let Some(state) = self.state.take()
        {
            trace!("Parser state {state:?}");
            let event = self.dispatch(state)?;
            trace!("Event {:?} at {}", event.kind(), event.start);
            self.current = Some(event);
        }
        Ok(())
    }

    fn dispatch(&mut self, state: State) -> Result<Event> {
        match state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_implicit_document_start(),
            State::DocumentStart => self.parse_document_start(),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => self.parse_block_sequence_first_entry(),
            State::BlockSequenceEntry => self.parse_block_sequence_entry(),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.parse_block_mapping_first_key(),
            State::BlockMappingKey => self.parse_block_mapping_key(),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => self.parse_flow_sequence_first_entry(),
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.parse_flow_mapping_first_key(),
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(),
            State::FlowMappingEmptyValue => self.parse_flow_mapping_empty_value(),
        }
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop();
    }

    // Token access. Comment tokens are moved to `pending` on the way.

    fn skip_comments(&mut self) -> Result<()> {
        while self.scanner.check_token(&[TokenKind::Comment])? {
            if let Some(Token {
                data: TokenData::Comment(comment),
                ..
            }) = self.scanner.get_token()?
            {
                self.pending.push(comment);
            }
        }
        Ok(())
    }

    fn check(&mut self, kinds: &[TokenKind]) -> Result<bool> {
        self.skip_comments()?;
        self.scanner.check_token(kinds)
    }

    fn peek(&mut self) -> Result<&Token> {
        self.skip_comments()?;
        self.scanner
            .peek_token()?
            .ok_or_else(|| MarkedError::new(Stage::Parser, "unexpected end of the token stream"))
    }

    fn peek_start(&mut self) -> Result<Mark> {
        Ok(self.peek()?.start)
    }

    fn take(&mut self) -> Result<Token> {
        self.skip_comments()?;
        self.scanner.get_token()?.ok_or_else(|| {
            MarkedError::new(Stage::Parser, "unexpected end of the token stream")
        })
    }

    /// Take an end-of-line comment that directly follows the token just
    /// consumed.
    fn take_eol(&mut self) -> Result<Option<Comment>> {
        let is_eol = matches!(
            self.scanner.peek_token()?,
            Some(Token {
                data: TokenData::Comment(comment),
                ..
            }) if comment.kind == CommentKind::Eol
        );
        if !is_eol {
            return Ok(None);
        }
        Ok(match self.scanner.get_token()? {
            Some(Token {
                data: TokenData::Comment(comment),
                ..
            }) => Some(comment),
            _ => None,
        })
    }

    fn take_pending(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.pending)
    }

    /// Pending comments for a collection start: a leading eol comment (left
    /// by `:`, `-` or `---`) becomes the start's eol.
    fn collection_start_comments(&mut self) -> CommentBundle {
        let mut pre = self.take_pending();
        let eol = match pre.first() {
            Some(first) if first.is_eol() => Some(pre.remove(0)),
            _ => None,
        };
        CommentBundle::new(pre, eol)
    }

    /// Split pending comments at a block collection end. Trailing blank lines
    /// and comments left of `column` belong to what follows the collection.
    fn block_end_comments(&mut self, column: usize) -> Vec<Comment> {
        let mut split = self.pending.len();
        while split > 0 {
            let comment = &self.pending[split - 1];
            if comment.is_blank() || (!comment.is_eol() && comment.column < column) {
                split -= 1;
            } else {
                break;
            }
        }
        let carried = self.pending.split_off(split);
        std::mem::replace(&mut self.pending, carried)
    }

    fn error(&mut self, context: &str, context_mark: Option<Mark>, expected: &str) -> MarkedError {
        match self.peek() {
            Ok(token) => {
                let found = token.kind.describe();
                let mark = token.start;
                MarkedError::new(Stage::Parser, format!("expected {expected}, but found {found}"))
                    .with_context(context, context_mark)
                    .at(mark)
            }
            Err(err) => err,
        }
    }

    // stream ::= STREAM-START implicit_document? explicit_document* STREAM-END

    fn parse_stream_start(&mut self) -> Result<Event> {
        let token = self.take()?;
        self.state = Some(State::ImplicitDocumentStart);
        Ok(Event::new(EventData::StreamStart, token.start, token.end))
    }

    fn parse_implicit_document_start(&mut self) -> Result<Event> {
        if self.check(&[
            TokenKind::Directive,
            TokenKind::DocumentStart,
            TokenKind::StreamEnd,
        ])? {
            return self.parse_document_start();
        }
        self.reset_tag_handles();
        let mark = self.peek_start()?;
        self.states.push(State::DocumentEnd);
        self.state = Some(State::BlockNode);
        Ok(Event::new(
            EventData::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            },
            mark,
            mark,
        ))
    }

    fn parse_document_start(&mut self) -> Result<Event> {
        // Extra document end markers.
        while self.check(&[TokenKind::DocumentEnd])? {
            self.take()?;
        }

        if self.check(&[TokenKind::StreamEnd])? {
            let token = self.take()?;
            let pre = self.take_pending();
            self.state = None;
            return Ok(Event::new(EventData::StreamEnd, token.start, token.end)
                .with_comment(CommentBundle::new(pre, None)));
        }

        let start = self.peek_start()?;
        let pre = self.take_pending();
        let (version, tags) = self.process_directives()?;
        if !self.check(&[TokenKind::DocumentStart])? {
            return Err(self.error("while parsing a document", None, "'<document start>'"));
        }
        let token = self.take()?;
        let eol = self.take_eol()?;
        self.states.push(State::DocumentEnd);
        self.state = Some(State::DocumentContent);
        Ok(Event::new(
            EventData::DocumentStart {
                explicit: true,
                version,
                tags,
            },
            start,
            token.end,
        )
        .with_comment(CommentBundle::new(pre, eol)))
    }

    fn parse_document_end(&mut self) -> Result<Event> {
        let start = self.peek_start()?;
        let mut end = start;
        let pre = self.take_pending();
        let mut explicit = false;
        let mut eol = None;
        if self.check(&[TokenKind::DocumentEnd])? {
            let token = self.take()?;
            end = token.end;
            explicit = true;
            eol = self.take_eol()?;
        }
        self.state = Some(State::DocumentStart);
        Ok(
            Event::new(EventData::DocumentEnd { explicit }, start, end)
                .with_comment(CommentBundle::new(pre, eol)),
        )
    }

    fn parse_document_content(&mut self) -> Result<Event> {
        if self.check(&[
            TokenKind::Directive,
            TokenKind::DocumentStart,
            TokenKind::DocumentEnd,
            TokenKind::StreamEnd,
        ])? {
            let mark = self.peek_start()?;
            self.pop_state();
            return Ok(self.empty_scalar(mark));
        }
        self.parse_node(true, false)
    }

    fn reset_tag_handles(&mut self) {
        self.tag_handles = DEFAULT_TAGS
            .iter()
            .map(|(handle, prefix)| (handle.to_string(), prefix.to_string()))
            .collect();
    }

    fn process_directives(&mut self) -> Result<(Option<Version>, Vec<TagDirective>)> {
        let mut version = None;
        let mut tags = Vec::new();
        self.tag_handles.clear();
        while self.check(&[TokenKind::Directive])? {
            let token = self.take()?;
            let TokenData::Directive(directive) = token.data else {
                continue;
            };
            match directive {
                Directive::Version(found) => {
                    if version.is_some() {
                        return Err(MarkedError::new(Stage::Parser, "found duplicate YAML directive")
                            .at(token.start));
                    }
                    if found.major != 1 {
                        return Err(MarkedError::new(
                            Stage::Parser,
                            "found incompatible YAML document (version 1.* is required)",
                        )
                        .at(token.start));
                    }
                    if found != Version::V1_1 && found != Version::V1_2 {
                        return Err(MarkedError::new(
                            Stage::Parser,
                            format!("found unsupported YAML version {found} (1.1 or 1.2 is required)"),
                        )
                        .at(token.start));
                    }
                    version = Some(found);
                }
                Directive::Tag(tag) => {
                    if self.tag_handles.contains_key(&tag.handle) {
                        return Err(MarkedError::new(
                            Stage::Parser,
                            format!("duplicate tag handle {:?}", tag.handle),
                        )
                        .at(token.start));
                    }
                    self.tag_handles
                        .insert(tag.handle.clone(), tag.prefix.clone());
                    tags.push(tag);
                }
                Directive::Reserved(name) => {
                    trace!("Ignoring reserved directive %{name}");
                }
            }
        }
        for (handle, prefix) in DEFAULT_TAGS {
            self.tag_handles
                .entry(handle.to_string())
                .or_insert_with(|| prefix.to_string());
        }
        Ok((version, tags))
    }

    // node ::= ALIAS | properties (block_content | flow_content) | properties | block_content | flow_content

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event> {
        if self.check(&[TokenKind::Alias])? {
            let pre = self.take_pending();
            let token = self.take()?;
            let anchor = match token.data {
                TokenData::Name(name) => name,
                _ => String::new(),
            };
            let eol = self.take_eol()?;
            self.pop_state();
            return Ok(
                Event::new(EventData::Alias { anchor }, token.start, token.end)
                    .with_comment(CommentBundle::new(pre, eol)),
            );
        }

        let mut anchor = None;
        let mut tag = None;
        let mut start = None;
        let mut end = None;
        let mut tag_mark = None;
        for _ in 0..2 {
            if anchor.is_none() && self.check(&[TokenKind::Anchor])? {
                let token = self.take()?;
                start.get_or_insert(token.start);
                end = Some(token.end);
                if let TokenData::Name(name) = token.data {
                    anchor = Some(name);
                }
            } else if tag.is_none() && self.check(&[TokenKind::Tag])? {
                let token = self.take()?;
                start.get_or_insert(token.start);
                end = Some(token.end);
                tag_mark = Some(token.start);
                if let TokenData::Tag { handle, suffix } = token.data {
                    tag = Some((handle, suffix));
                }
            }
        }

        let tag = match tag {
            None => None,
            Some((None, suffix)) => Some(suffix),
            Some((Some(handle), suffix)) => match self.tag_handles.get(&handle) {
                Some(prefix) => Some(format!("{prefix}{suffix}")),
                None => {
                    return Err(MarkedError::new(
                        Stage::Parser,
                        format!("found undefined tag handle {handle:?}"),
                    )
                    .with_context("while parsing a node", start)
                    .at(tag_mark.unwrap_or_default()));
                }
            },
        };

        let next = self.peek_start()?;
        let start = start.unwrap_or(next);
        let mut end = end.unwrap_or(next);
        let implicit = tag.as_deref().is_none_or(|t| t == "!");

        if indentless_sequence && self.check(&[TokenKind::BlockEntry])? {
            end = self.peek()?.end;
            self.state = Some(State::IndentlessSequenceEntry);
            let comment = self.collection_start_comments();
            return Ok(Event::new(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style: false,
                },
                start,
                end,
            )
            .with_comment(comment));
        }

        if self.check(&[TokenKind::Scalar])? {
            let pre = self.take_pending();
            let token = self.take()?;
            let TokenData::Scalar(scalar) = token.data else {
                return Err(MarkedError::new(Stage::Parser, "malformed scalar token").at(token.start));
            };
            let plain = scalar.style == ScalarStyle::Plain;
            let implicit = if (plain && tag.is_none()) || tag.as_deref() == Some("!") {
                (true, false)
            } else if tag.is_none() {
                (false, true)
            } else {
                (false, false)
            };
            let eol = match scalar.header_comment {
                Some(comment) => Some(comment),
                None => self.take_eol()?,
            };
            self.pop_state();
            return Ok(Event::new(
                EventData::Scalar {
                    anchor,
                    tag,
                    implicit,
                    value: scalar.value,
                    style: Some(scalar.style),
                    folds: scalar.folds,
                },
                start,
                token.end,
            )
            .with_comment(CommentBundle::new(pre, eol)));
        }

        let collection = if self.check(&[TokenKind::FlowSequenceStart])? {
            Some((State::FlowSequenceFirstEntry, true, true))
        } else if self.check(&[TokenKind::FlowMappingStart])? {
            Some((State::FlowMappingFirstKey, false, true))
        } else if block && self.check(&[TokenKind::BlockSequenceStart])? {
            Some((State::BlockSequenceFirstEntry, true, false))
        } else if block && self.check(&[TokenKind::BlockMappingStart])? {
            Some((State::BlockMappingFirstKey, false, false))
        } else {
            None
        };
        if let Some((state, sequence, flow_style)) = collection {
            end = self.peek()?.end;
            self.state = Some(state);
            let comment = self.collection_start_comments();
            let data = if sequence {
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style,
                }
            } else {
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style,
                }
            };
            return Ok(Event::new(data, start, end).with_comment(comment));
        }

        if anchor.is_some() || tag.is_some() {
            // An empty scalar with properties: `key: !!null` or `&a`.
            self.pop_state();
            let mut event = Event::new(
                EventData::Scalar {
                    anchor,
                    tag,
                    implicit: (implicit, false),
                    value: String::new(),
                    style: Some(ScalarStyle::Plain),
                    folds: Vec::new(),
                },
                start,
                end,
            );
            event.comment = self.empty_scalar_comments();
            return Ok(event);
        }

        let context = if block {
            "while parsing a block node"
        } else {
            "while parsing a flow node"
        };
        Err(self.error(context, Some(start), "the node content"))
    }

    /// An empty plain scalar at `mark`.
    fn empty_scalar(&mut self, mark: Mark) -> Event {
        let comment = self.empty_scalar_comments();
        Event::new(
            EventData::Scalar {
                anchor: None,
                tag: None,
                implicit: (true, false),
                value: String::new(),
                style: Some(ScalarStyle::Plain),
                folds: Vec::new(),
            },
            mark,
            mark,
        )
        .with_comment(comment)
    }

    /// An empty value takes the eol comment left by its `:` or `-`.
    fn empty_scalar_comments(&mut self) -> CommentBundle {
        match self.pending.first() {
            Some(first) if first.is_eol() => CommentBundle::new(Vec::new(), Some(self.pending.remove(0))),
            _ => CommentBundle::default(),
        }
    }

    // block_sequence ::= BLOCK-SEQUENCE-START (BLOCK-ENTRY block_node?)* BLOCK-END

    fn parse_block_sequence_first_entry(&mut self) -> Result<Event> {
        let token = self.take()?;
        self.marks.push(token.start);
        self.parse_block_sequence_entry()
    }

    fn parse_block_sequence_entry(&mut self) -> Result<Event> {
        if self.check(&[TokenKind::BlockEntry])? {
            let token = self.take()?;
            if !self.check(&[TokenKind::BlockEntry, TokenKind::BlockEnd])? {
                self.states.push(State::BlockSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Some(State::BlockSequenceEntry);
            return Ok(self.empty_scalar(token.end));
        }
        if !self.check(&[TokenKind::BlockEnd])? {
            let mark = self.marks.last().copied();
            return Err(self.error("while parsing a block collection", mark, "<block end>"));
        }
        self.block_end(EventData::SequenceEnd)
    }

    fn block_end(&mut self, data: EventData) -> Result<Event> {
        let token = self.take()?;
        let column = self.marks.pop().map_or(0, |mark| mark.column);
        let pre = self.block_end_comments(column);
        self.pop_state();
        Ok(Event::new(data, token.start, token.end).with_comment(CommentBundle::new(pre, None)))
    }

    // indentless_sequence ::= (BLOCK-ENTRY block_node?)+

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event> {
        if self.check(&[TokenKind::BlockEntry])? {
            let token = self.take()?;
            if !self.check(&[
                TokenKind::BlockEntry,
                TokenKind::Key,
                TokenKind::Value,
                TokenKind::BlockEnd,
            ])? {
                self.states.push(State::IndentlessSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(self.empty_scalar(token.end));
        }
        // The sequence shares its indentation with the enclosing mapping, so
        // comments after it belong to the mapping.
        let mark = self.peek_start()?;
        self.pop_state();
        Ok(Event::new(EventData::SequenceEnd, mark, mark))
    }

    // block_mapping ::= BLOCK-MAPPING_START
    //                   ((KEY block_node_or_indentless_sequence?)?
    //                   (VALUE block_node_or_indentless_sequence?)?)*
    //                   BLOCK-END

    fn parse_block_mapping_first_key(&mut self) -> Result<Event> {
        let token = self.take()?;
        self.marks.push(token.start);
        self.parse_block_mapping_key()
    }

    fn parse_block_mapping_key(&mut self) -> Result<Event> {
        if self.check(&[TokenKind::Key])? {
            let token = self.take()?;
            if !self.check(&[TokenKind::Key, TokenKind::Value, TokenKind::BlockEnd])? {
                self.states.push(State::BlockMappingValue);
                return self.parse_node(true, true);
            }
            self.state = Some(State::BlockMappingValue);
            return Ok(self.empty_scalar(token.end));
        }
        if !self.check(&[TokenKind::BlockEnd])? {
            let mark = self.marks.last().copied();
            return Err(self.error("while parsing a block mapping", mark, "<block end>"));
        }
        self.block_end(EventData::MappingEnd)
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event> {
        if self.check(&[TokenKind::Value])? {
            let token = self.take()?;
            if !self.check(&[TokenKind::Key, TokenKind::Value, TokenKind::BlockEnd])? {
                self.states.push(State::BlockMappingKey);
                return self.parse_node(true, true);
            }
            self.state = Some(State::BlockMappingKey);
            return Ok(self.empty_scalar(token.end));
        }
        self.state = Some(State::BlockMappingKey);
        let mark = self.peek_start()?;
        Ok(self.empty_scalar(mark))
    }

    // flow_sequence ::= FLOW-SEQUENCE-START
    //                   (flow_sequence_entry FLOW-ENTRY)*
    //                   flow_sequence_entry?
    //                   FLOW-SEQUENCE-END
    // flow_sequence_entry ::= flow_node | KEY flow_node? (VALUE flow_node?)?

    fn parse_flow_sequence_first_entry(&mut self) -> Result<Event> {
        let token = self.take()?;
        self.marks.push(token.start);
        self.parse_flow_sequence_entry(true)
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event> {
        if !self.check(&[TokenKind::FlowSequenceEnd])? {
            if !first {
                if self.check(&[TokenKind::FlowEntry])? {
                    self.take()?;
                } else {
                    let mark = self.marks.last().copied();
                    return Err(self.error("while parsing a flow sequence", mark, "',' or ']'"));
                }
            }
            if self.check(&[TokenKind::Key])? {
                // A single-pair mapping inside a flow sequence: `[a: b]`.
                let token = self.peek()?;
                let (start, end) = (token.start, token.end);
                self.state = Some(State::FlowSequenceEntryMappingKey);
                return Ok(Event::new(
                    EventData::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        flow_style: true,
                    },
                    start,
                    end,
                ));
            }
            if !self.check(&[TokenKind::FlowSequenceEnd])? {
                self.states.push(State::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        self.flow_end(EventData::SequenceEnd)
    }

    fn flow_end(&mut self, data: EventData) -> Result<Event> {
        let token = self.take()?;
        self.marks.pop();
        let pre = self.take_pending();
        let eol = self.take_eol()?;
        self.pop_state();
        Ok(Event::new(data, token.start, token.end).with_comment(CommentBundle::new(pre, eol)))
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event> {
        let token = self.take()?;
        if !self.check(&[
            TokenKind::Value,
            TokenKind::FlowEntry,
            TokenKind::FlowSequenceEnd,
        ])? {
            self.states.push(State::FlowSequenceEntryMappingValue);
            return self.parse_node(false, false);
        }
        self.state = Some(State::FlowSequenceEntryMappingValue);
        Ok(self.empty_scalar(token.end))
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event> {
        if self.check(&[TokenKind::Value])? {
            let token = self.take()?;
            if !self.check(&[TokenKind::FlowEntry, TokenKind::FlowSequenceEnd])? {
                self.states.push(State::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
            self.state = Some(State::FlowSequenceEntryMappingEnd);
            return Ok(self.empty_scalar(token.end));
        }
        self.state = Some(State::FlowSequenceEntryMappingEnd);
        let mark = self.peek_start()?;
        Ok(self.empty_scalar(mark))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event> {
        self.state = Some(State::FlowSequenceEntry);
        let mark = self.peek_start()?;
        Ok(Event::new(EventData::MappingEnd, mark, mark))
    }

    // flow_mapping ::= FLOW-MAPPING-START
    //                  (flow_mapping_entry FLOW-ENTRY)*
    //                  flow_mapping_entry?
    //                  FLOW-MAPPING-END
    // flow_mapping_entry ::= flow_node | KEY flow_node? (VALUE flow_node?)?

    fn parse_flow_mapping_first_key(&mut self) -> Result<Event> {
        let token = self.take()?;
        self.marks.push(token.start);
        self.parse_flow_mapping_key(true)
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event> {
        if !self.check(&[TokenKind::FlowMappingEnd])? {
            if !first {
                if self.check(&[TokenKind::FlowEntry])? {
                    self.take()?;
                } else {
                    let mark = self.marks.last().copied();
                    return Err(self.error("while parsing a flow mapping", mark, "',' or '}'"));
                }
            }
            if self.check(&[TokenKind::Key])? {
                let token = self.take()?;
                if !self.check(&[
                    TokenKind::Value,
                    TokenKind::FlowEntry,
                    TokenKind::FlowMappingEnd,
                ])? {
                    self.states.push(State::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                self.state = Some(State::FlowMappingValue);
                return Ok(self.empty_scalar(token.end));
            }
            if !self.check(&[TokenKind::FlowMappingEnd])? {
                self.states.push(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        self.flow_end(EventData::MappingEnd)
    }

    fn parse_flow_mapping_value(&mut self) -> Result<Event> {
        if self.check(&[TokenKind::Value])? {
            let token = self.take()?;
            if !self.check(&[TokenKind::FlowEntry, TokenKind::FlowMappingEnd])? {
                self.states.push(State::FlowMappingKey);
                return self.parse_node(false, false);
            }
            self.state = Some(State::FlowMappingKey);
            return Ok(self.empty_scalar(token.end));
        }
        self.state = Some(State::FlowMappingKey);
        let mark = self.peek_start()?;
        Ok(self.empty_scalar(mark))
    }

    fn parse_flow_mapping_empty_value(&mut self) -> Result<Event> {
        self.state = Some(State::FlowMappingKey);
        let mark = self.peek_start()?;
        Ok(self.empty_scalar(mark))
    }
}

impl Iterator for Parser {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_event().transpose()
    }
}

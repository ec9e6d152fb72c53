//! Event types shared by the parser (load) and the serializer (dump).

use rtyaml_scanner::{Comment, Mark, ScalarStyle, TagDirective, Version};

/// Comments attached to one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct CommentBundle {
    /// Comments and blank lines before the event. On end events these are the
    /// trailing comments of the collection.
    pub pre: Vec<Comment>,
    /// The comment on the same line, after the event's last token.
    pub eol: Option<Comment>,
}

impl CommentBundle {
    pub fn new(pre: Vec<Comment>, eol: Option<Comment>) -> Self {
        Self { pre, eol }
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.eol.is_none()
    }

    /// Move everything from `other` into `self`, keeping `self`'s eol if set.
    pub fn absorb(&mut self, other: CommentBundle) {
        self.pre.extend(other.pre);
        if self.eol.is_none() {
            self.eol = other.eol;
        }
    }
}

/// Event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    StreamStart,
    StreamEnd,
    DocumentStart {
        /// `---` was present.
        explicit: bool,
        /// `%YAML` directive, if any.
        version: Option<Version>,
        /// `%TAG` directives, in source order.
        tags: Vec<TagDirective>,
    },
    DocumentEnd {
        /// `...` was present.
        explicit: bool,
    },
    Alias {
        anchor: String,
    },
    Scalar {
        anchor: Option<String>,
        /// Fully resolved tag (`tag:yaml.org,2002:str`), or `!` for the
        /// non-specific tag.
        tag: Option<String>,
        /// (plain implicit, quoted implicit): whether the tag may be omitted
        /// when the scalar is written plain, respectively quoted.
        implicit: (bool, bool),
        value: String,
        /// `None` lets the emitter pick.
        style: Option<ScalarStyle>,
        /// Char offsets of folded line breaks in a folded block scalar.
        folds: Vec<usize>,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow_style: bool,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow_style: bool,
    },
    MappingEnd,
}

/// The kind of an event, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    Alias,
    Scalar,
    SequenceStart,
    SequenceEnd,
    MappingStart,
    MappingEnd,
}

/// One parser event with its source range and comments.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub data: EventData,
    pub start: Mark,
    pub end: Mark,
    pub comment: CommentBundle,
}

impl Event {
    pub fn new(data: EventData, start: Mark, end: Mark) -> Self {
        Self {
            data,
            start,
            end,
            comment: CommentBundle::default(),
        }
    }

    /// An event with no source position, as produced on the dump path.
    pub fn synthetic(data: EventData) -> Self {
        Self::new(data, Mark::default(), Mark::default())
    }

    pub fn with_comment(mut self, comment: CommentBundle) -> Self {
        self.comment = comment;
        self
    }

    pub fn kind(&self) -> EventKind {
        match &self.data {
            EventData::StreamStart => EventKind::StreamStart,
            EventData::StreamEnd => EventKind::StreamEnd,
            EventData::DocumentStart { .. } => EventKind::DocumentStart,
            EventData::DocumentEnd { .. } => EventKind::DocumentEnd,
            EventData::Alias { .. } => EventKind::Alias,
            EventData::Scalar { .. } => EventKind::Scalar,
            EventData::SequenceStart { .. } => EventKind::SequenceStart,
            EventData::SequenceEnd => EventKind::SequenceEnd,
            EventData::MappingStart { .. } => EventKind::MappingStart,
            EventData::MappingEnd => EventKind::MappingEnd,
        }
    }

    /// The anchor on a node event.
    pub fn anchor(&self) -> Option<&str> {
        match &self.data {
            EventData::Alias { anchor } => Some(anchor),
            EventData::Scalar { anchor, .. }
            | EventData::SequenceStart { anchor, .. }
            | EventData::MappingStart { anchor, .. } => anchor.as_deref(),
            _ => None,
        }
    }
}

//! Token types produced by the scanner.

use std::fmt;

use crate::{Comment, Mark};

/// Presentation style of a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum ScalarStyle {
    /// Unquoted: `hello`
    Plain,
    /// `'hello'`
    SingleQuoted,
    /// `"hello"`
    DoubleQuoted,
    /// `|` block scalar
    Literal,
    /// `>` block scalar
    Folded,
}

impl ScalarStyle {
    /// The indicator character used for this style, if any.
    pub fn indicator(self) -> Option<char> {
        match self {
            ScalarStyle::Plain => None,
            ScalarStyle::SingleQuoted => Some('\''),
            ScalarStyle::DoubleQuoted => Some('"'),
            ScalarStyle::Literal => Some('|'),
            ScalarStyle::Folded => Some('>'),
        }
    }

    #[inline]
    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }

    #[inline]
    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted)
    }
}

/// A YAML language version from a `%YAML` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const V1_1: Version = Version { major: 1, minor: 1 };
    pub const V1_2: Version = Version { major: 1, minor: 2 };

    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::V1_2
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A `%TAG handle prefix` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagDirective {
    pub handle: String,
    pub prefix: String,
}

/// Payload of a directive token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Version(Version),
    Tag(TagDirective),
    /// Any other `%NAME`, kept so the parser can ignore it.
    Reserved(String),
}

/// Payload of a scalar token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarToken {
    /// The decoded value.
    pub value: String,
    pub style: ScalarStyle,
    /// For folded block scalars, char offsets into `value` of the spaces that
    /// came from folding a source line break.
    pub folds: Vec<usize>,
    /// A comment following a block scalar header (`key: |  # note`).
    pub header_comment: Option<Comment>,
}

/// The kind of a token, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    StreamStart,
    StreamEnd,
    /// `%YAML` / `%TAG` / reserved directive
    Directive,
    /// `---`
    DocumentStart,
    /// `...`
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    /// `[`
    FlowSequenceStart,
    /// `{`
    FlowMappingStart,
    /// `]`
    FlowSequenceEnd,
    /// `}`
    FlowMappingEnd,
    /// `?` or an implicit simple key
    Key,
    /// `:`
    Value,
    /// `-`
    BlockEntry,
    /// `,`
    FlowEntry,
    /// `*name`
    Alias,
    /// `&name`
    Anchor,
    /// `!handle!suffix`
    Tag,
    Scalar,
    /// `# ...` or a blank line
    Comment,
}

impl TokenKind {
    /// Human-readable name used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::StreamStart => "<stream start>",
            TokenKind::StreamEnd => "<stream end>",
            TokenKind::Directive => "<directive>",
            TokenKind::DocumentStart => "<document start>",
            TokenKind::DocumentEnd => "<document end>",
            TokenKind::BlockSequenceStart => "<block sequence start>",
            TokenKind::BlockMappingStart => "<block mapping start>",
            TokenKind::BlockEnd => "<block end>",
            TokenKind::FlowSequenceStart => "'['",
            TokenKind::FlowMappingStart => "'{'",
            TokenKind::FlowSequenceEnd => "']'",
            TokenKind::FlowMappingEnd => "'}'",
            TokenKind::Key => "'?'",
            TokenKind::Value => "':'",
            TokenKind::BlockEntry => "'-'",
            TokenKind::FlowEntry => "','",
            TokenKind::Alias => "<alias>",
            TokenKind::Anchor => "<anchor>",
            TokenKind::Tag => "<tag>",
            TokenKind::Scalar => "<scalar>",
            TokenKind::Comment => "<comment>",
        }
    }
}

/// Token payload. Most tokens carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenData {
    None,
    Directive(Directive),
    /// Anchor or alias name.
    Name(String),
    Tag {
        /// `None` for verbatim tags and the bare `!`.
        handle: Option<String>,
        suffix: String,
    },
    Scalar(ScalarToken),
    Comment(Comment),
}

/// A token with its source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub data: TokenData,
    pub start: Mark,
    pub end: Mark,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, start: Mark, end: Mark) -> Self {
        Self {
            kind,
            data: TokenData::None,
            start,
            end,
        }
    }

    #[inline]
    pub fn with_data(kind: TokenKind, data: TokenData, start: Mark, end: Mark) -> Self {
        Self {
            kind,
            data,
            start,
            end,
        }
    }

    /// Whether this token consumed any input.
    #[inline]
    pub fn is_zero_width(&self) -> bool {
        self.start.index == self.end.index
    }
}

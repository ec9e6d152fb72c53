//! Round-trip scanner: characters in, tokens out.
//!
//! Mirrors the classic YAML scanner design. Tokens are produced on demand
//! and buffered until a pending "simple key" (a scalar that may turn out to
//! be a mapping key) is resolved. Unlike a plain scanner, comments and blank
//! lines are not discarded: they are queued as [`TokenKind::Comment`] tokens.

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use crate::{
    Comment, CommentKind, Directive, Mark, MarkedError, Reader, ScalarStyle, ScalarToken, Stage,
    TagDirective, Token, TokenData, TokenKind, Version,
};

/// A candidate position for an implicit mapping key.
#[derive(Debug, Clone, Copy)]
struct SimpleKey {
    token_number: usize,
    required: bool,
    index: usize,
    line: usize,
    column: usize,
    mark: Mark,
}

/// Turns a [`Reader`] into a stream of [`Token`]s.
pub struct Scanner {
    reader: Reader,
    /// Set once STREAM-END has been queued.
    done: bool,
    /// Depth of `[`/`{` nesting; 0 in block context.
    flow_level: usize,
    tokens: VecDeque<Token>,
    /// Number of tokens handed out so far.
    tokens_taken: usize,
    /// Current block indentation column, -1 at the top.
    indent: isize,
    indents: Vec<isize>,
    /// Whether a simple key may start at the current position.
    allow_simple_key: bool,
    /// At most one candidate per flow level.
    possible_simple_keys: BTreeMap<usize, SimpleKey>,
    /// End of the last token that consumed input, used to classify comments.
    last_end: Option<Mark>,
    /// In flow context, `:` directly after a quoted scalar or a closing
    /// bracket is a value indicator even without a following space.
    adjacent_value: bool,
}

type Result<T> = std::result::Result<T, MarkedError>;

impl Scanner {
    /// Create a scanner over a reader. STREAM-START is queued immediately.
    pub fn new(reader: Reader) -> Self {
        let mut scanner = Self {
            reader,
            done: false,
            flow_level: 0,
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: Vec::new(),
            allow_simple_key: true,
            possible_simple_keys: BTreeMap::new(),
            last_end: None,
            adjacent_value: false,
        };
        let mark = scanner.reader.mark();
        scanner.push(Token::new(TokenKind::StreamStart, mark, mark));
        scanner
    }

    /// Create a scanner over decoded text.
    pub fn from_str(text: &str) -> Result<Self> {
        Ok(Self::new(Reader::new(text)?))
    }

    /// Whether the next token is one of `kinds` (any token if `kinds` is empty).
    pub fn check_token(&mut self, kinds: &[TokenKind]) -> Result<bool> {
        self.fill()?;
        Ok(match self.tokens.front() {
            Some(token) => kinds.is_empty() || kinds.contains(&token.kind),
            None => false,
        })
    }

    /// The next token, without consuming it.
    pub fn peek_token(&mut self) -> Result<Option<&Token>> {
        self.fill()?;
        Ok(self.tokens.front())
    }

    /// Consume and return the next token.
    pub fn get_token(&mut self) -> Result<Option<Token>> {
        self.fill()?;
        let token = self.tokens.pop_front();
        if token.is_some() {
            self.tokens_taken += 1;
        }
        Ok(token)
    }

    fn fill(&mut self) -> Result<()> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        Ok(())
    }

    fn need_more_tokens(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if self.tokens.is_empty() {
            return Ok(true);
        }
        // The current token may be a potential simple key, so we need to
        // look further.
        self.stale_possible_simple_keys()?;
        Ok(self.next_possible_simple_key() == Some(self.tokens_taken))
    }

    fn push(&mut self, token: Token) {
        trace!("Token {:?} at {}..{}", token.kind, token.start, token.end);
        if token.kind != TokenKind::Comment && !token.is_zero_width() {
            self.last_end = Some(token.end);
        }
        self.adjacent_value = match &token.data {
            TokenData::Scalar(scalar) => scalar.style.is_quoted(),
            _ => matches!(
                token.kind,
                TokenKind::FlowSequenceEnd | TokenKind::FlowMappingEnd
            ),
        };
        self.tokens.push_back(token);
    }

    fn fetch_more_tokens(&mut self) -> Result<()> {
        if let Some(comment) = self.scan_to_next_token() {
            self.push(comment);
            return Ok(());
        }

        self.stale_possible_simple_keys()?;
        self.unwind_indent(self.reader.column() as isize);

        let ch = self.reader.peek(0);
        match ch {
            '\0' => self.fetch_stream_end(),
            '%' if self.check_directive() => self.fetch_directive(),
            '-' if self.check_document_indicator("---") => {
                self.fetch_document_indicator(TokenKind::DocumentStart)
            }
            '.' if self.check_document_indicator("...") => {
                self.fetch_document_indicator(TokenKind::DocumentEnd)
            }
            '[' => self.fetch_flow_collection_start(TokenKind::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenKind::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenKind::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenKind::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if self.check_block_entry() => self.fetch_block_entry(),
            '?' if self.check_key() => self.fetch_key(),
            ':' if self.check_value() => self.fetch_value(),
            '*' => self.fetch_anchor(TokenKind::Alias),
            '&' => self.fetch_anchor(TokenKind::Anchor),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => self.fetch_flow_scalar(ScalarStyle::SingleQuoted),
            '"' => self.fetch_flow_scalar(ScalarStyle::DoubleQuoted),
            _ if self.check_plain() => self.fetch_plain(),
            _ => Err(MarkedError::new(
                Stage::Scanner,
                format!("found character {ch:?} that cannot start any token"),
            )
            .with_context("while scanning for the next token", None)
            .at(self.reader.mark())),
        }
    }

    // Simple keys

    fn next_possible_simple_key(&self) -> Option<usize> {
        self.possible_simple_keys
            .values()
            .map(|key| key.token_number)
            .min()
    }

    /// Drop candidates that can no longer be keys: a simple key must fit on
    /// one line and within 1024 characters.
    fn stale_possible_simple_keys(&mut self) -> Result<()> {
        let line = self.reader.line();
        let index = self.reader.index();
        let mut stale_required = None;
        self.possible_simple_keys.retain(|_, key| {
            if key.line != line || index > key.index + 1024 {
                if key.required {
                    stale_required = Some(key.mark);
                }
                false
            } else {
                true
            }
        });
        match stale_required {
            Some(mark) => Err(self.simple_key_error(mark)),
            None => Ok(()),
        }
    }

    fn save_possible_simple_key(&mut self) -> Result<()> {
        // A simple key is required at the current position if it starts at
        // the current block indentation.
        let required = self.flow_level == 0 && self.indent == self.reader.column() as isize;
        if self.allow_simple_key {
            self.remove_possible_simple_key()?;
            let mark = self.reader.mark();
            let key = SimpleKey {
                token_number: self.tokens_taken + self.tokens.len(),
                required,
                index: mark.index,
                line: mark.line,
                column: mark.column,
                mark,
            };
            self.possible_simple_keys.insert(self.flow_level, key);
        }
        Ok(())
    }

    fn remove_possible_simple_key(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level)
            && key.required
        {
            return Err(self.simple_key_error(key.mark));
        }
        Ok(())
    }

    fn simple_key_error(&self, mark: Mark) -> MarkedError {
        MarkedError::new(Stage::Scanner, "could not find expected ':'")
            .with_context("while scanning a simple key", Some(mark))
            .at(self.reader.mark())
    }

    // Indentation

    fn unwind_indent(&mut self, column: isize) {
        // Indentation is ignored in flow context.
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.push(Token::new(TokenKind::BlockEnd, mark, mark));
        }
    }

    fn add_indent(&mut self, column: isize) -> bool {
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            true
        } else {
            false
        }
    }

    // Fetchers

    fn fetch_stream_end(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.possible_simple_keys.clear();
        let mark = self.reader.mark();
        self.push(Token::new(TokenKind::StreamEnd, mark, mark));
        self.done = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_directive()?;
        self.push(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, kind: TokenKind) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward(3);
        let end = self.reader.mark();
        self.push(Token::new(kind, start, end));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, kind: TokenKind) -> Result<()> {
        self.save_possible_simple_key()?;
        self.flow_level += 1;
        self.allow_simple_key = true;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.push(Token::new(kind, start, end));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: TokenKind) -> Result<()> {
        self.remove_possible_simple_key()?;
        self.flow_level = self.flow_level.saturating_sub(1);
        self.allow_simple_key = false;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.push(Token::new(kind, start, end));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.push(Token::new(TokenKind::FlowEntry, start, end));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(MarkedError::new(
                    Stage::Scanner,
                    "sequence entries are not allowed here",
                )
                .at(self.reader.mark()));
            }
            if self.add_indent(self.reader.column() as isize) {
                let mark = self.reader.mark();
                self.push(Token::new(TokenKind::BlockSequenceStart, mark, mark));
            }
        }
        // A block entry in flow context is an error the parser reports.
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.push(Token::new(TokenKind::BlockEntry, start, end));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<()> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return Err(
                    MarkedError::new(Stage::Scanner, "mapping keys are not allowed here")
                        .at(self.reader.mark()),
                );
            }
            if self.add_indent(self.reader.column() as isize) {
                let mark = self.reader.mark();
                self.push(Token::new(TokenKind::BlockMappingStart, mark, mark));
            }
        }
        self.allow_simple_key = self.flow_level == 0;
        self.remove_possible_simple_key()?;
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.push(Token::new(TokenKind::Key, start, end));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level) {
            // Insert KEY (and maybe BLOCK-MAPPING-START) before the scalar
            // that turned out to be a key.
            let position = key.token_number - self.tokens_taken;
            self.tokens
                .insert(position, Token::new(TokenKind::Key, key.mark, key.mark));
            if self.flow_level == 0 && self.add_indent(key.column as isize) {
                self.tokens.insert(
                    position,
                    Token::new(TokenKind::BlockMappingStart, key.mark, key.mark),
                );
            }
            self.allow_simple_key = false;
        } else {
            if self.flow_level == 0 {
                if !self.allow_simple_key {
                    return Err(MarkedError::new(
                        Stage::Scanner,
                        "mapping values are not allowed here",
                    )
                    .at(self.reader.mark()));
                }
                if self.add_indent(self.reader.column() as isize) {
                    let mark = self.reader.mark();
                    self.push(Token::new(TokenKind::BlockMappingStart, mark, mark));
                }
            }
            self.allow_simple_key = self.flow_level == 0;
            self.remove_possible_simple_key()?;
        }
        let start = self.reader.mark();
        self.reader.forward(1);
        let end = self.reader.mark();
        self.push(Token::new(TokenKind::Value, start, end));
        Ok(())
    }

    fn fetch_anchor(&mut self, kind: TokenKind) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(kind)?;
        self.push(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.push(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        // A simple key may follow a block scalar.
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let (token, content_end) = self.scan_block_scalar(style)?;
        self.push(token);
        // The token's end lies on the line after the content; comments are
        // classified against the content itself.
        self.last_end = Some(content_end);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(style)?;
        self.push(token);
        Ok(())
    }

    fn fetch_plain(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_plain()?;
        self.push(token);
        Ok(())
    }

    // Checkers

    fn check_directive(&self) -> bool {
        self.reader.column() == 0
    }

    fn check_document_indicator(&self, indicator: &str) -> bool {
        self.reader.column() == 0
            && self.reader.starts_with(indicator)
            && is_blank_or_end(self.reader.peek(3))
    }

    fn check_block_entry(&self) -> bool {
        is_blank_or_end(self.reader.peek(1))
    }

    fn check_key(&self) -> bool {
        self.flow_level > 0 || is_blank_or_end(self.reader.peek(1))
    }

    fn check_value(&self) -> bool {
        let next = self.reader.peek(1);
        if self.flow_level == 0 {
            return is_blank_or_end(next);
        }
        is_blank_or_end(next) || is_flow_indicator(next) || self.adjacent_value
    }

    fn check_plain(&self) -> bool {
        let ch = self.reader.peek(0);
        let next = self.reader.peek(1);
        if !(is_blank_or_end(ch) || "-?:,[]{}#&*!|>'\"%@`".contains(ch)) {
            return true;
        }
        if is_blank_or_end(next) {
            return false;
        }
        ch == '-'
            || (self.flow_level == 0 && matches!(ch, '?' | ':'))
            || (self.flow_level > 0 && matches!(ch, '?' | ':') && !is_flow_indicator(next))
    }

    // Scanners

    /// Skip whitespace up to the next token. A comment or blank line found on
    /// the way is returned as a token instead.
    fn scan_to_next_token(&mut self) -> Option<Token> {
        if self.reader.index() == 0 && self.reader.peek(0) == '\u{FEFF}' {
            self.reader.forward(1);
        }
        loop {
            while self.reader.peek(0) == ' '
                || ((self.flow_level > 0 || !self.allow_simple_key) && self.reader.peek(0) == '\t')
            {
                self.reader.forward(1);
            }
            let ch = self.reader.peek(0);
            if ch == '#' {
                let start = self.reader.mark();
                let mut text = String::new();
                while !is_break_or_nul(self.reader.peek(0)) {
                    text.push(self.reader.peek(0));
                    self.reader.forward(1);
                }
                let end = self.reader.mark();
                let (kind, gap) = match self.last_end {
                    Some(last) if last.line == start.line && last.column > 0 => {
                        (CommentKind::Eol, start.column.saturating_sub(last.column))
                    }
                    _ => (CommentKind::FullLine, 0),
                };
                self.scan_line_break();
                if self.flow_level == 0 {
                    self.allow_simple_key = true;
                }
                let comment = Comment {
                    kind,
                    text: text.trim_end().to_string(),
                    line: start.line,
                    column: start.column,
                    gap,
                };
                return Some(Token::with_data(
                    TokenKind::Comment,
                    TokenData::Comment(comment),
                    start,
                    end,
                ));
            }
            if is_break(ch) {
                let start = self.reader.mark();
                let blank = self.last_end.is_none_or(|last| last.line != start.line);
                self.scan_line_break();
                if self.flow_level == 0 {
                    self.allow_simple_key = true;
                }
                if blank {
                    let comment = Comment {
                        kind: CommentKind::Blank,
                        text: String::new(),
                        line: start.line,
                        column: 0,
                        gap: 0,
                    };
                    return Some(Token::with_data(
                        TokenKind::Comment,
                        TokenData::Comment(comment),
                        start,
                        self.reader.mark(),
                    ));
                }
                continue;
            }
            return None;
        }
    }

    fn scan_directive(&mut self) -> Result<Token> {
        let start = self.reader.mark();
        self.reader.forward(1);
        let name = self.scan_directive_name(start)?;
        let directive = match name.as_str() {
            "YAML" => Directive::Version(self.scan_yaml_directive_value(start)?),
            "TAG" => Directive::Tag(self.scan_tag_directive_value(start)?),
            _ => {
                while !is_break_or_nul(self.reader.peek(0)) {
                    self.reader.forward(1);
                }
                Directive::Reserved(name)
            }
        };
        let end = self.reader.mark();
        self.scan_directive_ignored_line(start)?;
        Ok(Token::with_data(
            TokenKind::Directive,
            TokenData::Directive(directive),
            start,
            end,
        ))
    }

    fn scan_directive_name(&mut self, start: Mark) -> Result<String> {
        let mut length = 0;
        while is_word_char(self.reader.peek(length)) {
            length += 1;
        }
        let ch = self.reader.peek(length);
        if length == 0 {
            return Err(self.directive_error(
                start,
                format!("expected alphabetic or numeric character, but found {ch:?}"),
            ));
        }
        let name = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) {
            return Err(self.directive_error(
                start,
                format!("expected alphabetic or numeric character, but found {ch:?}"),
            ));
        }
        Ok(name)
    }

    fn scan_yaml_directive_value(&mut self, start: Mark) -> Result<Version> {
        self.skip_inline_space();
        let major = self.scan_yaml_directive_number(start)?;
        let ch = self.reader.peek(0);
        if ch != '.' {
            return Err(
                self.directive_error(start, format!("expected a digit or '.', but found {ch:?}"))
            );
        }
        self.reader.forward(1);
        let minor = self.scan_yaml_directive_number(start)?;
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) {
            return Err(
                self.directive_error(start, format!("expected a digit or ' ', but found {ch:?}"))
            );
        }
        Ok(Version::new(major, minor))
    }

    fn scan_yaml_directive_number(&mut self, start: Mark) -> Result<u32> {
        let ch = self.reader.peek(0);
        if !ch.is_ascii_digit() {
            return Err(self.directive_error(start, format!("expected a digit, but found {ch:?}")));
        }
        let mut length = 0;
        while self.reader.peek(length).is_ascii_digit() {
            length += 1;
        }
        let digits = self.reader.prefix(length);
        self.reader.forward(length);
        digits
            .parse()
            .map_err(|_| self.directive_error(start, format!("version number {digits} is too large")))
    }

    fn scan_tag_directive_value(&mut self, start: Mark) -> Result<TagDirective> {
        self.skip_inline_space();
        let handle = self.scan_tag_handle("directive", start)?;
        let ch = self.reader.peek(0);
        if ch != ' ' {
            return Err(self.directive_error(start, format!("expected ' ', but found {ch:?}")));
        }
        self.skip_inline_space();
        let prefix = self.scan_tag_uri("directive", start)?;
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) {
            return Err(self.directive_error(start, format!("expected ' ', but found {ch:?}")));
        }
        Ok(TagDirective { handle, prefix })
    }

    fn scan_directive_ignored_line(&mut self, start: Mark) -> Result<()> {
        self.skip_inline_space();
        if self.reader.peek(0) == '#' {
            while !is_break_or_nul(self.reader.peek(0)) {
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek(0);
        if !is_break_or_nul(ch) {
            return Err(self.directive_error(
                start,
                format!("expected a comment or a line break, but found {ch:?}"),
            ));
        }
        self.scan_line_break();
        Ok(())
    }

    fn directive_error(&self, start: Mark, problem: String) -> MarkedError {
        MarkedError::new(Stage::Scanner, problem)
            .with_context("while scanning a directive", Some(start))
            .at(self.reader.mark())
    }

    fn scan_anchor(&mut self, kind: TokenKind) -> Result<Token> {
        let start = self.reader.mark();
        let name = if kind == TokenKind::Alias {
            "alias"
        } else {
            "anchor"
        };
        self.reader.forward(1);
        let mut length = 0;
        while is_anchor_char(self.reader.peek(length)) {
            length += 1;
        }
        if length == 0 {
            let ch = self.reader.peek(0);
            return Err(MarkedError::new(
                Stage::Scanner,
                format!("expected alphabetic or numeric character, but found {ch:?}"),
            )
            .with_context(format!("while scanning an {name}"), Some(start))
            .at(self.reader.mark()));
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        let end = self.reader.mark();
        Ok(Token::with_data(kind, TokenData::Name(value), start, end))
    }

    fn scan_tag(&mut self) -> Result<Token> {
        let start = self.reader.mark();
        let ch = self.reader.peek(1);
        let (handle, suffix) = if ch == '<' {
            self.reader.forward(2);
            let suffix = self.scan_tag_uri("tag", start)?;
            let ch = self.reader.peek(0);
            if ch != '>' {
                return Err(MarkedError::new(
                    Stage::Scanner,
                    format!("expected '>', but found {ch:?}"),
                )
                .with_context("while parsing a tag", Some(start))
                .at(self.reader.mark()));
            }
            self.reader.forward(1);
            (None, suffix)
        } else if is_blank_or_end(ch) || (self.flow_level > 0 && is_flow_indicator(ch)) {
            self.reader.forward(1);
            (None, "!".to_string())
        } else {
            let mut length = 1;
            let mut use_handle = false;
            let mut ch = ch;
            while !is_blank_or_end(ch) {
                if ch == '!' {
                    use_handle = true;
                    break;
                }
                length += 1;
                ch = self.reader.peek(length);
            }
            let handle = if use_handle {
                self.scan_tag_handle("tag", start)?
            } else {
                self.reader.forward(1);
                "!".to_string()
            };
            let suffix = self.scan_tag_uri("tag", start)?;
            (Some(handle), suffix)
        };
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) && !(self.flow_level > 0 && matches!(ch, ',' | ']' | '}')) {
            return Err(MarkedError::new(
                Stage::Scanner,
                format!("expected ' ', but found {ch:?}"),
            )
            .with_context("while scanning a tag", Some(start))
            .at(self.reader.mark()));
        }
        let end = self.reader.mark();
        Ok(Token::with_data(
            TokenKind::Tag,
            TokenData::Tag { handle, suffix },
            start,
            end,
        ))
    }

    fn scan_tag_handle(&mut self, name: &str, start: Mark) -> Result<String> {
        let ch = self.reader.peek(0);
        if ch != '!' {
            return Err(MarkedError::new(
                Stage::Scanner,
                format!("expected '!', but found {ch:?}"),
            )
            .with_context(format!("while scanning a {name}"), Some(start))
            .at(self.reader.mark()));
        }
        let mut length = 1;
        let mut ch = self.reader.peek(length);
        if ch != ' ' {
            while ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
                length += 1;
                ch = self.reader.peek(length);
            }
            if ch != '!' {
                self.reader.forward(length);
                return Err(MarkedError::new(
                    Stage::Scanner,
                    format!("expected '!', but found {ch:?}"),
                )
                .with_context(format!("while scanning a {name}"), Some(start))
                .at(self.reader.mark()));
            }
            length += 1;
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        Ok(value)
    }

    /// Scan a tag URI. `%xx` escapes are validated but kept verbatim so the
    /// tag is written back the way it was read.
    fn scan_tag_uri(&mut self, name: &str, start: Mark) -> Result<String> {
        let mut chunks = String::new();
        loop {
            let ch = self.reader.peek(0);
            if ch == '%' {
                for k in 1..=2 {
                    let digit = self.reader.peek(k);
                    if !digit.is_ascii_hexdigit() {
                        return Err(MarkedError::new(
                            Stage::Scanner,
                            format!(
                                "expected URI escape sequence of 2 hexadecimal numbers, but found {digit:?}"
                            ),
                        )
                        .with_context(format!("while scanning a {name}"), Some(start))
                        .at(self.reader.mark()));
                    }
                }
                chunks.push_str(&self.reader.prefix(3));
                self.reader.forward(3);
            } else if is_uri_char(ch) && !(self.flow_level > 0 && is_flow_indicator(ch)) {
                chunks.push(ch);
                self.reader.forward(1);
            } else {
                break;
            }
        }
        if chunks.is_empty() {
            let ch = self.reader.peek(0);
            return Err(MarkedError::new(
                Stage::Scanner,
                format!("expected URI, but found {ch:?}"),
            )
            .with_context(format!("while parsing a {name}"), Some(start))
            .at(self.reader.mark()));
        }
        Ok(chunks)
    }

    /// Returns the token and the end of its last content line.
    fn scan_block_scalar(&mut self, style: ScalarStyle) -> Result<(Token, Mark)> {
        let folded = style == ScalarStyle::Folded;
        let start = self.reader.mark();
        self.reader.forward(1);
        let (chomping, increment) = self.scan_block_scalar_indicators(start)?;
        let header_comment = self.scan_block_scalar_ignored_line(start)?;
        let mut content_end = start;

        // Trailing blank lines that chomping discards are rescanned as blank
        // line tokens, so remember where the last kept line break ended.
        let mut rewind = Some((self.reader.save(), self.reader.mark()));

        let min_indent = (self.indent + 1).max(1) as usize;
        let (mut breaks, mut end, indent) = match increment {
            None => {
                let (breaks, max_indent, end) = self.scan_block_scalar_indentation();
                (breaks, end, min_indent.max(max_indent))
            }
            Some(increment) => {
                let indent = min_indent + increment - 1;
                let (breaks, end) = self.scan_block_scalar_breaks(indent);
                (breaks, end, indent)
            }
        };

        let mut chunks = String::new();
        let mut folds = Vec::new();
        let mut line_break = String::new();
        while self.reader.column() == indent && self.reader.peek(0) != '\0' {
            chunks.push_str(&breaks);
            let leading_non_space = !matches!(self.reader.peek(0), ' ' | '\t');
            let mut length = 0;
            while !is_break_or_nul(self.reader.peek(length)) {
                length += 1;
            }
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            content_end = self.reader.mark();
            line_break = self.scan_line_break();
            rewind = Some((self.reader.save(), self.reader.mark()));
            (breaks, end) = self.scan_block_scalar_breaks(indent);
            if self.reader.column() == indent && self.reader.peek(0) != '\0' {
                if folded
                    && line_break == "\n"
                    && leading_non_space
                    && !matches!(self.reader.peek(0), ' ' | '\t')
                {
                    if breaks.is_empty() {
                        folds.push(chunks.chars().count());
                        chunks.push(' ');
                    }
                } else {
                    chunks.push_str(&line_break);
                }
            } else {
                break;
            }
        }

        // Chomping: None clips, Some(false) strips, Some(true) keeps.
        if chomping != Some(false) {
            chunks.push_str(&line_break);
        }
        if chomping == Some(true) {
            chunks.push_str(&breaks);
        } else if let Some((state, mark)) = rewind {
            self.reader.restore(state);
            end = mark;
        }

        let scalar = ScalarToken {
            value: chunks,
            style,
            folds,
            header_comment,
        };
        Ok((
            Token::with_data(TokenKind::Scalar, TokenData::Scalar(scalar), start, end),
            content_end,
        ))
    }

    fn scan_block_scalar_indicators(&mut self, start: Mark) -> Result<(Option<bool>, Option<usize>)> {
        let mut chomping = None;
        let mut increment = None;
        let mut ch = self.reader.peek(0);
        if matches!(ch, '+' | '-') {
            chomping = Some(ch == '+');
            self.reader.forward(1);
            ch = self.reader.peek(0);
            if ch.is_ascii_digit() {
                increment = Some(self.scan_indentation_indicator(start)?);
            }
        } else if ch.is_ascii_digit() {
            increment = Some(self.scan_indentation_indicator(start)?);
            ch = self.reader.peek(0);
            if matches!(ch, '+' | '-') {
                chomping = Some(ch == '+');
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) {
            return Err(MarkedError::new(
                Stage::Scanner,
                format!("expected chomping or indentation indicators, but found {ch:?}"),
            )
            .with_context("while scanning a block scalar", Some(start))
            .at(self.reader.mark()));
        }
        Ok((chomping, increment))
    }

    fn scan_indentation_indicator(&mut self, start: Mark) -> Result<usize> {
        let ch = self.reader.peek(0);
        let value = ch.to_digit(10).unwrap_or(0) as usize;
        if value == 0 {
            return Err(MarkedError::new(
                Stage::Scanner,
                "expected indentation indicator in the range 1-9, but found 0",
            )
            .with_context("while scanning a block scalar", Some(start))
            .at(self.reader.mark()));
        }
        self.reader.forward(1);
        Ok(value)
    }

    fn scan_block_scalar_ignored_line(&mut self, start: Mark) -> Result<Option<Comment>> {
        let gap_start = self.reader.column();
        self.skip_inline_space();
        let mut comment = None;
        if self.reader.peek(0) == '#' {
            let mark = self.reader.mark();
            let mut text = String::new();
            while !is_break_or_nul(self.reader.peek(0)) {
                text.push(self.reader.peek(0));
                self.reader.forward(1);
            }
            comment = Some(Comment {
                kind: CommentKind::Eol,
                text: text.trim_end().to_string(),
                line: mark.line,
                column: mark.column,
                gap: mark.column - gap_start,
            });
        }
        let ch = self.reader.peek(0);
        if !is_break_or_nul(ch) {
            return Err(MarkedError::new(
                Stage::Scanner,
                format!("expected a comment or a line break, but found {ch:?}"),
            )
            .with_context("while scanning a block scalar", Some(start))
            .at(self.reader.mark()));
        }
        self.scan_line_break();
        Ok(comment)
    }

    fn scan_block_scalar_indentation(&mut self) -> (String, usize, Mark) {
        let mut chunks = String::new();
        let mut max_indent = 0;
        let mut end = self.reader.mark();
        while self.reader.peek(0) == ' ' || is_break(self.reader.peek(0)) {
            if self.reader.peek(0) != ' ' {
                chunks.push_str(&self.scan_line_break());
                end = self.reader.mark();
            } else {
                self.reader.forward(1);
                max_indent = max_indent.max(self.reader.column());
            }
        }
        (chunks, max_indent, end)
    }

    fn scan_block_scalar_breaks(&mut self, indent: usize) -> (String, Mark) {
        let mut chunks = String::new();
        let mut end = self.reader.mark();
        while self.reader.column() < indent && self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        while is_break(self.reader.peek(0)) {
            chunks.push_str(&self.scan_line_break());
            end = self.reader.mark();
            while self.reader.column() < indent && self.reader.peek(0) == ' ' {
                self.reader.forward(1);
            }
        }
        (chunks, end)
    }

    fn scan_flow_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let double = style == ScalarStyle::DoubleQuoted;
        let start = self.reader.mark();
        let quote = self.reader.peek(0);
        self.reader.forward(1);
        let mut chunks = String::new();
        self.scan_flow_scalar_non_spaces(double, start, &mut chunks)?;
        while self.reader.peek(0) != quote {
            self.scan_flow_scalar_spaces(start, &mut chunks)?;
            self.scan_flow_scalar_non_spaces(double, start, &mut chunks)?;
        }
        self.reader.forward(1);
        let end = self.reader.mark();
        let scalar = ScalarToken {
            value: chunks,
            style,
            folds: Vec::new(),
            header_comment: None,
        };
        Ok(Token::with_data(
            TokenKind::Scalar,
            TokenData::Scalar(scalar),
            start,
            end,
        ))
    }

    fn scan_flow_scalar_non_spaces(
        &mut self,
        double: bool,
        start: Mark,
        chunks: &mut String,
    ) -> Result<()> {
        loop {
            let mut length = 0;
            while !matches!(self.reader.peek(length), '\'' | '"' | '\\')
                && !is_blank_or_end(self.reader.peek(length))
            {
                length += 1;
            }
            if length > 0 {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
            }
            let ch = self.reader.peek(0);
            if !double && ch == '\'' && self.reader.peek(1) == '\'' {
                chunks.push('\'');
                self.reader.forward(2);
            } else if (double && ch == '\'') || (!double && matches!(ch, '"' | '\\')) {
                chunks.push(ch);
                self.reader.forward(1);
            } else if double && ch == '\\' {
                self.reader.forward(1);
                let ch = self.reader.peek(0);
                if let Some(replacement) = escape_replacement(ch) {
                    chunks.push(replacement);
                    self.reader.forward(1);
                } else if let Some(length) = escape_code_length(ch) {
                    self.reader.forward(1);
                    for k in 0..length {
                        let digit = self.reader.peek(k);
                        if !digit.is_ascii_hexdigit() {
                            return Err(MarkedError::new(
                                Stage::Scanner,
                                format!(
                                    "expected escape sequence of {length} hexadecimal numbers, but found {digit:?}"
                                ),
                            )
                            .with_context("while scanning a double-quoted scalar", Some(start))
                            .at(self.reader.mark()));
                        }
                    }
                    let code = u32::from_str_radix(&self.reader.prefix(length), 16).unwrap_or(0);
                    let Some(decoded) = char::from_u32(code) else {
                        return Err(MarkedError::new(
                            Stage::Scanner,
                            format!("found invalid Unicode character escape code {code:#x}"),
                        )
                        .with_context("while scanning a double-quoted scalar", Some(start))
                        .at(self.reader.mark()));
                    };
                    chunks.push(decoded);
                    self.reader.forward(length);
                } else if is_break(ch) {
                    self.scan_line_break();
                    self.scan_flow_scalar_breaks(start, chunks)?;
                } else {
                    return Err(MarkedError::new(
                        Stage::Scanner,
                        format!("found unknown escape character {ch:?}"),
                    )
                    .with_context("while scanning a double-quoted scalar", Some(start))
                    .at(self.reader.mark()));
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_flow_scalar_spaces(&mut self, start: Mark, chunks: &mut String) -> Result<()> {
        let mut length = 0;
        while matches!(self.reader.peek(length), ' ' | '\t') {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if ch == '\0' {
            return Err(
                MarkedError::new(Stage::Scanner, "found unexpected end of stream")
                    .with_context("while scanning a quoted scalar", Some(start))
                    .at(self.reader.mark()),
            );
        }
        if is_break(ch) {
            let line_break = self.scan_line_break();
            let mut breaks = String::new();
            self.scan_flow_scalar_breaks(start, &mut breaks)?;
            if line_break != "\n" {
                chunks.push_str(&line_break);
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else {
            chunks.push_str(&whitespaces);
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(&mut self, start: Mark, chunks: &mut String) -> Result<()> {
        loop {
            // Instead of checking indentation, we check for document separators.
            if self.reader.column() == 0
                && (self.reader.starts_with("---") || self.reader.starts_with("..."))
                && is_blank_or_end(self.reader.peek(3))
            {
                return Err(
                    MarkedError::new(Stage::Scanner, "found unexpected document separator")
                        .with_context("while scanning a quoted scalar", Some(start))
                        .at(self.reader.mark()),
                );
            }
            while matches!(self.reader.peek(0), ' ' | '\t') {
                self.reader.forward(1);
            }
            if is_break(self.reader.peek(0)) {
                let line_break = self.scan_line_break();
                chunks.push_str(&line_break);
            } else {
                return Ok(());
            }
        }
    }

    fn scan_plain(&mut self) -> Result<Token> {
        let start = self.reader.mark();
        let mut end = start;
        let mut chunks = String::new();
        let indent = self.indent + 1;
        let mut spaces = String::new();
        loop {
            if self.reader.peek(0) == '#' {
                break;
            }
            let mut length = 0;
            loop {
                let ch = self.reader.peek(length);
                if is_blank_or_end(ch) {
                    break;
                }
                if ch == ':' {
                    let next = self.reader.peek(length + 1);
                    if is_blank_or_end(next) || (self.flow_level > 0 && is_flow_indicator(next)) {
                        break;
                    }
                }
                if self.flow_level > 0 && is_flow_indicator(ch) {
                    break;
                }
                length += 1;
            }
            if length == 0 {
                break;
            }
            self.allow_simple_key = false;
            chunks.push_str(&spaces);
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            end = self.reader.mark();
            match self.scan_plain_spaces(indent) {
                Some(more) => spaces = more,
                None => break,
            }
        }
        let scalar = ScalarToken {
            value: chunks,
            style: ScalarStyle::Plain,
            folds: Vec::new(),
            header_comment: None,
        };
        Ok(Token::with_data(
            TokenKind::Scalar,
            TokenData::Scalar(scalar),
            start,
            end,
        ))
    }

    /// Consume the whitespace after a plain scalar chunk if the scalar
    /// continues, returning the folded separator. When the scalar ends,
    /// nothing is consumed so that trailing comments and blank lines are
    /// scanned as their own tokens.
    fn scan_plain_spaces(&mut self, indent: isize) -> Option<String> {
        let mut n = 0;
        while matches!(self.reader.peek(n), ' ' | '\t') {
            n += 1;
        }
        let ch = self.reader.peek(n);
        if ch == '#' || ch == '\0' {
            return None;
        }
        if !is_break(ch) {
            if n == 0 {
                return None;
            }
            let whitespace = self.reader.prefix(n);
            self.reader.forward(n);
            return Some(whitespace);
        }

        // Look past the line break(s) for a continuation line.
        let mut k = n;
        loop {
            if self.reader.peek(k) == '\r' && self.reader.peek(k + 1) == '\n' {
                k += 2;
            } else {
                k += 1;
            }
            let mut column = 0;
            while self.reader.peek(k) == ' ' {
                k += 1;
                column += 1;
            }
            let mut after = k;
            while self.reader.peek(after) == '\t' {
                after += 1;
            }
            let next = self.reader.peek(after);
            if is_break(next) {
                k = after;
                continue;
            }
            if next == '\0' || next == '#' {
                return None;
            }
            if column == 0 {
                let marker: String = (0..3).map(|i| self.reader.peek(k + i)).collect();
                if (marker == "---" || marker == "...") && is_blank_or_end(self.reader.peek(k + 3)) {
                    return None;
                }
            }
            if self.flow_level == 0 && (column as isize) < indent {
                return None;
            }
            break;
        }

        self.reader.forward(n);
        let line_break = self.scan_line_break();
        self.allow_simple_key = true;
        let mut breaks = String::new();
        loop {
            let ch = self.reader.peek(0);
            if matches!(ch, ' ' | '\t') {
                self.reader.forward(1);
            } else if is_break(ch) {
                breaks.push_str(&self.scan_line_break());
            } else {
                break;
            }
        }
        let mut chunk = String::new();
        if line_break != "\n" {
            chunk.push_str(&line_break);
        } else if breaks.is_empty() {
            chunk.push(' ');
        }
        chunk.push_str(&breaks);
        Some(chunk)
    }

    fn skip_inline_space(&mut self) {
        while matches!(self.reader.peek(0), ' ' | '\t') {
            self.reader.forward(1);
        }
    }

    /// Consume one line break. `\r\n`, `\r` and `\x85` become `\n`; the
    /// Unicode line and paragraph separators are kept as they are.
    fn scan_line_break(&mut self) -> String {
        let ch = self.reader.peek(0);
        match ch {
            '\r' | '\n' | '\u{85}' => {
                if ch == '\r' && self.reader.peek(1) == '\n' {
                    self.reader.forward(2);
                } else {
                    self.reader.forward(1);
                }
                "\n".to_string()
            }
            '\u{2028}' | '\u{2029}' => {
                self.reader.forward(1);
                ch.to_string()
            }
            _ => String::new(),
        }
    }
}

impl Iterator for Scanner {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_token().transpose()
    }
}

#[inline]
pub(crate) fn is_break(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[inline]
fn is_break_or_nul(ch: char) -> bool {
    ch == '\0' || is_break(ch)
}

#[inline]
fn is_blank_or_end(ch: char) -> bool {
    matches!(ch, ' ' | '\t') || is_break_or_nul(ch)
}

#[inline]
fn is_flow_indicator(ch: char) -> bool {
    matches!(ch, ',' | '[' | ']' | '{' | '}')
}

#[inline]
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_')
}

#[inline]
fn is_anchor_char(ch: char) -> bool {
    !is_blank_or_end(ch) && !is_flow_indicator(ch) && ch != '\u{FEFF}'
}

#[inline]
fn is_uri_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "-;/?:@&=+$,_.!~*'()[]#".contains(ch)
}

fn escape_replacement(ch: char) -> Option<char> {
    Some(match ch {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0B',
        'f' => '\x0C',
        'r' => '\r',
        'e' => '\x1B',
        ' ' => ' ',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{85}',
        '_' => '\u{A0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

fn escape_code_length(ch: char) -> Option<usize> {
    match ch {
        'x' => Some(2),
        'u' => Some(4),
        'U' => Some(8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn tokens(source: &str) -> Vec<Token> {
        Scanner::from_str(source)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokens(source).into_iter().map(|t| t.kind).collect()
    }

    fn scalars(source: &str) -> Vec<String> {
        tokens(source)
            .into_iter()
            .filter_map(|t| match t.data {
                TokenData::Scalar(s) => Some(s.value),
                _ => None,
            })
            .collect()
    }

    fn comments(source: &str) -> Vec<Comment> {
        tokens(source)
            .into_iter()
            .filter_map(|t| match t.data {
                TokenData::Comment(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    fn error(source: &str) -> MarkedError {
        Scanner::from_str(source)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap_err()
    }

    use TokenKind as K;

    #[test]
    fn test_block_mapping() {
        assert_eq!(
            kinds("a: 1\nb: 2"),
            vec![
                K::StreamStart,
                K::BlockMappingStart,
                K::Key,
                K::Scalar,
                K::Value,
                K::Scalar,
                K::Key,
                K::Scalar,
                K::Value,
                K::Scalar,
                K::BlockEnd,
                K::StreamEnd
            ]
        );
    }

    #[test]
    fn test_block_sequence_in_mapping() {
        assert_eq!(
            kinds("k:\n- a\n- b\n"),
            vec![
                K::StreamStart,
                K::BlockMappingStart,
                K::Key,
                K::Scalar,
                K::Value,
                K::BlockEntry,
                K::Scalar,
                K::BlockEntry,
                K::Scalar,
                K::BlockEnd,
                K::StreamEnd
            ]
        );
    }

    #[test]
    fn test_flow_collections() {
        assert_eq!(
            kinds("[a, {b: c}]"),
            vec![
                K::StreamStart,
                K::FlowSequenceStart,
                K::Scalar,
                K::FlowEntry,
                K::FlowMappingStart,
                K::Key,
                K::Scalar,
                K::Value,
                K::Scalar,
                K::FlowMappingEnd,
                K::FlowSequenceEnd,
                K::StreamEnd
            ]
        );
    }

    #[test]
    fn test_json_like_value() {
        assert_eq!(
            kinds(r#"{"a":1}"#),
            vec![
                K::StreamStart,
                K::FlowMappingStart,
                K::Key,
                K::Scalar,
                K::Value,
                K::Scalar,
                K::FlowMappingEnd,
                K::StreamEnd
            ]
        );
    }

    #[test]
    fn test_plain_scalar_folding() {
        assert_eq!(scalars("a: one\n  two\n\n  three\n"), vec!["a", "one two\nthree"]);
        assert_eq!(scalars("url: http://x.y/z"), vec!["url", "http://x.y/z"]);
    }

    #[test]
    fn test_plain_scalar_stops_at_comment() {
        assert_eq!(scalars("a: b # c"), vec!["a", "b"]);
        assert_eq!(scalars("a: b#c"), vec!["a", "b#c"]);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let found = comments("# head\na: 1  # eol\n\nb: 2\n");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].kind, CommentKind::FullLine);
        assert_eq!(found[0].text, "# head");
        assert_eq!(found[1].kind, CommentKind::Eol);
        assert_eq!(found[1].text, "# eol");
        assert_eq!(found[1].gap, 2);
        assert_eq!(found[1].column, 6);
        assert_eq!(found[2].kind, CommentKind::Blank);
        assert_eq!(found[2].line, 2);
    }

    #[test]
    fn test_comment_before_block_end() {
        assert_eq!(
            kinds("a:\n  b: 1\n# c\nd: 2"),
            vec![
                K::StreamStart,
                K::BlockMappingStart,
                K::Key,
                K::Scalar,
                K::Value,
                K::BlockMappingStart,
                K::Key,
                K::Scalar,
                K::Value,
                K::Scalar,
                K::Comment,
                K::BlockEnd,
                K::Key,
                K::Scalar,
                K::Value,
                K::Scalar,
                K::BlockEnd,
                K::StreamEnd
            ]
        );
    }

    #[test]
    fn test_literal_block_scalar() {
        assert_eq!(
            scalars("desc: |\n  line1\n  line2\n"),
            vec!["desc", "line1\nline2\n"]
        );
        assert_eq!(scalars("a: |-\n  x\n\n"), vec!["a", "x"]);
        assert_eq!(scalars("a: |+\n  x\n\n"), vec!["a", "x\n\n"]);
    }

    #[test]
    fn test_block_scalar_trailing_blank_lines_survive() {
        let found = tokens("a: |\n  x\n\nb: 1\n");
        let blank = found.iter().any(|t| {
            matches!(&t.data, TokenData::Comment(c) if c.kind == CommentKind::Blank && c.line == 2)
        });
        assert!(blank, "blank line after block scalar was lost: {found:?}");
    }

    #[test]
    fn test_block_scalar_header_comment() {
        let found = tokens("a: |  # note\n  text\n");
        let scalar = found
            .iter()
            .find_map(|t| match &t.data {
                TokenData::Scalar(s) if s.style == ScalarStyle::Literal => Some(s.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(scalar.value, "text\n");
        let comment = scalar.header_comment.unwrap();
        assert_eq!(comment.text, "# note");
        assert_eq!(comment.gap, 2);
    }

    #[test]
    fn test_folded_block_scalar_records_folds() {
        let found = tokens("a: >\n  one\n  two\n\n  three\n");
        let scalar = found
            .iter()
            .find_map(|t| match &t.data {
                TokenData::Scalar(s) if s.style == ScalarStyle::Folded => Some(s.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(scalar.value, "one two\nthree\n");
        assert_eq!(scalar.folds, vec![3]);
    }

    #[test]
    fn test_quoted_scalars() {
        assert_eq!(scalars(r#""a\tb\x41\u00e9""#), vec!["a\tbAé"]);
        assert_eq!(scalars("'it''s'"), vec!["it's"]);
        assert_eq!(scalars("\"one\n  two\""), vec!["one two"]);
    }

    #[test]
    fn test_anchor_alias_tag() {
        let found = tokens("- &x !!str a\n- *x\n- !local b\n- !<tag:x> c");
        let mut names = Vec::new();
        for token in found {
            match token.data {
                TokenData::Name(name) => names.push(name),
                TokenData::Tag { handle, suffix } => {
                    names.push(format!("{}{}", handle.unwrap_or_default(), suffix))
                }
                _ => {}
            }
        }
        assert_eq!(names, vec!["x", "!!str", "x", "!local", "tag:x"]);
    }

    #[test]
    fn test_directives() {
        let found = tokens("%YAML 1.1\n%TAG !e! tag:example.com,2000:\n---\na");
        let directives: Vec<_> = found
            .into_iter()
            .filter_map(|t| match t.data {
                TokenData::Directive(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(
            directives,
            vec![
                Directive::Version(Version::V1_1),
                Directive::Tag(TagDirective {
                    handle: "!e!".into(),
                    prefix: "tag:example.com,2000:".into()
                })
            ]
        );
    }

    #[test]
    fn test_document_markers() {
        assert_eq!(
            kinds("---\na\n...\n"),
            vec![K::StreamStart, K::DocumentStart, K::Scalar, K::DocumentEnd, K::StreamEnd]
        );
    }

    #[test]
    fn test_unknown_escape() {
        let err = error(r#""\q""#);
        assert_eq!(err.problem, "found unknown escape character 'q'");
        assert_eq!(err.context.as_deref(), Some("while scanning a double-quoted scalar"));
    }

    #[test]
    fn test_unterminated_quoted_scalar() {
        let err = error("'abc");
        assert_eq!(err.problem, "found unexpected end of stream");
    }

    #[test]
    fn test_tab_indentation() {
        let err = error("a:\n\tb: 1");
        assert_eq!(err.problem, "found character '\\t' that cannot start any token");
        assert_eq!(err.problem_mark.map(|m| (m.line, m.column)), Some((1, 0)));
    }

    #[test]
    fn test_bad_indentation_indicator() {
        let err = error("a: |0\n  x\n");
        assert_eq!(
            err.problem,
            "expected indentation indicator in the range 1-9, but found 0"
        );
    }

    #[test]
    fn test_required_simple_key() {
        let err = error("a:\n  b: 1\n  c\n");
        assert_eq!(err.problem, "could not find expected ':'");
        assert_eq!(err.context.as_deref(), Some("while scanning a simple key"));
    }

    #[test]
    fn test_simple_key_length_limit() {
        let short = format!("{{\"{}\": 1}}", "x".repeat(1000));
        assert!(kinds(&short).contains(&K::Key));

        let long = format!("{{\"{}\": 1}}", "x".repeat(1100));
        assert_eq!(
            kinds(&long),
            vec![
                K::StreamStart,
                K::FlowMappingStart,
                K::Scalar,
                K::Value,
                K::Scalar,
                K::FlowMappingEnd,
                K::StreamEnd
            ]
        );

        let err = error(&format!("a: 1\n{}: 2\n", "x".repeat(1100)));
        assert_eq!(err.problem, "could not find expected ':'");
        assert_eq!(err.context_mark.map(|m| (m.line, m.column)), Some((1, 0)));
    }
}

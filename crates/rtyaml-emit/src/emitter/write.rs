//! Low-level writers: indicators, indentation, scalar bodies and comments.

use rtyaml_scanner::Comment;

use super::Emitter;
use crate::analysis::{is_break, is_printable_unicode};

impl Emitter {
    pub(super) fn write_raw(&mut self, text: &str) {
        self.out.push_str(text);
        self.column += text.chars().count();
    }

    fn write_chars(&mut self, chars: &[char]) {
        self.out.extend(chars);
        self.column += chars.len();
    }

    fn pad_to(&mut self, column: usize) {
        if self.column < column {
            let pad = column - self.column;
            self.write_raw(&" ".repeat(pad));
        }
    }

    pub(super) fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        whitespace: bool,
        indention: bool,
    ) {
        if !self.whitespace && need_whitespace {
            self.write_raw(" ");
        }
        self.write_raw(indicator);
        self.whitespace = whitespace;
        self.indention = self.indention && indention;
        self.open_ended = false;
    }

    pub(super) fn write_indent(&mut self) {
        let indent = self.indent.unwrap_or(0);
        if !self.indention
            || self.column > indent
            || (self.column == indent && !self.whitespace)
        {
            if self.no_newline {
                self.no_newline = false;
            } else {
                self.write_line_break(None);
            }
        }
        if self.column < indent {
            self.whitespace = true;
            self.pad_to(indent);
        }
    }

    /// Write a line break. `None` and `'\n'` use the configured break.
    pub(super) fn write_line_break(&mut self, data: Option<char>) {
        match data {
            None | Some('\n') => self.out.push_str(self.options.line_break.as_str()),
            Some(ch) => self.out.push(ch),
        }
        self.whitespace = true;
        self.indention = true;
        self.line += 1;
        self.column = 0;
    }

    pub(super) fn write_directive(&mut self, text: &str) {
        self.write_raw(text);
        self.write_line_break(None);
    }

    // Comments.

    /// Write `comment` after the text on the current line and end the line.
    pub(super) fn write_eol_comment(&mut self, comment: &Comment) {
        if self.column == 0 {
            self.pad_to(comment.column);
        } else {
            self.write_raw(&" ".repeat(comment.gap.max(1)));
        }
        self.write_raw(&comment.text);
        self.write_line_break(None);
    }

    /// Write comments that sit on their own lines, starting a fresh line
    /// first. An eol entry still trails the current line.
    pub(super) fn write_pre_comments(&mut self, comments: &[Comment]) {
        for comment in comments {
            if comment.is_eol() && self.column != 0 {
                self.write_eol_comment(comment);
                continue;
            }
            if self.column != 0 {
                self.write_line_break(None);
            }
            if comment.is_blank() {
                self.write_line_break(None);
                continue;
            }
            self.pad_to(comment.column);
            self.write_raw(&comment.text);
            self.write_line_break(None);
        }
    }

    // Scalars.

    pub(super) fn write_plain(&mut self, text: &str, split: bool) {
        if text.is_empty() {
            return;
        }
        if !self.whitespace {
            self.write_raw(" ");
        }
        self.whitespace = false;
        self.indention = false;

        let width = self.options.best_width();
        let chars: Vec<char> = text.chars().collect();
        let (mut spaces, mut breaks) = (false, false);
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.column > width && split {
                        self.write_indent();
                        self.whitespace = false;
                        self.indention = false;
                    } else {
                        self.write_chars(&chars[start..end]);
                    }
                    start = end;
                }
            } else if breaks {
                if ch.is_none_or(|c| !is_break(c)) {
                    if chars[start] == '\n' {
                        self.write_line_break(None);
                    }
                    for &br in &chars[start..end] {
                        self.write_line_break(Some(br));
                    }
                    self.write_indent();
                    self.whitespace = false;
                    self.indention = false;
                    start = end;
                }
            } else if ch.is_none_or(|c| c == ' ' || is_break(c)) {
                self.write_chars(&chars[start..end]);
                start = end;
            }
            if let Some(c) = ch {
                spaces = c == ' ';
                breaks = is_break(c);
            }
            end += 1;
        }
    }

    pub(super) fn write_single_quoted(&mut self, text: &str, split: bool) {
        self.write_indicator("'", true, false, false);
        let width = self.options.best_width();
        let chars: Vec<char> = text.chars().collect();
        let (mut spaces, mut breaks) = (false, false);
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.column > width
                        && split
                        && start != 0
                        && end != chars.len()
                    {
                        self.write_indent();
                    } else {
                        self.write_chars(&chars[start..end]);
                    }
                    start = end;
                }
            } else if breaks {
                if ch.is_none_or(|c| !is_break(c)) {
                    if chars[start] == '\n' {
                        self.write_line_break(None);
                    }
                    for &br in &chars[start..end] {
                        self.write_line_break(Some(br));
                    }
                    self.write_indent();
                    start = end;
                }
            } else if ch.is_none_or(|c| c == ' ' || c == '\'' || is_break(c)) && start < end {
                self.write_chars(&chars[start..end]);
                start = end;
            }
            if ch == Some('\'') {
                self.write_raw("''");
                start = end + 1;
            }
            if let Some(c) = ch {
                spaces = c == ' ';
                breaks = is_break(c);
            }
            end += 1;
        }
        self.write_indicator("'", false, false, false);
    }

    pub(super) fn write_double_quoted(&mut self, text: &str, split: bool) {
        self.write_indicator("\"", true, false, false);
        let width = self.options.best_width();
        let allow_unicode = self.options.allow_unicode;
        let chars: Vec<char> = text.chars().collect();
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            let escaped = ch.is_none_or(|c| {
                matches!(c, '"' | '\\' | '\u{85}' | '\u{2028}' | '\u{2029}' | '\u{FEFF}')
                    || !((' '..='~').contains(&c) || (allow_unicode && is_printable_unicode(c)))
            });
            if escaped {
                if start < end {
                    self.write_chars(&chars[start..end]);
                    start = end;
                }
                if let Some(c) = ch {
                    self.write_raw(&escape(c));
                    start = end + 1;
                }
            }
            if 0 < end
                && end + 1 < chars.len()
                && (ch == Some(' ') || start >= end)
                && self.column + end > width + start
                && split
            {
                if start < end {
                    self.write_chars(&chars[start..end]);
                    start = end;
                }
                self.write_raw("\\");
                self.write_indent();
                self.whitespace = false;
                self.indention = false;
                if chars.get(start) == Some(&' ') {
                    self.write_raw("\\");
                }
            }
            end += 1;
        }
        self.write_indicator("\"", false, false, false);
    }

    /// Indentation and chomping indicators for a block scalar header.
    fn block_hints(&self, text: &str) -> String {
        let mut hints = String::new();
        let Some(first) = text.chars().next() else {
            return hints;
        };
        if first == ' ' || is_break(first) {
            hints.push_str(&self.block_indent_hint().to_string());
        }
        let mut tail = text.chars().rev();
        let last = tail.next().unwrap_or(first);
        let chomp = if !is_break(last) {
            Some('-')
        } else if tail.next().is_none_or(is_break) {
            Some('+')
        } else {
            None
        };
        if let Some(chomp) = chomp {
            hints.push(chomp);
        }
        hints
    }

    /// Content indentation relative to the enclosing node.
    fn block_indent_hint(&self) -> usize {
        let indent = self.indent.unwrap_or(0);
        let base = match self.indents.last_indent() {
            Some(parent) if self.indents.last_seq() => {
                parent + self.options.sequence_dash_offset
            }
            Some(parent) => parent,
            None => 0,
        };
        indent.saturating_sub(base).clamp(1, 9)
    }

    /// Write a block scalar header; `eol` trails the indicator.
    fn write_block_header(&mut self, indicator: char, text: &str, eol: Option<&Comment>) {
        let hints = self.block_hints(text);
        self.write_indicator(&format!("{indicator}{hints}"), true, false, false);
        match eol {
            Some(comment) => self.write_eol_comment(comment),
            None => self.write_line_break(None),
        }
    }

    pub(super) fn write_literal(&mut self, text: &str, eol: Option<&Comment>) {
        self.write_block_header('|', text, eol);
        let chars: Vec<char> = text.chars().collect();
        let mut breaks = true;
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if breaks {
                if ch.is_none_or(|c| !is_break(c)) {
                    for &br in &chars[start..end] {
                        self.write_line_break(Some(br));
                    }
                    if ch.is_some() {
                        self.write_indent();
                    }
                    start = end;
                }
            } else if ch.is_none_or(is_break) {
                self.write_chars(&chars[start..end]);
                if ch.is_none() {
                    self.write_line_break(None);
                }
                start = end;
            }
            if let Some(c) = ch {
                breaks = is_break(c);
            }
            end += 1;
        }
    }

    /// Write a folded scalar. Spaces at `folds` (char offsets) that were
    /// line folds in the source are written as line folds again.
    pub(super) fn write_folded(&mut self, text: &str, folds: &[usize], eol: Option<&Comment>) {
        self.write_block_header('>', text, eol);
        let width = self.options.best_width();
        let chars: Vec<char> = text.chars().collect();
        let mut leading_space = true;
        let (mut spaces, mut breaks) = (false, true);
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if breaks {
                if ch.is_none_or(|c| !is_break(c)) {
                    if !leading_space && ch.is_some_and(|c| c != ' ') && chars[start] == '\n' {
                        self.write_line_break(None);
                    }
                    leading_space = ch == Some(' ');
                    for &br in &chars[start..end] {
                        self.write_line_break(Some(br));
                    }
                    if ch.is_some() {
                        self.write_indent();
                    }
                    start = end;
                }
            } else if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.column > width {
                        self.write_indent();
                    } else {
                        self.write_chars(&chars[start..end]);
                    }
                    start = end;
                }
            } else if ch.is_none_or(|c| c == ' ' || is_break(c)) {
                self.write_chars(&chars[start..end]);
                if ch.is_none() {
                    self.write_line_break(None);
                }
                start = end;
                if ch == Some(' ')
                    && folds.contains(&end)
                    && chars.get(end + 1).is_some_and(|c| !c.is_whitespace())
                {
                    self.write_line_break(None);
                    self.write_indent();
                    start = end + 1;
                    end += 1;
                    continue;
                }
            }
            if let Some(c) = ch {
                breaks = is_break(c);
                spaces = c == ' ';
            }
            end += 1;
        }
    }
}

fn escape(ch: char) -> String {
    let short = match ch {
        '\0' => "0",
        '\u{7}' => "a",
        '\u{8}' => "b",
        '\t' => "t",
        '\n' => "n",
        '\u{B}' => "v",
        '\u{C}' => "f",
        '\r' => "r",
        '\u{1B}' => "e",
        '"' => "\"",
        '\\' => "\\",
        '\u{85}' => "N",
        '\u{A0}' => "_",
        '\u{2028}' => "L",
        '\u{2029}' => "P",
        _ => "",
    };
    if !short.is_empty() {
        return format!("\\{short}");
    }
    match ch as u32 {
        code @ 0..=0xFF => format!("\\x{code:02X}"),
        code @ 0x100..=0xFFFF => format!("\\u{code:04X}"),
        code => format!("\\U{code:08X}"),
    }
}

//! Decoded character stream with position tracking.

use crate::{Mark, MarkedError, Stage};

/// Input encodings recognised from a byte order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// A cursor position that can be restored later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderState {
    pointer: usize,
    line: usize,
    column: usize,
}

/// Character source for the scanner.
///
/// The whole input is decoded up front; `peek` past the end yields `'\0'`.
#[derive(Debug, Clone)]
pub struct Reader {
    buffer: Vec<char>,
    pointer: usize,
    line: usize,
    column: usize,
    encoding: Encoding,
}

impl Reader {
    /// Create a reader over already-decoded text.
    pub fn new(text: &str) -> Result<Self, MarkedError> {
        let buffer: Vec<char> = text.chars().collect();
        check_printable(&buffer)?;
        Ok(Self {
            buffer,
            pointer: 0,
            line: 0,
            column: 0,
            encoding: Encoding::Utf8,
        })
    }

    /// Decode raw bytes, detecting UTF-16 from its byte order mark.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MarkedError> {
        let (encoding, text) = decode(bytes)?;
        let mut reader = Reader::new(&text)?;
        reader.encoding = encoding;
        Ok(reader)
    }

    /// The encoding the input was decoded from.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The character `offset` places ahead, or `'\0'` past the end.
    #[inline]
    pub fn peek(&self, offset: usize) -> char {
        self.buffer
            .get(self.pointer + offset)
            .copied()
            .unwrap_or('\0')
    }

    /// Up to `length` characters starting at the cursor.
    pub fn prefix(&self, length: usize) -> String {
        let end = (self.pointer + length).min(self.buffer.len());
        self.buffer[self.pointer.min(end)..end].iter().collect()
    }

    /// Whether the next characters are exactly `text`.
    pub fn starts_with(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.peek(i) == c)
    }

    /// Advance `length` characters, updating line and column.
    pub fn forward(&mut self, length: usize) {
        for _ in 0..length {
            let Some(&ch) = self.buffer.get(self.pointer) else {
                return;
            };
            self.pointer += 1;
            if matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
                || (ch == '\r' && self.peek(0) != '\n')
            {
                self.line += 1;
                self.column = 0;
            } else if ch != '\u{FEFF}' {
                self.column += 1;
            }
        }
    }

    #[inline]
    pub fn mark(&self) -> Mark {
        Mark::new(self.pointer, self.line, self.column)
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.pointer
    }

    pub fn save(&self) -> ReaderState {
        ReaderState {
            pointer: self.pointer,
            line: self.line,
            column: self.column,
        }
    }

    pub fn restore(&mut self, state: ReaderState) {
        self.pointer = state.pointer;
        self.line = state.line;
        self.column = state.column;
    }
}

fn decode(bytes: &[u8]) -> Result<(Encoding, String), MarkedError> {
    let utf16 = |le: bool| -> Result<String, MarkedError> {
        let body = &bytes[2..];
        if body.len() % 2 != 0 {
            return Err(MarkedError::new(
                Stage::Reader,
                "truncated UTF-16 input: odd number of bytes",
            ));
        }
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| {
                if le {
                    u16::from_le_bytes([pair[0], pair[1]])
                } else {
                    u16::from_be_bytes([pair[0], pair[1]])
                }
            })
            .collect();
        String::from_utf16(&units).map_err(|e| {
            MarkedError::new(Stage::Reader, format!("invalid UTF-16 input: {e}"))
        })
    };

    match bytes {
        [0xFF, 0xFE, ..] => Ok((Encoding::Utf16Le, utf16(true)?)),
        [0xFE, 0xFF, ..] => Ok((Encoding::Utf16Be, utf16(false)?)),
        _ => {
            let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
            match std::str::from_utf8(body) {
                Ok(text) => Ok((Encoding::Utf8, text.to_string())),
                Err(e) => {
                    let valid = &body[..e.valid_up_to()];
                    let text = String::from_utf8_lossy(valid);
                    let line = text.matches('\n').count();
                    let column = text.rsplit('\n').next().map_or(0, |l| l.chars().count());
                    Err(MarkedError::new(
                        Stage::Reader,
                        format!("'utf-8' codec can't decode byte 0x{:02x}", body[e.valid_up_to()]),
                    )
                    .with_context("while decoding the input stream", None)
                    .at(Mark::new(text.chars().count(), line, column)))
                }
            }
        }
    }
}

fn is_printable(ch: char) -> bool {
    matches!(ch,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{7E}'
        | '\u{85}'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn check_printable(buffer: &[char]) -> Result<(), MarkedError> {
    let mut line = 0;
    let mut column = 0;
    for (index, &ch) in buffer.iter().enumerate() {
        if !is_printable(ch) {
            return Err(MarkedError::new(
                Stage::Reader,
                format!(
                    "unacceptable character #x{:04x}: special characters are not allowed",
                    ch as u32
                ),
            )
            .at(Mark::new(index, line, column)));
        }
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_forward_tracks_lines() {
        let mut reader = Reader::new("ab\r\ncd\ref").unwrap();
        reader.forward(4);
        assert_eq!(reader.mark(), Mark::new(4, 1, 0));
        reader.forward(3);
        assert_eq!(reader.mark(), Mark::new(7, 2, 0));
        assert_eq!(reader.peek(0), 'e');
        assert_eq!(reader.peek(5), '\0');
    }

    #[test]
    fn test_prefix_and_restore() {
        let mut reader = Reader::new("hello").unwrap();
        let state = reader.save();
        reader.forward(2);
        assert_eq!(reader.prefix(10), "llo");
        assert!(reader.starts_with("ll"));
        reader.restore(state);
        assert_eq!(reader.prefix(2), "he");
    }

    #[test]
    fn test_utf16_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "a: 1".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let reader = Reader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.encoding(), Encoding::Utf16Le);
        assert_eq!(reader.prefix(4), "a: 1");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let reader = Reader::from_bytes(b"\xEF\xBB\xBFkey").unwrap();
        assert_eq!(reader.prefix(3), "key");
    }

    #[test]
    fn test_rejects_control_characters() {
        let err = Reader::new("a\u{1}b").unwrap_err();
        assert_eq!(err.stage, Stage::Reader);
        assert_eq!(err.problem_mark, Some(Mark::new(1, 0, 1)));
    }
}

//! Comments and blank lines captured for round-tripping.

/// Where a comment sat relative to the surrounding tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum CommentKind {
    /// Follows a token on the same line: `key: value  # note`.
    Eol,
    /// Occupies a line by itself.
    FullLine,
    /// An empty line.
    Blank,
}

/// One comment line or one blank line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct Comment {
    pub kind: CommentKind,
    /// Comment text including the leading `#`, without the line break.
    /// Empty for blank lines.
    pub text: String,
    /// Source line, or 0 for comments created by hand.
    pub line: usize,
    /// Column of the `#`.
    pub column: usize,
    /// Spaces between the previous token and the `#` (eol comments only).
    pub gap: usize,
}

impl Comment {
    /// An end-of-line comment. A missing `#` is added.
    pub fn eol(text: impl AsRef<str>) -> Self {
        Self {
            kind: CommentKind::Eol,
            text: hashed(text.as_ref()),
            line: 0,
            column: 0,
            gap: 2,
        }
    }

    /// A comment on its own line at `column`. A missing `#` is added.
    pub fn full_line(text: impl AsRef<str>, column: usize) -> Self {
        Self {
            kind: CommentKind::FullLine,
            text: hashed(text.as_ref()),
            line: 0,
            column,
            gap: 0,
        }
    }

    /// An empty line.
    pub fn blank() -> Self {
        Self {
            kind: CommentKind::Blank,
            text: String::new(),
            line: 0,
            column: 0,
            gap: 0,
        }
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        self.kind == CommentKind::Blank
    }

    #[inline]
    pub fn is_eol(&self) -> bool {
        self.kind == CommentKind::Eol
    }

    /// The text after `#`, trimmed.
    pub fn body(&self) -> &str {
        self.text.strip_prefix('#').unwrap_or(&self.text).trim()
    }
}

fn hashed(text: &str) -> String {
    if text.is_empty() || text.starts_with('#') {
        text.to_string()
    } else {
        format!("# {text}")
    }
}

/// Build a run of full-line comments from multi-line text, one `Comment` per
/// line. Empty lines become blank-line entries.
pub fn comment_lines(text: &str, column: usize) -> Vec<Comment> {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                Comment::blank()
            } else {
                Comment::full_line(line.trim_start(), column)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_hash_added() {
        assert_eq!(Comment::eol("note").text, "# note");
        assert_eq!(Comment::eol("#note").text, "#note");
        assert_eq!(Comment::full_line("x", 4).column, 4);
    }

    #[test]
    fn test_comment_lines() {
        let lines = comment_lines("first\n\n# second", 2);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "# first");
        assert!(lines[1].is_blank());
        assert_eq!(lines[2].text, "# second");
        assert_eq!(lines[2].body(), "second");
    }
}

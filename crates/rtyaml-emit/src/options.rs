//! Layout options for the emitter.

/// Line break written at the end of each line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum LineBreak {
    #[default]
    Lf,
    Cr,
    CrLf,
}

impl LineBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::Cr => "\r",
            LineBreak::CrLf => "\r\n",
        }
    }
}

/// Options for YAML emission.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
pub struct EmitterOptions {
    /// Indentation of block mapping entries (default: 2)
    pub indent: usize,

    /// Indentation of a block sequence item's content, relative to the
    /// enclosing block (default: 2)
    pub sequence_indent: usize,

    /// Spaces in front of the `-` of a block sequence item (default: 0)
    pub sequence_dash_offset: usize,

    /// Preferred line width; plain and quoted scalars are folded at spaces
    /// past it (default: 80)
    pub width: usize,

    /// Line break style (default: `\n`)
    pub line_break: LineBreak,

    /// Write non-ASCII printable characters as they are instead of escaping
    /// them in double quotes (default: true)
    pub allow_unicode: bool,

    /// Canonical output: explicit tags, flow collections, double-quoted
    /// scalars (default: false)
    pub canonical: bool,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            sequence_indent: 2,
            sequence_dash_offset: 0,
            width: 80,
            line_break: LineBreak::Lf,
            allow_unicode: true,
            canonical: false,
        }
    }
}

impl EmitterOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mapping indent.
    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set the sequence indent and the dash offset inside it.
    pub fn sequence_indent(mut self, indent: usize, dash_offset: usize) -> Self {
        self.sequence_indent = indent;
        self.sequence_dash_offset = dash_offset;
        self
    }

    /// Set the preferred line width.
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn line_break(mut self, line_break: LineBreak) -> Self {
        self.line_break = line_break;
        self
    }

    pub fn allow_unicode(mut self, allow: bool) -> Self {
        self.allow_unicode = allow;
        self
    }

    pub fn canonical(mut self, canonical: bool) -> Self {
        self.canonical = canonical;
        self
    }

    /// Mapping indent actually used: values outside 2..=9 fall back to 2.
    pub(crate) fn best_indent(&self) -> usize {
        if (2..10).contains(&self.indent) {
            self.indent
        } else {
            2
        }
    }

    pub(crate) fn best_sequence_indent(&self) -> usize {
        if (2..10).contains(&self.sequence_indent) {
            self.sequence_indent
        } else {
            self.best_indent()
        }
    }

    /// Width actually used: too narrow a width falls back to 80.
    pub(crate) fn best_width(&self) -> usize {
        if self.width > self.best_indent() * 2 {
            self.width
        } else {
            80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_builder() {
        let options = EmitterOptions::new()
            .indent(4)
            .sequence_indent(4, 2)
            .width(120)
            .line_break(LineBreak::CrLf);
        assert_eq!(options.best_indent(), 4);
        assert_eq!(options.best_sequence_indent(), 4);
        assert_eq!(options.sequence_dash_offset, 2);
        assert_eq!(options.best_width(), 120);
        assert_eq!(options.line_break.as_str(), "\r\n");
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let options = EmitterOptions::new().indent(1).sequence_indent(12, 0).width(3);
        assert_eq!(options.best_indent(), 2);
        assert_eq!(options.best_sequence_indent(), 2);
        assert_eq!(options.best_width(), 80);
    }
}

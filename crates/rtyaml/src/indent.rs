//! Indentation guessing.

use rtyaml_emit::EmitterOptions;

/// Block indentation found in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndentGuess {
    /// Indent of nested mapping entries.
    pub mapping: Option<usize>,
    /// Offset of a sequence item's content from its parent key.
    pub sequence: Option<usize>,
    /// Spaces in front of `-`, relative to the parent key.
    pub dash_offset: Option<usize>,
}

impl IndentGuess {
    /// `options` with every indent that was found.
    pub fn apply(&self, mut options: EmitterOptions) -> EmitterOptions {
        if let Some(mapping) = self.mapping {
            options.indent = mapping;
        }
        if let Some(sequence) = self.sequence {
            options.sequence_indent = sequence;
        }
        if let Some(offset) = self.dash_offset {
            options.sequence_dash_offset = offset;
        }
        options
    }
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Guess the block layout of `text` from its first nested mapping and its
/// first block sequence item. A sequence found without a mapping takes the
/// mapping indent as its own.
pub fn guess_indent(text: &str) -> IndentGuess {
    let mut guess = IndentGuess::default();
    let mut prev_key_only: Option<usize> = None;
    let mut key_indent = 0;

    for line in text.lines() {
        let rline = line.trim_end();
        let lline = rline.trim_start();

        if lline.starts_with("- ") {
            let spaces = leading_spaces(rline);
            let offset = spaces.saturating_sub(key_indent);
            guess.dash_offset = Some(offset);
            let content = spaces + 1 + leading_spaces(&rline[spaces + 1..]);
            if rline[content..].starts_with('#') {
                continue;
            }
            guess.sequence = Some(content.saturating_sub(key_indent));
            break;
        }

        if guess.mapping.is_none()
            && let Some(prev) = prev_key_only
            && !rline.is_empty()
        {
            let idx = rline.len() - rline.trim_start_matches([' ', '-']).len();
            if idx > prev {
                guess.mapping = Some(idx - prev);
            }
        }

        if rline.ends_with(':') {
            key_indent = leading_spaces(rline);
            prev_key_only = Some(key_indent);
            continue;
        }
        prev_key_only = None;
    }

    if guess.sequence.is_none() {
        guess.sequence = guess.mapping;
    }
    guess
}

//! Errors and warnings shared by every stage of the load path.

use std::fmt;

use crate::Mark;

/// The pipeline stage that raised a [`MarkedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Decoding the byte stream.
    Reader,
    /// Turning characters into tokens.
    Scanner,
    /// Turning tokens into events.
    Parser,
    /// Building the node graph.
    Composer,
    /// Building host values.
    Constructor,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reader => "reader",
            Stage::Scanner => "scanner",
            Stage::Parser => "parser",
            Stage::Composer => "composer",
            Stage::Constructor => "constructor",
        };
        f.write_str(name)
    }
}

/// A load error carrying two source positions.
///
/// `context_mark` points at where the construct being processed began, and
/// `problem_mark` at where the problem was detected. Either may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedError {
    pub stage: Stage,
    pub context: Option<String>,
    pub context_mark: Option<Mark>,
    pub problem: String,
    pub problem_mark: Option<Mark>,
    pub note: Option<String>,
}

impl MarkedError {
    /// Create an error with only a problem description.
    pub fn new(stage: Stage, problem: impl Into<String>) -> Self {
        Self {
            stage,
            context: None,
            context_mark: None,
            problem: problem.into(),
            problem_mark: None,
            note: None,
        }
    }

    /// Attach the context in which the problem occurred.
    pub fn with_context(mut self, context: impl Into<String>, mark: Option<Mark>) -> Self {
        self.context = Some(context.into());
        self.context_mark = mark;
        self
    }

    /// Attach the position of the problem itself.
    pub fn at(mut self, mark: Mark) -> Self {
        self.problem_mark = Some(mark);
        self
    }

    /// Attach a trailing note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The line of the problem, if known (zero-based).
    pub fn line(&self) -> Option<usize> {
        self.problem_mark.or(self.context_mark).map(|m| m.line)
    }
}

impl fmt::Display for MarkedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::with_capacity(5);
        if let Some(context) = &self.context {
            lines.push(context.clone());
        }
        if let Some(mark) = self.context_mark
            && self.problem_mark != Some(mark)
        {
            lines.push(format!("  at {mark}"));
        }
        lines.push(self.problem.clone());
        if let Some(mark) = self.problem_mark {
            lines.push(format!("  at {mark}"));
        }
        if let Some(note) = &self.note {
            lines.push(note.clone());
        }
        f.write_str(&lines.join("\n"))
    }
}

impl std::error::Error for MarkedError {}

/// The kind of a non-fatal condition found while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// An anchor name was defined twice in one document; the later one wins.
    DuplicateAnchor,
    /// A mapping contained the same key twice; the later value wins.
    DuplicateKey,
    /// A YAML 1.1 float had an exponent but no `.` in its mantissa.
    MantissaWithoutDot,
}

/// A non-fatal condition, reported through `tracing` and collected for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub mark: Option<Mark>,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>, mark: Option<Mark>) -> Self {
        Self {
            kind,
            message: message.into(),
            mark,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(mark) = self.mark {
            write!(f, " (at {mark})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_display_with_both_marks() {
        let err = MarkedError::new(Stage::Scanner, "could not find expected ':'")
            .with_context("while scanning a simple key", Some(Mark::new(0, 0, 0)))
            .at(Mark::new(6, 1, 0));
        assert_eq!(
            err.to_string(),
            "while scanning a simple key\n  at line 1, column 1\ncould not find expected ':'\n  at line 2, column 1"
        );
    }

    #[test]
    fn test_display_same_mark_printed_once() {
        let mark = Mark::new(3, 0, 3);
        let err = MarkedError::new(Stage::Parser, "expected <block end>")
            .with_context("while parsing a block mapping", Some(mark))
            .at(mark);
        assert_eq!(
            err.to_string(),
            "while parsing a block mapping\nexpected <block end>\n  at line 1, column 4"
        );
    }

    #[test]
    fn test_display_problem_only() {
        let err = MarkedError::new(Stage::Constructor, "found unhashable key");
        assert_eq!(err.to_string(), "found unhashable key");
        assert_eq!(err.line(), None);
    }
}

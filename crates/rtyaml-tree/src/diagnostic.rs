//! Diagnostic rendering for load errors and warnings.

use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};
use rtyaml_scanner::{Mark, MarkedError, Warning, WarningKind};

/// Something that can be shown as an annotated source excerpt.
pub trait Diagnostic: std::fmt::Display {
    /// Render with ariadne. Falls back to the plain `Display` text if the
    /// report is not valid UTF-8.
    fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the report to a writer.
    fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W);
}

/// A one-character range at `mark`, clamped to the source.
fn range_at(mark: Mark, source: &str) -> Range<usize> {
    let len = source.chars().count();
    let start = mark.index.min(len.saturating_sub(1));
    start..(start + 1).min(len)
}

impl Diagnostic for MarkedError {
    fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let anchor = self.problem_mark.or(self.context_mark).unwrap_or_default();
        let range = range_at(anchor, source);

        let mut report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_message(format!("{} error: {}", self.stage, self.problem));

        if let Some(context) = &self.context {
            match self.context_mark {
                Some(mark) if Some(mark) != self.problem_mark => {
                    report = report.with_label(
                        Label::new((filename, range_at(mark, source)))
                            .with_message(context)
                            .with_color(Color::Blue),
                    );
                }
                _ => {
                    report = report.with_note(context);
                }
            }
        }
        if self.problem_mark.is_some() {
            report = report.with_label(
                Label::new((filename, range))
                    .with_message(&self.problem)
                    .with_color(Color::Red),
            );
        }
        if let Some(note) = &self.note {
            report = report.with_help(note);
        }

        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }
}

impl Diagnostic for Warning {
    fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let range = range_at(self.mark.unwrap_or_default(), source);
        let label = match self.kind {
            WarningKind::DuplicateAnchor => "anchor redefined here",
            WarningKind::DuplicateKey => "key repeated here",
            WarningKind::MantissaWithoutDot => "exponent without a dot in the mantissa",
        };
        let mut report = Report::build(ReportKind::Warning, (filename, range.clone()))
            .with_message(&self.message)
            .with_label(
                Label::new((filename, range))
                    .with_message(label)
                    .with_color(Color::Yellow),
            );
        if self.kind == WarningKind::MantissaWithoutDot {
            report = report.with_help("YAML 1.1 floats need a '.', as in 1.0e+3");
        }
        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Composer;
    use facet_testhelpers::test;

    fn stripped(rendered: String) -> String {
        String::from_utf8(strip_ansi_escapes::strip(&rendered)).unwrap()
    }

    fn load_error(source: &str) -> MarkedError {
        let mut composer = match Composer::from_str(source) {
            Ok(composer) => composer,
            Err(err) => return err,
        };
        loop {
            match composer.get_node() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected an error for {source:?}"),
                Err(err) => return err,
            }
        }
    }

    #[test]
    fn test_unclosed_flow_sequence_report() {
        let source = "a: [1, 2\n";
        let report = stripped(load_error(source).render("test.yaml", source));
        assert!(report.contains("test.yaml"), "{report}");
        assert!(report.contains("parser error"), "{report}");
        assert!(report.contains("while parsing a flow sequence"), "{report}");
        assert!(report.contains("a: [1, 2"), "{report}");
    }

    #[test]
    fn test_undefined_alias_report() {
        let source = "a: *nope\n";
        let report = stripped(load_error(source).render("test.yaml", source));
        assert!(
            report.contains("composer error: found undefined alias \"nope\""),
            "{report}"
        );
    }

    #[test]
    fn test_error_at_end_of_input() {
        let source = "'open";
        let report = stripped(load_error(source).render("test.yaml", source));
        assert!(report.contains("scanner error"), "{report}");
    }

    #[test]
    fn test_duplicate_anchor_warning_report() {
        let source = "a: &x 1\nb: &x 2\n";
        let mut composer = Composer::from_str(source).unwrap();
        composer.get_single_node().unwrap();
        let warnings = composer.take_warnings();
        assert_eq!(warnings.len(), 1);
        let report = stripped(warnings[0].render("test.yaml", source));
        assert!(report.contains("Warning"), "{report}");
        assert!(report.contains("anchor redefined here"), "{report}");
    }

    #[test]
    fn test_range_clamped() {
        assert_eq!(range_at(Mark::new(10, 0, 10), "abc"), 2..3);
        assert_eq!(range_at(Mark::new(0, 0, 0), ""), 0..0);
        assert_eq!(range_at(Mark::new(1, 0, 1), "abc"), 1..2);
    }
}

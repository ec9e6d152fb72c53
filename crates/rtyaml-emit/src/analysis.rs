//! Which scalar styles can carry a given text.

use rtyaml_scanner::Version;

/// Result of a single forward scan over a scalar's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarAnalysis {
    pub empty: bool,
    pub multiline: bool,
    /// Contains characters that only double quotes can escape.
    pub special_characters: bool,
    pub allow_flow_plain: bool,
    pub allow_block_plain: bool,
    pub allow_single_quoted: bool,
    pub allow_double_quoted: bool,
    pub allow_block: bool,
}

#[inline]
pub(crate) fn is_break(ch: char) -> bool {
    matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[inline]
pub(crate) fn is_blank_or_break(ch: char) -> bool {
    matches!(ch, '\0' | ' ' | '\t' | '\r') || is_break(ch)
}

/// Printable outside ASCII, as far as the emitter is concerned.
#[inline]
pub(crate) fn is_printable_unicode(ch: char) -> bool {
    ch != '\u{FEFF}'
        && (ch == '\u{85}'
            || ('\u{A0}'..='\u{D7FF}').contains(&ch)
            || ('\u{E000}'..='\u{FFFD}').contains(&ch)
            || ('\u{10000}'..='\u{10FFFF}').contains(&ch))
}

/// Classify `scalar` for style selection.
///
/// `version` matters for `?`, which YAML 1.1 treats as a flow indicator
/// anywhere in a plain scalar.
pub fn analyze_scalar(scalar: &str, version: Version, allow_unicode: bool) -> ScalarAnalysis {
    if scalar.is_empty() {
        return ScalarAnalysis {
            empty: true,
            multiline: false,
            special_characters: false,
            allow_flow_plain: false,
            allow_block_plain: true,
            allow_single_quoted: true,
            allow_double_quoted: true,
            allow_block: false,
        };
    }

    let chars: Vec<char> = scalar.chars().collect();
    let v1_1 = version == Version::V1_1;

    let mut block_indicators = false;
    let mut flow_indicators = false;
    let mut line_breaks = false;
    let mut special_characters = false;

    let mut leading_space = false;
    let mut leading_break = false;
    let mut trailing_space = false;
    let mut trailing_break = false;
    let mut break_space = false;
    let mut space_break = false;

    if scalar.starts_with("---") || scalar.starts_with("...") {
        block_indicators = true;
        flow_indicators = true;
    }

    let mut preceded_by_whitespace = true;
    let mut followed_by_whitespace = chars.len() == 1 || is_blank_or_break(chars[1]);
    let mut previous_space = false;
    let mut previous_break = false;

    for (index, &ch) in chars.iter().enumerate() {
        if index == 0 {
            if "#,[]{}&*!|>'\"%@`".contains(ch) {
                flow_indicators = true;
                block_indicators = true;
            }
            if ch == '?' || ch == ':' {
                if v1_1 || chars.len() == 1 {
                    flow_indicators = true;
                }
                if followed_by_whitespace {
                    block_indicators = true;
                }
            }
            if ch == '-' && followed_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
        } else {
            if ",[]{}".contains(ch) {
                flow_indicators = true;
            }
            if ch == '?' && v1_1 {
                flow_indicators = true;
            }
            if ch == ':' && followed_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
            if ch == '#' && preceded_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
        }

        if is_break(ch) {
            line_breaks = true;
        }
        if !(ch == '\n' || (' '..='~').contains(&ch)) {
            if is_printable_unicode(ch) {
                if !allow_unicode {
                    special_characters = true;
                }
            } else {
                special_characters = true;
            }
        }

        if ch == ' ' {
            if index == 0 {
                leading_space = true;
            }
            if index == chars.len() - 1 {
                trailing_space = true;
            }
            if previous_break {
                break_space = true;
            }
            previous_space = true;
            previous_break = false;
        } else if is_break(ch) {
            if index == 0 {
                leading_break = true;
            }
            if index == chars.len() - 1 {
                trailing_break = true;
            }
            if previous_space {
                space_break = true;
            }
            previous_space = false;
            previous_break = true;
        } else {
            previous_space = false;
            previous_break = false;
        }

        preceded_by_whitespace = is_blank_or_break(ch);
        followed_by_whitespace = chars.get(index + 2).is_none_or(|&next| is_blank_or_break(next));
    }

    let mut allow_flow_plain = true;
    let mut allow_block_plain = true;
    let mut allow_single_quoted = true;
    let allow_double_quoted = true;
    let mut allow_block = true;

    if leading_space || leading_break || trailing_space || trailing_break {
        allow_flow_plain = false;
        allow_block_plain = false;
    }
    if trailing_space {
        allow_block = false;
    }
    if break_space {
        allow_flow_plain = false;
        allow_block_plain = false;
        allow_single_quoted = false;
    }
    if special_characters {
        allow_flow_plain = false;
        allow_block_plain = false;
        allow_single_quoted = false;
        allow_block = false;
    } else if space_break {
        allow_flow_plain = false;
        allow_block_plain = false;
        allow_single_quoted = false;
        allow_block = false;
    }
    // Plain scalars are never written across lines.
    if line_breaks {
        allow_flow_plain = false;
        allow_block_plain = false;
    }
    if flow_indicators {
        allow_flow_plain = false;
    }
    if block_indicators {
        allow_block_plain = false;
    }

    ScalarAnalysis {
        empty: false,
        multiline: line_breaks,
        special_characters,
        allow_flow_plain,
        allow_block_plain,
        allow_single_quoted,
        allow_double_quoted,
        allow_block,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn analyze(text: &str) -> ScalarAnalysis {
        analyze_scalar(text, Version::V1_2, true)
    }

    #[test]
    fn test_empty() {
        let analysis = analyze("");
        assert!(analysis.empty);
        assert!(!analysis.allow_flow_plain);
        assert!(analysis.allow_block_plain);
    }

    #[test]
    fn test_simple_word_is_plain_everywhere() {
        let analysis = analyze("hello world");
        assert!(analysis.allow_flow_plain);
        assert!(analysis.allow_block_plain);
        assert!(!analysis.multiline);
    }

    #[test]
    fn test_indicators() {
        assert!(!analyze("- item").allow_block_plain);
        assert!(analyze("-item").allow_block_plain);
        assert!(!analyze("a: b").allow_block_plain);
        assert!(analyze("a:b").allow_block_plain);
        assert!(!analyze("a #b").allow_block_plain);
        assert!(analyze("a#b").allow_block_plain);
        assert!(!analyze("*star").allow_block_plain);
        assert!(!analyze("---").allow_block_plain);

        let comma = analyze("a,b");
        assert!(comma.allow_block_plain);
        assert!(!comma.allow_flow_plain);
    }

    #[test]
    fn test_question_mark_depends_on_version() {
        assert!(analyze("what?").allow_flow_plain);
        assert!(!analyze_scalar("what?", Version::V1_1, true).allow_flow_plain);
    }

    #[test]
    fn test_whitespace_at_the_edges() {
        assert!(!analyze(" lead").allow_block_plain);
        assert!(!analyze("trail ").allow_block_plain);
        assert!(!analyze("trail ").allow_block);
        assert!(analyze(" lead").allow_single_quoted);
    }

    #[test]
    fn test_line_breaks() {
        let analysis = analyze("one\ntwo\n");
        assert!(analysis.multiline);
        assert!(!analysis.allow_block_plain);
        assert!(analysis.allow_block);
        assert!(analysis.allow_single_quoted);

        let spaced = analyze("one \ntwo");
        assert!(!spaced.allow_single_quoted);
        assert!(!spaced.allow_block);
    }

    #[test]
    fn test_special_characters() {
        let bell = analyze("ding\u{7}");
        assert!(bell.special_characters);
        assert!(!bell.allow_single_quoted);
        assert!(bell.allow_double_quoted);

        assert!(analyze("caf\u{e9}").allow_block_plain);
        assert!(analyze_scalar("caf\u{e9}", Version::V1_2, false).special_characters);
    }
}

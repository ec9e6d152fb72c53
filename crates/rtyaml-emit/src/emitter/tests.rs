use super::*;
use facet_testhelpers::test;

use rtyaml_parse::CommentBundle;
use rtyaml_scanner::{Comment, TagDirective};

use crate::LineBreak;

fn scalar(value: &str) -> Event {
    Event::synthetic(EventData::Scalar {
        anchor: None,
        tag: None,
        implicit: (true, true),
        value: value.to_string(),
        style: None,
        folds: Vec::new(),
    })
}

fn styled(value: &str, style: ScalarStyle) -> Event {
    let mut event = scalar(value);
    if let EventData::Scalar { style: slot, .. } = &mut event.data {
        *slot = Some(style);
    }
    event
}

fn tagged(value: &str, tag: &str, implicit: (bool, bool)) -> Event {
    Event::synthetic(EventData::Scalar {
        anchor: None,
        tag: Some(tag.to_string()),
        implicit,
        value: value.to_string(),
        style: None,
        folds: Vec::new(),
    })
}

fn mapping(flow_style: bool) -> Event {
    Event::synthetic(EventData::MappingStart {
        anchor: None,
        tag: None,
        implicit: true,
        flow_style,
    })
}

fn sequence(flow_style: bool) -> Event {
    Event::synthetic(EventData::SequenceStart {
        anchor: None,
        tag: None,
        implicit: true,
        flow_style,
    })
}

fn end_mapping() -> Event {
    Event::synthetic(EventData::MappingEnd)
}

fn end_sequence() -> Event {
    Event::synthetic(EventData::SequenceEnd)
}

fn document_start() -> Event {
    Event::synthetic(EventData::DocumentStart {
        explicit: false,
        version: None,
        tags: Vec::new(),
    })
}

fn document_end() -> Event {
    Event::synthetic(EventData::DocumentEnd { explicit: false })
}

fn pre(comments: Vec<Comment>) -> CommentBundle {
    CommentBundle::new(comments, None)
}

fn eol(text: &str) -> CommentBundle {
    CommentBundle::new(Vec::new(), Some(Comment::eol(text)))
}

fn emit_raw(options: EmitterOptions, events: Vec<Event>) -> Result<String> {
    let mut emitter = Emitter::with_options(options);
    for event in events {
        emitter.emit(event)?;
    }
    Ok(emitter.finish())
}

/// Emit `body` as the only document of a stream.
fn emit_with(options: EmitterOptions, body: Vec<Event>) -> String {
    let mut events = vec![Event::synthetic(EventData::StreamStart), document_start()];
    events.extend(body);
    events.push(document_end());
    events.push(Event::synthetic(EventData::StreamEnd));
    emit_raw(options, events).unwrap()
}

fn emit(body: Vec<Event>) -> String {
    emit_with(EmitterOptions::default(), body)
}

#[test]
fn test_eol_comment_after_value() {
    let out = emit(vec![
        mapping(false),
        scalar("key"),
        scalar("value2").with_comment(eol("comment")),
        end_mapping(),
    ]);
    assert_eq!(out, "key: value2  # comment\n");
}

#[test]
fn test_eol_comment_gap_is_kept() {
    let mut comment = Comment::eol("wide");
    comment.gap = 5;
    let out = emit(vec![
        mapping(false),
        scalar("a"),
        scalar("1").with_comment(CommentBundle::new(Vec::new(), Some(comment))),
        end_mapping(),
    ]);
    assert_eq!(out, "a: 1     # wide\n");
}

#[test]
fn test_literal_block() {
    let out = emit(vec![
        mapping(false),
        scalar("desc"),
        styled("line1\nline2\n", ScalarStyle::Literal),
        end_mapping(),
    ]);
    insta::assert_snapshot!(out, @r"
desc: |
  line1
  line2
");
}

#[test]
fn test_literal_chomping() {
    let out = emit(vec![
        mapping(false),
        scalar("strip"),
        styled("x", ScalarStyle::Literal),
        scalar("keep"),
        styled("y\n\n", ScalarStyle::Literal),
        end_mapping(),
    ]);
    assert_eq!(out, "strip: |-\n  x\nkeep: |+\n  y\n\n");
}

#[test]
fn test_literal_indentation_indicator() {
    let out = emit(vec![
        mapping(false),
        scalar("a"),
        styled(" indented\n", ScalarStyle::Literal),
        end_mapping(),
    ]);
    assert_eq!(out, "a: |2\n   indented\n");
}

#[test]
fn test_literal_header_comment() {
    let out = emit(vec![
        mapping(false),
        scalar("a"),
        styled("x\n", ScalarStyle::Literal).with_comment(eol("note")),
        end_mapping(),
    ]);
    assert_eq!(out, "a: |  # note\n  x\n");
}

#[test]
fn test_folded_keeps_source_folds() {
    let mut value = styled("one two\nthree\n", ScalarStyle::Folded);
    if let EventData::Scalar { folds, .. } = &mut value.data {
        folds.push(3);
    }
    let out = emit(vec![mapping(false), scalar("a"), value, end_mapping()]);
    assert_eq!(out, "a: >\n  one\n  two\n\n  three\n");
}

#[test]
fn test_block_sequence_in_mapping() {
    let out = emit(vec![
        mapping(false),
        scalar("items"),
        sequence(false),
        scalar("a"),
        scalar("b"),
        end_sequence(),
        end_mapping(),
    ]);
    insta::assert_snapshot!(out, @r"
items:
- a
- b
");
}

#[test]
fn test_sequence_indent_and_dash_offset() {
    let options = EmitterOptions::new().indent(2).sequence_indent(4, 2);
    let out = emit_with(
        options,
        vec![
            mapping(false),
            scalar("items"),
            sequence(false),
            scalar("a"),
            scalar("b"),
            end_sequence(),
            end_mapping(),
        ],
    );
    assert_eq!(out, "items:\n  - a\n  - b\n");
}

#[test]
fn test_nested_mappings() {
    let out = emit(vec![
        sequence(false),
        mapping(false),
        scalar("a"),
        scalar("1"),
        scalar("b"),
        mapping(false),
        scalar("c"),
        scalar("2"),
        end_mapping(),
        end_mapping(),
        end_sequence(),
    ]);
    insta::assert_snapshot!(out, @r"
- a: 1
  b:
    c: 2
");
}

#[test]
fn test_flow_collections() {
    let out = emit(vec![
        mapping(false),
        scalar("a"),
        sequence(true),
        scalar("x"),
        scalar("y"),
        end_sequence(),
        scalar("b"),
        mapping(true),
        scalar("c"),
        scalar("1"),
        end_mapping(),
        scalar("e"),
        mapping(false),
        end_mapping(),
        end_mapping(),
    ]);
    assert_eq!(out, "a: [x, y]\nb: {c: 1}\ne: {}\n");
}

#[test]
fn test_root_flow_sequence() {
    let out = emit(vec![sequence(true), scalar("a"), scalar("b"), end_sequence()]);
    assert_eq!(out, "[a, b]\n");
}

#[test]
fn test_quoting_follows_analysis() {
    let out = emit(vec![
        mapping(false),
        scalar("a"),
        scalar(""),
        scalar("b"),
        scalar("- x"),
        scalar("c"),
        scalar("it's: here"),
        scalar("d"),
        scalar("line\nbreak"),
        end_mapping(),
    ]);
    assert_eq!(out, "a:\nb: '- x'\nc: \"it's: here\"\nd: \"line\\nbreak\"\n");
}

#[test]
fn test_requested_styles() {
    let out = emit(vec![
        sequence(false),
        styled("plain", ScalarStyle::SingleQuoted),
        styled("tab\there", ScalarStyle::DoubleQuoted),
        styled("o'k", ScalarStyle::SingleQuoted),
        end_sequence(),
    ]);
    assert_eq!(out, "- 'plain'\n- \"tab\\there\"\n- 'o''k'\n");
}

#[test]
fn test_escapes_without_unicode() {
    let options = EmitterOptions::new().allow_unicode(false);
    let out = emit_with(
        options,
        vec![mapping(false), scalar("k"), scalar("café"), end_mapping()],
    );
    assert_eq!(out, "k: \"caf\\xE9\"\n");
}

#[test]
fn test_unicode_written_as_is() {
    let out = emit(vec![mapping(false), scalar("k"), scalar("café"), end_mapping()]);
    assert_eq!(out, "k: café\n");
}

#[test]
fn test_pre_comments_and_blank_lines() {
    let out = emit(vec![
        mapping(false),
        scalar("a"),
        scalar("1"),
        scalar("b").with_comment(pre(vec![
            Comment::blank(),
            Comment::full_line("# about b", 0),
        ])),
        scalar("2"),
        end_mapping().with_comment(pre(vec![Comment::full_line("# end", 0)])),
    ]);
    insta::assert_snapshot!(out, @r"
a: 1

# about b
b: 2
# end
");
}

#[test]
fn test_comment_column_kept() {
    let out = emit(vec![
        mapping(false),
        scalar("outer"),
        mapping(false),
        scalar("a"),
        scalar("1"),
        scalar("b").with_comment(pre(vec![Comment::full_line("# inner", 2)])),
        scalar("2"),
        end_mapping(),
        end_mapping(),
    ]);
    assert_eq!(out, "outer:\n  a: 1\n  # inner\n  b: 2\n");
}

#[test]
fn test_collection_eol_comment() {
    let out = emit(vec![
        mapping(false),
        scalar("outer"),
        mapping(false).with_comment(eol("opening")),
        scalar("a"),
        scalar("1"),
        end_mapping(),
        end_mapping(),
    ]);
    assert_eq!(out, "outer:  # opening\n  a: 1\n");
}

#[test]
fn test_indentless_sequence_after_eol_comment() {
    let out = emit(vec![
        mapping(false),
        scalar("items"),
        sequence(false).with_comment(eol("list")),
        scalar("a"),
        end_sequence(),
        end_mapping(),
    ]);
    assert_eq!(out, "items:  # list\n- a\n");
}

#[test]
fn test_anchor_alias_and_tag() {
    let mut anchored = scalar("v");
    if let EventData::Scalar { anchor, .. } = &mut anchored.data {
        *anchor = Some("x".to_string());
    }
    let out = emit(vec![
        sequence(false),
        anchored,
        Event::synthetic(EventData::Alias {
            anchor: "x".to_string(),
        }),
        tagged("w", "!t", (false, false)),
        end_sequence(),
    ]);
    assert_eq!(out, "- &x v\n- *x\n- !t w\n");
}

#[test]
fn test_alias_key_gets_space() {
    let out = emit(vec![
        mapping(false),
        Event::synthetic(EventData::Alias {
            anchor: "k".to_string(),
        }),
        scalar("1"),
        end_mapping(),
    ]);
    assert_eq!(out, "*k : 1\n");
}

#[test]
fn test_empty_sequence_item() {
    let out = emit(vec![
        sequence(false),
        scalar("a"),
        tagged("", tag::NULL, (true, false)),
        scalar("c"),
        end_sequence(),
    ]);
    assert_eq!(out, "- a\n-\n- c\n");
}

#[test]
fn test_empty_null_key_written_as_null() {
    let out = emit(vec![
        mapping(false),
        tagged("", tag::NULL, (true, false)),
        scalar("1"),
        end_mapping(),
    ]);
    assert_eq!(out, "null: 1\n");
}

#[test]
fn test_documents_and_directives() {
    let events = vec![
        Event::synthetic(EventData::StreamStart),
        document_start(),
        scalar("a"),
        document_end(),
        Event::synthetic(EventData::DocumentStart {
            explicit: true,
            version: Some(Version::V1_1),
            tags: Vec::new(),
        }),
        scalar("b"),
        document_end(),
        document_start(),
        scalar("c"),
        document_end(),
        Event::synthetic(EventData::StreamEnd),
    ];
    let out = emit_raw(EmitterOptions::default(), events).unwrap();
    assert_eq!(out, "a\n...\n%YAML 1.1\n--- b\n--- c\n");
}

#[test]
fn test_tag_directive_shortens_tags() {
    let events = vec![
        Event::synthetic(EventData::StreamStart),
        Event::synthetic(EventData::DocumentStart {
            explicit: true,
            version: None,
            tags: vec![TagDirective {
                handle: "!e!".to_string(),
                prefix: "tag:example.com,2000:".to_string(),
            }],
        }),
        tagged("x", "tag:example.com,2000:thing", (false, false)),
        document_end(),
        Event::synthetic(EventData::StreamEnd),
    ];
    let out = emit_raw(EmitterOptions::default(), events).unwrap();
    assert_eq!(out, "%TAG !e! tag:example.com,2000:\n--- !e!thing x\n");
}

#[test]
fn test_document_comments() {
    let events = vec![
        Event::synthetic(EventData::StreamStart),
        Event::synthetic(EventData::DocumentStart {
            explicit: true,
            version: None,
            tags: Vec::new(),
        })
        .with_comment(pre(vec![Comment::full_line("# head", 0)])),
        mapping(false),
        scalar("a"),
        scalar("1"),
        end_mapping(),
        Event::synthetic(EventData::DocumentEnd { explicit: true })
            .with_comment(pre(vec![Comment::full_line("# tail", 0)])),
        Event::synthetic(EventData::StreamEnd),
    ];
    let out = emit_raw(EmitterOptions::default(), events).unwrap();
    insta::assert_snapshot!(out, @r"
# head
---
a: 1
# tail
...
");
}

#[test]
fn test_crlf_line_breaks() {
    let options = EmitterOptions::new().line_break(LineBreak::CrLf);
    let out = emit_with(
        options,
        vec![
            mapping(false),
            scalar("a"),
            scalar("1"),
            scalar("b"),
            scalar("2"),
            end_mapping(),
        ],
    );
    assert_eq!(out, "a: 1\r\nb: 2\r\n");
}

#[test]
fn test_long_plain_scalar_is_folded() {
    let options = EmitterOptions::new().width(20);
    let out = emit_with(
        options,
        vec![
            mapping(false),
            scalar("k"),
            scalar("aaaa bbbb cccc dddd eeee ffff"),
            end_mapping(),
        ],
    );
    assert_eq!(out, "k: aaaa bbbb cccc dddd\n  eeee ffff\n");
}

#[test]
fn test_alias_without_anchor() {
    let err = emit_raw(
        EmitterOptions::default(),
        vec![
            Event::synthetic(EventData::StreamStart),
            document_start(),
            Event::synthetic(EventData::Alias {
                anchor: String::new(),
            }),
        ],
    )
    .unwrap_err();
    assert_eq!(err.problem, "anchor is not specified for alias");
}

#[test]
fn test_unsupported_version() {
    let err = emit_raw(
        EmitterOptions::default(),
        vec![
            Event::synthetic(EventData::StreamStart),
            Event::synthetic(EventData::DocumentStart {
                explicit: true,
                version: Some(Version::new(2, 0)),
                tags: Vec::new(),
            }),
            scalar("a"),
        ],
    )
    .unwrap_err();
    assert_eq!(err.problem, "unsupported YAML version: 2.0");
}

#[test]
fn test_invalid_anchor() {
    let mut bad = scalar("v");
    if let EventData::Scalar { anchor, .. } = &mut bad.data {
        *anchor = Some("a b".to_string());
    }
    let err = emit_raw(
        EmitterOptions::default(),
        vec![
            Event::synthetic(EventData::StreamStart),
            document_start(),
            bad,
        ],
    )
    .unwrap_err();
    assert_eq!(err.problem, "invalid character ' ' in the anchor: \"a b\"");
}

#[test]
fn test_events_out_of_order() {
    let err = emit_raw(
        EmitterOptions::default(),
        vec![document_start(), scalar("a")],
    )
    .unwrap_err();
    assert_eq!(err.problem, "expected a stream start, but got DocumentStart");

    let err = emit_raw(
        EmitterOptions::default(),
        vec![
            Event::synthetic(EventData::StreamStart),
            Event::synthetic(EventData::StreamEnd),
            scalar("a"),
        ],
    )
    .unwrap_err();
    assert_eq!(err.problem, "expected nothing, but got Scalar");
}

use super::*;
use crate::{IndexCheck, PathElement, tag};
use facet_testhelpers::test;

fn compose(source: &str) -> Document {
    Composer::from_str(source)
        .unwrap()
        .get_single_node()
        .unwrap()
        .unwrap()
}

fn compose_error(source: &str) -> MarkedError {
    let mut composer = Composer::from_str(source).unwrap();
    loop {
        match composer.get_node() {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("expected an error for {source:?}"),
            Err(err) => return err,
        }
    }
}

/// The value child of the scalar key `key` in the root mapping.
fn value<'a>(doc: &'a Document, key: &str) -> &'a Child {
    doc.root_node()
        .pairs()
        .iter()
        .find(|(k, _)| doc.graph[k.node].as_str() == Some(key))
        .map(|(_, v)| v)
        .unwrap_or_else(|| panic!("no key {key:?}"))
}

fn texts(comments: &[rtyaml_scanner::Comment]) -> Vec<&str> {
    comments.iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn test_alias_is_same_node() {
    let doc = compose("a: &x [1, 2]\nb: *x\n");
    assert_eq!(value(&doc, "a").node, value(&doc, "b").node);
    assert_eq!(doc.graph[value(&doc, "a").node].anchor.as_deref(), Some("x"));
}

#[test]
fn test_self_referential_sequence() {
    let doc = compose("&a [*a, 1]\n");
    let root = doc.root.node;
    assert_eq!(doc.graph[root].items()[0].node, root);
    assert_eq!(doc.graph[root].items().len(), 2);
}

#[test]
fn test_undefined_alias() {
    let err = compose_error("a: *missing\n");
    assert_eq!(err.stage, Stage::Composer);
    assert_eq!(err.problem, "found undefined alias \"missing\"");
    assert_eq!(err.problem_mark.map(|m| (m.line, m.column)), Some((0, 3)));
}

#[test]
fn test_nesting_limit() {
    let deep = |levels: usize| format!("{}{}", "[".repeat(levels), "]".repeat(levels));

    let doc = compose(&deep(MAX_DEPTH));
    assert_eq!(doc.root_node().kind(), Kind::Sequence);

    let err = compose_error(&deep(5000));
    assert_eq!(err.stage, Stage::Composer);
    assert_eq!(err.problem, format!("exceeded the nesting limit of {MAX_DEPTH}"));
    assert_eq!(err.problem_mark.map(|m| (m.line, m.column)), Some((0, MAX_DEPTH)));
}

#[test]
fn test_custom_nesting_limit() {
    let mut composer = Composer::from_str("a: {b: [c]}\n").unwrap().with_max_depth(2);
    let err = composer.get_single_node().unwrap_err();
    assert_eq!(err.problem_mark.map(|m| (m.line, m.column)), Some((0, 7)));
}

#[test]
fn test_anchors_do_not_cross_documents() {
    let err = compose_error("--- &x 1\n--- *x\n");
    assert_eq!(err.problem, "found undefined alias \"x\"");
}

#[test]
fn test_duplicate_anchor_warns_and_later_wins() {
    let mut composer = Composer::from_str("a: &x 1\nb: &x 2\nc: *x\n").unwrap();
    let doc = composer.get_single_node().unwrap().unwrap();
    assert_eq!(doc.graph[value(&doc, "c").node].as_str(), Some("2"));

    let warnings = composer.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::DuplicateAnchor);
    assert!(warnings[0].message.starts_with("found duplicate anchor \"x\""));
    assert!(composer.warnings().is_empty());
}

#[test]
fn test_implicit_tags() {
    let doc = compose("a: 1\nb: '1'\nc: !!str 1\nd: ~\ne: [x]\nf: {x: y}\n");
    let tag_of = |key| doc.graph[value(&doc, key).node].tag.as_str();
    assert_eq!(tag_of("a"), tag::INT);
    assert_eq!(tag_of("b"), tag::STR);
    assert_eq!(tag_of("c"), tag::STR);
    assert_eq!(tag_of("d"), tag::NULL);
    assert_eq!(tag_of("e"), tag::SEQ);
    assert_eq!(tag_of("f"), tag::MAP);
}

#[test]
fn test_version_directive_and_pin() {
    let source = "%YAML 1.1\n---\nflag: yes\n";
    let doc = compose(source);
    assert_eq!(doc.info.version, Some(Version::V1_1));
    assert_eq!(doc.graph[value(&doc, "flag").node].tag, tag::BOOL);

    let doc = Composer::from_str(source)
        .unwrap()
        .with_version(Some(Version::V1_2))
        .get_single_node()
        .unwrap()
        .unwrap();
    assert_eq!(doc.graph[value(&doc, "flag").node].tag, tag::STR);
}

#[test]
fn test_scalar_comments_stay_on_child() {
    let doc = compose("# top\na: 1  # one\n\n# before b\nb: 2\n");
    let root = doc.root_node();
    assert_eq!(texts(&root.comment.pre), vec!["# top"]);

    let one = value(&doc, "a");
    assert_eq!(one.comment.eol.as_ref().unwrap().text, "# one");
    assert!(doc.graph[one.node].comment.is_empty());

    let (b_key, _) = &root.pairs()[1];
    assert_eq!(texts(&b_key.comment.pre), vec!["", "# before b"]);
}

#[test]
fn test_collection_comments_stay_on_node() {
    let doc = compose("a:  # about a\n  b: 1\n  # inner\nc: 2\n");
    let nested = value(&doc, "a");
    assert!(nested.comment.is_empty());
    let node = &doc.graph[nested.node];
    assert_eq!(node.comment.eol.as_ref().unwrap().text, "# about a");
    assert_eq!(texts(&node.end_comment.pre), vec!["# inner"]);
}

#[test]
fn test_alias_comment_on_reference() {
    let doc = compose("a: &x 1\nb: *x  # again\n");
    assert!(value(&doc, "a").comment.is_empty());
    assert_eq!(
        value(&doc, "b").comment.eol.as_ref().unwrap().text,
        "# again"
    );
}

#[test]
fn test_document_info() {
    let doc = compose("# head\n--- # start\na: 1\n... # done\n# tail\n");
    assert!(doc.info.explicit_start);
    assert!(doc.info.explicit_end);
    assert_eq!(texts(&doc.info.start_comments.pre), vec!["# head"]);
    assert_eq!(
        doc.info.start_comments.eol.as_ref().unwrap().text,
        "# start"
    );
    assert_eq!(texts(&doc.info.end_comments), vec!["# done", "# tail"]);
}

#[test]
fn test_get_single_node_rejects_two_documents() {
    let err = Composer::from_str("a\n--- b\n")
        .unwrap()
        .get_single_node()
        .unwrap_err();
    assert_eq!(
        err.context.as_deref(),
        Some("expected a single document in the stream")
    );
    assert_eq!(err.problem, "but found another document");
}

#[test]
fn test_empty_stream() {
    let mut composer = Composer::from_str("# only a comment\n").unwrap();
    assert!(!composer.check_node().unwrap());
    assert!(composer.get_single_node().unwrap().is_none());
}

#[test]
fn test_multiple_documents() {
    let docs = crate::compose_all("--- 1\n--- [2]\n---\n").unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].root_node().as_str(), Some("1"));
    assert_eq!(docs[1].root_node().kind(), Kind::Sequence);
    assert_eq!(docs[2].root_node().tag, tag::NULL);
}

#[test]
fn test_path_resolver_applies_to_position() {
    let mut composer = Composer::from_str("point: {x: 1}\nother: {x: 1}\n").unwrap();
    composer.resolver_mut().add_path_resolver(
        "!point",
        vec![PathElement::new(
            Some(Kind::Mapping),
            IndexCheck::ValueOf("point".into()),
        )],
        Some(Kind::Mapping),
    );
    let doc = composer.get_single_node().unwrap().unwrap();
    assert_eq!(doc.graph[value(&doc, "point").node].tag, "!point");
    assert_eq!(doc.graph[value(&doc, "other").node].tag, tag::MAP);
}

#[test]
fn test_marks_recorded() {
    let doc = compose("a:\n  - x\n  - y\n");
    let seq = &doc.graph[value(&doc, "a").node];
    assert_eq!((seq.start.line, seq.start.column), (1, 2));
    let y = &doc.graph[seq.items()[1].node];
    assert_eq!((y.start.line, y.start.column), (2, 4));
}

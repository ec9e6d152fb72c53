//! Load and dump without changes must give back the source text.

use facet_testhelpers::test;
use rtyaml::{EmitterOptions, Version, Yaml, YamlConfig};
use similar::{ChangeTag, TextDiff};

/// Panic with a line diff if `actual` differs from `expected`.
fn assert_same_text(expected: &str, actual: &str) {
    if expected == actual {
        return;
    }
    let diff = TextDiff::from_lines(expected, actual);
    let mut report = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        report.push_str(sign);
        report.push_str(&change.to_string());
        if change.missing_newline() {
            report.push('\n');
        }
    }
    panic!("round trip changed the text:\n{report}");
}

fn round_trip_with(yaml: &mut Yaml, source: &str) {
    let value = yaml.load(source).unwrap();
    let dumped = yaml.dump(&value).unwrap();
    assert_same_text(source, &dumped);
}

fn round_trip(source: &str) {
    round_trip_with(&mut Yaml::default(), source);
}

#[test]
fn test_block_mapping() {
    round_trip("name: rtyaml\nnested:\n  a: 1\n  b: text\n");
}

#[test]
fn test_flow_collections() {
    round_trip("a: [x, y]\nb: {c: 1}\n");
}

#[test]
fn test_eol_comments() {
    round_trip("key: value  # comment\nother: 1     # wide gap\n");
}

#[test]
fn test_comments_and_blank_lines() {
    round_trip("# head\na: 1\n\n# about b\nb: 2\n");
}

#[test]
fn test_literal_block() {
    round_trip("desc: |\n  line1\n  line2\n");
}

#[test]
fn test_quoted_scalars() {
    let mut yaml = Yaml::new(YamlConfig::new().preserve_quotes(true));
    round_trip_with(&mut yaml, "a: 'single'\nb: \"double\"\nc: plain\n");
}

#[test]
fn test_numeric_literals() {
    round_trip("a: 0x1F\nb: 0x1f\nc: 1_000\nd: 1.50\ne: 1.5e+10\nf: 0X1f\n");
}

#[test]
fn test_yaml_1_1_octal() {
    let mut yaml = Yaml::default();
    let source = "%YAML 1.1\n---\nmode: 010\n";
    let documents = yaml.load_documents(source).unwrap();
    let mode = documents.documents[0].value.as_map().unwrap().get("mode");
    assert_eq!(mode.and_then(|v| v.as_i64()), Some(8));
    assert_same_text(source, &yaml.dump_documents(&documents).unwrap());
}

#[test]
fn test_anchor_and_aliases() {
    round_trip("base: &x [1, 2]\none: *x\ntwo: *x\n");
}

#[test]
fn test_merge_key() {
    round_trip("base: &base\n  a: 1\nover:\n  x: 0\n  <<: *base\n  y: 2\n");
}

#[test]
fn test_flow_collection_keys() {
    round_trip("x: 1\n[a, b]: 1\n{c: d}: 2\n");

    let root = rtyaml::load("x: 1\n? [a, b]\n: 1\n").unwrap();
    assert_eq!(rtyaml::dump(&root).unwrap(), "x: 1\n[a, b]: 1\n");
}

#[test]
fn test_empty_values() {
    round_trip("a:\nb: ~\nc:\n- x\n-\n- z\n");
}

#[test]
fn test_sequence_of_mappings() {
    round_trip("- a: 1\n  b: 2\n- c: 3\n");
}

#[test]
fn test_documents_keep_framing() {
    let mut yaml = Yaml::default();
    let source = "# head\n--- # start\na: 1\n# tail\n...\n";
    let documents = yaml.load_documents(source).unwrap();
    let info = &documents.documents[0].info;
    assert!(info.explicit_start);
    assert!(info.explicit_end);
    assert_same_text(source, &yaml.dump_documents(&documents).unwrap());
}

#[test]
fn test_documents_keep_indentation() {
    let mut yaml = Yaml::default();
    let source = "top:\n    items:\n      - a\n      - b\n";
    let documents = yaml.load_documents(source).unwrap();
    assert_eq!(documents.indent.mapping, Some(4));
    assert_eq!(documents.indent.dash_offset, Some(2));
    assert_eq!(documents.indent.sequence, Some(4));
    assert_same_text(source, &yaml.dump_documents(&documents).unwrap());
}

#[test]
fn test_load_all_and_dump_all() {
    let mut yaml = Yaml::default();
    let values = yaml.load_all("a: 1\n---\nb: 2\n").unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(yaml.dump_all(&values).unwrap(), "a: 1\n---\nb: 2\n");
}

#[test]
fn test_document_comments_move_to_root() {
    let mut yaml = Yaml::default();
    let root = yaml.load("# head\n---\na: 1\n").unwrap();
    let map = root.as_map().unwrap();
    assert_eq!(map.data().meta.start_comment.pre[0].text, "# head");
    assert_eq!(yaml.dump(&root).unwrap(), "# head\na: 1\n");
}

#[test]
fn test_explicit_markers_from_config() {
    let yaml = Yaml::new(YamlConfig::new().explicit_start(true).explicit_end(true));
    let root = rtyaml::load("a: 1\n").unwrap();
    assert_eq!(yaml.dump(&root).unwrap(), "---\na: 1\n...\n");
}

#[test]
fn test_pinned_version_is_written() {
    let mut yaml = Yaml::new(YamlConfig::new().version(Some(Version::V1_1)));
    let root = yaml.load("a: 1\n").unwrap();
    assert_eq!(yaml.dump(&root).unwrap(), "%YAML 1.1\n---\na: 1\n");
}

#[test]
fn test_indent_settings() {
    let options = EmitterOptions::new().indent(4).sequence_indent(4, 2);
    let mut yaml = Yaml::new(YamlConfig::new().emitter(options));
    round_trip_with(&mut yaml, "a:\n    b: 1\nitems:\n  - x\n  - y\n");
}

use super::*;
use facet_testhelpers::test;

use crate::IntFormat;

fn load_with(source: &str, registry: &Registry, options: ConstructorOptions) -> Result<(Value, Vec<Warning>)> {
    let mut composer = Composer::from_str(source)?;
    let mut constructor = Constructor::new(registry, options);
    let value = constructor
        .get_single_data(&mut composer)?
        .unwrap_or_else(Value::null);
    Ok((value, constructor.take_warnings()))
}

fn load(source: &str) -> Value {
    load_with(source, &Registry::round_trip(), ConstructorOptions::default())
        .unwrap()
        .0
}

fn load_error(source: &str, options: ConstructorOptions) -> MarkedError {
    load_with(source, &Registry::round_trip(), options).unwrap_err()
}

fn map(value: &Value) -> &Map {
    value.as_map().expect("a mapping")
}

fn strict() -> ConstructorOptions {
    ConstructorOptions {
        duplicate_keys: Policy::Error,
        mantissa_without_dot: Policy::Error,
        ..ConstructorOptions::default()
    }
}

#[test]
fn test_alias_is_same_container() {
    let root = load("a: &x [1, 2]\nb: *x\n");
    let a = map(&root).get("a").unwrap();
    let b = map(&root).get("b").unwrap();
    assert!(a.as_seq().unwrap().ptr_eq(b.as_seq().unwrap()));
    a.as_seq().unwrap().push(3);
    assert_eq!(b.as_seq().unwrap().len(), 3);
}

#[test]
fn test_self_referential_sequence() {
    let root = load("&a [*a, 1]\n");
    let seq = root.as_seq().unwrap();
    let first = seq.get(0).unwrap();
    assert!(first.as_seq().unwrap().ptr_eq(seq));
    assert_eq!(seq.get(1), Some(Value::from(1)));
}

#[test]
fn test_recursive_key_is_unhashable() {
    let err = load_error("&a {*a : 1}\n", ConstructorOptions::default());
    assert_eq!(err.problem, "found unhashable key");
    assert_eq!(err.context.as_deref(), Some("while constructing a mapping"));
}

#[test]
fn test_aliased_scalar_keeps_anchor() {
    let root = load("a: &v hello\nb: *v\n");
    let b = map(&root).get("b").unwrap();
    assert_eq!(b.as_str(), Some("hello"));
    assert_eq!(b.anchor().as_deref(), Some("v"));
}

#[test]
fn test_duplicate_key_warns_and_keeps_last() {
    let (root, warnings) =
        load_with("a: 1\na: 2\n", &Registry::round_trip(), ConstructorOptions::default()).unwrap();
    assert_eq!(map(&root).get("a"), Some(Value::from(2)));
    assert_eq!(map(&root).len(), 1);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::DuplicateKey);
    assert_eq!(warnings[0].mark.map(|m| m.line), Some(1));
}

#[test]
fn test_duplicate_key_error_policy() {
    let err = load_error("{a: 1, a: 2}\n", strict());
    assert_eq!(err.problem, "found duplicate key \"a\"");
    assert_eq!(err.context.as_deref(), Some("while constructing a mapping"));
    assert_eq!(err.problem_mark.map(|m| m.column), Some(7));
}

#[test]
fn test_merge_explicit_keys_win() {
    for source in [
        "base: &b {a: 1, c: 3}\nover:\n  a: 2\n  <<: *b\n",
        "base: &b {a: 1, c: 3}\nover:\n  <<: *b\n  a: 2\n",
    ] {
        let root = load(source);
        let over = map(&root).get("over").unwrap();
        let over = map(&over);
        assert_eq!(over.get("a"), Some(Value::from(2)), "{source}");
        assert_eq!(over.get("c"), Some(Value::from(3)), "{source}");
        assert!(over.is_merged("c"));
    }
}

#[test]
fn test_merge_position_and_sources() {
    let root = load("x: &x {a: 1}\ny: &y {a: 2, b: 2}\nz:\n  k: 0\n  <<: [*x, *y]\n");
    let z = map(&root).get("z").unwrap();
    let merge = map(&z).merge().unwrap();
    assert_eq!(merge.position, 1);
    assert!(merge.sequence);
    assert_eq!(merge.sources.len(), 2);
    assert_eq!(map(&z).get("a"), Some(Value::from(1)));
    assert_eq!(map(&z).get("b"), Some(Value::from(2)));

    let x = map(&root).get("x").unwrap();
    assert!(merge.sources[0].ptr_eq(map(&x)));
}

#[test]
fn test_merge_removal_falls_back() {
    let root = load("b: &b {a: 1}\nm:\n  <<: *b\n  a: 2\n");
    let m = map(&root).get("m").unwrap();
    map(&m).remove("a");
    assert_eq!(map(&m).get("a"), Some(Value::from(1)));
}

#[test]
fn test_merge_rejects_scalars() {
    let err = load_error("m:\n  <<: 1\n", ConstructorOptions::default());
    assert_eq!(
        err.problem,
        "expected a mapping or list of mappings for merging, but found a scalar"
    );
}

#[test]
fn test_repeated_merge_key_is_a_duplicate() {
    let err = load_error("b: &b {a: 1}\nm:\n  <<: *b\n  <<: *b\n", strict());
    assert_eq!(err.problem, "found duplicate key \"<<\"");
}

#[test]
fn test_eol_comment_on_value() {
    let root = load("key: value  # comment\n");
    let comment = map(&root).eol_comment("key").unwrap();
    assert_eq!(comment.text, "# comment");
    assert_eq!(comment.gap, 2);
}

#[test]
fn test_container_comments() {
    let root = load("# head\na:  # about a\n  b: 1\n  # inner\nc: 2\n");
    let top = map(&root);
    let start = top.data().meta.start_comment.clone();
    assert_eq!(start.pre.len(), 1);
    assert_eq!(start.pre[0].text, "# head");

    let a = top.get("a").unwrap();
    let a_meta = map(&a).data().meta.clone();
    assert_eq!(a_meta.start_comment.eol.unwrap().text, "# about a");
    assert_eq!(a_meta.end_comment.pre[0].text, "# inner");
}

#[test]
fn test_comment_before_key() {
    let root = load("a: 1\n\n# about b\nb: 2\n");
    let before = map(&root).comment_before("b");
    assert_eq!(before.len(), 2);
    assert!(before[0].is_blank());
    assert_eq!(before[1].text, "# about b");
}

#[test]
fn test_sequence_item_comments() {
    let root = load("- a  # first\n# before b\n- b\n");
    let seq = root.as_seq().unwrap();
    assert_eq!(seq.eol_comment(0).unwrap().text, "# first");
    assert_eq!(seq.comment_before(1)[0].text, "# before b");
}

#[test]
fn test_numeric_literals_kept() {
    let root = load("[0x1F, 0x1f, 010, 1_000, 1.50, 1.5e+10]\n");
    let seq = root.as_seq().unwrap();
    let texts: Vec<String> = seq
        .to_vec()
        .iter()
        .map(|v| v.scalar_text(Version::V1_2).unwrap())
        .collect();
    assert_eq!(texts, vec!["0x1F", "0x1f", "010", "1_000", "1.50", "1.5e+10"]);
    match seq.get(0) {
        Some(Value::Int(int)) => assert_eq!(int.format(), IntFormat::HexCaps),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_null_and_bool_spellings() {
    let root = load("a: ~\nb:\nc: True\n");
    let m = map(&root);
    assert_eq!(m.get("a").unwrap().scalar_text(Version::V1_2).as_deref(), Some("~"));
    assert_eq!(m.get("b").unwrap().scalar_text(Version::V1_2).as_deref(), Some(""));
    assert_eq!(m.get("c").unwrap().scalar_text(Version::V1_2).as_deref(), Some("True"));
}

#[test]
fn test_quote_preservation() {
    let source = "a: 'x'\nb: \"y\"\nc: |\n  z\n";
    let style = |root: &Value, key: &str| match map(root).get(key) {
        Some(Value::Str(s)) => s.style,
        other => panic!("unexpected {other:?}"),
    };

    let root = load(source);
    assert_eq!(style(&root, "a"), None);
    assert_eq!(style(&root, "b"), None);
    assert_eq!(style(&root, "c"), Some(ScalarStyle::Literal));

    let options = ConstructorOptions {
        preserve_quotes: true,
        ..ConstructorOptions::default()
    };
    let (root, _) = load_with(source, &Registry::round_trip(), options).unwrap();
    assert_eq!(style(&root, "a"), Some(ScalarStyle::SingleQuoted));
    assert_eq!(style(&root, "b"), Some(ScalarStyle::DoubleQuoted));
}

#[test]
fn test_unknown_tags_are_kept() {
    let root = load("- !thing {a: 1}\n- !custom x\n- !!binary aGVsbG8=\n");
    let seq = root.as_seq().unwrap();
    assert_eq!(seq.get(0).unwrap().as_map().unwrap().tag().as_deref(), Some("!thing"));
    match seq.get(1) {
        Some(Value::Tagged(tagged)) => {
            assert_eq!(tagged.tag, "!custom");
            assert_eq!(tagged.value, "x");
        }
        other => panic!("unexpected {other:?}"),
    }
    match seq.get(2) {
        Some(Value::Tagged(tagged)) => assert_eq!(tagged.tag, tag::BINARY),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_strict_registry_rejects_unknown_tags() {
    let registry = Registry::round_trip().strict();
    let err = load_with("!custom x\n", &registry, ConstructorOptions::default()).unwrap_err();
    assert_eq!(
        err.problem,
        "could not determine a constructor for the tag \"!custom\""
    );
}

#[test]
fn test_set_and_omap() {
    let root = load("s: !!set {a, b}\no: !!omap [x: 1, y: 2]\n");
    let s = map(&root).get("s").unwrap();
    assert_eq!(map(&s).tag().as_deref(), Some(tag::SET));
    assert!(map(&s).get("a").unwrap().is_null());

    let o = map(&root).get("o").unwrap();
    let o = o.as_seq().unwrap();
    assert_eq!(o.tag().as_deref(), Some(tag::OMAP));
    assert_eq!(o.len(), 2);

    let err = load_error("!!omap [a]\n", ConstructorOptions::default());
    assert_eq!(err.problem, "expected a mapping of length 1");
}

#[test]
fn test_mantissa_without_dot() {
    let source = "%YAML 1.1\n---\n1e3\n";
    let (value, warnings) =
        load_with(source, &Registry::round_trip(), ConstructorOptions::default()).unwrap();
    assert_eq!(value.as_f64(), Some(1000.0));
    assert_eq!(warnings[0].kind, WarningKind::MantissaWithoutDot);

    let err = load_error(source, strict());
    assert!(err.problem.contains("has no '.' in its mantissa"));
}

#[test]
fn test_generated_anchor_names_dropped() {
    let root = load("a: &id001 [1]\nb: &keep [2]\n");
    assert_eq!(map(&root).get("a").unwrap().anchor(), None);
    assert_eq!(map(&root).get("b").unwrap().anchor().as_deref(), Some("keep"));
}

#[test]
fn test_bad_literals() {
    let err = load_error("!!timestamp 2001-02-30\n", ConstructorOptions::default());
    assert_eq!(err.problem, "invalid timestamp \"2001-02-30\"");
    assert_eq!(err.context.as_deref(), Some("while constructing !!timestamp"));

    let err = load_error(
        "0x1_0000_0000_0000_0000_0000_0000_0000_0000\n",
        ConstructorOptions::default(),
    );
    assert!(err.problem.contains("does not fit in 128 bits"));
}

#[test]
fn test_marks_recorded() {
    let root = load("a: 1\nb:\n  - x\n");
    let m = map(&root);
    assert_eq!(m.line_col().map(|mark| mark.line), Some(0));
    assert_eq!(m.key_line_col("b").map(|mark| mark.line), Some(1));
    assert_eq!(m.value_line_col("b").map(|mark| mark.line), Some(2));
}

#[test]
fn test_sequence_key() {
    let root = load("? [a, b]\n: 1\n");
    let key = Value::Seq(Seq::from_values([Value::from("a"), Value::from("b")]));
    assert_eq!(map(&root).get(key), Some(Value::from(1)));
}

#[test]
fn test_get_data_walks_documents() {
    let registry = Registry::round_trip();
    let mut composer = Composer::from_str("1\n---\ntwo\n").unwrap();
    let mut constructor = Constructor::new(&registry, ConstructorOptions::default());
    assert_eq!(constructor.get_data(&mut composer).unwrap(), Some(Value::from(1)));
    assert_eq!(constructor.get_data(&mut composer).unwrap(), Some(Value::from("two")));
    assert_eq!(constructor.get_data(&mut composer).unwrap(), None);
}

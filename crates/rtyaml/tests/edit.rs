//! Changes made to loaded values show up in the dump, and everything around
//! them stays put.

use facet_testhelpers::test;
use rtyaml::{Map, Seq, Value, Yaml};

fn load(source: &str) -> Value {
    Yaml::default().load(source).unwrap()
}

fn dump(value: &Value) -> String {
    Yaml::default().dump(value).unwrap()
}

#[test]
fn test_comment_survives_value_change() {
    let root = load("key: value  # comment\n");
    root.as_map().unwrap().insert("key", "value2");
    assert_eq!(dump(&root), "key: value2  # comment\n");
}

#[test]
fn test_add_key_with_comments() {
    let root = load("a: 1\nb: 2\n");
    let map = root.as_map().unwrap();
    map.insert("c", 3);
    map.set_comment_before("c", "added", 0);
    map.set_eol_comment("c", "new");
    insta::assert_snapshot!(dump(&root), @r"
a: 1
b: 2
# added
c: 3  # new
");
}

#[test]
fn test_remove_key() {
    let root = load("a: 1  # one\nb: 2  # two\nc: 3\n");
    root.as_map().unwrap().remove("b");
    assert_eq!(dump(&root), "a: 1  # one\nc: 3\n");
}

#[test]
fn test_alias_is_shared() {
    let root = load("a: &x [1, 2]\nb: *x\n");
    let map = root.as_map().unwrap();
    let a = map.get("a").unwrap();
    let b = map.get("b").unwrap();
    assert!(a.as_seq().unwrap().ptr_eq(b.as_seq().unwrap()));

    a.as_seq().unwrap().push(3);
    assert_eq!(b.as_seq().unwrap().len(), 3);
    assert_eq!(dump(&root), "a: &x [1, 2, 3]\nb: *x\n");
}

#[test]
fn test_shared_container_gets_generated_anchor() {
    let shared = Seq::from_values([Value::from("x")]);
    shared.set_flow_style(true);
    let root: Map = [
        ("first", Value::Seq(shared.clone())),
        ("second", Value::Seq(shared)),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        dump(&Value::Map(root)),
        "first: &id001 [x]\nsecond: *id001\n"
    );
}

#[test]
fn test_merged_keys_resolve_and_dump_in_place() {
    let root = load("base: &b\n  a: 1\nover:\n  <<: *b\n  c: 2\n");
    let over = root.as_map().unwrap().get("over").unwrap();
    let over = over.as_map().unwrap();
    assert_eq!(over.get("a").and_then(|v| v.as_i64()), Some(1));
    assert!(over.is_merged("a"));

    over.insert("c", 3);
    insta::assert_snapshot!(dump(&root), @r"
base: &b
  a: 1
over:
  <<: *b
  c: 3
");
}

#[test]
fn test_new_document() {
    let items = Seq::from_values([Value::from("a"), Value::from(1), Value::null()]);
    let root: Map = [("items", Value::Seq(items)), ("empty", Value::null())]
        .into_iter()
        .collect();
    insta::assert_snapshot!(dump(&Value::Map(root)), @r"
items:
- a
- 1
-
empty:
");
}

#[test]
fn test_root_null() {
    assert_eq!(dump(&Value::null()), "null\n");
}

#[test]
fn test_start_and_end_comments() {
    let root = load("a: 1\n");
    let map = root.as_map().unwrap();
    map.set_start_comment("top", 0);
    map.set_end_comment("bottom", 0);
    assert_eq!(dump(&root), "# top\na: 1\n# bottom\n");
}

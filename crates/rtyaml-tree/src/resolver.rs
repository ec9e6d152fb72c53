//! Implicit tag resolution.
//!
//! A plain scalar without a tag gets its tag from the first implicit resolver
//! whose pattern matches its text. Candidates are looked up by the first
//! character of the text, so most scalars are checked against one or two
//! patterns. Which patterns exist depends on the YAML version: 1.1 knows
//! `yes`/`no`, sexagesimal numbers and `010` octals, 1.2 does not.
//!
//! Path resolvers force a tag by position in the tree instead, for example
//! "every value of the key `version` is a string".

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use rtyaml_scanner::Version;
use tracing::trace;

use crate::{Kind, tag};

struct Implicit {
    tag: &'static str,
    regex: Regex,
    /// Characters a matching scalar can start with.
    first: &'static str,
    /// Whether the empty string can match.
    empty: bool,
}

impl Implicit {
    fn new(tag: &'static str, pattern: &str, first: &'static str) -> Self {
        Self {
            tag,
            regex: compile(pattern),
            first,
            empty: false,
        }
    }

    fn with_empty(mut self) -> Self {
        self.empty = true;
        self
    }

    fn applies_to(&self, value: &str) -> bool {
        match value.chars().next() {
            None => self.empty,
            Some(c) => self.first.contains(c),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{pattern})$")).expect("resolver patterns are valid")
}

const DIGITS: &str = "0123456789";
const NUMBER_START: &str = "-+0123456789";
const FLOAT_START: &str = "-+0123456789.";

const TIMESTAMP: &str = concat!(
    r"[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]",
    r"|[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?",
    r"(?:[Tt]|[ \t]+)[0-9][0-9]?",
    r":[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?",
    r"(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?",
);

static CORE_1_2: LazyLock<Vec<Implicit>> = LazyLock::new(|| {
    vec![
        Implicit::new(tag::BOOL, "true|True|TRUE|false|False|FALSE", "tTfF"),
        Implicit::new(
            tag::FLOAT,
            concat!(
                r"[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?",
                r"|[-+]?(?:[0-9][0-9_]*)(?:[eE][-+]?[0-9]+)",
                r"|[-+]?\.[0-9_]+(?:[eE][-+][0-9]+)?",
                r"|[-+]?\.(?:inf|Inf|INF)",
                r"|\.(?:nan|NaN|NAN)",
            ),
            FLOAT_START,
        ),
        Implicit::new(
            tag::INT,
            concat!(
                r"[-+]?0b[0-1_]+",
                r"|[-+]?0o[0-7_]+",
                r"|[-+]?[0-9][0-9_]*",
                r"|[-+]?0x[0-9a-fA-F_]+",
            ),
            NUMBER_START,
        ),
        Implicit::new(tag::MERGE, "<<", "<"),
        Implicit::new(tag::NULL, "~|null|Null|NULL|", "~nN").with_empty(),
        Implicit::new(tag::TIMESTAMP, TIMESTAMP, DIGITS),
        Implicit::new(tag::VALUE, "=", "="),
    ]
});

static CORE_1_1: LazyLock<Vec<Implicit>> = LazyLock::new(|| {
    vec![
        Implicit::new(
            tag::BOOL,
            concat!(
                "yes|Yes|YES|no|No|NO|y|Y|n|N",
                "|true|True|TRUE|false|False|FALSE",
                "|on|On|ON|off|Off|OFF",
            ),
            "yYnNtTfFoO",
        ),
        Implicit::new(
            tag::FLOAT,
            concat!(
                r"[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?",
                r"|[-+]?(?:[0-9][0-9_]*)(?:[eE][-+]?[0-9]+)",
                r"|\.[0-9_]+(?:[eE][-+][0-9]+)?",
                r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*",
                r"|[-+]?\.(?:inf|Inf|INF)",
                r"|\.(?:nan|NaN|NAN)",
            ),
            FLOAT_START,
        ),
        Implicit::new(
            tag::INT,
            concat!(
                r"[-+]?0b[0-1_]+",
                r"|[-+]?0[0-7_]+",
                r"|[-+]?(?:0|[1-9][0-9_]*)",
                r"|[-+]?0x[0-9a-fA-F_]+",
                r"|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+",
            ),
            NUMBER_START,
        ),
        Implicit::new(tag::MERGE, "<<", "<"),
        Implicit::new(tag::NULL, "~|null|Null|NULL|", "~nN").with_empty(),
        Implicit::new(tag::TIMESTAMP, TIMESTAMP, DIGITS),
        Implicit::new(tag::VALUE, "=", "="),
    ]
});

/// What a path element checks about the position of a node in its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCheck {
    /// The node is a mapping key.
    Key,
    /// The node is a mapping value or a sequence item.
    AnyValue,
    /// The node is the value of the scalar key with this text.
    ValueOf(String),
    /// The node is the sequence item at this index.
    Item(usize),
}

/// One level of a path resolver: the parent's kind (any if `None`) and the
/// node's position in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathElement {
    pub parent: Option<Kind>,
    pub index: IndexCheck,
}

impl PathElement {
    pub fn new(parent: Option<Kind>, index: IndexCheck) -> Self {
        Self { parent, index }
    }
}

/// Where the composer is descending to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key,
    /// A mapping value. Carries the key's text when the key is a scalar.
    Value(Option<String>),
    Item(usize),
}

#[derive(Debug, Clone)]
struct PathResolver {
    path: Vec<PathElement>,
    kind: Option<Kind>,
    tag: String,
}

/// Picks the tag of a node that was written without one.
///
/// Owned by the composer; the version can change per document.
pub struct Resolver {
    version: Version,
    extra: Vec<Implicit>,
    paths: Vec<PathResolver>,
    /// Per depth, the tags fixed for the node at this depth, by kind.
    exact: Vec<HashMap<Option<Kind>, String>>,
    /// Per depth, indices of path resolvers that still match a prefix.
    prefix: Vec<Vec<usize>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Version::V1_2)
    }
}

impl Resolver {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            extra: Vec::new(),
            paths: Vec::new(),
            exact: Vec::new(),
            prefix: Vec::new(),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Switch the implicit tables. Anything other than 1.1 uses the 1.2 rules.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Add a pattern after the built-in ones. `first` lists the characters a
    /// matching scalar can start with. The pattern must match a whole scalar.
    pub fn add_implicit_resolver(
        &mut self,
        tag: &'static str,
        pattern: &str,
        first: &'static str,
    ) -> Result<(), regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        self.extra.push(Implicit {
            tag,
            regex,
            first,
            empty: false,
        });
        Ok(())
    }

    /// Force `tag` on nodes of `kind` (any kind if `None`) found at `path`.
    pub fn add_path_resolver(&mut self, tag: impl Into<String>, path: Vec<PathElement>, kind: Option<Kind>) {
        self.paths.push(PathResolver {
            path,
            kind,
            tag: tag.into(),
        });
    }

    fn table(&self) -> &'static [Implicit] {
        if self.version == Version::V1_1 {
            &CORE_1_1
        } else {
            &CORE_1_2
        }
    }

    /// The tag for a node written without an explicit one.
    ///
    /// `implicit` is the scalar's (plain, quoted) pair; only a plain scalar is
    /// matched against the patterns.
    pub fn resolve(&self, kind: Kind, value: &str, implicit: (bool, bool)) -> String {
        if kind == Kind::Scalar && implicit.0 {
            let hit = self
                .table()
                .iter()
                .chain(self.extra.iter())
                .filter(|r| r.applies_to(value))
                .find(|r| r.regex.is_match(value));
            if let Some(hit) = hit {
                trace!(value, tag = hit.tag, "implicit tag");
                return hit.tag.to_string();
            }
        }
        if let Some(exact) = self.exact.last() {
            if let Some(tag) = exact.get(&Some(kind)) {
                return tag.clone();
            }
            if let Some(tag) = exact.get(&None) {
                return tag.clone();
            }
        }
        match kind {
            Kind::Scalar => tag::STR,
            Kind::Sequence => tag::SEQ,
            Kind::Mapping => tag::MAP,
        }
        .to_string()
    }

    /// Enter a child position. `parent` is `None` for the document root.
    pub fn descend_resolver(&mut self, parent: Option<Kind>, step: Option<&Step>) {
        if self.paths.is_empty() {
            return;
        }
        let mut exact = HashMap::new();
        let mut prefix = Vec::new();
        match (parent, step) {
            (Some(parent), Some(step)) => {
                let depth = self.prefix.len();
                for &i in self.prefix.last().into_iter().flatten() {
                    let resolver = &self.paths[i];
                    if !check_prefix(&resolver.path[depth - 1], parent, step) {
                        continue;
                    }
                    if resolver.path.len() > depth {
                        prefix.push(i);
                    } else {
                        exact.insert(resolver.kind, resolver.tag.clone());
                    }
                }
            }
            _ => {
                for (i, resolver) in self.paths.iter().enumerate() {
                    if resolver.path.is_empty() {
                        exact.insert(resolver.kind, resolver.tag.clone());
                    } else {
                        prefix.push(i);
                    }
                }
            }
        }
        self.exact.push(exact);
        self.prefix.push(prefix);
    }

    pub fn ascend_resolver(&mut self) {
        if self.paths.is_empty() {
            return;
        }
        self.exact.pop();
        self.prefix.pop();
    }
}

fn check_prefix(element: &PathElement, parent: Kind, step: &Step) -> bool {
    if element.parent.is_some_and(|k| k != parent) {
        return false;
    }
    match (&element.index, step) {
        (IndexCheck::Key, Step::Key) => true,
        (IndexCheck::AnyValue, Step::Value(_) | Step::Item(_)) => true,
        (IndexCheck::ValueOf(wanted), Step::Value(Some(key))) => wanted == key,
        (IndexCheck::Item(wanted), Step::Item(index)) => wanted == index,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn plain(resolver: &Resolver, value: &str) -> String {
        tag::short(&resolver.resolve(Kind::Scalar, value, (true, false)))
    }

    #[test]
    fn test_core_schema_1_2() {
        let r = Resolver::new(Version::V1_2);
        for (value, expected) in [
            ("", "!!null"),
            ("~", "!!null"),
            ("Null", "!!null"),
            ("true", "!!bool"),
            ("yes", "!!str"),
            ("on", "!!str"),
            ("42", "!!int"),
            ("-1_000", "!!int"),
            ("0x1F", "!!int"),
            ("0o17", "!!int"),
            ("0b101", "!!int"),
            ("010", "!!int"),
            ("1.5", "!!float"),
            ("1.5e+10", "!!float"),
            ("1e5", "!!float"),
            (".inf", "!!float"),
            ("-.INF", "!!float"),
            (".NaN", "!!float"),
            ("1:30", "!!str"),
            ("2001-12-14", "!!timestamp"),
            ("2001-12-14t21:59:43.10-05:00", "!!timestamp"),
            ("2001-12-14 21:59:43.10 -5", "!!timestamp"),
            ("<<", "!!merge"),
            ("=", "!!value"),
            ("hello", "!!str"),
            ("_", "!!str"),
        ] {
            assert_eq!(plain(&r, value), expected, "{value:?}");
        }
    }

    #[test]
    fn test_yaml_1_1_extras() {
        let r = Resolver::new(Version::V1_1);
        for (value, expected) in [
            ("yes", "!!bool"),
            ("Off", "!!bool"),
            ("y", "!!bool"),
            ("010", "!!int"),
            ("0o17", "!!str"),
            ("1:30", "!!int"),
            ("190:20:30.15", "!!float"),
            ("-1_000", "!!int"),
            ("hello", "!!str"),
        ] {
            assert_eq!(plain(&r, value), expected, "{value:?}");
        }
    }

    #[test]
    fn test_quoted_scalars_are_strings() {
        let r = Resolver::default();
        assert_eq!(r.resolve(Kind::Scalar, "42", (false, true)), tag::STR);
        assert_eq!(r.resolve(Kind::Sequence, "", (false, false)), tag::SEQ);
        assert_eq!(r.resolve(Kind::Mapping, "", (false, false)), tag::MAP);
    }

    #[test]
    fn test_set_version() {
        let mut r = Resolver::default();
        assert_eq!(plain(&r, "no"), "!!str");
        r.set_version(Version::V1_1);
        assert_eq!(plain(&r, "no"), "!!bool");
    }

    #[test]
    fn test_extra_implicit_resolver() {
        let mut r = Resolver::default();
        r.add_implicit_resolver("!version", r"v[0-9]+(?:\.[0-9]+)*", "v")
            .unwrap();
        assert!(r.add_implicit_resolver("!bad", "(", "(").is_err());
        assert_eq!(plain(&r, "v1.2.3"), "!version");
        assert_eq!(plain(&r, "value"), "!!str");
    }

    #[test]
    fn test_path_resolver() {
        let mut r = Resolver::default();
        r.add_path_resolver(
            "!name",
            vec![PathElement::new(
                Some(Kind::Mapping),
                IndexCheck::ValueOf("name".into()),
            )],
            Some(Kind::Scalar),
        );

        r.descend_resolver(None, None);
        assert_eq!(r.resolve(Kind::Mapping, "", (false, false)), tag::MAP);

        r.descend_resolver(Some(Kind::Mapping), Some(&Step::Value(Some("name".into()))));
        assert_eq!(r.resolve(Kind::Scalar, "bob", (true, false)), "!name");
        // implicit patterns still win
        assert_eq!(r.resolve(Kind::Scalar, "42", (true, false)), tag::INT);
        r.ascend_resolver();

        r.descend_resolver(Some(Kind::Mapping), Some(&Step::Value(Some("other".into()))));
        assert_eq!(r.resolve(Kind::Scalar, "bob", (true, false)), tag::STR);
        r.ascend_resolver();
        r.ascend_resolver();
    }

    #[test]
    fn test_path_resolver_on_sequence_items() {
        let mut r = Resolver::default();
        r.add_path_resolver(
            "!first",
            vec![PathElement::new(None, IndexCheck::Item(0))],
            None,
        );
        r.descend_resolver(None, None);
        r.descend_resolver(Some(Kind::Sequence), Some(&Step::Item(0)));
        assert_eq!(r.resolve(Kind::Mapping, "", (false, false)), "!first");
        r.ascend_resolver();
        r.descend_resolver(Some(Kind::Sequence), Some(&Step::Item(1)));
        assert_eq!(r.resolve(Kind::Mapping, "", (false, false)), tag::MAP);
    }
}

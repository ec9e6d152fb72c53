//! Constructor and representer dispatch tables.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use rtyaml_scanner::{MarkedError, ScalarStyle, Stage};
use rtyaml_tree::{Child, Graph, NodeId, NodeKind, tag};

use crate::constructor::{self, Constructor};
use crate::representer::{self, Representer, RepresenterError};
use crate::{IntFormat, Object, Value};

/// Builds a value for one node.
pub type ConstructFn = fn(&mut Constructor<'_>, &Graph, NodeId) -> Result<Value, MarkedError>;

/// Builds the node for one value.
pub type RepresentFn = fn(&mut Representer<'_>, &Value) -> Result<Child, RepresenterError>;

/// Runtime type of a value, as seen by representer dispatch.
///
/// Kinds form a chain ending in [`TypeKey::Any`]; dispatch tries the exact
/// kind first and then walks the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Any,
    Null,
    Bool,
    Int,
    BinaryInt,
    OctalInt,
    HexInt,
    HexCapsInt,
    Float,
    Str,
    SingleQuotedStr,
    DoubleQuotedStr,
    LiteralStr,
    FoldedStr,
    Timestamp,
    Seq,
    Map,
    Tagged,
    Object,
    /// A registered host type.
    Host(TypeId),
}

impl TypeKey {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null(_) => TypeKey::Null,
            Value::Bool(_) => TypeKey::Bool,
            Value::Int(int) => match int.format() {
                IntFormat::Binary => TypeKey::BinaryInt,
                IntFormat::Octal => TypeKey::OctalInt,
                IntFormat::Hex => TypeKey::HexInt,
                IntFormat::HexCaps => TypeKey::HexCapsInt,
                IntFormat::Decimal | IntFormat::Sexagesimal => TypeKey::Int,
            },
            Value::Float(_) => TypeKey::Float,
            Value::Str(s) => match s.style {
                Some(ScalarStyle::SingleQuoted) => TypeKey::SingleQuotedStr,
                Some(ScalarStyle::DoubleQuoted) => TypeKey::DoubleQuotedStr,
                Some(ScalarStyle::Literal) => TypeKey::LiteralStr,
                Some(ScalarStyle::Folded) => TypeKey::FoldedStr,
                Some(ScalarStyle::Plain) | None => TypeKey::Str,
            },
            Value::Timestamp(_) => TypeKey::Timestamp,
            Value::Seq(_) => TypeKey::Seq,
            Value::Map(_) => TypeKey::Map,
            Value::Tagged(_) => TypeKey::Tagged,
            Value::Object(object) => TypeKey::Host((*object.data).type_id()),
        }
    }

    /// The next kind to try when this one has no representer.
    pub fn parent(self) -> Option<TypeKey> {
        match self {
            TypeKey::Any => None,
            TypeKey::HexCapsInt => Some(TypeKey::HexInt),
            TypeKey::BinaryInt | TypeKey::OctalInt | TypeKey::HexInt => Some(TypeKey::Int),
            TypeKey::SingleQuotedStr
            | TypeKey::DoubleQuotedStr
            | TypeKey::LiteralStr
            | TypeKey::FoldedStr => Some(TypeKey::Str),
            TypeKey::Host(_) => Some(TypeKey::Object),
            _ => Some(TypeKey::Any),
        }
    }
}

/// A host type with its own tag.
///
/// ```ignore
/// struct Point { x: i64, y: i64 }
///
/// impl YamlClass for Point {
///     const TAG: &'static str = "!point";
///     fn to_yaml(&self) -> Value { ... }
///     fn from_yaml(value: &Value) -> Result<Self, String> { ... }
/// }
/// ```
pub trait YamlClass: Any + Sized {
    const TAG: &'static str;

    /// The plain value written under [`Self::TAG`].
    fn to_yaml(&self) -> Value;

    /// Build from the value found under [`Self::TAG`].
    fn from_yaml(value: &Value) -> Result<Self, String>;
}

/// Tag-to-constructor and type-to-representer tables.
#[derive(Clone)]
pub struct Registry {
    constructors: HashMap<String, ConstructFn>,
    /// Tag prefixes, longest match wins.
    multi_constructors: Vec<(String, ConstructFn)>,
    fallback: Option<ConstructFn>,
    representers: HashMap<TypeKey, RepresentFn>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::round_trip()
    }
}

impl Registry {
    /// Tables with nothing registered.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
            multi_constructors: Vec::new(),
            fallback: None,
            representers: HashMap::new(),
        }
    }

    /// The built-in round-trip tables. Unknown tags are kept.
    pub fn round_trip() -> Self {
        let mut registry = Self::empty();
        registry.add_constructor(tag::NULL, constructor::construct_null);
        registry.add_constructor(tag::BOOL, constructor::construct_bool);
        registry.add_constructor(tag::INT, constructor::construct_int);
        registry.add_constructor(tag::FLOAT, constructor::construct_float);
        registry.add_constructor(tag::STR, constructor::construct_str);
        registry.add_constructor(tag::TIMESTAMP, constructor::construct_timestamp);
        registry.add_constructor(tag::BINARY, constructor::construct_tagged_scalar);
        registry.add_constructor(tag::VALUE, constructor::construct_tagged_scalar);
        registry.add_constructor(tag::SEQ, constructor::construct_seq);
        registry.add_constructor(tag::MAP, constructor::construct_map);
        registry.add_constructor(tag::SET, constructor::construct_set);
        registry.add_constructor(tag::OMAP, constructor::construct_pairs);
        registry.add_constructor(tag::PAIRS, constructor::construct_pairs);
        registry.fallback = Some(constructor::construct_undefined);

        registry.add_representer(TypeKey::Null, representer::represent_null);
        registry.add_representer(TypeKey::Bool, representer::represent_scalar);
        registry.add_representer(TypeKey::Int, representer::represent_scalar);
        registry.add_representer(TypeKey::Float, representer::represent_scalar);
        registry.add_representer(TypeKey::Str, representer::represent_str);
        registry.add_representer(TypeKey::Timestamp, representer::represent_scalar);
        registry.add_representer(TypeKey::Tagged, representer::represent_str);
        registry.add_representer(TypeKey::Seq, representer::represent_seq);
        registry.add_representer(TypeKey::Map, representer::represent_map);
        registry.add_representer(TypeKey::Object, representer::represent_unregistered);
        registry
    }

    /// Remove the unknown-tag fallback: nodes with unregistered tags become
    /// errors.
    pub fn strict(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub fn add_constructor(&mut self, tag: impl Into<String>, f: ConstructFn) {
        self.constructors.insert(tag.into(), f);
    }

    /// Handle every tag starting with `prefix`.
    pub fn add_multi_constructor(&mut self, prefix: impl Into<String>, f: ConstructFn) {
        let prefix = prefix.into();
        self.multi_constructors.retain(|(p, _)| *p != prefix);
        self.multi_constructors.push((prefix, f));
    }

    pub fn set_fallback(&mut self, f: Option<ConstructFn>) {
        self.fallback = f;
    }

    pub fn add_representer(&mut self, key: TypeKey, f: RepresentFn) {
        self.representers.insert(key, f);
    }

    /// Install a constructor for `T::TAG` and a representer for `T`.
    pub fn register_class<T: YamlClass>(&mut self) {
        self.add_constructor(T::TAG, construct_class::<T>);
        self.add_representer(TypeKey::Host(TypeId::of::<T>()), represent_class::<T>);
    }

    /// Exact tag, then the longest matching prefix, then the fallback.
    pub fn constructor_for(&self, tag: &str) -> Option<ConstructFn> {
        if let Some(&f) = self.constructors.get(tag) {
            return Some(f);
        }
        self.multi_constructors
            .iter()
            .filter(|(prefix, _)| tag.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|&(_, f)| f)
            .or(self.fallback)
    }

    /// The representer for `key` or its nearest ancestor.
    pub fn representer_for(&self, key: TypeKey) -> Option<RepresentFn> {
        let mut current = Some(key);
        while let Some(key) = current {
            if let Some(&f) = self.representers.get(&key) {
                return Some(f);
            }
            current = key.parent();
        }
        None
    }
}

fn construct_class<T: YamlClass>(
    constructor: &mut Constructor<'_>,
    graph: &Graph,
    id: NodeId,
) -> Result<Value, MarkedError> {
    let node = &graph[id];
    let value = match &node.kind {
        NodeKind::Scalar { .. } => constructor::construct_str(constructor, graph, id)?,
        NodeKind::Sequence { .. } => constructor::construct_seq(constructor, graph, id)?,
        NodeKind::Mapping { .. } => constructor::construct_map(constructor, graph, id)?,
    };
    let object = T::from_yaml(&value).map_err(|problem| {
        MarkedError::new(Stage::Constructor, problem)
            .with_context(format!("while constructing {}", T::TAG), Some(node.start))
            .at(node.start)
    })?;
    Ok(Value::Object(Object::new(T::TAG, object)))
}

fn represent_class<T: YamlClass>(
    representer: &mut Representer<'_>,
    value: &Value,
) -> Result<Child, RepresenterError> {
    let Some(object) = value.as_object::<T>() else {
        return Err(RepresenterError::new(format!(
            "expected an object tagged {}",
            T::TAG
        )));
    };
    let child = representer.represent_data(&object.to_yaml())?;
    representer.set_tag(child.node, T::TAG);
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Int, Str};
    use facet_testhelpers::test;

    #[test]
    fn test_type_key_chain() {
        let caps = Value::Int(Int::new(31).with_format(IntFormat::HexCaps));
        let key = TypeKey::of(&caps);
        assert_eq!(key, TypeKey::HexCapsInt);
        let chain: Vec<_> = std::iter::successors(Some(key), |k| k.parent()).collect();
        assert_eq!(
            chain,
            vec![TypeKey::HexCapsInt, TypeKey::HexInt, TypeKey::Int, TypeKey::Any]
        );
        assert_eq!(TypeKey::of(&Value::Str(Str::literal("x"))).parent(), Some(TypeKey::Str));
    }

    #[test]
    fn test_representer_falls_back_to_ancestor() {
        let registry = Registry::round_trip();
        let exact = registry.representer_for(TypeKey::Int).unwrap();
        let inherited = registry.representer_for(TypeKey::HexCapsInt).unwrap();
        assert!(std::ptr::fn_addr_eq(exact, inherited));
        assert!(Registry::empty().representer_for(TypeKey::Int).is_none());
    }

    #[test]
    fn test_constructor_lookup_order() {
        let mut registry = Registry::round_trip();
        registry.add_multi_constructor("!ex/", constructor::construct_str);
        registry.add_multi_constructor("!ex/deep/", constructor::construct_seq);

        let deep = registry.constructor_for("!ex/deep/thing").unwrap();
        assert!(std::ptr::fn_addr_eq(deep, constructor::construct_seq as ConstructFn));
        let shallow = registry.constructor_for("!ex/thing").unwrap();
        assert!(std::ptr::fn_addr_eq(shallow, constructor::construct_str as ConstructFn));
        let unknown = registry.constructor_for("!other").unwrap();
        assert!(std::ptr::fn_addr_eq(unknown, constructor::construct_undefined as ConstructFn));

        assert!(registry.strict().constructor_for("!other").is_none());
    }
}

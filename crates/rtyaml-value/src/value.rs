//! The host value type.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rtyaml_scanner::Version;

use crate::{Bool, Float, Int, Map, Null, Seq, Str, Tagged, Timestamp};

/// A loaded YAML value.
///
/// Scalars are owned and carry their presentation. Sequences and mappings
/// are shared handles, so a node reached through an alias is the same
/// container at every place it appears, and changes through one path are
/// visible through all of them.
///
/// Equality and hashing look at data only: comments, styles, anchors and
/// literal spellings never take part.
#[derive(Clone)]
pub enum Value {
    Null(Null),
    Bool(Bool),
    Int(Int),
    Float(Float),
    Str(Str),
    Timestamp(Timestamp),
    Seq(Seq),
    Map(Map),
    /// A scalar with a tag that has no constructor.
    Tagged(Tagged),
    /// A host object built by a registered class.
    Object(Object),
}

/// A value of a registered host type, with the tag it was loaded from.
#[derive(Clone)]
pub struct Object {
    pub tag: String,
    pub data: Rc<dyn Any>,
}

impl Object {
    pub fn new<T: Any>(tag: impl Into<String>, data: T) -> Self {
        Self {
            tag: tag.into(),
            data: Rc::new(data),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").field("tag", &self.tag).finish_non_exhaustive()
    }
}

impl Value {
    pub fn null() -> Self {
        Value::Null(Null::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(b.value()),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(i.value()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f.value()),
            Value::Int(i) => Some(i.value() as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&s.value),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&Seq> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => object.downcast_ref(),
            _ => None,
        }
    }

    /// The anchor this value was loaded with or given.
    pub fn anchor(&self) -> Option<String> {
        match self {
            Value::Null(v) => v.anchor.clone(),
            Value::Bool(v) => v.anchor.clone(),
            Value::Int(v) => v.anchor.clone(),
            Value::Float(v) => v.anchor.clone(),
            Value::Str(v) => v.anchor.clone(),
            Value::Timestamp(v) => v.anchor.clone(),
            Value::Tagged(v) => v.anchor.clone(),
            Value::Seq(v) => v.anchor(),
            Value::Map(v) => v.anchor(),
            Value::Object(_) => None,
        }
    }

    pub fn set_anchor(&mut self, anchor: Option<String>) {
        match self {
            Value::Null(v) => v.anchor = anchor,
            Value::Bool(v) => v.anchor = anchor,
            Value::Int(v) => v.anchor = anchor,
            Value::Float(v) => v.anchor = anchor,
            Value::Str(v) => v.anchor = anchor,
            Value::Timestamp(v) => v.anchor = anchor,
            Value::Tagged(v) => v.anchor = anchor,
            Value::Seq(v) => v.set_anchor(anchor),
            Value::Map(v) => v.set_anchor(anchor),
            Value::Object(_) => {}
        }
    }

    /// Scalar text as it would be written under `version`, `None` for
    /// collections and host objects.
    pub fn scalar_text(&self, version: Version) -> Option<String> {
        Some(match self {
            Value::Null(v) => v.literal().unwrap_or("null").to_string(),
            Value::Bool(v) => v.render(),
            Value::Int(v) => v.render(version),
            Value::Float(v) => v.render(),
            Value::Str(v) => v.value.clone(),
            Value::Timestamp(v) => v.render(),
            Value::Tagged(v) => v.value.clone(),
            Value::Seq(_) | Value::Map(_) | Value::Object(_) => return None,
        })
    }

    fn discriminant(&self) -> u8 {
        match self {
            Value::Null(_) => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Str(_) => 4,
            Value::Timestamp(_) => 5,
            Value::Seq(_) => 6,
            Value::Map(_) => 7,
            Value::Tagged(_) => 8,
            Value::Object(_) => 9,
        }
    }
}

/// Float bits with `-0.0` folded into `0.0` and every NaN into one.
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null(_), Value::Null(_)) => true,
            (Value::Bool(a), Value::Bool(b)) => a.value() == b.value(),
            (Value::Int(a), Value::Int(b)) => a.value() == b.value(),
            (Value::Float(a), Value::Float(b)) => float_key(a.value()) == float_key(b.value()),
            (Value::Str(a), Value::Str(b)) => a.value == b.value,
            (Value::Timestamp(a), Value::Timestamp(b)) => a.moment() == b.moment(),
            (Value::Tagged(a), Value::Tagged(b)) => a.tag == b.tag && a.value == b.value,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(&a.data, &b.data),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            Value::Null(_) => {}
            Value::Bool(v) => v.value().hash(state),
            Value::Int(v) => v.value().hash(state),
            Value::Float(v) => float_key(v.value()).hash(state),
            Value::Str(v) => v.value.hash(state),
            Value::Timestamp(v) => v.moment().hash(state),
            Value::Tagged(v) => {
                v.tag.hash(state);
                v.value.hash(state);
            }
            Value::Seq(v) => v.hash(state),
            Value::Map(v) => v.hash(state),
            Value::Object(v) => (Rc::as_ptr(&v.data) as *const () as usize).hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v.value()),
            Value::Int(v) => write!(f, "{}", v.value()),
            Value::Float(v) => write!(f, "{:?}", v.value()),
            Value::Str(v) => write!(f, "{:?}", v.value),
            Value::Timestamp(v) => write!(f, "{:?}", v.moment()),
            Value::Tagged(v) => write!(f, "{} {:?}", v.tag, v.value),
            Value::Seq(v) => fmt::Debug::fmt(v, f),
            Value::Map(v) => fmt::Debug::fmt(v, f),
            Value::Object(v) => fmt::Debug::fmt(v, f),
        }
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(Int::new(value as i128))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64, usize, isize);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(Float::new(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(Bool::new(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Str::new(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Str::new(value))
    }
}

impl From<Str> for Value {
    fn from(value: Str) -> Self {
        Value::Str(value)
    }
}

impl From<Int> for Value {
    fn from(value: Int) -> Self {
        Value::Int(value)
    }
}

impl From<Float> for Value {
    fn from(value: Float) -> Self {
        Value::Float(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Seq> for Value {
    fn from(value: Seq) -> Self {
        Value::Seq(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Tagged> for Value {
    fn from(value: Tagged) -> Self {
        Value::Tagged(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Value::null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;
    use std::collections::HashSet;

    #[test]
    fn test_metadata_is_ignored() {
        let plain = Value::from("x");
        let quoted = Value::Str(Str::double_quoted("x"));
        assert_eq!(plain, quoted);

        let hex = Value::Int(Int::parse("0x1F", Version::V1_2).unwrap());
        assert_eq!(hex, Value::from(31));

        let mut anchored = Value::from(1.5);
        anchored.set_anchor(Some("a".into()));
        assert_eq!(anchored, Value::from(1.5));
    }

    #[test]
    fn test_float_keys() {
        let mut set = HashSet::new();
        set.insert(Value::from(0.0));
        assert!(set.contains(&Value::from(-0.0)));
        set.insert(Value::from(f64::NAN));
        assert!(set.contains(&Value::from(f64::NAN)));
    }

    #[test]
    fn test_kinds_differ() {
        assert_ne!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::from("1"), Value::from(1));
    }

    #[test]
    fn test_object_identity() {
        let object = Object::new("!point", (1, 2));
        let a = Value::Object(object.clone());
        let b = Value::Object(object);
        assert_eq!(a, b);
        assert_eq!(a.as_object::<(i32, i32)>(), Some(&(1, 2)));
        assert_ne!(a, Value::Object(Object::new("!point", (1, 2))));
    }
}

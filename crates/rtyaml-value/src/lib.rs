#![doc = include_str!("../README.md")]

mod int;
pub use int::{Int, IntFormat, Underscore};

mod float;
pub use float::{Float, ParsedFloat};

mod timestamp;
pub use timestamp::{Moment, Timestamp};

mod scalar;
pub use scalar::{Bool, Null, Str, Tagged};

mod collection;
pub use collection::{ItemMeta, Map, MapData, Merge, Meta, Seq, SeqData};

mod value;
pub use value::{Object, Value};

mod registry;
pub use registry::{ConstructFn, Registry, RepresentFn, TypeKey, YamlClass};

mod constructor;
pub use constructor::{Constructor, ConstructorOptions, Policy};

mod representer;
pub use representer::{Representer, RepresenterError};

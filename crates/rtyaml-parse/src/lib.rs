#![doc = include_str!("../README.md")]

pub use rtyaml_scanner::{
    Comment, CommentKind, Mark, MarkedError, ScalarStyle, Stage, TagDirective, Version,
};

mod event;
pub use event::{CommentBundle, Event, EventData, EventKind};

mod parser;
pub use parser::{DEFAULT_TAGS, Parser};

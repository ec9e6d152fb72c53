#![doc = include_str!("../README.md")]

pub use rtyaml_parse::CommentBundle;
pub use rtyaml_scanner::{
    Comment, CommentKind, Mark, MarkedError, ScalarStyle, Stage, Version, Warning, WarningKind,
};

pub mod tag;

mod node;
pub use node::{Child, Document, DocumentInfo, Graph, Kind, Node, NodeId, NodeKind};

mod resolver;
pub use resolver::{IndexCheck, PathElement, Resolver, Step};

mod composer;
pub use composer::{Composer, MAX_DEPTH};

mod diagnostic;
pub use diagnostic::Diagnostic;

/// Compose every document in `source`.
pub fn compose_all(source: &str) -> Result<Vec<Document>, MarkedError> {
    Composer::from_str(source)?.collect()
}

#![doc = include_str!("../README.md")]

mod options;
pub use options::{EmitterOptions, LineBreak};

mod error;
pub use error::{EmitterError, SerializerError};

mod analysis;
pub use analysis::{ScalarAnalysis, analyze_scalar};

mod emitter;
pub use emitter::Emitter;

mod serializer;
pub use serializer::Serializer;

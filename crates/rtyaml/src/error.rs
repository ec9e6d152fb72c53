//! Error type for load and dump.

use std::fmt;
use std::io;

use rtyaml_emit::{EmitterError, SerializerError};
use rtyaml_scanner::MarkedError;
use rtyaml_value::RepresenterError;

/// Any failure of a load or dump.
#[derive(Debug)]
pub enum Error {
    /// Reading, scanning, parsing, composing or constructing failed at a
    /// source position.
    Marked(MarkedError),
    Representer(RepresenterError),
    Serializer(SerializerError),
    Emitter(EmitterError),
    Io(io::Error),
}

impl Error {
    /// The source error, if this one came from loading.
    pub fn as_marked(&self) -> Option<&MarkedError> {
        match self {
            Error::Marked(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Marked(err) => err.fmt(f),
            Error::Representer(err) => err.fmt(f),
            Error::Serializer(err) => err.fmt(f),
            Error::Emitter(err) => err.fmt(f),
            Error::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Marked(err) => Some(err),
            Error::Representer(err) => Some(err),
            Error::Serializer(err) => Some(err),
            Error::Emitter(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<MarkedError> for Error {
    fn from(err: MarkedError) -> Self {
        Error::Marked(err)
    }
}

impl From<RepresenterError> for Error {
    fn from(err: RepresenterError) -> Self {
        Error::Representer(err)
    }
}

impl From<SerializerError> for Error {
    fn from(err: SerializerError) -> Self {
        Error::Serializer(err)
    }
}

impl From<EmitterError> for Error {
    fn from(err: EmitterError) -> Self {
        Error::Emitter(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// Result type for load and dump.
pub type Result<T> = std::result::Result<T, Error>;

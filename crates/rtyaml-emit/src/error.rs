use std::fmt;

/// An event stream the emitter cannot write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterError {
    pub problem: String,
}

impl EmitterError {
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
        }
    }
}

impl fmt::Display for EmitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.problem)
    }
}

impl std::error::Error for EmitterError {}

/// A serializer used out of its open/serialize/close order, or an emitter
/// failure while serializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializerError {
    NotOpened,
    AlreadyOpened,
    Closed,
    Emitter(EmitterError),
}

impl fmt::Display for SerializerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializerError::NotOpened => f.write_str("serializer is not opened"),
            SerializerError::AlreadyOpened => f.write_str("serializer is already opened"),
            SerializerError::Closed => f.write_str("serializer is closed"),
            SerializerError::Emitter(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for SerializerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializerError::Emitter(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EmitterError> for SerializerError {
    fn from(err: EmitterError) -> Self {
        SerializerError::Emitter(err)
    }
}

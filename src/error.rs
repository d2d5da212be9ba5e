//! Error taxonomy shared by the record model, predicate engine, iteration engine and
//! graph builders. Everything is raised to the immediate caller.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed predicate or time-range specification, detected at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A record failed a structural requirement at the point the bad value was touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// A comment's parent reference does not resolve inside its own thread.
    #[error("thread {thread}: comment {comment} replies to unknown parent {parent}")]
    Structural {
        thread: String,
        comment: String,
        parent: String,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural { .. })
    }
}

use std::io;
use thiserror::Error;

/// Failures of the code-based sharing path
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("all {0} share codes are in use")]
    CodeSpaceExhausted(usize),

    #[error("no file associated with code {0}")]
    SessionNotFound(u16),

    #[error("cannot listen on port {code}: {source}")]
    BindConflict {
        code: u16,
        #[source]
        source: io::Error,
    },

    #[error("file name cannot be framed in a header: {0:?}")]
    InvalidFileName(String),

    #[error("malformed transfer header")]
    MalformedHeader,

    #[error(transparent)]
    Io(#[from] io::Error),
}

use crate::store;

/// Errors surfaced by every catalog operation, whatever backend serves it.
///
/// The message is meant to be shown to the user verbatim, the variant tells
/// the caller which kind of failure happened. None of them are retried
/// internally.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// caller supplied data failed a required-field or type check,
    /// detected before any network call
    #[error("{0}")]
    Validation(String),

    /// the file payload is missing or the object store rejected the write
    #[error("{0}")]
    Upload(String),

    /// the row store reported a fault
    #[error("{0}")]
    Backend(String),

    /// the targeted record does not exist
    #[error("{0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Upload,
    Backend,
    NotFound,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Upload(_) => ErrorKind::Upload,
            Error::Backend(_) => ErrorKind::Backend,
            Error::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub(crate) fn worksheet_not_found(id: &str) -> Self {
        Error::NotFound(format!("Worksheet not found: {}", id))
    }
}

impl From<store::Error> for Error {
    fn from(err: store::Error) -> Self {
        Error::Backend(format!("local store error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

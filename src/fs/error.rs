//! Error kinds surfaced by the path filesystem core

use std::time::Duration;
use thiserror::Error;

/// Errors returned by every filesystem operation.
///
/// Store failures are passed through untouched as `Store`; nothing in the
/// core retries them.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("An item already exists at {0}")]
    AlreadyExists(String),

    #[error("Parent of {0} is missing or is not a folder")]
    InvalidParent(String),

    #[error("No data received for {0:?}")]
    Timeout(Duration),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Handle for {0} is already closed")]
    HandleClosed(String),

    #[error("{0} is not a folder")]
    NotAContainer(String),

    #[error("Remote store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Payload-free discriminant of [`FsError`], for callers that translate
/// errors into a protocol's own signalling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    NotFound,
    AlreadyExists,
    InvalidParent,
    Timeout,
    Unsupported,
    HandleClosed,
    NotAContainer,
    TransientStore,
}

impl FsError {
    pub fn kind(&self) -> FsErrorKind {
        match self {
            FsError::NotFound(_) => FsErrorKind::NotFound,
            FsError::AlreadyExists(_) => FsErrorKind::AlreadyExists,
            FsError::InvalidParent(_) => FsErrorKind::InvalidParent,
            FsError::Timeout(_) => FsErrorKind::Timeout,
            FsError::Unsupported(_) => FsErrorKind::Unsupported,
            FsError::HandleClosed(_) => FsErrorKind::HandleClosed,
            FsError::NotAContainer(_) => FsErrorKind::NotAContainer,
            FsError::Store(_) => FsErrorKind::TransientStore,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FsErrorKind::NotFound
    }

    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        FsError::Unsupported(what.into())
    }
}

pub type FsResult<T> = std::result::Result<T, FsError>;

//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use inkstone_manuscript::{ChapterId, SeriesId, WorkId};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// No work is stored under this identifier
    #[display("work not found: {_0}")]
    WorkNotFound(#[error(not(source))] WorkId),
    /// The work exists but has no such chapter
    #[display("chapter not found: {_0}")]
    ChapterNotFound(#[error(not(source))] ChapterId),
    /// No series is stored under this identifier
    #[display("series not found: {_0}")]
    SeriesNotFound(#[error(not(source))] SeriesId),
    /// Body content was saved to a work that is divided into chapters
    #[display("work {_0} is divided into chapters, save a chapter instead")]
    Divided(#[error(not(source))] WorkId),
    /// A stored record could not be read or written
    #[display("invalid record: {}", _0.display())]
    InvalidData(#[error(not(source))] PathBuf),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::BackendError(_))
    }

    /// Returns `true` if the error means something does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::WorkNotFound(_) | Self::ChapterNotFound(_) | Self::SeriesNotFound(_)
        )
    }
}

//! Autosave Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An autosave error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for autosave operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document store did not accept the content. The session stays
    /// dirty and tries again on its next tick.
    #[display("could not persist the document")]
    Persistence,
    /// The editor session has already shut down.
    #[display("editor session is closed")]
    Closed,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence)
    }
}

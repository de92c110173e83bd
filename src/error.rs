//! Application Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Errors from the member crates are raised into these
//! kinds so callers only have one set of categories to act on.

use derive_more::{Display, Error};
use inkstone_manuscript::WorkId;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The work, or the document within it, does not exist
    #[display("work not found: {_0}")]
    NotFound(#[error(not(source))] WorkId),
    /// The document store failed
    #[display("document store failure")]
    Store,
    /// The editor could not save the active document
    #[display("could not save the active document")]
    Save,
    /// The work could not be packaged; nothing was written
    #[display("export failed")]
    ExportFailed,
    /// The finished package could not be written out
    #[display("could not write the exported package")]
    Write,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store | Self::Save | Self::Write)
    }
}

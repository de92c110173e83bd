//! Packaging Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A packaging error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A generated document is not well-formed XML. The named document and the
    /// parser's complaint are included.
    #[display("malformed document {document}: {reason}")]
    MalformedSection {
        document: String,
        reason: String,
    },
    /// The zip container could not be written.
    #[display("could not write the package archive")]
    Archive,
    /// An embedded asset is missing from the binary.
    #[display("embedded asset not found: {_0}")]
    Asset(#[error(not(source))] String),
    /// Package metadata could not be generated.
    #[display("could not generate package metadata")]
    Metadata,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Packaging is deterministic: the same input fails the same way.
        false
    }
}

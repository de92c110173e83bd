//! Storage backend trait and implementations.
//!
//! The `StorageBackend` trait is a unified interface for byte-level storage:
//! the document store keeps its records behind one, and finished packages are
//! written out through another.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::Stream;
use std::path::Path;
use std::pin::Pin;

type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use inkstone_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_record(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("works/w1.json");
///     if backend.exists(path).await? {
///         let data = backend.read(path).await?;
///         Ok(data.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// Stream file metadata matching an optional prefix.
    ///
    /// A prefix is matched per path component, so `works` matches
    /// `works/w1.json` but not `works-old/w1.json`. Listing a prefix that does
    /// not exist yields nothing rather than an error.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents.
    ///
    /// Creates a new file or replaces an existing one. Readers never observe
    /// a partially written file: either the previous contents or the new ones.
    ///
    /// # Notes
    /// - Implementations create parent directories as needed.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use inkstone_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// backend.write(Path::new("chapters/c1.html"), b"<p>first line</p>").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;
}

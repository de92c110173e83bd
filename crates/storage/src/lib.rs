//! Storage for inkstone: byte-level [backends](backend::StorageBackend) and the
//! manuscript [document store](DocumentStore) layered on top of them.

pub mod backend;
mod documents;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::documents::{DocumentStore, Library, StoreHandle};
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;

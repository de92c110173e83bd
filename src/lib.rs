//! Inkstone keeps a writer's manuscript safe while it is being edited and
//! turns it into an EPUB when it is done.
//!
//! [`Inkstone`] wires the pieces together: a [`Library`] document store over
//! a storage backend, an autosaving [`Editor`](inkstone_autosave::Editor) for
//! the one document being worked on, and an [`Exporter`] that packages works.
//! The member crates can also be used on their own.

mod app;
pub mod error;
mod export;

pub use crate::app::Inkstone;
pub use crate::export::Exporter;
pub use inkstone_autosave::{Phase, SessionHandle, Status};
pub use inkstone_config::Config;
pub use inkstone_manuscript::{Chapter, DocumentRef, Series, Work, WorkId};
pub use inkstone_storage::Library;

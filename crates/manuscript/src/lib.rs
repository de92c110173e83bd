//! The manuscript model (series, works and chapters) and its assembly into
//! export-ready sections.

mod assemble;
pub mod models;

pub use crate::assemble::assemble;
pub use crate::models::{
    BODY_SENTINEL, Chapter, ChapterId, DocumentRef, ExportSection, Series, SeriesId, Work, WorkId,
};

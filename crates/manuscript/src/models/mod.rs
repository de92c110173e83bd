mod document;
mod id;
mod work;

pub use self::document::DocumentRef;
pub use self::id::{ChapterId, SeriesId, WorkId};
pub use self::work::{BODY_SENTINEL, Chapter, ExportSection, Series, Work};

use time::OffsetDateTime;

use crate::models::{ChapterId, SeriesId, WorkId};

/// Title reserved for the single chapter of a work that has no chapter
/// subdivision. That chapter holds the whole body, and the work's own title
/// is shown in its place.
pub const BODY_SENTINEL: &str = "__body__";

/// A titled subdivision of a [`Work`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    /// Editor-authored rich text.
    pub content: String,
}
impl Chapter {
    pub fn new(id: impl Into<ChapterId>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// The chapter holding the undivided body of a work.
    pub fn body(id: impl Into<ChapterId>, content: impl Into<String>) -> Self {
        Self::new(id, BODY_SENTINEL, content)
    }

    pub fn is_body(&self) -> bool {
        self.title == BODY_SENTINEL
    }
}

/// A single manuscript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Work {
    pub id: WorkId,
    pub title: String,
    pub genre: String,
    pub created_at: OffsetDateTime,
    /// Cover image as a `data:` URI, if one was chosen.
    pub cover_image: Option<String>,
    /// Reading order, as arranged by the author. Empty until the first words
    /// are written.
    pub chapters: Vec<Chapter>,
}
impl Work {
    pub fn new(
        id: impl Into<WorkId>,
        title: impl Into<String>,
        genre: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genre: genre.into(),
            created_at,
            cover_image: None,
            chapters: Vec::new(),
        }
    }

    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.chapters.push(chapter);
        self
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover_image = Some(cover.into());
        self
    }

    /// Whether the work is split into real chapters, rather than being empty
    /// or holding a single undivided body.
    pub fn is_divided(&self) -> bool {
        self.chapters.iter().any(|chapter| !chapter.is_body())
    }

    /// The chapter holding the undivided body, if there is one.
    pub fn body(&self) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| chapter.is_body())
    }

    pub fn chapter(&self, id: &ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| &chapter.id == id)
    }
}

/// An ordered grouping of works. Never exported as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
    pub works: Vec<Work>,
}

/// An export-ready unit: a display title and sanitized content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSection {
    pub title: String,
    pub content: String,
}

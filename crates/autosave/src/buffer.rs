use inkstone_markup::{TextStats, count};
use time::OffsetDateTime;

/// The editor's in-memory content, with the bookkeeping needed to know what
/// has been persisted.
///
/// Every change bumps the revision. A save carries the revision it was taken
/// at, so a save that completes after further edits leaves the buffer dirty.
#[derive(Debug, Clone)]
pub(crate) struct Buffer {
    content: String,
    revision: u64,
    persisted: u64,
    cursor: usize,
    stats: TextStats,
    last_saved_at: Option<OffsetDateTime>,
}
impl Buffer {
    /// A buffer holding content as loaded from the store, so clean.
    pub(crate) fn new(content: String) -> Self {
        let stats = count(&content);
        Self {
            content,
            revision: 0,
            persisted: 0,
            cursor: 0,
            stats,
            last_saved_at: None,
        }
    }

    /// Replaces the content. Returns `false` if nothing changed.
    pub(crate) fn replace(&mut self, content: String) -> bool {
        if content == self.content {
            return false;
        }
        self.stats = count(&content);
        self.content = content;
        self.revision += 1;
        true
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.revision != self.persisted
    }

    /// The current revision and a copy of its content.
    pub(crate) fn snapshot(&self) -> (u64, String) {
        (self.revision, self.content.clone())
    }

    /// Records that `revision` reached the store at `at`.
    pub(crate) fn mark_persisted(&mut self, revision: u64, at: OffsetDateTime) {
        self.persisted = self.persisted.max(revision);
        self.last_saved_at = Some(at);
    }

    pub(crate) fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn stats(&self) -> TextStats {
        self.stats
    }

    pub(crate) fn last_saved_at(&self) -> Option<OffsetDateTime> {
        self.last_saved_at
    }
}

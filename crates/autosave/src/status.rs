use inkstone_manuscript::DocumentRef;
use inkstone_markup::TextStats;
use time::OffsetDateTime;

use crate::state::Phase;

/// Live figures of an editor session, for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub document: DocumentRef,
    pub phase: Phase,
    /// Whether the buffer holds changes the store has not seen.
    pub dirty: bool,
    pub stats: TextStats,
    /// When content last reached the store in this session.
    pub last_saved_at: Option<OffsetDateTime>,
    pub cursor: usize,
}
impl Status {
    pub fn pages(&self) -> u64 {
        self.stats.pages()
    }

    pub fn reading_minutes(&self) -> u64 {
        self.stats.reading_minutes()
    }
}

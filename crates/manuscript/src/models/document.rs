use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::models::{ChapterId, WorkId};

/// Address of the document open in the editor: a chapter of a work, or the
/// work's undivided body when `chapter` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub work: WorkId,
    pub chapter: Option<ChapterId>,
}
impl DocumentRef {
    pub fn body(work: impl Into<WorkId>) -> Self {
        Self {
            work: work.into(),
            chapter: None,
        }
    }

    pub fn chapter(work: impl Into<WorkId>, chapter: impl Into<ChapterId>) -> Self {
        Self {
            work: work.into(),
            chapter: Some(chapter.into()),
        }
    }
}
impl Display for DocumentRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.chapter {
            Some(chapter) => write!(f, "{}/{chapter}", self.work),
            None => write!(f, "{}", self.work),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DocumentRef::body("w1").to_string(), "w1");
        assert_eq!(DocumentRef::chapter("w1", "c2").to_string(), "w1/c2");
    }
}

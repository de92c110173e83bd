use inkstone_markup::sanitize;
use tracing::instrument;

use crate::models::{ExportSection, Work};

/// Turns a work into its export sections, in reading order.
///
/// - A work without chapters becomes a single empty section titled after the
///   work.
/// - The undivided body chapter is titled after the work; its sentinel title
///   is never shown.
/// - Otherwise there is one section per chapter, titled verbatim.
///
/// Every section's content is [sanitized](inkstone_markup::sanitize). The
/// work itself is left untouched.
#[instrument(skip(work), fields(work = %work.id, chapters = work.chapters.len()))]
pub fn assemble(work: &Work) -> Vec<ExportSection> {
    if work.chapters.is_empty() {
        return vec![ExportSection {
            title: work.title.clone(),
            content: sanitize(""),
        }];
    }
    let sections: Vec<ExportSection> = work
        .chapters
        .iter()
        .map(|chapter| ExportSection {
            title: if chapter.is_body() { work.title.clone() } else { chapter.title.clone() },
            content: sanitize(&chapter.content),
        })
        .collect();
    tracing::debug!(sections = sections.len(), "assembled manuscript");
    sections
}

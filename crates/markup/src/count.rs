//! Character accounting over rich-text content.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use scraper::{ElementRef, Html, Node};
use tracing::instrument;

use crate::consts;

/// Character counts of a piece of content, with the derived manuscript
/// figures computed on demand.
///
/// Counts are additive: the stats of several sections summed together equal
/// the stats of the sections concatenated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextStats {
    /// Every character of the text content, whitespace included.
    pub total: u64,
    /// Characters of the text content that are not whitespace.
    pub no_spaces: u64,
}
impl TextStats {
    /// Non-whitespace characters on one manuscript page.
    pub const CHARS_PER_PAGE: u64 = 200;
    /// Non-whitespace characters read in one minute.
    pub const CHARS_PER_MINUTE: u64 = 2800;

    /// Estimated manuscript pages: `ceil(no_spaces / 200)`.
    pub fn pages(&self) -> u64 {
        self.no_spaces.div_ceil(Self::CHARS_PER_PAGE)
    }

    /// Estimated reading time: `max(1, round(no_spaces / 2800))`, halves
    /// rounding up.
    pub fn reading_minutes(&self) -> u64 {
        ((self.no_spaces + Self::CHARS_PER_MINUTE / 2) / Self::CHARS_PER_MINUTE).max(1)
    }
}
impl Add for TextStats {
    type Output = TextStats;
    fn add(self, rhs: Self) -> Self::Output {
        TextStats {
            total: self.total + rhs.total,
            no_spaces: self.no_spaces + rhs.no_spaces,
        }
    }
}
impl AddAssign for TextStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl Sum for TextStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(TextStats::default(), Add::add)
    }
}

/// Counts the characters of rich-text content.
///
/// Only text counts: tags are ignored, entities count as the character they
/// stand for, and non-prose elements (`<script>`, `<style>`, ...) are skipped.
/// Characters XML does not allow are not counted, and content with no
/// element and nothing but whitespace counts as empty. Raw content therefore
/// counts the same as its [`sanitize()`](crate::sanitize)d form.
///
/// # Examples
///
/// ```
/// use inkstone_markup::count;
///
/// let stats = count("<p>Tom &amp; Jerry</p>");
/// assert_eq!(stats.total, 11);
/// assert_eq!(stats.no_spaces, 9);
/// assert_eq!(stats.pages(), 1);
/// assert_eq!(stats.reading_minutes(), 1);
/// ```
#[instrument(level = "trace", skip(content), fields(content_size = content.len()))]
pub fn count(content: &str) -> TextStats {
    if content.is_empty() {
        return TextStats::default();
    }
    let fragment = Html::parse_fragment(content);
    let mut stats = TextStats::default();
    let has_elements = count_children(&mut stats, fragment.root_element());
    if !has_elements && stats.no_spaces == 0 {
        // Sanitizes to an empty paragraph.
        return TextStats::default();
    }
    stats
}

/// Counts the characters of plain text (no markup interpretation).
pub fn count_text(text: &str) -> TextStats {
    let mut stats = TextStats::default();
    for c in text.chars().filter(|&c| consts::is_xml_char(c)) {
        stats.total += 1;
        if !c.is_whitespace() {
            stats.no_spaces += 1;
        }
    }
    stats
}

/// Returns whether any element below `parent` survives sanitizing.
fn count_children(stats: &mut TextStats, parent: ElementRef<'_>) -> bool {
    let mut has_elements = false;
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => *stats += count_text(text),
            Node::Element(element) => {
                let name = element.name();
                if consts::is_raw_text(name) || (name == "img" && consts::is_inline_payload(element.attr("src"))) {
                    continue;
                }
                has_elements |= consts::is_xml_name(name);
                if let Some(element) = ElementRef::wrap(child) {
                    has_elements |= count_children(stats, element);
                }
            },
            _ => {},
        }
    }
    has_elements
}

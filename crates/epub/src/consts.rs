use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

pub(crate) const MIMETYPE: &str = "application/epub+zip";
pub(crate) const LANGUAGE: &str = "ko";

pub(crate) const CONTAINER_PATH: &str = "META-INF/container.xml";
pub(crate) const PACKAGE_PATH: &str = "OEBPS/content.opf";
pub(crate) const NAV_PATH: &str = "OEBPS/nav.xhtml";
pub(crate) const NCX_PATH: &str = "OEBPS/toc.ncx";
pub(crate) const STYLESHEET_PATH: &str = "OEBPS/styles/book.css";
pub(crate) const STYLESHEET_ASSET: &str = "book.css";

/// Custom metadata vocabulary for manuscript statistics.
pub(crate) const VOCABULARY_PREFIX: &str = "inkstone: urn:inkstone:vocabulary#";

// `data:<image type>;base64,<payload>`; the payload may be wrapped over lines.
regex!(COVER_REGEX, r"(?s)^data:(image/(?:png|jpeg|jpg|gif|webp|svg\+xml));base64,(.+)$");

/// Reading-order file name of the section at `index` (zero based).
pub(crate) fn section_file(index: usize) -> String {
    format!("section-{:03}.xhtml", index + 1)
}

/// Manifest id of the section at `index` (zero based).
pub(crate) fn section_id(index: usize) -> String {
    format!("section-{:03}", index + 1)
}

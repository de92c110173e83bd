use std::io::{Cursor, Write};

use exn::ResultExt;
use inkstone_manuscript::ExportSection;
use inkstone_markup::{EMPTY_BODY, TextStats};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::instrument;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::assets::Builtins;
use crate::consts::{self, CONTAINER_PATH, MIMETYPE, NAV_PATH, NCX_PATH, PACKAGE_PATH, STYLESHEET_ASSET, STYLESHEET_PATH};
use crate::cover::Cover;
use crate::document::{self, PackageMetadata};
use crate::error::{ErrorKind, Result};
use crate::identifier::identifier;
use crate::validate::well_formed;

/// Book-level metadata for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInfo {
    pub title: String,
    pub genre: String,
    pub created_at: OffsetDateTime,
    /// Character counts over every section's content.
    pub stats: TextStats,
}
impl BookInfo {
    /// The synthesized description, e.g. `추리 장르의 작품입니다.`
    pub fn description(&self) -> String {
        format!("{} 장르의 작품입니다.", self.genre)
    }
}

/// Builds an EPUB package from sections in reading order.
///
/// The cover, if given, must be a `data:image/<type>;base64,<payload>` URI;
/// anything else is skipped with a warning. Identical input yields an
/// identical package, byte for byte.
///
/// # Errors
///
/// - [`MalformedSection`](ErrorKind::MalformedSection) if a generated document
///   is not well-formed XML (which only happens for hand-built sections that
///   bypassed sanitization),
/// - [`Archive`](ErrorKind::Archive) if the zip container cannot be written.
///
/// No partial package is ever returned.
///
/// # Examples
///
/// ```
/// use inkstone_epub::{BookInfo, build};
/// use inkstone_manuscript::ExportSection;
/// use inkstone_markup::count;
/// use time::macros::datetime;
///
/// let sections = [ExportSection { title: "1장".into(), content: "<p>첫 문장</p>".into() }];
/// let info = BookInfo {
///     title: "바다".into(),
///     genre: "추리".into(),
///     created_at: datetime!(2024-05-01 08:30 UTC),
///     stats: count(&sections[0].content),
/// };
/// let package = build(&info, None, &sections).unwrap();
/// assert!(package.starts_with(b"PK"));
/// ```
#[instrument(skip(info, cover, sections), fields(title = %info.title, sections = sections.len(), cover = cover.is_some()))]
pub fn build(info: &BookInfo, cover: Option<&str>, sections: &[ExportSection]) -> Result<Vec<u8>> {
    let placeholder;
    let sections = if sections.is_empty() {
        placeholder = [ExportSection {
            title: info.title.clone(),
            content: EMPTY_BODY.to_string(),
        }];
        &placeholder[..]
    } else {
        sections
    };
    let cover = cover.and_then(Cover::from_data_uri);

    let identifier = identifier(&info.title, info.created_at);
    let date = info
        .created_at
        .to_offset(UtcOffset::UTC)
        .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"))
        .or_raise(|| ErrorKind::Metadata)?;
    let description = info.description();
    let metadata = PackageMetadata {
        identifier: &identifier,
        title: &info.title,
        description: &description,
        genre: &info.genre,
        date: &date,
        characters: info.stats.total,
        characters_no_spaces: info.stats.no_spaces,
        pages: info.stats.pages(),
        reading_minutes: info.stats.reading_minutes(),
    };
    let titles: Vec<&str> = sections.iter().map(|section| section.title.as_str()).collect();

    let mut documents: Vec<(String, String)> = Vec::with_capacity(sections.len() + 3);
    documents.push((PACKAGE_PATH.to_string(), document::package(&metadata, cover.as_ref(), sections.len())));
    documents.push((NAV_PATH.to_string(), document::nav(&info.title, &titles)));
    documents.push((NCX_PATH.to_string(), document::ncx(&identifier, &info.title, &titles)));
    for (index, section) in sections.iter().enumerate() {
        let path = format!("OEBPS/text/{}", consts::section_file(index));
        documents.push((path, document::section(index, &section.title, &section.content)));
    }
    for (path, text) in &documents {
        if let Err(reason) = well_formed(text) {
            tracing::warn!(document = %path, %reason, "generated document is not well-formed");
            exn::bail!(ErrorKind::MalformedSection {
                document: path.clone(),
                reason,
            });
        }
    }

    let stylesheet = Builtins::load(STYLESHEET_ASSET)?;
    let package = write_archive(&documents, &stylesheet, cover.as_ref())?;
    tracing::debug!(size = package.len(), "built package");
    Ok(package)
}

fn write_archive(documents: &[(String, String)], stylesheet: &[u8], cover: Option<&Cover>) -> Result<Vec<u8>> {
    // A fixed timestamp keeps the archive reproducible.
    let stored = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    // The mimetype must come first, uncompressed, for readers to sniff it.
    zip.start_file("mimetype", stored).or_raise(|| ErrorKind::Archive)?;
    zip.write_all(MIMETYPE.as_bytes()).or_raise(|| ErrorKind::Archive)?;
    zip.start_file(CONTAINER_PATH, deflated).or_raise(|| ErrorKind::Archive)?;
    zip.write_all(document::CONTAINER_XML.as_bytes()).or_raise(|| ErrorKind::Archive)?;
    for (path, text) in documents {
        zip.start_file(path.as_str(), deflated).or_raise(|| ErrorKind::Archive)?;
        zip.write_all(text.as_bytes()).or_raise(|| ErrorKind::Archive)?;
    }
    zip.start_file(STYLESHEET_PATH, deflated).or_raise(|| ErrorKind::Archive)?;
    zip.write_all(stylesheet).or_raise(|| ErrorKind::Archive)?;
    if let Some(cover) = cover {
        // Images are already compressed.
        zip.start_file(format!("OEBPS/images/{}", cover.file_name()), stored).or_raise(|| ErrorKind::Archive)?;
        zip.write_all(&cover.data).or_raise(|| ErrorKind::Archive)?;
    }
    let cursor = zip.finish().or_raise(|| ErrorKind::Archive)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use inkstone_markup::count;
    use std::io::Read;
    use time::macros::datetime;
    use zip::ZipArchive;

    fn sections(titles: &[&str]) -> Vec<ExportSection> {
        titles
            .iter()
            .map(|title| ExportSection {
                title: title.to_string(),
                content: format!("<p>{title} 본문</p>"),
            })
            .collect()
    }

    fn info(sections: &[ExportSection]) -> BookInfo {
        BookInfo {
            title: "바다".to_string(),
            genre: "추리".to_string(),
            created_at: datetime!(2024-05-01 17:30:15.250 +9),
            stats: sections.iter().map(|section| count(&section.content)).sum(),
        }
    }

    fn archive(package: Vec<u8>) -> ZipArchive<Cursor<Vec<u8>>> {
        ZipArchive::new(Cursor::new(package)).unwrap()
    }

    fn read(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_layout() {
        let sections = sections(&["1장", "2장"]);
        let mut archive = archive(build(&info(&sections), None, &sections).unwrap());
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"OEBPS/text/section-001.xhtml"));
        assert!(names.contains(&"OEBPS/text/section-002.xhtml"));
        assert!(names.contains(&"OEBPS/styles/book.css"));
        assert!(!names.iter().any(|name| name.starts_with("OEBPS/images/")));

        let mimetype = archive.by_index(0).unwrap();
        assert_eq!(mimetype.name(), "mimetype");
        assert_eq!(mimetype.compression(), CompressionMethod::Stored);
        drop(mimetype);
        assert_eq!(read(&mut archive, "mimetype"), MIMETYPE);
        assert!(read(&mut archive, CONTAINER_PATH).contains("OEBPS/content.opf"));
    }

    #[test]
    fn test_stylesheet_is_shared() {
        let sections = sections(&["1장", "2장", "3장"]);
        let mut archive = archive(build(&info(&sections), None, &sections).unwrap());
        let stylesheets = archive.file_names().filter(|name| name.ends_with(".css")).count();
        assert_eq!(stylesheets, 1);
        assert!(read(&mut archive, "OEBPS/text/section-003.xhtml").contains("href=\"../styles/book.css\""));
    }

    #[test]
    fn test_reading_order() {
        let sections = sections(&["하나", "둘", "셋"]);
        let mut archive = archive(build(&info(&sections), None, &sections).unwrap());
        let nav = read(&mut archive, NAV_PATH);
        let positions: Vec<usize> = ["하나", "둘", "셋"].iter().map(|title| nav.find(title).unwrap()).collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        let ncx = read(&mut archive, NCX_PATH);
        assert!(ncx.contains(r#"<navPoint id="nav-3" playOrder="3">"#));
        assert!(read(&mut archive, "OEBPS/text/section-002.xhtml").contains("<h1>둘</h1>"));
    }

    #[test]
    fn test_metadata() {
        let sections = sections(&["1장"]);
        let info = info(&sections);
        let mut archive = archive(build(&info, None, &sections).unwrap());
        let opf = read(&mut archive, PACKAGE_PATH);
        assert!(opf.contains("<dc:title>바다</dc:title>"));
        assert!(opf.contains("<dc:description>추리 장르의 작품입니다.</dc:description>"));
        assert!(opf.contains("<dc:language>ko</dc:language>"));
        assert!(opf.contains("<dc:date>2024-05-01T08:30:15Z</dc:date>"));
        assert!(opf.contains(r#"<meta property="dcterms:modified">2024-05-01T08:30:15Z</meta>"#));
        assert!(opf.contains(&identifier("바다", info.created_at)));
        assert!(opf.contains(&format!(r#"<meta property="inkstone:pages">{}</meta>"#, info.stats.pages())));
        assert!(opf.contains(&format!(
            r#"<meta property="inkstone:characters-no-spaces">{}</meta>"#,
            info.stats.no_spaces
        )));
        assert!(!opf.contains("dc:creator"));
    }

    #[test]
    fn test_cover_is_packaged() {
        let sections = sections(&["1장"]);
        let payload = STANDARD.encode(b"\x89PNG\r\n\x1a\nfake");
        let uri = format!("data:image/png;base64,{payload}");
        let mut archive = archive(build(&info(&sections), Some(&uri), &sections).unwrap());
        let mut data = Vec::new();
        archive.by_name("OEBPS/images/cover.png").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, STANDARD.decode(&payload).unwrap());
        let opf = read(&mut archive, PACKAGE_PATH);
        assert!(opf.contains(r#"href="images/cover.png" media-type="image/png" properties="cover-image""#));
    }

    #[test]
    fn test_unusable_cover_is_skipped() {
        let sections = sections(&["1장"]);
        let mut archive = archive(build(&info(&sections), Some("not a data uri"), &sections).unwrap());
        assert!(!archive.file_names().any(|name| name.starts_with("OEBPS/images/")));
        assert!(!read(&mut archive, PACKAGE_PATH).contains("cover-image"));
    }

    #[test]
    fn test_deterministic() {
        let sections = sections(&["1장", "2장"]);
        let info = info(&sections);
        let cover = "data:image/png;base64,Zm9v";
        assert_eq!(build(&info, Some(cover), &sections).unwrap(), build(&info, Some(cover), &sections).unwrap());
    }

    #[test]
    fn test_malformed_section_fails() {
        let sections = [ExportSection {
            title: "broken".to_string(),
            content: "<p>a&nbsp;b</p>".to_string(),
        }];
        let err = build(&info(&sections), None, &sections).unwrap_err();
        assert!(matches!(
            &*err,
            ErrorKind::MalformedSection { document, .. } if document == "OEBPS/text/section-001.xhtml"
        ));
        let sections = [ExportSection {
            title: "unbalanced".to_string(),
            content: "<p><b>x</p>".to_string(),
        }];
        assert!(build(&info(&sections), None, &sections).is_err());
    }

    #[test]
    fn test_undeclared_prefix_fails() {
        let sections = [ExportSection {
            title: "pasted".to_string(),
            content: "<p>a<o:p></o:p></p>".to_string(),
        }];
        let err = build(&info(&sections), None, &sections).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedSection { .. }));
    }

    #[test]
    fn test_control_characters_in_titles_still_build() {
        let sections = [ExportSection {
            title: "제목\u{1}\u{FFFE}".to_string(),
            content: "<p>본문</p>".to_string(),
        }];
        let mut archive = archive(build(&info(&sections), None, &sections).unwrap());
        let section = read(&mut archive, "OEBPS/text/section-001.xhtml");
        assert!(section.contains("<h1>제목</h1>"));
    }

    #[test]
    fn test_no_sections_still_makes_a_book() {
        let mut archive = archive(build(&info(&[]), None, &[]).unwrap());
        assert!(read(&mut archive, "OEBPS/text/section-001.xhtml").contains("<h1>바다</h1>"));
    }
}

//! Text of the generated package documents.

use std::borrow::Cow;

use inkstone_markup::is_xml_char;

use crate::consts::{self, LANGUAGE, VOCABULARY_PREFIX};
use crate::cover::Cover;

pub(crate) const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Everything the package document needs to know about the book.
pub(crate) struct PackageMetadata<'a> {
    pub identifier: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub genre: &'a str,
    /// UTC, second precision, `YYYY-MM-DDThh:mm:ssZ`.
    pub date: &'a str,
    pub characters: u64,
    pub characters_no_spaces: u64,
    pub pages: u64,
    pub reading_minutes: u64,
}

/// Escapes `text` for XML, dropping characters XML does not allow.
fn escape(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        return quick_xml::escape::escape(text);
    }
    let text: String = text.chars().filter(|&c| is_xml_char(c)).collect();
    Cow::Owned(quick_xml::escape::escape(text).into_owned())
}

/// One reading-order XHTML document.
pub(crate) fn section(index: usize, title: &str, content: &str) -> String {
    let title = escape(title);
    let id = consts::section_id(index);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{LANGUAGE}" lang="{LANGUAGE}">
<head>
<title>{title}</title>
<link rel="stylesheet" type="text/css" href="../styles/book.css"/>
</head>
<body>
<section epub:type="chapter" id="{id}">
<h1>{title}</h1>
{content}
</section>
</body>
</html>
"#
    )
}

/// The EPUB 3 navigation document.
pub(crate) fn nav(book_title: &str, titles: &[&str]) -> String {
    let mut entries = String::new();
    for (index, title) in titles.iter().enumerate() {
        entries.push_str(&format!(
            "      <li><a href=\"text/{}\">{}</a></li>\n",
            consts::section_file(index),
            escape(*title)
        ));
    }
    let book_title = escape(book_title);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{LANGUAGE}" lang="{LANGUAGE}">
<head>
<title>{book_title}</title>
<link rel="stylesheet" type="text/css" href="styles/book.css"/>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>목차</h1>
    <ol>
{entries}    </ol>
  </nav>
</body>
</html>
"#
    )
}

/// The EPUB 2 table of contents, for readers that predate navigation
/// documents.
pub(crate) fn ncx(identifier: &str, book_title: &str, titles: &[&str]) -> String {
    let mut points = String::new();
    for (index, title) in titles.iter().enumerate() {
        let order = index + 1;
        points.push_str(&format!(
            r#"    <navPoint id="nav-{order}" playOrder="{order}">
      <navLabel><text>{}</text></navLabel>
      <content src="text/{}"/>
    </navPoint>
"#,
            escape(*title),
            consts::section_file(index)
        ));
    }
    let identifier = escape(identifier);
    let book_title = escape(book_title);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1" xml:lang="{LANGUAGE}">
  <head>
    <meta name="dtb:uid" content="{identifier}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle><text>{book_title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#
    )
}

/// The package document: metadata, manifest and spine.
pub(crate) fn package(metadata: &PackageMetadata<'_>, cover: Option<&Cover>, sections: usize) -> String {
    let mut meta = String::new();
    meta.push_str(&format!("    <dc:identifier id=\"book-id\">{}</dc:identifier>\n", escape(metadata.identifier)));
    meta.push_str(&format!("    <dc:title>{}</dc:title>\n", escape(metadata.title)));
    meta.push_str(&format!("    <dc:language>{LANGUAGE}</dc:language>\n"));
    meta.push_str(&format!("    <dc:description>{}</dc:description>\n", escape(metadata.description)));
    meta.push_str(&format!("    <dc:subject>{}</dc:subject>\n", escape(metadata.genre)));
    meta.push_str(&format!("    <dc:date>{}</dc:date>\n", metadata.date));
    meta.push_str(&format!("    <meta property=\"dcterms:modified\">{}</meta>\n", metadata.date));
    meta.push_str(&format!("    <meta property=\"inkstone:characters\">{}</meta>\n", metadata.characters));
    meta.push_str(&format!(
        "    <meta property=\"inkstone:characters-no-spaces\">{}</meta>\n",
        metadata.characters_no_spaces
    ));
    meta.push_str(&format!("    <meta property=\"inkstone:pages\">{}</meta>\n", metadata.pages));
    meta.push_str(&format!("    <meta property=\"inkstone:reading-minutes\">{}</meta>\n", metadata.reading_minutes));
    if cover.is_some() {
        meta.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }

    let mut manifest = String::new();
    manifest.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    manifest.push_str("    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n");
    manifest.push_str("    <item id=\"style\" href=\"styles/book.css\" media-type=\"text/css\"/>\n");
    if let Some(cover) = cover {
        manifest.push_str(&format!(
            "    <item id=\"cover-image\" href=\"images/{}\" media-type=\"{}\" properties=\"cover-image\"/>\n",
            cover.file_name(),
            cover.media_type
        ));
    }
    let mut spine = String::new();
    for index in 0..sections {
        let id = consts::section_id(index);
        manifest.push_str(&format!(
            "    <item id=\"{id}\" href=\"text/{}\" media-type=\"application/xhtml+xml\"/>\n",
            consts::section_file(index)
        ));
        spine.push_str(&format!("    <itemref idref=\"{id}\"/>\n"));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="book-id" xml:lang="{LANGUAGE}" prefix="{VOCABULARY_PREFIX}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
{meta}  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#
    )
}

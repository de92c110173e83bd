//! Normalization of editor markup into portable XHTML.

use scraper::{ElementRef, Html, Node};
use tracing::instrument;

use crate::consts::{self, EDITOR_ATTRIBUTE_PREFIX, LEADING_NEWLINE_ELEMENTS, is_xml_char};

/// Sanitized form of an empty document. Packaged sections must contain at
/// least one block element.
pub const EMPTY_BODY: &str = "<p></p>";

/// Normalizes editor-authored rich text into a strict, portable XHTML subset.
///
/// The markup is parsed into a tree (with the same error recovery a browser
/// applies) and written back out, applying these rules in order:
///
/// 1. void elements such as `<br>` and `<hr>` are written self-closed,
/// 2. attributes in the `data-` namespace are dropped,
/// 3. images whose `src` is an inline base64 payload are dropped, any other
///    image is kept untouched,
/// 4. every remaining element that cannot have content is written self-closed;
///    stray closing tags (`<img ...></img>`) disappear.
///
/// Comments and non-prose elements (`<script>`, `<style>`, ...) are dropped
/// along with their content. Namespace-prefixed elements (`<o:p>`) lose their
/// wrapper and prefixed attributes are dropped, `xml:lang` and `xml:space`
/// excepted. Text and attribute values are escaped for XML, and characters
/// XML does not allow are removed.
///
/// This never fails: broken markup degrades to whatever the parser recovers.
/// Input that leaves nothing but whitespace becomes [`EMPTY_BODY`]. Sanitizing
/// already-sanitized markup returns it unchanged.
///
/// # Examples
///
/// ```
/// use inkstone_markup::sanitize;
///
/// let raw = r#"<p data-id="7">one<br>two</p><img src="data:image/png;base64,Zm9v">"#;
/// assert_eq!(sanitize(raw), "<p>one<br/>two</p>");
/// assert_eq!(sanitize("   "), "<p></p>");
/// ```
#[instrument(level = "trace", skip(raw), fields(raw_size = raw.len()))]
pub fn sanitize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return EMPTY_BODY.to_string();
    }
    let fragment = Html::parse_fragment(raw);
    let mut out = String::with_capacity(raw.len());
    write_children(&mut out, fragment.root_element());
    if out.trim().is_empty() {
        return EMPTY_BODY.to_string();
    }
    out
}

fn write_children(out: &mut String, parent: ElementRef<'_>) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => escape_into(out, text, false),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(out, element);
                }
            },
            // Comments, doctypes and processing instructions carry nothing
            // worth keeping.
            _ => {},
        }
    }
}

fn write_element(out: &mut String, element: ElementRef<'_>) {
    let name = element.value().name();
    if consts::is_raw_text(name) {
        return;
    }
    if name == "img" && consts::is_inline_payload(element.value().attr("src")) {
        return;
    }
    if !consts::is_xml_name(name) {
        // Unrepresentable tag: keep what's inside, lose the wrapper.
        write_children(out, element);
        return;
    }

    let mut attributes: Vec<(&str, &str)> = element
        .value()
        .attrs()
        .filter(|(key, _)| !key.starts_with(EDITOR_ATTRIBUTE_PREFIX) && consts::is_xml_attribute(key))
        .collect();
    attributes.sort_unstable_by(|a, b| a.0.cmp(b.0));

    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_into(out, value, true);
        out.push('"');
    }
    if consts::is_void(name) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    let start = out.len();
    write_children(out, element);
    // The parser eats one newline after `<pre>`; write an extra one so the
    // next parse gets back the same text.
    if LEADING_NEWLINE_ELEMENTS.contains(&name) && out[start..].starts_with('\n') {
        out.insert(start, '\n');
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c if is_xml_char(c) => out.push(c),
            _ => {},
        }
    }
}

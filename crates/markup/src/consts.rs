/// Elements that never have content and must be written self-closed.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Elements whose content is not prose. They are dropped from sanitized output
/// and never contribute to character counts.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] =
    &["script", "style", "template", "iframe", "noscript", "noembed", "noframes", "xmp", "plaintext"];

/// Elements where an HTML parser discards a single newline directly after the
/// start tag.
pub(crate) const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

/// Attribute namespace reserved for editor-internal bookkeeping.
pub(crate) const EDITOR_ATTRIBUTE_PREFIX: &str = "data-";

/// Prefixed attributes that need no namespace declaration. Every other prefix
/// (`o:`, `v:`, `w:` from office pastes) is unbound in a standalone document.
pub(crate) const XML_ATTRIBUTES: &[&str] = &["xml:lang", "xml:space"];

pub(crate) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(crate) fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Whether `name` can be written as an unprefixed XML element or attribute
/// name.
///
/// The HTML tokenizer happily accepts names such as `a"b` or `o:p`; neither
/// survives a namespace-aware XML parser.
pub(crate) fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

pub(crate) fn is_xml_attribute(name: &str) -> bool {
    is_xml_name(name) || XML_ATTRIBUTES.contains(&name)
}

/// Whether `c` may appear in an XML 1.0 document at all, escaped or not.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | ' '..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

/// Whether an image source embeds its binary data (`data:...;base64,...`).
pub(crate) fn is_inline_payload(src: Option<&str>) -> bool {
    let Some(src) = src else {
        return false;
    };
    let src = src.trim_start();
    src.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
        && src.split_once(',').is_some_and(|(header, _)| header.to_ascii_lowercase().ends_with(";base64"))
}

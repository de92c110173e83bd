//! XML well-formedness checks for generated documents.
//!
//! Readers reject a package outright when a single document fails to parse,
//! so every document is checked before it goes into the archive.

use inkstone_markup::is_xml_char;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

/// Entities XML defines without a DTD.
const PREDEFINED_ENTITIES: &[&[u8]] = &[b"amp", b"lt", b"gt", b"quot", b"apos"];

/// Checks that `document` is a well-formed, namespace-well-formed XML
/// document: balanced and properly nested tags, a single root element,
/// well-formed attributes, declared namespace prefixes, only characters XML
/// allows, and only predefined or numeric character references.
///
/// Returns the reason the document was rejected.
pub(crate) fn well_formed(document: &str) -> Result<(), String> {
    let mut reader = NsReader::from_str(document);
    reader.config_mut().check_end_names = true;
    let mut depth = 0usize;
    let mut roots = 0usize;
    loop {
        let event = match reader.read_resolved_event() {
            Ok((ResolveResult::Unknown(prefix), _)) => return Err(unbound(&prefix)),
            Ok((_, event)) => event,
            Err(err) => return Err(err.to_string()),
        };
        match event {
            Event::Start(start) => {
                check_attributes(&reader, &start)?;
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            },
            Event::Empty(empty) => {
                check_attributes(&reader, &empty)?;
                if depth == 0 {
                    roots += 1;
                }
            },
            Event::End(_) => {
                if depth == 0 {
                    return Err("closing tag without an opening tag".to_string());
                }
                depth -= 1;
            },
            Event::Text(text) => {
                if text.contains(&b'&') {
                    return Err("unescaped ampersand".to_string());
                }
                check_characters(&text)?;
                if depth == 0 && !text.iter().all(u8::is_ascii_whitespace) {
                    return Err("text outside the root element".to_string());
                }
            },
            Event::GeneralRef(reference) => {
                if !is_known_reference(&reference) {
                    return Err(format!("undefined entity &{};", String::from_utf8_lossy(&reference)));
                }
                if depth == 0 {
                    return Err("text outside the root element".to_string());
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    if depth != 0 {
        return Err(format!("{depth} element(s) left open"));
    }
    if roots != 1 {
        return Err(format!("expected one root element, found {roots}"));
    }
    Ok(())
}

fn unbound(prefix: &[u8]) -> String {
    format!("unbound prefix {:?}", String::from_utf8_lossy(prefix))
}

fn check_attributes(reader: &NsReader<&[u8]>, element: &BytesStart<'_>) -> Result<(), String> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|err| err.to_string())?;
        if let (ResolveResult::Unknown(prefix), _) = reader.resolver().resolve_attribute(attribute.key) {
            return Err(unbound(&prefix));
        }
        check_characters(&attribute.value)?;
        check_references(&attribute.value)?;
    }
    Ok(())
}

fn check_characters(raw: &[u8]) -> Result<(), String> {
    match String::from_utf8_lossy(raw).chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(format!("character {c:?} is not allowed in XML")),
        None => Ok(()),
    }
}

/// Checks every `&...;` reference in raw (still escaped) text.
fn check_references(raw: &[u8]) -> Result<(), String> {
    let mut rest = raw;
    while let Some(start) = rest.iter().position(|&b| b == b'&') {
        rest = &rest[start + 1..];
        let Some(end) = rest.iter().position(|&b| b == b';') else {
            return Err("unescaped ampersand".to_string());
        };
        if !is_known_reference(&rest[..end]) {
            return Err(format!("undefined entity &{};", String::from_utf8_lossy(&rest[..end])));
        }
        rest = &rest[end + 1..];
    }
    Ok(())
}

/// Whether `name` (without `&` and `;`) is a predefined entity or a
/// character reference to a character XML allows.
fn is_known_reference(name: &[u8]) -> bool {
    if PREDEFINED_ENTITIES.contains(&name) {
        return true;
    }
    let Some(number) = name.strip_prefix(b"#") else {
        return false;
    };
    let Ok(number) = std::str::from_utf8(number) else {
        return false;
    };
    let code = match number.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => number.parse::<u32>(),
    };
    code.ok()
        .and_then(char::from_u32)
        .is_some_and(is_xml_char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("<html/>")]
    #[case("<?xml version=\"1.0\"?>\n<!DOCTYPE html>\n<html><body><p>a<br/>b</p></body></html>\n")]
    #[case("<p>Tom &amp; Jerry &lt;3 &#xAC00; &#44032;</p>")]
    #[case("<p title=\"a &quot;b&quot;\">x</p>")]
    #[case("<p><!-- note --></p>")]
    #[case("<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" xml:lang=\"ko\"><nav epub:type=\"toc\"/></html>")]
    #[case("<p xml:space=\"preserve\">a</p>")]
    fn test_well_formed(#[case] document: &str) {
        assert_eq!(well_formed(document), Ok(()));
    }

    #[rstest]
    #[case("<p>unclosed")]
    #[case("<p><b>crossed</p></b>")]
    #[case("<p>a</p></div>")]
    #[case("<p>a&nbsp;b</p>")]
    #[case("<p>a &#0; b</p>")]
    #[case("<p title=\"&nbsp;\">x</p>")]
    #[case("<p title=\"a & b\">x</p>")]
    #[case("<p>one</p><p>two</p>")]
    #[case("")]
    #[case("stray<p>x</p>")]
    #[case("<html><body><o:p/></body></html>")]
    #[case("<html><body><o:p>x</o:p></body></html>")]
    #[case("<p v:shape=\"x\">y</p>")]
    #[case("<p>a\u{1}b</p>")]
    #[case("<p>a\u{FFFE}b</p>")]
    #[case("<p title=\"\u{FFFF}\">x</p>")]
    #[case("<p>a &#xFFFE; b</p>")]
    fn test_malformed(#[case] document: &str) {
        assert!(well_formed(document).is_err(), "{document:?} should be rejected");
    }
}

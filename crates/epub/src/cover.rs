use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::consts::COVER_REGEX;

/// A decoded cover image, ready to be packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub media_type: &'static str,
    pub extension: &'static str,
    pub data: Vec<u8>,
}
impl Cover {
    /// Decodes a cover stored as a `data:image/<type>;base64,<payload>` URI.
    ///
    /// Anything else (an unsupported type, a URI without a base64 payload, a
    /// payload that does not decode) yields no cover. That is logged, not
    /// treated as an error: a book without a cover is still a book.
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let Some(captures) = COVER_REGEX.captures(uri.trim()) else {
            let prefix: String = uri.chars().take(32).collect();
            tracing::warn!(%prefix, "cover is not a base64 image data URI, skipping it");
            return None;
        };
        let (media_type, extension) = match &captures[1] {
            "image/png" => ("image/png", "png"),
            "image/jpeg" | "image/jpg" => ("image/jpeg", "jpg"),
            "image/gif" => ("image/gif", "gif"),
            "image/webp" => ("image/webp", "webp"),
            "image/svg+xml" => ("image/svg+xml", "svg"),
            other => {
                tracing::warn!(media_type = other, "unsupported cover type, skipping it");
                return None;
            },
        };
        let payload: String = captures[2].chars().filter(|c| !c.is_ascii_whitespace()).collect();
        match STANDARD.decode(payload) {
            Ok(data) if !data.is_empty() => Some(Self { media_type, extension, data }),
            Ok(_) => {
                tracing::warn!("cover payload is empty, skipping it");
                None
            },
            Err(error) => {
                tracing::warn!(%error, "cover payload is not valid base64, skipping it");
                None
            },
        }
    }

    /// File name of the cover inside the package's image directory.
    pub(crate) fn file_name(&self) -> String {
        format!("cover.{}", self.extension)
    }
}

use time::OffsetDateTime;

/// Package identifier derived from the book's title and creation time.
///
/// Re-exporting the same book yields the same identifier, so readers treat
/// the new package as an update rather than a different book. The hash is
/// laid out as a version 8 (custom) UUID.
pub(crate) fn identifier(title: &str, created_at: OffsetDateTime) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(title.as_bytes());
    hasher.update(&[0]);
    hasher.update(&created_at.unix_timestamp().to_be_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x80;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("urn:uuid:{}-{}-{}-{}-{}", &hex[..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..])
}

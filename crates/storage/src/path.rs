//! Path validation and security utilities.
//!
//! This module provides functions to validate storage paths and prevent
//! security issues like path traversal attacks.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path for security and correctness.
/// Ensures that paths don't escape the storage root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use inkstone_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("works/w1.json").is_ok());
/// assert!(validate_path("exports/2024/novel.epub").is_ok());
/// assert!(validate_path("a/../novel.epub").is_ok()); // (never leaves the root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err()); // (leaves the root)
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../still-wrong/.././chapters//./c1.html/").unwrap(),
///     Path::new("chapters/c1.html")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but
                // truncate paths in syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            // Drive letters and UNC prefixes are never relative.
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("works/w1.json", "works/w1.json")]
    #[case("chapters/c1.html", "chapters/c1.html")]
    #[case("novel.epub", "novel.epub")]
    #[case("works//w1.json", "works/w1.json")]
    #[case("./works/./w1.json", "works/w1.json")]
    #[case("works/tmp/..", "works")]
    #[case("exports/", "exports")]
    #[case("exports///", "exports")]
    #[case("/works/w1.json", "works/w1.json")]
    fn test_valid_paths(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(validate(path).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("//")]
    #[case("..")]
    #[case("../..")]
    #[case("../etc/passwd")]
    #[case("works/../../escape")]
    #[case("a\0b")]
    #[case("\0")]
    fn test_invalid_paths(#[case] path: &str) {
        let err = validate(path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}

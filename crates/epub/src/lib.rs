//! Packaging of export sections into a single EPUB file.
//!
//! [`build()`] is the only entry point: it takes the book's metadata, an
//! optional cover and the sections in reading order, and returns the finished
//! package as bytes. Nothing is written anywhere; the caller decides where the
//! package goes.

mod assets;
mod consts;
mod cover;
mod document;
pub mod error;
mod identifier;
mod package;
mod validate;

pub use crate::cover::Cover;
pub use crate::package::{BookInfo, build};

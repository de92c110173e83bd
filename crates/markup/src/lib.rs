//! Editor markup handling shared by the live editor and the export pipeline.
//!
//! - [`sanitize()`] turns loose, editor-authored HTML into the strict XHTML
//!   subset that packaged documents require.
//! - [`count()`] derives [`TextStats`] from the same markup. The status bar and
//!   export metadata both quote these figures, so they must never be computed
//!   any other way.

mod consts;
mod count;
mod sanitize;

pub use crate::consts::is_xml_char;
pub use crate::count::{TextStats, count, count_text};
pub use crate::sanitize::{EMPTY_BODY, sanitize};

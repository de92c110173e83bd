//! Autosave for the inkstone editor.
//!
//! An [`Editor`] holds the one document being edited as a [`SessionHandle`].
//! Each session saves its buffer to the document store on a timer whenever it
//! has unsaved changes, never runs two saves at once, and saves one last time
//! when it is closed or replaced by another document.

mod buffer;
mod editor;
pub mod error;
mod session;
mod state;
mod status;
#[cfg(test)]
mod testing;

pub use crate::editor::Editor;
pub use crate::session::SessionHandle;
pub use crate::state::{Action, Event, Phase};
pub use crate::status::Status;

//! Assets embedded into the binary at compile time using
//! [`rust-embed`](rust_embed).

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use rust_embed::Embed;
use std::borrow::Cow;

#[derive(Embed)]
#[folder = "assets/"]
pub(crate) struct Builtins;
impl Builtins {
    pub(crate) fn load(name: impl AsRef<str>) -> Result<Cow<'static, [u8]>> {
        Self::get(name.as_ref()).map(|f| f.data).ok_or_raise(|| ErrorKind::Asset(name.as_ref().to_string()))
    }
}

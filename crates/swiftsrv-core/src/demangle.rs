//! Demangler seam.
//!
//! The actual name-demangling algorithm lives outside this workspace (a
//! toolchain binary or a library supplied by the embedding application). The
//! server only needs something that turns mangled bytes into display text.

use crate::error::Result;

/// Turns a mangled symbol name into readable text.
pub trait Demangler: Send + Sync {
    fn demangle(&self, name: &[u8]) -> Result<String>;
}

/// Returns the input as text, replacing invalid UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Demangler for Passthrough {
    fn demangle(&self, name: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(name).into_owned())
    }
}

/// Adapts a closure into a `Demangler`.
pub struct FnDemangler<F>(pub F);

impl<F> Demangler for FnDemangler<F>
where
    F: Fn(&[u8]) -> Result<String> + Send + Sync,
{
    fn demangle(&self, name: &[u8]) -> Result<String> {
        (self.0)(name)
    }
}

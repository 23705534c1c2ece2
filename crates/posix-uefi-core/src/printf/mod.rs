//! Formatted output engine.
//!
//! Renders a UTF-16 format string and typed arguments into a caller-supplied
//! UTF-16 buffer without allocating. Directives: `%%`, `%c`, `%C`, `%d`,
//! `%x`/`%X`, `%p`/`%P`, `%s`/`%q`, `%S`/`%Q` and the `%D` memory dump, each
//! with an optional `0` flag, decimal width and ignored `l` modifier.
//!
//! Truncation is silent. The result is always NUL-terminated when the
//! buffer has any capacity.

pub mod args;
pub mod render;
pub mod utf8;
pub mod writer;

pub use args::{Arg, MemoryView};
pub use render::render;
pub use writer::{BoundedWriter, Scratch};

/// Default buffer size for `sprintf` and the console printers.
pub const BUFSIZ: usize = 8192;

/// Render into `dst` with a capacity of [`BUFSIZ`] (bounded by the slice).
pub fn sprintf(dst: &mut [u16], fmt: &[u16], args: &[Arg<'_>]) -> usize {
    render(dst, BUFSIZ, fmt, args)
}

/// Render into `dst` writing at most `max_len - 1` units plus the terminator.
pub fn snprintf(dst: &mut [u16], max_len: usize, fmt: &[u16], args: &[Arg<'_>]) -> usize {
    render(dst, max_len, fmt, args)
}

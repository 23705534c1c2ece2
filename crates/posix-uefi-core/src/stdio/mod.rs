//! POSIX-shaped stream I/O.
//!
//! [`Stdio`] owns the firmware and the [`DeviceRegistry`](crate::DeviceRegistry)
//! and exposes open/read/write/seek/tell/eof/close over a tagged [`Stream`].

mod console;
mod dispatch;
mod format;
pub mod mode;
pub mod path;
pub mod stream;

pub use dispatch::Stdio;
pub use mode::{Access, OpenMode, parse_mode};
pub use path::{PseudoPath, classify};
pub use stream::{Stream, StreamKind, Whence};

//! Error number definitions.
//!
//! The `<errno.h>` values this layer reports. There is no thread-local
//! `errno`: the host runs a single execution context and the last error
//! lives in the [`Stdio`](crate::stdio::Stdio) context that produced it.

/// Well-known errno constants (Linux/POSIX numbering).
pub const EPERM: i32 = 1;
pub const ENOENT: i32 = 2;
pub const EIO: i32 = 5;
pub const EBADF: i32 = 9;
pub const ENOMEM: i32 = 12;
pub const EACCES: i32 = 13;
pub const ENODEV: i32 = 19;
pub const ENOTDIR: i32 = 20;
pub const EISDIR: i32 = 21;
pub const EINVAL: i32 = 22;
pub const ENOSPC: i32 = 28;
pub const ESPIPE: i32 = 29;
pub const EROFS: i32 = 30;

/// Last-error slot held by a stdio context.
///
/// Failed operations store their errno here; successful operations leave
/// it untouched, as C `errno` does.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Errno(i32);

impl Errno {
    /// A cleared slot.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Returns the stored errno value (0 if none).
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Stores an errno value.
    pub fn set(&mut self, value: i32) {
        self.0 = value;
    }

    /// Resets the slot to 0.
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Short description of an errno value, as `strerror` would print it.
pub fn describe(errno: i32) -> &'static str {
    match errno {
        0 => "Success",
        EPERM => "Operation not permitted",
        ENOENT => "No such file or directory",
        EIO => "Input/output error",
        EBADF => "Bad file descriptor",
        ENOMEM => "Cannot allocate memory",
        EACCES => "Permission denied",
        ENODEV => "No such device",
        ENOTDIR => "Not a directory",
        EISDIR => "Is a directory",
        EINVAL => "Invalid argument",
        ENOSPC => "No space left on device",
        ESPIPE => "Illegal seek",
        EROFS => "Read-only file system",
        _ => "Unknown error",
    }
}

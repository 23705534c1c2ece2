//! The stream handle.

/// An open stream. The variant is fixed at open time.
///
/// `H` is the firmware's file handle type. Console streams need no opening
/// and can be built with [`Stream::stdin`] and friends.
#[derive(Debug)]
pub enum Stream<H> {
    StdIn,
    StdOut,
    StdErr,
    Serial,
    /// Raw block device; `lba` is the block cursor.
    BlockDevice { index: usize, lba: u64 },
    File(H),
}

/// Stream variant without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    StdIn,
    StdOut,
    StdErr,
    Serial,
    BlockDevice,
    File,
}

impl<H> Stream<H> {
    pub const fn stdin() -> Self {
        Stream::StdIn
    }

    pub const fn stdout() -> Self {
        Stream::StdOut
    }

    pub const fn stderr() -> Self {
        Stream::StdErr
    }

    pub const fn kind(&self) -> StreamKind {
        match self {
            Stream::StdIn => StreamKind::StdIn,
            Stream::StdOut => StreamKind::StdOut,
            Stream::StdErr => StreamKind::StdErr,
            Stream::Serial => StreamKind::Serial,
            Stream::BlockDevice { .. } => StreamKind::BlockDevice,
            Stream::File(_) => StreamKind::File,
        }
    }

    pub const fn is_console(&self) -> bool {
        matches!(self, Stream::StdIn | Stream::StdOut | Stream::StdErr)
    }

    /// Anything that is not a filesystem object.
    pub const fn is_special(&self) -> bool {
        !matches!(self, Stream::File(_))
    }
}

/// Reference point for [`Stdio::seek`](crate::Stdio::seek).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    Current,
    End,
}

impl Whence {
    /// From the POSIX `SEEK_SET`/`SEEK_CUR`/`SEEK_END` numbering.
    pub const fn from_posix(whence: i32) -> Option<Self> {
        match whence {
            0 => Some(Whence::Set),
            1 => Some(Whence::Current),
            2 => Some(Whence::End),
            _ => None,
        }
    }
}

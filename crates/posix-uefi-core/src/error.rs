//! Error taxonomy for stream operations.
//!
//! Firmware failures arrive as [`Status`] codes and are translated exactly
//! once, at the dispatcher boundary, through [`StdioError::from_status`].

use thiserror::Error;

use crate::errno;
use crate::firmware::Status;

/// Failure kinds reported by the stream layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StdioError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("read-only file system")]
    ReadOnlyFilesystem,
    #[error("no space left on device")]
    NoSpace,
    #[error("no such file or directory")]
    NotFound,
    #[error("input/output error")]
    GenericIO,
    #[error("no such device")]
    NoDevice,
    /// The operation is not valid for this kind of stream.
    #[error("operation not supported by this stream")]
    BadHandle,
    #[error("illegal seek")]
    NotSeekable,
    #[error("is a directory")]
    IsADirectory,
    #[error("not a directory")]
    NotADirectory,
    /// Empty or malformed path or mode, or an out-of-range offset.
    #[error("invalid argument")]
    InvalidArgument,
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, StdioError>;

impl StdioError {
    /// The errno value stored in the last-error slot for this failure.
    pub const fn errno(self) -> i32 {
        match self {
            StdioError::PermissionDenied => errno::EACCES,
            StdioError::ReadOnlyFilesystem => errno::EROFS,
            StdioError::NoSpace => errno::ENOSPC,
            StdioError::NotFound => errno::ENOENT,
            StdioError::GenericIO => errno::EIO,
            StdioError::NoDevice => errno::ENODEV,
            StdioError::BadHandle => errno::EBADF,
            StdioError::NotSeekable => errno::ESPIPE,
            StdioError::IsADirectory => errno::EISDIR,
            StdioError::NotADirectory => errno::ENOTDIR,
            StdioError::InvalidArgument => errno::EINVAL,
        }
    }

    /// Translate a firmware status into an error kind.
    ///
    /// The mapping is total: anything without a dedicated kind is reported
    /// as [`StdioError::GenericIO`].
    pub fn from_status(status: Status) -> Self {
        match status.code() & 0xffff {
            code if code == Status::WRITE_PROTECTED.code() => StdioError::ReadOnlyFilesystem,
            code if code == Status::ACCESS_DENIED.code() => StdioError::PermissionDenied,
            code if code == Status::VOLUME_FULL.code() => StdioError::NoSpace,
            code if code == Status::NOT_FOUND.code() => StdioError::NotFound,
            _ => StdioError::GenericIO,
        }
    }
}

impl From<Status> for StdioError {
    fn from(status: Status) -> Self {
        StdioError::from_status(status)
    }
}

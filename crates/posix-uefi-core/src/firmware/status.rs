//! Firmware status codes.
//!
//! A status is a machine word whose top bit marks an error. Warnings keep
//! the top bit clear and are not treated as failures.

use core::fmt;

const ERROR_BIT: usize = 1 << (usize::BITS - 1);

const fn error(code: usize) -> Status {
    Status(code | ERROR_BIT)
}

/// Raw status word returned by every firmware call.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Status(pub usize);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const WARN_DELETE_FAILURE: Status = Status(2);

    pub const LOAD_ERROR: Status = error(1);
    pub const INVALID_PARAMETER: Status = error(2);
    pub const UNSUPPORTED: Status = error(3);
    pub const BAD_BUFFER_SIZE: Status = error(4);
    pub const BUFFER_TOO_SMALL: Status = error(5);
    pub const NOT_READY: Status = error(6);
    pub const DEVICE_ERROR: Status = error(7);
    pub const WRITE_PROTECTED: Status = error(8);
    pub const OUT_OF_RESOURCES: Status = error(9);
    pub const VOLUME_CORRUPTED: Status = error(10);
    pub const VOLUME_FULL: Status = error(11);
    pub const NO_MEDIA: Status = error(12);
    pub const MEDIA_CHANGED: Status = error(13);
    pub const NOT_FOUND: Status = error(14);
    pub const ACCESS_DENIED: Status = error(15);
    pub const NO_RESPONSE: Status = error(16);
    pub const TIMEOUT: Status = error(18);
    pub const ABORTED: Status = error(21);
    pub const END_OF_FILE: Status = error(31);

    /// True if the error bit is set.
    pub const fn is_error(self) -> bool {
        self.0 & ERROR_BIT != 0
    }

    /// True for success and warnings.
    pub const fn is_success(self) -> bool {
        !self.is_error()
    }

    /// The status value with the error bit stripped.
    pub const fn code(self) -> usize {
        self.0 & !ERROR_BIT
    }

    /// `Ok(())` unless the error bit is set.
    pub fn to_result(self) -> Result<(), Status> {
        if self.is_error() { Err(self) } else { Ok(()) }
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Status::SUCCESS => "SUCCESS",
            Status::WARN_DELETE_FAILURE => "WARN_DELETE_FAILURE",
            Status::LOAD_ERROR => "LOAD_ERROR",
            Status::INVALID_PARAMETER => "INVALID_PARAMETER",
            Status::UNSUPPORTED => "UNSUPPORTED",
            Status::BAD_BUFFER_SIZE => "BAD_BUFFER_SIZE",
            Status::BUFFER_TOO_SMALL => "BUFFER_TOO_SMALL",
            Status::NOT_READY => "NOT_READY",
            Status::DEVICE_ERROR => "DEVICE_ERROR",
            Status::WRITE_PROTECTED => "WRITE_PROTECTED",
            Status::OUT_OF_RESOURCES => "OUT_OF_RESOURCES",
            Status::VOLUME_CORRUPTED => "VOLUME_CORRUPTED",
            Status::VOLUME_FULL => "VOLUME_FULL",
            Status::NO_MEDIA => "NO_MEDIA",
            Status::MEDIA_CHANGED => "MEDIA_CHANGED",
            Status::NOT_FOUND => "NOT_FOUND",
            Status::ACCESS_DENIED => "ACCESS_DENIED",
            Status::NO_RESPONSE => "NO_RESPONSE",
            Status::TIMEOUT => "TIMEOUT",
            Status::ABORTED => "ABORTED",
            Status::END_OF_FILE => "END_OF_FILE",
            _ => return None,
        })
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Status({:#x})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bit_classification() {
        assert!(Status::SUCCESS.is_success());
        assert!(Status::WARN_DELETE_FAILURE.is_success());
        assert!(Status::NOT_FOUND.is_error());
        assert_eq!(Status::NOT_FOUND.code(), 14);
    }

    #[test]
    fn to_result_follows_error_bit() {
        assert_eq!(Status::SUCCESS.to_result(), Ok(()));
        assert_eq!(Status::DEVICE_ERROR.to_result(), Err(Status::DEVICE_ERROR));
    }

    #[test]
    fn debug_uses_names() {
        assert_eq!(format!("{:?}", Status::VOLUME_FULL), "VOLUME_FULL");
        assert_eq!(format!("{:?}", Status(0x55)), "Status(0x55)");
    }
}

//! `fopen`-style mode strings.

use crate::firmware::FileMode;

/// Base access selected by the first mode character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Append,
}

/// Parsed open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub access: Access,
    /// `d` as the second character: the path must name a directory.
    pub directory: bool,
    /// `+` anywhere after the first character.
    pub update: bool,
}

impl OpenMode {
    pub const fn reads(&self) -> bool {
        matches!(self.access, Access::Read) || self.update
    }

    pub const fn writes(&self) -> bool {
        !matches!(self.access, Access::Read) || self.update
    }

    /// Firmware open mode for a filesystem path.
    pub const fn firmware_mode(&self) -> FileMode {
        match self.access {
            Access::Read if self.update => FileMode::ReadWrite,
            Access::Read => FileMode::Read,
            Access::Write | Access::Append => FileMode::CreateReadWrite,
        }
    }
}

// ---------------------------------------------------------------------------
// Mode parsing
// ---------------------------------------------------------------------------

/// Parse a mode string such as `"r"`, `"w"`, `"a"`, `"rd"` or `"wb+"`.
///
/// Returns `None` if the mode string is invalid.
pub fn parse_mode(mode: &str) -> Option<OpenMode> {
    let bytes = mode.as_bytes();
    let access = match bytes.first()? {
        b'r' => Access::Read,
        b'w' => Access::Write,
        b'a' => Access::Append,
        _ => return None,
    };

    let mut parsed = OpenMode {
        access,
        directory: false,
        update: false,
    };
    for (pos, &byte) in bytes.iter().enumerate().skip(1) {
        match byte {
            b'd' if pos == 1 => parsed.directory = true,
            b'+' => parsed.update = true,
            // Text and binary are the same thing here.
            b'b' | b't' => {}
            _ => return None,
        }
    }
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_read() {
        let m = parse_mode("r").unwrap();
        assert_eq!(m.access, Access::Read);
        assert!(m.reads());
        assert!(!m.writes());
        assert_eq!(m.firmware_mode(), FileMode::Read);
    }

    #[test]
    fn test_parse_mode_write_and_append_create() {
        assert_eq!(
            parse_mode("w").unwrap().firmware_mode(),
            FileMode::CreateReadWrite
        );
        let a = parse_mode("a").unwrap();
        assert_eq!(a.access, Access::Append);
        assert!(a.writes());
        assert!(!a.reads());
    }

    #[test]
    fn test_parse_mode_directory() {
        let m = parse_mode("rd").unwrap();
        assert!(m.directory);
        assert!(parse_mode("wd").unwrap().directory);
        // Only the second position asserts a directory.
        assert!(parse_mode("rbd").is_none());
    }

    #[test]
    fn test_parse_mode_update() {
        let m = parse_mode("r+").unwrap();
        assert!(m.reads() && m.writes());
        assert_eq!(m.firmware_mode(), FileMode::ReadWrite);
    }

    #[test]
    fn test_parse_mode_invalid() {
        assert!(parse_mode("").is_none());
        assert!(parse_mode("x").is_none());
        assert!(parse_mode("rz").is_none());
    }
}

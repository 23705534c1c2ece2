//! Pseudo-path namespace.
//!
//! `/dev/stdin`, `/dev/stdout` and `/dev/stderr` match exactly.
//! `/dev/serial<N>` and `/dev/disk<N>` match by prefix; the decimal suffix is
//! the baud rate or the disk index. Pseudo-paths never reach the filesystem.

use alloc::string::String;

pub const STDIN: &str = "/dev/stdin";
pub const STDOUT: &str = "/dev/stdout";
pub const STDERR: &str = "/dev/stderr";
pub const SERIAL_PREFIX: &str = "/dev/serial";
pub const DISK_PREFIX: &str = "/dev/disk";

/// A path that names a device rather than a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoPath {
    StdIn,
    StdOut,
    StdErr,
    /// Baud 0 selects the default rate.
    Serial { baud: u64 },
    Disk { index: usize },
}

/// Classify `path`, returning `None` for ordinary filesystem paths.
pub fn classify(path: &str) -> Option<PseudoPath> {
    match path {
        STDIN => Some(PseudoPath::StdIn),
        STDOUT => Some(PseudoPath::StdOut),
        STDERR => Some(PseudoPath::StdErr),
        _ => {
            if let Some(rest) = path.strip_prefix(SERIAL_PREFIX) {
                Some(PseudoPath::Serial {
                    baud: leading_decimal(rest),
                })
            } else {
                path.strip_prefix(DISK_PREFIX).map(|rest| PseudoPath::Disk {
                    index: usize::try_from(leading_decimal(rest)).unwrap_or(usize::MAX),
                })
            }
        }
    }
}

/// Value of the leading decimal digits of `s`; 0 when there are none.
/// Saturates instead of overflowing.
fn leading_decimal(s: &str) -> u64 {
    s.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, digit| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(digit - b'0'))
        })
}

/// Firmware paths use `\` separators.
pub fn to_firmware_path(path: &str) -> String {
    path.replace('/', "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consoles_match_exactly() {
        assert_eq!(classify("/dev/stdin"), Some(PseudoPath::StdIn));
        assert_eq!(classify("/dev/stdout"), Some(PseudoPath::StdOut));
        assert_eq!(classify("/dev/stderr"), Some(PseudoPath::StdErr));
        assert_eq!(classify("/dev/stdinx"), None);
    }

    #[test]
    fn serial_suffix_is_baud() {
        assert_eq!(classify("/dev/serial"), Some(PseudoPath::Serial { baud: 0 }));
        assert_eq!(
            classify("/dev/serial57600"),
            Some(PseudoPath::Serial { baud: 57_600 })
        );
        assert_eq!(
            classify("/dev/serial9600x"),
            Some(PseudoPath::Serial { baud: 9600 })
        );
    }

    #[test]
    fn disk_suffix_is_index() {
        assert_eq!(classify("/dev/disk"), Some(PseudoPath::Disk { index: 0 }));
        assert_eq!(classify("/dev/disk2"), Some(PseudoPath::Disk { index: 2 }));
        assert_eq!(
            classify("/dev/disk99999999999999999999999"),
            Some(PseudoPath::Disk { index: usize::MAX })
        );
    }

    #[test]
    fn ordinary_paths_pass_through() {
        assert_eq!(classify("/EFI/BOOT/x.efi"), None);
        assert_eq!(classify("dev/stdout"), None);
    }

    #[test]
    fn separators_converted() {
        assert_eq!(to_firmware_path("/EFI/BOOT/x.efi"), "\\EFI\\BOOT\\x.efi");
    }
}

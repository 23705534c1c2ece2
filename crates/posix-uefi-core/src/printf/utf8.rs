//! Lenient UTF-8 decoding.
//!
//! Never fails: anything that is not a well-formed 1 to 4 byte sequence
//! decodes to `?` and consumes a single byte, so decoding always makes
//! progress. Overlong forms are accepted as-is.

/// Codepoint produced for malformed input.
pub const REPLACEMENT: u32 = b'?' as u32;

/// Decode the codepoint at the start of `bytes`.
///
/// Returns the codepoint and the number of bytes consumed. Empty input
/// decodes as NUL consuming nothing.
pub fn decode(bytes: &[u8]) -> (u32, usize) {
    let Some(&lead) = bytes.first() else {
        return (0, 0);
    };
    let (len, initial) = match lead {
        0x00..=0x7f => return (u32::from(lead), 1),
        0xc0..=0xdf => (2, u32::from(lead & 0x1f)),
        0xe0..=0xef => (3, u32::from(lead & 0x0f)),
        0xf0..=0xf7 => (4, u32::from(lead & 0x07)),
        _ => return (REPLACEMENT, 1),
    };
    let Some(tail) = bytes.get(1..len) else {
        return (REPLACEMENT, 1);
    };
    let mut codepoint = initial;
    for &byte in tail {
        if byte & 0xc0 != 0x80 {
            return (REPLACEMENT, 1);
        }
        codepoint = (codepoint << 6) | u32::from(byte & 0x3f);
    }
    (codepoint, len)
}

/// Iterator over the codepoints of a byte string.
pub fn codepoints(mut bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    core::iter::from_fn(move || {
        if bytes.is_empty() {
            return None;
        }
        let (codepoint, used) = decode(bytes);
        bytes = &bytes[used..];
        Some(codepoint)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_multibyte() {
        assert_eq!(decode(b"A"), (0x41, 1));
        assert_eq!(decode("é".as_bytes()), (0xe9, 2));
        assert_eq!(decode("€".as_bytes()), (0x20ac, 3));
        assert_eq!(decode("😀".as_bytes()), (0x1f600, 4));
    }

    #[test]
    fn malformed_leads_are_replaced() {
        assert_eq!(decode(&[0x80]), (REPLACEMENT, 1));
        assert_eq!(decode(&[0xbf, 0x41]), (REPLACEMENT, 1));
        assert_eq!(decode(&[0xf8, 0x80, 0x80, 0x80, 0x80]), (REPLACEMENT, 1));
        assert_eq!(decode(&[0xff]), (REPLACEMENT, 1));
    }

    #[test]
    fn truncated_and_bad_continuations() {
        assert_eq!(decode(&[0xe2, 0x82]), (REPLACEMENT, 1));
        assert_eq!(decode(&[0xc3, 0x41]), (REPLACEMENT, 1));
    }

    #[test]
    fn empty_input() {
        assert_eq!(decode(&[]), (0, 0));
    }

    #[test]
    fn iterates_with_recovery() {
        let decoded: Vec<u32> = codepoints(&[b'a', 0xc3, b'b', 0xc3, 0xa9]).collect();
        assert_eq!(decoded, vec![0x61, REPLACEMENT, 0x62, 0xe9]);
    }
}

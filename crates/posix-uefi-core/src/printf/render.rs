//! The rendering loop.
//!
//! Single pass over a UTF-16 format string into a [`BoundedWriter`]. No
//! allocation; digits go through fixed [`Scratch`] buffers. Output that does
//! not fit is dropped silently.

use core::slice;

use super::args::{Arg, MemoryView};
use super::utf8;
use super::writer::{BoundedWriter, Full, Scratch};

const CR: u16 = b'\r' as u16;
const LF: u16 = b'\n' as u16;
const PERCENT: u16 = b'%' as u16;
const BACKSLASH: u16 = b'\\' as u16;
const QUESTION: u16 = b'?' as u16;

/// Largest magnitude `%d` prints (17 nines).
pub const MAX_DECIMAL: u64 = 99_999_999_999_999_999;
const DECIMAL_SLOTS: usize = 18;
const HEX_SLOTS: usize = 16;
const DUMP_LINE: usize = 16;
const MAX_DUMP_LINES: usize = 16;

const NULL_TEXT: &[u16] = &[
    b'(' as u16,
    b'n' as u16,
    b'u' as u16,
    b'l' as u16,
    b'l' as u16,
    b')' as u16,
];

// ---------------------------------------------------------------------------
// Directive parsing
// ---------------------------------------------------------------------------

/// A parsed `%` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub zero_pad: bool,
    pub width: usize,
    pub conversion: u16,
}

/// Parse the directive after a `%`.
///
/// Returns the directive and the units consumed, or `None` when the format
/// ends before a conversion character.
pub fn parse_directive(fmt: &[u16]) -> Option<(Directive, usize)> {
    let mut pos = 0;
    let zero_pad = fmt.first() == Some(&u16::from(b'0'));
    let mut width = 0usize;
    while let Some(digit) = fmt.get(pos).and_then(|&u| ascii_digit(u)) {
        width = width.saturating_mul(10).saturating_add(digit);
        pos += 1;
    }
    while fmt.get(pos) == Some(&u16::from(b'l')) {
        pos += 1;
    }
    match fmt.get(pos) {
        None | Some(0) => None,
        Some(&conversion) => Some((
            Directive {
                zero_pad,
                width,
                conversion,
            },
            pos + 1,
        )),
    }
}

fn ascii_digit(unit: u16) -> Option<usize> {
    match unit {
        0x30..=0x39 => Some(usize::from(unit - 0x30)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Render `fmt` with `args` into `dst`.
///
/// Writes at most `min(max_len, dst.len()) - 1` units, NUL-terminates
/// whenever that capacity is non-zero and returns the number of units
/// written, terminator excluded. Rendering stops at the first NUL in `fmt`.
pub fn render(dst: &mut [u16], max_len: usize, fmt: &[u16], args: &[Arg<'_>]) -> usize {
    let mut w = BoundedWriter::new(dst, max_len);
    // A full buffer is an ordinary stop, not an error.
    let _ = render_into(&mut w, fmt, &mut args.iter());
    w.finish()
}

fn render_into(
    w: &mut BoundedWriter<'_>,
    fmt: &[u16],
    args: &mut slice::Iter<'_, Arg<'_>>,
) -> Result<(), Full> {
    let mut pos = 0;
    while let Some(&unit) = fmt.get(pos) {
        if unit == 0 || w.is_full() {
            break;
        }
        pos += 1;
        if unit != PERCENT {
            put_literal(w, unit)?;
            continue;
        }
        let Some((directive, used)) = parse_directive(&fmt[pos..]) else {
            break;
        };
        pos += used;
        render_directive(w, &directive, args)?;
    }
    Ok(())
}

fn put_literal(w: &mut BoundedWriter<'_>, unit: u16) -> Result<(), Full> {
    if unit == LF {
        if w.room() < 2 {
            return Err(Full);
        }
        w.put(CR)?;
    }
    w.put(unit)
}

fn render_directive(
    w: &mut BoundedWriter<'_>,
    directive: &Directive,
    args: &mut slice::Iter<'_, Arg<'_>>,
) -> Result<(), Full> {
    let conversion = u8::try_from(directive.conversion).unwrap_or(0);
    match conversion {
        b'%' => w.put(PERCENT),
        b'c' => w.put(next_u64(args) as u16),
        b'C' => {
            if let Some(bytes) = next_bytes(args) {
                let (codepoint, used) = utf8::decode(bytes);
                if used > 0 && codepoint != 0 {
                    w.put(codepoint as u16)?;
                }
            }
            Ok(())
        }
        b'd' => {
            let digits = format_decimal(next_u64(args) as i64, directive);
            copy_units(w, digits.as_slice(), false);
            Ok(())
        }
        b'x' | b'X' => {
            let digits = format_hex(next_u64(args), directive.width, conversion == b'X');
            copy_units(w, digits.as_slice(), false);
            Ok(())
        }
        b'p' | b'P' => {
            let digits = format_hex(next_u64(args), HEX_SLOTS, false);
            copy_units(w, digits.as_slice(), false);
            Ok(())
        }
        b's' | b'q' => {
            let text = next_wide(args).unwrap_or(NULL_TEXT);
            copy_units(w, text, conversion == b'q');
            Ok(())
        }
        b'S' | b'Q' => {
            match next_bytes(args) {
                Some(bytes) => copy_utf8(w, bytes, conversion == b'Q'),
                None => copy_units(w, NULL_TEXT, false),
            }
            Ok(())
        }
        b'D' => match next_memory(args) {
            Some(view) => dump(w, &view, directive.width),
            None => Ok(()),
        },
        // Unknown conversions are consumed and produce nothing.
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Argument access
// ---------------------------------------------------------------------------

fn next_u64(args: &mut slice::Iter<'_, Arg<'_>>) -> u64 {
    args.next().map_or(0, Arg::as_u64)
}

fn next_wide<'a>(args: &mut slice::Iter<'_, Arg<'a>>) -> Option<&'a [u16]> {
    match args.next() {
        Some(Arg::Wide(text)) => *text,
        _ => None,
    }
}

fn next_bytes<'a>(args: &mut slice::Iter<'_, Arg<'a>>) -> Option<&'a [u8]> {
    match args.next() {
        Some(Arg::Bytes(bytes)) => *bytes,
        _ => None,
    }
}

fn next_memory<'a>(args: &mut slice::Iter<'_, Arg<'a>>) -> Option<MemoryView<'a>> {
    match args.next() {
        Some(Arg::Memory(view)) => Some(*view),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

fn format_decimal(value: i64, directive: &Directive) -> Scratch<DECIMAL_SLOTS> {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs().min(MAX_DECIMAL);
    let mut digits = Scratch::<DECIMAL_SLOTS>::new();
    loop {
        digits.push_front(u16::from(b'0') + (magnitude % 10) as u16);
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }

    let natural = digits.len() + usize::from(negative);
    let width = directive.width;
    let padding = if width > 0 && width < DECIMAL_SLOTS {
        width.saturating_sub(natural)
    } else {
        0
    };

    if directive.zero_pad {
        for _ in 0..padding {
            digits.push_front(u16::from(b'0'));
        }
        if negative {
            digits.push_front(u16::from(b'-'));
        }
    } else {
        if negative {
            digits.push_front(u16::from(b'-'));
        }
        for _ in 0..padding {
            digits.push_front(u16::from(b' '));
        }
    }
    digits
}

/// Hex digits, zero-padded to `width` when `1 <= width <= 16`.
fn format_hex(mut value: u64, width: usize, uppercase: bool) -> Scratch<HEX_SLOTS> {
    let mut digits = Scratch::<HEX_SLOTS>::new();
    loop {
        digits.push_front(hex_digit((value & 0xf) as u8, uppercase));
        value >>= 4;
        if value == 0 {
            break;
        }
    }
    if (1..=HEX_SLOTS).contains(&width) {
        while digits.len() < width {
            digits.push_front(u16::from(b'0'));
        }
    }
    digits
}

fn hex_digit(nibble: u8, uppercase: bool) -> u16 {
    let nibble = nibble & 0xf;
    u16::from(match nibble {
        0..=9 => b'0' + nibble,
        _ if uppercase => b'A' + nibble - 10,
        _ => b'a' + nibble - 10,
    })
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Escape letter for units `%q`/`%Q` rewrite.
fn escape_letter(unit: u32) -> Option<u16> {
    let letter = match unit {
        0x07 => b'a',
        0x08 => b'b',
        0x1b => b'e',
        0x0c => b'f',
        0x0a => b'n',
        0x0d => b'r',
        0x09 => b't',
        0x0b => b'v',
        0x22 => b'"',
        0x5c => b'\\',
        _ => return None,
    };
    Some(u16::from(letter))
}

/// Copy UTF-16 units up to the first NUL, keeping the safety margin.
fn copy_units(w: &mut BoundedWriter<'_>, units: &[u16], escape: bool) {
    for &unit in units.iter().take_while(|&&unit| unit != 0) {
        if !w.has_margin() {
            return;
        }
        let step = match escape_letter(u32::from(unit)) {
            Some(letter) if escape => w.put_all(&[BACKSLASH, letter]),
            _ => w.put(unit),
        };
        if step.is_err() {
            return;
        }
    }
}

/// Decode UTF-8 and copy it as UTF-16, keeping the safety margin.
fn copy_utf8(w: &mut BoundedWriter<'_>, bytes: &[u8], escape: bool) {
    for codepoint in utf8::codepoints(bytes) {
        if codepoint == 0 || !w.has_margin() {
            return;
        }
        let step = match escape_letter(codepoint) {
            Some(letter) if escape => w.put_all(&[BACKSLASH, letter]),
            _ if codepoint == u32::from(LF) => w.put_all(&[CR, LF]),
            _ => put_codepoint(w, codepoint),
        };
        if step.is_err() {
            return;
        }
    }
}

fn put_codepoint(w: &mut BoundedWriter<'_>, codepoint: u32) -> Result<(), Full> {
    match codepoint {
        0..=0xffff => w.put(codepoint as u16),
        0x1_0000..=0x10_ffff => {
            let offset = codepoint - 0x1_0000;
            w.put_all(&[
                0xd800 | (offset >> 10) as u16,
                0xdc00 | (offset & 0x3ff) as u16,
            ])
        }
        _ => w.put(QUESTION),
    }
}

// ---------------------------------------------------------------------------
// Memory dump
// ---------------------------------------------------------------------------

/// `%D`: `width` lines (clamped to 1..=16) of address, 16 hex bytes and
/// their printable ASCII. Bytes beyond the view render as blanks.
fn dump(w: &mut BoundedWriter<'_>, view: &MemoryView<'_>, width: usize) -> Result<(), Full> {
    let lines = width.clamp(1, MAX_DUMP_LINES);
    let mut address = view.address();
    for line in 0..lines {
        let chunk = view
            .bytes()
            .get(line * DUMP_LINE..)
            .map_or(&[][..], |rest| &rest[..rest.len().min(DUMP_LINE)]);

        for shift in (0..=44).rev().step_by(4) {
            w.put(hex_digit((address >> shift) as u8, true))?;
        }
        w.put_all(&[u16::from(b':'), u16::from(b' ')])?;
        for i in 0..DUMP_LINE {
            match chunk.get(i) {
                Some(&byte) => {
                    w.put(hex_digit(byte >> 4, true))?;
                    w.put(hex_digit(byte, true))?;
                }
                None => w.put_all(&[u16::from(b' '); 2])?,
            }
            w.put(u16::from(b' '))?;
        }
        w.put(u16::from(b' '))?;
        for i in 0..DUMP_LINE {
            let shown = match chunk.get(i) {
                Some(&byte) if (32..127).contains(&byte) => byte,
                Some(_) => b'.',
                None => b' ',
            };
            w.put(u16::from(shown))?;
        }
        w.put_all(&[CR, LF])?;
        address = address.wrapping_add(DUMP_LINE as u64);
    }
    Ok(())
}

//! Console character I/O.
//!
//! The firmware console speaks UTF-16 and expects `\r\n` line ends. Byte
//! writes to stdout/stderr are decoded from UTF-8 here; keyboard input is
//! encoded back to UTF-8 for byte reads.

use super::dispatch::{Stdio, translate};
use crate::error::Result;
use crate::firmware::{ConsoleInput, Firmware, TextOutput};
use crate::printf::utf8;

const CR: u16 = b'\r' as u16;
const LF: u16 = b'\n' as u16;
/// UTF-16 units per `output_string` call, terminator excluded.
const CHUNK: usize = 128;

/// Undelivered UTF-8 bytes of the last key read from stdin.
#[derive(Debug, Default)]
pub(crate) struct PendingKey {
    bytes: [u8; 4],
    start: usize,
    end: usize,
}

impl PendingKey {
    fn hold(&mut self, tail: &[u8]) {
        self.bytes[..tail.len()].copy_from_slice(tail);
        self.start = 0;
        self.end = tail.len();
    }

    /// Copy held bytes to the front of `buf`; returns how many were copied.
    fn drain(&mut self, buf: &mut [u8]) -> usize {
        let count = (self.end - self.start).min(buf.len());
        buf[..count].copy_from_slice(&self.bytes[self.start..self.start + count]);
        self.start += count;
        count
    }
}

impl<F: Firmware> Stdio<F> {
    /// Write one UTF-16 unit to stdout; `\n` goes out as `\r\n`.
    pub fn putchar(&mut self, unit: u16) -> Result<u16> {
        let single = [unit, 0];
        let text: &[u16] = if unit == LF { &[CR, LF, 0] } else { &single };
        let result = self
            .firmware
            .con_out()
            .output_string(text)
            .map(|()| unit)
            .map_err(|status| translate("output", status));
        self.record(result)
    }

    /// Block until a key is pressed. Keys without a character yield 0.
    pub fn getchar(&mut self) -> Result<u16> {
        let result = self
            .firmware
            .con_in()
            .read_key()
            .map_err(|status| translate("read key", status));
        self.record(result)
    }

    /// The pending key, if any, without blocking.
    pub fn getchar_ifany(&mut self) -> Option<u16> {
        let input = self.firmware.con_in();
        if input.key_pending() {
            input.read_key().ok()
        } else {
            None
        }
    }

    /// Byte read from stdin: keys are UTF-8 encoded, carriage return is
    /// delivered as `\n`, and the read ends after a newline or when `buf` is
    /// full. A key that does not fit is split; its remaining bytes lead the
    /// next read.
    pub(crate) fn console_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = self.pending_key.drain(buf);
        if filled == buf.len() {
            return Ok(filled);
        }
        let input = self.firmware.con_in();
        while filled < buf.len() {
            let key = match input.read_key() {
                Ok(key) => key,
                Err(status) if filled == 0 => return Err(translate("read key", status)),
                Err(_) => break,
            };
            let ch = match key {
                0 => continue,
                CR => '\n',
                unit => char::from_u32(u32::from(unit)).unwrap_or('?'),
            };
            let mut encoded = [0u8; 4];
            let encoded = ch.encode_utf8(&mut encoded).as_bytes();
            let take = encoded.len().min(buf.len() - filled);
            buf[filled..filled + take].copy_from_slice(&encoded[..take]);
            filled += take;
            if take < encoded.len() {
                self.pending_key.hold(&encoded[take..]);
                break;
            }
            if ch == '\n' {
                break;
            }
        }
        Ok(filled)
    }

    /// Byte write to stdout or stderr. Returns the number of bytes consumed.
    pub(crate) fn console_write(&mut self, to_stderr: bool, buf: &[u8]) -> Result<usize> {
        let output = if to_stderr {
            self.firmware.std_err()
        } else {
            self.firmware.con_out()
        };
        let mut chunk = [0u16; CHUNK + 1];
        let mut len = 0;
        let mut rest = buf;
        while !rest.is_empty() {
            let (codepoint, used) = utf8::decode(rest);
            rest = &rest[used..];
            let mut pair = [0u16; 2];
            let units: &[u16] = match codepoint {
                // The console stops at NUL.
                0 => continue,
                0x0a => &[CR, LF],
                _ => char::from_u32(codepoint)
                    .unwrap_or('?')
                    .encode_utf16(&mut pair),
            };
            if len + units.len() > CHUNK {
                emit(output, &mut chunk, len)?;
                len = 0;
            }
            chunk[len..len + units.len()].copy_from_slice(units);
            len += units.len();
        }
        if len > 0 {
            emit(output, &mut chunk, len)?;
        }
        Ok(buf.len())
    }
}

fn emit<O: TextOutput>(output: &mut O, chunk: &mut [u16], len: usize) -> Result<()> {
    chunk[len] = 0;
    output
        .output_string(&chunk[..=len])
        .map_err(|status| translate("output", status))
}

//! `printf` and `fprintf` on top of the engine and the dispatcher.

use alloc::vec::Vec;

use super::dispatch::{Stdio, translate};
use super::stream::Stream;
use crate::error::Result;
use crate::firmware::{Firmware, TextOutput};
use crate::printf::{Arg, BUFSIZ, render};

impl<F: Firmware> Stdio<F> {
    /// Format to stdout. Returns the number of UTF-16 units rendered.
    pub fn printf(&mut self, fmt: &[u16], args: &[Arg<'_>]) -> Result<usize> {
        self.fprintf(&mut Stream::StdOut, fmt, args)
    }

    /// Format to any stream.
    ///
    /// Consoles receive the rendered UTF-16 text directly. Other streams get
    /// its UTF-8 encoding through a single [`Stdio::write`], so a block
    /// device pads only the final block. Stdin accepts nothing and reports 0.
    pub fn fprintf(
        &mut self,
        stream: &mut Stream<F::File>,
        fmt: &[u16],
        args: &[Arg<'_>],
    ) -> Result<usize> {
        if matches!(stream, Stream::StdIn) {
            return Ok(0);
        }
        let mut buf = [0u16; BUFSIZ];
        let len = render(&mut buf, BUFSIZ, fmt, args);

        match stream {
            Stream::StdOut | Stream::StdErr => {
                let output = if matches!(stream, Stream::StdErr) {
                    self.firmware.std_err()
                } else {
                    self.firmware.con_out()
                };
                let result = output
                    .output_string(&buf[..=len])
                    .map(|()| len)
                    .map_err(|status| translate("output", status));
                self.record(result)
            }
            _ => {
                let mut bytes = Vec::with_capacity(len * 3);
                let mut encoded = [0u8; 4];
                for ch in char::decode_utf16(buf[..len].iter().copied()) {
                    let ch = ch.unwrap_or('?');
                    bytes.extend_from_slice(ch.encode_utf8(&mut encoded).as_bytes());
                }
                self.write(stream, &bytes)?;
                Ok(len)
            }
        }
    }
}

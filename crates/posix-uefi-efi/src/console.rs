//! Console input and text output over the system table.

use posix_uefi_core::Status;
use posix_uefi_core::firmware::{ConsoleInput, TextOutput};
use uefi::CStr16;
use uefi::proto::console::text::Key;
use uefi::table::{Boot, SystemTable};

use crate::status_of;

/// Units converted per firmware call, excluding the terminator.
const OUTPUT_CHUNK: usize = 128;

pub struct UefiConsoleIn {
    system_table: SystemTable<Boot>,
}

impl UefiConsoleIn {
    pub(crate) fn new(system_table: SystemTable<Boot>) -> Self {
        UefiConsoleIn { system_table }
    }

    fn wait_for_key(&mut self) -> Result<(), Status> {
        let event = self
            .system_table
            .stdin()
            .wait_for_key_event()
            .ok_or(Status::UNSUPPORTED)?;
        let mut events = [event];
        self.system_table
            .boot_services()
            .wait_for_event(&mut events)
            .map_err(status_of)?;
        Ok(())
    }
}

impl ConsoleInput for UefiConsoleIn {
    /// Block until a key arrives. Scan-code-only keys read as 0.
    fn read_key(&mut self) -> Result<u16, Status> {
        loop {
            match self.system_table.stdin().read_key().map_err(status_of)? {
                Some(Key::Printable(ch)) => return Ok(u16::from(ch)),
                Some(Key::Special(_)) => return Ok(0),
                None => self.wait_for_key()?,
            }
        }
    }

    fn key_pending(&mut self) -> bool {
        let Some(event) = self.system_table.stdin().wait_for_key_event() else {
            return false;
        };
        self.system_table
            .boot_services()
            .check_event(event)
            .unwrap_or(false)
    }
}

pub struct UefiTextOut {
    system_table: SystemTable<Boot>,
    stderr: bool,
}

impl UefiTextOut {
    pub(crate) fn stdout(system_table: SystemTable<Boot>) -> Self {
        UefiTextOut {
            system_table,
            stderr: false,
        }
    }

    pub(crate) fn stderr(system_table: SystemTable<Boot>) -> Self {
        UefiTextOut {
            system_table,
            stderr: true,
        }
    }

    fn emit(&mut self, units: &[u16]) -> Result<(), Status> {
        let text = CStr16::from_u16_with_nul(units).map_err(|_| Status::INVALID_PARAMETER)?;
        let output = if self.stderr {
            self.system_table.stderr()
        } else {
            self.system_table.stdout()
        };
        output.output_string(text).map_err(status_of)
    }
}

impl TextOutput for UefiTextOut {
    /// Output stops at the first NUL. Surrogate halves have no UCS-2 form
    /// and are shown as `?`.
    fn output_string(&mut self, text: &[u16]) -> Result<(), Status> {
        let end = text.iter().position(|&u| u == 0).unwrap_or(text.len());
        for chunk in text[..end].chunks(OUTPUT_CHUNK) {
            let mut units = [0u16; OUTPUT_CHUNK + 1];
            for (slot, &unit) in units.iter_mut().zip(chunk) {
                *slot = if (0xd800..0xe000).contains(&unit) {
                    u16::from(b'?')
                } else {
                    unit
                };
            }
            self.emit(&units[..=chunk.len()])?;
        }
        Ok(())
    }
}

//! Boot-services backend for `posix-uefi-core`.
//!
//! [`UefiFirmware`] implements the core crate's [`Firmware`] contract on top
//! of the `uefi` crate: the boot volume comes from the loaded image's file
//! system, consoles from the system table, and serial and block devices from
//! protocol handles located at runtime.

#![no_std]

extern crate alloc;

mod console;
mod devices;
mod file;

use core::fmt::Debug;

use log::info;
use posix_uefi_core::firmware::Firmware;
use posix_uefi_core::{Status, Stdio};
use uefi::Handle;
use uefi::Identify;
use uefi::proto::console::serial::Serial;
use uefi::proto::media::block::BlockIO;
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::table::boot::{
    BootServices, OpenProtocolAttributes, OpenProtocolParams, ScopedProtocol, SearchType,
};
use uefi::table::{Boot, SystemTable};

pub use console::{UefiConsoleIn, UefiTextOut};
pub use devices::{UefiBlock, UefiSerial};
pub use file::UefiFile;

/// Convert a `uefi` error into the core crate's status word.
pub(crate) fn status_of<T: Debug>(err: uefi::Error<T>) -> Status {
    Status(err.status().0)
}

/// Block device handle as stored by the registry's enumeration buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct UefiHandle(Option<Handle>);

/// Live firmware reached through boot services.
pub struct UefiFirmware {
    image: Handle,
    boot_services: &'static BootServices,
    volume: Option<ScopedProtocol<'static, SimpleFileSystem>>,
    con_in: UefiConsoleIn,
    con_out: UefiTextOut,
    std_err: UefiTextOut,
}

impl UefiFirmware {
    /// Wrap the image's system table.
    ///
    /// # Safety
    ///
    /// Boot services must stay active for as long as the returned value or
    /// anything opened through it is alive.
    pub unsafe fn new(image: Handle, system_table: &SystemTable<Boot>) -> Self {
        // SAFETY: the caller keeps boot services alive, so the table outlives
        // every borrow handed out here.
        let boot_services: &'static BootServices =
            unsafe { &*(system_table.boot_services() as *const BootServices) };
        // SAFETY: each copy only touches its own console protocol.
        let (input, output, error) = unsafe {
            (
                system_table.unsafe_clone(),
                system_table.unsafe_clone(),
                system_table.unsafe_clone(),
            )
        };
        UefiFirmware {
            image,
            boot_services,
            volume: None,
            con_in: UefiConsoleIn::new(input),
            con_out: UefiTextOut::stdout(output),
            std_err: UefiTextOut::stderr(error),
        }
    }

    /// Open `P` on `handle` without taking exclusive ownership. Block and
    /// serial handles are usually already bound to a driver.
    fn open_shared<P: uefi::proto::ProtocolPointer + ?Sized>(
        &self,
        handle: Handle,
    ) -> Result<ScopedProtocol<'static, P>, Status> {
        // SAFETY: GetProtocol leaves the driver binding intact and the
        // protocol is only used while boot services are active.
        unsafe {
            self.boot_services.open_protocol::<P>(
                OpenProtocolParams {
                    handle,
                    agent: self.image,
                    controller: None,
                },
                OpenProtocolAttributes::GetProtocol,
            )
        }
        .map_err(status_of)
    }
}

impl Firmware for UefiFirmware {
    type File = UefiFile;
    type Serial = UefiSerial;
    type Block = UefiBlock;
    type Input = UefiConsoleIn;
    type Output = UefiTextOut;
    type Handle = UefiHandle;

    fn con_in(&mut self) -> &mut UefiConsoleIn {
        &mut self.con_in
    }

    fn con_out(&mut self) -> &mut UefiTextOut {
        &mut self.con_out
    }

    fn std_err(&mut self) -> &mut UefiTextOut {
        &mut self.std_err
    }

    fn open_boot_volume(&mut self) -> Result<UefiFile, Status> {
        if self.volume.is_none() {
            let fs = self
                .boot_services
                .get_image_file_system(self.image)
                .map_err(status_of)?;
            self.volume = Some(fs);
        }
        let fs = self.volume.as_mut().ok_or(Status::UNSUPPORTED)?;
        fs.open_volume().map(UefiFile::Dir).map_err(status_of)
    }

    fn locate_serial(&mut self) -> Result<UefiSerial, Status> {
        let handle = self
            .boot_services
            .get_handle_for_protocol::<Serial>()
            .map_err(status_of)?;
        self.open_shared::<Serial>(handle).map(UefiSerial::new)
    }

    fn locate_block_handles(&mut self, buffer: &mut [UefiHandle]) -> Result<usize, Status> {
        let handles = self
            .boot_services
            .locate_handle_buffer(SearchType::ByProtocol(&BlockIO::GUID))
            .map_err(status_of)?;
        if handles.len() > buffer.len() {
            return Err(Status::BUFFER_TOO_SMALL);
        }
        for (slot, handle) in buffer.iter_mut().zip(handles.iter()) {
            *slot = UefiHandle(Some(*handle));
        }
        Ok(handles.len())
    }

    fn open_block_io(&mut self, handle: UefiHandle) -> Result<UefiBlock, Status> {
        let handle = handle.0.ok_or(Status::INVALID_PARAMETER)?;
        self.open_shared::<BlockIO>(handle).map(UefiBlock::new)
    }
}

/// Install the `uefi` logger and build a stdio context over live firmware.
///
/// # Safety
///
/// Same contract as [`UefiFirmware::new`]: the returned context must not be
/// used after boot services have been exited.
pub unsafe fn init(
    image: Handle,
    system_table: &mut SystemTable<Boot>,
) -> Result<Stdio<UefiFirmware>, Status> {
    uefi::helpers::init(system_table).map_err(status_of)?;
    // SAFETY: forwarded to the caller.
    let firmware = unsafe { UefiFirmware::new(image, system_table) };
    info!("posix-uefi: stdio ready");
    Ok(Stdio::new(firmware))
}

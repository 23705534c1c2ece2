//! Device registry.
//!
//! Lazily discovers and caches the three firmware resources the stream layer
//! needs beyond the consoles: the boot volume's root directory, the serial
//! port and the list of usable block devices. The registry is owned by a
//! [`Stdio`](crate::Stdio) context; nothing here is global.

use alloc::vec;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::error::{Result, StdioError};
use crate::firmware::{BlockIo, Firmware, Parity, SerialAttributes, SerialIo, Status, StopBits};

/// Baud rate used when the caller asks for 9600 or less (including 0).
pub const DEFAULT_BAUD: u64 = 115_200;
/// Serial transfer timeout in microseconds.
pub const SERIAL_TIMEOUT: u32 = 1000;

const INITIAL_HANDLE_SLOTS: usize = 8;
const MAX_HANDLE_SLOTS: usize = 4096;

/// Cache of discovered firmware resources.
pub struct DeviceRegistry<F: Firmware> {
    root: Option<F::File>,
    serial: Option<F::Serial>,
    blocks: Option<Vec<F::Block>>,
}

impl<F: Firmware> Default for DeviceRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Firmware> DeviceRegistry<F> {
    pub const fn new() -> Self {
        Self {
            root: None,
            serial: None,
            blocks: None,
        }
    }

    /// Root directory of the boot volume, opened on first use.
    pub fn resolve_root_volume(&mut self, fw: &mut F) -> Result<&mut F::File> {
        if self.root.is_none() {
            let root = fw.open_boot_volume().map_err(|status| {
                warn!("boot volume unavailable: {status:?}");
                StdioError::NoDevice
            })?;
            debug!("opened boot volume root");
            self.root = Some(root);
        }
        self.root.as_mut().ok_or(StdioError::NoDevice)
    }

    /// The serial port, located on first use and reconfigured on every call.
    pub fn resolve_serial(&mut self, fw: &mut F, baud: u64) -> Result<&mut F::Serial> {
        if self.serial.is_none() {
            let serial = fw.locate_serial().map_err(|status| {
                warn!("no serial port: {status:?}");
                StdioError::NotFound
            })?;
            debug!("located serial port");
            self.serial = Some(serial);
        }
        let serial = self.serial.as_mut().ok_or(StdioError::NotFound)?;
        let attributes = serial_attributes(baud);
        if let Err(status) = serial.set_attributes(&attributes) {
            warn!(
                "serial reconfiguration to {} baud failed: {status:?}",
                attributes.baud_rate
            );
        }
        Ok(serial)
    }

    /// Usable block devices in enumeration order, discovered once.
    pub fn resolve_block_devices(&mut self, fw: &mut F) -> &mut Vec<F::Block> {
        if self.blocks.is_none() {
            let devices = enumerate_block_devices(fw);
            debug!("discovered {} block device(s)", devices.len());
            self.blocks = Some(devices);
        }
        self.blocks.get_or_insert_with(Vec::new)
    }

    /// The `index`-th usable block device, if it exists.
    pub fn block_device(&mut self, fw: &mut F, index: usize) -> Option<&mut F::Block> {
        self.resolve_block_devices(fw).get_mut(index)
    }

    /// Number of usable block devices.
    pub fn block_device_count(&mut self, fw: &mut F) -> usize {
        self.resolve_block_devices(fw).len()
    }

    /// Already-located serial port, without touching firmware.
    pub fn serial_mut(&mut self) -> Option<&mut F::Serial> {
        self.serial.as_mut()
    }

    /// Already-discovered block device, without touching firmware.
    pub fn cached_block_device(&mut self, index: usize) -> Option<&mut F::Block> {
        self.blocks.as_mut()?.get_mut(index)
    }

    /// Release the block-device list. Later lookups see no devices.
    pub fn teardown(&mut self) {
        if let Some(blocks) = self.blocks.replace(Vec::new()) {
            debug!("released {} block device(s)", blocks.len());
        }
    }
}

fn serial_attributes(baud: u64) -> SerialAttributes {
    SerialAttributes {
        baud_rate: if baud <= 9600 { DEFAULT_BAUD } else { baud },
        receive_fifo_depth: 0,
        timeout: SERIAL_TIMEOUT,
        parity: Parity::None,
        data_bits: 0,
        stop_bits: StopBits::One,
    }
}

fn enumerate_block_devices<F: Firmware>(fw: &mut F) -> Vec<F::Block> {
    let mut slots = INITIAL_HANDLE_SLOTS;
    let handles = loop {
        let mut scratch = vec![F::Handle::default(); slots];
        match fw.locate_block_handles(&mut scratch) {
            Ok(count) => {
                scratch.truncate(count);
                break scratch;
            }
            Err(Status::BUFFER_TOO_SMALL) if slots < MAX_HANDLE_SLOTS => slots *= 2,
            Err(status) => {
                debug!("block enumeration stopped: {status:?}");
                return Vec::new();
            }
        }
    };

    handles
        .into_iter()
        .filter_map(|handle| match fw.open_block_io(handle) {
            Ok(block) => Some(block),
            Err(status) => {
                warn!("cannot open block device: {status:?}");
                None
            }
        })
        .filter(|block| {
            let media = block.media();
            media.present && media.block_size > 0
        })
        .collect()
}

//! Firmware collaborator contract.
//!
//! The stream layer never talks to firmware tables directly. Everything it
//! needs is expressed by the traits below: a file protocol, console input and
//! text output, a serial port, block storage, and a [`Firmware`] root that
//! hands those out. A backend implements them once (see the `posix-uefi-efi`
//! crate); [`memory`] provides a deterministic in-memory implementation.

pub mod status;

#[cfg(feature = "memory-firmware")]
pub mod memory;

use core::ops::BitOr;

pub use status::Status;

/// Position value that moves a file cursor to end-of-file.
pub const END_OF_FILE_POSITION: u64 = u64::MAX;

/// Access requested from [`FileProtocol::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    ReadWrite,
    CreateReadWrite,
}

/// File attribute bits as reported by the firmware.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileAttributes(u64);

impl FileAttributes {
    pub const READ_ONLY: FileAttributes = FileAttributes(0x01);
    pub const HIDDEN: FileAttributes = FileAttributes(0x02);
    pub const SYSTEM: FileAttributes = FileAttributes(0x04);
    pub const DIRECTORY: FileAttributes = FileAttributes(0x10);
    pub const ARCHIVE: FileAttributes = FileAttributes(0x20);

    pub const fn empty() -> Self {
        FileAttributes(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        FileAttributes(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, other: FileAttributes) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FileAttributes {
    type Output = FileAttributes;

    fn bitor(self, rhs: FileAttributes) -> FileAttributes {
        FileAttributes(self.0 | rhs.0)
    }
}

/// Metadata fetched right after a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub attributes: FileAttributes,
}

impl FileInfo {
    pub const fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

/// An open filesystem object (file or directory).
pub trait FileProtocol: Sized {
    /// Open `path` relative to this handle. Paths use `\` separators.
    fn open(
        &mut self,
        path: &str,
        mode: FileMode,
        attributes: FileAttributes,
    ) -> Result<Self, Status>;

    fn close(self) -> Result<(), Status>;

    /// Delete the object. The handle is released whether or not the delete
    /// succeeds.
    fn delete(self) -> Result<(), Status>;

    /// Read at the cursor. Returns 0 at end-of-file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status>;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Status>;

    fn position(&mut self) -> Result<u64, Status>;

    /// Move the cursor. [`END_OF_FILE_POSITION`] moves it to the end.
    fn set_position(&mut self, position: u64) -> Result<(), Status>;

    fn info(&mut self) -> Result<FileInfo, Status>;

    /// Change the file length (used to truncate on `w` opens).
    fn set_size(&mut self, size: u64) -> Result<(), Status>;

    fn flush(&mut self) -> Result<(), Status>;
}

/// Console keyboard input.
pub trait ConsoleInput {
    /// Block until a key is available and return its UTF-16 unit.
    /// Keys without a printable unit (scan codes) return 0.
    fn read_key(&mut self) -> Result<u16, Status>;

    /// Non-blocking check for a pending key.
    fn key_pending(&mut self) -> bool;
}

/// Console text output.
pub trait TextOutput {
    /// Emit NUL-terminated UTF-16 text. Units after the first NUL are ignored.
    fn output_string(&mut self, text: &[u16]) -> Result<(), Status>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Default,
    None,
    Even,
    Odd,
    Mark,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    Default,
    One,
    OneFive,
    Two,
}

/// Serial line parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialAttributes {
    pub baud_rate: u64,
    /// 0 selects the device default.
    pub receive_fifo_depth: u32,
    /// Transfer timeout in microseconds.
    pub timeout: u32,
    pub parity: Parity,
    /// 0 selects the device default.
    pub data_bits: u8,
    pub stop_bits: StopBits,
}

/// A serial port.
pub trait SerialIo {
    fn set_attributes(&mut self, attributes: &SerialAttributes) -> Result<(), Status>;

    /// Returns the number of bytes received.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status>;

    /// Returns the number of bytes sent.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Status>;
}

/// Snapshot of a block device's media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMedia {
    pub media_id: u32,
    pub present: bool,
    pub read_only: bool,
    pub block_size: u32,
    pub last_block: u64,
}

/// Storage addressed in whole blocks.
pub trait BlockIo {
    fn media(&self) -> BlockMedia;

    /// `buf.len()` must be a multiple of the block size.
    fn read_blocks(&mut self, media_id: u32, lba: u64, buf: &mut [u8]) -> Result<(), Status>;

    /// `buf.len()` must be a multiple of the block size.
    fn write_blocks(&mut self, media_id: u32, lba: u64, buf: &[u8]) -> Result<(), Status>;

    fn flush_blocks(&mut self) -> Result<(), Status>;
}

/// Root of the collaborator contract.
pub trait Firmware {
    type File: FileProtocol;
    type Serial: SerialIo;
    type Block: BlockIo;
    type Input: ConsoleInput;
    type Output: TextOutput;
    /// Opaque handle returned by block-device enumeration.
    type Handle: Copy + Default;

    fn con_in(&mut self) -> &mut Self::Input;

    fn con_out(&mut self) -> &mut Self::Output;

    fn std_err(&mut self) -> &mut Self::Output;

    /// Open the root directory of the volume the running image was loaded
    /// from. Fails when that device carries no filesystem.
    fn open_boot_volume(&mut self) -> Result<Self::File, Status>;

    /// Locate the system's serial port.
    fn locate_serial(&mut self) -> Result<Self::Serial, Status>;

    /// Fill `buffer` with every handle exposing block I/O and return the
    /// count. Fails with [`Status::BUFFER_TOO_SMALL`] when `buffer` cannot
    /// hold them all.
    fn locate_block_handles(&mut self, buffer: &mut [Self::Handle]) -> Result<usize, Status>;

    fn open_block_io(&mut self, handle: Self::Handle) -> Result<Self::Block, Status>;
}

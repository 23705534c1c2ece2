//! Stream dispatcher.
//!
//! Every operation matches on the stream variant in the order console,
//! serial, block device, generic file. Special streams are handled (or
//! rejected) before anything reaches the file protocol. Failures are stored
//! in the context's last-error slot as they are returned.

use alloc::vec;

use log::{debug, warn};

use super::mode::{Access, OpenMode, parse_mode};
use super::path::{PseudoPath, classify, to_firmware_path};
use super::stream::{Stream, Whence};
use super::console::PendingKey;
use crate::errno::Errno;
use crate::error::{Result, StdioError};
use crate::firmware::{
    BlockIo, END_OF_FILE_POSITION, FileAttributes, FileProtocol, Firmware, SerialIo, Status,
};
use crate::registry::DeviceRegistry;

/// Translate a firmware failure, logging it once.
pub(crate) fn translate(op: &str, status: Status) -> StdioError {
    let error = StdioError::from_status(status);
    warn!("{op} failed: {status:?} ({error})");
    error
}

fn close_quietly<H: FileProtocol>(file: H) {
    if let Err(status) = file.close() {
        warn!("close after failed open: {status:?}");
    }
}

/// The stdio context: firmware, device cache and last error.
pub struct Stdio<F: Firmware> {
    pub(crate) firmware: F,
    pub(crate) registry: DeviceRegistry<F>,
    /// Tail of a key whose UTF-8 encoding did not fit the last stdin read.
    pub(crate) pending_key: PendingKey,
    errno: Errno,
}

impl<F: Firmware> Stdio<F> {
    pub fn new(firmware: F) -> Self {
        Self {
            firmware,
            registry: DeviceRegistry::new(),
            pending_key: PendingKey::default(),
            errno: Errno::new(),
        }
    }

    pub fn firmware(&self) -> &F {
        &self.firmware
    }

    pub fn firmware_mut(&mut self) -> &mut F {
        &mut self.firmware
    }

    pub fn into_firmware(self) -> F {
        self.firmware
    }

    /// Last recorded error number; 0 if none since the last clear.
    pub fn errno(&self) -> i32 {
        self.errno.get()
    }

    pub fn clear_errno(&mut self) {
        self.errno.clear();
    }

    /// Store a failure in the last-error slot and pass the result through.
    pub(crate) fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            self.errno.set(error.errno());
        }
        result
    }

    // -----------------------------------------------------------------------
    // Open / close
    // -----------------------------------------------------------------------

    /// Open a pseudo-path or a file on the boot volume.
    ///
    /// `mode` starts with `r`, `w` or `a`; a `d` in second position requires
    /// the path to be a directory.
    pub fn open(&mut self, path: &str, mode: &str) -> Result<Stream<F::File>> {
        let result = self.open_inner(path, mode);
        self.record(result)
    }

    fn open_inner(&mut self, path: &str, mode: &str) -> Result<Stream<F::File>> {
        if path.is_empty() || mode.is_empty() {
            return Err(StdioError::InvalidArgument);
        }
        let mode = parse_mode(mode).ok_or(StdioError::InvalidArgument)?;
        match classify(path) {
            Some(device) => self.open_device(device, &mode),
            None => {
                let file = self.open_file(path, &mode, Some(mode.directory))?;
                Ok(Stream::File(file))
            }
        }
    }

    fn open_device(&mut self, device: PseudoPath, mode: &OpenMode) -> Result<Stream<F::File>> {
        match device {
            PseudoPath::StdIn if mode.writes() => Err(StdioError::PermissionDenied),
            PseudoPath::StdIn => Ok(Stream::StdIn),
            PseudoPath::StdOut | PseudoPath::StdErr if mode.reads() => {
                Err(StdioError::PermissionDenied)
            }
            PseudoPath::StdOut => Ok(Stream::StdOut),
            PseudoPath::StdErr => Ok(Stream::StdErr),
            PseudoPath::Serial { baud } => {
                self.registry.resolve_serial(&mut self.firmware, baud)?;
                Ok(Stream::Serial)
            }
            PseudoPath::Disk { index } => {
                if index < self.registry.block_device_count(&mut self.firmware) {
                    Ok(Stream::BlockDevice { index, lba: 0 })
                } else {
                    debug!("no block device {index}");
                    Err(StdioError::NotFound)
                }
            }
        }
    }

    /// Open a filesystem object. `expect_dir` checks the object's kind after
    /// opening; `None` accepts either.
    fn open_file(
        &mut self,
        path: &str,
        mode: &OpenMode,
        expect_dir: Option<bool>,
    ) -> Result<F::File> {
        let firmware_path = to_firmware_path(path);
        let firmware_mode = mode.firmware_mode();
        let attributes = if mode.directory && mode.writes() {
            FileAttributes::DIRECTORY
        } else {
            FileAttributes::empty()
        };

        let root = self.registry.resolve_root_volume(&mut self.firmware)?;
        let mut file = root
            .open(&firmware_path, firmware_mode, attributes)
            .map_err(|status| translate("open", status))?;

        let info = match file.info() {
            Ok(info) => info,
            Err(status) => {
                close_quietly(file);
                return Err(translate("get info", status));
            }
        };
        match expect_dir {
            Some(false) if info.is_directory() => {
                close_quietly(file);
                return Err(StdioError::IsADirectory);
            }
            Some(true) if !info.is_directory() => {
                close_quietly(file);
                return Err(StdioError::NotADirectory);
            }
            _ => {}
        }

        if !info.is_directory() {
            let prepared = match mode.access {
                Access::Write if info.size > 0 => file.set_size(0),
                Access::Append => file.set_position(END_OF_FILE_POSITION),
                _ => Ok(()),
            };
            if let Err(status) = prepared {
                close_quietly(file);
                return Err(translate("prepare", status));
            }
        }
        Ok(file)
    }

    /// Close a stream. Special streams detach without releasing anything.
    pub fn close(&mut self, stream: Stream<F::File>) -> Result<()> {
        let result = match stream {
            Stream::File(file) => file.close().map_err(|status| translate("close", status)),
            _ => Ok(()),
        };
        self.record(result)
    }

    pub fn flush(&mut self, stream: &mut Stream<F::File>) -> Result<()> {
        let result = match stream {
            Stream::StdIn | Stream::StdOut | Stream::StdErr | Stream::Serial => Ok(()),
            Stream::BlockDevice { index, .. } => match self.registry.cached_block_device(*index) {
                Some(block) => block
                    .flush_blocks()
                    .map_err(|status| translate("flush", status)),
                None => Err(StdioError::BadHandle),
            },
            Stream::File(file) => file.flush().map_err(|status| translate("flush", status)),
        };
        self.record(result)
    }

    // -----------------------------------------------------------------------
    // Transfer
    // -----------------------------------------------------------------------

    /// Read into `buf`. Block devices transfer whole blocks and report the
    /// rounded-up byte count.
    pub fn read(&mut self, stream: &mut Stream<F::File>, buf: &mut [u8]) -> Result<usize> {
        let result = self.read_inner(stream, buf);
        self.record(result)
    }

    fn read_inner(&mut self, stream: &mut Stream<F::File>, buf: &mut [u8]) -> Result<usize> {
        match stream {
            Stream::StdIn => self.console_read(buf),
            Stream::StdOut | Stream::StdErr => Err(StdioError::BadHandle),
            Stream::Serial => {
                let serial = self.registry.serial_mut().ok_or(StdioError::BadHandle)?;
                serial
                    .read(buf)
                    .map_err(|status| translate("serial read", status))
            }
            Stream::BlockDevice { index, lba } => {
                let block = self
                    .registry
                    .cached_block_device(*index)
                    .ok_or(StdioError::BadHandle)?;
                block_read(block, lba, buf)
            }
            Stream::File(file) => match file.read(buf) {
                Ok(count) => Ok(count),
                Err(Status::END_OF_FILE) => Ok(0),
                Err(status) => Err(translate("read", status)),
            },
        }
    }

    /// Write `buf`. Block devices transfer whole blocks and report the
    /// rounded-up byte count.
    pub fn write(&mut self, stream: &mut Stream<F::File>, buf: &[u8]) -> Result<usize> {
        let result = self.write_inner(stream, buf);
        self.record(result)
    }

    fn write_inner(&mut self, stream: &mut Stream<F::File>, buf: &[u8]) -> Result<usize> {
        match stream {
            Stream::StdIn => Err(StdioError::BadHandle),
            Stream::StdOut => self.console_write(false, buf),
            Stream::StdErr => self.console_write(true, buf),
            Stream::Serial => {
                let serial = self.registry.serial_mut().ok_or(StdioError::BadHandle)?;
                serial
                    .write(buf)
                    .map_err(|status| translate("serial write", status))
            }
            Stream::BlockDevice { index, lba } => {
                let block = self
                    .registry
                    .cached_block_device(*index)
                    .ok_or(StdioError::BadHandle)?;
                block_write(block, lba, buf)
            }
            Stream::File(file) => file.write(buf).map_err(|status| translate("write", status)),
        }
    }

    // -----------------------------------------------------------------------
    // Positioning
    // -----------------------------------------------------------------------

    /// Move a file cursor. The target may lie past the end of the file but
    /// never before its start.
    pub fn seek(
        &mut self,
        stream: &mut Stream<F::File>,
        offset: i64,
        whence: Whence,
    ) -> Result<()> {
        let result = match stream {
            Stream::StdIn | Stream::StdOut | Stream::StdErr => Err(StdioError::NotSeekable),
            Stream::Serial | Stream::BlockDevice { .. } => Err(StdioError::BadHandle),
            Stream::File(file) => seek_file(file, offset, whence),
        };
        self.record(result)
    }

    pub fn tell(&mut self, stream: &mut Stream<F::File>) -> Result<u64> {
        let result = match stream {
            Stream::StdIn | Stream::StdOut | Stream::StdErr => Err(StdioError::NotSeekable),
            Stream::Serial | Stream::BlockDevice { .. } => Err(StdioError::BadHandle),
            Stream::File(file) => file
                .position()
                .map_err(|status| translate("get position", status)),
        };
        self.record(result)
    }

    /// True when the cursor sits exactly at end-of-file. The cursor is left
    /// where it was.
    pub fn at_end(&mut self, stream: &mut Stream<F::File>) -> Result<bool> {
        let result = match stream {
            Stream::StdIn | Stream::StdOut | Stream::StdErr => Err(StdioError::NotSeekable),
            Stream::Serial | Stream::BlockDevice { .. } => Err(StdioError::BadHandle),
            Stream::File(file) => file_at_end(file),
        };
        self.record(result)
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Delete a file or an empty directory.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let result = self.remove_inner(path, None);
        self.record(result)
    }

    /// Delete a file; directories are refused with `IsADirectory`.
    pub fn remove_file(&mut self, path: &str) -> Result<()> {
        let result = self.remove_inner(path, Some(false));
        self.record(result)
    }

    /// Delete an empty directory; files are refused with `NotADirectory`.
    pub fn remove_dir(&mut self, path: &str) -> Result<()> {
        let result = self.remove_inner(path, Some(true));
        self.record(result)
    }

    fn remove_inner(&mut self, path: &str, expect_dir: Option<bool>) -> Result<()> {
        if path.is_empty() {
            return Err(StdioError::InvalidArgument);
        }
        if classify(path).is_some() {
            return Err(StdioError::BadHandle);
        }
        let mode = OpenMode {
            access: Access::Read,
            directory: expect_dir.unwrap_or(false),
            update: false,
        };
        let file = self.open_file(path, &mode, expect_dir)?;
        file.delete().map_err(|status| translate("delete", status))
    }

    /// Boot-service exit: drop the block-device cache.
    pub fn exit_boot_services(&mut self) {
        self.registry.teardown();
    }
}

fn seek_file<H: FileProtocol>(file: &mut H, offset: i64, whence: Whence) -> Result<()> {
    let base = match whence {
        Whence::Set => 0,
        Whence::Current => file
            .position()
            .map_err(|status| translate("get position", status))?,
        Whence::End => {
            file.info()
                .map_err(|status| translate("get info", status))?
                .size
        }
    };
    let target = base
        .checked_add_signed(offset)
        .filter(|&target| target <= i64::MAX as u64)
        .ok_or(StdioError::InvalidArgument)?;
    file.set_position(target)
        .map_err(|status| translate("set position", status))
}

fn file_at_end<H: FileProtocol>(file: &mut H) -> Result<bool> {
    let saved = file
        .position()
        .map_err(|status| translate("get position", status))?;
    file.set_position(END_OF_FILE_POSITION)
        .map_err(|status| translate("set position", status))?;
    let size = file.position();
    let restored = file.set_position(saved);
    let size = size.map_err(|status| translate("get position", status))?;
    restored.map_err(|status| translate("set position", status))?;
    Ok(saved == size)
}

fn block_size_of<B: BlockIo>(block: &B) -> Result<(u32, usize)> {
    let media = block.media();
    match media.block_size as usize {
        0 => Err(StdioError::GenericIO),
        size => Ok((media.media_id, size)),
    }
}

/// Read whole blocks at `lba`; a trailing partial block goes through a
/// one-block scratch buffer.
fn block_read<B: BlockIo>(block: &mut B, lba: &mut u64, buf: &mut [u8]) -> Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let (media_id, block_size) = block_size_of(block)?;
    let whole = buf.len() / block_size * block_size;
    if whole > 0 {
        block
            .read_blocks(media_id, *lba, &mut buf[..whole])
            .map_err(|status| translate("block read", status))?;
    }
    let tail = buf.len() - whole;
    if tail > 0 {
        let mut scratch = vec![0u8; block_size];
        let tail_lba = *lba + (whole / block_size) as u64;
        block
            .read_blocks(media_id, tail_lba, &mut scratch)
            .map_err(|status| translate("block read", status))?;
        buf[whole..].copy_from_slice(&scratch[..tail]);
    }
    let blocks = buf.len().div_ceil(block_size);
    *lba += blocks as u64;
    Ok(blocks * block_size)
}

/// Write whole blocks at `lba`; a trailing partial block is zero-filled.
fn block_write<B: BlockIo>(block: &mut B, lba: &mut u64, buf: &[u8]) -> Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    let (media_id, block_size) = block_size_of(block)?;
    let whole = buf.len() / block_size * block_size;
    if whole > 0 {
        block
            .write_blocks(media_id, *lba, &buf[..whole])
            .map_err(|status| translate("block write", status))?;
    }
    let tail = buf.len() - whole;
    if tail > 0 {
        let mut scratch = vec![0u8; block_size];
        scratch[..tail].copy_from_slice(&buf[whole..]);
        let tail_lba = *lba + (whole / block_size) as u64;
        block
            .write_blocks(media_id, tail_lba, &scratch)
            .map_err(|status| translate("block write", status))?;
    }
    let blocks = buf.len().div_ceil(block_size);
    *lba += blocks as u64;
    Ok(blocks * block_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno;
    use crate::firmware::memory::{MemoryDisk, MemoryFirmware, MemoryVolume};

    fn stdio(volume: MemoryVolume) -> Stdio<MemoryFirmware> {
        Stdio::new(MemoryFirmware::new().with_volume(volume))
    }

    #[test]
    fn empty_path_or_mode_is_invalid() {
        let mut io = stdio(MemoryVolume::new());
        assert_eq!(io.open("", "r").err(), Some(StdioError::InvalidArgument));
        assert_eq!(io.open("f", "").err(), Some(StdioError::InvalidArgument));
        assert_eq!(io.open("f", "q").err(), Some(StdioError::InvalidArgument));
        assert_eq!(io.errno(), errno::EINVAL);
    }

    #[test]
    fn console_direction_checked_at_open() {
        let mut io = stdio(MemoryVolume::new());
        assert!(matches!(io.open("/dev/stdin", "r"), Ok(Stream::StdIn)));
        assert_eq!(
            io.open("/dev/stdin", "w").err(),
            Some(StdioError::PermissionDenied)
        );
        assert_eq!(
            io.open("/dev/stdout", "r").err(),
            Some(StdioError::PermissionDenied)
        );
        assert!(matches!(io.open("/dev/stderr", "a"), Ok(Stream::StdErr)));
    }

    #[test]
    fn write_truncates_existing_file() {
        let mut io = stdio(MemoryVolume::new().with_file("log.txt", b"old contents"));
        let mut stream = io.open("/log.txt", "w").unwrap();
        io.write(&mut stream, b"new").unwrap();
        io.close(stream).unwrap();
        assert_eq!(io.firmware().file_contents("log.txt"), Some(b"new".to_vec()));
    }

    #[test]
    fn kind_mismatch_closes_and_fails() {
        let mut io = stdio(MemoryVolume::new().with_dir("EFI").with_file("a.txt", b""));
        assert_eq!(io.open("/EFI", "r").err(), Some(StdioError::IsADirectory));
        assert_eq!(io.errno(), errno::EISDIR);
        assert_eq!(io.open("/a.txt", "rd").err(), Some(StdioError::NotADirectory));
        assert!(matches!(io.open("/EFI", "rd"), Ok(Stream::File(_))));
    }

    #[test]
    fn wd_creates_directory() {
        let mut io = stdio(MemoryVolume::new());
        let stream = io.open("/logs", "wd").unwrap();
        io.close(stream).unwrap();
        assert!(io.firmware().is_directory("logs"));
    }

    #[test]
    fn seek_before_start_is_invalid() {
        let mut io = stdio(MemoryVolume::new().with_file("f", b"0123456789"));
        let mut stream = io.open("/f", "r").unwrap();
        io.seek(&mut stream, -3, Whence::End).unwrap();
        assert_eq!(io.tell(&mut stream).unwrap(), 7);
        io.seek(&mut stream, 2, Whence::Current).unwrap();
        assert_eq!(io.tell(&mut stream).unwrap(), 9);
        assert_eq!(
            io.seek(&mut stream, -20, Whence::Current).err(),
            Some(StdioError::InvalidArgument)
        );
        assert_eq!(io.tell(&mut stream).unwrap(), 9);
    }

    #[test]
    fn serial_and_block_streams_are_not_positionable() {
        let mut io = Stdio::new(
            MemoryFirmware::new()
                .with_serial()
                .with_disk(MemoryDisk::new(512, 4)),
        );
        let mut serial = io.open("/dev/serial", "w").unwrap();
        let mut disk = io.open("/dev/disk0", "r").unwrap();
        assert_eq!(io.tell(&mut serial).err(), Some(StdioError::BadHandle));
        assert_eq!(
            io.seek(&mut disk, 0, Whence::Set).err(),
            Some(StdioError::BadHandle)
        );
        assert_eq!(io.at_end(&mut disk).err(), Some(StdioError::BadHandle));
    }

    #[test]
    fn serial_round_trip() {
        let mut io = Stdio::new(MemoryFirmware::new().with_serial());
        let mut serial = io.open("/dev/serial115200", "r+").unwrap();
        io.write(&mut serial, b"AT\r").unwrap();
        io.firmware_mut().push_serial_input(b"OK");
        let mut buf = [0u8; 8];
        assert_eq!(io.read(&mut serial, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"OK");
        assert_eq!(io.firmware().serial_output(), b"AT\r");
        io.close(serial).unwrap();
    }

    #[test]
    fn block_partial_tail_zero_filled() {
        let mut io = Stdio::new(MemoryFirmware::new().with_disk(MemoryDisk::new(4, 4)));
        let mut disk = io.open("/dev/disk0", "w").unwrap();
        assert_eq!(io.write(&mut disk, b"abcdef").unwrap(), 8);
        assert_eq!(io.write(&mut disk, b"z").unwrap(), 4);
        let contents = io.firmware().disk_contents(0).unwrap();
        assert_eq!(&contents[..12], b"abcdef\0\0z\0\0\0");
    }

    #[test]
    fn block_flush_forwards() {
        let mut io = Stdio::new(MemoryFirmware::new().with_disk(MemoryDisk::new(512, 4)));
        let mut disk = io.open("/dev/disk", "r").unwrap();
        io.flush(&mut disk).unwrap();
        assert_eq!(io.firmware().disk_flushes(0), Some(1));
    }

    #[test]
    fn exit_boot_services_drops_disks() {
        let mut io = Stdio::new(MemoryFirmware::new().with_disk(MemoryDisk::new(512, 4)));
        let mut disk = io.open("/dev/disk0", "r").unwrap();
        io.exit_boot_services();
        let mut buf = [0u8; 512];
        assert_eq!(io.read(&mut disk, &mut buf).err(), Some(StdioError::BadHandle));
        assert_eq!(io.open("/dev/disk0", "r").err(), Some(StdioError::NotFound));
    }

    #[test]
    fn remove_rejects_pseudo_paths() {
        let mut io = stdio(MemoryVolume::new());
        assert_eq!(io.remove("/dev/serial").err(), Some(StdioError::BadHandle));
        assert_eq!(io.firmware().stats().total(), 0);
    }

    #[test]
    fn remove_variants_check_kind() {
        let mut io = stdio(
            MemoryVolume::new()
                .with_dir("empty")
                .with_file("full/x", b"1")
                .with_file("f", b"1"),
        );
        assert_eq!(io.remove_file("/empty").err(), Some(StdioError::IsADirectory));
        assert_eq!(io.remove_dir("/f").err(), Some(StdioError::NotADirectory));
        assert_eq!(io.remove("/full").err(), Some(StdioError::PermissionDenied));
        io.remove_dir("/empty").unwrap();
        io.remove_file("/f").unwrap();
        assert!(!io.firmware().exists("empty"));
        assert!(!io.firmware().exists("f"));
        assert_eq!(io.remove("/f").err(), Some(StdioError::NotFound));
    }

    #[test]
    fn read_only_volume_maps_to_erofs() {
        let mut io = stdio(MemoryVolume::new().with_file("f", b"1").read_only());
        assert_eq!(
            io.open("/f", "a").err(),
            Some(StdioError::ReadOnlyFilesystem)
        );
        assert_eq!(io.errno(), errno::EROFS);
        io.clear_errno();
        assert_eq!(io.errno(), 0);
    }

    #[test]
    fn success_keeps_last_error() {
        let mut io = stdio(MemoryVolume::new().with_file("f", b"1"));
        let _ = io.open("/missing", "r");
        assert_eq!(io.errno(), errno::ENOENT);
        let stream = io.open("/f", "r").unwrap();
        io.close(stream).unwrap();
        assert_eq!(io.errno(), errno::ENOENT);
    }
}

//! In-memory firmware.
//!
//! A deterministic implementation of the [`Firmware`] contract: a boot
//! volume held in a map, a keyboard queue, captured console output, a
//! loopback-style serial port and RAM-backed block devices. Every entry point
//! bumps a counter in [`CallStats`] so callers can check whether an
//! operation reached the firmware at all.
//!
//! Failure modes follow the firmware specification closely enough for the
//! stream layer's translation table to be exercised: read-only volumes
//! report `WRITE_PROTECTED`, exhausted capacity `VOLUME_FULL`, writes through
//! read handles `ACCESS_DENIED`, and missing objects `NOT_FOUND`.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use super::{
    BlockIo, BlockMedia, ConsoleInput, END_OF_FILE_POSITION, FileAttributes, FileInfo, FileMode,
    FileProtocol, Firmware, SerialAttributes, SerialIo, Status, TextOutput,
};

type Shared<T> = Rc<RefCell<T>>;

fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Counters of firmware entry points.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallStats {
    pub boot_volume_opens: u32,
    pub serial_locates: u32,
    pub serial_configures: u32,
    pub block_enumerations: u32,
    pub block_opens: u32,
    pub console_calls: u32,
    pub file_calls: u32,
    pub serial_calls: u32,
    pub block_calls: u32,
}

impl CallStats {
    /// Sum of all counters.
    pub fn total(&self) -> u32 {
        self.boot_volume_opens
            + self.serial_locates
            + self.serial_configures
            + self.block_enumerations
            + self.block_opens
            + self.console_calls
            + self.file_calls
            + self.serial_calls
            + self.block_calls
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Resolve `path` against `base`, producing a `\`-joined key without a
/// leading separator. The root directory is the empty key.
fn resolve_path(base: &str, path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !path.starts_with(['\\', '/']) {
        parts.extend(base.split('\\').filter(|part| !part.is_empty()));
    }
    for part in path.split(['\\', '/']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    parts.join("\\")
}

fn parent_of(key: &str) -> &str {
    key.rsplit_once('\\').map_or("", |(parent, _)| parent)
}

// ---------------------------------------------------------------------------
// Volume
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug)]
struct VolumeState {
    nodes: BTreeMap<String, Node>,
    read_only: bool,
    capacity: Option<usize>,
}

impl VolumeState {
    fn used(&self) -> usize {
        self.nodes
            .values()
            .map(|node| match node {
                Node::File(data) => data.len(),
                Node::Dir => 0,
            })
            .sum()
    }

    fn has_children(&self, key: &str) -> bool {
        self.nodes
            .keys()
            .any(|other| other != key && parent_of(other) == key)
    }

    fn check_growth(&self, growth: usize) -> Result<(), Status> {
        match self.capacity {
            Some(capacity) if self.used() + growth > capacity => Err(Status::VOLUME_FULL),
            _ => Ok(()),
        }
    }
}

/// Builder for the simulated boot volume.
#[derive(Debug, Clone)]
pub struct MemoryVolume {
    nodes: BTreeMap<String, Node>,
    read_only: bool,
    capacity: Option<usize>,
}

impl Default for MemoryVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVolume {
    /// An empty, writable volume with unlimited capacity.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), Node::Dir);
        Self {
            nodes,
            read_only: false,
            capacity: None,
        }
    }

    /// Add a directory, creating missing parents.
    pub fn with_dir(mut self, path: &str) -> Self {
        let key = resolve_path("", path);
        self.ensure_parents(&key);
        self.nodes.insert(key, Node::Dir);
        self
    }

    /// Add a file with the given contents, creating missing parents.
    pub fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        let key = resolve_path("", path);
        self.ensure_parents(&key);
        self.nodes.insert(key, Node::File(contents.to_vec()));
        self
    }

    /// Reject every modification with `WRITE_PROTECTED`.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Limit the total size of all files.
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.capacity = Some(bytes);
        self
    }

    fn ensure_parents(&mut self, key: &str) {
        let mut parent = parent_of(key);
        while !parent.is_empty() {
            self.nodes.entry(String::from(parent)).or_insert(Node::Dir);
            parent = parent_of(parent);
        }
    }

    fn into_state(self) -> VolumeState {
        VolumeState {
            nodes: self.nodes,
            read_only: self.read_only,
            capacity: self.capacity,
        }
    }
}

/// Open handle on the simulated volume.
#[derive(Debug)]
pub struct MemoryFile {
    volume: Shared<VolumeState>,
    stats: Shared<CallStats>,
    key: String,
    position: u64,
    writable: bool,
}

impl MemoryFile {
    fn tick(&self) {
        self.stats.borrow_mut().file_calls += 1;
    }

    /// Volume key of this handle (`\`-separated, no leading separator).
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl FileProtocol for MemoryFile {
    fn open(
        &mut self,
        path: &str,
        mode: FileMode,
        attributes: FileAttributes,
    ) -> Result<Self, Status> {
        self.tick();
        let mut volume = self.volume.borrow_mut();
        match volume.nodes.get(&self.key) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(Status::UNSUPPORTED),
            None => return Err(Status::NOT_FOUND),
        }

        let key = resolve_path(&self.key, path);
        let writable = mode != FileMode::Read;
        if writable && volume.read_only {
            return Err(Status::WRITE_PROTECTED);
        }
        if !volume.nodes.contains_key(&key) {
            if mode != FileMode::CreateReadWrite {
                return Err(Status::NOT_FOUND);
            }
            if !matches!(volume.nodes.get(parent_of(&key)), Some(Node::Dir)) {
                return Err(Status::NOT_FOUND);
            }
            let node = if attributes.contains(FileAttributes::DIRECTORY) {
                Node::Dir
            } else {
                Node::File(Vec::new())
            };
            volume.nodes.insert(key.clone(), node);
        }

        Ok(MemoryFile {
            volume: Rc::clone(&self.volume),
            stats: Rc::clone(&self.stats),
            key,
            position: 0,
            writable,
        })
    }

    fn close(self) -> Result<(), Status> {
        self.tick();
        Ok(())
    }

    fn delete(self) -> Result<(), Status> {
        self.tick();
        let mut volume = self.volume.borrow_mut();
        if volume.read_only {
            return Err(Status::WRITE_PROTECTED);
        }
        if self.key.is_empty() || volume.has_children(&self.key) {
            return Err(Status::ACCESS_DENIED);
        }
        volume
            .nodes
            .remove(&self.key)
            .map(|_| ())
            .ok_or(Status::NOT_FOUND)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        self.tick();
        let volume = self.volume.borrow();
        let data = match volume.nodes.get(&self.key) {
            Some(Node::File(data)) => data,
            Some(Node::Dir) => return Err(Status::UNSUPPORTED),
            None => return Err(Status::NOT_FOUND),
        };
        let start = usize::try_from(self.position).map_err(|_| Status::DEVICE_ERROR)?;
        if start > data.len() {
            return Err(Status::DEVICE_ERROR);
        }
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Status> {
        self.tick();
        if !self.writable {
            return Err(Status::ACCESS_DENIED);
        }
        let mut volume = self.volume.borrow_mut();
        if volume.read_only {
            return Err(Status::WRITE_PROTECTED);
        }
        let start = usize::try_from(self.position).map_err(|_| Status::VOLUME_FULL)?;
        let end = start.checked_add(buf.len()).ok_or(Status::VOLUME_FULL)?;
        let current = match volume.nodes.get(&self.key) {
            Some(Node::File(data)) => data.len(),
            Some(Node::Dir) => return Err(Status::UNSUPPORTED),
            None => return Err(Status::NOT_FOUND),
        };
        volume.check_growth(end.saturating_sub(current))?;
        if let Some(Node::File(data)) = volume.nodes.get_mut(&self.key) {
            if data.len() < end {
                data.resize(end, 0);
            }
            data[start..end].copy_from_slice(buf);
        }
        self.position = end as u64;
        Ok(buf.len())
    }

    fn position(&mut self) -> Result<u64, Status> {
        self.tick();
        if self.volume.borrow().nodes.contains_key(&self.key) {
            Ok(self.position)
        } else {
            Err(Status::NOT_FOUND)
        }
    }

    fn set_position(&mut self, position: u64) -> Result<(), Status> {
        self.tick();
        let volume = self.volume.borrow();
        match volume.nodes.get(&self.key) {
            Some(Node::File(data)) => {
                self.position = if position == END_OF_FILE_POSITION {
                    data.len() as u64
                } else {
                    position
                };
                Ok(())
            }
            // Directories only support rewinding.
            Some(Node::Dir) if position == 0 => {
                self.position = 0;
                Ok(())
            }
            Some(Node::Dir) => Err(Status::UNSUPPORTED),
            None => Err(Status::NOT_FOUND),
        }
    }

    fn info(&mut self) -> Result<FileInfo, Status> {
        self.tick();
        let volume = self.volume.borrow();
        match volume.nodes.get(&self.key) {
            Some(Node::File(data)) => Ok(FileInfo {
                size: data.len() as u64,
                attributes: FileAttributes::ARCHIVE,
            }),
            Some(Node::Dir) => Ok(FileInfo {
                size: 0,
                attributes: FileAttributes::DIRECTORY,
            }),
            None => Err(Status::NOT_FOUND),
        }
    }

    fn set_size(&mut self, size: u64) -> Result<(), Status> {
        self.tick();
        if !self.writable {
            return Err(Status::ACCESS_DENIED);
        }
        let mut volume = self.volume.borrow_mut();
        if volume.read_only {
            return Err(Status::WRITE_PROTECTED);
        }
        let size = usize::try_from(size).map_err(|_| Status::VOLUME_FULL)?;
        let current = match volume.nodes.get(&self.key) {
            Some(Node::File(data)) => data.len(),
            Some(Node::Dir) => return Err(Status::UNSUPPORTED),
            None => return Err(Status::NOT_FOUND),
        };
        volume.check_growth(size.saturating_sub(current))?;
        if let Some(Node::File(data)) = volume.nodes.get_mut(&self.key) {
            data.resize(size, 0);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Status> {
        self.tick();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Keyboard fed from a queue. An empty queue reports `NOT_READY`.
#[derive(Debug)]
pub struct MemoryConsoleIn {
    keys: VecDeque<u16>,
    stats: Shared<CallStats>,
}

impl ConsoleInput for MemoryConsoleIn {
    fn read_key(&mut self) -> Result<u16, Status> {
        self.stats.borrow_mut().console_calls += 1;
        self.keys.pop_front().ok_or(Status::NOT_READY)
    }

    fn key_pending(&mut self) -> bool {
        self.stats.borrow_mut().console_calls += 1;
        !self.keys.is_empty()
    }
}

/// Console output captured into a buffer.
#[derive(Debug)]
pub struct MemoryTextOutput {
    units: Vec<u16>,
    stats: Shared<CallStats>,
}

impl MemoryTextOutput {
    /// Everything emitted so far, as UTF-16 units.
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Everything emitted so far, decoded lossily.
    pub fn text(&self) -> String {
        char::decode_utf16(self.units.iter().copied())
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

impl TextOutput for MemoryTextOutput {
    fn output_string(&mut self, text: &[u16]) -> Result<(), Status> {
        self.stats.borrow_mut().console_calls += 1;
        self.units
            .extend(text.iter().copied().take_while(|&unit| unit != 0));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Serial
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SerialState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    attributes: Option<SerialAttributes>,
    reject_attributes: bool,
}

/// Serial port with a receive queue and a transmit log.
#[derive(Debug)]
pub struct MemorySerial {
    state: Shared<SerialState>,
    stats: Shared<CallStats>,
}

impl SerialIo for MemorySerial {
    fn set_attributes(&mut self, attributes: &SerialAttributes) -> Result<(), Status> {
        self.stats.borrow_mut().serial_configures += 1;
        let mut state = self.state.borrow_mut();
        if state.reject_attributes {
            return Err(Status::DEVICE_ERROR);
        }
        state.attributes = Some(*attributes);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        self.stats.borrow_mut().serial_calls += 1;
        let mut state = self.state.borrow_mut();
        let count = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Status> {
        self.stats.borrow_mut().serial_calls += 1;
        self.state.borrow_mut().tx.extend_from_slice(buf);
        Ok(buf.len())
    }
}

// ---------------------------------------------------------------------------
// Block devices
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DiskState {
    media: BlockMedia,
    data: Vec<u8>,
    flushes: u32,
}

/// Builder for a RAM-backed block device.
#[derive(Debug, Clone)]
pub struct MemoryDisk {
    media: BlockMedia,
    data: Vec<u8>,
}

impl MemoryDisk {
    /// A zero-filled device of `blocks` blocks with media present.
    pub fn new(block_size: u32, blocks: u64) -> Self {
        let len = (block_size as usize).saturating_mul(blocks as usize);
        Self {
            media: BlockMedia {
                media_id: 1,
                present: true,
                read_only: false,
                block_size,
                last_block: blocks.saturating_sub(1),
            },
            data: alloc::vec![0; len],
        }
    }

    /// Device with no media inserted.
    pub fn without_media(mut self) -> Self {
        self.media.present = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.media.read_only = true;
        self
    }

    /// Overwrite bytes starting at `offset`.
    pub fn with_contents(mut self, offset: usize, bytes: &[u8]) -> Self {
        let end = (offset + bytes.len()).min(self.data.len());
        if offset < end {
            self.data[offset..end].copy_from_slice(&bytes[..end - offset]);
        }
        self
    }
}

/// Open block I/O handle on a [`MemoryDisk`].
#[derive(Debug)]
pub struct MemoryBlock {
    disk: Shared<DiskState>,
    stats: Shared<CallStats>,
}

impl MemoryBlock {
    fn check(&self, media_id: u32, lba: u64, len: usize) -> Result<(), Status> {
        let disk = self.disk.borrow();
        let media = disk.media;
        if !media.present {
            return Err(Status::NO_MEDIA);
        }
        if media.media_id != media_id {
            return Err(Status::MEDIA_CHANGED);
        }
        let block_size = media.block_size as usize;
        if block_size == 0 || len % block_size != 0 {
            return Err(Status::BAD_BUFFER_SIZE);
        }
        let blocks = (len / block_size) as u64;
        match lba.checked_add(blocks) {
            Some(end) if end <= media.last_block + 1 => Ok(()),
            _ => Err(Status::INVALID_PARAMETER),
        }
    }
}

impl BlockIo for MemoryBlock {
    fn media(&self) -> BlockMedia {
        self.disk.borrow().media
    }

    fn read_blocks(&mut self, media_id: u32, lba: u64, buf: &mut [u8]) -> Result<(), Status> {
        self.stats.borrow_mut().block_calls += 1;
        self.check(media_id, lba, buf.len())?;
        let disk = self.disk.borrow();
        let start = lba as usize * disk.media.block_size as usize;
        buf.copy_from_slice(&disk.data[start..start + buf.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, media_id: u32, lba: u64, buf: &[u8]) -> Result<(), Status> {
        self.stats.borrow_mut().block_calls += 1;
        self.check(media_id, lba, buf.len())?;
        let mut disk = self.disk.borrow_mut();
        if disk.media.read_only {
            return Err(Status::WRITE_PROTECTED);
        }
        let start = lba as usize * disk.media.block_size as usize;
        disk.data[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn flush_blocks(&mut self) -> Result<(), Status> {
        self.stats.borrow_mut().block_calls += 1;
        self.disk.borrow_mut().flushes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Firmware root
// ---------------------------------------------------------------------------

/// Simulated firmware.
///
/// ```
/// use posix_uefi_core::firmware::memory::{MemoryDisk, MemoryFirmware, MemoryVolume};
///
/// let firmware = MemoryFirmware::new()
///     .with_volume(MemoryVolume::new().with_file("EFI/BOOT/startup.nsh", b"echo hi"))
///     .with_serial()
///     .with_disk(MemoryDisk::new(512, 64));
/// assert!(firmware.exists("EFI/BOOT"));
/// ```
#[derive(Debug)]
pub struct MemoryFirmware {
    stats: Shared<CallStats>,
    con_in: MemoryConsoleIn,
    con_out: MemoryTextOutput,
    std_err: MemoryTextOutput,
    volume: Option<Shared<VolumeState>>,
    serial: Option<Shared<SerialState>>,
    disks: Vec<Shared<DiskState>>,
}

impl Default for MemoryFirmware {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFirmware {
    /// Consoles only: no volume, no serial port, no block devices.
    pub fn new() -> Self {
        let stats = shared(CallStats::default());
        Self {
            con_in: MemoryConsoleIn {
                keys: VecDeque::new(),
                stats: Rc::clone(&stats),
            },
            con_out: MemoryTextOutput {
                units: Vec::new(),
                stats: Rc::clone(&stats),
            },
            std_err: MemoryTextOutput {
                units: Vec::new(),
                stats: Rc::clone(&stats),
            },
            stats,
            volume: None,
            serial: None,
            disks: Vec::new(),
        }
    }

    pub fn with_volume(mut self, volume: MemoryVolume) -> Self {
        self.volume = Some(shared(volume.into_state()));
        self
    }

    pub fn with_serial(mut self) -> Self {
        self.serial = Some(shared(SerialState::default()));
        self
    }

    /// Attach a block device. Enumeration order is attachment order.
    pub fn with_disk(mut self, disk: MemoryDisk) -> Self {
        self.disks.push(shared(DiskState {
            media: disk.media,
            data: disk.data,
            flushes: 0,
        }));
        self
    }

    pub fn with_keys(mut self, keys: &str) -> Self {
        self.push_keys(keys);
        self
    }

    pub fn stats(&self) -> CallStats {
        *self.stats.borrow()
    }

    pub fn push_keys(&mut self, keys: &str) {
        self.con_in.keys.extend(keys.encode_utf16());
    }

    /// Queue a key without a printable unit (arrow keys, function keys).
    pub fn push_scan_code(&mut self) {
        self.con_in.keys.push_back(0);
    }

    pub fn stdout(&self) -> &MemoryTextOutput {
        &self.con_out
    }

    pub fn stderr(&self) -> &MemoryTextOutput {
        &self.std_err
    }

    pub fn push_serial_input(&mut self, bytes: &[u8]) {
        if let Some(serial) = &self.serial {
            serial.borrow_mut().rx.extend(bytes.iter().copied());
        }
    }

    pub fn serial_output(&self) -> Vec<u8> {
        self.serial
            .as_ref()
            .map(|serial| serial.borrow().tx.clone())
            .unwrap_or_default()
    }

    pub fn serial_attributes(&self) -> Option<SerialAttributes> {
        self.serial
            .as_ref()
            .and_then(|serial| serial.borrow().attributes)
    }

    /// Make every subsequent `set_attributes` fail with `DEVICE_ERROR`.
    pub fn reject_serial_attributes(&mut self) {
        if let Some(serial) = &self.serial {
            serial.borrow_mut().reject_attributes = true;
        }
    }

    pub fn disk_contents(&self, index: usize) -> Option<Vec<u8>> {
        self.disks.get(index).map(|disk| disk.borrow().data.clone())
    }

    pub fn disk_flushes(&self, index: usize) -> Option<u32> {
        self.disks.get(index).map(|disk| disk.borrow().flushes)
    }

    pub fn file_contents(&self, path: &str) -> Option<Vec<u8>> {
        let volume = self.volume.as_ref()?.borrow();
        match volume.nodes.get(&resolve_path("", path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.volume.as_ref().is_some_and(|volume| {
            volume
                .borrow()
                .nodes
                .contains_key(&resolve_path("", path))
        })
    }

    pub fn is_directory(&self, path: &str) -> bool {
        self.volume.as_ref().is_some_and(|volume| {
            matches!(
                volume.borrow().nodes.get(&resolve_path("", path)),
                Some(Node::Dir)
            )
        })
    }
}

impl Firmware for MemoryFirmware {
    type File = MemoryFile;
    type Serial = MemorySerial;
    type Block = MemoryBlock;
    type Input = MemoryConsoleIn;
    type Output = MemoryTextOutput;
    /// Disk index plus one; 0 is the null handle.
    type Handle = usize;

    fn con_in(&mut self) -> &mut MemoryConsoleIn {
        &mut self.con_in
    }

    fn con_out(&mut self) -> &mut MemoryTextOutput {
        &mut self.con_out
    }

    fn std_err(&mut self) -> &mut MemoryTextOutput {
        &mut self.std_err
    }

    fn open_boot_volume(&mut self) -> Result<MemoryFile, Status> {
        self.stats.borrow_mut().boot_volume_opens += 1;
        let volume = self.volume.as_ref().ok_or(Status::UNSUPPORTED)?;
        Ok(MemoryFile {
            volume: Rc::clone(volume),
            stats: Rc::clone(&self.stats),
            key: String::new(),
            position: 0,
            writable: true,
        })
    }

    fn locate_serial(&mut self) -> Result<MemorySerial, Status> {
        self.stats.borrow_mut().serial_locates += 1;
        let state = self.serial.as_ref().ok_or(Status::NOT_FOUND)?;
        Ok(MemorySerial {
            state: Rc::clone(state),
            stats: Rc::clone(&self.stats),
        })
    }

    fn locate_block_handles(&mut self, buffer: &mut [usize]) -> Result<usize, Status> {
        self.stats.borrow_mut().block_enumerations += 1;
        if self.disks.is_empty() {
            return Err(Status::NOT_FOUND);
        }
        if buffer.len() < self.disks.len() {
            return Err(Status::BUFFER_TOO_SMALL);
        }
        for (index, slot) in buffer.iter_mut().take(self.disks.len()).enumerate() {
            *slot = index + 1;
        }
        Ok(self.disks.len())
    }

    fn open_block_io(&mut self, handle: usize) -> Result<MemoryBlock, Status> {
        self.stats.borrow_mut().block_opens += 1;
        let disk = handle
            .checked_sub(1)
            .and_then(|index| self.disks.get(index))
            .ok_or(Status::INVALID_PARAMETER)?;
        Ok(MemoryBlock {
            disk: Rc::clone(disk),
            stats: Rc::clone(&self.stats),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(firmware: &mut MemoryFirmware) -> MemoryFile {
        firmware.open_boot_volume().unwrap()
    }

    #[test]
    fn resolve_path_normalizes_separators() {
        assert_eq!(resolve_path("", "/EFI/BOOT/x.efi"), "EFI\\BOOT\\x.efi");
        assert_eq!(resolve_path("EFI", "BOOT\\..\\tools"), "EFI\\tools");
        assert_eq!(resolve_path("EFI", "\\abs"), "abs");
        assert_eq!(resolve_path("", ""), "");
    }

    #[test]
    fn builder_creates_parents() {
        let firmware =
            MemoryFirmware::new().with_volume(MemoryVolume::new().with_file("a/b/c.txt", b"x"));
        assert!(firmware.is_directory("a"));
        assert!(firmware.is_directory("a/b"));
        assert_eq!(firmware.file_contents("a/b/c.txt"), Some(b"x".to_vec()));
    }

    #[test]
    fn open_missing_without_create_is_not_found() {
        let mut firmware = MemoryFirmware::new().with_volume(MemoryVolume::new());
        let mut root = root(&mut firmware);
        let err = root
            .open("nope", FileMode::Read, FileAttributes::empty())
            .unwrap_err();
        assert_eq!(err, Status::NOT_FOUND);
    }

    #[test]
    fn create_write_read_back() {
        let mut firmware = MemoryFirmware::new().with_volume(MemoryVolume::new());
        let mut root = root(&mut firmware);
        let mut file = root
            .open("f.bin", FileMode::CreateReadWrite, FileAttributes::empty())
            .unwrap();
        assert_eq!(file.write(b"abc\0def").unwrap(), 7);
        file.set_position(0).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(file.read(&mut buf).unwrap(), 7);
        assert_eq!(&buf[..7], b"abc\0def");
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn read_handle_cannot_write() {
        let mut firmware =
            MemoryFirmware::new().with_volume(MemoryVolume::new().with_file("f", b"1"));
        let mut root = root(&mut firmware);
        let mut file = root
            .open("f", FileMode::Read, FileAttributes::empty())
            .unwrap();
        assert_eq!(file.write(b"2").unwrap_err(), Status::ACCESS_DENIED);
    }

    #[test]
    fn read_only_volume_rejects_creation() {
        let mut firmware = MemoryFirmware::new().with_volume(MemoryVolume::new().read_only());
        let mut root = root(&mut firmware);
        let err = root
            .open("new", FileMode::CreateReadWrite, FileAttributes::empty())
            .unwrap_err();
        assert_eq!(err, Status::WRITE_PROTECTED);
    }

    #[test]
    fn capacity_limits_growth() {
        let mut firmware = MemoryFirmware::new().with_volume(MemoryVolume::new().with_capacity(4));
        let mut root = root(&mut firmware);
        let mut file = root
            .open("f", FileMode::CreateReadWrite, FileAttributes::empty())
            .unwrap();
        assert_eq!(file.write(b"1234").unwrap(), 4);
        assert_eq!(file.write(b"5").unwrap_err(), Status::VOLUME_FULL);
    }

    #[test]
    fn end_of_file_position_moves_to_size() {
        let mut firmware =
            MemoryFirmware::new().with_volume(MemoryVolume::new().with_file("f", b"12345"));
        let mut root = root(&mut firmware);
        let mut file = root
            .open("f", FileMode::Read, FileAttributes::empty())
            .unwrap();
        file.set_position(END_OF_FILE_POSITION).unwrap();
        assert_eq!(file.position().unwrap(), 5);
    }

    #[test]
    fn delete_refuses_non_empty_directory() {
        let mut firmware =
            MemoryFirmware::new().with_volume(MemoryVolume::new().with_file("d/f", b""));
        let mut root = root(&mut firmware);
        let dir = root
            .open("d", FileMode::Read, FileAttributes::empty())
            .unwrap();
        assert_eq!(dir.delete().unwrap_err(), Status::ACCESS_DENIED);
        assert!(firmware.exists("d"));
    }

    #[test]
    fn block_enumeration_reports_small_buffer() {
        let mut firmware = MemoryFirmware::new()
            .with_disk(MemoryDisk::new(512, 4))
            .with_disk(MemoryDisk::new(512, 4));
        let mut small = [0usize; 1];
        assert_eq!(
            firmware.locate_block_handles(&mut small).unwrap_err(),
            Status::BUFFER_TOO_SMALL
        );
        let mut enough = [0usize; 2];
        assert_eq!(firmware.locate_block_handles(&mut enough).unwrap(), 2);
        assert_eq!(enough, [1, 2]);
    }

    #[test]
    fn block_reads_check_bounds_and_alignment() {
        let mut firmware =
            MemoryFirmware::new().with_disk(MemoryDisk::new(4, 2).with_contents(0, b"abcdefgh"));
        let mut block = firmware.open_block_io(1).unwrap();
        let mut buf = [0u8; 4];
        block.read_blocks(1, 1, &mut buf).unwrap();
        assert_eq!(&buf, b"efgh");
        assert_eq!(
            block.read_blocks(1, 2, &mut buf).unwrap_err(),
            Status::INVALID_PARAMETER
        );
        let mut odd = [0u8; 3];
        assert_eq!(
            block.read_blocks(1, 0, &mut odd).unwrap_err(),
            Status::BAD_BUFFER_SIZE
        );
        assert_eq!(
            block.read_blocks(9, 0, &mut buf).unwrap_err(),
            Status::MEDIA_CHANGED
        );
    }

    #[test]
    fn console_output_stops_at_nul() {
        let mut firmware = MemoryFirmware::new();
        let text: Vec<u16> = "hi\0ignored".encode_utf16().collect();
        firmware.con_out().output_string(&text).unwrap();
        assert_eq!(firmware.stdout().text(), "hi");
    }
}

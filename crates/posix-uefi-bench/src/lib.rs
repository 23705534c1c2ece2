//! Shared inputs for the posix-uefi benchmarks.

use posix_uefi_core::firmware::memory::{MemoryDisk, MemoryFirmware, MemoryVolume};

/// Encode a format string as UTF-16.
#[must_use]
pub fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Firmware with an empty boot volume and one 64 KiB disk.
#[must_use]
pub fn bench_firmware() -> MemoryFirmware {
    MemoryFirmware::new()
        .with_volume(MemoryVolume::new().with_dir("bench"))
        .with_disk(MemoryDisk::new(512, 128))
}

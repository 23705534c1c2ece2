//! Files and directories on the boot volume.

use alloc::boxed::Box;
use alloc::vec;

use posix_uefi_core::Status;
use posix_uefi_core::firmware::{FileAttributes, FileInfo, FileMode, FileProtocol};
use uefi::CString16;
use uefi::proto::media::file::{
    Directory, File, FileAttribute, FileInfo as UefiFileInfo, FileMode as UefiFileMode,
    FileType, RegularFile,
};

use crate::status_of;

/// Bytes reserved for the fixed part of a file info record.
const INFO_HEADER: usize = 128;

pub enum UefiFile {
    Regular(RegularFile),
    Dir(Directory),
}

impl UefiFile {
    fn boxed_info(&mut self) -> Result<Box<UefiFileInfo>, Status> {
        match self {
            UefiFile::Regular(file) => file.get_boxed_info::<UefiFileInfo>(),
            UefiFile::Dir(dir) => dir.get_boxed_info::<UefiFileInfo>(),
        }
        .map_err(status_of)
    }
}

fn open_mode(mode: FileMode) -> UefiFileMode {
    match mode {
        FileMode::Read => UefiFileMode::Read,
        FileMode::ReadWrite => UefiFileMode::ReadWrite,
        FileMode::CreateReadWrite => UefiFileMode::CreateReadWrite,
    }
}

impl FileProtocol for UefiFile {
    fn open(
        &mut self,
        path: &str,
        mode: FileMode,
        attributes: FileAttributes,
    ) -> Result<Self, Status> {
        let name = CString16::try_from(path).map_err(|_| Status::INVALID_PARAMETER)?;
        let attributes = FileAttribute::from_bits_truncate(attributes.bits());
        let handle = match self {
            UefiFile::Regular(file) => file.open(&name, open_mode(mode), attributes),
            UefiFile::Dir(dir) => dir.open(&name, open_mode(mode), attributes),
        }
        .map_err(status_of)?;
        match handle.into_type().map_err(status_of)? {
            FileType::Regular(file) => Ok(UefiFile::Regular(file)),
            FileType::Dir(dir) => Ok(UefiFile::Dir(dir)),
        }
    }

    fn close(self) -> Result<(), Status> {
        match self {
            UefiFile::Regular(file) => file.close(),
            UefiFile::Dir(dir) => dir.close(),
        }
        Ok(())
    }

    fn delete(self) -> Result<(), Status> {
        match self {
            UefiFile::Regular(file) => file.delete(),
            UefiFile::Dir(dir) => dir.delete(),
        }
        .map_err(status_of)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        match self {
            UefiFile::Regular(file) => file.read(buf).map_err(status_of),
            UefiFile::Dir(_) => Err(Status::UNSUPPORTED),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Status> {
        match self {
            UefiFile::Regular(file) => file.write(buf).map(|()| buf.len()).map_err(status_of),
            UefiFile::Dir(_) => Err(Status::UNSUPPORTED),
        }
    }

    fn position(&mut self) -> Result<u64, Status> {
        match self {
            UefiFile::Regular(file) => file.get_position().map_err(status_of),
            UefiFile::Dir(_) => Ok(0),
        }
    }

    fn set_position(&mut self, position: u64) -> Result<(), Status> {
        match self {
            UefiFile::Regular(file) => file.set_position(position).map_err(status_of),
            UefiFile::Dir(dir) if position == 0 => dir.reset_entry_readout().map_err(status_of),
            UefiFile::Dir(_) => Err(Status::UNSUPPORTED),
        }
    }

    fn info(&mut self) -> Result<FileInfo, Status> {
        let info = self.boxed_info()?;
        Ok(FileInfo {
            size: info.file_size(),
            attributes: FileAttributes::from_bits(info.attribute().bits()),
        })
    }

    /// Rewrites the info record with a new size, keeping name and times.
    fn set_size(&mut self, size: u64) -> Result<(), Status> {
        let current = self.boxed_info()?;
        let name = current.file_name();
        let mut storage = vec![0u8; INFO_HEADER + 2 * (name.num_chars() + 1)];
        let updated = UefiFileInfo::new(
            &mut storage,
            size,
            current.physical_size(),
            *current.create_time(),
            *current.last_access_time(),
            *current.modification_time(),
            current.attribute(),
            name,
        )
        .map_err(|_| Status::BUFFER_TOO_SMALL)?;
        match self {
            UefiFile::Regular(file) => file.set_info(&*updated),
            UefiFile::Dir(dir) => dir.set_info(&*updated),
        }
        .map_err(status_of)
    }

    fn flush(&mut self) -> Result<(), Status> {
        match self {
            UefiFile::Regular(file) => file.flush(),
            UefiFile::Dir(dir) => dir.flush(),
        }
        .map_err(status_of)
    }
}

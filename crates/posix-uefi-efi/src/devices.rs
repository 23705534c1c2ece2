//! Serial port and block storage protocols.

use posix_uefi_core::Status;
use posix_uefi_core::firmware::{
    BlockIo, BlockMedia, Parity, SerialAttributes, SerialIo, StopBits,
};
use uefi::proto::console::serial::{self, IoMode, Serial};
use uefi::proto::media::block::BlockIO;
use uefi::table::boot::ScopedProtocol;

use crate::status_of;

pub struct UefiSerial(ScopedProtocol<'static, Serial>);

impl UefiSerial {
    pub(crate) fn new(protocol: ScopedProtocol<'static, Serial>) -> Self {
        UefiSerial(protocol)
    }
}

fn parity(parity: Parity) -> serial::Parity {
    match parity {
        Parity::Default => serial::Parity::DEFAULT,
        Parity::None => serial::Parity::NONE,
        Parity::Even => serial::Parity::EVEN,
        Parity::Odd => serial::Parity::ODD,
        Parity::Mark => serial::Parity::MARK,
        Parity::Space => serial::Parity::SPACE,
    }
}

fn stop_bits(stop_bits: StopBits) -> serial::StopBits {
    match stop_bits {
        StopBits::Default => serial::StopBits::DEFAULT,
        StopBits::One => serial::StopBits::ONE,
        StopBits::OneFive => serial::StopBits::ONE_FIVE,
        StopBits::Two => serial::StopBits::TWO,
    }
}

impl SerialIo for UefiSerial {
    fn set_attributes(&mut self, attributes: &SerialAttributes) -> Result<(), Status> {
        let mode = IoMode {
            control_mask: self.0.io_mode().control_mask,
            timeout: attributes.timeout,
            baud_rate: attributes.baud_rate,
            receive_fifo_depth: attributes.receive_fifo_depth,
            data_bits: u32::from(attributes.data_bits),
            parity: parity(attributes.parity),
            stop_bits: stop_bits(attributes.stop_bits),
        };
        self.0.set_attributes(&mode).map_err(status_of)
    }

    /// A timeout is a short transfer, not a failure.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        match self.0.read(buf) {
            Ok(()) => Ok(buf.len()),
            Err(err) if err.status() == uefi::Status::TIMEOUT => Ok(*err.data()),
            Err(err) => Err(status_of(err)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Status> {
        match self.0.write(buf) {
            Ok(()) => Ok(buf.len()),
            Err(err) if err.status() == uefi::Status::TIMEOUT => Ok(*err.data()),
            Err(err) => Err(status_of(err)),
        }
    }
}

pub struct UefiBlock(ScopedProtocol<'static, BlockIO>);

impl UefiBlock {
    pub(crate) fn new(protocol: ScopedProtocol<'static, BlockIO>) -> Self {
        UefiBlock(protocol)
    }
}

impl BlockIo for UefiBlock {
    fn media(&self) -> BlockMedia {
        let media = self.0.media();
        BlockMedia {
            media_id: media.media_id(),
            present: media.is_media_present(),
            read_only: media.is_read_only(),
            block_size: media.block_size(),
            last_block: media.last_block(),
        }
    }

    fn read_blocks(&mut self, media_id: u32, lba: u64, buf: &mut [u8]) -> Result<(), Status> {
        self.0.read_blocks(media_id, lba, buf).map_err(status_of)
    }

    fn write_blocks(&mut self, media_id: u32, lba: u64, buf: &[u8]) -> Result<(), Status> {
        self.0.write_blocks(media_id, lba, buf).map_err(status_of)
    }

    fn flush_blocks(&mut self) -> Result<(), Status> {
        self.0.flush_blocks().map_err(status_of)
    }
}

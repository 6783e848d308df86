//! The block device interface a FAT-style filesystem layer drives: status,
//! initialize, sector read/write and a handful of control codes.

mod device;

use crate::sdcard::SdCardError;
use bitflags::bitflags;
use core::convert::TryFrom;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DiskStatus: u8 {
        /// Drive has not been initialized (or lost its initialization)
        const NOT_INITIALIZED = 0x01;
        /// No medium in the drive
        const NO_MEDIA = 0x02;
        /// Medium is write protected
        const WRITE_PROTECTED = 0x04;
    }
}

/// Failed block device operation. Discriminants follow the classic diskio
/// result codes, where 0 is success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskError {
    /// Unrecoverable error during the transfer
    Error = 1,
    WriteProtected = 2,
    NotReady = 3,
    InvalidParameter = 4,
}

impl From<SdCardError> for DiskError {
    fn from(e: SdCardError) -> Self {
        match e {
            SdCardError::NotInitialized => DiskError::NotReady,
            SdCardError::InvalidParameter => DiskError::InvalidParameter,
            _ => DiskError::Error,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoctlCommand {
    /// Wait for any pending write to finish
    Sync = 0,
    /// Number of sectors on the medium
    GetSectorCount = 1,
    /// Erase block size, in sectors
    GetBlockSize = 3,
}

impl TryFrom<u8> for IoctlCommand {
    type Error = DiskError;

    fn try_from(code: u8) -> Result<Self, DiskError> {
        match code {
            0 => Ok(IoctlCommand::Sync),
            1 => Ok(IoctlCommand::GetSectorCount),
            3 => Ok(IoctlCommand::GetBlockSize),
            _ => Err(DiskError::InvalidParameter),
        }
    }
}

/// A 512-byte sector device addressed by drive number.
///
/// Only drive 0 exists; any other drive reports `NO_MEDIA | NOT_INITIALIZED`.
/// `read`, `write` and `ioctl` refresh the status first and refuse to touch
/// a drive that isn't initialized.
pub trait BlockDevice {
    fn status(&mut self, drive: u8) -> DiskStatus;

    /// Bring the medium up and report the resulting status.
    fn initialize(&mut self, drive: u8) -> DiskStatus;

    /// Read `count` sectors starting at `sector`. `buf` must hold at least
    /// `count * 512` bytes.
    fn read(&mut self, drive: u8, buf: &mut [u8], sector: u32, count: u32) -> Result<(), DiskError>;

    /// Write `count` sectors starting at `sector`. `buf` must hold at least
    /// `count * 512` bytes.
    fn write(&mut self, drive: u8, buf: &[u8], sector: u32, count: u32) -> Result<(), DiskError>;

    /// Run a control code (see [`IoctlCommand`]). The returned value is the
    /// sector or erase-block count for the `Get*` codes, and 0 for `Sync`.
    fn ioctl(&mut self, drive: u8, ctrl: u8) -> Result<u32, DiskError>;
}

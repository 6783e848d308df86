use super::{
    BlockDevice,
    DiskError,
    DiskStatus,
    IoctlCommand,
};
use crate::sdcard::{
    ByteTransport,
    CardType,
    SdCard,
    SdCommand,
    ERASE_BLOCK_SECTORS,
};
use core::convert::TryFrom;

impl<T: ByteTransport> BlockDevice for SdCard<T> {
    fn status(&mut self, drive: u8) -> DiskStatus {
        // Only drive 0 exists
        if drive != 0 {
            return DiskStatus::NO_MEDIA | DiskStatus::NOT_INITIALIZED;
        }

        let mut s = self.status;
        if !self.socket.inserted {
            s = DiskStatus::NO_MEDIA | DiskStatus::NOT_INITIALIZED;
        } else {
            s.remove(DiskStatus::NO_MEDIA);
            s.set(DiskStatus::WRITE_PROTECTED, self.socket.write_protected);
            if !s.contains(DiskStatus::NOT_INITIALIZED) {
                // Check the card still holds its initialization
                let r1 = self.send_card_command(SdCommand::ReadOcr, 0);
                if r1 != 0 {
                    log::warn!("sdcard: READ_OCR failed ({:#04x}), card needs initializing", r1);
                    s.insert(DiskStatus::NOT_INITIALIZED);
                }
                let mut ocr = [0u8; 4];
                self.receive_bytes(&mut ocr);
                self.transport.deselect();
            }
        }
        self.status = s;
        s
    }

    fn initialize(&mut self, drive: u8) -> DiskStatus {
        let mut s = self.status(drive);
        if s.contains(DiskStatus::NO_MEDIA) {
            return s;
        }

        self.transport.deselect();
        self.card_type = match self.detect_card_type() {
            Ok(card_type) => {
                log::debug!("sdcard: detected card type {:?}", card_type);
                card_type
            },
            Err(e) => {
                log::warn!("sdcard: initialization failed ({:?})", e);
                CardType::empty()
            },
        };

        s.set(DiskStatus::NOT_INITIALIZED, self.card_type.is_empty());
        self.status = s;
        self.deselect();
        s
    }

    fn read(&mut self, drive: u8, buf: &mut [u8], sector: u32, count: u32) -> Result<(), DiskError> {
        if self.status(drive).contains(DiskStatus::NOT_INITIALIZED) {
            return Err(DiskError::NotReady);
        }
        self.read_sectors(buf, sector, count).map_err(DiskError::from)
    }

    fn write(&mut self, drive: u8, buf: &[u8], sector: u32, count: u32) -> Result<(), DiskError> {
        let s = self.status(drive);
        if s.contains(DiskStatus::NOT_INITIALIZED) {
            return Err(DiskError::NotReady);
        }
        if s.contains(DiskStatus::WRITE_PROTECTED) {
            return Err(DiskError::WriteProtected);
        }
        self.write_sectors(buf, sector, count).map_err(DiskError::from)
    }

    fn ioctl(&mut self, drive: u8, ctrl: u8) -> Result<u32, DiskError> {
        if self.status(drive).contains(DiskStatus::NOT_INITIALIZED) {
            return Err(DiskError::NotReady);
        }

        let result = match IoctlCommand::try_from(ctrl) {
            Ok(IoctlCommand::Sync) => self.select().map(|_| 0).map_err(DiskError::from),
            Ok(IoctlCommand::GetSectorCount) => self.read_sector_count().map_err(DiskError::from),
            Ok(IoctlCommand::GetBlockSize) => Ok(ERASE_BLOCK_SECTORS),
            Err(e) => Err(e),
        };
        self.deselect();
        result
    }
}

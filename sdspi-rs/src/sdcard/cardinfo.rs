use super::{
    cmd::SdCommand,
    transport::ByteTransport,
    SdCard,
    SdCardError,
};
use crate::diskio::{
    BlockDevice,
    DiskStatus,
};

pub struct CardId {
    manufacturer_id: u8,
    oem_id: (u8, u8),
    product_name: [u8; 5],
    product_revision: (u8, u8),
    product_serial_num: u32,
    manufacturing_date_year: u16,
    manufacturing_date_month: u8,
}

impl CardId {
    pub fn from_register(data: &[u8; 16]) -> CardId {
        CardId {
            manufacturer_id: data[0],
            oem_id: (data[1], data[2]),
            product_name: [data[3], data[4], data[5], data[6], data[7]],
            product_revision: (data[8] >> 4, data[8] & 0x0f),
            product_serial_num: (data[9] as u32) << 24
                | (data[10] as u32) << 16
                | (data[11] as u32) << 8
                | (data[12] as u32),
            manufacturing_date_year: 2000 + (((data[13] & 0x0f) as u16) << 4 | (data[14] >> 4) as u16),
            manufacturing_date_month: data[14] & 0x0f,
        }
    }

    #[inline(always)]
    pub fn manufacturer_id(&self) -> u8 {
        self.manufacturer_id
    }

    #[inline(always)]
    pub fn oem_id(&self) -> (u8, u8) {
        self.oem_id
    }

    #[inline(always)]
    pub fn product_name(&self) -> [u8; 5] {
        self.product_name
    }

    #[inline(always)]
    pub fn product_revision(&self) -> (u8, u8) {
        self.product_revision
    }

    #[inline(always)]
    pub fn product_serial_num(&self) -> u32 {
        self.product_serial_num
    }

    #[inline(always)]
    pub fn manufacturing_date(&self) -> (u16, u8) {
        (self.manufacturing_date_year, self.manufacturing_date_month)
    }
}

/// Number of 512-byte sectors described by a CSD register.
///
/// CSD structure 1 (SDHC/SDXC) stores C_SIZE in units of 512 KiB; only its
/// low 16 bits are used. Anything else is decoded as CSD structure 0 (SDSC
/// and MMC), where capacity is
/// (C_SIZE + 1) * 2^(C_SIZE_MULT + 2) * 2^READ_BL_LEN bytes.
///
/// Returns `None` if the block length fields describe less than one sector.
pub fn sector_count(csd: &[u8; 16]) -> Option<u32> {
    if csd[0] >> 6 == 1 {
        let c_size = (csd[9] as u16).wrapping_add((csd[8] as u16) << 8).wrapping_add(1);
        Some((c_size as u32) << 10)
    } else {
        // READ_BL_LEN + C_SIZE_MULT + 2
        let n = (csd[5] & 15) + ((csd[10] & 128) >> 7) + ((csd[9] & 3) << 1) + 2;
        let c_size = (csd[8] >> 6) as u32 + ((csd[7] as u32) << 2) + (((csd[6] & 3) as u32) << 10) + 1;
        n.checked_sub(9).map(|shift| c_size << shift)
    }
}

impl<T: ByteTransport> SdCard<T> {
    /// Read a 16-byte register with a command that answers with a data
    /// packet. The card is left selected.
    fn read_register(&mut self, cmd: SdCommand) -> Result<[u8; 16], SdCardError> {
        if self.send_card_command(cmd, 0) != 0 {
            return Err(SdCardError::RegisterError);
        }
        let mut data = [0u8; 16];
        self.receive_block(&mut data)?;
        Ok(data)
    }

    /// Refresh the drive status, which checks the card is still alive.
    fn ensure_initialized(&mut self) -> Result<(), SdCardError> {
        if BlockDevice::status(self, 0).contains(DiskStatus::NOT_INITIALIZED) {
            return Err(SdCardError::NotInitialized);
        }
        Ok(())
    }

    /// The raw CSD register. The card must be initialized.
    pub fn read_csd(&mut self) -> Result<[u8; 16], SdCardError> {
        self.ensure_initialized()?;
        let csd = self.read_register(SdCommand::SendCsd);
        self.deselect();
        csd
    }

    /// The decoded CID register. The card must be initialized.
    pub fn read_card_id(&mut self) -> Result<CardId, SdCardError> {
        self.ensure_initialized()?;
        let cid = self.read_register(SdCommand::SendCid);
        self.deselect();
        Ok(CardId::from_register(&cid?))
    }

    /// Capacity in sectors, from the CSD register. Leaves the card selected.
    pub(crate) fn read_sector_count(&mut self) -> Result<u32, SdCardError> {
        let csd = self.read_register(SdCommand::SendCsd)?;
        let sectors = sector_count(&csd).ok_or(SdCardError::RegisterError)?;
        log::debug!("sdcard: CSD structure {}, {} sectors", csd[0] >> 6, sectors);
        Ok(sectors)
    }
}

use super::{
    constants::*,
    transport::ByteTransport,
    SdCardError,
};
use crate::diskio::DiskStatus;
use bitflags::bitflags;

bitflags! {
    /// What initialization found out about the card.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CardType: u8 {
        /// MMC ver 3
        const MMC = 0x01;
        /// SD ver 1
        const SD1 = 0x02;
        /// SD ver 2
        const SD2 = 0x04;
        /// Any SD card
        const SDC = Self::SD1.bits() | Self::SD2.bits();
        /// Sector (not byte) addressing
        const BLOCK = 0x08;
    }
}

/// Fixed facts about the card socket; there's no card-detect or
/// write-protect switch sensing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SocketConfig {
    pub inserted: bool,
    pub write_protected: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        SocketConfig {
            inserted: true,
            write_protected: false,
        }
    }
}

/// One card on one link, plus the session state for the logical drive it
/// backs.
pub struct SdCard<T: ByteTransport> {
    pub(crate) transport: T,
    pub(crate) socket: SocketConfig,
    pub(crate) status: DiskStatus,
    pub(crate) card_type: CardType,
}

impl<T: ByteTransport> SdCard<T> {
    /// Wrap a transport. Nothing is sent to the card until `initialize`.
    pub fn new(transport: T, socket: SocketConfig) -> SdCard<T> {
        SdCard {
            transport,
            socket,
            status: DiskStatus::NOT_INITIALIZED,
            card_type: CardType::empty(),
        }
    }

    #[inline(always)]
    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    /// Give back the transport, dropping the session state.
    pub fn release(self) -> T {
        self.transport
    }

    /// Address argument for a data command: high-capacity cards take sector
    /// numbers, the rest take byte offsets.
    pub fn block_address(&self, sector: u32) -> u32 {
        if self.card_type.contains(CardType::BLOCK) {
            sector
        } else {
            sector.wrapping_mul(BLOCK_SIZE as u32)
        }
    }

    /// Wait for the card to stop driving the busy signal.
    pub(crate) fn wait_ready(&mut self) -> Result<(), SdCardError> {
        for _ in 0..SD_READY_POLL_COUNT {
            if self.transport.read_byte() == IDLE_BYTE {
                return Ok(());
            }
            self.transport.delay_us(SD_READY_POLL_DELAY_US);
        }
        Err(SdCardError::Timeout)
    }

    /// Assert CS and wait until the card is ready for a command.
    pub(crate) fn select(&mut self) -> Result<(), SdCardError> {
        self.transport.select();
        // Dummy clock to force DO enabled
        self.transport.read_byte();

        match self.wait_ready() {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("sdcard: not ready after select");
                self.deselect();
                Err(e)
            },
        }
    }

    pub(crate) fn deselect(&mut self) {
        self.transport.deselect();
        // Dummy clock to force DO hi-z for multiple slave SPI
        self.transport.read_byte();
    }

    pub(crate) fn receive_bytes(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.transport.read_byte();
        }
    }

    pub(crate) fn transmit_bytes(&mut self, buf: &[u8]) {
        for b in buf.iter() {
            self.transport.write_byte(*b);
        }
    }
}

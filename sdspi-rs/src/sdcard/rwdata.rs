use super::{
    cmd::{
        SdAppCommand,
        SdCommand,
    },
    constants::*,
    transport::ByteTransport,
    CardType,
    SdCard,
    SdCardError,
};
use core::convert::TryFrom;

/// What goes on the wire after a data token.
pub(crate) enum DataToken<'b> {
    /// Single-block write (start token) carrying one block.
    Single(&'b [u8; BLOCK_SIZE]),
    /// One block of a multi-block write stream.
    Multi(&'b [u8; BLOCK_SIZE]),
    /// End of a multi-block write stream.
    Stop,
}

impl<'b> DataToken<'b> {
    fn token(&self) -> u8 {
        match self {
            DataToken::Single(_) => DATA_START_BLOCK,
            DataToken::Multi(_) => DATA_START_MULTI_WRITE,
            DataToken::Stop => DATA_STOP_TRANSMISSION,
        }
    }
}

impl<T: ByteTransport> SdCard<T> {
    /// Receive one data packet into `buf` after the card has accepted a read
    /// command. The packet length is `buf.len()`.
    pub(crate) fn receive_block(&mut self, buf: &mut [u8]) -> Result<(), SdCardError> {
        let mut token = IDLE_BYTE;
        for _ in 0..SD_TOKEN_POLL_COUNT {
            token = self.transport.read_byte();
            if token != IDLE_BYTE {
                break;
            }
            self.transport.delay_us(SD_TOKEN_POLL_DELAY_US);
        }

        match token {
            DATA_START_BLOCK => (),
            IDLE_BYTE => {
                log::warn!("sdcard: timed out waiting for data token");
                return Err(SdCardError::Timeout);
            },
            t => {
                log::warn!("sdcard: unexpected data token {:#04x}", t);
                return Err(SdCardError::BadDataToken);
            },
        }

        self.receive_bytes(buf);

        // Discard CRC
        let mut crc = [0u8; 2];
        self.receive_bytes(&mut crc);

        Ok(())
    }

    /// Send one data packet (or the stop token) after the card has accepted
    /// a write command.
    ///
    /// The stop token isn't acknowledged; whoever sends it has to wait for
    /// the card to finish programming before the next command.
    pub(crate) fn transmit_block(&mut self, packet: DataToken) -> Result<(), SdCardError> {
        self.wait_ready()?;

        self.transport.write_byte(packet.token());
        let block = match packet {
            DataToken::Single(block) | DataToken::Multi(block) => block,
            DataToken::Stop => return Ok(()),
        };

        self.transmit_bytes(block);
        // Dummy CRC
        let mut crc = [0u8; 2];
        self.receive_bytes(&mut crc);

        let response = self.transport.read_byte();
        if response & DATA_RESPONSE_MASK != DATA_RESPONSE_ACCEPTED {
            log::warn!("sdcard: data block rejected ({:#04x})", response);
            return Err(SdCardError::DataRejected);
        }
        Ok(())
    }

    /// Read `count` sectors starting at `sector` into the front of `buf`.
    /// The card is deselected on return.
    pub(crate) fn read_sectors(&mut self, buf: &mut [u8], sector: u32, count: u32) -> Result<(), SdCardError> {
        let len = sectors_len(count, buf.len())?;
        let address = self.block_address(sector);

        let result = if count == 1 {
            if self.send_card_command(SdCommand::ReadSingleBlock, address) == 0 {
                self.receive_block(&mut buf[..BLOCK_SIZE])
            } else {
                Err(SdCardError::CommandRejected)
            }
        } else if self.send_card_command(SdCommand::ReadMultipleBlock, address) == 0 {
            let mut result = Ok(());
            for chunk in buf[..len].chunks_mut(BLOCK_SIZE) {
                result = self.receive_block(chunk);
                if result.is_err() {
                    break;
                }
            }
            self.send_card_command(SdCommand::StopTransmission, 0);
            result
        } else {
            Err(SdCardError::CommandRejected)
        };

        self.deselect();
        result
    }

    /// Write `count` sectors from the front of `buf` starting at `sector`.
    /// The card is deselected on return.
    pub(crate) fn write_sectors(&mut self, buf: &[u8], sector: u32, count: u32) -> Result<(), SdCardError> {
        let len = sectors_len(count, buf.len())?;
        let address = self.block_address(sector);

        let result = if count == 1 {
            if self.send_card_command(SdCommand::WriteBlock, address) == 0 {
                as_block(buf).and_then(|block| self.transmit_block(DataToken::Single(block)))
            } else {
                Err(SdCardError::CommandRejected)
            }
        } else {
            if self.card_type.intersects(CardType::SDC) {
                // Pre-erase hint, ignored by cards without it
                self.send_card_app_command(SdAppCommand::SetWrBlockEraseCount, count);
            }
            if self.send_card_command(SdCommand::WriteMultipleBlock, address) == 0 {
                let mut result = Ok(());
                for chunk in buf[..len].chunks(BLOCK_SIZE) {
                    result = as_block(chunk).and_then(|block| self.transmit_block(DataToken::Multi(block)));
                    if result.is_err() {
                        break;
                    }
                }
                // The stream has to be closed whether or not every block made it
                let stop = self.transmit_block(DataToken::Stop);
                result.and(stop)
            } else {
                Err(SdCardError::CommandRejected)
            }
        };

        self.deselect();
        result
    }
}

/// Byte length of `count` sectors, if it's nonzero and fits in `available`.
fn sectors_len(count: u32, available: usize) -> Result<usize, SdCardError> {
    match (count as usize).checked_mul(BLOCK_SIZE) {
        Some(len) if count > 0 && len <= available => Ok(len),
        _ => Err(SdCardError::InvalidParameter),
    }
}

fn as_block(buf: &[u8]) -> Result<&[u8; BLOCK_SIZE], SdCardError> {
    <&[u8; BLOCK_SIZE]>::try_from(&buf[..BLOCK_SIZE.min(buf.len())]).map_err(|_| SdCardError::InvalidParameter)
}

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

/// The command used to poll the card out of idle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpCondition {
    /// ACMD41, SD cards
    Sd,
    /// CMD1, MMC ver 3
    Mmc,
}

impl<T: ByteTransport> SdCard<T> {
    /// Probe the card and work out what it is. The card must be deselected
    /// and powered; on return it's still selected.
    pub(crate) fn detect_card_type(&mut self) -> Result<CardType, SdCardError> {
        // Need to hold CS and MOSI high for at least 74 clock cycles;
        // each transfer takes 8 clock cycles so repeating for 10 times is sufficient
        for _ in 0..SD_POWER_UP_CLOCK_BYTES {
            self.transport.read_byte();
        }

        self.go_idle()?;

        // Older (SDv1 and MMC) cards won't recognize this command. The argument
        // 0x1AA means 3.3V and check pattern of 0xAA.
        if self.send_card_command(SdCommand::SendIfCond, SD_IF_COND_CHECK_PATTERN) == 0x01 {
            log::trace!("sdcard: SEND_IF_COND accepted, SD ver 2");
            self.init_sd_v2()
        } else {
            log::trace!("sdcard: SEND_IF_COND refused, SD ver 1 or MMC");
            self.init_legacy()
        }
    }

    fn go_idle(&mut self) -> Result<(), SdCardError> {
        match self.send_card_command(SdCommand::GoIdleState, 0) {
            0x01 => Ok(()),
            r1 => {
                log::warn!("sdcard: GO_IDLE_STATE failed ({:#04x})", r1);
                Err(SdCardError::CommandRejected)
            },
        }
    }

    fn init_sd_v2(&mut self) -> Result<CardType, SdCardError> {
        // CMD8 has a 40 bit response; the last 12 bits echo the voltage range
        // and the check pattern.
        let mut r7 = [0u8; 4];
        self.receive_bytes(&mut r7);
        if r7[2] != 0x01 || r7[3] != 0xaa {
            log::warn!("sdcard: check pattern mismatch ({:#04x} {:#04x})", r7[2], r7[3]);
            return Err(SdCardError::CardCheckPatternMismatch);
        }

        // Tell the card the host supports high capacity
        self.wait_for_op_condition(OpCondition::Sd, SD_ACMD41_HCS)?;

        if self.send_card_command(SdCommand::ReadOcr, 0) != 0 {
            log::warn!("sdcard: READ_OCR failed");
            return Err(SdCardError::CommandRejected);
        }
        let mut ocr = [0u8; 4];
        self.receive_bytes(&mut ocr);

        if ocr[0] & SD_OCR_CCS != 0 {
            Ok(CardType::SD2 | CardType::BLOCK)
        } else {
            Ok(CardType::SD2)
        }
    }

    fn init_legacy(&mut self) -> Result<CardType, SdCardError> {
        let (card_type, op) = if self.send_card_app_command(SdAppCommand::SendOpCondition, 0) <= 1 {
            (CardType::SD1, OpCondition::Sd)
        } else {
            (CardType::MMC, OpCondition::Mmc)
        };

        self.wait_for_op_condition(op, 0)?;

        if self.send_card_command(SdCommand::SetBlockLen, BLOCK_SIZE as u32) != 0 {
            log::warn!("sdcard: SET_BLOCKLEN failed");
            return Err(SdCardError::CommandRejected);
        }
        Ok(card_type)
    }

    /// Repeat `op` until the card reports it has left idle state.
    fn wait_for_op_condition(&mut self, op: OpCondition, arg: u32) -> Result<(), SdCardError> {
        for _ in 0..SD_INIT_RETRY_COUNT {
            let r1 = match op {
                OpCondition::Sd => self.send_card_app_command(SdAppCommand::SendOpCondition, arg),
                OpCondition::Mmc => self.send_card_command(SdCommand::SendOpCond, arg),
            };
            if r1 == 0 {
                return Ok(());
            }
            self.transport.delay_us(SD_INIT_RETRY_DELAY_US);
        }
        log::warn!("sdcard: card never left idle state ({:?})", op);
        Err(SdCardError::Timeout)
    }
}

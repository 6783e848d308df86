use super::{
    constants::*,
    transport::ByteTransport,
    SdCard,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdCommand {
    GoIdleState = 0,
    SendOpCond = 1,
    SendIfCond = 8,
    SendCsd = 9,
    SendCid = 10,
    StopTransmission = 12,
    SetBlockLen = 16,
    ReadSingleBlock = 17,
    ReadMultipleBlock = 18,
    WriteBlock = 24,
    WriteMultipleBlock = 25,
    AppCommand = 55,
    ReadOcr = 58,
}

/// Commands that only mean something right after `AppCommand`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdAppCommand {
    SetWrBlockEraseCount = 23,
    SendOpCondition = 41,
}

/// Build the 6-byte frame for `opcode`.
///
/// Command format is 01CCCCCC AAAAAAAA AAAAAAAA AAAAAAAA AAAAAAAA RRRRRRR1
/// where C is the 6-bit command and A the 32-bit argument. In SPI mode the
/// card only checks the CRC (R) of CMD0 and CMD8, so those two carry a
/// precomputed one and everything else gets a bare stop bit.
pub fn command_frame(opcode: u8, arg: u32) -> [u8; 6] {
    let crc = if opcode == SdCommand::GoIdleState as u8 {
        // valid CRC for CMD0(0)
        0x95
    } else if opcode == SdCommand::SendIfCond as u8 {
        // valid CRC for CMD8(0x1AA)
        0x87
    } else {
        0x01
    };
    [
        0x40 | opcode,
        (arg >> 24) as u8,
        (arg >> 16) as u8,
        (arg >> 8) as u8,
        arg as u8,
        crc,
    ]
}

impl<T: ByteTransport> SdCard<T> {
    /// Send an application command: `AppCommand` first, then `cmd` unless
    /// the card already refused the prefix.
    ///
    /// Returns the R1 byte of whichever command was sent last.
    pub(crate) fn send_card_app_command(&mut self, cmd: SdAppCommand, arg: u32) -> u8 {
        let prefix = self.send_card_command(SdCommand::AppCommand, 0);
        if prefix > 1 {
            log::trace!("sdcard: ACMD{} prefix refused ({})", cmd as u8, prefix);
            return prefix;
        }
        self.send_opcode(cmd as u8, arg)
    }

    /// Send a command and return its R1 byte. Bit 7 set means the card never
    /// answered (or was never ready to be asked).
    pub(crate) fn send_card_command(&mut self, cmd: SdCommand, arg: u32) -> u8 {
        self.send_opcode(cmd as u8, arg)
    }

    fn send_opcode(&mut self, opcode: u8, arg: u32) -> u8 {
        self.deselect();
        if self.select().is_err() {
            return 0xff;
        }

        self.transmit_bytes(&command_frame(opcode, arg));

        if opcode == SdCommand::StopTransmission as u8 {
            // Skip a stuff byte when stopping a read
            self.transport.read_byte();
        }

        // Poll for a response; if the top bit is 1 the card hasn't responded yet
        let mut response = self.transport.read_byte();
        for _ in 1..SD_R1_POLL_COUNT {
            if response & 0x80 == 0 {
                break;
            }
            response = self.transport.read_byte();
        }
        response
    }
}

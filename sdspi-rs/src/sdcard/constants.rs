pub const BLOCK_SIZE: usize = 512;

pub(crate) const IDLE_BYTE: u8 = 0xff;
pub(crate) const DATA_START_BLOCK: u8 = 0xfe;
pub(crate) const DATA_START_MULTI_WRITE: u8 = 0xfc;
pub(crate) const DATA_STOP_TRANSMISSION: u8 = 0xfd;
pub(crate) const DATA_RESPONSE_MASK: u8 = 0x1f;
pub(crate) const DATA_RESPONSE_ACCEPTED: u8 = 0x05;

pub(crate) const SD_POWER_UP_CLOCK_BYTES: u8 = 10;
pub(crate) const SD_R1_POLL_COUNT: u8 = 10;

// 500ms
pub(crate) const SD_READY_POLL_COUNT: u32 = 5000;
pub(crate) const SD_READY_POLL_DELAY_US: u32 = 100;

// 100ms
pub(crate) const SD_TOKEN_POLL_COUNT: u32 = 1000;
pub(crate) const SD_TOKEN_POLL_DELAY_US: u32 = 100;

// ~1s
pub(crate) const SD_INIT_RETRY_COUNT: u32 = 1000;
pub(crate) const SD_INIT_RETRY_DELAY_US: u32 = 1000;

pub(crate) const SD_IF_COND_CHECK_PATTERN: u32 = 0x1aa;
pub(crate) const SD_ACMD41_HCS: u32 = 1 << 30;
pub(crate) const SD_OCR_CCS: u8 = 0x40;

/// Erase block size reported through ioctl, in sectors.
pub const ERASE_BLOCK_SECTORS: u32 = 128;

mod cardinfo;
mod cmd;
mod constants;
mod debug;
mod init;
mod rwdata;
mod sdcard;
#[cfg(test)]
pub(crate) mod sim;
mod transport;

pub use cardinfo::{
    sector_count,
    CardId,
};
pub use cmd::{
    command_frame,
    SdAppCommand,
    SdCommand,
};
pub use constants::{
    BLOCK_SIZE,
    ERASE_BLOCK_SECTORS,
};
pub use sdcard::{
    CardType,
    SdCard,
    SocketConfig,
};
pub use transport::{
    ByteTransport,
    SpiTransport,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdCardError {
    Timeout = 1,
    CommandRejected,
    BadDataToken,
    DataRejected,
    CardCheckPatternMismatch,
    RegisterError,
    NotInitialized,
    InvalidParameter,
}

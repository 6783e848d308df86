//! SD/MMC card driver for SPI mode, exposing the card as a 512-byte sector
//! block device.
//!
//! The [`sdcard`] module speaks the card protocol over any [`sdcard::ByteTransport`];
//! the [`diskio`] module wraps it in the status/initialize/read/write/ioctl
//! interface a filesystem layer expects.

#![cfg_attr(not(test), no_std)]

pub mod diskio;
mod hexfmt;
pub mod sdcard;

pub use diskio::{
    BlockDevice,
    DiskError,
    DiskStatus,
    IoctlCommand,
};
pub use sdcard::{
    ByteTransport,
    CardType,
    SdCard,
    SdCardError,
    SocketConfig,
    SpiTransport,
};

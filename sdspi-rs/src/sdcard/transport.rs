use super::constants::IDLE_BYTE;
use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::OutputPin,
    spi::FullDuplex,
};
use void::{
    ResultVoidExt,
    Void,
};

/// The link to the card: one byte out, one byte in, per call.
///
/// The driver assumes the link is always electrically present, so none of
/// these operations can fail.
pub trait ByteTransport {
    /// Clock `byte` out and return the byte clocked in at the same time.
    fn write_byte(&mut self, byte: u8) -> u8;

    /// Clock out a fill byte and return what the card sent.
    fn read_byte(&mut self) -> u8 {
        self.write_byte(IDLE_BYTE)
    }

    /// Assert chip select.
    fn select(&mut self);

    /// Release chip select.
    fn deselect(&mut self);

    fn delay_us(&mut self, us: u32);
}

/// [`ByteTransport`] over the embedded-hal SPI, GPIO and delay traits.
///
/// Chip select is active low.
pub struct SpiTransport<SPI, CS, DELAY> {
    spi: SPI,
    cs_pin: CS,
    delay: DELAY,
}

impl<SPI, CS, DELAY> SpiTransport<SPI, CS, DELAY>
where
    SPI: FullDuplex<u8, Error = Void>,
    CS: OutputPin<Error = Void>,
    DELAY: DelayUs<u32>,
{
    pub fn new(spi: SPI, mut cs_pin: CS, delay: DELAY) -> Self {
        // Card stays deselected until the first command
        cs_pin.set_high().void_unwrap();
        SpiTransport { spi, cs_pin, delay }
    }

    /// Give back the peripherals, e.g. to re-clock the SPI after initialization.
    pub fn free(self) -> (SPI, CS, DELAY) {
        (self.spi, self.cs_pin, self.delay)
    }
}

impl<SPI, CS, DELAY> ByteTransport for SpiTransport<SPI, CS, DELAY>
where
    SPI: FullDuplex<u8, Error = Void>,
    CS: OutputPin<Error = Void>,
    DELAY: DelayUs<u32>,
{
    fn write_byte(&mut self, byte: u8) -> u8 {
        nb::block!(self.spi.send(byte)).void_unwrap();
        nb::block!(self.spi.read()).void_unwrap()
    }

    #[inline(always)]
    fn select(&mut self) {
        // Set CS to low to indicate we're talking
        self.cs_pin.set_low().void_unwrap();
    }

    #[inline(always)]
    fn deselect(&mut self) {
        // Set CS to high when we're all finished
        self.cs_pin.set_high().void_unwrap();
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

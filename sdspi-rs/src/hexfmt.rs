use ufmt::{
    uWrite,
    Formatter,
};

fn hex_digit(nibble: u8) -> char {
    match nibble & 0xf {
        v @ 0..=9 => (b'0' + v) as char,
        v => (b'a' + v - 10) as char,
    }
}

/// Write `n` as `0x` followed by two lowercase hex digits.
pub(crate) fn hexfmt8<W>(out: &mut Formatter<W>, n: u8) -> Result<(), W::Error>
where
    W: uWrite + ?Sized,
{
    out.write_str("0x")?;
    out.write_char(hex_digit(n >> 4))?;
    out.write_char(hex_digit(n))
}

/// Write `n` as `0x` followed by eight lowercase hex digits.
pub(crate) fn hexfmt32<W>(out: &mut Formatter<W>, n: u32) -> Result<(), W::Error>
where
    W: uWrite + ?Sized,
{
    out.write_str("0x")?;
    for shift in (0..8).rev() {
        out.write_char(hex_digit((n >> (shift * 4)) as u8))?;
    }
    Ok(())
}

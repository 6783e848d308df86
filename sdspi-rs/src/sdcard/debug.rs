use crate::{
    diskio::DiskStatus,
    hexfmt::{
        hexfmt32,
        hexfmt8,
    },
    sdcard::{
        cardinfo::CardId,
        CardType,
    },
};
use ufmt::{
    uDebug,
    uWrite,
    uwrite,
    Formatter,
};

fn mid_write<W>(out: &mut Formatter<W>, mid: u8) -> Result<(), W::Error>
where
    W: uWrite + ?Sized,
{
    let name = match mid {
        0x01 => "Panasonic",
        0x02 => "Toshiba",
        0x03 => "SanDisk",
        0x1b => "Samsung",
        0x1d => "AData",
        0x27 => "Phison",
        0x28 => "Lexar",
        0x31 => "Silicon Power",
        0x41 => "Kingston",
        0x74 => "Transcend",
        0x76 => "Patriot",
        0x82 => "Sony",
        0x9c => "Angelbird",
        _ => "Unknown",
    };
    out.write_str(name)?;
    out.write_str(" (")?;
    hexfmt8(out, mid)?;
    out.write_char(')')
}

impl uDebug for CardId {
    fn fmt<W>(&self, out: &mut Formatter<W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        out.write_str("  Manufacturer ID:  ")?;
        mid_write(out, self.manufacturer_id())?;
        out.write_char('\n')?;
        let (oem_0, oem_1) = self.oem_id();
        out.write_str("  OEM ID:           ")?;
        out.write_char(oem_0 as char)?;
        out.write_char(oem_1 as char)?;
        out.write_char('\n')?;
        out.write_str("  Product name:     ")?;
        for c in self.product_name().iter() {
            out.write_char(*c as char)?;
        }
        out.write_char('\n')?;
        uwrite!(
            out,
            "  Product revision: {}.{}\n",
            self.product_revision().0,
            self.product_revision().1
        )?;
        out.write_str("  Serial number:    ")?;
        hexfmt32(out, self.product_serial_num())?;
        out.write_char('\n')?;
        uwrite!(
            out,
            "  Manufacture date: {}-{}\n",
            self.manufacturing_date().0,
            self.manufacturing_date().1
        )
    }
}

fn flags_write<W>(out: &mut Formatter<W>, names: &[(bool, &str)]) -> Result<(), W::Error>
where
    W: uWrite + ?Sized,
{
    let mut first = true;
    for (set, name) in names.iter() {
        if !*set {
            continue;
        }
        if !first {
            out.write_str(" | ")?;
        }
        out.write_str(name)?;
        first = false;
    }
    if first {
        out.write_str("(empty)")?;
    }
    Ok(())
}

impl uDebug for CardType {
    fn fmt<W>(&self, out: &mut Formatter<W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        flags_write(out, &[
            (self.contains(CardType::MMC), "MMC"),
            (self.contains(CardType::SD1), "SD1"),
            (self.contains(CardType::SD2), "SD2"),
            (self.contains(CardType::BLOCK), "BLOCK"),
        ])
    }
}

impl uDebug for DiskStatus {
    fn fmt<W>(&self, out: &mut Formatter<W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        flags_write(out, &[
            (self.contains(DiskStatus::NOT_INITIALIZED), "NOT_INITIALIZED"),
            (self.contains(DiskStatus::NO_MEDIA), "NO_MEDIA"),
            (self.contains(DiskStatus::WRITE_PROTECTED), "WRITE_PROTECTED"),
        ])
    }
}

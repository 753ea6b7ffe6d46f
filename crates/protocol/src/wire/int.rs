use std::io::{self, Read, Write};

/// Writes a 4-byte little-endian integer (`write_int`).
pub fn write_int<W: Write + ?Sized>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Reads a 4-byte little-endian integer (`read_int`).
pub fn read_int<R: Read + ?Sized>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Writes a single byte.
pub fn write_byte<W: Write + ?Sized>(writer: &mut W, value: u8) -> io::Result<()> {
    writer.write_all(&[value])
}

/// Reads a single byte.
pub fn read_byte<R: Read + ?Sized>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Writes a 64-bit value using the legacy `longint` format.
///
/// Values in `0..=i32::MAX` take 4 bytes. Anything else is written as the
/// `0xFFFFFFFF` marker followed by all 8 bytes.
pub fn write_longint<W: Write + ?Sized>(writer: &mut W, value: i64) -> io::Result<()> {
    if (0..=i64::from(i32::MAX)).contains(&value) {
        writer.write_all(&(value as i32).to_le_bytes())
    } else {
        writer.write_all(&u32::MAX.to_le_bytes())?;
        writer.write_all(&value.to_le_bytes())
    }
}

/// Reads a 64-bit value written by [`write_longint`].
pub fn read_longint<R: Read + ?Sized>(reader: &mut R) -> io::Result<i64> {
    let first = read_int(reader)?;
    if first != -1 {
        return Ok(i64::from(first));
    }
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

use crate::core::buffer::{BufferReader, ByteWriter, ReaderErr};

/// Writes a value in the leb128 variable-length format, little-endian,
/// seven bits per byte with the high bit as the continuation flag.
pub(crate) fn leb128_write<W>(mut value: u64, writer: &mut W)
where
    W: ByteWriter,
{
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Reads a leb128-encoded value. A value occupying more than ten bytes
/// cannot fit in a `u64` and is reported as malformed.
pub(crate) fn leb128_read(reader: &mut BufferReader) -> Result<u64, ReaderErr> {
    let mut value = 0_u64;
    let mut shift = 0_u32;
    loop {
        let byte = reader.read_u8()?;
        if shift == 63 && byte > 1 {
            return Err(ReaderErr::MalformedVarint);
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(ReaderErr::MalformedVarint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leb128_roundtrip() {
        let values = [
            0_u64,
            1,
            127,
            128,
            255,
            300,
            16383,
            16384,
            u32::MAX as u64,
            u64::MAX,
        ];
        let mut buffer = Vec::new();
        for &v in values.iter() {
            leb128_write(v, &mut buffer);
        }
        let mut reader = BufferReader::new(&buffer);
        for &v in values.iter() {
            assert_eq!(leb128_read(&mut reader).unwrap(), v);
        }
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn leb128_single_byte_for_small_values() {
        let mut buffer = Vec::new();
        leb128_write(42, &mut buffer);
        assert_eq!(buffer, vec![42]);
    }

    #[test]
    fn leb128_truncated_input_fails() {
        let buffer = vec![0x80, 0x80];
        let mut reader = BufferReader::new(&buffer);
        assert_eq!(leb128_read(&mut reader), Err(ReaderErr::OutOfBounds));
    }

    #[test]
    fn leb128_overlong_input_fails() {
        let buffer = vec![0xFF; 11];
        let mut reader = BufferReader::new(&buffer);
        assert_eq!(leb128_read(&mut reader), Err(ReaderErr::MalformedVarint));
    }
}

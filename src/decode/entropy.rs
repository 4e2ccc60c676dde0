//! rANS entropy decoding. Mirrors `encode::entropy`: the framed table is
//! read forward, the payload is consumed from its end, and symbols come out
//! in the order they were passed to the encoder.

use super::Err;
use crate::core::buffer::{BufferReader, TailReader};
use crate::shared::entropy::{rans_build_tables, L_RANS_BASE, RANS_PRECISION, RANS_PRECISION_TOTAL};
use crate::utils::bit_coder::leb128_read;

pub(crate) struct RansDecoder<'a> {
    state: u64,
    tail: TailReader<'a>,
}

impl<'a> RansDecoder<'a> {
    pub fn new(payload: &'a [u8]) -> Result<Self, Err> {
        let mut tail = TailReader::new(payload);
        let meta = tail.read_u8_back()?;
        let flag = meta >> 6;
        let low = u64::from(meta & 0x3F);
        let state = match flag {
            0 => low,
            1 => low << 8 | u64::from(tail.read_u8_back()?),
            2 => {
                let mid = u64::from(tail.read_u8_back()?);
                let lo = u64::from(tail.read_u8_back()?);
                low << 16 | mid << 8 | lo
            }
            _ => {
                let b2 = u64::from(tail.read_u8_back()?);
                let b1 = u64::from(tail.read_u8_back()?);
                let b0 = u64::from(tail.read_u8_back()?);
                low << 24 | b2 << 16 | b1 << 8 | b0
            }
        };
        Ok(Self {
            state: state + L_RANS_BASE,
            tail,
        })
    }

    fn read_slot(&mut self) -> Result<u64, Err> {
        while self.state < L_RANS_BASE {
            let byte = self
                .tail
                .read_u8_back()
                .map_err(|_| Err::CorruptStream("rans payload exhausted"))?;
            self.state = self.state << 8 | u64::from(byte);
        }
        Ok(self.state & u64::from(RANS_PRECISION_TOTAL - 1))
    }

    fn pop(&mut self, freq: u32, cum: u32, slot: u64) {
        self.state = u64::from(freq) * (self.state >> RANS_PRECISION) + slot - u64::from(cum);
    }

    /// The stream must end exactly where the encoder started.
    fn finish(self) -> Result<(), Err> {
        if self.state != L_RANS_BASE || self.tail.bytes_left() != 0 {
            return Err(Err::CorruptStream("rans stream does not terminate cleanly"));
        }
        Ok(())
    }
}

/// Decodes `count` symbols from a framed rANS section. `count == 0` reads
/// nothing, matching the encoder. The declared alphabet must not exceed
/// `max_alphabet`.
pub(crate) fn decode_symbols(
    reader: &mut BufferReader,
    count: usize,
    max_alphabet: usize,
) -> Result<Vec<u32>, Err> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let alphabet = leb128_read(reader)? as usize;
    if alphabet == 0 || alphabet > max_alphabet {
        return Err(Err::CorruptStream("entropy alphabet out of range"));
    }
    let mut freqs = Vec::with_capacity(alphabet);
    for _ in 0..alphabet {
        let f = leb128_read(reader)?;
        if f > u64::from(RANS_PRECISION_TOTAL) {
            return Err(Err::CorruptStream("frequency exceeds the precision total"));
        }
        freqs.push(f as u32);
    }
    let (records, slots) = rans_build_tables(&freqs)
        .ok_or(Err::CorruptStream("frequency table does not normalize"))?;

    let payload_len = leb128_read(reader)? as usize;
    let payload = reader.read_bytes(payload_len)?;
    let mut decoder = RansDecoder::new(payload)?;

    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let slot = decoder.read_slot()?;
        let sym = slots[slot as usize] as usize;
        let record = records[sym];
        decoder.pop(record.freq, record.cum, slot);
        out.push(sym as u32);
    }
    decoder.finish()?;
    Ok(out)
}

/// Bit-granular source matching `encode::entropy::BitWriter`.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read_bits(&mut self, num_bits: u32) -> Result<u64, Err> {
        if self.pos + num_bits as usize > self.data.len() * 8 {
            return Err(Err::CorruptStream("bit channel exhausted"));
        }
        let mut value = 0_u64;
        for i in 0..num_bits {
            let bit = (self.data[self.pos / 8] >> (self.pos % 8)) & 1;
            value |= u64::from(bit) << i;
            self.pos += 1;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::entropy::{encode_symbols, BitWriter};

    fn roundtrip(symbols: &[u32], alphabet: usize) {
        let mut section = Vec::new();
        encode_symbols(symbols, alphabet, &mut section).unwrap();
        let mut reader = BufferReader::new(&section);
        let decoded = decode_symbols(&mut reader, symbols.len(), alphabet).unwrap();
        assert_eq!(decoded, symbols);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn uniform_stream_roundtrips() {
        let symbols: Vec<u32> = (0..512).map(|i| i % 6).collect();
        roundtrip(&symbols, 6);
    }

    #[test]
    fn skewed_stream_roundtrips() {
        let mut symbols = vec![0_u32; 1000];
        symbols[13] = 4;
        symbols[700] = 2;
        symbols[999] = 5;
        roundtrip(&symbols, 6);
    }

    #[test]
    fn single_symbol_alphabet_roundtrips() {
        let symbols = vec![3_u32; 77];
        roundtrip(&symbols, 6);
    }

    #[test]
    fn short_stream_roundtrips() {
        roundtrip(&[2], 33);
        roundtrip(&[0, 32], 33);
    }

    #[test]
    fn empty_stream_reads_nothing() {
        let data = [0xAA_u8, 0xBB];
        let mut reader = BufferReader::new(&data);
        let decoded = decode_symbols(&mut reader, 0, 6).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn corrupt_payload_is_detected() {
        let symbols: Vec<u32> = (0..100).map(|i| i % 5).collect();
        let mut section = Vec::new();
        encode_symbols(&symbols, 5, &mut section).unwrap();
        // Flip a byte inside the rans payload. The coder is a bijection that
        // must terminate exactly at the base state, so a flipped stream can
        // never decode cleanly to the original symbols.
        let last = section.len() - 1;
        section[last] ^= 0x15;
        let mut reader = BufferReader::new(&section);
        match decode_symbols(&mut reader, symbols.len(), 5) {
            Ok(decoded) => assert_ne!(decoded, symbols),
            Err(e) => assert!(matches!(e, Err::CorruptStream(_))),
        }
    }

    #[test]
    fn bad_frequency_table_is_detected() {
        let mut section = Vec::new();
        crate::utils::bit_coder::leb128_write(2, &mut section);
        crate::utils::bit_coder::leb128_write(100, &mut section);
        crate::utils::bit_coder::leb128_write(100, &mut section);
        crate::utils::bit_coder::leb128_write(1, &mut section);
        section.push(0);
        let mut reader = BufferReader::new(&section);
        assert!(matches!(
            decode_symbols(&mut reader, 4, 6),
            Err(Err::CorruptStream(_))
        ));
    }

    #[test]
    fn truncated_section_is_detected() {
        let symbols: Vec<u32> = (0..100).map(|i| i % 5).collect();
        let mut section = Vec::new();
        encode_symbols(&symbols, 5, &mut section).unwrap();
        section.truncate(section.len() / 2);
        let mut reader = BufferReader::new(&section);
        assert!(decode_symbols(&mut reader, symbols.len(), 5).is_err());
    }

    #[test]
    fn bit_reader_mirrors_bit_writer() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        writer.write_bits(0x3FFF, 14);
        writer.write_bits(0, 1);
        writer.write_bits(1, 1);
        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(14).unwrap(), 0x3FFF);
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert!(reader.read_bits(32).is_err());
    }
}

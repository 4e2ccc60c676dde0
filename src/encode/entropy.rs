//! rANS entropy encoding.
//!
//! The coder is byte-wise renormalizing rANS with a static frequency table
//! per stream. rANS is last-in first-out, so symbols are fed to the coder in
//! reverse order and come out of the decoder forward. A stream is framed as
//! `leb128 alphabet`, one leb128 frequency per alphabet entry (normalized to
//! sum `1 << RANS_PRECISION`), `leb128 payload_len` and the payload bytes.
//! The flushed final state rides at the end of the payload behind a two-bit
//! width flag.

use thiserror::Error;

use crate::core::buffer::ByteWriter;
use crate::shared::entropy::{
    rans_build_tables, normalize_frequencies, RansSymbol, L_RANS_BASE, RANS_PRECISION,
};
use crate::utils::bit_coder::leb128_write;

#[remain::sorted]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("entropy coder invariant broken: {0}")]
    Internal(&'static str),
}

pub(crate) struct RansCoder {
    state: u64,
    buffer: Vec<u8>,
}

impl RansCoder {
    pub fn new() -> Self {
        Self {
            state: L_RANS_BASE,
            buffer: Vec::new(),
        }
    }

    pub fn write_symbol(&mut self, record: &RansSymbol) -> Result<(), Err> {
        if record.freq == 0 {
            return Err(Err::Internal("encoding a symbol with zero frequency"));
        }
        let freq = record.freq as u64;
        let upper = ((L_RANS_BASE >> RANS_PRECISION) << 8) * freq;
        while self.state >= upper {
            self.buffer.push((self.state & 0xFF) as u8);
            self.state >>= 8;
        }
        self.state =
            ((self.state / freq) << RANS_PRECISION) + self.state % freq + record.cum as u64;
        Ok(())
    }

    /// Appends the final state and returns the payload bytes.
    pub fn flush(mut self) -> Result<Vec<u8>, Err> {
        let s = self.state - L_RANS_BASE;
        if s < 1 << 6 {
            self.buffer.write_u8(s as u8);
        } else if s < 1 << 14 {
            self.buffer.write_u16((1 << 14 | s) as u16);
        } else if s < 1 << 22 {
            self.buffer.write_u24((2 << 22 | s) as u32);
        } else if s < 1 << 30 {
            self.buffer.write_u32((3 << 30 | s) as u32);
        } else {
            return Err(Err::Internal("rans state exceeds 30 bits at flush"));
        }
        Ok(self.buffer)
    }
}

/// Encodes a symbol stream as a framed rANS section. Streams of length zero
/// write nothing; the decoder skips the section symmetrically.
pub(crate) fn encode_symbols(
    symbols: &[u32],
    alphabet: usize,
    out: &mut Vec<u8>,
) -> Result<(), Err> {
    if symbols.is_empty() {
        return Ok(());
    }
    let mut counts = vec![0_u64; alphabet];
    for &s in symbols {
        let slot = counts
            .get_mut(s as usize)
            .ok_or(Err::Internal("symbol outside the declared alphabet"))?;
        *slot += 1;
    }
    let freqs = normalize_frequencies(&counts)
        .ok_or(Err::Internal("empty frequency table for a non-empty stream"))?;
    let (records, _slots) = rans_build_tables(&freqs)
        .ok_or(Err::Internal("normalized table does not sum to the precision total"))?;

    leb128_write(alphabet as u64, out);
    for &f in &freqs {
        leb128_write(f as u64, out);
    }

    let mut coder = RansCoder::new();
    for &s in symbols.iter().rev() {
        coder.write_symbol(&records[s as usize])?;
    }
    let payload = coder.flush()?;
    leb128_write(payload.len() as u64, out);
    out.write_bytes(&payload);
    Ok(())
}

/// Bit-granular sink, least significant bit first within each byte. Used for
/// the raw remainder bits of residual coding.
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    used_bits: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            used_bits: 0,
        }
    }

    pub fn write_bits(&mut self, value: u64, num_bits: u32) {
        for i in 0..num_bits {
            if self.used_bits % 8 == 0 {
                self.bytes.push(0);
            }
            let bit = (value >> i) & 1;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= (bit as u8) << (self.used_bits % 8);
            self.used_bits += 1;
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

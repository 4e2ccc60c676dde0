//! Attribute section decoding. Mirrors `encode::attribute`: the same
//! prediction scheme runs over the same traversal, so unfolding the residual
//! stream reproduces the encoder's quantized values exactly.

use super::Err;
use crate::core::buffer::BufferReader;
use crate::decode::entropy::{decode_symbols, BitReader};
use crate::shared::prediction::{unfold_residual, Prediction, PredictionScheme, PredictionState};
use crate::shared::quantization::Quantizer;
use crate::utils::bit_coder::leb128_read;

const MODE_CONSTANT: u8 = 0;
const MODE_QUANTIZED: u8 = 1;

pub(crate) fn decode_attribute(
    reader: &mut BufferReader,
    num_vertices: usize,
    num_components: usize,
    bits: u8,
    traversal: &[(u32, Option<u32>)],
    scheme: &Prediction,
) -> Result<Vec<f32>, Err> {
    match reader.read_u8()? {
        MODE_CONSTANT => {
            let mut value = Vec::with_capacity(num_components);
            for _ in 0..num_components {
                value.push(reader.read_f32()?);
            }
            let mut data = Vec::with_capacity(num_vertices * num_components);
            for _ in 0..num_vertices {
                data.extend_from_slice(&value);
            }
            Ok(data)
        }
        MODE_QUANTIZED => {
            let mut quantizers = Vec::with_capacity(num_components);
            for _ in 0..num_components {
                let min = reader.read_f32()?;
                let range = reader.read_f32()?;
                if !min.is_finite() || !range.is_finite() || range < 0.0 {
                    return Err(Err::CorruptStream("bad quantization grid parameters"));
                }
                quantizers.push(
                    Quantizer::new(min, range, bits)
                        .map_err(|_| Err::CorruptStream("bad quantization bit depth"))?,
                );
            }
            let symbols =
                decode_symbols(reader, num_vertices * num_components, bits as usize + 1)?;
            let raw_len = leb128_read(reader)? as usize;
            let mut raw = BitReader::new(reader.read_bytes(raw_len)?);

            let modulus = 1_u64 << bits;
            let mut state = PredictionState::new(num_vertices, num_components);
            let mut predicted = vec![0_u32; num_components];
            let mut actual = vec![0_u32; num_components];
            let mut data = vec![0.0_f32; num_vertices * num_components];
            let mut si = 0;
            for &(v, corner) in traversal {
                scheme.predict(corner, &state, &mut predicted);
                let base = v as usize * num_components;
                for comp in 0..num_components {
                    let len = symbols[si];
                    si += 1;
                    let folded = match len {
                        0 => 0,
                        1 => 1,
                        l => 1_u64 << (l - 1) | raw.read_bits(l - 1)?,
                    };
                    actual[comp] = unfold_residual(folded, predicted[comp], modulus);
                    data[base + comp] = quantizers[comp].dequantize(actual[comp]);
                }
                state.set(v, &actual);
            }
            Ok(data)
        }
        _ => Err(Err::CorruptStream("unknown attribute section mode")),
    }
}

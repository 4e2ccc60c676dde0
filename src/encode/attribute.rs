//! Attribute section encoding.
//!
//! Values are gathered into decode order, quantized per component, predicted
//! in traversal order and the folded residuals split into a bit-length
//! symbol stream (rANS coded) plus a raw low-bit channel. Constant
//! attributes collapse to their single value.

use crate::core::attribute::Attribute;
use crate::core::buffer::ByteWriter;
use crate::encode::entropy::{encode_symbols, BitWriter};
use crate::shared::prediction::{fold_residual, Prediction, PredictionScheme, PredictionState};
use crate::shared::quantization::{component_extent, Quantizer};
use crate::utils::bit_coder::leb128_write;

use super::Err;

const MODE_CONSTANT: u8 = 0;
const MODE_QUANTIZED: u8 = 1;

pub(crate) fn encode_attribute(
    att: &Attribute,
    order: &[u32],
    traversal: &[(u32, Option<u32>)],
    scheme: &Prediction,
    bits: u8,
    range_override: Option<f32>,
    out: &mut Vec<u8>,
) -> Result<(), Err> {
    let num_components = att.get_num_components();
    let num_vertices = order.len();

    let mut gathered = Vec::with_capacity(num_vertices * num_components);
    for &src in order {
        gathered.extend_from_slice(att.get(src as usize));
    }
    let mut extents = Vec::with_capacity(num_components);
    for comp in 0..num_components {
        extents.push(component_extent(&gathered, comp, num_components)?);
    }

    if extents.iter().all(|&(lo, hi)| lo == hi) {
        out.write_u8(MODE_CONSTANT);
        for &(lo, _) in &extents {
            out.write_f32(lo);
        }
        return Ok(());
    }

    out.write_u8(MODE_QUANTIZED);
    let mut quantizers = Vec::with_capacity(num_components);
    for &(lo, hi) in &extents {
        let range = range_override.unwrap_or(hi - lo);
        out.write_f32(lo);
        out.write_f32(range);
        quantizers.push(Quantizer::new(lo, range, bits)?);
    }

    let modulus = 1_u64 << bits;
    let mut state = PredictionState::new(num_vertices, num_components);
    let mut predicted = vec![0_u32; num_components];
    let mut actual = vec![0_u32; num_components];
    let mut symbols = Vec::with_capacity(num_vertices * num_components);
    let mut raw = BitWriter::new();
    for &(v, corner) in traversal {
        scheme.predict(corner, &state, &mut predicted);
        let base = v as usize * num_components;
        for comp in 0..num_components {
            actual[comp] = quantizers[comp].quantize(gathered[base + comp]);
            let folded = fold_residual(actual[comp], predicted[comp], modulus);
            let len = 64 - folded.leading_zeros();
            symbols.push(len);
            // The top bit of a len-bit value is implied.
            if len >= 2 {
                raw.write_bits(folded, len - 1);
            }
        }
        state.set(v, &actual);
    }
    encode_symbols(&symbols, bits as usize + 1, out)?;
    let raw_bytes = raw.into_bytes();
    leb128_write(raw_bytes.len() as u64, out);
    out.write_bytes(&raw_bytes);
    Ok(())
}

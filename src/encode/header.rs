//! Container header writing.
//!
//! Layout, all little-endian: magic `TPAK`, version byte, connectivity
//! method byte, flags byte (bit 0: metadata section present), vertex and
//! face counts as u32, the attribute descriptor table (type, component
//! count and bit depth, one byte each), the optional metadata section, then
//! the u32 payload length written by [`crate::encode::encode`].

use crate::core::attribute::AttributeDescriptor;
use crate::core::buffer::ByteWriter;
use crate::shared::connectivity::Method;
use crate::utils::bit_coder::leb128_write;

pub(crate) const MAGIC: &[u8; 4] = b"TPAK";
pub(crate) const VERSION: u8 = 1;

pub(crate) const FLAG_METADATA: u8 = 1;

pub(crate) fn write_header(
    out: &mut Vec<u8>,
    method: Method,
    vertex_count: u32,
    face_count: u32,
    descriptors: &[AttributeDescriptor],
    metadata: Option<&[(String, String)]>,
) {
    out.write_bytes(MAGIC);
    out.write_u8(VERSION);
    out.write_u8(method.id());
    out.write_u8(if metadata.is_some() { FLAG_METADATA } else { 0 });
    out.write_u32(vertex_count);
    out.write_u32(face_count);
    out.write_u8(descriptors.len() as u8);
    for d in descriptors {
        out.write_u8(d.attribute_type.id());
        out.write_u8(d.num_components as u8);
        out.write_u8(d.quantization_bits);
    }
    if let Some(entries) = metadata {
        leb128_write(entries.len() as u64, out);
        for (key, value) in entries {
            leb128_write(key.len() as u64, out);
            out.write_bytes(key.as_bytes());
            leb128_write(value.len() as u64, out);
            out.write_bytes(value.as_bytes());
        }
    }
}

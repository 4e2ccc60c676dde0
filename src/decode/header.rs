//! Container header parsing. The magic and version gates come first: a
//! buffer that is not a stream at all fails with `BadMagic`, a stream from a
//! future format version fails with `UnsupportedVersion`, both before any
//! payload byte is touched.

use super::Err;
use crate::core::attribute::{AttributeDescriptor, AttributeType};
use crate::core::buffer::BufferReader;
use crate::encode::header::{FLAG_METADATA, MAGIC, VERSION};
use crate::shared::connectivity::Method;
use crate::shared::quantization::MAX_QUANTIZATION_BITS;
use crate::utils::bit_coder::leb128_read;

pub(crate) struct Header {
    pub method: Method,
    pub vertex_count: u32,
    pub face_count: u32,
    pub descriptors: Vec<AttributeDescriptor>,
    pub metadata: Vec<(String, String)>,
}

pub(crate) fn read_header(reader: &mut BufferReader) -> Result<Header, Err> {
    let magic = reader.read_bytes(4).map_err(|_| Err::BadMagic)?;
    if magic != MAGIC {
        return Err(Err::BadMagic);
    }
    let version = reader.read_u8()?;
    if version != VERSION {
        return Err(Err::UnsupportedVersion(version));
    }
    let method = Method::from_id(reader.read_u8()?)
        .ok_or(Err::CorruptStream("unknown connectivity method"))?;
    let flags = reader.read_u8()?;
    if flags & !FLAG_METADATA != 0 {
        return Err(Err::CorruptStream("unknown header flags"));
    }
    let vertex_count = reader.read_u32()?;
    let face_count = reader.read_u32()?;

    let num_attributes = reader.read_u8()?;
    if num_attributes == 0 {
        return Err(Err::CorruptStream("a stream carries at least one attribute"));
    }
    let mut descriptors = Vec::with_capacity(num_attributes as usize);
    for _ in 0..num_attributes {
        let attribute_type = AttributeType::from_id(reader.read_u8()?)
            .ok_or(Err::CorruptStream("unknown attribute type"))?;
        let num_components = reader.read_u8()?;
        if num_components == 0 {
            return Err(Err::CorruptStream("attribute with zero components"));
        }
        let quantization_bits = reader.read_u8()?;
        if quantization_bits == 0 || quantization_bits > MAX_QUANTIZATION_BITS {
            return Err(Err::CorruptStream("bit depth outside 1..=30"));
        }
        descriptors.push(AttributeDescriptor::new(
            attribute_type,
            num_components as usize,
            quantization_bits,
        ));
    }

    let mut metadata = Vec::new();
    if flags & FLAG_METADATA != 0 {
        let count = leb128_read(reader)? as usize;
        for _ in 0..count {
            let key = read_string(reader)?;
            let value = read_string(reader)?;
            metadata.push((key, value));
        }
    }

    Ok(Header {
        method,
        vertex_count,
        face_count,
        descriptors,
        metadata,
    })
}

fn read_string(reader: &mut BufferReader) -> Result<String, Err> {
    let len = leb128_read(reader)? as usize;
    let bytes = reader.read_bytes(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| Err::CorruptStream("metadata is not utf-8"))
}

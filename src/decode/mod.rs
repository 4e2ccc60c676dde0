//! Mesh decoding.
//!
//! [`decode`] is the inverse of [`crate::encode::encode`]. The magic and
//! version gates run before anything else; every malformed byte after them
//! surfaces as [`Err::CorruptStream`] rather than a panic or a bogus mesh.

pub(crate) mod attribute;
pub(crate) mod connectivity;
pub(crate) mod entropy;
pub(crate) mod header;

use thiserror::Error;

use crate::core::buffer::{BufferReader, CompressedBuffer, ReaderErr};
use crate::core::mesh::Mesh;
use crate::shared::connectivity::Method;
use crate::shared::prediction::{
    traversal_order, DeltaPrediction, MeshParallelogramPrediction, Prediction,
};

#[remain::sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Err {
    #[error("not a tripack stream")]
    BadMagic,
    #[error("corrupt stream: {0}")]
    CorruptStream(&'static str),
    #[error("stream version {0} is not supported")]
    UnsupportedVersion(u8),
}

impl From<ReaderErr> for Err {
    fn from(e: ReaderErr) -> Self {
        match e {
            ReaderErr::MalformedVarint => Err::CorruptStream("malformed varint"),
            ReaderErr::OutOfBounds => Err::CorruptStream("unexpected end of stream"),
        }
    }
}

pub fn decode(buffer: &CompressedBuffer) -> Result<Mesh, Err> {
    let mut reader = BufferReader::new(buffer.as_bytes());
    let header = header::read_header(&mut reader)?;
    let payload_len = reader.read_u32()? as usize;
    let mut payload = reader.subreader(payload_len)?;
    if reader.remaining() != 0 {
        return Err(Err::CorruptStream("trailing bytes after the payload"));
    }

    let num_vertices = header.vertex_count as usize;
    let num_faces = header.face_count as usize;
    let faces =
        connectivity::decode_connectivity(&mut payload, num_vertices, num_faces, header.method)?;
    let traversal = traversal_order(&faces, num_vertices);

    let mut builder = Mesh::builder();
    for d in &header.descriptors {
        let scheme = match header.method {
            Method::Edgebreaker => Prediction::from(MeshParallelogramPrediction::new(
                &faces,
                d.quantization_bits,
            )),
            Method::Sequential => Prediction::from(DeltaPrediction),
        };
        let data = attribute::decode_attribute(
            &mut payload,
            num_vertices,
            d.num_components,
            d.quantization_bits,
            &traversal,
            &scheme,
        )?;
        builder.add_attribute(d.attribute_type, d.num_components, data);
    }
    if payload.remaining() != 0 {
        return Err(Err::CorruptStream("trailing bytes in the payload"));
    }
    builder.set_connectivity(faces);
    for (key, value) in &header.metadata {
        builder.add_metadata(key, value);
    }
    builder
        .build()
        .map_err(|_| Err::CorruptStream("decoded mesh is structurally invalid"))
}

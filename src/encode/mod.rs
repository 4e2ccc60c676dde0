//! Mesh encoding.
//!
//! [`encode`] turns a [`Mesh`] into a self-contained [`CompressedBuffer`]:
//! header, connectivity section, then one section per attribute. Encoding is
//! deterministic; the same mesh, descriptors and options always produce the
//! same bytes.

pub(crate) mod attribute;
pub(crate) mod connectivity;
pub(crate) mod entropy;
pub(crate) mod header;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::attribute::{AttributeDescriptor, AttributeType};
use crate::core::buffer::{ByteWriter, CompressedBuffer};
use crate::core::mesh::Mesh;
use crate::core::shared::ConfigType;
use crate::shared::connectivity::{Method, NonManifoldPolicy};
use crate::shared::prediction::{
    traversal_order, DeltaPrediction, MeshParallelogramPrediction, Prediction,
};
use crate::shared::quantization::{self, component_extent, grid_bits, MAX_QUANTIZATION_BITS};

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error(transparent)]
    ConnectivityError(#[from] connectivity::Err),
    #[error("attribute descriptors do not match the mesh: {0}")]
    DescriptorMismatch(String),
    #[error(transparent)]
    EntropyError(#[from] entropy::Err),
    #[error(transparent)]
    QuantizationError(#[from] quantization::Err),
    #[error("encoded stream exceeds the 32-bit container limits")]
    StreamTooLarge,
}

/// Encoder options.
#[derive(Debug, Clone)]
pub struct Options {
    /// How connectivity is coded; see [`Method`].
    pub method: Method,
    /// Bit depth for position attributes when no descriptor or per-attribute
    /// override says otherwise.
    pub position_quantization_bits: u8,
    /// Per-attribute bit depth overrides, keyed by attribute index. Takes
    /// precedence over descriptors and defaults.
    pub quantization_bits_per_attribute: BTreeMap<usize, u8>,
    /// When set, position bit depths are derived from this grid spacing
    /// instead: the coarsest depth whose step does not exceed the spacing.
    pub grid_delta: Option<f32>,
    /// Whether non-manifold input fails or gets repaired by duplication.
    pub non_manifold_policy: NonManifoldPolicy,
    /// Whether the mesh's key/value metadata rides along in the container.
    pub generate_metadata: bool,
}

impl ConfigType for Options {
    fn default() -> Self {
        Self {
            method: Method::Edgebreaker,
            position_quantization_bits: 14,
            quantization_bits_per_attribute: BTreeMap::new(),
            grid_delta: None,
            non_manifold_policy: NonManifoldPolicy::Repair,
            generate_metadata: false,
        }
    }
}

pub fn encode(
    mesh: &Mesh,
    descriptors: &[AttributeDescriptor],
    options: &Options,
) -> Result<CompressedBuffer, Err> {
    let attributes = mesh.get_attributes();
    if attributes.is_empty() {
        return Err(Err::DescriptorMismatch("the mesh has no attributes".into()));
    }
    if attributes.len() > u8::MAX as usize {
        return Err(Err::DescriptorMismatch(format!(
            "{} attributes exceed the container limit of 255",
            attributes.len()
        )));
    }
    let mut resolved = resolve_descriptors(mesh, descriptors, options)?;
    for (i, d) in resolved.iter().enumerate() {
        if d.num_components > u8::MAX as usize {
            return Err(Err::DescriptorMismatch(format!(
                "attribute {i} has {} components, the container limit is 255",
                d.num_components
            )));
        }
    }

    let conn = connectivity::encode_connectivity(
        mesh.get_faces(),
        mesh.num_vertices(),
        options.method,
        options.non_manifold_policy,
    )?;
    let traversal = traversal_order(&conn.faces, conn.order.len());

    // Grid spacing overrides the position bit depths and ranges.
    let mut range_overrides: Vec<Option<f32>> = vec![None; attributes.len()];
    if let Some(delta) = options.grid_delta {
        if !delta.is_finite() || delta <= 0.0 {
            return Err(quantization::Err::InvalidGridDelta.into());
        }
        for (i, att) in attributes.iter().enumerate() {
            if att.get_attribute_type() != AttributeType::Position {
                continue;
            }
            let mut widest = 0.0_f32;
            for comp in 0..att.get_num_components() {
                let (lo, hi) = component_extent(att.data(), comp, att.get_num_components())?;
                widest = widest.max(hi - lo);
            }
            let (bits, effective) = grid_bits(widest, delta);
            resolved[i].quantization_bits = bits;
            range_overrides[i] = Some(effective);
        }
    }
    for d in &resolved {
        if d.quantization_bits == 0 || d.quantization_bits > MAX_QUANTIZATION_BITS {
            return Err(quantization::Err::InvalidBits {
                bits: d.quantization_bits,
            }
            .into());
        }
    }

    if conn.order.len() > u32::MAX as usize || conn.faces.len() > u32::MAX as usize {
        return Err(Err::StreamTooLarge);
    }
    let mut out = Vec::new();
    let metadata = if options.generate_metadata {
        Some(mesh.get_metadata())
    } else {
        None
    };
    header::write_header(
        &mut out,
        options.method,
        conn.order.len() as u32,
        conn.faces.len() as u32,
        &resolved,
        metadata,
    );

    let mut payload = conn.section;
    for (i, att) in attributes.iter().enumerate() {
        let scheme = match options.method {
            Method::Edgebreaker => Prediction::from(MeshParallelogramPrediction::new(
                &conn.faces,
                resolved[i].quantization_bits,
            )),
            Method::Sequential => Prediction::from(DeltaPrediction),
        };
        attribute::encode_attribute(
            att,
            &conn.order,
            &traversal,
            &scheme,
            resolved[i].quantization_bits,
            range_overrides[i],
            &mut payload,
        )?;
    }
    if payload.len() > u32::MAX as usize {
        return Err(Err::StreamTooLarge);
    }
    out.write_u32(payload.len() as u32);
    out.write_bytes(&payload);
    Ok(CompressedBuffer::from_vec(out))
}

/// Validates explicit descriptors against the mesh, or derives them from it,
/// and applies the option-level bit depth overrides.
fn resolve_descriptors(
    mesh: &Mesh,
    descriptors: &[AttributeDescriptor],
    options: &Options,
) -> Result<Vec<AttributeDescriptor>, Err> {
    let attributes = mesh.get_attributes();
    let mut resolved = if descriptors.is_empty() {
        attributes
            .iter()
            .map(|att| {
                let mut d = AttributeDescriptor::for_attribute(att);
                if d.attribute_type == AttributeType::Position {
                    d.quantization_bits = options.position_quantization_bits;
                }
                d
            })
            .collect::<Vec<_>>()
    } else {
        if descriptors.len() != attributes.len() {
            return Err(Err::DescriptorMismatch(format!(
                "{} descriptors for {} attributes",
                descriptors.len(),
                attributes.len()
            )));
        }
        for (i, (d, att)) in descriptors.iter().zip(attributes).enumerate() {
            if d.attribute_type != att.get_attribute_type() {
                return Err(Err::DescriptorMismatch(format!(
                    "descriptor {i} has the wrong attribute type"
                )));
            }
            if d.num_components != att.get_num_components() {
                return Err(Err::DescriptorMismatch(format!(
                    "descriptor {i} expects {} components, attribute has {}",
                    d.num_components,
                    att.get_num_components()
                )));
            }
        }
        descriptors.to_vec()
    };
    for (i, d) in resolved.iter_mut().enumerate() {
        if let Some(&bits) = options.quantization_bits_per_attribute.get(&i) {
            d.quantization_bits = bits;
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attribute::AttributeType;

    fn triangle_mesh() -> Mesh {
        let mut builder = Mesh::builder();
        builder.add_attribute(
            AttributeType::Position,
            3,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        );
        builder.set_connectivity(vec![[0, 1, 2]]);
        builder.build().unwrap()
    }

    #[test]
    fn derived_descriptors_use_the_position_option() {
        let mesh = triangle_mesh();
        let mut options = <Options as ConfigType>::default();
        options.position_quantization_bits = 11;
        let resolved = resolve_descriptors(&mesh, &[], &options).unwrap();
        assert_eq!(resolved[0].quantization_bits, 11);
    }

    #[test]
    fn per_attribute_override_wins() {
        let mesh = triangle_mesh();
        let mut options = <Options as ConfigType>::default();
        options.quantization_bits_per_attribute.insert(0, 9);
        let explicit = [AttributeDescriptor::new(AttributeType::Position, 3, 16)];
        let resolved = resolve_descriptors(&mesh, &explicit, &options).unwrap();
        assert_eq!(resolved[0].quantization_bits, 9);
    }

    #[test]
    fn mismatched_descriptors_are_rejected() {
        let mesh = triangle_mesh();
        let options = <Options as ConfigType>::default();
        let wrong_type = [AttributeDescriptor::new(AttributeType::Normal, 3, 10)];
        assert!(matches!(
            resolve_descriptors(&mesh, &wrong_type, &options),
            Err(Err::DescriptorMismatch(_))
        ));
        let wrong_components = [AttributeDescriptor::new(AttributeType::Position, 2, 10)];
        assert!(matches!(
            resolve_descriptors(&mesh, &wrong_components, &options),
            Err(Err::DescriptorMismatch(_))
        ));
    }

    #[test]
    fn non_positive_grid_spacings_are_rejected() {
        let mesh = triangle_mesh();
        for delta in [0.0_f32, -0.5, f32::NAN, f32::INFINITY] {
            let mut options = <Options as ConfigType>::default();
            options.grid_delta = Some(delta);
            assert!(
                matches!(
                    encode(&mesh, &[], &options),
                    Err(Err::QuantizationError(quantization::Err::InvalidGridDelta))
                ),
                "delta {delta} was accepted"
            );
        }
    }

    #[test]
    fn invalid_bit_depth_fails_before_writing() {
        let mesh = triangle_mesh();
        let mut options = <Options as ConfigType>::default();
        options.quantization_bits_per_attribute.insert(0, 31);
        assert!(matches!(
            encode(&mesh, &[], &options),
            Err(Err::QuantizationError(quantization::Err::InvalidBits { bits: 31 }))
        ));
    }
}

use thiserror::Error;

use super::Mesh;
use crate::core::attribute::{Attribute, AttributeType};

#[remain::sorted]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("attribute {attribute} covers {got} vertices, expected {expected}")]
    AttributeLengthMismatch {
        attribute: usize,
        expected: usize,
        got: usize,
    },
    #[error("face {face} repeats a vertex index")]
    DegenerateFace { face: usize },
    #[error("face {face} references vertex {index}, but the mesh has {num_vertices} vertices")]
    IndexOutOfBounds {
        face: usize,
        index: u32,
        num_vertices: usize,
    },
    #[error("attribute {attribute} data length is not a multiple of its component count")]
    MisalignedData { attribute: usize },
    #[error("a mesh needs at least one attribute")]
    NoAttributes,
}

/// Validating constructor for [`Mesh`].
pub struct MeshBuilder {
    attributes: Vec<Attribute>,
    faces: Vec<[u32; 3]>,
    metadata: Vec<(String, String)>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
            faces: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Adds a per-vertex attribute; `data` holds `num_components` consecutive
    /// values per vertex. Returns the attribute's index.
    pub fn add_attribute(
        &mut self,
        att_type: AttributeType,
        num_components: usize,
        data: Vec<f32>,
    ) -> usize {
        self.attributes
            .push(Attribute::new(att_type, num_components, data));
        self.attributes.len() - 1
    }

    pub fn set_connectivity(&mut self, faces: Vec<[u32; 3]>) -> &mut Self {
        self.faces = faces;
        self
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) -> &mut Self {
        self.metadata.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn build(self) -> Result<Mesh, Err> {
        if self.attributes.is_empty() {
            return Err(Err::NoAttributes);
        }
        for (i, att) in self.attributes.iter().enumerate() {
            if att.get_num_components() == 0
                || att.data().len() % att.get_num_components() != 0
            {
                return Err(Err::MisalignedData { attribute: i });
            }
        }
        let num_vertices = self.attributes[0].len();
        for (i, att) in self.attributes.iter().enumerate().skip(1) {
            if att.len() != num_vertices {
                return Err(Err::AttributeLengthMismatch {
                    attribute: i,
                    expected: num_vertices,
                    got: att.len(),
                });
            }
        }
        for (f, face) in self.faces.iter().enumerate() {
            for &index in face.iter() {
                if index as usize >= num_vertices {
                    return Err(Err::IndexOutOfBounds {
                        face: f,
                        index,
                        num_vertices,
                    });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(Err::DegenerateFace { face: f });
            }
        }
        Ok(Mesh {
            attributes: self.attributes,
            faces: self.faces,
            metadata: self.metadata,
        })
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_builder() -> MeshBuilder {
        let mut builder = MeshBuilder::new();
        builder.add_attribute(
            AttributeType::Position,
            3,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        );
        builder
    }

    #[test]
    fn builds_a_triangle() {
        let mut builder = triangle_builder();
        builder.set_connectivity(vec![[0, 1, 2]]);
        let mesh = builder.build().unwrap();
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_faces(), 1);
    }

    #[test]
    fn rejects_degenerate_face() {
        let mut builder = triangle_builder();
        builder.set_connectivity(vec![[0, 1, 1]]);
        assert_eq!(builder.build(), Err(Err::DegenerateFace { face: 0 }));
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let mut builder = triangle_builder();
        builder.set_connectivity(vec![[0, 1, 7]]);
        assert!(matches!(
            builder.build(),
            Err(Err::IndexOutOfBounds { face: 0, index: 7, .. })
        ));
    }

    #[test]
    fn rejects_mismatched_attribute_lengths() {
        let mut builder = triangle_builder();
        builder.add_attribute(AttributeType::Normal, 3, vec![0.0; 6]);
        builder.set_connectivity(vec![[0, 1, 2]]);
        assert!(matches!(
            builder.build(),
            Err(Err::AttributeLengthMismatch { attribute: 1, .. })
        ));
    }

    #[test]
    fn zero_area_face_with_distinct_indices_is_legal() {
        let mut builder = MeshBuilder::new();
        builder.add_attribute(AttributeType::Position, 3, vec![0.0; 9]);
        builder.set_connectivity(vec![[0, 1, 2]]);
        assert!(builder.build().is_ok());
    }
}

pub mod builder;

use super::attribute::{Attribute, AttributeType};
pub use builder::MeshBuilder;

/// A triangle mesh: a face list over shared vertex indices plus one or more
/// per-vertex attributes of equal length.
///
/// Meshes are constructed through [`MeshBuilder`], which enforces the
/// structural invariants (index bounds, equal attribute lengths, no
/// degenerate faces), or come out of [`crate::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) faces: Vec<[u32; 3]>,
    pub(crate) metadata: Vec<(String, String)>,
}

impl Mesh {
    pub fn builder() -> MeshBuilder {
        MeshBuilder::new()
    }

    pub fn get_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn get_faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Vertex count shared by all attributes. Zero for an attribute-less mesh.
    pub fn num_vertices(&self) -> usize {
        self.attributes.first().map_or(0, |att| att.len())
    }

    /// The first attribute tagged [`AttributeType::Position`], if any.
    pub fn position_attribute(&self) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|att| att.get_attribute_type() == AttributeType::Position)
    }

    pub fn get_metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.push((key.to_owned(), value.to_owned()));
    }
}

//! Vertex attribute storage.
//!
//! An [`Attribute`] is a flat `f32` array with a fixed number of components
//! per vertex and a semantic tag. The codec treats every attribute the same
//! way; the tag only selects the default quantization depth and is carried
//! in the container so a decoder can hand data back with its meaning intact.

/// Semantic tag of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Position,
    Normal,
    TexCoord,
    Generic,
}

impl AttributeType {
    pub(crate) fn id(self) -> u8 {
        match self {
            AttributeType::Position => 0,
            AttributeType::Normal => 1,
            AttributeType::TexCoord => 2,
            AttributeType::Generic => 3,
        }
    }

    pub(crate) fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(AttributeType::Position),
            1 => Some(AttributeType::Normal),
            2 => Some(AttributeType::TexCoord),
            3 => Some(AttributeType::Generic),
            _ => None,
        }
    }

    /// Default quantization depth when neither the descriptor nor the
    /// options override it.
    pub fn default_quantization_bits(self) -> u8 {
        match self {
            AttributeType::Position => 14,
            AttributeType::Normal => 10,
            AttributeType::TexCoord => 10,
            AttributeType::Generic => 12,
        }
    }
}

/// Per-vertex data with `num_components` consecutive `f32` values per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    att_type: AttributeType,
    num_components: usize,
    data: Vec<f32>,
}

impl Attribute {
    pub fn new(att_type: AttributeType, num_components: usize, data: Vec<f32>) -> Self {
        Self {
            att_type,
            num_components,
            data,
        }
    }

    pub fn get_attribute_type(&self) -> AttributeType {
        self.att_type
    }

    pub fn get_num_components(&self) -> usize {
        self.num_components
    }

    /// Number of vertices covered by this attribute.
    pub fn len(&self) -> usize {
        if self.num_components == 0 {
            0
        } else {
            self.data.len() / self.num_components
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// The components of one vertex.
    pub fn get(&self, vertex: usize) -> &[f32] {
        let start = vertex * self.num_components;
        &self.data[start..start + self.num_components]
    }
}

/// Describes how one attribute is to be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub attribute_type: AttributeType,
    pub num_components: usize,
    pub quantization_bits: u8,
}

impl AttributeDescriptor {
    pub fn new(attribute_type: AttributeType, num_components: usize, quantization_bits: u8) -> Self {
        Self {
            attribute_type,
            num_components,
            quantization_bits,
        }
    }

    /// A descriptor with the type's default bit depth.
    pub fn for_attribute(att: &Attribute) -> Self {
        Self {
            attribute_type: att.get_attribute_type(),
            num_components: att.get_num_components(),
            quantization_bits: att.get_attribute_type().default_quantization_bits(),
        }
    }
}

//! Lossy compression for triangle meshes.
//!
//! The encoder quantizes per-vertex attributes onto uniform grids, codes
//! connectivity with a traversal-based scheme (or verbatim, when vertex
//! order matters), predicts attribute values from already-coded neighbors
//! and entropy-codes the residuals with rANS. Everything lands in a small
//! versioned container that [`decode`] reconstructs without any side
//! information.
//!
//! ```
//! use tripack::prelude::*;
//!
//! let mut builder = Mesh::builder();
//! builder.add_attribute(
//!     AttributeType::Position,
//!     3,
//!     vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
//! );
//! builder.set_connectivity(vec![[0, 1, 2]]);
//! let mesh = builder.build().unwrap();
//!
//! let buffer = tripack::encode(&mesh, &[], &Options::default()).unwrap();
//! let decoded = tripack::decode(&buffer).unwrap();
//! assert_eq!(decoded.num_faces(), 1);
//! ```

pub mod core;
pub mod decode;
pub mod encode;
pub mod io;
pub(crate) mod shared;
pub(crate) mod utils;

pub use crate::decode::decode;
pub use crate::encode::encode;

pub mod prelude {
    pub use crate::core::attribute::{Attribute, AttributeDescriptor, AttributeType};
    pub use crate::core::buffer::CompressedBuffer;
    pub use crate::core::mesh::{Mesh, MeshBuilder};
    pub use crate::core::shared::ConfigType;
    pub use crate::decode::decode;
    pub use crate::encode::{encode, Options};
    pub use crate::shared::connectivity::{Method, NonManifoldPolicy};
}

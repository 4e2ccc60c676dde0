pub(crate) mod edgebreaker;

/// How connectivity is coded into the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Traversal-based coding. Vertices and faces are reindexed into
    /// traversal order; requires (or repairs to) a manifold mesh.
    Edgebreaker,
    /// Verbatim index coding. Larger, but preserves vertex and face order
    /// exactly and accepts arbitrary topology.
    Sequential,
}

impl Method {
    pub(crate) fn id(self) -> u8 {
        match self {
            Method::Edgebreaker => 0,
            Method::Sequential => 1,
        }
    }

    pub(crate) fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Method::Edgebreaker),
            1 => Some(Method::Sequential),
            _ => None,
        }
    }
}

/// What to do with non-manifold input under the edgebreaker method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonManifoldPolicy {
    /// Fail encoding with a `NonManifold` error.
    Strict,
    /// Duplicate the offending vertices until the mesh is manifold. The
    /// decoded mesh has a larger vertex count than the input.
    Repair,
}

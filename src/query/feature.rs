/// An identifier of a feature of a polyhedral surface.
///
/// The identifier indexes the half-edge arenas of the
/// [`crate::mesh::Mesh`] the feature belongs to.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum FeatureId {
    /// Identifier of a vertex.
    Vertex(u32),
    /// Identifier of an edge.
    Edge(u32),
    /// Identifier of a face.
    Face(u32),
    /// Unknown identifier.
    Unknown,
}

impl FeatureId {
    /// Retrieves the value of the identifier if `self` is a vertex.
    pub fn unwrap_vertex(self) -> u32 {
        match self {
            FeatureId::Vertex(id) => id,
            _ => panic!("The feature id does not identify a vertex."),
        }
    }

    /// Retrieves the value of the identifier if `self` is an edge.
    pub fn unwrap_edge(self) -> u32 {
        match self {
            FeatureId::Edge(id) => id,
            _ => panic!("The feature id does not identify an edge."),
        }
    }

    /// Retrieves the value of the identifier if `self` is a face.
    pub fn unwrap_face(self) -> u32 {
        match self {
            FeatureId::Face(id) => id,
            _ => panic!("The feature id does not identify a face."),
        }
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        FeatureId::Unknown
    }
}

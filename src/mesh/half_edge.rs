use crate::math::{Point, Real, UnitVector};
use smallvec::SmallVec;

/// Sentinel index for an unset mesh element reference.
pub const INVALID: u32 = u32::MAX;

/// Sentinel patch id identifying the finest (leaf) level of the hierarchy,
/// i.e. the source surface itself.
pub const PATCH_LEAF: u32 = u32::MAX;

/// A half-edge reference valid within one hierarchy patch.
///
/// The same physical boundary edge has a different opposite half-edge
/// depending on which convex patch of the hierarchy is being queried, so
/// twin links are keyed by the patch (BV arena id) they belong to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PatchRef {
    /// The BV arena id of the patch, or `PATCH_LEAF` for the source surface.
    pub patch: u32,
    /// The half-edge index.
    pub edge: u32,
}

/// A vertex of the half-edge mesh.
#[derive(Clone, Debug)]
pub struct Vertex {
    /// The vertex position, in the mesh local frame.
    pub pos: Point<Real>,
    /// One incident half-edge per patch this vertex participates in.
    ///
    /// Entries exist only where the leaf-level answer is not usable for the
    /// patch; lookups fall back leafward.
    pub(crate) incident: SmallVec<[PatchRef; 2]>,
}

impl Vertex {
    pub(crate) fn new(pos: Point<Real>) -> Self {
        Vertex {
            pos,
            incident: SmallVec::new(),
        }
    }
}

/// A directed half-edge of the mesh.
#[derive(Clone, Debug)]
pub struct HalfEdge {
    /// The vertex this half-edge emanates from.
    pub origin: u32,
    /// The next half-edge along the owning face, in CCW order.
    pub next: u32,
    /// The previous half-edge along the owning face.
    pub prev: u32,
    /// The face this half-edge borders.
    pub face: u32,
    /// The unit direction from the origin vertex toward the head vertex.
    pub dir: UnitVector<Real>,
    /// The distance between the origin and head vertices.
    pub length: Real,
    /// The signed offset of the edge-face Voronoi plane of the owning face:
    /// the plane contains this edge and is perpendicular to the face, with
    /// normal `face.normal × dir` and offset `face_dist`.
    pub face_dist: Real,
    /// The opposite half-edge, per patch. Entries are stored only where the
    /// answer differs from the leaf-level twin.
    pub(crate) twins: SmallVec<[PatchRef; 2]>,
}

impl HalfEdge {
    /// The twin of this half-edge at the leaf (source surface) level, if any.
    #[inline]
    pub fn leaf_twin(&self) -> u32 {
        self.twins
            .iter()
            .find(|t| t.patch == PATCH_LEAF)
            .map(|t| t.edge)
            .unwrap_or(INVALID)
    }
}

/// The classification of a face with respect to the source surface.
///
/// The classification governs whether a query may stop at a feature of this
/// face or must recurse into finer hierarchy patches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum FaceClass {
    /// This exact triangle is part of the source surface.
    Original,
    /// A synthetic face sealing a convex piece, fully enclosed by the
    /// surface.
    Contained,
    /// A synthetic convex-hull face introduced by the hierarchy builder.
    Free,
}

/// A triangular face of the mesh.
#[derive(Clone, Debug)]
pub struct Face {
    /// One of the three half-edges of this face.
    pub edge: u32,
    /// The outward unit normal.
    pub normal: UnitVector<Real>,
    /// The signed plane offset: a point `p` lies on the face plane iff
    /// `normal · p == offset`.
    pub offset: Real,
    /// Classification with respect to the source surface.
    pub class: FaceClass,
}

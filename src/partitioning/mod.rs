//! The bounding-volume hierarchy of convex patches.

pub use self::convex_hull::convex_hull;
pub use self::direction_table::DirectionTable;
pub use self::split::SplitStrategy;

pub(crate) use self::builder::{build_hierarchy, HierarchySettings};

use crate::math::{Point, Real};

mod builder;
mod convex_hull;
mod direction_table;
mod split;

/// A node of the bounding-volume hierarchy: a convex patch of the surface.
///
/// The faces of a node (owned and borrowed together) always form a closed
/// 2-manifold of their own, with twin links resolved per patch on the shared
/// half-edge arenas of the mesh.
#[derive(Clone, Debug)]
pub struct Bv {
    /// The faces owned by this node: for a leaf, the faces of its convex
    /// piece plus the synthetic faces sealing its boundary; for an internal
    /// node, the synthetic hull faces of its cap.
    pub faces: Vec<u32>,
    /// Faces borrowed from elsewhere: source-surface faces that coincide
    /// with triangles of this node's convex cap.
    pub other_faces: Vec<u32>,
    /// The center of mass of the patch.
    pub com: Point<Real>,
    /// The radius of the smallest sphere centered at `com` enclosing the
    /// patch.
    pub radius: Real,
    /// The depth of this node, the root being at level 0.
    pub level: u8,
    /// The parent node id, or `INVALID` for the root.
    pub parent: u32,
    /// The child node ids; internal nodes always have exactly two children.
    pub children: Option<[u32; 2]>,
    /// Quantized direction → starting vertex table used to seed the
    /// closest-feature walk on this patch.
    pub(crate) lookup: DirectionTable,
}

impl Bv {
    /// Is this node a leaf of the hierarchy?
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

use super::Pair;
use crate::bounding_volume::Aabb;
use crate::math::{Isometry, Real, Vector};
use crate::mesh::{Mesh, MeshFlags};
use std::sync::Arc;

/// How the broad-phase box of an object is obtained when it moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum BoxSetting {
    /// Let the scene pick a setting (currently the dynamically recomputed
    /// box).
    #[default]
    Choose,
    /// Recompute a tight box from the rotated local AABB on every update.
    Dynamic,
    /// Use the rotation-invariant box enclosing the bounding sphere; loose
    /// but cheaper to maintain for objects that mostly rotate.
    Fixed,
}

/// Per-object construction options.
#[derive(Copy, Clone, Debug, Default)]
pub struct ObjectOptions {
    /// A fixed object never participates as the moving side of a broad-phase
    /// update; its box is written once at insertion (and on explicit
    /// transform changes).
    pub fixed: bool,
    /// The broad-phase box maintenance policy.
    pub box_setting: BoxSetting,
    /// Flags forwarded to the half-edge mesh builder.
    pub mesh_flags: MeshFlags,
}

/// One collision object: a shared mesh, a rigid transform, and the pair
/// records toward every lower registry slot.
pub(crate) struct Object {
    pub mesh: Arc<Mesh>,
    pub position: Isometry<Real>,
    pub fixed: bool,
    pub box_setting: BoxSetting,
    /// Set when the transform changed since the last broad-phase refresh.
    pub dirty: bool,
    /// The current world-space box.
    pub aabb: Aabb,
    /// Positions of this object's endpoints in the per-axis sorted arrays,
    /// `endpoints[axis][0]` for the min endpoint and `[1]` for the max.
    pub endpoints: [[u32; 2]; 3],
    /// Pairs to every object of smaller slot index; `pairs[t]` pairs this
    /// object with the object at slot `t`.
    pub pairs: Vec<Pair>,
}

impl Object {
    pub(crate) fn compute_aabb(&self) -> Aabb {
        match self.box_setting {
            BoxSetting::Fixed => {
                let center = self.position * self.mesh.com();
                Aabb::from_half_extents(center, Vector::repeat(self.mesh.radius()))
            }
            BoxSetting::Dynamic | BoxSetting::Choose => {
                self.mesh.local_aabb().transform_by(&self.position)
            }
        }
    }
}

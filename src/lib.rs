/*!
riposte3d
=========

**riposte3d** is a 3-dimensional collision detection library written with
the rust programming language. It answers intersection, distance, tolerance
and contact queries between convex polyhedra (and non-convex polyhedra
decomposed into convex pieces) by walking closest feature pairs over a
half-edge mesh augmented with a bounding-volume hierarchy of convex patches.

*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)] // Maybe revisit this one later.
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)] // This usually makes it way more verbose that it could be.
#![allow(clippy::type_complexity)] // Complains about closures that are fairly simple.

#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;
#[macro_use]
extern crate approx;
extern crate num_traits as num;

pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod mesh;
pub mod partitioning;
pub mod query;
pub mod scene;
pub mod utils;

/// Aliases for mathematical types.
pub mod math {
    pub use na::{Isometry3, Matrix3, Point3, Translation3, UnitQuaternion, UnitVector3, Vector3};

    /// The scalar type used throughout this crate.
    pub type Real = f64;

    /// The default tolerance used for geometric operations.
    pub const DEFAULT_EPSILON: Real = Real::EPSILON;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The vector type.
    pub use Vector3 as Vector;

    /// A unit vector.
    pub use UnitVector3 as UnitVector;

    /// The matrix type.
    pub use Matrix3 as Matrix;

    /// The rigid transformation type.
    pub use Isometry3 as Isometry;

    /// The rotation type.
    pub use UnitQuaternion as Rotation;

    /// The translation type.
    pub use Translation3 as Translation;
}

pub use crate::mesh::{FaceClass, Mesh, MeshBuilderError, MeshFlags, TopologyError};
pub use crate::partitioning::SplitStrategy;
pub use crate::query::{Contact, FeatureId};
pub use crate::scene::{
    BoundaryPolicy, BoxSetting, DistanceResult, ObjectId, ObjectOptions, PairContacts, Scene,
    SceneError, SceneSettings,
};

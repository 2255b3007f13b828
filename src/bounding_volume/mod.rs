//! Bounding volumes.

pub use self::aabb::Aabb;
pub use self::bounding_sphere_utils::{
    point_cloud_bounding_sphere, point_cloud_bounding_sphere_with_center,
};

mod aabb;
mod bounding_sphere_utils;

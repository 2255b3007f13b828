use super::FeatureId;
use crate::math::{Point, Real, UnitVector};
use std::mem;

/// Geometric description of a contact.
#[derive(Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Contact {
    /// Position of the contact on the first object, expressed in world space.
    pub point1: Point<Real>,

    /// Position of the contact on the second object, expressed in world space.
    pub point2: Point<Real>,

    /// Contact normal, expressed in world space.
    ///
    /// This is an outward normal, i.e., it points towards the exterior of the
    /// first object.
    pub normal1: UnitVector<Real>,

    /// Contact normal, expressed in world space.
    ///
    /// This is an outward normal, i.e., it points towards the exterior of the
    /// second object.
    pub normal2: UnitVector<Real>,

    /// Distance between the two contact points.
    ///
    /// If this is negative, this contact represents a penetration.
    pub dist: Real,

    /// The contact feature on the first object.
    pub feature1: FeatureId,

    /// The contact feature on the second object.
    pub feature2: FeatureId,
}

impl Contact {
    /// Creates a new contact.
    #[inline]
    pub fn new(
        point1: Point<Real>,
        point2: Point<Real>,
        normal1: UnitVector<Real>,
        normal2: UnitVector<Real>,
        dist: Real,
        feature1: FeatureId,
        feature2: FeatureId,
    ) -> Self {
        Contact {
            point1,
            point2,
            normal1,
            normal2,
            dist,
            feature1,
            feature2,
        }
    }

    /// Swaps the points, normals and features of this contact.
    #[inline]
    pub fn flip(&mut self) {
        mem::swap(&mut self.point1, &mut self.point2);
        mem::swap(&mut self.normal1, &mut self.normal2);
        mem::swap(&mut self.feature1, &mut self.feature2);
    }

    /// Returns a new contact containing the swapped points, normals and
    /// features of `self`.
    #[inline]
    pub fn flipped(mut self) -> Self {
        self.flip();
        self
    }
}

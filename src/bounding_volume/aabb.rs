//! Axis Aligned Bounding Box.

use crate::math::{Isometry, Point, Real, Vector, DIM};
use num::Bounded;

/// An Axis-Aligned Bounding Box.
///
/// Defined by its minimum and maximum corners; its edges are always parallel
/// to the coordinate axes. This is the bounding volume consumed by the
/// sweep-and-prune broad phase.
#[derive(Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// The minimum coordinates of this AABB.
    pub mins: Point<Real>,
    /// The maximum coordinates of this AABB.
    pub maxs: Point<Real>,
}

impl Aabb {
    /// Creates a new AABB.
    ///
    /// `mins` must be componentwise smaller than `maxs`.
    #[inline]
    pub fn new(mins: Point<Real>, maxs: Point<Real>) -> Aabb {
        Aabb { mins, maxs }
    }

    /// Creates an invalid AABB with `mins` components set to `Real::max_value()` and
    /// `maxs` components set to `-Real::max_value()`.
    ///
    /// This is often used as the initial values of some AABB merging algorithms.
    #[inline]
    pub fn new_invalid() -> Self {
        Self::new(
            Vector::repeat(Real::max_value()).into(),
            Vector::repeat(-Real::max_value()).into(),
        )
    }

    /// Creates a new AABB from its center and its half-extents.
    #[inline]
    pub fn from_half_extents(center: Point<Real>, half_extents: Vector<Real>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Creates a new AABB from a set of points.
    pub fn from_points<'a, I>(pts: I) -> Self
    where
        I: IntoIterator<Item = &'a Point<Real>>,
    {
        let mut result = Aabb::new_invalid();

        for pt in pts {
            result.take_point(*pt);
        }

        result
    }

    /// The center of this AABB.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        na::center(&self.mins, &self.maxs)
    }

    /// The half extents of this AABB.
    #[inline]
    pub fn half_extents(&self) -> Vector<Real> {
        let half: Real = 0.5;
        (self.maxs - self.mins) * half
    }

    /// The extents of this AABB.
    #[inline]
    pub fn extents(&self) -> Vector<Real> {
        self.maxs - self.mins
    }

    /// Enlarges this AABB so it also contains the point `pt`.
    #[inline]
    pub fn take_point(&mut self, pt: Point<Real>) {
        self.mins = self.mins.coords.inf(&pt.coords).into();
        self.maxs = self.maxs.coords.sup(&pt.coords).into();
    }

    /// Computes the AABB bounding `self` transformed by `m`.
    ///
    /// This does not require iterating through the contained geometry: the
    /// result is the tight AABB of the rotated box.
    #[inline]
    pub fn transform_by(&self, m: &Isometry<Real>) -> Self {
        let ls_center = self.center();
        let center = m * ls_center;
        let ws_half_extents = m.rotation.to_rotation_matrix().into_inner().abs() * self.half_extents();

        Aabb::from_half_extents(center, ws_half_extents)
    }

    /// Enlarges this AABB by `amount` on every side.
    #[inline]
    pub fn loosened(&self, amount: Real) -> Aabb {
        Aabb {
            mins: self.mins - Vector::repeat(amount),
            maxs: self.maxs + Vector::repeat(amount),
        }
    }

    /// The smallest AABB containing both `self` and `other`.
    #[inline]
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: self.mins.coords.inf(&other.mins.coords).into(),
            maxs: self.maxs.coords.sup(&other.maxs.coords).into(),
        }
    }

    /// Checks whether this AABB intersects `other`, with touching boxes counted
    /// as intersecting.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        for i in 0..DIM {
            if self.mins[i] > other.maxs[i] || other.mins[i] > self.maxs[i] {
                return false;
            }
        }

        true
    }

    /// Checks whether the intervals `[self.mins[axis], self.maxs[axis]]` and
    /// `[other.mins[axis], other.maxs[axis]]` overlap, with touching intervals
    /// counted as overlapping.
    #[inline]
    pub fn overlaps_on_axis(&self, other: &Aabb, axis: usize) -> bool {
        self.mins[axis] <= other.maxs[axis] && other.mins[axis] <= self.maxs[axis]
    }
}

#[cfg(test)]
mod test {
    use super::Aabb;
    use crate::math::{Isometry, Point, Vector};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn aabb_from_points() {
        let aabb = Aabb::from_points(&[
            Point::new(1.0, 2.0, 3.0),
            Point::new(-1.0, 4.0, 2.0),
            Point::new(0.0, 0.0, 5.0),
        ]);
        assert_eq!(aabb.mins, Point::new(-1.0, 0.0, 2.0));
        assert_eq!(aabb.maxs, Point::new(1.0, 4.0, 5.0));
    }

    #[test]
    fn aabb_transform_by_keeps_rotated_extents() {
        let aabb = Aabb::new(Point::new(-1.0, -2.0, -3.0), Point::new(1.0, 2.0, 3.0));
        let m = Isometry::rotation(Vector::z() * FRAC_PI_2);
        let transformed = aabb.transform_by(&m);

        assert_relative_eq!(transformed.mins, Point::new(-2.0, -1.0, -3.0), epsilon = 1.0e-9);
        assert_relative_eq!(transformed.maxs, Point::new(2.0, 1.0, 3.0), epsilon = 1.0e-9);
    }

    #[test]
    fn aabb_intersects_touching() {
        let a = Aabb::new(Point::origin(), Point::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point::new(1.0, 0.0, 0.0), Point::new(2.0, 1.0, 1.0));
        let c = Aabb::new(Point::new(1.1, 0.0, 0.0), Point::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}

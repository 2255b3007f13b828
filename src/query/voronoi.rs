//! Voronoi-plane predicates and segment clipping for the closest-feature
//! walk.
//!
//! A Voronoi plane separates the regions of space closest to two adjacent
//! features of a convex patch. The walk clips candidate features against
//! sets of such planes; the neighbor feature owning each violated plane is
//! the next candidate to step to.

use super::walk::Feature;
use crate::math::{Point, Real, Vector};
use smallvec::SmallVec;

/// A plane in `n · x >= offset` half-space form. The normal is not
/// necessarily unit-length: only signs and ratios of distances to the same
/// plane are ever used.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Plane {
    pub normal: Vector<Real>,
    pub offset: Real,
}

impl Plane {
    /// The plane through `point` with the given normal.
    #[inline]
    pub fn new(normal: Vector<Real>, point: &Point<Real>) -> Self {
        Plane {
            normal,
            offset: normal.dot(&point.coords),
        }
    }

    /// Signed distance (up to the normal's scale) from `pt` to this plane,
    /// positive inside the half-space.
    #[inline]
    pub fn dist(&self, pt: &Point<Real>) -> Real {
        self.normal.dot(&pt.coords) - self.offset
    }
}

/// The result of clipping a segment against a set of Voronoi half-spaces.
#[derive(Clone, Debug)]
pub(crate) struct ClipResult {
    /// Parameter of the clipped sub-segment start, in `[0, 1]`.
    pub lmin: Real,
    /// Parameter of the clipped sub-segment end.
    pub lmax: Real,
    /// The feature owning the plane that bounded `lmin`, if any.
    pub nmin: Option<Feature>,
    /// The feature owning the plane that bounded `lmax`, if any.
    pub nmax: Option<Feature>,
    /// When the whole segment lies outside a single half-space, the feature
    /// owning that half-space.
    pub excluded: Option<Feature>,
    /// The segment was excluded by the combination of two half-spaces
    /// (`lmin > lmax`); a derivative check must arbitrate between `nmin`
    /// and `nmax`.
    pub compound: bool,
}

/// Clips the segment `tail → head` against a set of half-spaces, tracking
/// which plane bounds each end of the surviving sub-segment.
pub(crate) fn clip_edge(
    tail: &Point<Real>,
    head: &Point<Real>,
    planes: &[(Plane, Feature)],
) -> ClipResult {
    let mut result = ClipResult {
        lmin: 0.0,
        lmax: 1.0,
        nmin: None,
        nmax: None,
        excluded: None,
        compound: false,
    };

    for (plane, owner) in planes {
        let dt = plane.dist(tail);
        let dh = plane.dist(head);

        if dt < 0.0 && dh < 0.0 {
            result.excluded = Some(*owner);
            return result;
        }

        if dt < 0.0 {
            let l = dt / (dt - dh);
            if l > result.lmin {
                result.lmin = l;
                result.nmin = Some(*owner);
            }
        } else if dh < 0.0 {
            let l = dt / (dt - dh);
            if l < result.lmax {
                result.lmax = l;
                result.nmax = Some(*owner);
            }
        }
    }

    if result.lmin > result.lmax {
        result.compound = true;
    }

    result
}

/// A `SmallVec` sized for the plane sets used by the walk (three prism
/// planes, or the cone of a low-valence vertex).
pub(crate) type PlaneSet = SmallVec<[(Plane, Feature); 8]>;

#[cfg(test)]
mod test {
    use super::{clip_edge, Plane};
    use crate::query::walk::Feature;
    use crate::math::{Point, Vector};

    #[test]
    fn clip_keeps_interior_segment_untouched() {
        let planes = [(
            Plane::new(Vector::x(), &Point::origin()),
            Feature::Vertex(0),
        )];
        let res = clip_edge(
            &Point::new(1.0, 0.0, 0.0),
            &Point::new(2.0, 1.0, 0.0),
            &planes,
        );
        assert_eq!(res.lmin, 0.0);
        assert_eq!(res.lmax, 1.0);
        assert!(res.nmin.is_none() && res.nmax.is_none() && res.excluded.is_none());
    }

    #[test]
    fn clip_reports_simple_exclusion() {
        let planes = [(
            Plane::new(Vector::x(), &Point::origin()),
            Feature::Vertex(7),
        )];
        let res = clip_edge(
            &Point::new(-2.0, 0.0, 0.0),
            &Point::new(-1.0, 1.0, 0.0),
            &planes,
        );
        assert_eq!(res.excluded, Some(Feature::Vertex(7)));
    }

    #[test]
    fn clip_tracks_boundary_owners() {
        let planes = [
            (Plane::new(Vector::x(), &Point::origin()), Feature::Vertex(1)),
            (
                Plane::new(-Vector::x(), &Point::new(1.0, 0.0, 0.0)),
                Feature::Vertex(2),
            ),
        ];
        // Segment from x = -1 to x = 2 against the slab 0 <= x <= 1.
        let res = clip_edge(
            &Point::new(-1.0, 0.0, 0.0),
            &Point::new(2.0, 0.0, 0.0),
            &planes,
        );
        assert!(!res.compound);
        assert_relative_eq!(res.lmin, 1.0 / 3.0);
        assert_relative_eq!(res.lmax, 2.0 / 3.0);
        assert_eq!(res.nmin, Some(Feature::Vertex(1)));
        assert_eq!(res.nmax, Some(Feature::Vertex(2)));
    }

    #[test]
    fn clip_flags_compound_exclusion() {
        // Two disjoint half-spaces: x >= 2 and x <= -2, segment within (-1, 1).
        let planes = [
            (
                Plane::new(Vector::x(), &Point::new(2.0, 0.0, 0.0)),
                Feature::Vertex(1),
            ),
            (
                Plane::new(-Vector::x(), &Point::new(-2.0, 0.0, 0.0)),
                Feature::Vertex(2),
            ),
        ];
        let res = clip_edge(
            &Point::new(-3.0, 0.0, 0.0),
            &Point::new(3.0, 0.0, 0.0),
            &planes,
        );
        assert!(res.compound);
    }
}

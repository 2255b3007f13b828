//! Low-level closest-point computations between segments and triangles.

use crate::math::{Point, Real, DEFAULT_EPSILON};

/// Closest points between two segments, as the parameters of the closest
/// points along each segment.
///
/// Inspired by RealField-time collision detection by Christer Ericson.
pub(crate) fn closest_points_segment_segment(
    p1: &Point<Real>,
    q1: &Point<Real>,
    p2: &Point<Real>,
    q2: &Point<Real>,
) -> (Real, Real) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;

    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let mut s;
    let mut t;

    let _eps = DEFAULT_EPSILON;
    if a <= _eps && e <= _eps {
        s = 0.0;
        t = 0.0;
    } else if a <= _eps {
        s = 0.0;
        t = na::clamp(f / e, 0.0, 1.0);
    } else {
        let c = d1.dot(&r);
        if e <= _eps {
            t = 0.0;
            s = na::clamp(-c / a, 0.0, 1.0);
        } else {
            let b = d1.dot(&d2);
            let ae = a * e;
            let bb = b * b;
            let denom = ae - bb;

            // Use absolute and ulps error to test collinearity.
            if denom > _eps && !ulps_eq!(ae, bb) {
                s = na::clamp((b * f - c * e) / denom, 0.0, 1.0);
            } else {
                s = 0.0;
            }

            t = (b * s + f) / e;

            if t < 0.0 {
                t = 0.0;
                s = na::clamp(-c / a, 0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = na::clamp((b - c) / a, 0.0, 1.0);
            }
        }
    }

    (s, t)
}

/// The point of the triangle `(a, b, c)` closest to `p`.
pub(crate) fn closest_point_triangle(
    p: &Point<Real>,
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
) -> Point<Real> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return *a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return *a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return *b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    *a + ab * v + ac * w
}

/// Does the segment `(p, q)` cross the interior of the triangle `(a, b, c)`?
pub(crate) fn segment_triangle_intersects(
    p: &Point<Real>,
    q: &Point<Real>,
    a: &Point<Real>,
    b: &Point<Real>,
    c: &Point<Real>,
) -> bool {
    let orient = |x: &Point<Real>, y: &Point<Real>, z: &Point<Real>, w: &Point<Real>| -> Real {
        (y - x).cross(&(z - x)).dot(&(w - x))
    };

    let dp = orient(a, b, c, p);
    let dq = orient(a, b, c, q);
    if dp * dq >= 0.0 {
        return false;
    }

    let s1 = orient(p, q, a, b);
    let s2 = orient(p, q, b, c);
    let s3 = orient(p, q, c, a);
    (s1 > 0.0 && s2 > 0.0 && s3 > 0.0) || (s1 < 0.0 && s2 < 0.0 && s3 < 0.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point;

    #[test]
    fn segment_segment_orthogonal_gap() {
        let (s, t) = closest_points_segment_segment(
            &Point::new(-1.0, 0.0, 0.0),
            &Point::new(1.0, 0.0, 0.0),
            &Point::new(0.0, 1.0, -1.0),
            &Point::new(0.0, 1.0, 1.0),
        );
        assert_relative_eq!(s, 0.5);
        assert_relative_eq!(t, 0.5);
    }

    #[test]
    fn point_triangle_regions() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(2.0, 0.0, 0.0);
        let c = Point::new(0.0, 2.0, 0.0);

        // Above the interior: projects onto the plane.
        let cp = closest_point_triangle(&Point::new(0.5, 0.5, 3.0), &a, &b, &c);
        assert_relative_eq!(cp, Point::new(0.5, 0.5, 0.0));

        // Beyond vertex a.
        let cp = closest_point_triangle(&Point::new(-1.0, -1.0, 0.0), &a, &b, &c);
        assert_relative_eq!(cp, a);

        // Beyond the edge ab.
        let cp = closest_point_triangle(&Point::new(1.0, -2.0, 0.5), &a, &b, &c);
        assert_relative_eq!(cp, Point::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn segment_pierces_triangle() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(2.0, 0.0, 0.0);
        let c = Point::new(0.0, 2.0, 0.0);

        assert!(segment_triangle_intersects(
            &Point::new(0.5, 0.5, -1.0),
            &Point::new(0.5, 0.5, 1.0),
            &a,
            &b,
            &c
        ));
        assert!(!segment_triangle_intersects(
            &Point::new(3.0, 3.0, -1.0),
            &Point::new(3.0, 3.0, 1.0),
            &a,
            &b,
            &c
        ));
    }
}

use crate::math::{Point, Real, Vector};
use std::collections::HashMap;

/// Relative tolerance used to decide whether a point lies outside a facet
/// plane.
const EPS_REL: Real = 1.0e-9;

#[derive(Clone, Debug)]
struct Facet {
    pts: [u32; 3],
    normal: Vector<Real>,
    offset: Real,
    outside: Vec<u32>,
    valid: bool,
}

impl Facet {
    fn new(pts: [u32; 3], points: &[Point<Real>]) -> Self {
        let a = points[pts[0] as usize];
        let b = points[pts[1] as usize];
        let c = points[pts[2] as usize];
        let mut normal = (b - a).cross(&(c - a));
        let norm = normal.norm();
        if norm > Real::EPSILON {
            normal /= norm;
        }
        let offset = normal.dot(&a.coords);
        Facet {
            pts,
            normal,
            offset,
            outside: Vec::new(),
            valid: true,
        }
    }

    #[inline]
    fn dist(&self, pt: &Point<Real>) -> Real {
        self.normal.dot(&pt.coords) - self.offset
    }
}

/// Computes the convex hull of a set of 3d points.
///
/// Returns the hull triangles as indices into `points`, wound counter-clockwise
/// seen from the outside. Returns `None` if the input is degenerate (fewer
/// than four affinely independent points).
pub fn convex_hull(points: &[Point<Real>]) -> Option<Vec<[u32; 3]>> {
    if points.len() < 4 {
        return None;
    }

    let mut extent: Real = 0.0;
    for pt in points {
        extent = extent.max(pt.coords.amax());
    }
    let eps = EPS_REL * extent.max(1.0);

    let simplex = initial_simplex(points, eps)?;
    let mut facets = vec![
        Facet::new([simplex[0], simplex[1], simplex[2]], points),
        Facet::new([simplex[1], simplex[0], simplex[3]], points),
        Facet::new([simplex[2], simplex[1], simplex[3]], points),
        Facet::new([simplex[0], simplex[2], simplex[3]], points),
    ];

    let mut adjacency: HashMap<(u32, u32), u32> = HashMap::new();
    for (fid, facet) in facets.iter().enumerate() {
        for k in 0..3 {
            let _ = adjacency.insert((facet.pts[k], facet.pts[(k + 1) % 3]), fid as u32);
        }
    }

    // Initial conflict lists.
    for pid in 0..points.len() as u32 {
        if simplex.contains(&pid) {
            continue;
        }
        for facet in facets.iter_mut() {
            if facet.dist(&points[pid as usize]) > eps {
                facet.outside.push(pid);
                break;
            }
        }
    }

    let mut pending: Vec<u32> = (0..facets.len() as u32).collect();
    // Numerical safety net: the expansion cannot legitimately run more
    // rounds than there are input points.
    let mut budget = points.len() * 4;

    while let Some(fid) = pending.pop() {
        if !facets[fid as usize].valid || facets[fid as usize].outside.is_empty() {
            continue;
        }
        if budget == 0 {
            log::warn!("convex hull expansion budget exhausted; returning partial hull");
            break;
        }
        budget -= 1;

        // The point of the conflict list farthest from the facet.
        let apex = *facets[fid as usize]
            .outside
            .iter()
            .max_by(|i, j| {
                let di = facets[fid as usize].dist(&points[**i as usize]);
                let dj = facets[fid as usize].dist(&points[**j as usize]);
                di.partial_cmp(&dj).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap();
        let apex_pt = points[apex as usize];

        // Flood the set of facets visible from the apex.
        let mut visible = vec![fid];
        let mut stack = vec![fid];
        let mut seen = vec![false; facets.len()];
        seen[fid as usize] = true;
        while let Some(v) = stack.pop() {
            let pts = facets[v as usize].pts;
            for k in 0..3 {
                if let Some(&n) = adjacency.get(&(pts[(k + 1) % 3], pts[k])) {
                    if !seen[n as usize]
                        && facets[n as usize].valid
                        && facets[n as usize].dist(&apex_pt) > eps
                    {
                        seen[n as usize] = true;
                        visible.push(n);
                        stack.push(n);
                    }
                }
            }
        }

        // Horizon: directed edges of visible facets whose neighbor stays.
        let mut horizon = Vec::new();
        for &v in &visible {
            let pts = facets[v as usize].pts;
            for k in 0..3 {
                let (a, b) = (pts[k], pts[(k + 1) % 3]);
                let beyond = adjacency
                    .get(&(b, a))
                    .map(|n| seen[*n as usize])
                    .unwrap_or(false);
                if !beyond {
                    horizon.push((a, b));
                }
            }
        }

        // Retire the visible facets, collect their orphaned conflict points.
        let mut orphans = Vec::new();
        for &v in &visible {
            let facet = &mut facets[v as usize];
            facet.valid = false;
            orphans.append(&mut facet.outside);
            for k in 0..3 {
                let _ = adjacency.remove(&(facet.pts[k], facet.pts[(k + 1) % 3]));
            }
        }

        // One new facet per horizon edge, fanned from the apex.
        for (a, b) in horizon {
            let nid = facets.len() as u32;
            let facet = Facet::new([a, b, apex], points);
            for k in 0..3 {
                let _ = adjacency.insert((facet.pts[k], facet.pts[(k + 1) % 3]), nid);
            }
            facets.push(facet);
            pending.push(nid);
        }

        for pid in orphans {
            if pid == apex {
                continue;
            }
            for facet in facets.iter_mut() {
                if facet.valid && facet.dist(&points[pid as usize]) > eps {
                    facet.outside.push(pid);
                    break;
                }
            }
        }
    }

    Some(
        facets
            .into_iter()
            .filter(|f| f.valid)
            .map(|f| f.pts)
            .collect(),
    )
}

/// Picks four affinely independent points and orients them so every facet of
/// the resulting tetrahedron faces outward.
fn initial_simplex(points: &[Point<Real>], eps: Real) -> Option<[u32; 4]> {
    let i0 = 0u32;
    let p0 = points[0];

    let mut i1 = i0;
    let mut best: Real = 0.0;
    for (i, pt) in points.iter().enumerate() {
        let d = na::distance_squared(&p0, pt);
        if d > best {
            best = d;
            i1 = i as u32;
        }
    }
    if best.sqrt() <= eps {
        return None;
    }

    let axis = (points[i1 as usize] - p0).normalize();
    let mut i2 = i0;
    best = 0.0;
    for (i, pt) in points.iter().enumerate() {
        let off = *pt - p0;
        let d = (off - axis * axis.dot(&off)).norm_squared();
        if d > best {
            best = d;
            i2 = i as u32;
        }
    }
    if best.sqrt() <= eps {
        return None;
    }

    let normal = (points[i1 as usize] - p0).cross(&(points[i2 as usize] - p0));
    let normal = normal.normalize();
    let plane_offset = normal.dot(&p0.coords);
    let mut i3 = i0;
    best = 0.0;
    for (i, pt) in points.iter().enumerate() {
        let d = (normal.dot(&pt.coords) - plane_offset).abs();
        if d > best {
            best = d;
            i3 = i as u32;
        }
    }
    if best <= eps {
        return None;
    }

    // Re-wind so the apex lies below the base plane.
    let (i1, i2) = if normal.dot(&points[i3 as usize].coords) - plane_offset > 0.0 {
        (i2, i1)
    } else {
        (i1, i2)
    };

    Some([i0, i1, i2, i3])
}

#[cfg(test)]
mod test {
    use super::convex_hull;
    use crate::math::Point;

    #[test]
    fn hull_of_a_cube_with_an_interior_point() {
        let mut pts = Vec::new();
        for &x in &[-1.0, 1.0] {
            for &y in &[-1.0, 1.0] {
                for &z in &[-1.0, 1.0] {
                    pts.push(Point::new(x, y, z));
                }
            }
        }
        pts.push(Point::origin());

        let hull = convex_hull(&pts).unwrap();
        assert_eq!(hull.len(), 12);
        // The interior point must not appear on the hull.
        assert!(hull.iter().all(|tri| !tri.contains(&(8u32))));
        // Every facet normal points away from the origin.
        for tri in &hull {
            let a = pts[tri[0] as usize];
            let b = pts[tri[1] as usize];
            let c = pts[tri[2] as usize];
            let n = (b - a).cross(&(c - a));
            assert!(n.dot(&a.coords) > 0.0);
        }
    }

    #[test]
    fn hull_of_coplanar_points_is_rejected() {
        let pts = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
        ];
        assert!(convex_hull(&pts).is_none());
    }

    #[test]
    fn hull_of_a_tetrahedron_is_itself() {
        let pts = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
        ];
        let hull = convex_hull(&pts).unwrap();
        assert_eq!(hull.len(), 4);
    }
}

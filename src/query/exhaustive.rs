//! Deterministic exhaustive narrow-phase fallback.
//!
//! When the walk cannot converge (pathologically degenerate geometry), the
//! pair is resolved by a full scan over the two patches' features. This is
//! quadratic but bounded, and doubles as the oracle used by randomized
//! tests.

use super::closest_points::{
    closest_point_triangle, closest_points_segment_segment, segment_triangle_intersects,
};
use super::walk::{Feature, WalkOutcome};
use crate::math::{Isometry, Point, Real, Vector};
use crate::mesh::Mesh;

struct PatchData {
    verts: Vec<(u32, Point<Real>)>,
    edges: Vec<(u32, Point<Real>, Point<Real>)>,
    faces: Vec<(u32, [Point<Real>; 3], Vector<Real>, Real)>,
}

fn gather(mesh: &Mesh, patch: u32) -> PatchData {
    let verts = mesh
        .patch_vertices(patch)
        .into_iter()
        .map(|v| (v, mesh.vertex_pos(v)))
        .collect();
    let edges = mesh
        .patch_edges(patch)
        .into_iter()
        .map(|e| {
            let (tail, head) = mesh.edge_endpoints(e);
            (e, tail, head)
        })
        .collect();
    let faces = mesh
        .patch_faces(patch)
        .map(|f| {
            let [a, b, c] = mesh.face_vertices(f);
            let pts = [
                mesh.vertex_pos(a),
                mesh.vertex_pos(b),
                mesh.vertex_pos(c),
            ];
            let (n, off) = mesh.face_plane(f);
            (f, pts, n.into_inner(), off)
        })
        .collect();

    PatchData {
        verts,
        edges,
        faces,
    }
}

/// Resolves a patch pair by scanning every feature combination.
pub(crate) fn exhaustive_query(
    mesh1: &Mesh,
    patch1: u32,
    mesh2: &Mesh,
    patch2: u32,
    pos12: &Isometry<Real>,
) -> WalkOutcome {
    let pos21 = pos12.inverse();
    let d1 = gather(mesh1, patch1);
    let d2 = gather(mesh2, patch2);

    // Vertex containment, both ways.
    for &(v, p) in &d1.verts {
        let x = pos21 * p;
        if let Some((f, depth, proj)) = containment(&x, &d2.faces) {
            return WalkOutcome::Penetration {
                depth,
                point1: p,
                point2: proj,
                feature1: Feature::Vertex(v),
                feature2: Feature::Face(f),
            };
        }
    }
    for &(v, p) in &d2.verts {
        let x = pos12 * p;
        if let Some((f, depth, proj)) = containment(&x, &d1.faces) {
            return WalkOutcome::Penetration {
                depth,
                point1: proj,
                point2: p,
                feature1: Feature::Face(f),
                feature2: Feature::Vertex(v),
            };
        }
    }

    // Edge-face piercing, both ways.
    for &(e, tail, head) in &d1.edges {
        let ta = pos21 * tail;
        let he = pos21 * head;
        for &(f, pts, n, off) in &d2.faces {
            if segment_triangle_intersects(&ta, &he, &pts[0], &pts[1], &pts[2]) {
                let dp = n.dot(&ta.coords) - off;
                let dq = n.dot(&he.coords) - off;
                let t = dp / (dp - dq);
                let pt = ta + (he - ta) * t;
                return WalkOutcome::Penetration {
                    depth: -(dp.min(dq)),
                    point1: pos12 * pt,
                    point2: pt,
                    feature1: Feature::Edge(e),
                    feature2: Feature::Face(f),
                };
            }
        }
    }
    for &(e, tail, head) in &d2.edges {
        let ta = pos12 * tail;
        let he = pos12 * head;
        for &(f, pts, n, off) in &d1.faces {
            if segment_triangle_intersects(&ta, &he, &pts[0], &pts[1], &pts[2]) {
                let dp = n.dot(&ta.coords) - off;
                let dq = n.dot(&he.coords) - off;
                let t = dp / (dp - dq);
                let pt = ta + (he - ta) * t;
                return WalkOutcome::Penetration {
                    depth: -(dp.min(dq)),
                    point1: pt,
                    point2: pos21 * pt,
                    feature1: Feature::Face(f),
                    feature2: Feature::Edge(e),
                };
            }
        }
    }

    // Disjoint: minimum over vertex-face and edge-edge pairs.
    let mut best_dist = Real::MAX;
    let mut best = None;

    for &(v, p) in &d1.verts {
        let x = pos21 * p;
        for &(f, pts, _, _) in &d2.faces {
            let cp = closest_point_triangle(&x, &pts[0], &pts[1], &pts[2]);
            let dist = na::distance(&x, &cp);
            if dist < best_dist {
                best_dist = dist;
                best = Some((p, cp, Feature::Vertex(v), Feature::Face(f)));
            }
        }
    }
    for &(v, p) in &d2.verts {
        let x = pos12 * p;
        for &(f, pts, _, _) in &d1.faces {
            let cp = closest_point_triangle(&x, &pts[0], &pts[1], &pts[2]);
            let dist = na::distance(&x, &cp);
            if dist < best_dist {
                best_dist = dist;
                best = Some((cp, p, Feature::Face(f), Feature::Vertex(v)));
            }
        }
    }
    for &(e1, tail1, head1) in &d1.edges {
        for &(e2, tail2, head2) in &d2.edges {
            let p2 = pos12 * tail2;
            let q2 = pos12 * head2;
            let (s, t) = closest_points_segment_segment(&tail1, &head1, &p2, &q2);
            let cp1 = tail1 + (head1 - tail1) * s;
            let cp2_in1 = p2 + (q2 - p2) * t;
            let dist = na::distance(&cp1, &cp2_in1);
            if dist < best_dist {
                best_dist = dist;
                let cp2 = tail2 + (head2 - tail2) * t;
                best = Some((cp1, cp2, Feature::Edge(e1), Feature::Edge(e2)));
            }
        }
    }

    let (point1, point2, feature1, feature2) =
        best.expect("exhaustive scan over an empty patch");
    WalkOutcome::Disjoint {
        distance: best_dist,
        point1,
        point2,
        feature1,
        feature2,
    }
}

/// If `x` lies behind every face plane, returns the least-deep face, the
/// penetration depth and the projection of `x` on that face's plane.
fn containment(
    x: &Point<Real>,
    faces: &[(u32, [Point<Real>; 3], Vector<Real>, Real)],
) -> Option<(u32, Real, Point<Real>)> {
    let mut best_d = Real::MIN;
    let mut best = None;

    for &(f, _, n, off) in faces {
        let d = n.dot(&x.coords) - off;
        if d > 0.0 {
            return None;
        }
        if d > best_d {
            best_d = d;
            best = Some((f, n));
        }
    }

    best.map(|(f, n)| (f, -best_d, x - n * best_d))
}

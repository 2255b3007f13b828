//! The closest-feature walk: a V-Clip style state machine stepping over
//! feature pairs of two convex patches until it proves the pair disjoint
//! (returning the closest features and their separation) or detects
//! interpenetration.

use super::closest_points::closest_points_segment_segment;
use super::exhaustive;
use super::voronoi::{clip_edge, Plane, PlaneSet};
use super::FeatureId;
use crate::math::{Isometry, Point, Real, Vector};
use crate::mesh::{Mesh, INVALID};

/// Absolute tolerance of the walk's geometric predicates.
pub(crate) const WALK_EPS: Real = 1.0e-10;

/// Hard bound on walk iterations before falling back to the exhaustive scan.
const MAX_ITERS: usize = 5_000;

/// Size of the visited-pair window used for cycle detection.
const CYCLE_WINDOW: usize = 200;

const MAX_JITTERS: usize = 4;
const MAX_RESEEDS: usize = 2;

const JITTER: Real = 1.0e-7;

/// The non-uniform scale perturbations applied to the second patch when a
/// cycle is detected, in escalation order.
const JITTERS: [[Real; 3]; MAX_JITTERS] = [
    [1.0 + JITTER, 1.0, 1.0],
    [1.0, 1.0 + JITTER, 1.0],
    [1.0, 1.0, 1.0 + JITTER],
    [1.0 + JITTER, 1.0 - JITTER, 1.0 + JITTER],
];

/// A feature of one of the two patches being walked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Feature {
    Vertex(u32),
    Edge(u32),
    Face(u32),
}

impl Feature {
    /// The public identifier of this feature.
    pub(crate) fn id(self) -> FeatureId {
        match self {
            Feature::Vertex(v) => FeatureId::Vertex(v),
            Feature::Edge(e) => FeatureId::Edge(e),
            Feature::Face(f) => FeatureId::Face(f),
        }
    }
}

/// The terminal answer of a walk over one pair of patches.
///
/// Points are expressed in the local frame of their respective mesh.
#[derive(Clone, Debug)]
pub(crate) enum WalkOutcome {
    /// The two patches are separated.
    Disjoint {
        distance: Real,
        point1: Point<Real>,
        point2: Point<Real>,
        feature1: Feature,
        feature2: Feature,
    },
    /// The two patches interpenetrate; the features witness the overlap.
    Penetration {
        depth: Real,
        point1: Point<Real>,
        point2: Point<Real>,
        feature1: Feature,
        feature2: Feature,
    },
}

impl WalkOutcome {
    pub(crate) fn features(&self) -> (Feature, Feature) {
        match self {
            WalkOutcome::Disjoint {
                feature1, feature2, ..
            }
            | WalkOutcome::Penetration {
                feature1, feature2, ..
            } => (*feature1, *feature2),
        }
    }
}

/// One transition of the state machine.
enum Step {
    /// Replace the feature of the given side.
    Set(usize, Feature),
    /// The walk terminated.
    Done(WalkOutcome),
}

/// Walks the closest feature pair of two convex patches.
///
/// `pos12` maps the local frame of `(mesh2, patch2)` into the local frame of
/// `(mesh1, patch1)`. `seed` resumes the walk from a cached feature pair
/// (temporal coherence); a direction-table seed is used otherwise. The
/// returned feature pair is the terminal state, suitable for caching.
pub(crate) fn closest_features(
    mesh1: &Mesh,
    patch1: u32,
    mesh2: &Mesh,
    patch2: u32,
    pos12: &Isometry<Real>,
    seed: Option<(Feature, Feature)>,
    rng_seed: u64,
) -> (WalkOutcome, (Feature, Feature)) {
    let mut walker = Walker {
        m: [mesh1, mesh2],
        patch: [patch1, patch2],
        to_other: [pos12.inverse(), *pos12],
        jitter: Vector::repeat(1.0),
    };

    let mut feats = match seed {
        Some((f1, f2)) if valid_feature(mesh1, f1) && valid_feature(mesh2, f2) => (f1, f2),
        _ => default_seed(&walker),
    };

    let mut ring: Vec<(Feature, Feature)> = Vec::with_capacity(CYCLE_WINDOW);
    let mut ring_head = 0usize;
    let mut jitters = 0usize;
    let mut reseeds = 0usize;
    let mut rng = oorandom::Rand64::new(rng_seed as u128);

    for _ in 0..MAX_ITERS {
        if ring.contains(&feats) {
            // The walk revisited a feature pair: degenerate configuration.
            if jitters < MAX_JITTERS {
                walker.jitter = Vector::from(JITTERS[jitters]);
                jitters += 1;
                ring.clear();
                ring_head = 0;
                log::debug!("closest-feature cycle detected, applying jitter {}", jitters);
                continue;
            } else if reseeds < MAX_RESEEDS {
                reseeds += 1;
                ring.clear();
                ring_head = 0;
                feats = random_seed(&walker, &mut rng);
                log::debug!("closest-feature cycle persists, reseeding the walk");
                continue;
            } else {
                log::warn!(
                    "closest-feature walk failed to converge, falling back to exhaustive scan"
                );
                let out = exhaustive::exhaustive_query(mesh1, patch1, mesh2, patch2, pos12);
                let fs = out.features();
                return (out, fs);
            }
        }

        if ring.len() < CYCLE_WINDOW {
            ring.push(feats);
        } else {
            ring[ring_head] = feats;
            ring_head = (ring_head + 1) % CYCLE_WINDOW;
        }

        let step = match feats {
            (Feature::Vertex(v1), Feature::Vertex(v2)) => walker.vv([v1, v2]),
            (Feature::Vertex(v), Feature::Edge(e)) => walker.ve(v, 0, e),
            (Feature::Edge(e), Feature::Vertex(v)) => walker.ve(v, 1, e),
            (Feature::Vertex(v), Feature::Face(f)) => walker.vf(v, 0, f),
            (Feature::Face(f), Feature::Vertex(v)) => walker.vf(v, 1, f),
            (Feature::Edge(e1), Feature::Edge(e2)) => walker.ee([e1, e2]),
            (Feature::Edge(e), Feature::Face(f)) => walker.ef(e, 0, f),
            (Feature::Face(f), Feature::Edge(e)) => walker.ef(e, 1, f),
            (Feature::Face(f1), _) => {
                // A face-face state never arises from the transitions above;
                // it can only come from a stale cache. Demote one side.
                Step::Set(0, Feature::Vertex(walker.m[0].face_vertices(f1)[0]))
            }
        };

        match step {
            Step::Set(0, f) => feats.0 = f,
            Step::Set(_, f) => feats.1 = f,
            Step::Done(out) => return (out, feats),
        }
    }

    log::warn!("closest-feature walk iteration budget exhausted, falling back to exhaustive scan");
    let out = exhaustive::exhaustive_query(mesh1, patch1, mesh2, patch2, pos12);
    let fs = out.features();
    (out, fs)
}

fn valid_feature(mesh: &Mesh, feat: Feature) -> bool {
    match feat {
        Feature::Vertex(v) => (v as usize) < mesh.vertices().len(),
        Feature::Edge(e) => (e as usize) < mesh.edges().len(),
        Feature::Face(f) => (f as usize) < mesh.faces().len(),
    }
}

/// Seeds both sides from their direction tables, using the direction between
/// the patch centers of mass.
fn default_seed(w: &Walker<'_>) -> (Feature, Feature) {
    let bv1 = &w.m[0].bvs()[w.patch[0] as usize];
    let bv2 = &w.m[1].bvs()[w.patch[1] as usize];

    let com2_in1 = w.to_other[1] * bv2.com;
    let com1_in2 = w.to_other[0] * bv1.com;

    let v1 = bv1.lookup.seed(&(com2_in1 - bv1.com));
    let v2 = bv2.lookup.seed(&(com1_in2 - bv2.com));
    (Feature::Vertex(v1), Feature::Vertex(v2))
}

fn random_seed(w: &Walker<'_>, rng: &mut oorandom::Rand64) -> (Feature, Feature) {
    let bv1 = &w.m[0].bvs()[w.patch[0] as usize];
    let bv2 = &w.m[1].bvs()[w.patch[1] as usize];
    let v1 = bv1.lookup.entry(rng.rand_u64() as usize);
    let v2 = bv2.lookup.entry(rng.rand_u64() as usize);
    (Feature::Vertex(v1), Feature::Vertex(v2))
}

/// The per-query scratch context of one walk: the two patches, the relative
/// transforms both ways and the active jitter. Every quantity the handlers
/// need flows through this struct, so concurrent queries on different pairs
/// are independent.
struct Walker<'a> {
    m: [&'a Mesh; 2],
    patch: [u32; 2],
    /// `to_other[s]` maps side-`s` local coordinates into the other side's
    /// local frame.
    to_other: [Isometry<Real>; 2],
    /// Componentwise scale applied to the second patch's vertices, used to
    /// break degenerate cycles.
    jitter: Vector<Real>,
}

impl Walker<'_> {
    #[inline]
    fn vpos(&self, s: usize, v: u32) -> Point<Real> {
        let p = self.m[s].vertex_pos(v);
        if s == 1 {
            Point::from(p.coords.component_mul(&self.jitter))
        } else {
            p
        }
    }

    #[inline]
    fn xform(&self, s: usize, p: &Point<Real>) -> Point<Real> {
        self.to_other[s] * p
    }

    #[inline]
    fn rot(&self, s: usize, v: &Vector<Real>) -> Vector<Real> {
        self.to_other[s] * v
    }

    #[inline]
    fn origin_of(&self, s: usize, e: u32) -> u32 {
        self.m[s].edges()[e as usize].origin
    }

    #[inline]
    fn head_of(&self, s: usize, e: u32) -> u32 {
        self.m[s].head(e)
    }

    #[inline]
    fn edge_tail(&self, s: usize, e: u32) -> Point<Real> {
        self.vpos(s, self.origin_of(s, e))
    }

    #[inline]
    fn edge_head(&self, s: usize, e: u32) -> Point<Real> {
        self.vpos(s, self.head_of(s, e))
    }

    #[inline]
    fn edge_dir(&self, s: usize, e: u32) -> Vector<Real> {
        self.m[s].edges()[e as usize].dir.into_inner()
    }

    #[inline]
    fn face_of_edge(&self, s: usize, e: u32) -> u32 {
        self.m[s].edges()[e as usize].face
    }

    #[inline]
    fn twin(&self, s: usize, e: u32) -> u32 {
        self.m[s].twin(e, self.patch[s])
    }

    #[inline]
    fn face_normal(&self, s: usize, f: u32) -> Vector<Real> {
        self.m[s].faces()[f as usize].normal.into_inner()
    }

    #[inline]
    fn face_pt(&self, s: usize, f: u32) -> Point<Real> {
        self.edge_tail(s, self.m[s].faces()[f as usize].edge)
    }

    fn disjoint(
        &self,
        s: usize,
        p_s: Point<Real>,
        f_s: Feature,
        p_o: Point<Real>,
        f_o: Feature,
        distance: Real,
    ) -> WalkOutcome {
        if s == 0 {
            WalkOutcome::Disjoint {
                distance,
                point1: p_s,
                point2: p_o,
                feature1: f_s,
                feature2: f_o,
            }
        } else {
            WalkOutcome::Disjoint {
                distance,
                point1: p_o,
                point2: p_s,
                feature1: f_o,
                feature2: f_s,
            }
        }
    }

    fn penetration(
        &self,
        s: usize,
        p_s: Point<Real>,
        f_s: Feature,
        p_o: Point<Real>,
        f_o: Feature,
        depth: Real,
    ) -> WalkOutcome {
        if s == 0 {
            WalkOutcome::Penetration {
                depth,
                point1: p_s,
                point2: p_o,
                feature1: f_s,
                feature2: f_o,
            }
        } else {
            WalkOutcome::Penetration {
                depth,
                point1: p_o,
                point2: p_s,
                feature1: f_o,
                feature2: f_s,
            }
        }
    }

    /// Vertex-vertex state: each vertex is tested against the Voronoi planes
    /// of the edges around the other.
    fn vv(&self, v: [u32; 2]) -> Step {
        for s in 0..2 {
            let o = 1 - s;
            let x = self.xform(o, &self.vpos(o, v[o]));
            let vs = self.vpos(s, v[s]);

            for e in self.m[s].edges_around(v[s], self.patch[s]) {
                let u = self.edge_dir(s, e);
                if u.dot(&(x - vs)) > WALK_EPS {
                    return Step::Set(s, Feature::Edge(e));
                }
            }
        }

        let x2 = self.xform(1, &self.vpos(1, v[1]));
        let p1 = self.vpos(0, v[0]);
        let distance = na::distance(&p1, &x2);
        Step::Done(self.disjoint(
            0,
            p1,
            Feature::Vertex(v[0]),
            self.vpos(1, v[1]),
            Feature::Vertex(v[1]),
            distance,
        ))
    }

    /// Vertex-edge state. `sv` is the side owning the vertex.
    fn ve(&self, v: u32, sv: usize, e: u32) -> Step {
        let se = 1 - sv;
        let x = self.xform(sv, &self.vpos(sv, v));
        let tail = self.edge_tail(se, e);
        let head = self.edge_head(se, e);
        let u_vec = head - tail;
        let len = u_vec.norm();
        if len <= WALK_EPS {
            return Step::Set(se, Feature::Vertex(self.origin_of(se, e)));
        }
        let u = u_vec / len;

        // Vertex planes of the edge.
        let t = u.dot(&(x - tail));
        if t < 0.0 {
            return Step::Set(se, Feature::Vertex(self.origin_of(se, e)));
        }
        if t > len {
            return Step::Set(se, Feature::Vertex(self.head_of(se, e)));
        }

        // Edge-face planes of the two adjacent faces.
        let lf = self.face_of_edge(se, e);
        let n_lf = self.face_normal(se, lf);
        if n_lf.cross(&u).dot(&(x - tail)) > WALK_EPS {
            return Step::Set(se, Feature::Face(lf));
        }
        let tw = self.twin(se, e);
        if tw != INVALID {
            let rf = self.face_of_edge(se, tw);
            let n_rf = self.face_normal(se, rf);
            if n_rf.cross(&(-u)).dot(&(x - tail)) > WALK_EPS {
                return Step::Set(se, Feature::Face(rf));
            }
        }

        // The vertex lies in the edge's region: clip the edge against the
        // cone of the vertex's incident edges.
        let vp = self.vpos(sv, v);
        let ta = self.xform(se, &tail);
        let he = self.xform(se, &head);
        let mut planes = PlaneSet::new();
        for ev in self.m[sv].edges_around(v, self.patch[sv]) {
            planes.push((
                Plane::new(-self.edge_dir(sv, ev), &vp),
                Feature::Edge(ev),
            ));
        }

        let clip = clip_edge(&ta, &he, &planes);
        if let Some(owner) = clip.excluded {
            return Step::Set(sv, owner);
        }

        let ed = he - ta;
        let deriv_at = |l: Real| -> Real {
            let pt = ta + ed * l;
            ed.dot(&(pt - vp))
        };

        if clip.compound {
            let owner = if deriv_at(clip.lmin) > 0.0 {
                clip.nmin
            } else {
                clip.nmax
            };
            if let Some(owner) = owner {
                return Step::Set(sv, owner);
            }
        }
        if let Some(n1) = clip.nmin {
            if deriv_at(clip.lmin) > WALK_EPS {
                return Step::Set(sv, n1);
            }
        }
        if let Some(n2) = clip.nmax {
            if deriv_at(clip.lmax) < -WALK_EPS {
                return Step::Set(sv, n2);
            }
        }

        // Settled: the closest points are the vertex and its projection on
        // the edge.
        let cp = tail + u * t;
        let distance = na::distance(&x, &cp);
        Step::Done(self.disjoint(
            sv,
            self.vpos(sv, v),
            Feature::Vertex(v),
            cp,
            Feature::Edge(e),
            distance,
        ))
    }

    /// Vertex-face state. `sv` is the side owning the vertex.
    fn vf(&self, v: u32, sv: usize, f: u32) -> Step {
        let sf = 1 - sv;
        let x = self.xform(sv, &self.vpos(sv, v));
        let n = self.face_normal(sf, f);

        // Edge planes of the face's Voronoi prism.
        for eb in self.m[sf].face_edges(f) {
            let tail_b = self.edge_tail(sf, eb);
            let inward = n.cross(&self.edge_dir(sf, eb));
            if inward.dot(&(x - tail_b)) < -WALK_EPS {
                return Step::Set(sf, Feature::Edge(eb));
            }
        }

        let fp = self.face_pt(sf, f);
        let d = n.dot(&(x - fp));

        if d > WALK_EPS {
            // Try to walk the vertex closer along one of its edges.
            for ev in self.m[sv].edges_around(v, self.patch[sv]) {
                let u_in_f = self.rot(sv, &self.edge_dir(sv, ev));
                if u_in_f.dot(&n) < -WALK_EPS {
                    return Step::Set(sv, Feature::Edge(ev));
                }
            }
            let cp = x - n * d;
            return Step::Done(self.disjoint(
                sv,
                self.vpos(sv, v),
                Feature::Vertex(v),
                cp,
                Feature::Face(f),
                d,
            ));
        }

        if d < -WALK_EPS {
            // The vertex is behind the face plane but inside its prism.
            for ev in self.m[sv].edges_around(v, self.patch[sv]) {
                let u_in_f = self.rot(sv, &self.edge_dir(sv, ev));
                if u_in_f.dot(&n) > WALK_EPS {
                    return Step::Set(sv, Feature::Edge(ev));
                }
            }
            return self.local_minimum(v, sv, f, &x);
        }

        // Touching contact.
        let cp = x - n * d;
        Step::Done(self.disjoint(
            sv,
            self.vpos(sv, v),
            Feature::Vertex(v),
            cp,
            Feature::Face(f),
            0.0,
        ))
    }

    /// Local-minimum recovery: the vertex is behind its current face's plane
    /// and no incident edge escapes. Scan every face of the opposing patch
    /// for the maximum signed distance; either the vertex is inside the
    /// patch (penetration) or the walk re-aims at the least-violated face.
    fn local_minimum(&self, v: u32, sv: usize, f: u32, x: &Point<Real>) -> Step {
        let sf = 1 - sv;
        let mut best_d = Real::MIN;
        let mut best_f = f;

        for g in self.m[sf].patch_faces(self.patch[sf]) {
            let n_g = self.face_normal(sf, g);
            let p_g = self.face_pt(sf, g);
            let d_g = n_g.dot(&(x - p_g));
            if d_g > best_d {
                best_d = d_g;
                best_f = g;
            }
        }

        if best_d <= WALK_EPS {
            let n_b = self.face_normal(sf, best_f);
            let p_face = x - n_b * best_d;
            return Step::Done(self.penetration(
                sv,
                self.vpos(sv, v),
                Feature::Vertex(v),
                p_face,
                Feature::Face(best_f),
                (-best_d).max(0.0),
            ));
        }

        Step::Set(sf, Feature::Face(best_f))
    }

    /// Edge-edge state: each edge is clipped against the Voronoi region of
    /// the other (vertex planes, then face planes).
    fn ee(&self, e: [u32; 2]) -> Step {
        for s in 0..2 {
            let o = 1 - s;
            let ta = self.xform(o, &self.edge_tail(o, e[o]));
            let he = self.xform(o, &self.edge_head(o, e[o]));
            let ed = he - ta;

            let tail_s = self.edge_tail(s, e[s]);
            let head_s = self.edge_head(s, e[s]);
            let u_vec = head_s - tail_s;
            let len = u_vec.norm();
            if len <= WALK_EPS {
                return Step::Set(s, Feature::Vertex(self.origin_of(s, e[s])));
            }
            let u = u_vec / len;

            let deriv_at = |l: Real| -> Real {
                let pt = ta + ed * l;
                let w = pt - tail_s;
                let cp_line = tail_s + u * u.dot(&w);
                ed.dot(&(pt - cp_line))
            };

            // Vertex planes.
            let vplanes = [
                (
                    Plane::new(u, &tail_s),
                    Feature::Vertex(self.origin_of(s, e[s])),
                ),
                (
                    Plane::new(-u, &head_s),
                    Feature::Vertex(self.head_of(s, e[s])),
                ),
            ];
            if let Some(step) = self.clip_and_update(s, &ta, &he, &vplanes, &deriv_at) {
                return step;
            }

            // Face planes.
            let lf = self.face_of_edge(s, e[s]);
            let n_lf = self.face_normal(s, lf);
            let mut fplanes = PlaneSet::new();
            fplanes.push((Plane::new(-n_lf.cross(&u), &tail_s), Feature::Face(lf)));
            let tw = self.twin(s, e[s]);
            if tw != INVALID {
                let rf = self.face_of_edge(s, tw);
                let n_rf = self.face_normal(s, rf);
                fplanes.push((Plane::new(-n_rf.cross(&(-u)), &tail_s), Feature::Face(rf)));
            }
            if let Some(step) = self.clip_and_update(s, &ta, &he, &fplanes, &deriv_at) {
                return step;
            }
        }

        // Settled: true segment-segment closest points.
        let p1 = self.edge_tail(0, e[0]);
        let q1 = self.edge_head(0, e[0]);
        let p2 = self.xform(1, &self.edge_tail(1, e[1]));
        let q2 = self.xform(1, &self.edge_head(1, e[1]));
        let (s_param, t_param) = closest_points_segment_segment(&p1, &q1, &p2, &q2);

        let cp1 = p1 + (q1 - p1) * s_param;
        let cp2_in1 = p2 + (q2 - p2) * t_param;
        let distance = na::distance(&cp1, &cp2_in1);

        let tail2 = self.edge_tail(1, e[1]);
        let head2 = self.edge_head(1, e[1]);
        let cp2 = tail2 + (head2 - tail2) * t_param;

        Step::Done(self.disjoint(
            0,
            cp1,
            Feature::Edge(e[0]),
            cp2,
            Feature::Edge(e[1]),
            distance,
        ))
    }

    /// Clips the opposing segment against a set of this side's Voronoi
    /// planes and applies the post-clip derivative rules. Returns `None`
    /// when the feature pair survives the planes unchanged.
    fn clip_and_update(
        &self,
        s: usize,
        ta: &Point<Real>,
        he: &Point<Real>,
        planes: &[(Plane, Feature)],
        deriv_at: &dyn Fn(Real) -> Real,
    ) -> Option<Step> {
        let clip = clip_edge(ta, he, planes);

        if let Some(owner) = clip.excluded {
            return Some(Step::Set(s, owner));
        }
        if clip.compound {
            let owner = if deriv_at(clip.lmin) > 0.0 {
                clip.nmin
            } else {
                clip.nmax
            };
            if let Some(owner) = owner {
                return Some(Step::Set(s, owner));
            }
        }
        if let Some(n1) = clip.nmin {
            if deriv_at(clip.lmin) > WALK_EPS {
                return Some(Step::Set(s, n1));
            }
        }
        if let Some(n2) = clip.nmax {
            if deriv_at(clip.lmax) < -WALK_EPS {
                return Some(Step::Set(s, n2));
            }
        }

        None
    }

    /// Transient edge-face state. `se` is the side owning the edge. Either
    /// resolves to a neighboring persistent state or detects the edge
    /// piercing the face.
    fn ef(&self, e: u32, se: usize, f: u32) -> Step {
        let sf = 1 - se;
        let ta = self.xform(se, &self.edge_tail(se, e));
        let he = self.xform(se, &self.edge_head(se, e));
        let ed = he - ta;

        let n = self.face_normal(sf, f);
        let fp = self.face_pt(sf, f);

        let mut planes = PlaneSet::new();
        for eb in self.m[sf].face_edges(f) {
            planes.push((
                Plane::new(n.cross(&self.edge_dir(sf, eb)), &self.edge_tail(sf, eb)),
                Feature::Edge(eb),
            ));
        }

        let clip = clip_edge(&ta, &he, &planes);
        if let Some(owner) = clip.excluded {
            return Step::Set(sf, owner);
        }
        if clip.compound {
            let p_min = ta + ed * clip.lmin;
            let p_max = ta + ed * clip.lmax;
            let d_min = n.dot(&(p_min - fp)).abs();
            let d_max = n.dot(&(p_max - fp)).abs();
            let owner = if d_min <= d_max { clip.nmin } else { clip.nmax };
            if let Some(owner) = owner {
                return Step::Set(sf, owner);
            }
        }

        let d1 = n.dot(&(ta + ed * clip.lmin - fp));
        let d2 = n.dot(&(ta + ed * clip.lmax - fp));

        if d1 * d2 < 0.0 {
            // The edge pierces the face plane inside its prism.
            let l0 = clip.lmin + (clip.lmax - clip.lmin) * d1 / (d1 - d2);
            let pt = ta + ed * l0;
            let depth = -(d1.min(d2));
            return Step::Done(self.penetration(
                se,
                self.xform(sf, &pt),
                Feature::Edge(e),
                pt,
                Feature::Face(f),
                depth,
            ));
        }

        let slope = n.dot(&ed);
        if slope.abs() <= WALK_EPS {
            // Edge parallel to the face plane.
            if d1 > WALK_EPS {
                let lm = (clip.lmin + clip.lmax) * 0.5;
                let pe = ta + ed * lm;
                let cp = pe - n * d1;
                return Step::Done(self.disjoint(
                    se,
                    self.xform(sf, &pe),
                    Feature::Edge(e),
                    cp,
                    Feature::Face(f),
                    d1,
                ));
            }
            // Parallel at or below the plane: let the vertex-face handler
            // run its local-minimum analysis.
            return Step::Set(se, Feature::Vertex(self.origin_of(se, e)));
        }

        // No crossing: step toward the end closest to the face plane.
        let (n_end, vtx) = if d1.abs() <= d2.abs() {
            (clip.nmin, self.origin_of(se, e))
        } else {
            (clip.nmax, self.head_of(se, e))
        };

        match n_end {
            Some(owner) => Step::Set(sf, owner),
            None => Step::Set(se, Feature::Vertex(vtx)),
        }
    }
}

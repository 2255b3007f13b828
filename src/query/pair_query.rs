//! Hierarchical narrow-phase query over one pair of objects.
//!
//! Applies the closest-feature walk to pairs of hierarchy patches,
//! recursing into children whenever a terminal feature is synthetic
//! (a `Free` hull face or a piece seal), keeping the minimum distance seen
//! and early-exiting on the first confirmed penetration.

use super::contact::Contact;
use super::walk::{closest_features, Feature, WalkOutcome, WALK_EPS};
use super::FeatureId;
use crate::math::{Isometry, Point, Real, UnitVector};
use crate::mesh::{FaceClass, Mesh};
use std::collections::{HashMap, HashSet};

/// Governs whether boundary faces (the synthetic faces sealing two adjacent
/// convex pieces) may be reported as valid contact features.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum BoundaryPolicy {
    /// Boundary features terminate queries and appear in contact reports.
    Report,
    /// Results witnessed by a boundary feature are discarded; the true
    /// surface minimum is always provided by a neighboring piece.
    #[default]
    Ignore,
}

/// Cached terminal feature pairs of the previous query, keyed by patch pair,
/// exploited for temporal coherence across frames.
#[derive(Clone, Debug, Default)]
pub(crate) struct WalkCache {
    seeds: HashMap<(u32, u32), (Feature, Feature)>,
}

impl WalkCache {
    pub(crate) fn new() -> Self {
        WalkCache::default()
    }

    /// Forgets every cached feature pair (used when one side of the pair is
    /// replaced or renumbered).
    pub(crate) fn invalidate(&mut self) {
        self.seeds.clear();
    }
}

/// The kind of answer a scene query needs from a pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum QueryKind {
    Intersection,
    Tolerance,
    ApproxDistance,
    ExactDistance,
    Contacts,
}

/// A narrow-phase request.
#[derive(Copy, Clone, Debug)]
pub(crate) struct QueryRequest {
    pub kind: QueryKind,
    pub tolerance: Real,
    pub abs_error: Real,
    pub rel_error: Real,
}

/// The aggregated answer for one object pair.
#[derive(Clone, Debug)]
pub(crate) struct PairResult {
    pub intersecting: bool,
    pub distance: Real,
    pub contacts: Vec<Contact>,
}

/// Runs a narrow-phase query between two objects.
pub(crate) fn query_pair(
    mesh1: &Mesh,
    pos1: &Isometry<Real>,
    mesh2: &Mesh,
    pos2: &Isometry<Real>,
    cache: &mut WalkCache,
    req: &QueryRequest,
    policy: BoundaryPolicy,
) -> PairResult {
    let pos12 = pos1.inv_mul(pos2);
    let mut search = Search {
        m1: mesh1,
        m2: mesh2,
        pos1,
        pos2,
        pos21: pos12.inverse(),
        pos12,
        cache,
        req,
        policy,
        best: Real::MAX,
        intersecting: false,
        contacts: Vec::new(),
        reported: HashSet::new(),
        done: false,
    };

    search.rec(mesh1.root(), mesh2.root());

    PairResult {
        intersecting: search.intersecting,
        distance: if search.intersecting {
            0.0
        } else {
            search.best
        },
        contacts: search.contacts,
    }
}

struct Search<'a> {
    m1: &'a Mesh,
    m2: &'a Mesh,
    pos1: &'a Isometry<Real>,
    pos2: &'a Isometry<Real>,
    pos12: Isometry<Real>,
    pos21: Isometry<Real>,
    cache: &'a mut WalkCache,
    req: &'a QueryRequest,
    policy: BoundaryPolicy,
    /// Best proven surface-to-surface distance so far.
    best: Real,
    intersecting: bool,
    contacts: Vec<Contact>,
    reported: HashSet<(FeatureId, FeatureId)>,
    done: bool,
}

impl Search<'_> {
    /// Lower bounds above this value cannot contribute to the answer.
    fn prune_bound(&self) -> Real {
        match self.req.kind {
            QueryKind::Intersection => WALK_EPS,
            QueryKind::Tolerance | QueryKind::Contacts => self.req.tolerance + WALK_EPS,
            QueryKind::ExactDistance | QueryKind::ApproxDistance => {
                self.best.min(self.req.tolerance)
            }
        }
    }

    fn rec(&mut self, p1: u32, p2: u32) {
        if self.done {
            return;
        }

        let bv1 = &self.m1.bvs()[p1 as usize];
        let bv2 = &self.m2.bvs()[p2 as usize];
        let leaf1 = bv1.is_leaf();
        let leaf2 = bv2.is_leaf();

        // Sphere-sphere lower bound.
        let com2_in1 = self.pos12 * bv2.com;
        let lower = na::distance(&bv1.com, &com2_in1) - bv1.radius - bv2.radius;
        if lower > self.prune_bound() {
            return;
        }

        let seed = self.cache.seeds.get(&(p1, p2)).copied();
        let rng_seed = (p1 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (p2 as u64);
        let (outcome, feats) =
            closest_features(self.m1, p1, self.m2, p2, &self.pos12, seed, rng_seed);
        let _ = self.cache.seeds.insert((p1, p2), feats);

        match outcome {
            WalkOutcome::Penetration {
                depth,
                point1,
                point2,
                feature1,
                feature2,
            } => {
                if leaf1 && leaf2 {
                    // A point inside a leaf piece is inside the object: the
                    // penetration is real whatever the witness class.
                    self.intersecting = true;
                    if self.req.kind == QueryKind::Contacts {
                        self.push_contact(&point1, &point2, feature1, feature2, -depth);
                    } else {
                        self.done = true;
                    }
                } else {
                    // Hull-level overlap only: recurse into the finer side.
                    self.descend(p1, p2, !leaf1, !leaf2);
                }
            }
            WalkOutcome::Disjoint {
                distance,
                point1,
                point2,
                feature1,
                feature2,
            } => {
                if distance > self.prune_bound() {
                    return;
                }

                let real1 = is_real(self.m1, feature1, self.policy);
                let real2 = is_real(self.m2, feature2, self.policy);

                if real1 && real2 {
                    if self.req.kind == QueryKind::Contacts && !(leaf1 && leaf2) {
                        // Enumerate per-piece contacts rather than keeping a
                        // single aggregate witness.
                        self.descend(p1, p2, !leaf1, !leaf2);
                        return;
                    }

                    if distance < self.best {
                        self.best = distance;
                    }
                    match self.req.kind {
                        QueryKind::Contacts if distance <= self.req.tolerance => {
                            self.push_contact(&point1, &point2, feature1, feature2, distance);
                        }
                        QueryKind::Intersection if distance <= WALK_EPS => {
                            self.intersecting = true;
                            self.done = true;
                        }
                        QueryKind::Tolerance if self.best <= self.req.tolerance => {
                            self.done = true;
                        }
                        _ => {}
                    }
                } else {
                    let can1 = !real1 && !leaf1;
                    let can2 = !real2 && !leaf2;

                    if can1 || can2 {
                        if self.req.kind == QueryKind::ApproxDistance && self.best < Real::MAX {
                            let gap = self.best - distance;
                            if gap <= self.req.abs_error
                                || gap <= self.req.rel_error * self.best
                            {
                                return;
                            }
                        }
                        self.descend(p1, p2, can1, can2);
                    }
                    // Otherwise every synthetic witness sits on a leaf seal:
                    // this piece pair's contribution is discarded (the true
                    // minimum comes from a neighboring piece).
                }
            }
        }
    }

    /// Recurses into the children of one side. When both sides are eligible
    /// the one with the larger radius is split, and children are visited
    /// closest-first to tighten the pruning bound early.
    fn descend(&mut self, p1: u32, p2: u32, elig1: bool, elig2: bool) {
        let r1 = self.m1.bvs()[p1 as usize].radius;
        let r2 = self.m2.bvs()[p2 as usize].radius;

        if elig1 && (!elig2 || r1 >= r2) {
            let [mut a, mut b] = self.m1.bvs()[p1 as usize].children.unwrap();
            let target = self.pos12 * self.m2.bvs()[p2 as usize].com;
            if na::distance(&self.m1.bvs()[a as usize].com, &target)
                > na::distance(&self.m1.bvs()[b as usize].com, &target)
            {
                std::mem::swap(&mut a, &mut b);
            }
            self.rec(a, p2);
            self.rec(b, p2);
        } else if elig2 {
            let [mut a, mut b] = self.m2.bvs()[p2 as usize].children.unwrap();
            let target = self.pos21 * self.m1.bvs()[p1 as usize].com;
            if na::distance(&self.m2.bvs()[a as usize].com, &target)
                > na::distance(&self.m2.bvs()[b as usize].com, &target)
            {
                std::mem::swap(&mut a, &mut b);
            }
            self.rec(p1, a);
            self.rec(p1, b);
        }
    }

    fn push_contact(
        &mut self,
        point1: &Point<Real>,
        point2: &Point<Real>,
        feature1: Feature,
        feature2: Feature,
        dist: Real,
    ) {
        if !self.reported.insert((feature1.id(), feature2.id())) {
            return;
        }

        let p1w = self.pos1 * point1;
        let p2w = self.pos2 * point2;

        let normal1 = if dist > WALK_EPS {
            UnitVector::new_normalize(p2w - p1w)
        } else if let Feature::Face(f) = feature2 {
            -(self.pos2.rotation * self.m2.faces()[f as usize].normal)
        } else if let Feature::Face(f) = feature1 {
            self.pos1.rotation * self.m1.faces()[f as usize].normal
        } else {
            // Last resort: aim from one center of mass to the other.
            let d = self.pos2 * self.m2.com() - self.pos1 * self.m1.com();
            UnitVector::try_new(d, WALK_EPS)
                .unwrap_or(UnitVector::new_unchecked(na::Vector3::x()))
        };

        self.contacts.push(Contact::new(
            p1w,
            p2w,
            normal1,
            -normal1,
            dist,
            feature1.id(),
            feature2.id(),
        ));
    }
}

/// Is this feature part of the reportable surface?
fn is_real(mesh: &Mesh, feat: Feature, policy: BoundaryPolicy) -> bool {
    let report_boundary = policy == BoundaryPolicy::Report;
    match feat {
        Feature::Vertex(v) => {
            mesh.is_source_vertex(v) || (report_boundary && mesh.is_seal_vertex(v))
        }
        Feature::Edge(e) => mesh.is_source_edge(e) || (report_boundary && mesh.is_seal_edge(e)),
        Feature::Face(f) => match mesh.faces()[f as usize].class {
            FaceClass::Original => true,
            FaceClass::Contained => report_boundary,
            FaceClass::Free => false,
        },
    }
}

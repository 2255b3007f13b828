use super::{AxisMask, BroadPhase, Object, ObjectOptions, Pair};
use crate::bounding_volume::Aabb;
use crate::math::{Isometry, Point, Real};
use crate::mesh::{Mesh, MeshBuilderError, INVALID};
use crate::partitioning::{build_hierarchy, HierarchySettings, SplitStrategy};
use crate::query::{
    query_pair, BoundaryPolicy, Contact, PairResult, QueryKind, QueryRequest,
};
use crate::utils::SortedPair;
use std::collections::HashSet;
use std::mem;
use std::sync::Arc;

/// The stable external identifier of an object of a [`Scene`].
pub type ObjectId = u32;

/// An error raised by a scene operation.
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// The object id is unknown or was deleted.
    #[error("invalid object id {0}.")]
    InvalidHandle(ObjectId),
    /// The mesh construction failed; the scene is left unchanged.
    #[error("mesh construction failed: {0}")]
    Mesh(#[from] MeshBuilderError),
    /// The convex decomposition must assign one piece per triangle.
    #[error("the decomposition assigns {got} pieces but the surface has {expected} triangles.")]
    BadDecomposition {
        /// The number of triangles of the surface.
        expected: usize,
        /// The number of per-face piece ids supplied.
        got: usize,
    },
}

/// Scene-wide tuning knobs.
#[derive(Copy, Clone, Debug)]
pub struct SceneSettings {
    /// Whether piece-sealing boundary faces may be reported as contact
    /// features.
    pub boundary_policy: BoundaryPolicy,
    /// The split strategy used by `add_convex_object` (general objects pick
    /// their own).
    pub default_split: SplitStrategy,
    /// Resolution cap of the per-patch direction lookup tables.
    pub max_lookup_resolution: u32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        SceneSettings {
            boundary_policy: BoundaryPolicy::default(),
            default_split: SplitStrategy::default(),
            max_lookup_resolution: 8,
        }
    }
}

/// A distance query answer for one pair of objects.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DistanceResult {
    /// The first object.
    pub id1: ObjectId,
    /// The second object.
    pub id2: ObjectId,
    /// The separation distance; `0.0` when the objects intersect.
    pub distance: Real,
}

/// The contacts reported between one pair of objects.
#[derive(Clone, Debug)]
pub struct PairContacts {
    /// The first object.
    pub id1: ObjectId,
    /// The second object.
    pub id2: ObjectId,
    /// One entry per contact, negative distances denoting penetration.
    pub contacts: Vec<Contact>,
}

/// A collection of collision objects with a sweep-and-prune broad phase and
/// closest-feature narrow-phase queries.
///
/// Objects are addressed by stable external ids; internally they live in
/// dense slots with O(1) deletion by swap. All queries are scoped to the
/// currently active, broad-phase overlapping pairs.
pub struct Scene {
    objects: Vec<Object>,
    /// Slot → external id.
    slot_ids: Vec<ObjectId>,
    /// External id → slot, `INVALID` for freed ids.
    id_slots: Vec<u32>,
    free_ids: Vec<ObjectId>,
    broad: BroadPhase,
    /// The dense set of active, all-axes-overlapping pairs, `(hi, lo)` by
    /// slot index.
    overlapping: Vec<(u32, u32)>,
    /// The inflation applied to every box during the last broad-phase
    /// refresh. Distance-style queries grow the boxes by their tolerance so
    /// that pairs within tolerance are candidates even when their tight
    /// boxes are separated.
    padding: Real,
    settings: SceneSettings,
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new()
    }
}

impl Scene {
    /// Creates an empty scene with default settings.
    pub fn new() -> Self {
        Scene::with_settings(SceneSettings::default())
    }

    /// Creates an empty scene.
    pub fn with_settings(settings: SceneSettings) -> Self {
        Scene {
            objects: Vec::new(),
            slot_ids: Vec::new(),
            id_slots: Vec::new(),
            free_ids: Vec::new(),
            broad: BroadPhase::new(),
            overlapping: Vec::new(),
            padding: 0.0,
            settings,
        }
    }

    /// The number of objects currently in the scene.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Is the scene empty?
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Adds a convex object from raw vertex coordinates and polygon index
    /// lists (flat `indices` plus optional per-polygon vertex counts).
    ///
    /// The surface must be a closed, consistently wound 2-manifold unless
    /// `opts.mesh_flags` tolerates open edges. On error the scene is left
    /// unchanged.
    pub fn add_convex_object(
        &mut self,
        vertices: &[Point<Real>],
        indices: &[u32],
        face_sizes: Option<&[u32]>,
        position: Isometry<Real>,
        scale: Real,
        opts: ObjectOptions,
    ) -> Result<ObjectId, SceneError> {
        let mut mesh = Mesh::from_polygons(vertices, indices, face_sizes, scale, opts.mesh_flags)?;
        let hier = HierarchySettings {
            strategy: self.settings.default_split,
            max_lookup_res: self.settings.max_lookup_resolution,
        };
        build_hierarchy(&mut mesh, None, &hier);
        Ok(self.insert_object(Arc::new(mesh), position, &opts))
    }

    /// Adds a general (possibly non-convex) object.
    ///
    /// `piece_of_face` assigns each triangle of the surface to a convex
    /// piece of an externally supplied decomposition; the pieces become the
    /// leaves of the object's bounding-volume hierarchy, split recursively
    /// with `split`. Without a decomposition the surface is treated as one
    /// convex piece.
    pub fn add_general_object(
        &mut self,
        vertices: &[Point<Real>],
        indices: &[u32],
        face_sizes: Option<&[u32]>,
        piece_of_face: Option<&[u32]>,
        split: SplitStrategy,
        position: Isometry<Real>,
        scale: Real,
        opts: ObjectOptions,
    ) -> Result<ObjectId, SceneError> {
        let mut mesh = Mesh::from_polygons(vertices, indices, face_sizes, scale, opts.mesh_flags)?;

        if let Some(pieces) = piece_of_face {
            if pieces.len() != mesh.num_source_faces() {
                return Err(SceneError::BadDecomposition {
                    expected: mesh.num_source_faces(),
                    got: pieces.len(),
                });
            }
        }

        let hier = HierarchySettings {
            strategy: split,
            max_lookup_res: self.settings.max_lookup_resolution,
        };
        build_hierarchy(&mut mesh, piece_of_face, &hier);
        Ok(self.insert_object(Arc::new(mesh), position, &opts))
    }

    /// Adds a copy of an existing object. The mesh and its hierarchy are
    /// shared; the transform and pair states are independent.
    pub fn copy_object(&mut self, id: ObjectId) -> Result<ObjectId, SceneError> {
        let slot = self.slot(id)?;
        let mesh = self.objects[slot as usize].mesh.clone();
        let position = self.objects[slot as usize].position;
        let opts = ObjectOptions {
            fixed: self.objects[slot as usize].fixed,
            box_setting: self.objects[slot as usize].box_setting,
            mesh_flags: Default::default(),
        };
        Ok(self.insert_object(mesh, position, &opts))
    }

    /// Removes an object. Remaining objects keep their external ids; the
    /// internal slot of the last object is renumbered into the freed slot.
    pub fn delete_object(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let slot = self.slot(id)?;
        let last = self.objects.len() as u32 - 1;

        // Unlist every pair involving the deleted slot.
        for lo in 0..slot {
            self.set_pair_unlisted(slot, lo);
        }
        for hi in slot + 1..=last {
            self.set_pair_unlisted(hi, slot);
        }

        self.broad.remove(slot, &mut self.objects);

        if slot != last {
            // Redistribute the pairs owned by the last slot: entries below
            // the freed slot stay with the moved object; entries above flip
            // ownership to the other object, indexed by the freed slot.
            let mut moved = mem::take(&mut self.objects[last as usize].pairs);
            let _ = moved.remove(slot as usize);
            let flipped: Vec<Pair> = moved.drain(slot as usize..).collect();
            for (i, mut pair) in flipped.into_iter().enumerate() {
                // The pair's sides swap roles after the renumbering, so the
                // cached feature pairs are stale.
                pair.cache.invalidate();
                let t = slot as usize + 1 + i;
                self.objects[t].pairs[slot as usize] = pair;
            }
            self.objects[last as usize].pairs = moved;

            self.broad.rename_slot(last, slot);
            for entry in &mut self.overlapping {
                if entry.0 == last {
                    if entry.1 < slot {
                        entry.0 = slot;
                    } else {
                        *entry = (entry.1, slot);
                    }
                }
            }

            let moved_id = self.slot_ids[last as usize];
            self.id_slots[moved_id as usize] = slot;
        }

        self.id_slots[id as usize] = INVALID;
        self.free_ids.push(id);
        let _ = self.slot_ids.swap_remove(slot as usize);
        let _ = self.objects.swap_remove(slot as usize);

        Ok(())
    }

    /// Replaces the transform of an object.
    pub fn set_transform(
        &mut self,
        id: ObjectId,
        position: &Isometry<Real>,
    ) -> Result<(), SceneError> {
        let slot = self.slot(id)?;
        self.objects[slot as usize].position = *position;
        self.objects[slot as usize].dirty = true;
        Ok(())
    }

    /// Replaces the transforms of a batch of objects.
    ///
    /// Fails without changing anything if any id is invalid.
    pub fn set_all_transforms(
        &mut self,
        transforms: &[(ObjectId, Isometry<Real>)],
    ) -> Result<(), SceneError> {
        for (id, _) in transforms {
            let _ = self.slot(*id)?;
        }
        for (id, position) in transforms {
            self.set_transform(*id, position)?;
        }
        Ok(())
    }

    /// Enables queries between two objects. Idempotent.
    pub fn activate_pair(&mut self, id1: ObjectId, id2: ObjectId) -> Result<(), SceneError> {
        self.set_pair_active(id1, id2, true)
    }

    /// Enables queries between `id` and every other object. Idempotent.
    pub fn activate(&mut self, id: ObjectId) -> Result<(), SceneError> {
        self.set_object_active(id, true)
    }

    /// Enables queries between all pairs of objects.
    pub fn activate_all(&mut self) {
        self.set_all_active(true)
    }

    /// Suspends queries between two objects. Idempotent.
    pub fn deactivate_pair(&mut self, id1: ObjectId, id2: ObjectId) -> Result<(), SceneError> {
        self.set_pair_active(id1, id2, false)
    }

    /// Suspends queries between `id` and every other object. Idempotent.
    pub fn deactivate(&mut self, id: ObjectId) -> Result<(), SceneError> {
        self.set_object_active(id, false)
    }

    /// Suspends queries between all pairs of objects.
    pub fn deactivate_all(&mut self) {
        self.set_all_active(false)
    }

    /// The current world-space box of an object.
    pub fn aabb(&mut self, id: ObjectId) -> Result<Aabb, SceneError> {
        let slot = self.slot(id)?;
        let padding = self.padding;
        self.refresh(padding);
        Ok(self.objects[slot as usize].aabb)
    }

    /// The broad-phase candidate pairs: active pairs whose (uninflated)
    /// boxes overlap on all three axes, as `(smaller id, larger id)`.
    pub fn overlapping_pairs(&mut self) -> Vec<(ObjectId, ObjectId)> {
        self.refresh(0.0);
        self.overlapping
            .iter()
            .map(|&(hi, lo)| {
                let a = self.slot_ids[lo as usize];
                let b = self.slot_ids[hi as usize];
                (a.min(b), a.max(b))
            })
            .collect()
    }

    /// Reports every active overlapping pair whose objects intersect.
    pub fn query_intersection(&mut self, early_exit: bool) -> Vec<(ObjectId, ObjectId)> {
        let req = QueryRequest {
            kind: QueryKind::Intersection,
            tolerance: 0.0,
            abs_error: 0.0,
            rel_error: 0.0,
        };
        self.run_query(req, early_exit, |r| r.intersecting)
            .into_iter()
            .map(|(id1, id2, _)| (id1, id2))
            .collect()
    }

    /// Reports every active overlapping pair closer than `tolerance` (or
    /// intersecting).
    pub fn query_tolerance(&mut self, early_exit: bool, tolerance: Real) -> Vec<(ObjectId, ObjectId)> {
        let req = QueryRequest {
            kind: QueryKind::Tolerance,
            tolerance,
            abs_error: 0.0,
            rel_error: 0.0,
        };
        self.run_query(req, early_exit, move |r| {
            r.intersecting || r.distance <= tolerance
        })
        .into_iter()
        .map(|(id1, id2, _)| (id1, id2))
        .collect()
    }

    /// Reports the distance of every active overlapping pair closer than
    /// `tolerance`, within the given absolute or relative error bounds.
    /// Intersecting pairs report a distance of `0.0`.
    pub fn query_approximate_distance(
        &mut self,
        early_exit: bool,
        tolerance: Real,
        abs_error: Real,
        rel_error: Real,
    ) -> Vec<DistanceResult> {
        let req = QueryRequest {
            kind: QueryKind::ApproxDistance,
            tolerance,
            abs_error,
            rel_error,
        };
        self.collect_distances(req, early_exit, tolerance)
    }

    /// Reports the exact distance of every active overlapping pair closer
    /// than `tolerance`. Intersecting pairs report a distance of `0.0`.
    pub fn query_exact_distance(
        &mut self,
        early_exit: bool,
        tolerance: Real,
    ) -> Vec<DistanceResult> {
        let req = QueryRequest {
            kind: QueryKind::ExactDistance,
            tolerance,
            abs_error: 0.0,
            rel_error: 0.0,
        };
        self.collect_distances(req, early_exit, tolerance)
    }

    /// Reports the contacts (closest feature pairs within `tolerance`, and
    /// penetration witnesses) of every active overlapping pair.
    pub fn query_contacts(&mut self, early_exit: bool, tolerance: Real) -> Vec<PairContacts> {
        let req = QueryRequest {
            kind: QueryKind::Contacts,
            tolerance,
            abs_error: 0.0,
            rel_error: 0.0,
        };
        self.run_query(req, early_exit, |r| !r.contacts.is_empty())
            .into_iter()
            .map(|(id1, id2, r)| PairContacts {
                id1,
                id2,
                contacts: r.contacts,
            })
            .collect()
    }

    fn collect_distances(
        &mut self,
        req: QueryRequest,
        early_exit: bool,
        tolerance: Real,
    ) -> Vec<DistanceResult> {
        self.run_query(req, early_exit, move |r| {
            r.intersecting || (r.distance <= tolerance && r.distance < Real::MAX)
        })
        .into_iter()
        .map(|(id1, id2, r)| DistanceResult {
            id1,
            id2,
            distance: r.distance,
        })
        .collect()
    }

    /// Refreshes the broad phase and runs the narrow phase over the live
    /// overlap set, keeping pairs matching `hit`.
    fn run_query(
        &mut self,
        req: QueryRequest,
        early_exit: bool,
        hit: impl Fn(&PairResult) -> bool,
    ) -> Vec<(ObjectId, ObjectId, PairResult)> {
        // Distance-style queries must see pairs separated by up to their
        // tolerance: grow every box by half the tolerance on each side.
        let padding = match req.kind {
            QueryKind::Intersection => 0.0,
            _ => req.tolerance.max(0.0),
        };
        self.refresh(padding);

        let list = self.overlapping.clone();
        let mut out = Vec::new();

        for (hi, lo) in list {
            let mesh1 = self.objects[lo as usize].mesh.clone();
            let pos1 = self.objects[lo as usize].position;
            let mesh2 = self.objects[hi as usize].mesh.clone();
            let pos2 = self.objects[hi as usize].position;

            let pair = &mut self.objects[hi as usize].pairs[lo as usize];
            let result = query_pair(
                &mesh1,
                &pos1,
                &mesh2,
                &pos2,
                &mut pair.cache,
                &req,
                self.settings.boundary_policy,
            );

            if hit(&result) {
                let id1 = self.slot_ids[lo as usize];
                let id2 = self.slot_ids[hi as usize];
                let (id1, id2, result) = if id1 <= id2 {
                    (id1, id2, result)
                } else {
                    let mut result = result;
                    for contact in &mut result.contacts {
                        contact.flip();
                    }
                    (id2, id1, result)
                };

                out.push((id1, id2, result));
                if early_exit {
                    break;
                }
            }
        }

        out
    }

    /// Re-sorts the broad phase after transform changes and updates the
    /// axis-overlap bits of every pair whose endpoints crossed.
    fn refresh(&mut self, padding: Real) {
        let repad = padding != self.padding;
        self.padding = padding;
        let mut any = false;

        for slot in 0..self.objects.len() {
            if self.objects[slot].dirty || repad {
                let aabb = self.objects[slot].compute_aabb();
                self.objects[slot].aabb = aabb;
                let endpoints = self.objects[slot].endpoints;
                self.broad
                    .write_values(&endpoints, &aabb.loosened(padding * 0.5));
                self.objects[slot].dirty = false;
                any = true;
            }
        }

        if any {
            let events = self.broad.sort_all(&mut self.objects);
            log::debug!("broad phase re-sort: {} crossings", events.len());
            let mut seen = HashSet::new();
            for (a, b, axis) in events {
                if seen.insert((SortedPair::new(a, b), axis)) {
                    self.update_axis_bit(a, b, axis);
                }
            }
        }
    }

    fn update_axis_bit(&mut self, a: u32, b: u32, axis: usize) {
        let pad = self.padding;
        let box_a = &self.objects[a as usize].aabb;
        let box_b = &self.objects[b as usize].aabb;
        let overlap = box_a.mins[axis] <= box_b.maxs[axis] + pad
            && box_b.mins[axis] <= box_a.maxs[axis] + pad;

        let (hi, lo) = if a > b { (a, b) } else { (b, a) };
        let pair = &mut self.objects[hi as usize].pairs[lo as usize];
        if overlap {
            pair.axis_bits |= AxisMask::axis(axis);
        } else {
            pair.axis_bits &= !AxisMask::axis(axis);
        }
        self.sync_pair(hi, lo);
    }

    /// Inserts a fully built object, wiring its endpoints and pair records.
    fn insert_object(
        &mut self,
        mesh: Arc<Mesh>,
        position: Isometry<Real>,
        opts: &ObjectOptions,
    ) -> ObjectId {
        let slot = self.objects.len() as u32;
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = self.id_slots.len() as ObjectId;
                self.id_slots.push(INVALID);
                id
            }
        };
        self.id_slots[id as usize] = slot;
        self.slot_ids.push(id);

        let mut object = Object {
            mesh,
            position,
            fixed: opts.fixed,
            box_setting: opts.box_setting,
            dirty: false,
            aabb: Aabb::new_invalid(),
            endpoints: [[0; 2]; 3],
            pairs: (0..slot).map(|_| Pair::new()).collect(),
        };
        object.aabb = object.compute_aabb();
        let aabb = object.aabb;
        self.objects.push(object);

        let pad = self.padding;
        self.broad
            .insert(slot, &aabb.loosened(pad * 0.5), &mut self.objects);

        // Initial axis-overlap bits against every existing object.
        for lo in 0..slot {
            let mut bits = AxisMask::empty();
            for axis in 0..3 {
                let other = &self.objects[lo as usize].aabb;
                if aabb.mins[axis] <= other.maxs[axis] + pad
                    && other.mins[axis] <= aabb.maxs[axis] + pad
                {
                    bits |= AxisMask::axis(axis);
                }
            }
            self.objects[slot as usize].pairs[lo as usize].axis_bits = bits;
            self.sync_pair(slot, lo);
        }

        log::debug!(
            "added object {} ({} vertices, {} BV nodes)",
            id,
            self.objects[slot as usize].mesh.vertices().len(),
            self.objects[slot as usize].mesh.bvs().len(),
        );

        id
    }

    fn slot(&self, id: ObjectId) -> Result<u32, SceneError> {
        let slot = self
            .id_slots
            .get(id as usize)
            .copied()
            .unwrap_or(INVALID);
        if slot == INVALID {
            Err(SceneError::InvalidHandle(id))
        } else {
            Ok(slot)
        }
    }

    fn set_pair_active(
        &mut self,
        id1: ObjectId,
        id2: ObjectId,
        active: bool,
    ) -> Result<(), SceneError> {
        let s1 = self.slot(id1)?;
        let s2 = self.slot(id2)?;
        if s1 == s2 {
            return Ok(());
        }
        let (hi, lo) = if s1 > s2 { (s1, s2) } else { (s2, s1) };
        self.objects[hi as usize].pairs[lo as usize].active = active;
        self.sync_pair(hi, lo);
        Ok(())
    }

    fn set_object_active(&mut self, id: ObjectId, active: bool) -> Result<(), SceneError> {
        let slot = self.slot(id)?;
        for other in 0..self.objects.len() as u32 {
            if other == slot {
                continue;
            }
            let (hi, lo) = if slot > other { (slot, other) } else { (other, slot) };
            self.objects[hi as usize].pairs[lo as usize].active = active;
            self.sync_pair(hi, lo);
        }
        Ok(())
    }

    fn set_all_active(&mut self, active: bool) {
        for hi in 0..self.objects.len() as u32 {
            for lo in 0..hi {
                self.objects[hi as usize].pairs[lo as usize].active = active;
                self.sync_pair(hi, lo);
            }
        }
    }

    /// Makes the pair's listing state agree with its flags.
    fn sync_pair(&mut self, hi: u32, lo: u32) {
        let should = self.objects[hi as usize].pairs[lo as usize].should_overlap();
        let listed = self.objects[hi as usize].pairs[lo as usize].is_listed();

        if should && !listed {
            let idx = self.overlapping.len() as u32;
            self.objects[hi as usize].pairs[lo as usize].overlap_index = idx;
            self.overlapping.push((hi, lo));
        } else if !should && listed {
            let idx = self.objects[hi as usize].pairs[lo as usize].overlap_index as usize;
            self.objects[hi as usize].pairs[lo as usize].overlap_index = INVALID;
            let _ = self.overlapping.swap_remove(idx);
            if idx < self.overlapping.len() {
                let (h2, l2) = self.overlapping[idx];
                self.objects[h2 as usize].pairs[l2 as usize].overlap_index = idx as u32;
            }
        }
    }

    /// Forces a pair out of the overlap set (deletion path).
    fn set_pair_unlisted(&mut self, hi: u32, lo: u32) {
        let listed = self.objects[hi as usize].pairs[lo as usize].is_listed();
        if listed {
            let idx = self.objects[hi as usize].pairs[lo as usize].overlap_index as usize;
            self.objects[hi as usize].pairs[lo as usize].overlap_index = INVALID;
            let _ = self.overlapping.swap_remove(idx);
            if idx < self.overlapping.len() {
                let (h2, l2) = self.overlapping[idx];
                self.objects[h2 as usize].pairs[l2 as usize].overlap_index = idx as u32;
            }
        }
    }
}

//! Incremental sweep-and-prune bookkeeping.
//!
//! One sorted endpoint array per coordinate axis. Transforms change only
//! incrementally between frames, so an insertion sort keeps each array
//! ordered in near-linear time; every min/max crossing between two objects
//! is reported so the scene can toggle the pair's axis-overlap bit.

use super::Object;
use crate::bounding_volume::Aabb;
use crate::math::Real;
use ordered_float::OrderedFloat;

/// One interval endpoint of one object on one axis.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Endpoint {
    pub value: Real,
    pub slot: u32,
    pub is_max: bool,
}

impl Endpoint {
    /// Sort key. Min endpoints order before max endpoints on ties so that
    /// touching intervals register as overlapping.
    #[inline]
    fn key(&self) -> (OrderedFloat<Real>, u8) {
        (OrderedFloat(self.value), self.is_max as u8)
    }
}

/// The three per-axis sorted endpoint arrays.
#[derive(Default)]
pub(crate) struct BroadPhase {
    axes: [Vec<Endpoint>; 3],
}

impl BroadPhase {
    pub(crate) fn new() -> Self {
        BroadPhase::default()
    }

    /// Inserts the six endpoints of a new object at their sorted positions.
    pub(crate) fn insert(&mut self, slot: u32, aabb: &Aabb, objects: &mut [Object]) {
        for axis in 0..3 {
            for (is_max, value) in [(false, aabb.mins[axis]), (true, aabb.maxs[axis])] {
                let endpoint = Endpoint {
                    value,
                    slot,
                    is_max,
                };
                let arr = &mut self.axes[axis];
                let pos = arr.partition_point(|e| e.key() <= endpoint.key());
                arr.insert(pos, endpoint);

                objects[slot as usize].endpoints[axis][is_max as usize] = pos as u32;
                for i in pos + 1..arr.len() {
                    let e = arr[i];
                    objects[e.slot as usize].endpoints[axis][e.is_max as usize] = i as u32;
                }
            }
        }
    }

    /// Removes the endpoints of a deleted object and re-indexes the rest.
    pub(crate) fn remove(&mut self, slot: u32, objects: &mut [Object]) {
        for axis in 0..3 {
            let mut positions = objects[slot as usize].endpoints[axis];
            positions.sort_unstable_by(|a, b| b.cmp(a));
            let arr = &mut self.axes[axis];
            for pos in positions {
                let _ = arr.remove(pos as usize);
            }
            for (i, e) in arr.iter().enumerate() {
                objects[e.slot as usize].endpoints[axis][e.is_max as usize] = i as u32;
            }
        }
    }

    /// Rewrites the slot index carried by the endpoints of one object (used
    /// by delete-by-swap renumbering).
    pub(crate) fn rename_slot(&mut self, old: u32, new: u32) {
        for axis in 0..3 {
            for e in &mut self.axes[axis] {
                if e.slot == old {
                    e.slot = new;
                }
            }
        }
    }

    /// Writes the interval of one object from its current box, without
    /// re-sorting.
    pub(crate) fn write_values(&mut self, endpoints: &[[u32; 2]; 3], aabb: &Aabb) {
        for axis in 0..3 {
            self.axes[axis][endpoints[axis][0] as usize].value = aabb.mins[axis];
            self.axes[axis][endpoints[axis][1] as usize].value = aabb.maxs[axis];
        }
    }

    /// Restores sortedness by insertion sort, reporting every min/max
    /// crossing between two distinct objects. Min/min and max/max swaps
    /// cannot change any pair's overlap status and are not reported.
    pub(crate) fn sort_all(&mut self, objects: &mut [Object]) -> Vec<(u32, u32, usize)> {
        let mut events = Vec::new();

        for axis in 0..3 {
            let arr = &mut self.axes[axis];
            for i in 1..arr.len() {
                let cur = arr[i];
                let mut j = i;
                while j > 0 && arr[j - 1].key() > cur.key() {
                    let other = arr[j - 1];
                    if other.slot != cur.slot && other.is_max != cur.is_max {
                        events.push((other.slot, cur.slot, axis));
                    }
                    arr[j] = other;
                    objects[other.slot as usize].endpoints[axis][other.is_max as usize] = j as u32;
                    j -= 1;
                }
                arr[j] = cur;
                objects[cur.slot as usize].endpoints[axis][cur.is_max as usize] = j as u32;
            }
        }

        events
    }
}

use crate::mesh::INVALID;
use crate::query::WalkCache;

bitflags::bitflags! {
    /// Per-axis interval overlap bits of one object pair.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub(crate) struct AxisMask: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
    }
}

impl AxisMask {
    #[inline]
    pub(crate) fn axis(axis: usize) -> AxisMask {
        AxisMask::from_bits_truncate(1 << axis)
    }
}

/// The persistent state attached to one (unordered) pair of objects.
///
/// A pair is a broad-phase candidate ("overlapping") when it is active and
/// all three axis bits are set; such pairs sit in the scene's dense overlap
/// set, at position `overlap_index`.
#[derive(Clone, Debug)]
pub(crate) struct Pair {
    pub axis_bits: AxisMask,
    pub active: bool,
    /// Position in the scene's overlap set, or `INVALID` when not listed.
    pub overlap_index: u32,
    /// Cached closest-feature pairs from the previous query.
    pub cache: WalkCache,
}

impl Pair {
    pub(crate) fn new() -> Self {
        Pair {
            axis_bits: AxisMask::empty(),
            active: true,
            overlap_index: INVALID,
            cache: WalkCache::new(),
        }
    }

    /// Should this pair be listed as a broad-phase candidate?
    #[inline]
    pub(crate) fn should_overlap(&self) -> bool {
        self.active && self.axis_bits.is_all()
    }

    /// Is this pair currently listed?
    #[inline]
    pub(crate) fn is_listed(&self) -> bool {
        self.overlap_index != INVALID
    }
}

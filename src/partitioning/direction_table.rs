use crate::math::{Point, Real, Vector};

/// A quantized direction → support vertex table for one convex patch.
///
/// Directions are quantized on an octahedral grid; each cell stores a vertex
/// of the patch extremal along the cell center direction. The table amortizes
/// the search for a good starting feature of the closest-feature walk.
#[derive(Clone, Debug)]
pub struct DirectionTable {
    res: u32,
    entries: Vec<u32>,
}

impl DirectionTable {
    /// Builds the table for the given vertices.
    ///
    /// The resolution grows with the square root of the vertex count, capped
    /// at `max_res`.
    pub(crate) fn build<F>(vertex_ids: &[u32], pos: F, max_res: u32) -> Self
    where
        F: Fn(u32) -> Point<Real>,
    {
        let res = ((vertex_ids.len() as Real).sqrt() as u32).clamp(2, max_res.max(2));
        let mut entries = Vec::with_capacity((res * res) as usize);

        for cell in 0..res * res {
            let dir = decode(cell, res);
            let support = vertex_ids
                .iter()
                .copied()
                .max_by(|i, j| {
                    let di = dir.dot(&pos(*i).coords);
                    let dj = dir.dot(&pos(*j).coords);
                    di.partial_cmp(&dj).unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(0);
            entries.push(support);
        }

        DirectionTable { res, entries }
    }

    /// The stored support vertex for the cell containing `dir`.
    #[inline]
    pub fn seed(&self, dir: &Vector<Real>) -> u32 {
        self.entries[encode(dir, self.res) as usize]
    }

    /// An arbitrary stored vertex (used by the walk's random reseed).
    #[inline]
    pub(crate) fn entry(&self, i: usize) -> u32 {
        self.entries[i % self.entries.len()]
    }
}

/// Maps a direction to its octahedral grid cell.
fn encode(dir: &Vector<Real>, res: u32) -> u32 {
    let norm = dir.x.abs() + dir.y.abs() + dir.z.abs();
    if norm <= Real::EPSILON {
        return 0;
    }

    let mut u = dir.x / norm;
    let mut v = dir.y / norm;
    if dir.z < 0.0 {
        let (pu, pv) = (u, v);
        u = (1.0 - pv.abs()) * sign(pu);
        v = (1.0 - pu.abs()) * sign(pv);
    }

    let fres = res as Real;
    let iu = (((u + 1.0) * 0.5 * fres) as u32).min(res - 1);
    let iv = (((v + 1.0) * 0.5 * fres) as u32).min(res - 1);
    iv * res + iu
}

/// The center direction of an octahedral grid cell.
fn decode(cell: u32, res: u32) -> Vector<Real> {
    let fres = res as Real;
    let iu = (cell % res) as Real;
    let iv = (cell / res) as Real;
    let u = (iu + 0.5) / fres * 2.0 - 1.0;
    let v = (iv + 0.5) / fres * 2.0 - 1.0;

    let z = 1.0 - u.abs() - v.abs();
    let (x, y) = if z < 0.0 {
        ((1.0 - v.abs()) * sign(u), (1.0 - u.abs()) * sign(v))
    } else {
        (u, v)
    };

    Vector::new(x, y, z).normalize()
}

#[inline]
fn sign(x: Real) -> Real {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod test {
    use super::{decode, encode, DirectionTable};
    use crate::math::{Point, Vector};

    #[test]
    fn encode_decode_roundtrip_stays_in_cell() {
        let res = 8;
        for cell in 0..res * res {
            let dir = decode(cell, res);
            assert_eq!(encode(&dir, res), cell);
        }
    }

    #[test]
    fn seeds_are_extremal() {
        let pts = [
            Point::new(-1.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, -1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(0.0, 0.0, -1.0),
        ];
        let ids: Vec<u32> = (0..6).collect();
        let table = DirectionTable::build(&ids, |i| pts[i as usize], 4);

        assert_eq!(table.seed(&Vector::new(0.9, 0.05, 0.05)), 1);
        assert_eq!(table.seed(&Vector::new(-0.9, 0.05, 0.05)), 0);
    }
}

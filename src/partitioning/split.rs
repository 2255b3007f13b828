use crate::math::{Point, Real, UnitVector};
use crate::utils;
use ordered_float::OrderedFloat;

/// The strategy used to split a set of convex pieces in two when building
/// the bounding-volume hierarchy.
///
/// All strategies first project the pieces' centers of mass on the direction
/// of maximum spread, then cut the sorted projections in two groups.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum SplitStrategy {
    /// Split into two groups of equal count.
    Median,
    /// Split at the midpoint of the projection range.
    Midpoint,
    /// Split at the mean of the projections.
    Mean,
    /// Split at the single largest gap of the sorted projections, provided
    /// the gap lies within the central 60% of the range, is at least twice
    /// the runner-up gap and spans at least 10% of the range; falls back to
    /// [`SplitStrategy::Mean`] otherwise.
    #[default]
    Gap,
}

/// The direction of maximum spread of a set of points (principal axis of
/// their covariance matrix).
pub(crate) fn split_direction(pts: &[Point<Real>]) -> UnitVector<Real> {
    let (_, cov) = utils::center_cov(pts);
    let eig = cov.symmetric_eigen();
    let imax = eig.eigenvalues.imax();
    UnitVector::new_normalize(eig.eigenvectors.column(imax).into_owned())
}

/// Sorts `items` by their projection and returns the size of the first
/// group. Both groups are always non-empty.
pub(crate) fn partition_projections(
    items: &mut [(u32, Real)],
    strategy: SplitStrategy,
) -> usize {
    debug_assert!(items.len() >= 2);
    items.sort_unstable_by_key(|(_, proj)| OrderedFloat(*proj));

    let n = items.len();
    let min = items[0].1;
    let max = items[n - 1].1;
    let range = max - min;

    if range <= Real::EPSILON {
        return n / 2;
    }

    let cut_at_value = |value: Real| -> usize {
        items
            .iter()
            .position(|(_, proj)| *proj > value)
            .unwrap_or(n - 1)
            .clamp(1, n - 1)
    };

    match strategy {
        SplitStrategy::Median => n / 2,
        SplitStrategy::Midpoint => cut_at_value(min + range * 0.5),
        SplitStrategy::Mean => {
            let mean = items.iter().map(|(_, proj)| *proj).sum::<Real>() / n as Real;
            cut_at_value(mean)
        }
        SplitStrategy::Gap => {
            let mut best = (0.0, 0usize);
            let mut runner_up = 0.0;

            for i in 0..n - 1 {
                let gap = items[i + 1].1 - items[i].1;
                if gap > best.0 {
                    runner_up = best.0;
                    best = (gap, i);
                } else if gap > runner_up {
                    runner_up = gap;
                }
            }

            let (gap, i) = best;
            let gap_center = (items[i].1 + items[i + 1].1) * 0.5;
            let in_central_band =
                gap_center >= min + range * 0.2 && gap_center <= max - range * 0.2;

            if in_central_band && gap >= 2.0 * runner_up && gap >= range * 0.1 {
                i + 1
            } else {
                partition_projections(items, SplitStrategy::Mean)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{partition_projections, split_direction, SplitStrategy};
    use crate::math::Point;

    fn items(projs: &[f64]) -> Vec<(u32, f64)> {
        projs
            .iter()
            .enumerate()
            .map(|(i, p)| (i as u32, *p))
            .collect()
    }

    #[test]
    fn median_splits_counts_evenly() {
        let mut it = items(&[5.0, 1.0, 3.0, 2.0]);
        assert_eq!(partition_projections(&mut it, SplitStrategy::Median), 2);
        assert_eq!(it[0].1, 1.0);
        assert_eq!(it[3].1, 5.0);
    }

    #[test]
    fn gap_detects_a_dominant_central_gap() {
        // Large central gap between 2.0 and 8.0.
        let mut it = items(&[0.0, 1.0, 2.0, 8.0, 9.0, 10.0]);
        assert_eq!(partition_projections(&mut it, SplitStrategy::Gap), 3);
    }

    #[test]
    fn gap_falls_back_to_mean_on_uniform_spacing() {
        let mut it = items(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let k = partition_projections(&mut it, SplitStrategy::Gap);
        let mean_k = partition_projections(&mut it, SplitStrategy::Mean);
        assert_eq!(k, mean_k);
    }

    #[test]
    fn gap_ignores_gaps_near_the_extremes() {
        // The dominant gap (0.0 → 1.6) is centered in the lowest 20% of the
        // range, so the cut must fall back to the mean.
        let mut projs = vec![0.0];
        let mut x = 1.6;
        while x < 10.1 {
            projs.push(x);
            x += 0.7;
        }
        let mut it = items(&projs);
        let k = partition_projections(&mut it, SplitStrategy::Gap);
        let mean_k = partition_projections(&mut it, SplitStrategy::Mean);
        assert_eq!(k, mean_k);
        assert!(k > 1);
    }

    #[test]
    fn split_direction_follows_the_spread() {
        let pts = [
            Point::new(-10.0, 0.1, 0.0),
            Point::new(-5.0, -0.2, 0.1),
            Point::new(5.0, 0.2, -0.1),
            Point::new(10.0, -0.1, 0.0),
        ];
        let dir = split_direction(&pts);
        assert!(dir.x.abs() > 0.99);
    }
}

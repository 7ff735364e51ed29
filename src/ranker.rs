//! Endpoint ranking: the finite grid of critical probability values.
//!
//! For a fixed sample size `N`, a rule only ever reports intervals computed from the
//! `N + 1` possible counts of a category. Coverage as a function of the true probability
//! vector is piecewise constant between consecutive interval endpoints: membership of
//! `p_i` in a reported interval can only change when `p_i` crosses one of them. The sorted
//! set of endpoints strictly inside `(0, 1)` is therefore enough to locate the minimax over
//! the whole simplex.
//!
//! Endpoints are rounded with the query's [`Precision`] before deduplication; a different
//! precision can merge or split points and so change the answer.

use tracing::debug;

use crate::{Error, IntervalRule, Precision, Result};

/// Sorted, duplicate-free endpoints strictly inside `(0, 1)`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    points: Vec<f64>,
}

impl Grid {
    /// Build a grid from arbitrary values: keeps `0 < x < 1`, sorts, dedups.
    pub fn from_points(points: impl IntoIterator<Item = f64>) -> Self {
        let mut points: Vec<f64> = points
            .into_iter()
            .filter(|&x| x > 0.0 && x < 1.0)
            .collect();
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup();
        Self { points }
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Rank the interval endpoints `rule` can produce at sample size `n`, for two categories.
///
/// For each count `i` in `0..=n` the rule is queried on the outcome `[i, n - i]`, which
/// presents every proportion `i / n` to every category position. Both bounds of every
/// returned interval are rounded to `precision`; values in `(0, 1)` are kept.
///
/// Rules whose intervals depend on the number of categories need
/// [`rank_endpoints_for`] with the real `K`.
///
/// ```rust
/// use mincov::{rank_endpoints, FitzpatrickScott, Precision};
///
/// let fs = FitzpatrickScott::new(0.05).unwrap();
/// let grid = rank_endpoints(4, &fs, Precision::default()).unwrap();
/// assert_eq!(grid.points()[0], 0.0100090039);
/// ```
pub fn rank_endpoints<R>(n: u64, rule: &R, precision: Precision) -> Result<Grid>
where
    R: IntervalRule + ?Sized,
{
    rank_endpoints_for(n, 2, rule, precision)
}

/// [`rank_endpoints`] for `k` categories: the rule sees `[i, n - i, 0, ..., 0]`.
pub fn rank_endpoints_for<R>(n: u64, k: usize, rule: &R, precision: Precision) -> Result<Grid>
where
    R: IntervalRule + ?Sized,
{
    if n == 0 {
        return Err(Error::invalid("sample size N must be > 0"));
    }
    if k == 0 {
        return Err(Error::invalid("category count K must be > 0"));
    }

    let mut buf = Vec::with_capacity(k);
    let mut counts = vec![0u64; k];
    let mut raw: Vec<f64> = Vec::with_capacity(2 * k * (n as usize + 1));
    let first = if k == 1 { n } else { 0 };
    for i in first..=n {
        counts[0] = i;
        if k > 1 {
            counts[1] = n - i;
        }
        rule.intervals(&counts, &mut buf);
        for iv in &buf {
            raw.push(precision.round(iv.lo));
            raw.push(precision.round(iv.hi));
        }
    }

    let grid = Grid::from_points(raw);
    debug!(
        n,
        k,
        rule = rule.name(),
        digits = precision.digits(),
        grid_len = grid.len(),
        "ranked endpoints"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FitzpatrickScott, FixedIntervals, Interval, PerCategory, Wilson};
    use proptest::prelude::*;

    #[test]
    fn fitzpatrick_scott_grid_at_n4() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let grid = rank_endpoints(4, &fs, Precision::default()).unwrap();
        assert_eq!(
            grid.points(),
            &[
                0.0100090039,
                0.2600090039,
                0.4899909961,
                0.5100090039,
                0.7399909961,
                0.9899909961
            ]
        );
    }

    #[test]
    fn wilson_grid_at_n4() {
        let w = PerCategory(Wilson::new(0.05).unwrap());
        let grid = rank_endpoints(4, &w, Precision::default()).unwrap();
        assert_eq!(
            grid.points(),
            &[
                0.0455872608,
                0.1500389892,
                0.3006418426,
                0.4898908365,
                0.5101091635,
                0.6993581574,
                0.8499610108,
                0.9544127392
            ]
        );
    }

    /// Margin grows with the number of categories, Bonferroni style.
    struct WidensWithK;

    impl IntervalRule for WidensWithK {
        fn name(&self) -> &str {
            "widens_with_k"
        }

        fn alpha(&self) -> f64 {
            0.05
        }

        fn intervals(&self, counts: &[u64], out: &mut Vec<Interval>) {
            out.clear();
            let n: u64 = counts.iter().sum();
            let m = 0.05 * counts.len() as f64;
            out.extend(
                counts
                    .iter()
                    .map(|&c| Interval::clamped(c as f64 / n as f64 - m, c as f64 / n as f64 + m)),
            );
        }
    }

    #[test]
    fn category_dependent_rules_rank_at_their_own_k() {
        let p = Precision::default();
        let two = rank_endpoints(2, &WidensWithK, p).unwrap();
        assert_eq!(two.points(), &[0.1, 0.4, 0.6, 0.9]);
        assert_eq!(rank_endpoints_for(2, 2, &WidensWithK, p).unwrap(), two);

        let three = rank_endpoints_for(2, 3, &WidensWithK, p).unwrap();
        assert_eq!(three.points(), &[0.15, 0.35, 0.65, 0.85]);
    }

    #[test]
    fn k_independent_rules_rank_the_same_at_any_k() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let p = Precision::default();
        let base = rank_endpoints(7, &fs, p).unwrap();
        for k in 1..6 {
            let grid = rank_endpoints_for(7, k, &fs, p).unwrap();
            if k == 1 {
                assert!(grid.points().iter().all(|x| base.points().contains(x)));
            } else {
                assert_eq!(grid, base, "k={k}");
            }
        }
        assert!(rank_endpoints_for(7, 0, &fs, p).is_err());
    }

    #[test]
    fn zero_n_is_rejected() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        assert!(matches!(
            rank_endpoints(0, &fs, Precision::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn boundary_values_are_dropped() {
        let rule = FixedIntervals::new(
            "fixed",
            0.05,
            vec![Interval::new(0.0, 0.25), Interval::new(0.45, 1.0)],
        )
        .unwrap();
        let grid = rank_endpoints(3, &rule, Precision::default()).unwrap();
        assert_eq!(grid.points(), &[0.25, 0.45]);
    }

    #[test]
    fn coarser_precision_merges_points() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let fine = rank_endpoints(4, &fs, Precision::new(10)).unwrap();
        let coarse = rank_endpoints(4, &fs, Precision::new(1)).unwrap();
        assert!(coarse.len() < fine.len());
        assert_eq!(coarse.points(), &[0.3, 0.5, 0.7]);
    }

    proptest! {
        #[test]
        fn ranking_is_deterministic_sorted_and_interior(
            n in 1u64..60,
            alpha in 0.01f64..0.3,
        ) {
            let fs = FitzpatrickScott::new(alpha).unwrap();
            let a = rank_endpoints(n, &fs, Precision::default()).unwrap();
            let b = rank_endpoints(n, &fs, Precision::default()).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert!(a.points().windows(2).all(|w| w[0] < w[1]));
            prop_assert!(a.points().iter().all(|&x| x > 0.0 && x < 1.0));
        }
    }
}

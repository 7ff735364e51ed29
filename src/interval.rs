//! Confidence-interval rules for multinomial proportions.
//!
//! Two shapes exist:
//! - [`ScalarRule`]: `f(p_hat, n) -> [lo, hi]`, applied to each category independently.
//! - [`IntervalRule`]: `g(counts) -> [(lo_i, hi_i)]`, the joint form. It may couple
//!   categories (e.g. one margin computed once from `n`).
//!
//! The coverage engine only consumes the joint form. [`PerCategory`] lifts any scalar rule
//! into it, which is how the per-coordinate formulation is expressed.
//!
//! Concrete rules clamp both bounds into `[0, 1]`.

use crate::normal::two_sided_z;
use crate::{Error, Precision, Result};

/// Closed interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    /// The whole unit interval (what a rule reports when it has no data).
    pub const UNIT: Self = Self { lo: 0.0, hi: 1.0 };

    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Build `[lo, hi]` with both ends clamped into `[0, 1]`.
    pub fn clamped(lo: f64, hi: f64) -> Self {
        Self {
            lo: lo.clamp(0.0, 1.0),
            hi: hi.clamp(0.0, 1.0),
        }
    }

    /// Inclusive membership after rounding `x` and both bounds to `precision`.
    ///
    /// Grid points are rounded endpoints, so an unrounded comparison would flip on the last
    /// bit of a bound that was recomputed from a different count vector.
    #[inline]
    pub fn contains(&self, x: f64, precision: Precision) -> bool {
        let x = precision.round(x);
        precision.round(self.lo) <= x && x <= precision.round(self.hi)
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }
}

/// Joint interval rule: per-category intervals from a full count vector.
///
/// Implementations must be pure: the same counts always produce the same intervals. The
/// length of `counts` is the category count `K`; a rule whose intervals depend on it must be
/// ranked with [`rank_endpoints_for`](crate::rank_endpoints_for) at that `K`.
pub trait IntervalRule: Send + Sync {
    /// Name recorded alongside results.
    fn name(&self) -> &str;

    /// Significance level (`1 - nominal coverage`).
    fn alpha(&self) -> f64;

    /// Write one interval per category of `counts` into `out` (cleared first).
    fn intervals(&self, counts: &[u64], out: &mut Vec<Interval>);
}

/// Scalar interval rule: one interval from an estimated proportion and sample size.
pub trait ScalarRule: Send + Sync {
    fn name(&self) -> &str;

    fn alpha(&self) -> f64;

    /// Interval for a proportion `p_hat` estimated from `n` draws.
    fn interval(&self, p_hat: f64, n: u64) -> Interval;
}

/// Adapter running a [`ScalarRule`] independently on every category (`p_hat = count / n`).
#[derive(Debug, Clone, Copy)]
pub struct PerCategory<R>(pub R);

impl<R: ScalarRule> IntervalRule for PerCategory<R> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn alpha(&self) -> f64 {
        self.0.alpha()
    }

    fn intervals(&self, counts: &[u64], out: &mut Vec<Interval>) {
        out.clear();
        let n: u64 = counts.iter().sum();
        if n == 0 {
            out.resize(counts.len(), Interval::UNIT);
            return;
        }
        let nf = n as f64;
        out.extend(counts.iter().map(|&c| self.0.interval(c as f64 / nf, n)));
    }
}

fn critical_value(alpha: f64) -> Result<f64> {
    let z = two_sided_z(alpha);
    if z.is_finite() && z > 0.0 {
        Ok(z)
    } else {
        Err(Error::invalid(format!("alpha must lie in (0, 1), got {alpha}")))
    }
}

/// Fitzpatrick & Scott simultaneous intervals: `p_hat ± z / (2 sqrt(n))`.
///
/// The margin depends only on `n`, so the joint form computes it once per count vector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitzpatrickScott {
    alpha: f64,
    z: f64,
}

impl FitzpatrickScott {
    pub const NAME: &'static str = "Fitzpatrick_and_Scott";

    pub fn new(alpha: f64) -> Result<Self> {
        Ok(Self {
            alpha,
            z: critical_value(alpha)?,
        })
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// Half-width shared by every category at sample size `n`.
    pub fn margin(&self, n: u64) -> f64 {
        self.z / (2.0 * (n as f64).sqrt())
    }
}

impl ScalarRule for FitzpatrickScott {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn interval(&self, p_hat: f64, n: u64) -> Interval {
        if n == 0 {
            return Interval::UNIT;
        }
        let m = self.margin(n);
        Interval::clamped(p_hat - m, p_hat + m)
    }
}

impl IntervalRule for FitzpatrickScott {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn intervals(&self, counts: &[u64], out: &mut Vec<Interval>) {
        out.clear();
        let n: u64 = counts.iter().sum();
        if n == 0 {
            out.resize(counts.len(), Interval::UNIT);
            return;
        }
        let nf = n as f64;
        let m = self.margin(n);
        out.extend(counts.iter().map(|&c| {
            let p_hat = c as f64 / nf;
            Interval::clamped(p_hat - m, p_hat + m)
        }));
    }
}

/// Wilson score interval, per category.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Wilson {
    alpha: f64,
    z: f64,
}

impl Wilson {
    pub const NAME: &'static str = "Wilson";

    pub fn new(alpha: f64) -> Result<Self> {
        Ok(Self {
            alpha,
            z: critical_value(alpha)?,
        })
    }
}

impl ScalarRule for Wilson {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn interval(&self, p_hat: f64, n: u64) -> Interval {
        if n == 0 {
            return Interval::UNIT;
        }
        let n = n as f64;
        let p = p_hat.clamp(0.0, 1.0);
        let z2 = self.z * self.z;

        // center = (p + z^2/(2n)) / (1 + z^2/n)
        // radius = z * sqrt(p(1-p)/n + z^2/(4n^2)) / (1 + z^2/n)
        let denom = 1.0 + z2 / n;
        let center = (p + z2 / (2.0 * n)) / denom;
        let rad = (self.z * ((p * (1.0 - p) / n) + (z2 / (4.0 * n * n))).sqrt()) / denom;
        Interval::clamped(center - rad, center + rad)
    }
}

/// Wald (normal-approximation) interval: `p_hat ± z sqrt(p_hat (1 - p_hat) / n)`.
///
/// Degenerates to a point at `p_hat ∈ {0, 1}`; kept as the classic bad example.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Wald {
    alpha: f64,
    z: f64,
}

impl Wald {
    pub const NAME: &'static str = "Wald";

    pub fn new(alpha: f64) -> Result<Self> {
        Ok(Self {
            alpha,
            z: critical_value(alpha)?,
        })
    }
}

impl ScalarRule for Wald {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn interval(&self, p_hat: f64, n: u64) -> Interval {
        if n == 0 {
            return Interval::UNIT;
        }
        let p = p_hat.clamp(0.0, 1.0);
        let m = self.z * (p * (1.0 - p) / n as f64).sqrt();
        Interval::clamped(p - m, p + m)
    }
}

/// A rule that ignores the data and always reports the same interval set.
///
/// Useful as a fixture: coverage under it is either the full lattice mass or nothing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedIntervals {
    name: String,
    alpha: f64,
    set: Vec<Interval>,
}

impl FixedIntervals {
    pub fn new(name: impl Into<String>, alpha: f64, set: Vec<Interval>) -> Result<Self> {
        if let Some(bad) = set.iter().find(|iv| !(iv.lo <= iv.hi)) {
            return Err(Error::invalid(format!(
                "fixed interval [{}, {}] has lo > hi",
                bad.lo, bad.hi
            )));
        }
        Ok(Self {
            name: name.into(),
            alpha,
            set,
        })
    }

    pub fn set(&self) -> &[Interval] {
        &self.set
    }
}

impl IntervalRule for FixedIntervals {
    fn name(&self) -> &str {
        &self.name
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn intervals(&self, _counts: &[u64], out: &mut Vec<Interval>) {
        out.clear();
        out.extend_from_slice(&self.set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fitzpatrick_scott_margin_matches_formula() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        assert!((fs.margin(4) - 1.959_963_984_540_053_6 / 4.0).abs() < 1e-15);
        let iv = ScalarRule::interval(&fs, 0.5, 100);
        assert!((iv.lo - (0.5 - fs.margin(100))).abs() < 1e-15);
        assert!((iv.hi - (0.5 + fs.margin(100))).abs() < 1e-15);
    }

    #[test]
    fn joint_and_per_category_forms_agree_for_fitzpatrick_scott() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let per = PerCategory(fs);
        let (mut a, mut b) = (Vec::new(), Vec::new());
        for counts in [[0u64, 3, 7], [10, 0, 0], [2, 2, 6]] {
            IntervalRule::intervals(&fs, &counts, &mut a);
            per.intervals(&counts, &mut b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn invalid_alpha_is_rejected() {
        assert!(FitzpatrickScott::new(0.0).is_err());
        assert!(Wilson::new(1.5).is_err());
        assert!(Wald::new(f64::NAN).is_err());
    }

    #[test]
    fn wilson_is_never_degenerate_at_zero_counts() {
        let w = Wilson::new(0.05).unwrap();
        let iv = w.interval(0.0, 20);
        assert_eq!(iv.lo, 0.0);
        assert!(iv.hi > 0.0);
    }

    #[test]
    fn wald_collapses_at_the_boundary() {
        let w = Wald::new(0.05).unwrap();
        let iv = w.interval(0.0, 20);
        assert_eq!((iv.lo, iv.hi), (0.0, 0.0));
    }

    #[test]
    fn zero_sample_reports_unit_interval() {
        let per = PerCategory(Wilson::new(0.05).unwrap());
        let mut out = Vec::new();
        per.intervals(&[0, 0], &mut out);
        assert_eq!(out, vec![Interval::UNIT, Interval::UNIT]);
    }

    #[test]
    fn fixed_intervals_ignore_counts() {
        let set = vec![Interval::new(0.0, 0.25), Interval::new(0.45, 0.6)];
        let rule = FixedIntervals::new("fixed", 0.05, set.clone()).unwrap();
        let mut out = Vec::new();
        rule.intervals(&[1, 2, 3], &mut out);
        assert_eq!(out, set);
        assert!(FixedIntervals::new("bad", 0.05, vec![Interval::new(0.6, 0.4)]).is_err());
    }

    #[test]
    fn membership_is_inclusive_after_rounding() {
        let p = Precision::default();
        let iv = Interval::new(0.1 + 0.2, 0.5);
        assert!(iv.contains(0.3, p));
        assert!(iv.contains(0.5, p));
        assert!(!iv.contains(0.500_000_001, p));
    }

    proptest! {
        #[test]
        fn scalar_rules_stay_inside_unit_interval(
            count in 0u64..200,
            extra in 1u64..200,
            alpha in 0.001f64..0.5,
        ) {
            let n = count + extra;
            let p_hat = count as f64 / n as f64;
            let rules: [&dyn ScalarRule; 3] = [
                &FitzpatrickScott::new(alpha).unwrap(),
                &Wilson::new(alpha).unwrap(),
                &Wald::new(alpha).unwrap(),
            ];
            for r in rules {
                let iv = r.interval(p_hat, n);
                prop_assert!(0.0 <= iv.lo && iv.lo <= iv.hi && iv.hi <= 1.0,
                    "{}: [{}, {}]", r.name(), iv.lo, iv.hi);
                prop_assert!(iv.lo <= p_hat + 1e-12 && p_hat <= iv.hi + 1e-12);
            }
        }
    }
}

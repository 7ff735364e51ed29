//! Exact coverage probability over the multinomial outcome lattice.
//!
//! For a sample size `N` and a completed probability vector `p` of length `K`, coverage is
//!
//! ```text
//!   C(p) = sum_{x : |x| = N} [ p_i in I_i(x) for every checked i ] * N!/prod(x_i!) * prod(p_i^x_i)
//! ```
//!
//! where `I(x)` are the intervals the rule reports for outcome `x`. The lattice has
//! `C(N + K - 1, K - 1)` points.
//!
//! Numerics:
//! - masses are computed in the log domain from a `ln k!` table built once per engine, so
//!   nothing overflows for large `N` (a term that underflows is genuinely negligible);
//! - `0^0 = 1`: a zero count contributes no factor, and a positive count on a zero-probability
//!   category makes the outcome impossible (skipped, never evaluated as `0 * ln 0`);
//! - partial sums use compensated (Neumaier) summation.
//!
//! Parallelism: the lattice is split into slabs by the first count. Slab sums are collected
//! in slab order and folded sequentially, so the result is identical with or without rayon.

use rayon::prelude::*;
use tracing::trace;

use crate::simplex::validate_complete;
use crate::{Budget, EngineConfig, Error, IntervalRule, Result};

/// `ln k!` for `k in 0..=n`.
#[derive(Debug, Clone)]
pub struct LogFactorial {
    table: Vec<f64>,
}

impl LogFactorial {
    pub fn new(n: u64) -> Result<Self> {
        let len = usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| Error::invalid(format!("sample size {n} is too large")))?;
        let mut table = Vec::with_capacity(len);
        let mut acc = 0.0f64;
        table.push(acc);
        for k in 1..len {
            acc += (k as f64).ln();
            table.push(acc);
        }
        Ok(Self { table })
    }

    /// Largest `k` covered by the table.
    pub fn max(&self) -> u64 {
        (self.table.len() - 1) as u64
    }

    /// `ln k!`, or `None` past [`max`](Self::max).
    pub fn get(&self, k: u64) -> Option<f64> {
        usize::try_from(k).ok().and_then(|k| self.table.get(k)).copied()
    }

    /// Unchecked `ln k!` for counts already bounded by the table's `n`.
    #[inline]
    pub(crate) fn ln(&self, k: u64) -> f64 {
        self.table[k as usize]
    }

    /// `ln( n! / prod(x_i!) * prod(p_i^x_i) )` given `ln p_i`; `-inf` for impossible outcomes.
    #[inline]
    fn ln_pmf(&self, counts: &[u64], ln_p: &[f64]) -> f64 {
        let n: u64 = counts.iter().sum();
        let mut acc = self.ln(n);
        for (&x, &lp) in counts.iter().zip(ln_p) {
            if x == 0 {
                continue;
            }
            if lp == f64::NEG_INFINITY {
                return f64::NEG_INFINITY;
            }
            acc += x as f64 * lp - self.ln(x);
        }
        acc
    }
}

/// Compensated running sum (Neumaier's variant of Kahan summation).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CompensatedSum {
    sum: f64,
    comp: f64,
}

impl CompensatedSum {
    #[inline]
    pub(crate) fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.comp += (self.sum - t) + x;
        } else {
            self.comp += (x - t) + self.sum;
        }
        self.sum = t;
    }

    pub(crate) fn total(self) -> f64 {
        self.sum + self.comp
    }
}

impl FromIterator<f64> for CompensatedSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::default();
        for x in iter {
            acc.add(x);
        }
        acc
    }
}

/// Number of count vectors of length `k` summing to `n`: `C(n + k - 1, k - 1)`, saturating.
#[must_use]
pub fn lattice_size(n: u64, k: usize) -> u128 {
    if k == 0 {
        return u128::from(n == 0);
    }
    let m = (k - 1) as u128;
    let n = u128::from(n);
    let mut acc: u128 = 1;
    for i in 1..=m {
        acc = match acc.checked_mul(n + i) {
            Some(x) => x / i,
            None => return u128::MAX,
        };
    }
    acc
}

/// Multinomial probability of `counts` under `p` (`N = sum(counts)`).
pub fn multinomial_pmf(counts: &[u64], p: &[f64]) -> Result<f64> {
    if counts.len() != p.len() {
        return Err(Error::invalid(format!(
            "counts have length {}, probabilities {}",
            counts.len(),
            p.len()
        )));
    }
    validate_complete(p)?;
    let n: u64 = counts.iter().sum();
    let lf = LogFactorial::new(n)?;
    let ln_p: Vec<f64> = p.iter().map(|x| x.ln()).collect();
    Ok(lf.ln_pmf(counts, &ln_p).exp())
}

/// Total multinomial mass over the whole lattice (1 up to rounding for any valid `p`).
pub fn total_mass(n: u64, p: &[f64]) -> Result<f64> {
    validate_complete(p)?;
    let lf = LogFactorial::new(n)?;
    let ln_p: Vec<f64> = p.iter().map(|x| x.ln()).collect();
    let mut acc = CompensatedSum::default();
    let mut counts = Vec::with_capacity(p.len());
    for_each_composition(n, p.len(), &mut counts, &mut |x| {
        acc.add(lf.ln_pmf(x, &ln_p).exp());
        Ok(())
    })?;
    Ok(acc.total())
}

/// Visit every length-`parts` count vector summing to `total`, appended after `counts`.
fn for_each_composition<F>(
    total: u64,
    parts: usize,
    counts: &mut Vec<u64>,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(&[u64]) -> Result<()>,
{
    match parts {
        0 => Ok(()),
        1 => {
            counts.push(total);
            let r = visit(counts.as_slice());
            counts.pop();
            r
        }
        _ => {
            for x in 0..=total {
                counts.push(x);
                let r = for_each_composition(total - x, parts - 1, counts, visit);
                counts.pop();
                r?;
            }
            Ok(())
        }
    }
}

/// Coverage evaluator for one `(N, rule, config)`.
///
/// Holds the log-factorial table so evaluating many candidates does not rebuild it.
pub struct CoverageEngine<'r, R: ?Sized> {
    n: u64,
    rule: &'r R,
    cfg: EngineConfig,
    log_fact: LogFactorial,
}

impl<'r, R> CoverageEngine<'r, R>
where
    R: IntervalRule + ?Sized,
{
    pub fn new(n: u64, rule: &'r R, cfg: EngineConfig) -> Result<Self> {
        if n == 0 {
            return Err(Error::invalid("sample size N must be > 0"));
        }
        Ok(Self {
            n,
            rule,
            cfg,
            log_fact: LogFactorial::new(n)?,
        })
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn rule(&self) -> &R {
        self.rule
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Coverage of the completed vector `p`, with no budget.
    pub fn coverage(&self, p: &[f64]) -> Result<f64> {
        self.coverage_with_budget(p, &Budget::unbounded())
    }

    /// Coverage of the completed vector `p`, checking `budget` once per slab.
    pub fn coverage_with_budget(&self, p: &[f64], budget: &Budget) -> Result<f64> {
        validate_complete(p)?;
        let k = p.len();
        let ln_p: Vec<f64> = p.iter().map(|x| x.ln()).collect();

        // With K = 1 the only outcome is [N].
        let starts: Vec<u64> = if k == 1 {
            vec![self.n]
        } else {
            (0..=self.n).collect()
        };
        let slab = |&x0: &u64| self.slab(x0, p, &ln_p, budget);
        let partials: Vec<f64> = if self.cfg.parallel {
            starts.par_iter().map(slab).collect::<Result<Vec<f64>>>()?
        } else {
            starts.iter().map(slab).collect::<Result<Vec<f64>>>()?
        };

        let total = partials.into_iter().collect::<CompensatedSum>().total();
        if !total.is_finite() {
            return Err(Error::NumericOverflow("coverage sum"));
        }
        let c = total.clamp(0.0, 1.0);
        trace!(n = self.n, k, rule = self.rule.name(), coverage = c, "coverage");
        Ok(c)
    }

    /// Sum over the outcomes whose first count is `x0`.
    fn slab(&self, x0: u64, p: &[f64], ln_p: &[f64], budget: &Budget) -> Result<f64> {
        budget.check()?;
        let k = p.len();
        if x0 > 0 && ln_p[0] == f64::NEG_INFINITY {
            return Ok(0.0);
        }
        let checked = if self.cfg.check_residual { k } else { k - 1 };
        let precision = self.cfg.precision;

        let mut acc = CompensatedSum::default();
        let mut ivs = Vec::with_capacity(k);
        let mut counts = Vec::with_capacity(k);
        counts.push(x0);
        let mut visit = |x: &[u64]| -> Result<()> {
            let ln_mass = self.log_fact.ln_pmf(x, ln_p);
            if ln_mass == f64::NEG_INFINITY {
                return Ok(());
            }
            self.rule.intervals(x, &mut ivs);
            if ivs.len() != k {
                return Err(Error::invalid(format!(
                    "rule `{}` returned {} intervals for {k} categories",
                    self.rule.name(),
                    ivs.len()
                )));
            }
            let covered = ivs[..checked]
                .iter()
                .zip(p)
                .all(|(iv, &pi)| iv.contains(pi, precision));
            if covered {
                acc.add(ln_mass.exp());
            }
            Ok(())
        };

        if k == 1 {
            visit(counts.as_slice())?;
        } else {
            for_each_composition(self.n - x0, k - 1, &mut counts, &mut visit)?;
        }
        Ok(acc.total())
    }
}

/// One-shot coverage of the completed vector `p` at sample size `n`.
pub fn coverage_probability<R>(n: u64, p: &[f64], rule: &R, cfg: &EngineConfig) -> Result<f64>
where
    R: IntervalRule + ?Sized,
{
    CoverageEngine::new(n, rule, *cfg)?.coverage(p)
}

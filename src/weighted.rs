//! Weighted representative selection.
//!
//! Not a minimax search. Every candidate gets a coverage `c` and a weight `w`; the
//! weight-skewed average coverage `sum(c w) / sum(w)` is computed, and the candidate whose
//! coverage is closest to that average is reported. The result describes a "typical" hard
//! case under the weighting, not the worst case.

use tracing::{debug, info};

use crate::coverage::CompensatedSum;
use crate::search::evaluate_candidates;
use crate::{Budget, CandidateSet, EngineConfig, Error, IntervalRule, Result};

/// Non-negative weight over completed `K`-vectors.
///
/// Implementations return NaN for inputs they cannot weigh (wrong length, say); the
/// minimizer rejects non-finite and negative weights with [`Error::InvalidWeight`].
pub trait WeightFunction: Send + Sync {
    fn name(&self) -> &str;

    fn weight(&self, p: &[f64]) -> f64;
}

/// The same weight everywhere. With it the skewed average is the plain mean coverage.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstantWeight {
    pub value: f64,
}

impl Default for ConstantWeight {
    fn default() -> Self {
        Self { value: 1.0 }
    }
}

impl WeightFunction for ConstantWeight {
    fn name(&self) -> &str {
        "constant"
    }

    fn weight(&self, _p: &[f64]) -> f64 {
        self.value
    }
}

/// Named closure as a [`WeightFunction`].
pub struct FnWeight<F> {
    name: String,
    f: F,
}

impl<F> FnWeight<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> WeightFunction for FnWeight<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self, p: &[f64]) -> f64 {
        (self.f)(p)
    }
}

/// Output of [`find_representative`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Representative {
    /// `sum(c w) / sum(w)` over the candidate set.
    pub skewed_average: f64,
    /// Completed `K`-vector whose coverage is closest to `skewed_average`.
    pub vector: Vec<f64>,
    pub coverage: f64,
    /// `|coverage - skewed_average|`.
    pub distance: f64,
    pub index: usize,
}

impl Representative {
    /// `1 - coverage` of the representative.
    pub fn risk(&self) -> f64 {
        1.0 - self.coverage
    }
}

/// Candidate whose coverage is closest to the weight-skewed average coverage.
///
/// Errors: [`Error::EmptyCandidateSet`] for no candidates, [`Error::InvalidWeight`] for a
/// negative or non-finite weight, [`Error::ZeroTotalWeight`] when every weight is zero.
/// Ties on distance keep the earliest candidate.
pub fn find_representative<R, W>(
    n: u64,
    candidates: &CandidateSet,
    rule: &R,
    weight: &W,
    cfg: &EngineConfig,
) -> Result<Representative>
where
    R: IntervalRule + ?Sized,
    W: WeightFunction + ?Sized,
{
    find_representative_with_budget(n, candidates, rule, weight, cfg, &Budget::from_config(cfg))
}

/// [`find_representative`] under an explicit budget.
pub fn find_representative_with_budget<R, W>(
    n: u64,
    candidates: &CandidateSet,
    rule: &R,
    weight: &W,
    cfg: &EngineConfig,
    budget: &Budget,
) -> Result<Representative>
where
    R: IntervalRule + ?Sized,
    W: WeightFunction + ?Sized,
{
    if candidates.is_empty() {
        return Err(Error::EmptyCandidateSet);
    }
    let evaluated = evaluate_candidates(n, candidates, rule, cfg, budget)?;

    let weights = evaluated
        .iter()
        .map(|c| {
            let w = weight.weight(&c.vector);
            if w.is_finite() && w >= 0.0 {
                Ok(w)
            } else {
                Err(Error::InvalidWeight {
                    name: weight.name().to_string(),
                    value: w,
                })
            }
        })
        .collect::<Result<Vec<f64>>>()?;

    // Scale by the largest weight so the sums stay finite; the ratio is unchanged.
    let max_w = weights.iter().copied().fold(0.0f64, f64::max);
    if max_w <= 0.0 {
        return Err(Error::ZeroTotalWeight);
    }
    let mut weighted = CompensatedSum::default();
    let mut total = CompensatedSum::default();
    for (c, &w) in evaluated.iter().zip(&weights) {
        let w = w / max_w;
        weighted.add(c.coverage * w);
        total.add(w);
    }
    let total = total.total();
    if total <= 0.0 {
        return Err(Error::ZeroTotalWeight);
    }
    let skewed_average = weighted.total() / total;
    if !skewed_average.is_finite() {
        return Err(Error::NumericOverflow("weighted average"));
    }
    debug!(weight = weight.name(), total_weight = total, skewed_average, "weighted coverage");

    let mut best: Option<(usize, f64)> = None;
    for (i, c) in evaluated.iter().enumerate() {
        let d = (c.coverage - skewed_average).abs();
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    let (index, distance) = best.ok_or(Error::EmptyCandidateSet)?;
    let chosen = &evaluated[index];

    info!(
        n,
        rule = rule.name(),
        weight = weight.name(),
        candidates = candidates.len(),
        skewed_average,
        coverage = chosen.coverage,
        "representative found"
    );
    Ok(Representative {
        skewed_average,
        vector: chosen.vector.clone(),
        coverage: chosen.coverage,
        distance,
        index,
    })
}

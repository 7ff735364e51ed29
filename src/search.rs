//! Minimax search: the candidate with the lowest coverage.
//!
//! Each candidate is completed to `K` components and handed to the [`CoverageEngine`].
//! Candidates are evaluated in parallel but reduced in candidate order, and ties keep the
//! first candidate, so the minimizer is reproducible.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    Budget, CandidateSet, CoverageEngine, EngineConfig, Error, IntervalRule, Result, complete,
};

/// Coverage of one completed candidate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateCoverage {
    /// Completed `K`-vector.
    pub vector: Vec<f64>,
    pub coverage: f64,
}

/// Output of [`find_minimizer`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Minimizer {
    /// Minimal coverage over the candidate set.
    pub value: f64,
    /// Completed `K`-vector attaining it.
    pub vector: Vec<f64>,
    /// Position of the minimizer in the candidate set.
    pub index: usize,
}

impl Minimizer {
    /// `1 - value`.
    pub fn risk(&self) -> f64 {
        1.0 - self.value
    }
}

/// Coverage of every candidate, in candidate order.
pub fn evaluate_candidates<R>(
    n: u64,
    candidates: &CandidateSet,
    rule: &R,
    cfg: &EngineConfig,
    budget: &Budget,
) -> Result<Vec<CandidateCoverage>>
where
    R: IntervalRule + ?Sized,
{
    let engine = CoverageEngine::new(n, rule, *cfg)?;
    let eval = |v: &Vec<f64>| -> Result<CandidateCoverage> {
        budget.check()?;
        let vector = complete(v, cfg.precision)?;
        let coverage = engine.coverage_with_budget(&vector, budget)?;
        Ok(CandidateCoverage { vector, coverage })
    };
    let out = if cfg.parallel {
        candidates
            .as_slice()
            .par_iter()
            .map(eval)
            .collect::<Result<Vec<_>>>()
    } else {
        candidates.as_slice().iter().map(eval).collect::<Result<Vec<_>>>()
    };
    out.inspect_err(|e| {
        if e.is_budget_exhausted() {
            warn!(n, rule = rule.name(), error = %e, "candidate evaluation stopped");
        }
    })
}

/// Minimal coverage over `candidates` and the candidate attaining it.
///
/// Ties keep the earliest candidate. An empty set is [`Error::EmptyCandidateSet`].
///
/// ```rust
/// use mincov::{find_minimizer, generate_candidates, rank_endpoints, EngineConfig, FitzpatrickScott};
///
/// let cfg = EngineConfig::default();
/// let fs = FitzpatrickScott::new(0.05).unwrap();
/// let grid = rank_endpoints(4, &fs, cfg.precision).unwrap();
/// let candidates = generate_candidates(2, &grid, &cfg).unwrap();
/// let min = find_minimizer(4, &candidates, &fs, &cfg).unwrap();
/// assert!(min.value <= 1.0 && min.risk() >= 0.0);
/// assert_eq!(min.vector.len(), 3);
/// ```
pub fn find_minimizer<R>(
    n: u64,
    candidates: &CandidateSet,
    rule: &R,
    cfg: &EngineConfig,
) -> Result<Minimizer>
where
    R: IntervalRule + ?Sized,
{
    find_minimizer_with_budget(n, candidates, rule, cfg, &Budget::from_config(cfg))
}

/// [`find_minimizer`] under an explicit budget.
pub fn find_minimizer_with_budget<R>(
    n: u64,
    candidates: &CandidateSet,
    rule: &R,
    cfg: &EngineConfig,
    budget: &Budget,
) -> Result<Minimizer>
where
    R: IntervalRule + ?Sized,
{
    if candidates.is_empty() {
        return Err(Error::EmptyCandidateSet);
    }
    let evaluated = evaluate_candidates(n, candidates, rule, cfg, budget)?;

    let mut best: Option<(usize, CandidateCoverage)> = None;
    for (i, c) in evaluated.into_iter().enumerate() {
        match &best {
            Some((_, b)) if c.coverage >= b.coverage => {}
            _ => best = Some((i, c)),
        }
    }
    let (index, best) = best.ok_or(Error::EmptyCandidateSet)?;

    info!(
        n,
        k = candidates.dim() + 1,
        rule = rule.name(),
        candidates = candidates.len(),
        min = best.coverage,
        "minimax search finished"
    );
    Ok(Minimizer {
        value: best.coverage,
        vector: best.vector,
        index,
    })
}

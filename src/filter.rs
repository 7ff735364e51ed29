//! Candidate filters: boolean predicates over completed `K`-vectors.
//!
//! A predicate narrows the search to a region of the simplex (skewed, sparse, dominated
//! vectors, ...). Log-based formulas skip zero components (`0 ln 0 = 0`).

use tracing::debug;

use crate::{CandidateSet, Precision, Result};

/// Named boolean condition on a completed probability vector.
pub trait Predicate: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, p: &[f64]) -> bool;
}

/// Keep the candidates whose completed vector satisfies `predicate`.
///
/// Candidates stay in `(K-1)` form and keep their relative order.
pub fn filter_candidates<P>(
    candidates: CandidateSet,
    predicate: &P,
    precision: Precision,
) -> Result<CandidateSet>
where
    P: Predicate + ?Sized,
{
    let before = candidates.len();
    let kept = candidates.retain_completed(precision, |p| predicate.evaluate(p))?;
    debug!(
        predicate = predicate.name(),
        before,
        after = kept.len(),
        "filtered candidates"
    );
    Ok(kept)
}

fn descending(p: &[f64]) -> Vec<f64> {
    let mut v = p.to_vec();
    v.sort_by(|a, b| b.total_cmp(a));
    v
}

/// `min(p) < threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinProbBelow {
    pub threshold: f64,
}

impl Default for MinProbBelow {
    fn default() -> Self {
        Self { threshold: 0.01 }
    }
}

impl Predicate for MinProbBelow {
    fn name(&self) -> &str {
        "min_prob_small"
    }

    fn evaluate(&self, p: &[f64]) -> bool {
        p.iter().copied().reduce(f64::min).is_some_and(|m| m < self.threshold)
    }
}

/// `ln(K) - H(p) >= threshold`, with `H(p) = -sum p ln p` over non-zero `p`.
///
/// Always false for `K <= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntropyDeficit {
    pub threshold: f64,
}

impl Default for EntropyDeficit {
    fn default() -> Self {
        Self { threshold: 0.1 }
    }
}

impl EntropyDeficit {
    /// Shannon entropy in nats.
    pub fn entropy(p: &[f64]) -> f64 {
        -p.iter().filter(|&&x| x > 0.0).map(|&x| x * x.ln()).sum::<f64>()
    }
}

impl Predicate for EntropyDeficit {
    fn name(&self) -> &str {
        "entropy_lower_than_uniform"
    }

    fn evaluate(&self, p: &[f64]) -> bool {
        if p.len() <= 1 {
            return false;
        }
        (p.len() as f64).ln() - Self::entropy(p) >= self.threshold
    }
}

/// Fraction of components below `threshold` is at least `proportion`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sparsity {
    pub threshold: f64,
    pub proportion: f64,
}

impl Default for Sparsity {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            proportion: 0.8,
        }
    }
}

impl Predicate for Sparsity {
    fn name(&self) -> &str {
        "sparsity"
    }

    fn evaluate(&self, p: &[f64]) -> bool {
        if p.is_empty() {
            return false;
        }
        let small = p.iter().filter(|&&x| x < self.threshold).count();
        small as f64 / p.len() as f64 >= self.proportion
    }
}

/// Largest component exceeds `ratio` times the second largest.
///
/// True for `K <= 1`, and whenever the second largest is zero but the largest is not.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decisiveness {
    pub ratio: f64,
}

impl Default for Decisiveness {
    fn default() -> Self {
        Self { ratio: 2.0 }
    }
}

impl Predicate for Decisiveness {
    fn name(&self) -> &str {
        "decisiveness"
    }

    fn evaluate(&self, p: &[f64]) -> bool {
        let sorted = descending(p);
        match sorted.as_slice() {
            [] | [_] => true,
            [top, second, ..] if *second == 0.0 => *top > 0.0,
            [top, second, ..] => top / second > self.ratio,
        }
    }
}

/// Share of the `k` largest components is at least `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopKDominance {
    pub k: usize,
    pub threshold: f64,
}

impl Default for TopKDominance {
    fn default() -> Self {
        Self {
            k: 2,
            threshold: 0.75,
        }
    }
}

impl Predicate for TopKDominance {
    fn name(&self) -> &str {
        "top_k_dominance"
    }

    fn evaluate(&self, p: &[f64]) -> bool {
        let sorted = descending(p);
        let total: f64 = sorted.iter().sum();
        if total <= 0.0 {
            return false;
        }
        let top: f64 = sorted.iter().take(self.k).sum();
        top / total >= self.threshold
    }
}

/// At least one component strictly above `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaxAbove {
    pub threshold: f64,
}

impl Default for MaxAbove {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Predicate for MaxAbove {
    fn name(&self) -> &str {
        "max_above"
    }

    fn evaluate(&self, p: &[f64]) -> bool {
        p.iter().any(|&x| x > self.threshold)
    }
}

/// Named closure as a [`Predicate`].
pub struct FnPredicate<F> {
    name: String,
    f: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&[f64]) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&[f64]) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, p: &[f64]) -> bool {
        (self.f)(p)
    }
}

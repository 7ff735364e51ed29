//! Candidate generation: canonical `(K-1)`-vectors drawn from the endpoint grid.
//!
//! Coverage is symmetric under permuting categories (for symmetric rules), so only one
//! representative per permutation class is kept: sequences are emitted directly in
//! non-decreasing order, multiset-style. Nothing is generated and then deduplicated.
//!
//! Size: at most `C(|grid| + m - 1, m)` sequences before the `sum <= 1` filter, which grows
//! explosively in both `|grid|` and `m`. [`EngineConfig::max_candidates`] caps the output.

use tracing::debug;

use crate::simplex::validate_partial;
use crate::{EngineConfig, Error, Grid, Precision, Result, complete};

/// Canonical candidate vectors of a fixed dimension `m = K - 1`.
///
/// Iteration order is the generation order (lexicographic over grid indices), which the
/// searches rely on for deterministic tie-breaking.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateSet {
    dim: usize,
    vectors: Vec<Vec<f64>>,
}

impl CandidateSet {
    /// Wrap caller-supplied `(K-1)`-vectors, validating shape and the simplex constraint.
    pub fn from_vectors(dim: usize, vectors: Vec<Vec<f64>>) -> Result<Self> {
        for v in &vectors {
            if v.len() != dim {
                return Err(Error::invalid(format!(
                    "candidate has length {}, expected {dim}",
                    v.len()
                )));
            }
            validate_partial(v)?;
        }
        Ok(Self { dim, vectors })
    }

    /// Dimension of the stored (uncompleted) vectors.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.vectors.iter().map(Vec::as_slice)
    }

    pub fn as_slice(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    pub fn into_vectors(self) -> Vec<Vec<f64>> {
        self.vectors
    }

    /// Keep the candidates whose completed `K`-vector satisfies `keep`.
    pub(crate) fn retain_completed<F>(self, precision: Precision, mut keep: F) -> Result<Self>
    where
        F: FnMut(&[f64]) -> bool,
    {
        let mut kept = Vec::with_capacity(self.vectors.len());
        for v in self.vectors {
            let full = complete(&v, precision)?;
            if keep(&full) {
                kept.push(v);
            }
        }
        Ok(Self {
            dim: self.dim,
            vectors: kept,
        })
    }
}

/// Upper bound on the number of non-decreasing length-`m` sequences over `grid_len` values:
/// `C(grid_len + m - 1, m)`, saturating at `u128::MAX`.
pub fn candidate_count_bound(grid_len: usize, m: usize) -> u128 {
    if m == 0 {
        return 1;
    }
    if grid_len == 0 {
        return 0;
    }
    // C(g + m - 1, m) = prod_{i=1..m} (g - 1 + i) / i, exact at every step.
    let g = grid_len as u128;
    let mut acc: u128 = 1;
    for i in 1..=(m as u128) {
        acc = match acc.checked_mul(g - 1 + i) {
            Some(x) => x / i,
            None => return u128::MAX,
        };
    }
    acc
}

/// Enumerate canonical candidates of dimension `m` from `grid`.
///
/// Emits every non-decreasing sequence `x_1 <= ... <= x_m` of grid values with
/// `sum <= 1 + cfg.sum_tol`. Because the grid is sorted, once the cheapest completion of
/// a prefix (repeat the current value) overshoots, every later value does too and the
/// branch is cut.
///
/// `m = 0` (a single category) yields one empty vector, whose completion is `[1.0]`.
pub fn generate_candidates(m: usize, grid: &Grid, cfg: &EngineConfig) -> Result<CandidateSet> {
    let bound = candidate_count_bound(grid.len(), m);
    let mut walker = Enumerator {
        points: grid.points(),
        limit: cfg.max_candidates,
        bound,
        max_sum: 1.0 + cfg.sanitized_sum_tol(),
        current: Vec::with_capacity(m),
        out: Vec::new(),
    };
    walker.extend(0, m, 0.0)?;

    debug!(m, grid_len = grid.len(), bound, count = walker.out.len(), "generated candidates");
    Ok(CandidateSet {
        dim: m,
        vectors: walker.out,
    })
}

struct Enumerator<'a> {
    points: &'a [f64],
    limit: Option<usize>,
    bound: u128,
    max_sum: f64,
    current: Vec<f64>,
    out: Vec<Vec<f64>>,
}

impl Enumerator<'_> {
    fn extend(&mut self, start: usize, left: usize, sum: f64) -> Result<()> {
        if left == 0 {
            if let Some(limit) = self.limit
                && self.out.len() >= limit
            {
                return Err(Error::CandidateLimit {
                    limit,
                    bound: self.bound,
                });
            }
            self.out.push(self.current.clone());
            return Ok(());
        }
        for j in start..self.points.len() {
            let x = self.points[j];
            if sum + x * left as f64 > self.max_sum {
                break;
            }
            self.current.push(x);
            self.extend(j, left - 1, sum + x)?;
            self.current.pop();
        }
        Ok(())
    }
}

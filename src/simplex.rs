//! Probability vectors on the simplex: rounding precision, completion, validation.
//!
//! Candidates are stored in their `(K-1)`-dimensional form; the `K`-th component is
//! implicit (`1 - sum`). Completion rounds that residual with the same [`Precision`] the
//! endpoint ranker uses, so a completed vector compares exactly against grid points.

use crate::{Error, Result};

/// Digits used when no precision is configured.
pub const DEFAULT_DIGITS: u32 = 10;

/// Tolerance for the `sum <= 1` constraint on `(K-1)`-vectors.
pub const SUM_TOL: f64 = 1e-9;

/// Tolerance handed to `logp::validate_simplex` for completed vectors.
///
/// Looser than [`SUM_TOL`]: a partial sum accepted at `1 + SUM_TOL` completes with a zero
/// residual and must still validate.
pub const COMPLETION_TOL: f64 = 1e-8;

const MAX_DIGITS: u32 = 15;

/// Decimal rounding precision.
///
/// One value is threaded through endpoint ranking, completion and the coverage membership
/// test. Changing it changes which endpoints count as distinct, so it is part of the query,
/// not a hidden constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Precision {
    digits: u32,
}

impl Default for Precision {
    fn default() -> Self {
        Self::new(DEFAULT_DIGITS)
    }
}

impl Precision {
    /// Round to `digits` decimal places (capped at 15; beyond that `f64` has nothing left).
    pub const fn new(digits: u32) -> Self {
        let digits = if digits > MAX_DIGITS { MAX_DIGITS } else { digits };
        Self { digits }
    }

    pub const fn digits(self) -> u32 {
        self.digits
    }

    /// Round `x` half away from zero. Non-finite input passes through.
    #[inline]
    pub fn round(self, x: f64) -> f64 {
        if !x.is_finite() {
            return x;
        }
        let scale = 10f64.powi(self.digits as i32);
        (x * scale).round() / scale
    }
}

fn check_component(i: usize, x: f64) -> Result<()> {
    if x.is_finite() && (0.0..=1.0).contains(&x) {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "component {i} = {x} is outside [0, 1]"
        )))
    }
}

/// Check a `(K-1)`-vector: components in `[0,1]`, sum `<= 1 + SUM_TOL`.
pub fn validate_partial(partial: &[f64]) -> Result<()> {
    for (i, &x) in partial.iter().enumerate() {
        check_component(i, x)?;
    }
    let sum: f64 = partial.iter().sum();
    if sum > 1.0 + SUM_TOL {
        return Err(Error::invalid(format!("partial vector sums to {sum} > 1")));
    }
    Ok(())
}

/// Complete a `(K-1)`-vector to a `K`-vector by appending `1 - sum`, rounded to `precision`.
///
/// ```rust
/// use mincov::{complete, Precision};
///
/// let p = complete(&[0.2, 0.5], Precision::default()).unwrap();
/// assert_eq!(p, vec![0.2, 0.5, 0.3]);
/// ```
pub fn complete(partial: &[f64], precision: Precision) -> Result<Vec<f64>> {
    validate_partial(partial)?;
    let sum: f64 = partial.iter().sum();
    // A sum inside (1, 1 + SUM_TOL] leaves a residual of zero, not a negative one.
    let residual = precision.round(1.0 - sum).max(0.0);

    let mut out = Vec::with_capacity(partial.len() + 1);
    out.extend_from_slice(partial);
    out.push(residual);
    logp::validate_simplex(&out, COMPLETION_TOL)?;
    Ok(out)
}

/// Check a completed `K`-vector (non-negative, sums to 1 within [`COMPLETION_TOL`]).
pub fn validate_complete(p: &[f64]) -> Result<()> {
    if p.is_empty() {
        return Err(Error::invalid("probability vector is empty"));
    }
    for (i, &x) in p.iter().enumerate() {
        check_component(i, x)?;
    }
    logp::validate_simplex(p, COMPLETION_TOL)?;
    Ok(())
}

//! Engine configuration.

use std::time::Duration;

use crate::Precision;
use crate::simplex::SUM_TOL;

/// Knobs shared by every pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Rounding used for endpoint ranking, completion and interval membership.
    pub precision: Precision,
    /// Slack on the candidate constraint `sum <= 1`.
    pub sum_tol: f64,
    /// Refuse to build candidate sets larger than this.
    pub max_candidates: Option<usize>,
    /// Use the rayon pool for candidate- and lattice-level reductions.
    ///
    /// Results do not depend on this flag: partial sums are always folded in index order.
    pub parallel: bool,
    /// Require the completed `K`-th (residual) component to be covered too.
    ///
    /// `false` reproduces the older formulation that only tested the first `K - 1`
    /// categories.
    pub check_residual: bool,
    /// Wall-clock limit for one search, measured from the start of that search.
    pub deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
            sum_tol: SUM_TOL,
            max_candidates: None,
            parallel: true,
            check_residual: true,
            deadline: None,
        }
    }
}

impl EngineConfig {
    /// Same config with rayon disabled.
    pub fn sequential(self) -> Self {
        Self {
            parallel: false,
            ..self
        }
    }

    /// `sum_tol`, or the default when it is negative or not finite.
    pub(crate) fn sanitized_sum_tol(&self) -> f64 {
        if self.sum_tol.is_finite() && self.sum_tol >= 0.0 {
            self.sum_tol
        } else {
            SUM_TOL
        }
    }
}

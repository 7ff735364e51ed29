//! Error type shared by every stage of the pipeline.
//!
//! Two families:
//! - rejected inputs (bad `N`/`K`, components outside `[0,1]`, malformed exemplars), raised
//!   before any computation starts;
//! - undefined results (no candidates, zero total weight, exhausted budget), raised instead
//!   of returning a numeric placeholder such as `+inf`.

use std::time::Duration;

use thiserror::Error;

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A search was asked to run over zero candidates (possibly after filtering).
    #[error("no candidates to search")]
    EmptyCandidateSet,

    /// The weighted average is undefined because every weight was zero.
    #[error("total weight is zero; skewed average is undefined")]
    ZeroTotalWeight,

    #[error("weight function `{name}` returned {value} (must be finite and >= 0)")]
    InvalidWeight { name: String, value: f64 },

    /// A probability computation left the finite range.
    #[error("numeric overflow in {0}")]
    NumericOverflow(&'static str),

    #[error("candidate set bound {bound} exceeds the configured limit {limit}")]
    CandidateLimit { limit: usize, bound: u128 },

    #[error("search cancelled")]
    Cancelled,

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Exemplars cannot support a density fit (too few, collinear, wrong shape).
    #[error("degenerate exemplar set: {0}")]
    DegenerateExemplars(String),

    #[error("simplex validation failed: {0:?}")]
    Simplex(logp::Error),
}

impl From<logp::Error> for Error {
    fn from(e: logp::Error) -> Self {
        Self::Simplex(e)
    }
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for errors produced by [`Budget`](crate::Budget) exhaustion.
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded(_))
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

//! `mincov`: minimax coverage of multinomial confidence-interval rules.
//!
//! A confidence-interval rule maps an observed count vector `x` (with `sum x = N`) to one
//! interval per category. Its *coverage* at a true probability vector `p` is the
//! multinomial probability that every interval contains its `p_i`. This crate finds the
//! `p` on which a rule covers worst, restricted to a finite grid of candidate vectors
//! built from the rule's own interval endpoints.
//!
//! **Pipeline:**
//! - [`rank_endpoints`] / [`rank_endpoints_for`]: every distinct interval endpoint over
//!   all counts `0..=N`, rounded and sorted into a [`Grid`].
//! - [`generate_candidates`]: canonical (sorted, `sum <= 1`) `(K-1)`-vectors over the
//!   grid, as a [`CandidateSet`]. The `K`-th component is implied by completion.
//! - [`filter_candidates`] (optional): keep candidates whose completed vector satisfies a
//!   [`Predicate`] (skewed, sparse, dominated, ...).
//! - [`CoverageEngine`] / [`coverage_probability`]: exact coverage by enumerating the
//!   `C(N+K-1, K-1)` count vectors in the log domain.
//! - [`find_minimizer`]: the candidate of least coverage ([`Minimizer`]).
//! - [`find_representative`]: the candidate closest to the [`WeightFunction`]-skewed
//!   average coverage ([`Representative`]).
//! - [`MassFunction`]: a PCA + Gaussian KDE weight learned from exemplar vectors.
//! - [`run_minimax`] / [`run_weighted`]: the whole pipeline as one
//!   [`ExperimentRecord`].
//!
//! **Interval rules:** [`FitzpatrickScott`] (joint and per-category), [`Wilson`] and
//! [`Wald`] (per-category, through [`PerCategory`]), and [`FixedIntervals`] for fixtures.
//!
//! **Determinism:** parallel reductions (rayon) collect partial sums in index order and
//! fold them sequentially, so every result is bit-identical with and without
//! [`EngineConfig::parallel`]. Ties on coverage keep the earliest candidate.
//!
//! **Cancellation:** a [`Budget`] (deadline and/or [`CancelToken`]) is checked between
//! candidates and between lattice slabs; exhaustion is an error, never a partial answer.
//!
//! ```
//! use mincov::{EngineConfig, FitzpatrickScott, find_minimizer, generate_candidates, rank_endpoints};
//!
//! let cfg = EngineConfig::default();
//! let rule = FitzpatrickScott::new(0.05)?;
//! let grid = rank_endpoints(4, &rule, cfg.precision)?;
//! let candidates = generate_candidates(2, &grid, &cfg)?;
//! let worst = find_minimizer(4, &candidates, &rule, &cfg)?;
//! assert!(worst.value < 0.95);
//! assert_eq!(worst.vector.len(), 3);
//! # Ok::<(), mincov::Error>(())
//! ```
//!
//! **Non-goals:**
//! - No persistence: experiment records are values; writing and deduplicating log files
//!   is the caller's job.
//! - No continuous optimization over the simplex; the search is exhaustive over the grid.

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod simplex;
pub use simplex::{COMPLETION_TOL, DEFAULT_DIGITS, Precision, SUM_TOL, complete, validate_complete, validate_partial};

mod normal;
pub use normal::{normal_quantile, two_sided_z};

mod config;
pub use config::*;

mod budget;
pub use budget::*;

mod interval;
pub use interval::*;

mod ranker;
pub use ranker::*;

mod candidates;
pub use candidates::*;

mod filter;
pub use filter::*;

mod coverage;
pub use coverage::*;

mod search;
pub use search::*;

mod weighted;
pub use weighted::*;

mod learner;
pub use learner::*;

mod experiment;
pub use experiment::*;

#[cfg(feature = "stochastic")]
mod exemplars;
#[cfg(feature = "stochastic")]
pub use exemplars::*;

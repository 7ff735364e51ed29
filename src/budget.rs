//! Cooperative cancellation for long searches.
//!
//! Candidate sets and outcome lattices grow combinatorially, so every search checks a
//! [`Budget`] between units of work (one candidate, one lattice slab). Exhaustion surfaces
//! as [`Error::Cancelled`] or [`Error::DeadlineExceeded`]; no partial answer is returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::{EngineConfig, Error, Result};

/// Shared flag another thread can flip to stop a running search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Deadline and/or cancellation token consulted by the search loops.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    deadline: Option<(Instant, Duration)>,
    cancel: Option<CancelToken>,
}

impl Budget {
    /// No limits.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Expire `limit` from now. A limit past the clock's range means no deadline.
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Instant::now().checked_add(limit).map(|at| (at, limit));
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Budget for one search started now under `cfg.deadline`.
    pub fn from_config(cfg: &EngineConfig) -> Self {
        match cfg.deadline {
            Some(limit) => Self::unbounded().with_deadline(limit),
            None => Self::unbounded(),
        }
    }

    /// Fail if the token was cancelled or the deadline has passed.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if let Some(token) = &self.cancel
            && token.is_cancelled()
        {
            return Err(Error::Cancelled);
        }
        if let Some((at, limit)) = self.deadline
            && Instant::now() >= at
        {
            return Err(Error::DeadlineExceeded(limit));
        }
        Ok(())
    }
}

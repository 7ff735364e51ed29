//! Seeded exemplar clouds for the mass-function learner.
//!
//! Dirichlet draws are built from independent `Gamma(alpha_i, 1)` draws normalized to sum
//! to one. The generator is `StdRng::seed_from_u64(seed)`, so a seed fixes the cloud.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Gamma};

use crate::{Error, Result};

/// Redraws allowed when every Gamma component underflows to zero.
const MAX_REDRAWS: usize = 64;

/// `count` draws from `Dirichlet(concentration)`.
pub fn dirichlet_exemplars(concentration: &[f64], count: usize, seed: u64) -> Result<Vec<Vec<f64>>> {
    if concentration.len() < 2 {
        return Err(Error::invalid("Dirichlet needs at least two categories"));
    }
    let gammas = concentration
        .iter()
        .map(|&a| {
            if !(a.is_finite() && a > 0.0) {
                return Err(Error::invalid(format!(
                    "Dirichlet concentration must be > 0, got {a}"
                )));
            }
            Gamma::new(a, 1.0).map_err(|e| Error::invalid(format!("gamma({a}, 1): {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(count);
    let mut draw = vec![0.0; gammas.len()];
    while out.len() < count {
        let mut attempts = 0;
        let total = loop {
            for (x, g) in draw.iter_mut().zip(&gammas) {
                *x = g.sample(&mut rng);
            }
            let total: f64 = draw.iter().sum();
            if total > 0.0 && total.is_finite() {
                break total;
            }
            attempts += 1;
            if attempts >= MAX_REDRAWS {
                return Err(Error::NumericOverflow("Dirichlet normalization"));
            }
        };
        out.push(draw.iter().map(|x| x / total).collect());
    }
    Ok(out)
}

/// `count` draws concentrated around `center`: `Dirichlet(strength * center)`.
///
/// Larger `strength` gives a tighter cloud. Zero components of `center` are floored at
/// `1e-3` so the concentration stays positive.
pub fn exemplars_around(center: &[f64], strength: f64, count: usize, seed: u64) -> Result<Vec<Vec<f64>>> {
    if !(strength.is_finite() && strength > 0.0) {
        return Err(Error::invalid(format!("strength must be > 0, got {strength}")));
    }
    crate::simplex::validate_complete(center)?;
    let concentration: Vec<f64> = center.iter().map(|&c| (c * strength).max(1e-3)).collect();
    dirichlet_exemplars(&concentration, count, seed)
}

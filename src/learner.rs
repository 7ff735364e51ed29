//! Learned mass function over the simplex: PCA projection plus Gaussian KDE.
//!
//! Fitting:
//! 1. center the exemplars and keep the top-`d` principal axes of their covariance;
//! 2. fit a Gaussian kernel density on the projected cloud, with kernel covariance equal to
//!    the projected sample covariance scaled by `factor^2` (Scott's rule by default);
//! 3. record the largest density observed at any exemplar.
//!
//! `weight(p) = density(project(p)) / max_exemplar_density`, clipped to `[0, 1]`.
//!
//! The estimate only means something near the exemplar cloud. A query whose projection is
//! more than `extrapolation_radius` kernel standard deviations (Mahalanobis distance in the
//! kernel metric) from every exemplar is flagged as extrapolated; its weight is still
//! returned, and a warning is logged when it is used as a [`WeightFunction`].

use std::f64::consts::PI;

use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use tracing::{debug, warn};

use crate::coverage::CompensatedSum;
use crate::simplex::validate_complete;
use crate::{Error, Result, WeightFunction};

/// Explained variance below this fraction of the leading component counts as zero.
const RANK_TOL: f64 = 1e-12;

/// Kernel bandwidth rule.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bandwidth {
    /// `n^(-1/(d+4))`.
    #[default]
    Scott,
    /// `(n (d+2) / 4)^(-1/(d+4))`.
    Silverman,
    /// Fixed scale factor applied to the sample covariance.
    Factor(f64),
}

impl Bandwidth {
    /// Covariance scale factor for `n` points in `d` dimensions.
    pub fn factor(self, n: usize, d: usize) -> Result<f64> {
        let n = n as f64;
        let d = d as f64;
        let f = match self {
            Self::Scott => n.powf(-1.0 / (d + 4.0)),
            Self::Silverman => (n * (d + 2.0) / 4.0).powf(-1.0 / (d + 4.0)),
            Self::Factor(f) => f,
        };
        if f.is_finite() && f > 0.0 {
            Ok(f)
        } else {
            Err(Error::invalid(format!("bandwidth factor must be > 0, got {f}")))
        }
    }
}

/// Learner knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearnerConfig {
    /// Reduced dimensionality `d` (`1 <= d < K`). `None` keeps `K - 1` axes.
    pub components: Option<usize>,
    pub bandwidth: Bandwidth,
    /// Distance, in kernel standard deviations, beyond which a query is extrapolated.
    pub extrapolation_radius: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            components: None,
            bandwidth: Bandwidth::Scott,
            extrapolation_radius: 3.0,
        }
    }
}

/// One density query.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassEstimate {
    /// Normalized density in `[0, 1]`.
    pub weight: f64,
    /// Raw KDE density at the projection.
    pub density: f64,
    /// Mahalanobis distance (kernel metric) to the nearest exemplar.
    pub nearest: f64,
    /// `nearest > extrapolation_radius`.
    pub extrapolated: bool,
}

/// Fitted mass function. Build with [`MassFunction::fit`].
#[derive(Debug, Clone)]
pub struct MassFunction {
    dim: usize,
    mean: DVector<f64>,
    /// `d x K`; rows are principal axes.
    axes: DMatrix<f64>,
    explained: DVector<f64>,
    /// Lower Cholesky factor of the kernel covariance.
    kernel_l: DMatrix<f64>,
    /// Projected exemplars in whitened kernel coordinates, one column each.
    whitened: DMatrix<f64>,
    ln_norm: f64,
    max_density: f64,
    extrapolation_radius: f64,
}

impl MassFunction {
    /// Fit on exemplar `K`-vectors.
    pub fn fit(exemplars: &[Vec<f64>], cfg: &LearnerConfig) -> Result<Self> {
        let Some(first) = exemplars.first() else {
            return Err(Error::DegenerateExemplars("no exemplars".into()));
        };
        let k = first.len();
        if k < 2 {
            return Err(Error::invalid("exemplars need at least two categories"));
        }
        for (i, e) in exemplars.iter().enumerate() {
            if e.len() != k {
                return Err(Error::invalid(format!(
                    "exemplar {i} has length {}, expected {k}",
                    e.len()
                )));
            }
            validate_complete(e)?;
        }
        let d = cfg.components.unwrap_or(k - 1);
        if d == 0 || d >= k {
            return Err(Error::invalid(format!(
                "components must lie in 1..{k}, got {d}"
            )));
        }
        let n = exemplars.len();
        if n <= d {
            return Err(Error::DegenerateExemplars(format!(
                "{n} exemplars cannot support a {d}-dimensional density"
            )));
        }
        if !(cfg.extrapolation_radius > 0.0) {
            return Err(Error::invalid("extrapolation radius must be > 0"));
        }
        let factor = cfg.bandwidth.factor(n, d)?;

        // PCA.
        let data = DMatrix::from_fn(n, k, |i, j| exemplars[i][j]);
        let mean = DVector::from_fn(k, |j, _| data.column(j).mean());
        let centered = DMatrix::from_fn(n, k, |i, j| data[(i, j)] - mean[j]);
        let cov = (centered.transpose() * &centered) / (n as f64 - 1.0);
        let eig = SymmetricEigen::new(cov);
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
        let top = &order[..d];
        let axes = DMatrix::from_fn(d, k, |r, c| eig.eigenvectors[(c, top[r])]);
        let explained = DVector::from_fn(d, |r, _| eig.eigenvalues[top[r]]);

        let lead = explained[0];
        let last = explained[d - 1];
        if !(lead > 0.0) || last <= RANK_TOL * lead {
            return Err(Error::DegenerateExemplars(format!(
                "exemplars span fewer than {d} directions (explained variance {:?})",
                explained.as_slice()
            )));
        }

        // KDE on the projected cloud.
        let projected = &axes * centered.transpose(); // d x n
        let pmean = DVector::from_fn(d, |r, _| projected.row(r).mean());
        let pc = DMatrix::from_fn(d, n, |r, c| projected[(r, c)] - pmean[r]);
        let kernel_cov = (&pc * pc.transpose()) * (factor * factor / (n as f64 - 1.0));
        let chol = match Cholesky::new(kernel_cov.clone()) {
            Some(c) => c,
            None => {
                let jitter = 1e-12 * kernel_cov.trace() / d as f64;
                let jittered = kernel_cov + DMatrix::identity(d, d) * jitter;
                Cholesky::new(jittered).ok_or_else(|| {
                    Error::DegenerateExemplars("kernel covariance is not positive definite".into())
                })?
            }
        };
        let kernel_l = chol.l();
        let whitened = kernel_l.solve_lower_triangular(&projected).ok_or_else(|| {
            Error::DegenerateExemplars("kernel covariance is singular".into())
        })?;
        let ln_det_l: f64 = kernel_l.diagonal().iter().map(|x| x.ln()).sum();
        let ln_norm = -((n as f64).ln() + 0.5 * d as f64 * (2.0 * PI).ln() + ln_det_l);

        let mut mf = Self {
            dim: k,
            mean,
            axes,
            explained,
            kernel_l,
            whitened,
            ln_norm,
            max_density: 0.0,
            extrapolation_radius: cfg.extrapolation_radius,
        };
        let max_density = (0..n)
            .map(|i| mf.kde(&mf.whitened.column(i).into_owned()).0)
            .fold(0.0f64, f64::max);
        if !(max_density > 0.0 && max_density.is_finite()) {
            return Err(Error::DegenerateExemplars(format!(
                "maximum exemplar density is {max_density}"
            )));
        }
        mf.max_density = max_density;

        debug!(
            exemplars = n,
            k,
            components = d,
            factor,
            max_density,
            "fitted mass function"
        );
        Ok(mf)
    }

    /// Dimension `K` of the vectors this function accepts.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Reduced dimension `d`.
    pub fn components(&self) -> usize {
        self.axes.nrows()
    }

    /// Variance along each kept axis, largest first.
    pub fn explained_variance(&self) -> &[f64] {
        self.explained.as_slice()
    }

    pub fn max_density(&self) -> f64 {
        self.max_density
    }

    /// Coordinates of `p` on the principal axes.
    pub fn project(&self, p: &[f64]) -> Result<Vec<f64>> {
        if p.len() != self.dim {
            return Err(Error::invalid(format!(
                "vector has length {}, mass function expects {}",
                p.len(),
                self.dim
            )));
        }
        let x = DVector::from_column_slice(p) - &self.mean;
        Ok((&self.axes * x).as_slice().to_vec())
    }

    /// Density, normalized weight and extrapolation flag at `p`.
    pub fn estimate(&self, p: &[f64]) -> Result<MassEstimate> {
        let y = DVector::from_vec(self.project(p)?);
        let z = self
            .kernel_l
            .solve_lower_triangular(&y)
            .ok_or_else(|| Error::DegenerateExemplars("kernel covariance is singular".into()))?;
        let (density, nearest) = self.kde(&z);
        let weight = (density / self.max_density).clamp(0.0, 1.0);
        Ok(MassEstimate {
            weight,
            density,
            nearest,
            extrapolated: nearest > self.extrapolation_radius,
        })
    }

    /// KDE density and nearest-exemplar distance at a whitened point.
    fn kde(&self, z: &DVector<f64>) -> (f64, f64) {
        let mut acc = CompensatedSum::default();
        let mut nearest_sq = f64::INFINITY;
        for col in self.whitened.column_iter() {
            let d2 = (z - col).norm_squared();
            nearest_sq = nearest_sq.min(d2);
            acc.add((-0.5 * d2).exp());
        }
        (acc.total() * self.ln_norm.exp(), nearest_sq.sqrt())
    }
}

impl WeightFunction for MassFunction {
    fn name(&self) -> &str {
        "learned_mass"
    }

    /// NaN when `p` has the wrong length.
    fn weight(&self, p: &[f64]) -> f64 {
        match self.estimate(p) {
            Ok(est) => {
                if est.extrapolated {
                    warn!(
                        vector = ?p,
                        nearest = est.nearest,
                        "mass function queried outside the exemplar cloud"
                    );
                }
                est.weight
            }
            Err(_) => f64::NAN,
        }
    }
}

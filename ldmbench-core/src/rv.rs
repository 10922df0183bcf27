//! Random variable abstractions
//!
//! Thin wrappers over discrete categorical and normal distributions. Every
//! random variable carries its own RNG handle, shared with the model or
//! agent that constructed it, so that re-seeding the owner re-seeds every
//! draw made through its policies.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::{Continuous, Normal};

use crate::error::{BenchError, Result};
use crate::space::Elem;

/// Floor applied to probabilities before taking logs
pub const LOGPMF_EPS: f64 = 1e-10;

/// A shared, seedable RNG handle.
///
/// Cloning the handle shares the underlying generator; the library is
/// single-threaded, so interior mutability through `RefCell` is sufficient.
#[derive(Debug, Clone)]
pub struct RngHandle(Rc<RefCell<StdRng>>);

impl RngHandle {
    /// Create a handle seeded from an integer
    #[must_use]
    pub fn seed_from_u64(seed: u64) -> Self {
        Self(Rc::new(RefCell::new(StdRng::seed_from_u64(seed))))
    }

    /// Re-seed the shared generator in place.
    ///
    /// Every clone of this handle observes the new stream.
    pub fn reseed(&self, seed: u64) {
        *self.0.borrow_mut() = StdRng::seed_from_u64(seed);
    }

    /// Run `f` with mutable access to the generator
    pub fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut self.0.borrow_mut())
    }
}

/// An immutable (distribution family, parameters) pair plus an RNG handle
#[derive(Debug, Clone)]
pub enum RandomVar {
    /// Discrete categorical distribution over action indices
    Categorical {
        /// Normalized probability vector
        probs: Vec<f64>,
        /// RNG used by `sample`
        rng: RngHandle,
    },
    /// Normal distribution over a scalar action
    Gaussian {
        /// Mean
        mean: f64,
        /// Standard deviation, strictly positive
        std: f64,
        /// RNG used by `sample`
        rng: RngHandle,
    },
}

impl RandomVar {
    /// Build a categorical random variable, normalizing `probs`.
    ///
    /// # Errors
    /// Fails if any weight is negative or non-finite, or all are zero.
    pub fn categorical(probs: Vec<f64>, rng: RngHandle) -> Result<Self> {
        if probs.is_empty() || probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(BenchError::Distribution(format!(
                "invalid categorical weights: {probs:?}"
            )));
        }
        let total: f64 = probs.iter().sum();
        if total <= 0.0 {
            return Err(BenchError::Distribution(
                "categorical weights sum to zero".to_string(),
            ));
        }
        let probs = probs.into_iter().map(|p| p / total).collect();
        Ok(Self::Categorical { probs, rng })
    }

    /// Build a Gaussian random variable.
    ///
    /// # Errors
    /// Fails unless `std` is finite and strictly positive.
    pub fn gaussian(mean: f64, std: f64, rng: RngHandle) -> Result<Self> {
        if !mean.is_finite() || !std.is_finite() || std <= 0.0 {
            return Err(BenchError::Distribution(format!(
                "invalid gaussian parameters: mean={mean}, std={std}"
            )));
        }
        Ok(Self::Gaussian { mean, std, rng })
    }

    /// Log-density (Gaussian) or log-mass (categorical) of `x`.
    ///
    /// Categorical probabilities are floored at [`LOGPMF_EPS`] so that a
    /// zero-probability action yields a large negative value rather than
    /// `-inf`.
    pub fn log_density(&self, x: &Elem) -> Result<f64> {
        match self {
            Self::Categorical { probs, .. } => {
                let k = x.as_index().ok_or_else(|| {
                    BenchError::Distribution(format!("categorical logpmf of non-index {x}"))
                })?;
                let p = probs.get(k).ok_or_else(|| {
                    BenchError::Distribution(format!(
                        "index {k} out of range for {} categories",
                        probs.len()
                    ))
                })?;
                Ok(p.max(LOGPMF_EPS).ln())
            }
            Self::Gaussian { mean, std, .. } => {
                let x = x.as_f64().ok_or_else(|| {
                    BenchError::Distribution(format!("gaussian logpdf of non-scalar {x}"))
                })?;
                let dist = Normal::new(*mean, *std)
                    .map_err(|e| BenchError::Distribution(e.to_string()))?;
                Ok(dist.ln_pdf(x))
            }
        }
    }

    /// Draw one point through the owned RNG handle
    pub fn sample(&self) -> Result<Elem> {
        match self {
            Self::Categorical { probs, rng } => {
                let index = WeightedIndex::new(probs)
                    .map_err(|e| BenchError::Distribution(e.to_string()))?;
                let k = rng.with(|r| index.sample(r));
                Ok(Elem::Int(k as i64))
            }
            Self::Gaussian { mean, std, rng } => {
                let dist = rand_distr::Normal::new(*mean, *std)
                    .map_err(|e| BenchError::Distribution(e.to_string()))?;
                let x = rng.with(|r| dist.sample(r));
                Ok(Elem::Real(x))
            }
        }
    }

    /// The probability vector, for categorical variables
    #[must_use]
    pub fn probs(&self) -> Option<&[f64]> {
        match self {
            Self::Categorical { probs, .. } => Some(probs),
            Self::Gaussian { .. } => None,
        }
    }
}

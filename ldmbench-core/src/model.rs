//! Model contract and prediction containers
//!
//! A model wraps an agent with a seed, a parameter initializer, and the
//! fitting machinery. Tests and tasks talk to models exclusively through
//! this trait, including multi-subject models via the projection methods.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{BenchError, Result};
use crate::params::Params;
use crate::rv::{RandomVar, RngHandle};
use crate::space::{Elem, Space};
use crate::trajectory::Trajectory;

/// One per-trial prediction emitted by a model
#[derive(Debug, Clone)]
pub enum Prediction {
    /// A policy random variable (interactive protocol)
    Dist(RandomVar),
    /// A point prediction
    Point(f64),
    /// A probability vector over discrete actions
    Probs(Vec<f64>),
}

impl Prediction {
    /// Log-density of `action` under this prediction, where defined
    pub fn log_density(&self, action: &Elem) -> Result<f64> {
        match self {
            Self::Dist(rv) => rv.log_density(action),
            Self::Point(_) | Self::Probs(_) => Err(BenchError::Model(
                "prediction does not expose a log-density".to_string(),
            )),
        }
    }

    /// Serializable payload for persistence
    #[must_use]
    pub fn to_payload(&self) -> PredictionPayload {
        match self {
            Self::Dist(RandomVar::Categorical { probs, .. }) => PredictionPayload::Categorical {
                probs: probs.clone(),
            },
            Self::Dist(RandomVar::Gaussian { mean, std, .. }) => PredictionPayload::Gaussian {
                mean: *mean,
                std: *std,
            },
            Self::Point(x) => PredictionPayload::Point { value: *x },
            Self::Probs(p) => PredictionPayload::Categorical { probs: p.clone() },
        }
    }
}

/// Persistence form of a prediction (distribution parameters or point value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionPayload {
    /// Probability vector over discrete actions
    Categorical {
        /// The probabilities
        probs: Vec<f64>,
    },
    /// Normal distribution parameters
    Gaussian {
        /// Mean
        mean: f64,
        /// Standard deviation
        std: f64,
    },
    /// Point prediction
    Point {
        /// The value
        value: f64,
    },
}

/// Core model trait
pub trait Model {
    /// Human-readable model name; used for score-matrix columns and
    /// persistence directories
    fn name(&self) -> &str;

    /// The space of actions this model emits
    fn action_space(&self) -> Space;

    /// The space of stimuli this model accepts
    fn observation_space(&self) -> Space;

    /// Capabilities this model declares
    fn capabilities(&self) -> Vec<Capability>;

    /// Sample an action from the embedded agent's policy
    fn act(&mut self, stimulus: &Elem) -> Result<Elem>;

    /// The policy prediction for `stimulus`
    fn predict(&mut self, stimulus: &Elem) -> Result<Prediction>;

    /// Delegate one trial of state evolution to the embedded agent
    fn update(&mut self, stimulus: &Elem, reward: f64, action: &Elem, done: bool) -> Result<()>;

    /// Reinitialize hidden state from the current parameters
    fn reset(&mut self);

    /// Fit parameters to a trajectory by maximum likelihood
    fn fit(&mut self, trajectory: &Trajectory) -> Result<()>;

    /// Install fresh parameters from the initializer
    fn init_paras(&mut self) -> Result<()>;

    /// Install a parameter dictionary
    fn set_paras(&mut self, paras: &Params) -> Result<()>;

    /// The current parameter dictionary
    fn get_paras(&self) -> Params;

    /// Flattened parameter count
    fn n_params(&self) -> usize;

    /// Re-seed the model. Re-seeds the embedded agent and every random
    /// variable the model subsequently constructs.
    fn seed(&mut self, seed: u64);

    /// The model's random-number stream, shared with its random variables
    fn rng(&self) -> RngHandle;

    /// Predict a batch of stimuli in one shot, without state updates.
    ///
    /// # Errors
    /// `CapabilityMissing` unless the model supports the batch protocol.
    fn predict_batch(&mut self, _stimuli: &[Elem]) -> Result<Vec<Prediction>> {
        Err(BenchError::CapabilityMissing {
            subject: self.name().to_string(),
            capability: Capability::ProducesPolicy,
        })
    }

    /// Fit from explicit (stimulus, action) supervision.
    ///
    /// # Errors
    /// `CapabilityMissing` unless the model supports the batch protocol.
    fn fit_batch(&mut self, _stimuli: &[Elem], _actions: &[Elem]) -> Result<()> {
        Err(BenchError::CapabilityMissing {
            subject: self.name().to_string(),
            capability: Capability::ProducesPolicy,
        })
    }

    /// Number of subjects; 1 for single-subject models
    fn n_subjects(&self) -> usize {
        1
    }

    /// View this model as subject `subject`: subsequent single-subject calls
    /// operate on that subject until [`Model::unproject`] is called.
    ///
    /// # Errors
    /// Fails if `subject` is out of range.
    fn project(&mut self, subject: usize) -> Result<()> {
        if subject == 0 {
            Ok(())
        } else {
            Err(BenchError::Model(format!(
                "single-subject model cannot project to subject {subject}"
            )))
        }
    }

    /// Restore the multi-subject view. A no-op for single-subject models.
    fn unproject(&mut self) {}

    /// Write a checkpoint of the model into `dir`.
    ///
    /// Returns `Ok(false)` when the model does not support checkpointing.
    fn save(&self, _dir: &Path) -> Result<bool> {
        Ok(false)
    }
}

//! Rescorla-Wagner learner with a Gaussian response policy
//!
//! Associative weights over a multi-binary cue vector are updated by the
//! delta rule; the response is a normal distribution around an affine
//! transform of the predicted reward. The canonical continuous-action agent
//! of the conditioning environments.

use ldmbench_core::{
    Agent, BenchError, Elem, Params, RandomVar, Result, RngHandle, Space,
};
use serde_json::json;

fn dot(w: &[f64], x: &[u8]) -> f64 {
    w.iter().zip(x).map(|(wi, xi)| wi * f64::from(*xi)).sum()
}

/// Rescorla-Wagner agent: `MultiBinary(n)` stimuli, scalar actions
#[derive(Debug, Clone)]
pub struct RwNormAgent {
    /// Initial weights; `reset` copies these into the live weights
    w0: Vec<f64>,
    /// Live associative weights
    w: Vec<f64>,
    sigma: f64,
    b0: f64,
    b1: f64,
    eta: f64,
    rng: RngHandle,
}

impl RwNormAgent {
    /// Create an agent over `w0.len()` cue components.
    ///
    /// # Panics
    /// Panics if `w0` is empty.
    #[must_use]
    pub fn new(w0: Vec<f64>, sigma: f64, b0: f64, b1: f64, eta: f64, seed: u64) -> Self {
        assert!(!w0.is_empty(), "need at least one cue component");
        Self {
            w: w0.clone(),
            w0,
            sigma,
            b0,
            b1,
            eta,
            rng: RngHandle::seed_from_u64(seed),
        }
    }

    /// The live associative weights
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.w
    }

    fn cue<'a>(&self, stimulus: &'a Elem) -> Result<&'a [u8]> {
        self.observation_space().ensure_contains(stimulus)?;
        stimulus.as_bits().ok_or_else(|| {
            BenchError::Model(format!("expected a cue vector, got {stimulus}"))
        })
    }
}

impl Agent for RwNormAgent {
    fn action_space(&self) -> Space {
        Space::ContinuousScalar
    }

    fn observation_space(&self) -> Space {
        Space::MultiBinary { n: self.w0.len() }
    }

    fn eval_policy(&mut self, stimulus: &Elem) -> Result<RandomVar> {
        let x = self.cue(stimulus)?;
        let mean = self.b0 + self.b1 * dot(&self.w, x);
        RandomVar::gaussian(mean, self.sigma, self.rng.clone())
    }

    fn update(&mut self, stimulus: &Elem, reward: f64, action: &Elem, done: bool) -> Result<()> {
        let x = self.cue(stimulus)?;
        self.action_space().ensure_contains(action)?;
        if done {
            return Ok(());
        }
        let delta = reward - dot(&self.w, x);
        for (wi, xi) in self.w.iter_mut().zip(x) {
            *wi += self.eta * delta * f64::from(*xi);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.w = self.w0.clone();
    }

    fn get_paras(&self) -> Params {
        Params::new()
            .with("w", self.w0.clone())
            .with("sigma", self.sigma)
            .with("b0", self.b0)
            .with("b1", self.b1)
            .with("eta", self.eta)
    }

    fn set_paras(&mut self, paras: &Params) -> Result<()> {
        let w0 = paras.vector("w")?;
        if w0.len() != self.w0.len() {
            return Err(BenchError::Model(format!(
                "weight vector of length {} does not match {} cue components",
                w0.len(),
                self.w0.len()
            )));
        }
        self.w0 = w0.to_vec();
        self.sigma = paras.scalar("sigma")?;
        self.b0 = paras.scalar("b0")?;
        self.b1 = paras.scalar("b1")?;
        self.eta = paras.scalar("eta")?;
        Ok(())
    }

    fn state_snapshot(&self) -> serde_json::Value {
        json!({ "w": self.w })
    }

    fn seed_rng(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }
}

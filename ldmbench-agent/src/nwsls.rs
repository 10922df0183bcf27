//! Noisy win-stay-lose-shift
//!
//! A one-parameter heuristic over a discrete action set: after a win the
//! agent repeats its last action with probability `1 - epsilon`, after a
//! loss it repeats with probability `epsilon`, spreading the rest evenly
//! over the other actions.

use ldmbench_core::{
    Agent, BenchError, Elem, Params, RandomVar, Result, RngHandle, Space,
};
use serde_json::json;

/// Noisy win-stay-lose-shift agent over `Discrete(n_action)`
#[derive(Debug, Clone)]
pub struct NwslsAgent {
    epsilon: f64,
    n_action: usize,
    prev_action: usize,
    win: bool,
    rng: RngHandle,
}

impl NwslsAgent {
    /// Create an agent with `epsilon` noise over `n_action` actions.
    ///
    /// # Panics
    /// Panics if `n_action < 2`.
    #[must_use]
    pub fn new(epsilon: f64, n_action: usize, seed: u64) -> Self {
        assert!(n_action >= 2, "need at least two actions");
        let mut agent = Self {
            epsilon,
            n_action,
            prev_action: 0,
            win: true,
            rng: RngHandle::seed_from_u64(seed),
        };
        agent.reset();
        agent
    }

    fn policy_probs(&self) -> Vec<f64> {
        let eps = self.epsilon.clamp(0.0, 1.0);
        let (stay, shift) = if self.win {
            (1.0 - eps, eps / (self.n_action - 1) as f64)
        } else {
            (eps, (1.0 - eps) / (self.n_action - 1) as f64)
        };
        (0..self.n_action)
            .map(|a| if a == self.prev_action { stay } else { shift })
            .collect()
    }
}

impl Agent for NwslsAgent {
    fn action_space(&self) -> Space {
        Space::Discrete { n: self.n_action }
    }

    fn observation_space(&self) -> Space {
        Space::Discrete { n: 1 }
    }

    fn eval_policy(&mut self, stimulus: &Elem) -> Result<RandomVar> {
        self.observation_space().ensure_contains(stimulus)?;
        RandomVar::categorical(self.policy_probs(), self.rng.clone())
    }

    fn update(&mut self, stimulus: &Elem, reward: f64, action: &Elem, done: bool) -> Result<()> {
        self.observation_space().ensure_contains(stimulus)?;
        self.action_space().ensure_contains(action)?;
        if done {
            return Ok(());
        }
        self.prev_action = action
            .as_index()
            .ok_or_else(|| BenchError::Model(format!("non-index action {action}")))?;
        self.win = reward > 0.5;
        Ok(())
    }

    fn reset(&mut self) {
        // Before the first trial the agent behaves as if it had just won
        // with the highest-indexed action.
        self.prev_action = self.n_action - 1;
        self.win = true;
    }

    fn get_paras(&self) -> Params {
        Params::new().with("epsilon", self.epsilon)
    }

    fn set_paras(&mut self, paras: &Params) -> Result<()> {
        let epsilon = paras.scalar("epsilon")?;
        if !epsilon.is_finite() {
            return Err(BenchError::Model(format!("non-finite epsilon {epsilon}")));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    fn state_snapshot(&self) -> serde_json::Value {
        json!({ "prev_action": self.prev_action, "win": self.win })
    }

    fn seed_rng(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }
}

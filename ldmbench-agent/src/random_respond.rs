//! Biased random responder
//!
//! A stateless baseline: one discrete action is emitted with probability
//! `bias`, the remaining probability mass is spread evenly over the other
//! actions. There is no learning, which makes the agent a floor for model
//! recovery and a convenient fixture for the fitting engine.

use ldmbench_core::{
    Agent, BenchError, Elem, Params, RandomVar, Result, RngHandle, Space,
};
use serde_json::json;

/// Agent emitting a biased categorical response, independent of history
#[derive(Debug, Clone)]
pub struct RandomRespondAgent {
    bias: f64,
    action_bias: usize,
    n_action: usize,
    n_obs: usize,
    rng: RngHandle,
}

impl RandomRespondAgent {
    /// Create an agent over `Discrete(n_action)` actions and
    /// `Discrete(n_obs)` stimuli.
    ///
    /// # Panics
    /// Panics if `n_action < 2`, `n_obs == 0`, or `action_bias` is out of
    /// range. These are construction bugs, not runtime conditions.
    #[must_use]
    pub fn new(bias: f64, action_bias: usize, n_action: usize, n_obs: usize, seed: u64) -> Self {
        assert!(n_action >= 2, "need at least two actions");
        assert!(n_obs >= 1, "need a non-empty observation space");
        assert!(action_bias < n_action, "biased action out of range");
        Self {
            bias: bias.clamp(0.0, 1.0),
            action_bias,
            n_action,
            n_obs,
            rng: RngHandle::seed_from_u64(seed),
        }
    }

    fn policy_probs(&self) -> Vec<f64> {
        let bias = self.bias.clamp(0.0, 1.0);
        let other = (1.0 - bias) / (self.n_action - 1) as f64;
        (0..self.n_action)
            .map(|a| if a == self.action_bias { bias } else { other })
            .collect()
    }
}

impl Agent for RandomRespondAgent {
    fn action_space(&self) -> Space {
        Space::Discrete { n: self.n_action }
    }

    fn observation_space(&self) -> Space {
        Space::Discrete { n: self.n_obs }
    }

    fn eval_policy(&mut self, stimulus: &Elem) -> Result<RandomVar> {
        self.observation_space().ensure_contains(stimulus)?;
        RandomVar::categorical(self.policy_probs(), self.rng.clone())
    }

    fn update(&mut self, stimulus: &Elem, _reward: f64, action: &Elem, _done: bool) -> Result<()> {
        self.observation_space().ensure_contains(stimulus)?;
        self.action_space().ensure_contains(action)?;
        // No hidden state to evolve.
        Ok(())
    }

    fn reset(&mut self) {}

    fn get_paras(&self) -> Params {
        Params::new().with("bias", self.bias)
    }

    fn set_paras(&mut self, paras: &Params) -> Result<()> {
        let bias = paras.scalar("bias")?;
        if !bias.is_finite() {
            return Err(BenchError::Model(format!("non-finite bias {bias}")));
        }
        self.bias = bias;
        Ok(())
    }

    fn state_snapshot(&self) -> serde_json::Value {
        json!({})
    }

    fn seed_rng(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn policy_concentrates_on_the_biased_action() {
        let mut agent = RandomRespondAgent::new(0.7, 2, 4, 1, 0);
        let rv = agent.eval_policy(&Elem::Int(0)).unwrap();
        let probs = rv.probs().unwrap();
        assert_abs_diff_eq!(probs[2], 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(probs[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(probs.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn update_leaves_snapshot_unchanged() {
        let mut agent = RandomRespondAgent::new(0.5, 0, 2, 1, 0);
        let before = agent.state_snapshot();
        agent.update(&Elem::Int(0), 1.0, &Elem::Int(1), false).unwrap();
        assert_eq!(agent.state_snapshot(), before);
    }

    #[test]
    fn rejects_out_of_space_inputs() {
        let mut agent = RandomRespondAgent::new(0.5, 0, 2, 1, 0);
        assert!(agent.eval_policy(&Elem::Int(1)).is_err());
        assert!(agent
            .update(&Elem::Int(0), 0.0, &Elem::Int(5), false)
            .is_err());
    }

    #[test]
    fn bias_round_trips_through_paras() {
        let mut agent = RandomRespondAgent::new(0.5, 0, 2, 1, 0);
        agent.set_paras(&Params::new().with("bias", 0.25)).unwrap();
        assert_eq!(agent.get_paras().scalar("bias").unwrap(), 0.25);
    }
}

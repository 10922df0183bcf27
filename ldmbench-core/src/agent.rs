//! Agent contract
//!
//! An agent owns parameters and hidden state. It acts by sampling its
//! policy, evolves hidden state on `update`, and reinitializes hidden state
//! as a deterministic function of the current parameters on `reset`.

use crate::error::Result;
use crate::params::Params;
use crate::rv::RandomVar;
use crate::space::{Elem, Space};

/// Core agent trait
pub trait Agent {
    /// The space of actions this agent emits
    fn action_space(&self) -> Space;

    /// The space of stimuli this agent accepts
    fn observation_space(&self) -> Space;

    /// Return a random variable over the action space conditioned on the
    /// current hidden state and `stimulus`.
    ///
    /// # Errors
    /// `SpaceViolation` if `stimulus` is outside the observation space.
    fn eval_policy(&mut self, stimulus: &Elem) -> Result<RandomVar>;

    /// Sample an action from the policy.
    ///
    /// # Errors
    /// `SpaceViolation` if `stimulus` is outside the observation space.
    fn act(&mut self, stimulus: &Elem) -> Result<Elem> {
        self.eval_policy(stimulus)?.sample()
    }

    /// Evolve hidden state from one observed trial.
    ///
    /// MUST leave hidden state untouched when `done` is true.
    ///
    /// # Errors
    /// `SpaceViolation` if `stimulus` or `action` is outside its space.
    fn update(&mut self, stimulus: &Elem, reward: f64, action: &Elem, done: bool) -> Result<()>;

    /// Reinitialize hidden state from the current parameters
    fn reset(&mut self);

    /// The current parameter dictionary
    fn get_paras(&self) -> Params;

    /// Install a parameter dictionary.
    ///
    /// # Errors
    /// Fails if a required name is missing or has the wrong shape.
    fn set_paras(&mut self, paras: &Params) -> Result<()>;

    /// Opaque snapshot of the hidden state, for equality checks in tests.
    ///
    /// Consumers other than the owning agent must not interpret the
    /// structure beyond comparing snapshots.
    fn state_snapshot(&self) -> serde_json::Value;

    /// Re-seed this agent's RNG; used when the owning model is re-seeded
    fn seed_rng(&mut self, seed: u64);
}

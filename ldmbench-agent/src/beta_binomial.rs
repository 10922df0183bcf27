//! Beta-binomial associative learner
//!
//! Each cue component keeps beta pseudo-counts `(a, b)` starting at (1, 1).
//! The reward prediction is an affine transform of the summed posterior
//! means of the active components; the response policy is a normal around
//! that prediction. Rewards update the counts of active components only.

use ldmbench_core::{
    Agent, BenchError, Elem, Params, RandomVar, Result, RngHandle, Space,
};
use serde_json::json;

/// Beta-binomial agent: `MultiBinary(n)` stimuli, scalar actions
#[derive(Debug, Clone)]
pub struct BetaBinomialAgent {
    n_obs: usize,
    intercept: f64,
    slope: f64,
    sigma: f64,
    a: Vec<f64>,
    b: Vec<f64>,
    rng: RngHandle,
}

impl BetaBinomialAgent {
    /// Create an agent over `n_obs` cue components.
    ///
    /// # Panics
    /// Panics if `n_obs == 0`.
    #[must_use]
    pub fn new(n_obs: usize, intercept: f64, slope: f64, sigma: f64, seed: u64) -> Self {
        assert!(n_obs >= 1, "need at least one cue component");
        Self {
            n_obs,
            intercept,
            slope,
            sigma,
            a: vec![1.0; n_obs],
            b: vec![1.0; n_obs],
            rng: RngHandle::seed_from_u64(seed),
        }
    }

    /// Per-component posterior means `a / (a + b)`
    #[must_use]
    pub fn occurrence_rates(&self) -> Vec<f64> {
        self.a
            .iter()
            .zip(&self.b)
            .map(|(a, b)| a / (a + b))
            .collect()
    }

    fn cue<'a>(&self, stimulus: &'a Elem) -> Result<&'a [u8]> {
        self.observation_space().ensure_contains(stimulus)?;
        stimulus.as_bits().ok_or_else(|| {
            BenchError::Model(format!("expected a cue vector, got {stimulus}"))
        })
    }
}

impl Agent for BetaBinomialAgent {
    fn action_space(&self) -> Space {
        Space::ContinuousScalar
    }

    fn observation_space(&self) -> Space {
        Space::MultiBinary { n: self.n_obs }
    }

    fn eval_policy(&mut self, stimulus: &Elem) -> Result<RandomVar> {
        let x = self.cue(stimulus)?;
        let occ: f64 = self
            .occurrence_rates()
            .iter()
            .zip(x)
            .map(|(mu, xi)| mu * f64::from(*xi))
            .sum();
        let mean = self.intercept + self.slope * occ;
        RandomVar::gaussian(mean, self.sigma, self.rng.clone())
    }

    fn update(&mut self, stimulus: &Elem, reward: f64, action: &Elem, done: bool) -> Result<()> {
        let x = self.cue(stimulus)?;
        self.action_space().ensure_contains(action)?;
        if done {
            return Ok(());
        }
        for (i, xi) in x.iter().enumerate() {
            let xi = f64::from(*xi);
            self.a[i] += xi * reward;
            self.b[i] += xi * (1.0 - reward);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.a = vec![1.0; self.n_obs];
        self.b = vec![1.0; self.n_obs];
    }

    fn get_paras(&self) -> Params {
        Params::new()
            .with("intercept", self.intercept)
            .with("slope", self.slope)
            .with("sigma", self.sigma)
    }

    fn set_paras(&mut self, paras: &Params) -> Result<()> {
        self.intercept = paras.scalar("intercept")?;
        self.slope = paras.scalar("slope")?;
        self.sigma = paras.scalar("sigma")?;
        Ok(())
    }

    fn state_snapshot(&self) -> serde_json::Value {
        json!({ "a": self.a, "b": self.b })
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
    fn fresh_counts_predict_half_occurrence() {
        let mut a = BetaBinomialAgent::new(2, 0.0, 1.0, 1.0, 0);
        let rv = a.eval_policy(&Elem::Bits(vec![1, 1])).unwrap();
        match rv {
            RandomVar::Gaussian { mean, .. } => {
                assert_abs_diff_eq!(mean, 1.0, epsilon = 1e-12)
            }
            RandomVar::Categorical { .. } => panic!("expected a gaussian policy"),
        }
    }

    #[test]
    fn rewards_shift_active_counts_only() {
        let mut agent = BetaBinomialAgent::new(2, 0.0, 1.0, 1.0, 0);
        agent
            .update(&Elem::Bits(vec![1, 0]), 1.0, &Elem::Real(0.0), false)
            .unwrap();
        let rates = agent.occurrence_rates();
        assert_abs_diff_eq!(rates[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rates[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn omission_shifts_counts_the_other_way() {
        let mut agent = BetaBinomialAgent::new(1, 0.0, 1.0, 1.0, 0);
        agent
            .update(&Elem::Bits(vec![1]), 0.0, &Elem::Real(0.0), false)
            .unwrap();
        assert_abs_diff_eq!(agent.occurrence_rates()[0], 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn affine_transform_applies_outside_the_sum() {
        let mut agent = BetaBinomialAgent::new(2, 1.0, 2.0, 1.0, 0);
        let rv = agent.eval_policy(&Elem::Bits(vec![1, 1])).unwrap();
        // occ = 0.5 + 0.5 = 1.0; mean = 1 + 2*1
        match rv {
            RandomVar::Gaussian { mean, .. } => {
                assert_abs_diff_eq!(mean, 3.0, epsilon = 1e-12)
            }
            RandomVar::Categorical { .. } => panic!("expected a gaussian policy"),
        }
    }

    #[test]
    fn reset_restores_uniform_counts() {
        let mut agent = BetaBinomialAgent::new(3, 0.0, 1.0, 1.0, 0);
        agent
            .update(&Elem::Bits(vec![1, 1, 1]), 1.0, &Elem::Real(0.0), false)
            .unwrap();
        agent.reset();
        assert_eq!(agent.state_snapshot(), json!({ "a": [1.0, 1.0, 1.0], "b": [1.0, 1.0, 1.0] }));
    }

    #[test]
    fn done_update_is_a_state_no_op() {
        let mut agent = BetaBinomialAgent::new(2, 0.0, 1.0, 1.0, 0);
        let before = agent.state_snapshot();
        agent
            .update(&Elem::Bits(vec![1, 1]), 1.0, &Elem::Real(0.0), true)
            .unwrap();
        assert_eq!(agent.state_snapshot(), before);
    }
}

//! Multi-armed Bernoulli bandit

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ldmbench_core::{
    BenchError, Capability, Elem, Env, Result, Space, Step, StepInfo,
};

/// Stationary bandit: arm `a` pays reward 1 with probability `p[a]`.
///
/// The stimulus is the constant `0`; episodes never terminate.
#[derive(Debug, Clone)]
pub struct BanditEnv {
    p: Vec<f64>,
    rng: StdRng,
}

impl BanditEnv {
    /// Create a bandit from per-arm reward probabilities.
    ///
    /// # Errors
    /// Fails unless there are at least two arms and every probability lies
    /// in `[0, 1]`.
    pub fn new(p: Vec<f64>, seed: u64) -> Result<Self> {
        if p.len() < 2 {
            return Err(BenchError::Environment(
                "bandit needs at least two arms".to_string(),
            ));
        }
        if p.iter().any(|q| !(0.0..=1.0).contains(q)) {
            return Err(BenchError::Environment(format!(
                "arm probabilities outside [0, 1]: {p:?}"
            )));
        }
        Ok(Self {
            p,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of arms
    #[must_use]
    pub fn n_arms(&self) -> usize {
        self.p.len()
    }
}

impl Env for BanditEnv {
    fn name(&self) -> &str {
        "bandit"
    }

    fn action_space(&self) -> Space {
        Space::Discrete { n: self.p.len() }
    }

    fn observation_space(&self) -> Space {
        Space::Discrete { n: 1 }
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::BenchEnv,
            Capability::DiscreteAction,
            Capability::DiscreteObservation,
        ]
    }

    fn reset(&mut self) -> Result<Elem> {
        Ok(Elem::Int(0))
    }

    fn step(&mut self, action: &Elem) -> Result<Step> {
        self.action_space().ensure_contains(action)?;
        let arm = action.as_index().ok_or_else(|| {
            BenchError::Environment(format!("non-index action {action}"))
        })?;
        let reward = f64::from(self.rng.gen_bool(self.p[arm]));
        Ok(Step {
            stimulus: Elem::Int(0),
            reward,
            done: false,
            info: StepInfo::default(),
        })
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_arm_probabilities() {
        assert!(BanditEnv::new(vec![0.5], 0).is_err());
        assert!(BanditEnv::new(vec![0.5, 1.5], 0).is_err());
        assert!(BanditEnv::new(vec![0.2, 0.8], 0).is_ok());
    }

    #[test]
    fn deterministic_arm_pays_deterministically() {
        let mut env = BanditEnv::new(vec![0.0, 1.0], 0).unwrap();
        for _ in 0..10 {
            assert_eq!(env.step(&Elem::Int(1)).unwrap().reward, 1.0);
            assert_eq!(env.step(&Elem::Int(0)).unwrap().reward, 0.0);
        }
    }

    #[test]
    fn reward_stream_is_seed_reproducible() {
        let mut a = BanditEnv::new(vec![0.3, 0.7], 42).unwrap();
        let mut b = BanditEnv::new(vec![0.3, 0.7], 42).unwrap();
        for _ in 0..50 {
            assert_eq!(
                a.step(&Elem::Int(1)).unwrap().reward,
                b.step(&Elem::Int(1)).unwrap().reward
            );
        }
    }

    #[test]
    fn out_of_range_action_is_a_space_violation() {
        let mut env = BanditEnv::new(vec![0.5, 0.5], 0).unwrap();
        assert!(matches!(
            env.step(&Elem::Int(2)),
            Err(BenchError::SpaceViolation { .. })
        ));
    }

    #[test]
    fn never_terminates() {
        let mut env = BanditEnv::new(vec![0.5, 0.5], 0).unwrap();
        env.reset().unwrap();
        for _ in 0..100 {
            assert!(!env.step(&Elem::Int(0)).unwrap().done);
        }
    }
}

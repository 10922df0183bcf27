//! Classical conditioning over multi-binary cue patterns

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ldmbench_core::{
    BenchError, Capability, Elem, Env, Result, Space, Step, StepInfo,
};

/// Conditioning task: cues are drawn from a fixed pattern roster and the
/// reward for a trial is `dot(weights, cue)` of the pre-step cue.
///
/// Responses are scalar and do not affect the reward; episodes never
/// terminate.
#[derive(Debug, Clone)]
pub struct ConditioningEnv {
    patterns: Vec<Vec<u8>>,
    weights: Vec<f64>,
    current: usize,
    rng: StdRng,
}

impl ConditioningEnv {
    /// Create a task from a cue-pattern roster and per-component reward
    /// weights.
    ///
    /// # Errors
    /// Fails if the roster is empty, any pattern is non-binary, or pattern
    /// and weight lengths disagree.
    pub fn new(patterns: Vec<Vec<u8>>, weights: Vec<f64>, seed: u64) -> Result<Self> {
        if patterns.is_empty() {
            return Err(BenchError::Environment(
                "conditioning task needs at least one cue pattern".to_string(),
            ));
        }
        let n = weights.len();
        for p in &patterns {
            if p.len() != n || p.iter().any(|b| *b > 1) {
                return Err(BenchError::Environment(format!(
                    "cue pattern {p:?} does not fit {n} weighted components"
                )));
            }
        }
        Ok(Self {
            patterns,
            weights,
            current: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of cue components
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    fn draw_pattern(&mut self) -> usize {
        self.rng.gen_range(0..self.patterns.len())
    }

    fn reward_for(&self, pattern: usize) -> f64 {
        self.weights
            .iter()
            .zip(&self.patterns[pattern])
            .map(|(w, b)| w * f64::from(*b))
            .sum()
    }
}

impl Env for ConditioningEnv {
    fn name(&self) -> &str {
        "conditioning"
    }

    fn action_space(&self) -> Space {
        Space::ContinuousScalar
    }

    fn observation_space(&self) -> Space {
        Space::MultiBinary {
            n: self.weights.len(),
        }
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::BenchEnv,
            Capability::ContinuousAction,
            Capability::MultiBinaryObservation,
        ]
    }

    fn reset(&mut self) -> Result<Elem> {
        self.current = self.draw_pattern();
        Ok(Elem::Bits(self.patterns[self.current].clone()))
    }

    fn step(&mut self, action: &Elem) -> Result<Step> {
        self.action_space().ensure_contains(action)?;
        let reward = self.reward_for(self.current);
        self.current = self.draw_pattern();
        Ok(Step {
            stimulus: Elem::Bits(self.patterns[self.current].clone()),
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
    use approx::assert_abs_diff_eq;

    #[test]
    fn reward_pays_for_the_pre_step_cue() {
        // Single pattern: the pre-step cue is always [1, 0, 1].
        let mut env =
            ConditioningEnv::new(vec![vec![1, 0, 1]], vec![0.5, 2.0, 0.25], 0).unwrap();
        env.reset().unwrap();
        let step = env.step(&Elem::Real(0.0)).unwrap();
        assert_abs_diff_eq!(step.reward, 0.75, epsilon = 1e-12);
        assert_eq!(step.stimulus, Elem::Bits(vec![1, 0, 1]));
    }

    #[test]
    fn cue_draws_are_seed_reproducible() {
        let patterns = vec![vec![1, 0], vec![0, 1], vec![1, 1]];
        let mut a = ConditioningEnv::new(patterns.clone(), vec![1.0, 2.0], 5).unwrap();
        let mut b = ConditioningEnv::new(patterns, vec![1.0, 2.0], 5).unwrap();
        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
        for _ in 0..30 {
            let sa = a.step(&Elem::Real(0.0)).unwrap();
            let sb = b.step(&Elem::Real(0.0)).unwrap();
            assert_eq!(sa.stimulus, sb.stimulus);
            assert_eq!(sa.reward, sb.reward);
        }
    }

    #[test]
    fn rejects_mismatched_patterns() {
        assert!(ConditioningEnv::new(vec![], vec![1.0], 0).is_err());
        assert!(ConditioningEnv::new(vec![vec![1, 0]], vec![1.0], 0).is_err());
        assert!(ConditioningEnv::new(vec![vec![2]], vec![1.0], 0).is_err());
    }

    #[test]
    fn rejects_non_scalar_actions() {
        let mut env = ConditioningEnv::new(vec![vec![1]], vec![1.0], 0).unwrap();
        env.reset().unwrap();
        assert!(matches!(
            env.step(&Elem::Bits(vec![1])),
            Err(BenchError::SpaceViolation { .. })
        ));
    }
}

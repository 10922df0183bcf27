//! Closed-loop simulation of (environment, model) pairs

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::capability::{check, Capability};
use crate::config::crash_early;
use crate::error::{BenchError, Result};
use crate::model::Model;
use crate::space::{Elem, Space};
use crate::trajectory::{MultiTrajectory, Trajectory};

/// Additional information from a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step {
    /// Next stimulus presented by the environment
    pub stimulus: Elem,
    /// Reward delivered for the action just taken
    pub reward: f64,
    /// Whether the episode terminated on this step
    pub done: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

/// Environment contract
pub trait Env {
    /// Human-readable environment name
    fn name(&self) -> &str;

    /// The space of actions this environment accepts
    fn action_space(&self) -> Space;

    /// The space of stimuli this environment emits
    fn observation_space(&self) -> Space;

    /// Capabilities this environment declares; must include
    /// [`Capability::BenchEnv`] to be usable by [`simulate`]
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::BenchEnv]
    }

    /// Reset to an initial stimulus
    fn reset(&mut self) -> Result<Elem>;

    /// Advance one step given an action
    fn step(&mut self, action: &Elem) -> Result<Step>;

    /// Observe the completed trial; default no-op for stateless environments
    fn update(&mut self, _stimulus: &Elem, _reward: f64, _action: &Elem, _done: bool) -> Result<()> {
        Ok(())
    }

    /// Release resources; called once after the simulation loop
    fn close(&mut self) {}

    /// Install a deterministic RNG
    fn seed(&mut self, seed: u64);
}

/// Trial horizon for multi-pair simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NTrials {
    /// One horizon broadcast to every environment
    Same(usize),
    /// One horizon per environment
    PerSubject(Vec<usize>),
}

impl From<usize> for NTrials {
    fn from(n: usize) -> Self {
        Self::Same(n)
    }
}

fn compatibility(env: &dyn Env, model: &dyn Model) -> std::result::Result<(), String> {
    if !check(&env.capabilities(), Capability::BenchEnv) {
        return Err(format!("{} does not declare BenchEnv", env.name()));
    }
    if !check(&model.capabilities(), Capability::Interactive) {
        return Err(format!("{} does not declare Interactive", model.name()));
    }
    if !env.action_space().same_kind(&model.action_space()) {
        return Err(format!(
            "action space kinds differ: env {} vs model {}",
            env.action_space(),
            model.action_space()
        ));
    }
    if !env.observation_space().same_kind(&model.observation_space()) {
        return Err(format!(
            "observation space kinds differ: env {} vs model {}",
            env.observation_space(),
            model.observation_space()
        ));
    }
    Ok(())
}

/// Run the closed loop for one (env, model) pair over `n_trials` trials.
///
/// For each trial the model acts on the pre-step stimulus, the environment
/// steps, and both observe the completed trial with the post-step done flag.
/// The returned stimuli are `s₁..s_n`; the initial `s₀` is excluded.
///
/// # Errors
/// With `check` set and a capability or space-kind mismatch: raises
/// `EnvModelMismatch` when the global `crash_early` flag is set, otherwise
/// logs a warning and returns an empty trajectory. Agent/env failures inside
/// the loop always propagate.
pub fn simulate(
    env: &mut dyn Env,
    model: &mut dyn Model,
    n_trials: usize,
    check_compat: bool,
) -> Result<Trajectory> {
    if check_compat {
        if let Err(reason) = compatibility(env, model) {
            if crash_early() {
                return Err(BenchError::EnvModelMismatch(reason));
            }
            warn!(env = env.name(), model = model.name(), %reason, "env/model mismatch; returning empty trajectory");
            return Ok(Trajectory::new());
        }
    }

    let mut trajectory = Trajectory::new();
    let mut stimulus = env.reset()?;
    for _ in 0..n_trials {
        let action = model.act(&stimulus)?;
        let step = env.step(&action)?;
        model.update(&stimulus, step.reward, &action, step.done)?;
        env.update(&stimulus, step.reward, &action, step.done)?;
        trajectory.push(step.stimulus.clone(), step.reward, action);
        stimulus = step.stimulus;
    }
    env.close();
    Ok(trajectory)
}

/// Run [`simulate`] for each subject of a multi-subject model.
///
/// `n_trials` is either broadcast or given per environment. Each subject is
/// projected before its run and unprojected afterwards, win or lose.
///
/// # Errors
/// Fails if the environment count does not match the subject count, or a
/// per-subject horizon list has the wrong length.
pub fn simulate_multi(
    envs: &mut [Box<dyn Env>],
    model: &mut dyn Model,
    n_trials: &NTrials,
    check_compat: bool,
) -> Result<MultiTrajectory> {
    let n_subjects = model.n_subjects();
    if envs.len() != n_subjects {
        return Err(BenchError::EnvModelMismatch(format!(
            "{} environments for {} subjects",
            envs.len(),
            n_subjects
        )));
    }
    let horizons: Vec<usize> = match n_trials {
        NTrials::Same(n) => vec![*n; n_subjects],
        NTrials::PerSubject(v) => {
            if v.len() != n_subjects {
                return Err(BenchError::EnvModelMismatch(format!(
                    "{} horizons for {} subjects",
                    v.len(),
                    n_subjects
                )));
            }
            v.clone()
        }
    };

    let mut out = MultiTrajectory::with_capacity(n_subjects);
    for (i, (env, n)) in envs.iter_mut().zip(horizons).enumerate() {
        model.project(i)?;
        let result = simulate(env.as_mut(), model, n, check_compat);
        model.unproject();
        out.push(result?);
    }
    Ok(out)
}

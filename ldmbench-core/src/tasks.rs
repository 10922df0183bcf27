//! Recovery tasks
//!
//! Meta-experiments that simulate data under a known ground truth and check
//! whether the fitting/scoring pipeline recovers it: model recovery builds a
//! cross-model confusion matrix, parameter recovery collects re-fitted
//! parameter dictionaries for identifiability analysis.

use tracing::info;

use crate::error::{BenchError, Result};
use crate::model::Model;
use crate::params::Params;
use crate::simulation::{simulate, simulate_multi, Env, NTrials};
use crate::suite::{ScoreMatrix, TestSuite};
use crate::testing::ModelTest;
use crate::trajectory::MultiTrajectory;

/// Builds one fresh environment per call; invoked once per subject so
/// multi-subject models each get their own copy
pub type EnvFactory<'a> = &'a dyn Fn() -> Box<dyn Env>;

/// Builds the test row for one simulated dataset
pub type TestFactory<'a> = &'a dyn Fn(String, MultiTrajectory) -> Box<dyn ModelTest>;

fn synthesize(
    model: &mut dyn Model,
    env_factory: EnvFactory<'_>,
    n_trials: usize,
) -> Result<MultiTrajectory> {
    let n_subjects = model.n_subjects();
    if n_subjects == 1 {
        let mut env = env_factory();
        Ok(vec![simulate(env.as_mut(), model, n_trials, true)?])
    } else {
        let mut envs: Vec<Box<dyn Env>> = (0..n_subjects).map(|_| env_factory()).collect();
        simulate_multi(&mut envs, model, &NTrials::Same(n_trials), true)
    }
}

/// Cross-model confusion: simulate each candidate model against the
/// environment, wrap the synthesized data in one test per candidate, and
/// judge every candidate against every test.
///
/// Returns a k×k score matrix whose row i was generated by model i. When
/// models are multi-subject every model must have the same subject count;
/// the factory supplies one environment per subject.
///
/// # Errors
/// Fails on subject-count disagreement, simulation failure, or a fatal
/// judge error.
pub fn model_recovery(
    models: &mut [Box<dyn Model>],
    env_factory: EnvFactory<'_>,
    test_factory: TestFactory<'_>,
    n_trials: usize,
) -> Result<ScoreMatrix> {
    if models.is_empty() {
        return Err(BenchError::Model("model recovery needs candidates".to_string()));
    }
    let n_subjects = models[0].n_subjects();
    if models.iter().any(|m| m.n_subjects() != n_subjects) {
        return Err(BenchError::Model(
            "model recovery requires a uniform subject count".to_string(),
        ));
    }

    let mut suite = TestSuite::new();
    for model in models.iter_mut() {
        info!(model = model.name(), n_trials, "synthesizing recovery data");
        let bundles = synthesize(model.as_mut(), env_factory, n_trials)?;
        suite.push(test_factory(format!("data from {}", model.name()), bundles));
    }
    suite.judge_all(models)
}

/// Parameter recovery for one model over a list of target dictionaries.
///
/// For each target Θ, `n_runs` times: install Θ, simulate `n_trials`,
/// reinitialize parameters so the fit does not start at the truth, fit on
/// the simulated trajectory, and collect the recovered dictionary.
///
/// # Errors
/// Fails if Θ does not fit the model, or simulation/fitting fails.
pub fn param_recovery(
    model: &mut dyn Model,
    env_factory: EnvFactory<'_>,
    targets: &[Params],
    n_runs: usize,
    n_trials: usize,
) -> Result<Vec<Vec<Params>>> {
    let mut recovered = Vec::with_capacity(targets.len());
    for (i, target) in targets.iter().enumerate() {
        let mut runs = Vec::with_capacity(n_runs);
        for run in 0..n_runs {
            model.set_paras(target)?;
            model.reset();
            let mut env = env_factory();
            let trajectory = simulate(env.as_mut(), model, n_trials, true)?;
            if trajectory.is_empty() {
                return Err(BenchError::EnvModelMismatch(
                    "simulation produced no data for parameter recovery".to_string(),
                ));
            }
            model.init_paras()?;
            model.fit(&trajectory)?;
            info!(target = i, run, "recovered parameter set");
            runs.push(model.get_paras());
        }
        recovered.push(runs);
    }
    Ok(recovered)
}

//! The policy-model fitting engine
//!
//! `PolicyModel` wraps an agent with a seed, a parameter initializer, and
//! the maximum-likelihood machinery: the parameter dictionary is packed into
//! a flat vector, the recorded trajectory is replayed deterministically
//! inside the objective, and the resulting negative log-likelihood is
//! minimized by a bounded derivative-free simplex search. Box constraints
//! are enforced by projecting candidates into the bounds before evaluation;
//! a missing or malformed bounds dictionary degrades to unconstrained
//! optimization for that fit.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use ndarray::Array1;
use rand::rngs::StdRng;
use tracing::debug;

use ldmbench_core::{
    pack, pack_bounds, unpack, Agent, BenchError, Bounds, Capability, Elem, Model, Params,
    Prediction, Result, RngHandle, Space, Trajectory,
};

/// How fresh parameters are produced
#[derive(Clone)]
pub enum ParamInit {
    /// A fixed dictionary installed verbatim
    Fixed(Params),
    /// A closure drawing a dictionary through the model RNG
    Sampler(Rc<dyn Fn(&mut StdRng) -> Params>),
}

impl std::fmt::Debug for ParamInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(p) => f.debug_tuple("Fixed").field(p).finish(),
            Self::Sampler(_) => f.write_str("Sampler(..)"),
        }
    }
}

/// Tuneables of the simplex search
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Iteration budget. Each iteration replays the full trajectory, so the
    /// default is deliberately small.
    pub max_iters: u64,
    /// Standard-deviation termination tolerance of the simplex
    pub sd_tolerance: f64,
    /// Axis step used to build the initial simplex around x₀
    pub simplex_step: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iters: 20,
            sd_tolerance: 1e-6,
            simplex_step: 0.1,
        }
    }
}

/// Cost assigned when a candidate renders the policy invalid, so the
/// simplex backs off instead of aborting the fit
const INVALID_CANDIDATE_COST: f64 = 1e12;

fn clamp_into(x: &Array1<f64>, bounds: Option<&[(f64, f64)]>) -> Array1<f64> {
    match bounds {
        Some(flat) => Array1::from_iter(
            x.iter()
                .zip(flat)
                .map(|(v, (lo, hi))| v.clamp(*lo, *hi)),
        ),
        None => x.clone(),
    }
}

/// The replayed negative log-likelihood objective
struct ReplayNll<'a, A: Agent> {
    agent: RefCell<A>,
    template: Params,
    beg: Vec<usize>,
    bounds: Option<Vec<(f64, f64)>>,
    trajectory: &'a Trajectory,
}

impl<'a, A: Agent> ReplayNll<'a, A> {
    fn replay(&self, x: &Array1<f64>) -> Result<f64> {
        let x = clamp_into(x, self.bounds.as_deref());
        let paras = unpack(&self.template, &x, &self.beg)?;
        let mut agent = self.agent.borrow_mut();
        agent.set_paras(&paras)?;
        agent.reset();
        let mut nll = 0.0;
        for (stimulus, reward, action) in self.trajectory.iter() {
            let policy = agent.eval_policy(stimulus)?;
            nll -= policy.log_density(action)?;
            agent.update(stimulus, reward, action, false)?;
        }
        Ok(nll)
    }
}

impl<'a, A: Agent> CostFunction for ReplayNll<'a, A> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        // Candidates outside the valid parameter region (e.g. a negative
        // policy width on an unconstrained fit) cost a large penalty rather
        // than aborting the whole search.
        match self.replay(x) {
            Ok(nll) if nll.is_finite() => Ok(nll),
            Ok(_) => Ok(INVALID_CANDIDATE_COST),
            Err(e) => {
                debug!(error = %e, "objective rejected candidate");
                Ok(INVALID_CANDIDATE_COST)
            }
        }
    }
}

/// A model over an embedded agent, with maximum-likelihood fitting
#[derive(Debug, Clone)]
pub struct PolicyModel<A: Agent + Clone> {
    name: String,
    agent: A,
    seed: u64,
    rng: RngHandle,
    init: ParamInit,
    bounds: Option<Bounds>,
    options: FitOptions,
}

impl<A: Agent + Clone> PolicyModel<A> {
    /// Wrap `agent`, install fresh parameters from `init`, and reset.
    ///
    /// # Errors
    /// Fails if the initializer produces a dictionary the agent rejects.
    pub fn new(name: impl Into<String>, agent: A, seed: u64, init: ParamInit) -> Result<Self> {
        let mut model = Self {
            name: name.into(),
            agent,
            seed,
            rng: RngHandle::seed_from_u64(seed),
            init,
            bounds: None,
            options: FitOptions::default(),
        };
        model.agent.seed_rng(seed);
        model.init_paras()?;
        Ok(model)
    }

    /// Attach box constraints used by `fit`
    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Override the fit tuneables
    #[must_use]
    pub fn with_fit_options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    /// The embedded agent
    #[must_use]
    pub fn agent(&self) -> &A {
        &self.agent
    }

    fn space_capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::new();
        match self.agent.action_space() {
            Space::Discrete { .. } => caps.push(Capability::DiscreteAction),
            Space::ContinuousScalar => caps.push(Capability::ContinuousAction),
            Space::MultiBinary { .. } => {}
        }
        match self.agent.observation_space() {
            Space::Discrete { .. } => caps.push(Capability::DiscreteObservation),
            Space::MultiBinary { .. } => caps.push(Capability::MultiBinaryObservation),
            Space::ContinuousScalar => {}
        }
        caps
    }
}

impl<A: Agent + Clone> Model for PolicyModel<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_space(&self) -> Space {
        self.agent.action_space()
    }

    fn observation_space(&self) -> Space {
        self.agent.observation_space()
    }

    fn capabilities(&self) -> Vec<Capability> {
        let mut caps = vec![
            Capability::Interactive,
            Capability::ProducesPolicy,
            Capability::PredictsLogpdf,
            Capability::ReturnsNumParams,
        ];
        caps.extend(self.space_capabilities());
        caps
    }

    fn act(&mut self, stimulus: &Elem) -> Result<Elem> {
        self.agent.act(stimulus)
    }

    fn predict(&mut self, stimulus: &Elem) -> Result<Prediction> {
        Ok(Prediction::Dist(self.agent.eval_policy(stimulus)?))
    }

    fn update(&mut self, stimulus: &Elem, reward: f64, action: &Elem, done: bool) -> Result<()> {
        self.agent.update(stimulus, reward, action, done)
    }

    fn reset(&mut self) {
        self.agent.reset();
    }

    fn fit(&mut self, trajectory: &Trajectory) -> Result<()> {
        if trajectory.is_empty() {
            return Err(BenchError::Model("cannot fit to an empty trajectory".to_string()));
        }
        // Fits must not be path-dependent on a previous fit.
        self.init_paras()?;

        let template = self.agent.get_paras();
        let packed = pack(&template);
        let dim = packed.vec.len();
        if dim == 0 {
            return Ok(());
        }

        let flat_bounds = match &self.bounds {
            Some(bounds) => {
                let flat = pack_bounds(bounds, &template);
                if flat.is_none() {
                    debug!(model = %self.name, "bounds incompatible with parameters; fitting unconstrained");
                }
                flat
            }
            None => None,
        };

        let x0 = clamp_into(&packed.vec, flat_bounds.as_deref());
        let problem = ReplayNll {
            agent: RefCell::new(self.agent.clone()),
            template: template.clone(),
            beg: packed.beg.clone(),
            bounds: flat_bounds.clone(),
            trajectory,
        };

        // Axis-step simplex around x0.
        let mut simplex = vec![x0.clone()];
        for i in 0..dim {
            let mut vertex = x0.clone();
            vertex[i] += self.options.simplex_step;
            simplex.push(vertex);
        }
        let solver = NelderMead::<Array1<f64>, f64>::new(simplex)
            .with_sd_tolerance(self.options.sd_tolerance)
            .map_err(|e| BenchError::Optimization(e.to_string()))?;

        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(self.options.max_iters))
            .run()
            .map_err(|e| BenchError::Optimization(e.to_string()))?;

        let state = result.state();
        match state.get_termination_status() {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {}
            status => {
                // Keep the best iterate; non-convergence is a diagnostic,
                // not a failure.
                debug!(
                    model = %self.name,
                    iterations = state.get_iter(),
                    ?status,
                    "optimizer stopped without convergence; keeping best iterate"
                );
            }
        }

        let x_best = state
            .get_best_param()
            .cloned()
            .unwrap_or_else(|| x0.clone());
        let x_best = clamp_into(&x_best, flat_bounds.as_deref());
        let fitted = unpack(&template, &x_best, &packed.beg)?;
        self.agent.set_paras(&fitted)?;
        self.agent.reset();
        debug!(
            model = %self.name,
            nll = state.get_best_cost(),
            iterations = state.get_iter(),
            "fit complete"
        );
        Ok(())
    }

    fn init_paras(&mut self) -> Result<()> {
        let paras = match &self.init {
            ParamInit::Fixed(p) => p.clone(),
            ParamInit::Sampler(f) => {
                let f = Rc::clone(f);
                self.rng.with(|rng| f(rng))
            }
        };
        self.agent.set_paras(&paras)?;
        self.agent.reset();
        Ok(())
    }

    fn set_paras(&mut self, paras: &Params) -> Result<()> {
        self.agent.set_paras(paras)
    }

    fn get_paras(&self) -> Params {
        self.agent.get_paras()
    }

    fn n_params(&self) -> usize {
        self.agent.get_paras().flat_len()
    }

    fn seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng.reseed(seed);
        self.agent.seed_rng(seed);
    }

    fn rng(&self) -> RngHandle {
        self.rng.clone()
    }

    fn save(&self, dir: &Path) -> Result<bool> {
        let path = dir.join("params.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&self.agent.get_paras())?)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_respond::RandomRespondAgent;
    use crate::rw_norm::RwNormAgent;
    use approx::assert_abs_diff_eq;

    fn biased_trajectory(n: usize, toward: i64) -> Trajectory {
        let mut t = Trajectory::new();
        for i in 0..n {
            let action = if i % 10 == 0 { 1 - toward } else { toward };
            t.push(Elem::Int(0), 1.0, Elem::Int(action));
        }
        t
    }

    fn bias_model(seed: u64) -> PolicyModel<RandomRespondAgent> {
        let agent = RandomRespondAgent::new(0.5, 1, 2, 1, seed);
        let init = ParamInit::Fixed(Params::new().with("bias", 0.5));
        PolicyModel::new("random-respond", agent, seed, init)
            .unwrap()
            .with_bounds(Bounds::new().with_scalar("bias", Some(1e-3), Some(1.0 - 1e-3)))
            .with_fit_options(FitOptions {
                max_iters: 80,
                ..FitOptions::default()
            })
    }

    #[test]
    fn fit_recovers_a_response_bias() {
        // 90% of recorded actions are arm 1; the fitted bias should land
        // near 0.9 rather than the 0.5 it was initialized with.
        let mut model = bias_model(3);
        model.fit(&biased_trajectory(200, 1)).unwrap();
        let bias = model.get_paras().scalar("bias").unwrap();
        assert!(
            (bias - 0.9).abs() < 0.05,
            "fitted bias {bias} too far from 0.9"
        );
    }

    #[test]
    fn fit_reinitializes_before_optimizing() {
        let mut model = bias_model(3);
        // Poison the current parameters; the fit must start from the
        // initializer, not from here.
        model
            .set_paras(&Params::new().with("bias", 1e-3))
            .unwrap();
        model.fit(&biased_trajectory(200, 1)).unwrap();
        let bias = model.get_paras().scalar("bias").unwrap();
        assert!(bias > 0.5);
    }

    #[test]
    fn malformed_bounds_fall_back_to_unconstrained() {
        let agent = RandomRespondAgent::new(0.5, 1, 2, 1, 5);
        let init = ParamInit::Fixed(Params::new().with("bias", 0.5));
        let mut model = PolicyModel::new("random-respond", agent, 5, init)
            .unwrap()
            // wrong key: does not match the parameter dictionary
            .with_bounds(Bounds::new().with_scalar("epsilon", Some(0.0), Some(1.0)))
            .with_fit_options(FitOptions {
                max_iters: 40,
                ..FitOptions::default()
            });
        model.fit(&biased_trajectory(100, 1)).unwrap();
        assert!(model.get_paras().scalar("bias").unwrap().is_finite());
    }

    #[test]
    fn predict_exposes_the_policy_log_density() {
        let mut model = bias_model(8);
        let prediction = model.predict(&Elem::Int(0)).unwrap();
        let lp0 = prediction.log_density(&Elem::Int(0)).unwrap();
        let lp1 = prediction.log_density(&Elem::Int(1)).unwrap();
        assert_abs_diff_eq!(lp0.exp() + lp1.exp(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn n_params_counts_flat_slots() {
        let agent = RwNormAgent::new(vec![0.0, 0.0, 0.0], 0.5, 0.0, 1.0, 0.1, 0);
        let init = ParamInit::Fixed(agent.get_paras());
        let model = PolicyModel::new("rw", agent, 0, init).unwrap();
        // w (3) + sigma + b0 + b1 + eta
        assert_eq!(model.n_params(), 7);
    }

    #[test]
    fn sampler_draws_through_the_exposed_rng() {
        use rand::Rng;

        let agent = RandomRespondAgent::new(0.5, 1, 2, 1, 7);
        let init = ParamInit::Sampler(Rc::new(|rng: &mut StdRng| {
            Params::new().with("bias", rng.gen_range(0.1..0.9))
        }));
        let mut model = PolicyModel::new("random-respond", agent, 7, init).unwrap();

        model.rng().reseed(4);
        model.init_paras().unwrap();
        let first = model.get_paras().scalar("bias").unwrap();

        model.rng().reseed(4);
        model.init_paras().unwrap();
        let second = model.get_paras().scalar("bias").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reseeding_restores_the_action_stream() {
        let mut model = bias_model(11);
        model.seed(99);
        let first: Vec<Elem> = (0..10)
            .map(|_| model.act(&Elem::Int(0)).unwrap())
            .collect();
        model.seed(99);
        let second: Vec<Elem> = (0..10)
            .map(|_| model.act(&Elem::Int(0)).unwrap())
            .collect();
        assert_eq!(first, second);
    }
}

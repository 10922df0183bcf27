//! Multi-subject adapter
//!
//! `MultiSubjectModel` holds one independent single-subject model per
//! subject plus an explicit projection slot. While projected onto a subject
//! the adapter forwards every single-subject call to that instance; while
//! unprojected, single-subject calls are rejected and callers must use the
//! subject-indexed methods instead.

use std::path::Path;

use ldmbench_core::{
    BenchError, Capability, Elem, Model, Params, Prediction, Result, RngHandle, Space, Trajectory,
};

/// A list of per-subject models behind one `Model` facade
pub struct MultiSubjectModel<M: Model> {
    name: String,
    subjects: Vec<M>,
    active: Option<usize>,
}

impl<M: Model> MultiSubjectModel<M> {
    /// Wrap one model instance per subject.
    ///
    /// # Errors
    /// Fails if `subjects` is empty.
    pub fn new(name: impl Into<String>, subjects: Vec<M>) -> Result<Self> {
        if subjects.is_empty() {
            return Err(BenchError::Model(
                "multi-subject model needs at least one subject".to_string(),
            ));
        }
        Ok(Self {
            name: name.into(),
            subjects,
            active: None,
        })
    }

    /// The currently projected subject index, if any
    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    fn subject(&mut self, subject: usize) -> Result<&mut M> {
        let n = self.subjects.len();
        self.subjects.get_mut(subject).ok_or_else(|| {
            BenchError::Model(format!("subject {subject} out of range for {n} subjects"))
        })
    }

    fn projected(&mut self) -> Result<&mut M> {
        match self.active {
            Some(i) => self.subject(i),
            None => Err(BenchError::CapabilityMissing {
                subject: self.name.clone(),
                capability: Capability::Interactive,
            }),
        }
    }

    /// Sample an action for one subject
    pub fn act_for(&mut self, subject: usize, stimulus: &Elem) -> Result<Elem> {
        self.subject(subject)?.act(stimulus)
    }

    /// Policy prediction for one subject
    pub fn predict_for(&mut self, subject: usize, stimulus: &Elem) -> Result<Prediction> {
        self.subject(subject)?.predict(stimulus)
    }

    /// Evolve one subject's hidden state
    pub fn update_for(
        &mut self,
        subject: usize,
        stimulus: &Elem,
        reward: f64,
        action: &Elem,
        done: bool,
    ) -> Result<()> {
        self.subject(subject)?.update(stimulus, reward, action, done)
    }

    /// Reset one subject's hidden state
    pub fn reset_for(&mut self, subject: usize) -> Result<()> {
        self.subject(subject)?.reset();
        Ok(())
    }

    /// Fit one subject to its trajectory
    pub fn fit_for(&mut self, subject: usize, trajectory: &Trajectory) -> Result<()> {
        self.subject(subject)?.fit(trajectory)
    }

    /// Flattened parameter count of one subject
    pub fn n_params_for(&mut self, subject: usize) -> Result<usize> {
        Ok(self.subject(subject)?.n_params())
    }
}

impl<M: Model> Model for MultiSubjectModel<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_space(&self) -> Space {
        self.subjects[0].action_space()
    }

    fn observation_space(&self) -> Space {
        self.subjects[0].observation_space()
    }

    fn capabilities(&self) -> Vec<Capability> {
        let mut caps = self.subjects[0].capabilities();
        caps.push(Capability::MultiSubject);
        caps
    }

    fn act(&mut self, stimulus: &Elem) -> Result<Elem> {
        self.projected()?.act(stimulus)
    }

    fn predict(&mut self, stimulus: &Elem) -> Result<Prediction> {
        self.projected()?.predict(stimulus)
    }

    fn update(&mut self, stimulus: &Elem, reward: f64, action: &Elem, done: bool) -> Result<()> {
        self.projected()?.update(stimulus, reward, action, done)
    }

    fn reset(&mut self) {
        match self.active {
            Some(i) => self.subjects[i].reset(),
            None => {
                for s in &mut self.subjects {
                    s.reset();
                }
            }
        }
    }

    fn fit(&mut self, trajectory: &Trajectory) -> Result<()> {
        self.projected()?.fit(trajectory)
    }

    fn init_paras(&mut self) -> Result<()> {
        match self.active {
            Some(i) => self.subjects[i].init_paras(),
            None => {
                for s in &mut self.subjects {
                    s.init_paras()?;
                }
                Ok(())
            }
        }
    }

    fn set_paras(&mut self, paras: &Params) -> Result<()> {
        self.projected()?.set_paras(paras)
    }

    fn get_paras(&self) -> Params {
        match self.active {
            Some(i) => self.subjects[i].get_paras(),
            None => Params::new(),
        }
    }

    fn n_params(&self) -> usize {
        self.subjects.iter().map(Model::n_params).sum()
    }

    fn seed(&mut self, seed: u64) {
        // Offset per subject so subjects do not share an action stream.
        for (i, s) in self.subjects.iter_mut().enumerate() {
            s.seed(seed.wrapping_add(i as u64));
        }
    }

    fn rng(&self) -> RngHandle {
        // The projected subject's stream, or subject 0's when unprojected.
        self.subjects[self.active.unwrap_or(0)].rng()
    }

    fn n_subjects(&self) -> usize {
        self.subjects.len()
    }

    fn project(&mut self, subject: usize) -> Result<()> {
        if subject >= self.subjects.len() {
            return Err(BenchError::Model(format!(
                "subject {subject} out of range for {} subjects",
                self.subjects.len()
            )));
        }
        self.active = Some(subject);
        Ok(())
    }

    fn unproject(&mut self) {
        self.active = None;
    }

    fn save(&self, dir: &Path) -> Result<bool> {
        let mut any = false;
        for (i, s) in self.subjects.iter().enumerate() {
            let sub = dir.join(format!("subject_{i}"));
            std::fs::create_dir_all(&sub)?;
            any |= s.save(&sub)?;
        }
        Ok(any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy_model::{ParamInit, PolicyModel};
    use crate::random_respond::RandomRespondAgent;

    fn two_subjects() -> MultiSubjectModel<PolicyModel<RandomRespondAgent>> {
        let subjects = (0..2)
            .map(|i| {
                let bias = if i == 0 { 0.2 } else { 0.8 };
                let agent = RandomRespondAgent::new(bias, 1, 2, 1, 7 + i as u64);
                let init = ParamInit::Fixed(Params::new().with("bias", bias));
                PolicyModel::new(format!("subject-{i}"), agent, 7 + i as u64, init).unwrap()
            })
            .collect();
        MultiSubjectModel::new("pair", subjects).unwrap()
    }

    #[test]
    fn unprojected_single_subject_calls_are_rejected() {
        let mut m = two_subjects();
        assert!(matches!(
            m.act(&Elem::Int(0)),
            Err(BenchError::CapabilityMissing { .. })
        ));
    }

    #[test]
    fn projection_routes_to_the_active_subject() {
        let mut m = two_subjects();
        m.project(1).unwrap();
        assert_eq!(m.get_paras().scalar("bias").unwrap(), 0.8);
        m.unproject();
        m.project(0).unwrap();
        assert_eq!(m.get_paras().scalar("bias").unwrap(), 0.2);
    }

    #[test]
    fn unproject_restores_the_rejecting_state() {
        let mut m = two_subjects();
        m.project(0).unwrap();
        assert!(m.act(&Elem::Int(0)).is_ok());
        m.unproject();
        assert!(m.act(&Elem::Int(0)).is_err());
        assert_eq!(m.active(), None);
    }

    #[test]
    fn projecting_one_subject_leaves_the_other_untouched() {
        let mut m = two_subjects();
        m.project(0).unwrap();
        m.set_paras(&Params::new().with("bias", 0.5)).unwrap();
        m.unproject();
        m.project(1).unwrap();
        assert_eq!(m.get_paras().scalar("bias").unwrap(), 0.8);
    }

    #[test]
    fn out_of_range_projection_fails() {
        let mut m = two_subjects();
        assert!(m.project(2).is_err());
        assert_eq!(m.n_subjects(), 2);
    }

    #[test]
    fn n_params_sums_over_subjects() {
        let m = two_subjects();
        assert_eq!(m.n_params(), 2);
    }

    #[test]
    fn capabilities_include_multi_subject() {
        let m = two_subjects();
        assert!(m.capabilities().contains(&Capability::MultiSubject));
        assert!(m.capabilities().contains(&Capability::Interactive));
    }
}

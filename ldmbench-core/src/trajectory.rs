//! Trajectories and observation bundles

use serde::{Deserialize, Serialize};

use crate::space::Elem;

/// Three equal-length sequences of (stimulus, reward, action) triples
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    /// Stimuli presented by the environment
    pub stimuli: Vec<Elem>,
    /// Rewards delivered for each action
    pub rewards: Vec<f64>,
    /// Actions emitted by the model
    pub actions: Vec<Elem>,
}

impl Trajectory {
    /// Create an empty trajectory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one (stimulus, reward, action) triple
    pub fn push(&mut self, stimulus: Elem, reward: f64, action: Elem) {
        self.stimuli.push(stimulus);
        self.rewards.push(reward);
        self.actions.push(action);
    }

    /// Number of trials
    #[must_use]
    pub fn len(&self) -> usize {
        self.stimuli.len()
    }

    /// Whether the trajectory holds no trials
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stimuli.is_empty()
    }

    /// Iterate (stimulus, reward, action) triples in trial order
    pub fn iter(&self) -> impl Iterator<Item = (&Elem, f64, &Elem)> {
        self.stimuli
            .iter()
            .zip(&self.rewards)
            .zip(&self.actions)
            .map(|((s, r), a)| (s, *r, a))
    }
}

/// Per-subject trajectories of identical structure
pub type MultiTrajectory = Vec<Trajectory>;

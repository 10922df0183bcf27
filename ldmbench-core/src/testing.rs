//! Single- and multi-subject tests
//!
//! A test formalizes a prediction protocol (interactive replay, one-shot
//! batch prediction, or train-then-predict), runs it against a model, and
//! delegates scoring to a [`ScoreKind`]. Tests inherit the capability
//! requirements of their score; a model that lacks one fails fast with a
//! fatal `CapabilityMissing` error.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::warn;

use crate::capability::{require, Capability};
use crate::error::{BenchError, Result};
use crate::model::{Model, Prediction};
use crate::score::{Score, ScoreCtx, ScoreKind};
use crate::space::Elem;
use crate::trajectory::Trajectory;

/// Stimuli with their recorded actions, for the batch protocols
#[derive(Debug, Clone, PartialEq)]
pub struct BatchBundle {
    /// Stimuli in trial order
    pub stimuli: Vec<Elem>,
    /// Recorded actions in trial order
    pub actions: Vec<Elem>,
}

impl BatchBundle {
    /// Pair up stimuli and actions.
    ///
    /// # Errors
    /// Fails on a length mismatch.
    pub fn new(stimuli: Vec<Elem>, actions: Vec<Elem>) -> Result<Self> {
        if stimuli.len() != actions.len() {
            return Err(BenchError::Model(format!(
                "{} stimuli but {} actions",
                stimuli.len(),
                actions.len()
            )));
        }
        Ok(Self { stimuli, actions })
    }

    /// Number of trials
    #[must_use]
    pub fn len(&self) -> usize {
        self.stimuli.len()
    }

    /// Whether the bundle is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stimuli.is_empty()
    }
}

/// How `BatchTrainAndTest` divides its bundle
#[derive(Debug, Clone, PartialEq)]
pub enum Split {
    /// Explicit index lists into the bundle
    Explicit {
        /// Indices used for fitting
        train_indices: Vec<usize>,
        /// Indices used for prediction and scoring
        test_indices: Vec<usize>,
    },
    /// Seeded random shuffle at a train fraction in (0, 1)
    Random {
        /// Fraction of trials assigned to the train split
        train_percentage: f64,
        /// Shuffle seed
        seed: u64,
    },
}

/// A test that can judge a model and produce a score
pub trait ModelTest {
    /// Test name; used for score-matrix rows and persistence
    fn name(&self) -> &str;

    /// Run the prediction protocol against `model` and score it
    fn judge(&self, model: &mut dyn Model) -> Result<Score>;
}

fn require_score_caps(model: &dyn Model, score: ScoreKind) -> Result<()> {
    let caps = model.capabilities();
    for cap in score.required_capabilities() {
        require(model.name(), &caps, *cap)?;
    }
    Ok(())
}

fn require_subjects(model: &dyn Model, n_bundles: usize, multi_subject: bool) -> Result<()> {
    if multi_subject {
        require(model.name(), &model.capabilities(), Capability::MultiSubject)?;
        if n_bundles != model.n_subjects() {
            return Err(BenchError::Model(format!(
                "{n_bundles} observation bundles for {} subjects",
                model.n_subjects()
            )));
        }
    }
    Ok(())
}

/// Write test artifacts under `persist_path/<model_name>/`.
///
/// Failures are warnings, never errors: persistence must not abort a suite.
fn persist(
    persist_path: &Path,
    model: &dyn Model,
    score: &Score,
    predictions: &[Prediction],
    split: Option<(serde_json::Value, serde_json::Value)>,
) {
    let dir = persist_path.join(model.name());
    let write = |name: &str, value: serde_json::Value| -> Result<()> {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_vec_pretty(&value)?)?;
        Ok(())
    };
    let result = (|| -> Result<()> {
        fs::create_dir_all(&dir)?;
        write("score.json", serde_json::json!(score.value))?;
        let payloads: Vec<_> = predictions.iter().map(Prediction::to_payload).collect();
        write("predictions.json", serde_json::to_value(&payloads)?)?;
        if let Some((train, test)) = split {
            write("predictions_train_indices.json", train)?;
            write("predictions_test_indices.json", test)?;
        }
        model.save(&dir)?;
        Ok(())
    })();
    if let Err(e) = result {
        warn!(model = model.name(), error = %e, "failed to persist test artifacts");
    }
}

/// Interactive replay test.
///
/// Resets the model, then for every recorded (stimulus, reward, action)
/// triple appends `predict(stimulus)` to the output and feeds the triple
/// back through `update` with `done = false`.
#[derive(Debug, Clone)]
pub struct InteractiveTest {
    name: String,
    bundles: Vec<Trajectory>,
    multi_subject: bool,
    score: ScoreKind,
    score_bounds: Option<(f64, f64)>,
    persist_path: Option<PathBuf>,
}

impl InteractiveTest {
    /// Single-subject test over one trajectory
    #[must_use]
    pub fn new(name: impl Into<String>, trajectory: Trajectory, score: ScoreKind) -> Self {
        Self {
            name: name.into(),
            bundles: vec![trajectory],
            multi_subject: false,
            score,
            score_bounds: None,
            persist_path: None,
        }
    }

    /// Multi-subject test over per-subject trajectories
    #[must_use]
    pub fn new_multi(
        name: impl Into<String>,
        bundles: Vec<Trajectory>,
        score: ScoreKind,
    ) -> Self {
        Self {
            name: name.into(),
            bundles,
            multi_subject: true,
            score,
            score_bounds: None,
            persist_path: None,
        }
    }

    /// Override the score's display bounds
    #[must_use]
    pub fn with_score_bounds(mut self, min_score: f64, max_score: f64) -> Self {
        self.score_bounds = Some((min_score, max_score));
        self
    }

    /// Persist score, predictions, and an optional model checkpoint after
    /// scoring
    #[must_use]
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    fn replay(model: &mut dyn Model, trajectory: &Trajectory) -> Result<Vec<Prediction>> {
        model.reset();
        let mut predictions = Vec::with_capacity(trajectory.len());
        for (stimulus, reward, action) in trajectory.iter() {
            predictions.push(model.predict(stimulus)?);
            model.update(stimulus, reward, action, false)?;
        }
        Ok(predictions)
    }
}

impl ModelTest for InteractiveTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn judge(&self, model: &mut dyn Model) -> Result<Score> {
        require(model.name(), &model.capabilities(), Capability::Interactive)?;
        require_score_caps(model, self.score)?;
        require_subjects(model, self.bundles.len(), self.multi_subject)?;

        let mut predictions = Vec::new();
        let mut actions = Vec::new();
        if self.multi_subject {
            for (subject, bundle) in self.bundles.iter().enumerate() {
                model.project(subject)?;
                let result = Self::replay(model, bundle);
                model.unproject();
                predictions.extend(result?);
                actions.extend(bundle.actions.iter().cloned());
            }
        } else {
            predictions.extend(Self::replay(model, &self.bundles[0])?);
            actions.extend(self.bundles[0].actions.iter().cloned());
        }

        let ctx = ScoreCtx {
            n_params: model.n_params(),
            n_samples: actions.len(),
        };
        let mut score = self.score.compute(&actions, &predictions, &ctx)?;
        if let Some((lo, hi)) = self.score_bounds {
            score = score.with_bounds(lo, hi);
        }
        if let Some(path) = &self.persist_path {
            persist(path, model, &score, &predictions, None);
        }
        Ok(score)
    }
}

/// One-shot batch prediction test: `predict_batch` once, no updates
#[derive(Debug, Clone)]
pub struct BatchTest {
    name: String,
    bundles: Vec<BatchBundle>,
    multi_subject: bool,
    score: ScoreKind,
    persist_path: Option<PathBuf>,
}

impl BatchTest {
    /// Single-subject test over one bundle
    #[must_use]
    pub fn new(name: impl Into<String>, bundle: BatchBundle, score: ScoreKind) -> Self {
        Self {
            name: name.into(),
            bundles: vec![bundle],
            multi_subject: false,
            score,
            persist_path: None,
        }
    }

    /// Multi-subject test over per-subject bundles
    #[must_use]
    pub fn new_multi(
        name: impl Into<String>,
        bundles: Vec<BatchBundle>,
        score: ScoreKind,
    ) -> Self {
        Self {
            name: name.into(),
            bundles,
            multi_subject: true,
            score,
            persist_path: None,
        }
    }

    /// Persist score and predictions after scoring
    #[must_use]
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }
}

impl ModelTest for BatchTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn judge(&self, model: &mut dyn Model) -> Result<Score> {
        require_score_caps(model, self.score)?;
        require_subjects(model, self.bundles.len(), self.multi_subject)?;

        let mut predictions = Vec::new();
        let mut actions = Vec::new();
        if self.multi_subject {
            for (subject, bundle) in self.bundles.iter().enumerate() {
                model.project(subject)?;
                let result = model.predict_batch(&bundle.stimuli);
                model.unproject();
                predictions.extend(result?);
                actions.extend(bundle.actions.iter().cloned());
            }
        } else {
            predictions.extend(model.predict_batch(&self.bundles[0].stimuli)?);
            actions.extend(self.bundles[0].actions.iter().cloned());
        }

        let ctx = ScoreCtx {
            n_params: model.n_params(),
            n_samples: actions.len(),
        };
        let score = self.score.compute(&actions, &predictions, &ctx)?;
        if let Some(path) = &self.persist_path {
            persist(path, model, &score, &predictions, None);
        }
        Ok(score)
    }
}

/// Train-then-predict test: fit on a train split, score on the test split
#[derive(Debug, Clone)]
pub struct BatchTrainAndTest {
    name: String,
    bundles: Vec<BatchBundle>,
    split: Split,
    multi_subject: bool,
    score: ScoreKind,
    persist_path: Option<PathBuf>,
}

impl BatchTrainAndTest {
    /// Single-subject test over one bundle and a split specification.
    ///
    /// # Errors
    /// Fails if a random split's `train_percentage` is outside (0, 1), a
    /// random split has fewer than two trials to divide, or an explicit
    /// split indexes out of range.
    pub fn new(
        name: impl Into<String>,
        bundle: BatchBundle,
        split: Split,
        score: ScoreKind,
    ) -> Result<Self> {
        Self::build(name, vec![bundle], split, false, score)
    }

    /// Multi-subject test over per-subject bundles; the split specification
    /// is applied to each subject's bundle.
    ///
    /// # Errors
    /// As [`BatchTrainAndTest::new`], checked against every bundle.
    pub fn new_multi(
        name: impl Into<String>,
        bundles: Vec<BatchBundle>,
        split: Split,
        score: ScoreKind,
    ) -> Result<Self> {
        Self::build(name, bundles, split, true, score)
    }

    fn build(
        name: impl Into<String>,
        bundles: Vec<BatchBundle>,
        split: Split,
        multi_subject: bool,
        score: ScoreKind,
    ) -> Result<Self> {
        match &split {
            Split::Random {
                train_percentage, ..
            } => {
                if !(*train_percentage > 0.0 && *train_percentage < 1.0) {
                    return Err(BenchError::Model(format!(
                        "train_percentage must lie in (0, 1), got {train_percentage}"
                    )));
                }
                // A random split must leave both sides non-empty.
                if bundles.iter().any(|b| b.len() < 2) {
                    return Err(BenchError::Model(
                        "a random split needs at least two trials per bundle".to_string(),
                    ));
                }
            }
            Split::Explicit {
                train_indices,
                test_indices,
            } => {
                for bundle in &bundles {
                    let n = bundle.len();
                    if train_indices.iter().chain(test_indices).any(|i| *i >= n) {
                        return Err(BenchError::Model(format!(
                            "split index out of range for {n} trials"
                        )));
                    }
                }
            }
        }
        Ok(Self {
            name: name.into(),
            bundles,
            split,
            multi_subject,
            score,
            persist_path: None,
        })
    }

    /// Persist score, predictions, and split indices after scoring
    #[must_use]
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    fn resolve_split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        match &self.split {
            Split::Explicit {
                train_indices,
                test_indices,
            } => (train_indices.clone(), test_indices.clone()),
            Split::Random {
                train_percentage,
                seed,
            } => {
                let mut indices: Vec<usize> = (0..n).collect();
                let mut rng = StdRng::seed_from_u64(*seed);
                indices.shuffle(&mut rng);
                let n_train = ((n as f64) * train_percentage).round() as usize;
                // n >= 2 is guaranteed by construction for random splits
                let n_train = n_train.clamp(1, n - 1);
                let test = indices.split_off(n_train);
                (indices, test)
            }
        }
    }

    fn take(bundle: &BatchBundle, indices: &[usize]) -> (Vec<Elem>, Vec<Elem>) {
        (
            indices.iter().map(|i| bundle.stimuli[*i].clone()).collect(),
            indices.iter().map(|i| bundle.actions[*i].clone()).collect(),
        )
    }
}

impl ModelTest for BatchTrainAndTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn judge(&self, model: &mut dyn Model) -> Result<Score> {
        require_score_caps(model, self.score)?;
        require_subjects(model, self.bundles.len(), self.multi_subject)?;

        let mut predictions = Vec::new();
        let mut actions = Vec::new();
        let mut train_splits = Vec::with_capacity(self.bundles.len());
        let mut test_splits = Vec::with_capacity(self.bundles.len());
        for (subject, bundle) in self.bundles.iter().enumerate() {
            let (train_indices, test_indices) = self.resolve_split(bundle.len());
            let (x_train, y_train) = Self::take(bundle, &train_indices);
            let (x_test, y_test) = Self::take(bundle, &test_indices);

            if self.multi_subject {
                model.project(subject)?;
            }
            let result = model
                .fit_batch(&x_train, &y_train)
                .and_then(|()| model.predict_batch(&x_test));
            if self.multi_subject {
                model.unproject();
            }
            predictions.extend(result?);
            actions.extend(y_test);
            train_splits.push(train_indices);
            test_splits.push(test_indices);
        }

        let ctx = ScoreCtx {
            n_params: model.n_params(),
            n_samples: actions.len(),
        };
        let score = self.score.compute(&actions, &predictions, &ctx)?;
        if let Some(path) = &self.persist_path {
            // One flat index list per side for a single subject, nested
            // per-subject lists otherwise.
            let split = if self.multi_subject {
                (serde_json::json!(train_splits), serde_json::json!(test_splits))
            } else {
                (
                    serde_json::json!(train_splits[0]),
                    serde_json::json!(test_splits[0]),
                )
            };
            persist(path, model, &score, &predictions, Some(split));
        }
        Ok(score)
    }
}

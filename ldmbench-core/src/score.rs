//! Score taxonomy
//!
//! Every score is a bounded float with a fixed sort direction. The raw value
//! is never altered; the bounds only drive display normalization, which maps
//! any score onto [0, 1] with 1 best regardless of direction.

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{BenchError, Result};
use crate::model::Prediction;
use crate::space::Elem;

/// Clip applied to probabilities inside the cross-entropy computation
const CROSS_ENTROPY_EPS: f64 = 1e-9;

/// Sort direction of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Smaller raw values are better (NLL, AIC, BIC, MSE, MAE, cross-entropy)
    LowerBetter,
    /// Larger raw values are better (Pearson correlation, accuracy)
    HigherBetter,
}

/// The score families understood by the test layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreKind {
    /// Negative log-likelihood
    Nll,
    /// Akaike information criterion: NLL + 2K
    Aic,
    /// Bayesian information criterion: NLL + K·ln(n)
    Bic,
    /// Mean squared error
    Mse,
    /// Mean absolute error
    Mae,
    /// Per-trial cross-entropy against one-hot actions
    CrossEntropy,
    /// Pearson correlation between actions and point predictions
    PearsonCorr,
    /// Fraction of exactly matched actions
    Accuracy,
}

/// Side inputs needed by some score computations
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCtx {
    /// Flattened parameter count of the judged model (AIC/BIC)
    pub n_params: usize,
    /// Number of scored trials (BIC); inferred from the action list when zero
    pub n_samples: usize,
}

impl ScoreKind {
    /// Canonical name, used for CSV headers and persistence
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nll => "NLL",
            Self::Aic => "AIC",
            Self::Bic => "BIC",
            Self::Mse => "MSE",
            Self::Mae => "MAE",
            Self::CrossEntropy => "CrossEntropy",
            Self::PearsonCorr => "PearsonCorr",
            Self::Accuracy => "Accuracy",
        }
    }

    /// Sort direction
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self {
            Self::PearsonCorr | Self::Accuracy => Direction::HigherBetter,
            _ => Direction::LowerBetter,
        }
    }

    /// Default display bounds used for clipping in `norm_score`
    #[must_use]
    pub fn default_bounds(&self) -> (f64, f64) {
        match self {
            Self::PearsonCorr => (-1.0, 1.0),
            Self::Accuracy => (0.0, 1.0),
            _ => (0.0, 1000.0),
        }
    }

    /// Model capabilities a test using this score inherits as requirements
    #[must_use]
    pub fn required_capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Nll | Self::Aic | Self::Bic => &[Capability::PredictsLogpdf],
            _ => &[],
        }
    }

    /// Apply this score's formula to (actions, predictions).
    ///
    /// # Errors
    /// Fails on length mismatches or when predictions lack the payload the
    /// formula needs (log-density, point value, or probability vector).
    pub fn compute(
        &self,
        actions: &[Elem],
        predictions: &[Prediction],
        ctx: &ScoreCtx,
    ) -> Result<Score> {
        if actions.len() != predictions.len() {
            return Err(BenchError::Model(format!(
                "{} actions but {} predictions",
                actions.len(),
                predictions.len()
            )));
        }
        if actions.is_empty() {
            return Err(BenchError::Model("nothing to score".to_string()));
        }
        let n = actions.len() as f64;
        let value = match self {
            Self::Nll => nll_sum(actions, predictions)?,
            Self::Aic => nll_sum(actions, predictions)? + 2.0 * ctx.n_params as f64,
            Self::Bic => {
                let samples = if ctx.n_samples > 0 {
                    ctx.n_samples as f64
                } else {
                    n
                };
                nll_sum(actions, predictions)? + ctx.n_params as f64 * samples.ln()
            }
            Self::Mse => {
                let (a, p) = numeric_pairs(actions, predictions)?;
                a.iter()
                    .zip(&p)
                    .map(|(x, y)| (x - y).powi(2))
                    .sum::<f64>()
                    / n
            }
            Self::Mae => {
                let (a, p) = numeric_pairs(actions, predictions)?;
                a.iter().zip(&p).map(|(x, y)| (x - y).abs()).sum::<f64>() / n
            }
            Self::CrossEntropy => {
                let mut total = 0.0;
                for (action, pred) in actions.iter().zip(predictions) {
                    let probs = prediction_probs(pred)?;
                    let k = action.as_index().ok_or_else(|| {
                        BenchError::Model(format!("cross-entropy of non-index action {action}"))
                    })?;
                    let p = probs.get(k).copied().ok_or_else(|| {
                        BenchError::Model(format!(
                            "action index {k} out of range for {} categories",
                            probs.len()
                        ))
                    })?;
                    total -= p.clamp(CROSS_ENTROPY_EPS, 1.0 - CROSS_ENTROPY_EPS).ln();
                }
                total / n
            }
            Self::PearsonCorr => {
                let (a, p) = numeric_pairs(actions, predictions)?;
                pearson(&a, &p)?
            }
            Self::Accuracy => {
                let (a, p) = numeric_pairs(actions, predictions)?;
                a.iter().zip(&p).filter(|(x, y)| x == y).count() as f64 / n
            }
        };
        Ok(Score::new(*self, value))
    }
}

fn nll_sum(actions: &[Elem], predictions: &[Prediction]) -> Result<f64> {
    let mut total = 0.0;
    for (action, pred) in actions.iter().zip(predictions) {
        total -= pred.log_density(action)?;
    }
    Ok(total)
}

fn numeric_pairs(actions: &[Elem], predictions: &[Prediction]) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut a = Vec::with_capacity(actions.len());
    let mut p = Vec::with_capacity(predictions.len());
    for (action, pred) in actions.iter().zip(predictions) {
        a.push(action.as_f64().ok_or_else(|| {
            BenchError::Model(format!("score needs a numeric action, found {action}"))
        })?);
        p.push(match pred {
            Prediction::Point(x) => *x,
            Prediction::Dist(rv) => match rv {
                crate::rv::RandomVar::Gaussian { mean, .. } => *mean,
                crate::rv::RandomVar::Categorical { .. } => {
                    return Err(BenchError::Model(
                        "score needs a point prediction, found a categorical policy".to_string(),
                    ))
                }
            },
            Prediction::Probs(_) => {
                return Err(BenchError::Model(
                    "score needs a point prediction, found a probability vector".to_string(),
                ))
            }
        });
    }
    Ok((a, p))
}

fn prediction_probs(pred: &Prediction) -> Result<&[f64]> {
    match pred {
        Prediction::Probs(p) => Ok(p),
        Prediction::Dist(rv) => rv.probs().ok_or_else(|| {
            BenchError::Model("cross-entropy needs a categorical prediction".to_string())
        }),
        Prediction::Point(_) => Err(BenchError::Model(
            "cross-entropy needs a probability vector".to_string(),
        )),
    }
}

fn pearson(a: &[f64], b: &[f64]) -> Result<f64> {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a == 0.0 || var_b == 0.0 {
        return Err(BenchError::Model(
            "Pearson correlation undefined for a constant sequence".to_string(),
        ));
    }
    Ok(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// A bounded floating-point score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Which formula produced this score
    pub kind: ScoreKind,
    /// Raw value; never altered by normalization
    pub value: f64,
    /// Lower display bound
    pub min_score: f64,
    /// Upper display bound
    pub max_score: f64,
}

impl Score {
    /// Wrap a raw value with the kind's default display bounds
    #[must_use]
    pub fn new(kind: ScoreKind, value: f64) -> Self {
        let (min_score, max_score) = kind.default_bounds();
        Self {
            kind,
            value,
            min_score,
            max_score,
        }
    }

    /// Override the display bounds
    #[must_use]
    pub fn with_bounds(mut self, min_score: f64, max_score: f64) -> Self {
        self.min_score = min_score;
        self.max_score = max_score;
        self
    }

    /// Clip the raw value into the bound range and map it onto [0, 1],
    /// where 1 is best for both directions
    #[must_use]
    pub fn norm_score(&self) -> f64 {
        let clipped = self.value.clamp(self.min_score, self.max_score);
        let span = self.max_score - self.min_score;
        if span <= 0.0 {
            return 0.5;
        }
        let frac = (clipped - self.min_score) / span;
        match self.kind.direction() {
            Direction::LowerBetter => 1.0 - frac,
            Direction::HigherBetter => frac,
        }
    }

    /// Display color for the normalized value: a red-to-green ramp
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        let norm = self.norm_score();
        let r = ((1.0 - norm) * 255.0).round() as u8;
        let g = (norm * 255.0).round() as u8;
        (r, g, 64)
    }
}

impl PartialOrd for Score {
    /// Sort order is defined by the normalized score
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.norm_score().partial_cmp(&other.norm_score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rv::{RandomVar, RngHandle};
    use approx::assert_abs_diff_eq;

    fn categorical(probs: Vec<f64>) -> Prediction {
        Prediction::Dist(
            RandomVar::categorical(probs, RngHandle::seed_from_u64(0)).unwrap(),
        )
    }

    #[test]
    fn nll_of_categorical_sequence() {
        // S5: p = [0.1, 0.2, 0.3, 0.15, 0.25], actions = [0, 1, 2, 3, 4]
        let probs = vec![0.1, 0.2, 0.3, 0.15, 0.25];
        let actions: Vec<Elem> = (0..5).map(Elem::Int).collect();
        let predictions: Vec<Prediction> =
            (0..5).map(|_| categorical(probs.clone())).collect();
        let score = ScoreKind::Nll
            .compute(&actions, &predictions, &ScoreCtx::default())
            .unwrap();
        let expected: f64 = -probs.iter().map(|p| p.ln()).sum::<f64>();
        assert_abs_diff_eq!(score.value, expected, epsilon = 1e-12);
    }

    #[test]
    fn aic_bic_add_complexity_penalties() {
        let actions = vec![Elem::Int(0), Elem::Int(1)];
        let predictions = vec![categorical(vec![0.5, 0.5]), categorical(vec![0.5, 0.5])];
        let ctx = ScoreCtx {
            n_params: 3,
            n_samples: 2,
        };
        let nll = ScoreKind::Nll.compute(&actions, &predictions, &ctx).unwrap();
        let aic = ScoreKind::Aic.compute(&actions, &predictions, &ctx).unwrap();
        let bic = ScoreKind::Bic.compute(&actions, &predictions, &ctx).unwrap();
        assert_abs_diff_eq!(aic.value, nll.value + 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bic.value, nll.value + 3.0 * 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn nll_is_monotone_in_per_action_density() {
        // If every per-action log-density is strictly greater under A,
        // then NLL(A) < NLL(B).
        let actions = vec![Elem::Int(0), Elem::Int(0), Elem::Int(0)];
        let better: Vec<Prediction> = (0..3).map(|_| categorical(vec![0.9, 0.1])).collect();
        let worse: Vec<Prediction> = (0..3).map(|_| categorical(vec![0.6, 0.4])).collect();
        let ctx = ScoreCtx::default();
        let a = ScoreKind::Nll.compute(&actions, &better, &ctx).unwrap();
        let b = ScoreKind::Nll.compute(&actions, &worse, &ctx).unwrap();
        assert!(a.value < b.value);
        assert!(a.norm_score() > b.norm_score());
    }

    #[test]
    fn regression_scores() {
        let actions = vec![Elem::Real(1.0), Elem::Real(2.0), Elem::Real(3.0)];
        let predictions = vec![
            Prediction::Point(1.5),
            Prediction::Point(2.0),
            Prediction::Point(2.5),
        ];
        let ctx = ScoreCtx::default();
        let mse = ScoreKind::Mse.compute(&actions, &predictions, &ctx).unwrap();
        assert_abs_diff_eq!(mse.value, (0.25 + 0.0 + 0.25) / 3.0, epsilon = 1e-12);
        let mae = ScoreKind::Mae.compute(&actions, &predictions, &ctx).unwrap();
        assert_abs_diff_eq!(mae.value, (0.5 + 0.0 + 0.5) / 3.0, epsilon = 1e-12);
        let rho = ScoreKind::PearsonCorr
            .compute(&actions, &predictions, &ctx)
            .unwrap();
        assert_abs_diff_eq!(rho.value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn accuracy_counts_exact_matches() {
        let actions = vec![Elem::Int(0), Elem::Int(1), Elem::Int(1), Elem::Int(0)];
        let predictions = vec![
            Prediction::Point(0.0),
            Prediction::Point(1.0),
            Prediction::Point(0.0),
            Prediction::Point(0.0),
        ];
        let score = ScoreKind::Accuracy
            .compute(&actions, &predictions, &ScoreCtx::default())
            .unwrap();
        assert_abs_diff_eq!(score.value, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn cross_entropy_clips_probabilities() {
        let actions = vec![Elem::Int(0)];
        let predictions = vec![Prediction::Probs(vec![0.0, 1.0])];
        let score = ScoreKind::CrossEntropy
            .compute(&actions, &predictions, &ScoreCtx::default())
            .unwrap();
        assert!(score.value.is_finite());
        assert_abs_diff_eq!(score.value, -CROSS_ENTROPY_EPS.ln(), epsilon = 1e-9);
    }

    #[test]
    fn norm_score_clips_and_orients() {
        let huge = Score::new(ScoreKind::Nll, 1e9);
        assert_abs_diff_eq!(huge.norm_score(), 0.0);
        // raw value untouched by normalization
        assert_abs_diff_eq!(huge.value, 1e9);

        let perfect = Score::new(ScoreKind::Accuracy, 1.0);
        assert_abs_diff_eq!(perfect.norm_score(), 1.0);
        assert_eq!(perfect.color(), (0, 255, 64));

        let mid = Score::new(ScoreKind::PearsonCorr, 0.0);
        assert_abs_diff_eq!(mid.norm_score(), 0.5);
    }
}

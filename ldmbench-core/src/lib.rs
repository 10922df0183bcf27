//! Core contracts and scoring layer for LDMBench
//!
//! This crate provides the foundational abstractions for benchmarking
//! cognitive learning-and-decision-making models: spaces and capability
//! tags, the agent/model contracts, parameter packing for maximum-likelihood
//! fitting, the closed-loop simulation engine, and the score/test/task
//! layer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod capability;
pub mod config;
pub mod error;
pub mod model;
pub mod params;
pub mod rv;
pub mod score;
pub mod simulation;
pub mod space;
pub mod suite;
pub mod tasks;
pub mod testing;
pub mod trajectory;

// Re-export core traits and types
pub use agent::Agent;
pub use capability::{check, require, Capability};
pub use config::{crash_early, init_logging, set_crash_early, LogLevel};
pub use error::{BenchError, Result};
pub use model::{Model, Prediction, PredictionPayload};
pub use params::{pack, pack_bounds, unpack, Bound, Bounds, BoundsValue, Packed, ParamValue, Params};
pub use rv::{RandomVar, RngHandle};
pub use score::{Direction, Score, ScoreCtx, ScoreKind};
pub use simulation::{simulate, simulate_multi, Env, NTrials, Step, StepInfo};
pub use space::{Elem, Space};
pub use suite::{ScoreMatrix, TestSuite};
pub use tasks::{model_recovery, param_recovery};
pub use testing::{BatchBundle, BatchTest, BatchTrainAndTest, InteractiveTest, ModelTest, Split};
pub use trajectory::{MultiTrajectory, Trajectory};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        simulate, Agent, BenchError, Capability, Elem, Env, Model, Params, Prediction, RandomVar,
        Result, Score, ScoreKind, Space, Trajectory,
    };
}

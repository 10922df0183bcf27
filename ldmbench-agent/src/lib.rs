//! Fitting engine and concrete agents for LDMBench
//!
//! This crate provides:
//! - `PolicyModel`, the maximum-likelihood fitting engine over any agent
//! - a multi-subject adapter with reversible per-subject projection
//! - sample agents: Rescorla-Wagner with a Gaussian policy, noisy
//!   win-stay-lose-shift, beta-binomial, and a biased random responder

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod beta_binomial;
pub mod multi;
pub mod nwsls;
pub mod policy_model;
pub mod random_respond;
pub mod rw_norm;

// Re-export models and agents
pub use beta_binomial::BetaBinomialAgent;
pub use multi::MultiSubjectModel;
pub use nwsls::NwslsAgent;
pub use policy_model::{FitOptions, ParamInit, PolicyModel};
pub use random_respond::RandomRespondAgent;
pub use rw_norm::RwNormAgent;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BetaBinomialAgent, MultiSubjectModel, NwslsAgent, ParamInit, PolicyModel,
        RandomRespondAgent, RwNormAgent,
    };
    pub use ldmbench_core::prelude::*;
}

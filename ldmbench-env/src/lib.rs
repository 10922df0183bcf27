//! Concrete environments for LDMBench
//!
//! Two reference environments for the closed simulation loop: a multi-armed
//! bandit with Bernoulli arms and a classical-conditioning task over
//! multi-binary cue patterns.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bandit;
pub mod conditioning;

pub use bandit::BanditEnv;
pub use conditioning::ConditioningEnv;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{BanditEnv, ConditioningEnv};
    pub use ldmbench_core::prelude::*;
}

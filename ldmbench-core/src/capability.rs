//! Capability tags
//!
//! Capabilities are pure markers identifying that an object supports a named
//! protocol. Tests declare the capabilities they need; a model that does not
//! carry one fails with the fatal `CapabilityMissing` error before any
//! prediction is attempted.

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// A named protocol an object declares support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Supports the interactive predict/update replay protocol
    Interactive,
    /// `predict` yields a policy random variable
    ProducesPolicy,
    /// Predictions expose a log-density/log-mass
    PredictsLogpdf,
    /// Reports a flattened parameter count
    ReturnsNumParams,
    /// Indexes a list of independent per-subject instances
    MultiSubject,
    /// Marks an environment as implementing the benchmark env contract
    BenchEnv,
    /// Action space is discrete
    DiscreteAction,
    /// Action space is a continuous scalar
    ContinuousAction,
    /// Observation space is discrete
    DiscreteObservation,
    /// Observation space is multi-binary
    MultiBinaryObservation,
}

/// Whether `caps` carries `cap`
#[must_use]
pub fn check(caps: &[Capability], cap: Capability) -> bool {
    caps.contains(&cap)
}

/// Fail with a fatal [`BenchError::CapabilityMissing`] unless `caps` carries `cap`
pub fn require(subject: &str, caps: &[Capability], cap: Capability) -> Result<()> {
    if check(caps, cap) {
        Ok(())
    } else {
        Err(BenchError::CapabilityMissing {
            subject: subject.to_string(),
            capability: cap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_and_require() {
        let caps = [Capability::Interactive, Capability::PredictsLogpdf];
        assert!(check(&caps, Capability::Interactive));
        assert!(!check(&caps, Capability::MultiSubject));
        assert!(require("m", &caps, Capability::PredictsLogpdf).is_ok());
        let err = require("m", &caps, Capability::MultiSubject).unwrap_err();
        assert!(matches!(err, BenchError::CapabilityMissing { .. }));
    }
}

//! Stimulus and action spaces
//!
//! A [`Space`] enumerates the valid stimuli or actions of an environment or
//! agent; an [`Elem`] is a point that may or may not belong to one. Both are
//! tagged variants so that heterogeneous model/environment collections can
//! share one trajectory representation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// A point in a stimulus or action space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Elem {
    /// A discrete index
    Int(i64),
    /// A 0/1 vector
    Bits(Vec<u8>),
    /// A real scalar
    Real(f64),
}

impl Elem {
    /// Numeric view of the element, if it has one.
    ///
    /// `Int` and `Real` convert; `Bits` does not.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(k) => Some(*k as f64),
            Self::Real(x) => Some(*x),
            Self::Bits(_) => None,
        }
    }

    /// Discrete index view of the element, if it has one
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Int(k) if *k >= 0 => Some(*k as usize),
            _ => None,
        }
    }

    /// Bit-vector view of the element, if it has one
    #[must_use]
    pub fn as_bits(&self) -> Option<&[u8]> {
        match self {
            Self::Bits(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Elem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(k) => write!(f, "{k}"),
            Self::Real(x) => write!(f, "{x}"),
            Self::Bits(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for Elem {
    fn from(k: i64) -> Self {
        Self::Int(k)
    }
}

impl From<f64> for Elem {
    fn from(x: f64) -> Self {
        Self::Real(x)
    }
}

impl From<Vec<u8>> for Elem {
    fn from(v: Vec<u8>) -> Self {
        Self::Bits(v)
    }
}

/// A stimulus or action space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Space {
    /// Integers `0..n`
    Discrete {
        /// Cardinality
        n: usize,
    },
    /// Length-`n` 0/1 vectors
    MultiBinary {
        /// Vector length
        n: usize,
    },
    /// Any real scalar (integers implicitly cast)
    ContinuousScalar,
}

impl Space {
    /// Membership predicate. Total and side-effect-free.
    #[must_use]
    pub fn contains(&self, x: &Elem) -> bool {
        match (self, x) {
            (Self::Discrete { n }, Elem::Int(k)) => *k >= 0 && (*k as usize) < *n,
            (Self::MultiBinary { n }, Elem::Bits(v)) => {
                v.len() == *n && v.iter().all(|b| *b <= 1)
            }
            (Self::ContinuousScalar, Elem::Real(x)) => x.is_finite(),
            (Self::ContinuousScalar, Elem::Int(_)) => true,
            _ => false,
        }
    }

    /// Fail with a fatal [`BenchError::SpaceViolation`] unless `x` is a member
    pub fn ensure_contains(&self, x: &Elem) -> Result<()> {
        if self.contains(x) {
            Ok(())
        } else {
            Err(BenchError::SpaceViolation {
                space: self.to_string(),
                value: x.to_string(),
            })
        }
    }

    /// Compare variants only, ignoring cardinality.
    ///
    /// Used by the env/model compatibility check, which matches space
    /// *types* rather than identities.
    #[must_use]
    pub fn same_kind(&self, other: &Space) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Dimensionality of the space, where defined
    #[must_use]
    pub fn dim(&self) -> Option<usize> {
        match self {
            Self::Discrete { .. } | Self::ContinuousScalar => Some(1),
            Self::MultiBinary { n } => Some(*n),
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discrete { n } => write!(f, "Discrete({n})"),
            Self::MultiBinary { n } => write!(f, "MultiBinary({n})"),
            Self::ContinuousScalar => write!(f, "ContinuousScalar"),
        }
    }
}

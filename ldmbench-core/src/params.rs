//! Parameter dictionaries, bounds, and the pack/unpack scheme
//!
//! Parameters are ordered heterogeneous records: a mapping from name to a
//! scalar or a fixed-length vector, where insertion order is semantically
//! meaningful. The fitting engine flattens a dictionary into a single real
//! vector by concatenating its values in order; `beg` records where each
//! parameter starts so the optimum can be written back through the same
//! layout.

use indexmap::IndexMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// A single parameter: scalar or fixed-length vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A scalar parameter
    Scalar(f64),
    /// A vector parameter
    Vector(Vec<f64>),
}

impl ParamValue {
    /// Number of flat slots this value occupies
    #[must_use]
    pub fn flat_len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vector(v) => v.len(),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        Self::Scalar(x)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

/// An insertion-ordered parameter dictionary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Params {
    entries: IndexMap<String, ParamValue>,
}

impl Params {
    /// Create an empty dictionary
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a parameter. Names must be unique; overwriting
    /// keeps the original position so the pack layout stays stable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Builder-style `set`
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a parameter by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name)
    }

    /// Scalar parameter by name
    pub fn scalar(&self, name: &str) -> Result<f64> {
        match self.entries.get(name) {
            Some(ParamValue::Scalar(x)) => Ok(*x),
            other => Err(BenchError::Model(format!(
                "expected scalar parameter '{name}', found {other:?}"
            ))),
        }
    }

    /// Vector parameter by name
    pub fn vector(&self, name: &str) -> Result<&[f64]> {
        match self.entries.get(name) {
            Some(ParamValue::Vector(v)) => Ok(v),
            other => Err(BenchError::Model(format!(
                "expected vector parameter '{name}', found {other:?}"
            ))),
        }
    }

    /// Number of named parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of flat slots across all parameters
    #[must_use]
    pub fn flat_len(&self) -> usize {
        self.entries.values().map(ParamValue::flat_len).sum()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }
}

/// A one-sided-optional interval; `None` denotes unbounded on that side
pub type Bound = (Option<f64>, Option<f64>);

/// Bounds for a single parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundsValue {
    /// `(lo, hi)` for a scalar parameter
    Scalar(Bound),
    /// One `(lo, hi)` pair per vector component
    Vector(Vec<Bound>),
}

/// Box constraints keyed like the parameter dictionary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    entries: IndexMap<String, BoundsValue>,
}

impl Bounds {
    /// Create an empty bounds dictionary
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound a scalar parameter
    pub fn set_scalar(&mut self, name: impl Into<String>, lo: Option<f64>, hi: Option<f64>) {
        self.entries.insert(name.into(), BoundsValue::Scalar((lo, hi)));
    }

    /// Bound a vector parameter, one pair per component
    pub fn set_vector(&mut self, name: impl Into<String>, bounds: Vec<Bound>) {
        self.entries.insert(name.into(), BoundsValue::Vector(bounds));
    }

    /// Builder-style scalar bound
    #[must_use]
    pub fn with_scalar(mut self, name: impl Into<String>, lo: Option<f64>, hi: Option<f64>) -> Self {
        self.set_scalar(name, lo, hi);
        self
    }

    /// Builder-style vector bound
    #[must_use]
    pub fn with_vector(mut self, name: impl Into<String>, bounds: Vec<Bound>) -> Self {
        self.set_vector(name, bounds);
        self
    }

    /// Look up bounds by parameter name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoundsValue> {
        self.entries.get(name)
    }
}

/// A packed parameter vector plus its layout
#[derive(Debug, Clone, PartialEq)]
pub struct Packed {
    /// Flat concatenation of all parameter values in insertion order
    pub vec: Array1<f64>,
    /// Cumulative index array of length K+1; parameter i occupies
    /// `vec[beg[i]..beg[i+1]]`
    pub beg: Vec<usize>,
}

/// Flatten a parameter dictionary into a vector and its index layout
#[must_use]
pub fn pack(paras: &Params) -> Packed {
    let mut vec = Vec::with_capacity(paras.flat_len());
    let mut beg = Vec::with_capacity(paras.len() + 1);
    beg.push(0);
    for (_, value) in paras.iter() {
        match value {
            ParamValue::Scalar(x) => vec.push(*x),
            ParamValue::Vector(v) => vec.extend_from_slice(v),
        }
        beg.push(vec.len());
    }
    Packed {
        vec: Array1::from_vec(vec),
        beg,
    }
}

/// Write a flat vector back into the layout of `template`.
///
/// Scalar slots receive `vec[beg[i]]`; vector slots receive
/// `vec[beg[i]..beg[i+1]]`.
///
/// # Errors
/// Fails if `vec` and `beg` do not describe `template`'s layout.
pub fn unpack(template: &Params, vec: &Array1<f64>, beg: &[usize]) -> Result<Params> {
    let monotone = beg.windows(2).all(|w| w[0] <= w[1]);
    if beg.len() != template.len() + 1 || beg.last() != Some(&vec.len()) || !monotone {
        return Err(BenchError::Model(format!(
            "packed layout mismatch: {} parameters, beg={beg:?}, vector length {}",
            template.len(),
            vec.len()
        )));
    }
    let flat = vec.to_vec();
    let mut out = Params::new();
    for (i, (name, value)) in template.iter().enumerate() {
        let slot = &flat[beg[i]..beg[i + 1]];
        match value {
            ParamValue::Scalar(_) => {
                if slot.len() != 1 {
                    return Err(BenchError::Model(format!(
                        "scalar parameter '{name}' mapped to {} slots",
                        slot.len()
                    )));
                }
                out.set(name.clone(), slot[0]);
            }
            ParamValue::Vector(v) => {
                if slot.len() != v.len() {
                    return Err(BenchError::Model(format!(
                        "vector parameter '{name}' of length {} mapped to {} slots",
                        v.len(),
                        slot.len()
                    )));
                }
                out.set(name.clone(), slot.to_vec());
            }
        }
    }
    Ok(out)
}

/// Flatten a bounds dictionary against the layout of `paras`.
///
/// Returns one `(lo, hi)` pair per flat slot, with infinities standing in
/// for unbounded sides. A missing key or an arity mismatch yields `None`,
/// which callers treat as "fall back to unconstrained optimization".
#[must_use]
pub fn pack_bounds(bounds: &Bounds, paras: &Params) -> Option<Vec<(f64, f64)>> {
    let mut flat = Vec::with_capacity(paras.flat_len());
    for (name, value) in paras.iter() {
        match (bounds.get(name)?, value) {
            (BoundsValue::Scalar((lo, hi)), ParamValue::Scalar(_)) => {
                flat.push((lo.unwrap_or(f64::NEG_INFINITY), hi.unwrap_or(f64::INFINITY)));
            }
            (BoundsValue::Vector(pairs), ParamValue::Vector(v)) => {
                if pairs.len() != v.len() {
                    return None;
                }
                for (lo, hi) in pairs {
                    flat.push((lo.unwrap_or(f64::NEG_INFINITY), hi.unwrap_or(f64::INFINITY)));
                }
            }
            _ => return None,
        }
    }
    if flat.iter().any(|(lo, hi)| lo > hi) {
        return None;
    }
    Some(flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn theta() -> Params {
        Params::new()
            .with("a", 1.0)
            .with("b", vec![2.0, 3.0])
            .with("c", 4.0)
    }

    #[test]
    fn pack_mixed_dictionary() {
        let packed = pack(&theta());
        assert_eq!(packed.vec.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(packed.beg, vec![0, 1, 3, 4]);
    }

    #[test]
    fn unpack_restores_structure() {
        let t = theta();
        let packed = pack(&t);
        let restored = unpack(
            &t,
            &Array1::from_vec(vec![10.0, 20.0, 30.0, 40.0]),
            &packed.beg,
        )
        .unwrap();
        assert_eq!(restored.scalar("a").unwrap(), 10.0);
        assert_eq!(restored.vector("b").unwrap(), &[20.0, 30.0]);
        assert_eq!(restored.scalar("c").unwrap(), 40.0);
    }

    #[test]
    fn unpack_rejects_wrong_length() {
        let t = theta();
        let packed = pack(&t);
        assert!(unpack(&t, &Array1::from_vec(vec![1.0, 2.0]), &packed.beg).is_err());
    }

    #[test]
    fn bounds_flatten_against_layout() {
        let b = Bounds::new()
            .with_scalar("a", Some(0.0), Some(2.0))
            .with_vector("b", vec![(None, Some(5.0)), (Some(-1.0), None)])
            .with_scalar("c", None, None);
        let flat = pack_bounds(&b, &theta()).unwrap();
        assert_eq!(flat.len(), 4);
        assert_eq!(flat[0], (0.0, 2.0));
        assert_eq!(flat[1], (f64::NEG_INFINITY, 5.0));
        assert_eq!(flat[2], (-1.0, f64::INFINITY));
        assert_eq!(flat[3], (f64::NEG_INFINITY, f64::INFINITY));
    }

    #[test]
    fn malformed_bounds_degrade_to_none() {
        // missing key
        let b = Bounds::new().with_scalar("a", Some(0.0), Some(1.0));
        assert!(pack_bounds(&b, &theta()).is_none());
        // arity mismatch on the vector parameter
        let b = Bounds::new()
            .with_scalar("a", None, None)
            .with_vector("b", vec![(None, None)])
            .with_scalar("c", None, None);
        assert!(pack_bounds(&b, &theta()).is_none());
        // inverted interval
        let b = Bounds::new()
            .with_scalar("a", Some(2.0), Some(0.0))
            .with_vector("b", vec![(None, None), (None, None)])
            .with_scalar("c", None, None);
        assert!(pack_bounds(&b, &theta()).is_none());
    }

    proptest! {
        #[test]
        fn pack_unpack_round_trip(
            scalars in prop::collection::vec(-1e6_f64..1e6, 1..4),
            vector in prop::collection::vec(-1e6_f64..1e6, 1..6),
        ) {
            let mut t = Params::new();
            for (i, x) in scalars.iter().enumerate() {
                t.set(format!("s{i}"), *x);
            }
            t.set("v", vector.clone());

            let packed = pack(&t);
            let restored = unpack(&t, &packed.vec, &packed.beg).unwrap();
            prop_assert_eq!(&restored, &t);

            // and pack(unpack(theta, x)) gives back x
            let x = Array1::from_iter(packed.vec.iter().map(|v| v + 1.0));
            let shifted = unpack(&t, &x, &packed.beg).unwrap();
            prop_assert_eq!(pack(&shifted).vec, x);
        }
    }
}

//! Validation helpers for Python boundary.
//!
//! This module converts Python-side arguments into the crate's typed
//! inputs and maps crate errors to Python exceptions.

use crate::error::Error as MedprepError;
use crate::preprocessing::PadSpec;
use pyo3::exceptions::PyValueError;

/// Convert a medprep Error to the appropriate Python exception.
pub fn to_py_err(e: MedprepError, context: &str) -> pyo3::PyErr {
    match &e {
        MedprepError::InvalidDimensions(msg)
        | MedprepError::ShapeMismatch(msg)
        | MedprepError::InvalidPadding(msg)
        | MedprepError::Configuration(msg)
        | MedprepError::EmptySelection(msg) => {
            PyValueError::new_err(format!("{}: {}", context, msg))
        }
        MedprepError::ZeroVariance { channel, std } => PyValueError::new_err(format!(
            "{}: channel {} cannot be normalized (std = {})",
            context, channel, std
        )),
    }
}

/// Validate a 3-element sequence and return it as an array.
pub fn parse_dims3(values: &[usize], name: &str) -> pyo3::PyResult<[usize; 3]> {
    if values.len() != 3 {
        return Err(PyValueError::new_err(format!(
            "{} must be a 3-element sequence (got {})",
            name,
            values.len()
        )));
    }
    Ok([values[0], values[1], values[2]])
}

/// Validate receptive field has positive dimensions.
pub fn validate_receptive_field(dims: &[usize; 3], name: &str) -> pyo3::PyResult<()> {
    for (i, &dim) in dims.iter().enumerate() {
        if dim == 0 {
            return Err(PyValueError::new_err(format!(
                "{} dimension {} must be positive (got 0)",
                name, i
            )));
        }
    }
    Ok(())
}

/// Parse `((left, right), (left, right), (left, right))` into a [`PadSpec`].
///
/// Negative amounts are already rejected by pyo3 when extracting `usize`.
pub fn parse_pad_spec(pairs: &[(usize, usize)]) -> pyo3::PyResult<PadSpec> {
    if pairs.len() != 3 {
        return Err(PyValueError::new_err(format!(
            "padding must have one (left, right) pair per spatial axis (got {})",
            pairs.len()
        )));
    }
    Ok(PadSpec([pairs[0], pairs[1], pairs[2]]))
}

/// Validate an optional `(low, high)` pair of finite values.
pub fn validate_cutoff_pair(pair: Option<(f64, f64)>, param_name: &str) -> pyo3::PyResult<()> {
    if let Some((low, high)) = pair {
        if !low.is_finite() || !high.is_finite() {
            return Err(PyValueError::new_err(format!(
                "{}: values must be finite (got ({}, {}))",
                param_name, low, high
            )));
        }
    }
    Ok(())
}

//! Padding and normalization functions for Python bindings.
//!
//! Arrays come in and go out as numpy arrays; pad specs are tuples of
//! `(left, right)` pairs so they can be stored next to a case and passed
//! back for unpadding.

use numpy::{
    IntoPyArray, PyArray3, PyArray4, PyArrayDyn, PyReadonlyArray3, PyReadonlyArray4,
    PyReadonlyArrayDyn,
};
use pyo3::prelude::*;

use super::validation::{
    parse_dims3, parse_pad_spec, to_py_err, validate_cutoff_pair, validate_receptive_field,
};
use crate::preprocessing::{self, CutoffConfig, LogFacade, ZScoreConfig};

/// Compute per-axis padding for full-image inference.
///
/// Args:
///     pad_input_imgs: Whether to pad at all
///     dims_img: Spatial shape of the image [x, y, z]
///     dims_rec_field: Receptive field of the network [x, y, z]
///     dims_highres_segment: Size of sampled segments [x, y, z]
///
/// Returns:
///     ((left, right), (left, right), (left, right))
///
/// Example:
///     >>> medprep.calc_pad_per_axis(True, [10, 10, 10], [5, 5, 5], [10, 10, 10])
///     [(2, 2), (2, 2), (2, 2)]
#[pyfunction]
pub fn calc_pad_per_axis(
    pad_input_imgs: bool,
    dims_img: Vec<usize>,
    dims_rec_field: Vec<usize>,
    dims_highres_segment: Vec<usize>,
) -> PyResult<Vec<(usize, usize)>> {
    let dims_img = parse_dims3(&dims_img, "dims_img")?;
    let rec_field = parse_dims3(&dims_rec_field, "dims_rec_field")?;
    let segment = parse_dims3(&dims_highres_segment, "dims_highres_segment")?;
    if pad_input_imgs {
        validate_receptive_field(&rec_field, "dims_rec_field")?;
    }

    let pad = preprocessing::calc_pad_per_axis(pad_input_imgs, dims_img, rec_field, segment)
        .map_err(|e| to_py_err(e, "calc_pad_per_axis"))?;
    Ok(pad.0.to_vec())
}

/// Reflect-pad a 3D image.
#[pyfunction]
pub fn pad_3d_img<'py>(
    py: Python<'py>,
    img: PyReadonlyArray3<'py, f32>,
    pad: Vec<(usize, usize)>,
) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let pad = parse_pad_spec(&pad)?;
    let padded = preprocessing::pad_3d_img(&img.as_array(), &pad)
        .map_err(|e| to_py_err(e, "pad_3d_img"))?;
    Ok(padded.into_pyarray(py))
}

/// Reflect-pad the spatial axes of a [n, x, y, z] array.
#[pyfunction]
pub fn pad_4d_arr<'py>(
    py: Python<'py>,
    arr: PyReadonlyArray4<'py, f32>,
    pad: Vec<(usize, usize)>,
) -> PyResult<Bound<'py, PyArray4<f32>>> {
    let pad = parse_pad_spec(&pad)?;
    let padded = preprocessing::pad_4d_arr(&arr.as_array(), &pad)
        .map_err(|e| to_py_err(e, "pad_4d_arr"))?;
    Ok(padded.into_pyarray(py))
}

/// Remove padding from the first three axes of an array.
#[pyfunction]
pub fn unpad_3d_img<'py>(
    py: Python<'py>,
    img: PyReadonlyArrayDyn<'py, f32>,
    pad: Vec<(usize, usize)>,
) -> PyResult<Bound<'py, PyArrayDyn<f32>>> {
    let pad = parse_pad_spec(&pad)?;
    let unpadded = preprocessing::unpad_3d_img(&img.as_array(), &pad)
        .map_err(|e| to_py_err(e, "unpad_3d_img"))?;
    Ok(unpadded.into_pyarray(py))
}

/// Z-score normalize each channel over an ROI with optional cutoffs.
///
/// Args:
///     channels: Array [n_channels, x, y, z]
///     roi_mask: Boolean array [x, y, z]
///     apply: If False, channels are returned unchanged
///     cutoff_percents: (low, high) percentiles of ROI intensities, in [0, 100]
///     cutoff_times_std: (low, high) multiples of the ROI std around the ROI mean
///     cutoff_below_mean: Drop voxels below the whole-image mean
///     verbose: Log intermediate statistics
///     job_id: Prefix for log lines
///
/// Example:
///     >>> out = medprep.normalize_int_zscore(
///     ...     channels, roi,
///     ...     cutoff_percents=(5.0, 95.0),
///     ...     cutoff_times_std=(2.0, 2.0),
///     ...     cutoff_below_mean=True,
///     ... )
#[pyfunction]
#[pyo3(signature = (channels, roi_mask, apply=true, cutoff_percents=None, cutoff_times_std=None, cutoff_below_mean=false, verbose=false, job_id=""))]
#[allow(clippy::too_many_arguments)]
pub fn normalize_int_zscore<'py>(
    py: Python<'py>,
    channels: PyReadonlyArray4<'py, f32>,
    roi_mask: PyReadonlyArray3<'py, bool>,
    apply: bool,
    cutoff_percents: Option<(f64, f64)>,
    cutoff_times_std: Option<(f64, f64)>,
    cutoff_below_mean: bool,
    verbose: bool,
    job_id: &str,
) -> PyResult<Bound<'py, PyArray4<f32>>> {
    validate_cutoff_pair(cutoff_percents, "cutoff_percents")?;
    validate_cutoff_pair(cutoff_times_std, "cutoff_times_std")?;

    let config = ZScoreConfig {
        apply,
        cutoffs: CutoffConfig {
            percents: cutoff_percents,
            times_std: cutoff_times_std,
            below_mean: cutoff_below_mean,
        },
        verbose,
    };
    let normalized = preprocessing::normalize_int_zscore(
        &LogFacade,
        channels.as_array(),
        roi_mask.as_array(),
        Some(&config),
        job_id,
    )
    .map_err(|e| to_py_err(e, "normalize_int_zscore"))?;
    Ok(normalized.into_pyarray(py))
}

/// Mean of the eight corner voxels of a 3D image.
#[pyfunction]
pub fn calc_border_int_of_3d_img(img: PyReadonlyArray3<'_, f32>) -> PyResult<f64> {
    preprocessing::calc_border_int_of_3d_img(img.as_array())
        .map_err(|e| to_py_err(e, "calc_border_int_of_3d_img"))
}

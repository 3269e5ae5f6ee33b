//! Python module definition.

use pyo3::prelude::*;

use super::preprocessing;

#[pymodule]
fn _medprep(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Padding
    m.add_function(wrap_pyfunction!(preprocessing::calc_pad_per_axis, m)?)?;
    m.add_function(wrap_pyfunction!(preprocessing::pad_3d_img, m)?)?;
    m.add_function(wrap_pyfunction!(preprocessing::pad_4d_arr, m)?)?;
    m.add_function(wrap_pyfunction!(preprocessing::unpad_3d_img, m)?)?;

    // Intensity normalization
    m.add_function(wrap_pyfunction!(preprocessing::normalize_int_zscore, m)?)?;
    m.add_function(wrap_pyfunction!(preprocessing::calc_border_int_of_3d_img, m)?)?;

    Ok(())
}

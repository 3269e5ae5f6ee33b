//! Mirroring of volumes along chosen axes.

use ndarray::{Array, ArrayBase, Axis, Data, Dimension};

/// Reverse `arr` along each of the first three axes whose flag is set.
///
/// Higher axes, if any, are left as they are.
pub fn reflect_array_if_needed<S, T, D>(flags: [bool; 3], arr: &ArrayBase<S, D>) -> Array<T, D>
where
    S: Data<Elem = T>,
    T: Clone,
    D: Dimension,
{
    let ndim = arr.ndim();
    let mut view = arr.view();
    for (axis, _) in flags
        .iter()
        .enumerate()
        .filter(|&(axis, &flip)| flip && axis < ndim)
    {
        view.invert_axis(Axis(axis));
    }
    view.as_standard_layout().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array3};

    #[test]
    fn test_reflect_selected_axes() {
        let data: Vec<i32> = (0..24).collect();
        let arr = Array3::from_shape_vec((2, 3, 4), data).unwrap();

        let out = reflect_array_if_needed([false, true, false], &arr);
        assert_eq!(out.slice(s![.., 0, ..]), arr.slice(s![.., 2, ..]));
        assert_eq!(out.slice(s![.., 1, ..]), arr.slice(s![.., 1, ..]));

        let all = reflect_array_if_needed([true, true, true], &arr);
        assert_eq!(all[[0, 0, 0]], 23);
        assert_eq!(all[[1, 2, 3]], 0);
    }

    #[test]
    fn test_reflect_none_is_copy() {
        let arr = Array3::<f32>::ones((2, 2, 2));
        assert_eq!(reflect_array_if_needed([false; 3], &arr), arr);
    }
}

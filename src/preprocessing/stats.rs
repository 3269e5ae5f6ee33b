//! Summary statistics over voxel intensities.
//!
//! Accumulation is done in `f64` regardless of the storage type.

use crate::error::{Error, Result};
use ndarray::ArrayView3;

/// Mean, population standard deviation and maximum of a set of voxels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
}

impl ImageStats {
    /// Compute statistics over `values`. Returns `None` for an empty set.
    ///
    /// The standard deviation uses `ddof = 0`, i.e. it divides by `n`.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let iter = values.into_iter();
        let mut n = 0usize;
        let mut sum = 0.0f64;
        let mut max = f64::NEG_INFINITY;
        for v in iter.clone() {
            n += 1;
            sum += v;
            if v > max {
                max = v;
            }
        }
        if n == 0 {
            return None;
        }

        let mean = sum / n as f64;
        // second pass keeps the variance numerically stable
        let sq: f64 = iter.map(|v| (v - mean) * (v - mean)).sum();
        Some(Self {
            mean,
            std: (sq / n as f64).sqrt(),
            max,
        })
    }
}

/// Linear-interpolated percentile of already sorted data.
///
/// `q` is a percentage in `[0, 100]`. The rank is `q / 100 * (n - 1)` and
/// values between two ranks are interpolated linearly.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentiles `qs` of `values`. The input is sorted once for all queries.
pub fn percentiles(mut values: Vec<f64>, qs: &[f64]) -> Option<Vec<f64>> {
    values.sort_unstable_by(f64::total_cmp);
    qs.iter().map(|&q| percentile_sorted(&values, q)).collect()
}

/// Mean intensity of the eight corner voxels of a 3D volume.
///
/// Serves as an estimate of background intensity, e.g. as a constant
/// padding value.
pub fn calc_border_int_of_3d_img<T>(img: ArrayView3<'_, T>) -> Result<f64>
where
    T: Copy + Into<f64>,
{
    let (x, y, z) = img.dim();
    if x == 0 || y == 0 || z == 0 {
        return Err(Error::InvalidDimensions(format!(
            "cannot take corners of empty volume {:?}",
            img.shape()
        )));
    }

    let (x, y, z) = (x - 1, y - 1, z - 1);
    let corners = [
        [0, 0, 0],
        [x, 0, 0],
        [0, y, 0],
        [x, y, 0],
        [0, 0, z],
        [x, 0, z],
        [0, y, z],
        [x, y, z],
    ];
    let sum: f64 = corners.iter().map(|&idx| -> f64 { img[idx].into() }).sum();
    Ok(sum / corners.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_stats_basic() {
        let stats = ImageStats::from_values([1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((stats.mean - 2.5).abs() < 1e-12);
        // population std of 1..=4
        assert!((stats.std - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_stats_empty() {
        assert!(ImageStats::from_values(std::iter::empty::<f64>()).is_none());
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted: Vec<f64> = (0..=10).map(f64::from).collect();
        assert_eq!(percentile_sorted(&sorted, 0.0), Some(0.0));
        assert_eq!(percentile_sorted(&sorted, 100.0), Some(10.0));
        assert_eq!(percentile_sorted(&sorted, 50.0), Some(5.0));
        let p = percentile_sorted(&sorted, 25.0).unwrap();
        assert!((p - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_rejects_out_of_range() {
        assert_eq!(percentile_sorted(&[1.0, 2.0], 101.0), None);
        assert_eq!(percentile_sorted(&[], 50.0), None);
    }

    #[test]
    fn test_percentiles_sorts_input() {
        let values = vec![4.0, 1.0, 3.0, 2.0, 0.0];
        let ps = percentiles(values, &[0.0, 50.0, 100.0]).unwrap();
        assert_eq!(ps, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_border_intensity() {
        let mut img = Array3::<f32>::zeros((3, 4, 5));
        img[[0, 0, 0]] = 8.0;
        img[[2, 3, 4]] = 8.0;
        img[[1, 1, 1]] = 100.0; // interior, ignored
        let border = calc_border_int_of_3d_img(img.view()).unwrap();
        assert!((border - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_border_intensity_empty() {
        let img = Array3::<f32>::zeros((0, 4, 5));
        assert!(calc_border_int_of_3d_img(img.view()).is_err());
    }
}

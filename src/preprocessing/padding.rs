//! Padding of whole cases so a fixed-size inference window covers every voxel.
//!
//! The network sees `receptive_field - 1` voxels of context around each
//! prediction, so inferring on the full image needs that many extra voxels
//! split across both sides of every axis. Padding mirrors the image at its
//! borders instead of filling with a constant.
//!
//! The [`PadSpec`] returned by padding must be kept by the caller and
//! handed back to [`unpad_3d_img`] to recover the original extent.

use crate::error::{Error, Result};
use ndarray::{Array, Array3, Array4, ArrayBase, Axis, Data, Dimension, Ix3, Ix4, Slice};
use serde::{Deserialize, Serialize};

/// Voxels added before and after each spatial axis `(x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PadSpec(pub [(usize, usize); 3]);

impl PadSpec {
    /// No padding on any axis.
    pub const ZERO: Self = Self([(0, 0); 3]);

    /// `(left, right)` padding of spatial axis `axis`.
    pub fn axis(&self, axis: usize) -> (usize, usize) {
        self.0[axis]
    }

    /// True if no axis is padded.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&(l, r)| l == 0 && r == 0)
    }

    /// Spatial dimensions after applying this padding to `dims`.
    pub fn padded_dims(&self, dims: [usize; 3]) -> [usize; 3] {
        let mut out = dims;
        for (o, &(l, r)) in out.iter_mut().zip(self.0.iter()) {
            *o += l + r;
        }
        out
    }
}

impl From<[(usize, usize); 3]> for PadSpec {
    fn from(pairs: [(usize, usize); 3]) -> Self {
        Self(pairs)
    }
}

/// Compute how much to pad each spatial axis of an image.
///
/// Per axis, `left = (rf - 1) / 2` and `right = rf - 1 - left`, so the
/// image grows by exactly `rf - 1`. If a segment would still not fit in the
/// padded image, the shortfall is added to the right side.
///
/// # Arguments
///
/// * `enabled` - Whether padding is requested at all; if not, returns [`PadSpec::ZERO`]
/// * `image_dims` - Spatial shape of the image `[x, y, z]`
/// * `receptive_field_dims` - Receptive field of the network `[x, y, z]`, each at least 1
/// * `segment_dims` - Size of the segments sampled for the network `[x, y, z]`
///
/// # Example
///
/// ```
/// use medprep::preprocessing::calc_pad_per_axis;
///
/// let pad = calc_pad_per_axis(true, [10, 10, 10], [5, 5, 5], [10, 10, 10]).unwrap();
/// assert_eq!(pad.0, [(2, 2), (2, 2), (2, 2)]);
/// ```
pub fn calc_pad_per_axis(
    enabled: bool,
    image_dims: [usize; 3],
    receptive_field_dims: [usize; 3],
    segment_dims: [usize; 3],
) -> Result<PadSpec> {
    if !enabled {
        return Ok(PadSpec::ZERO);
    }

    let mut pad = PadSpec::ZERO;
    for axis in 0..3 {
        let rf = receptive_field_dims[axis];
        if rf == 0 {
            return Err(Error::InvalidPadding(format!(
                "receptive field must be at least 1 on every axis, got {:?}",
                receptive_field_dims
            )));
        }
        let left = (rf - 1) / 2;
        let mut right = rf - 1 - left;
        // Segment larger than the padded image, e.g. full-image inference on a small case.
        right += segment_dims[axis].saturating_sub(image_dims[axis] + left + right);
        pad.0[axis] = (left, right);
    }
    Ok(pad)
}

/// Source index for every position of a reflect-padded axis.
///
/// Mirrors without repeating the edge voxel (`c b | a b c | b a`). Pads
/// wider than the axis keep reflecting back and forth; a length-1 axis
/// repeats its only voxel.
fn reflect_indices(len: usize, left: usize, right: usize) -> Result<Vec<usize>> {
    match len {
        0 if left + right > 0 => Err(Error::InvalidPadding(
            "cannot reflect-pad an empty axis".to_string(),
        )),
        0 => Ok(Vec::new()),
        1 => Ok(vec![0; left + 1 + right]),
        _ => {
            let period = 2 * (len - 1);
            Ok((0..left + len + right)
                .map(|i| {
                    let m = (i as isize - left as isize).rem_euclid(period as isize) as usize;
                    if m < len {
                        m
                    } else {
                        period - m
                    }
                })
                .collect())
        }
    }
}

/// Reflect-pad a 3D image.
pub fn pad_3d_img<S, T>(img: &ArrayBase<S, Ix3>, pad: &PadSpec) -> Result<Array3<T>>
where
    S: Data<Elem = T>,
    T: Clone,
{
    if pad.is_zero() {
        return Ok(img.to_owned());
    }
    let (x, y, z) = img.dim();
    let mx = reflect_indices(x, pad.0[0].0, pad.0[0].1)?;
    let my = reflect_indices(y, pad.0[1].0, pad.0[1].1)?;
    let mz = reflect_indices(z, pad.0[2].0, pad.0[2].1)?;

    Ok(Array3::from_shape_fn(
        (mx.len(), my.len(), mz.len()),
        |(i, j, k)| img[[mx[i], my[j], mz[k]]].clone(),
    ))
}

/// Reflect-pad the three spatial axes of a 4D array `[n, x, y, z]`.
///
/// The leading axis (channels, or weight-map categories) is not padded.
pub fn pad_4d_arr<S, T>(arr: &ArrayBase<S, Ix4>, pad: &PadSpec) -> Result<Array4<T>>
where
    S: Data<Elem = T>,
    T: Clone,
{
    if pad.is_zero() {
        return Ok(arr.to_owned());
    }
    let (n, x, y, z) = arr.dim();
    let mx = reflect_indices(x, pad.0[0].0, pad.0[0].1)?;
    let my = reflect_indices(y, pad.0[1].0, pad.0[1].1)?;
    let mz = reflect_indices(z, pad.0[2].0, pad.0[2].1)?;

    Ok(Array4::from_shape_fn(
        (n, mx.len(), my.len(), mz.len()),
        |(c, i, j, k)| arr[[c, mx[i], my[j], mz[k]]].clone(),
    ))
}

/// Remove padding from the first three axes of `img`.
///
/// Accepts any array with at least three dimensions, so a prediction laid
/// out as `[x, y, z, classes]` can be unpadded directly. An axis whose
/// right pad is zero keeps its last voxel.
pub fn unpad_3d_img<S, T, D>(img: &ArrayBase<S, D>, pad: &PadSpec) -> Result<Array<T, D>>
where
    S: Data<Elem = T>,
    T: Clone,
    D: Dimension,
{
    if img.ndim() < 3 {
        return Err(Error::InvalidDimensions(format!(
            "unpadding needs at least 3 dimensions, got shape {:?}",
            img.shape()
        )));
    }

    let mut view = img.view();
    for (axis, &(left, right)) in pad.0.iter().enumerate() {
        let len = view.len_of(Axis(axis));
        if left + right > len {
            return Err(Error::InvalidPadding(format!(
                "axis {} has length {} but padding ({}, {}) was requested for removal",
                axis, len, left, right
            )));
        }
        view.slice_axis_inplace(Axis(axis), Slice::from(left..len - right));
    }
    Ok(view.to_owned())
}

/// All arrays belonging to one case.
///
/// `channels` and `wmaps_per_cat` are `[n, x, y, z]`; the label image and
/// ROI mask are `[x, y, z]` with the same spatial shape.
#[derive(Debug, Clone)]
pub struct CaseImages<C = f32, L = i32> {
    pub channels: Array4<C>,
    pub gt_lbl_img: Option<Array3<L>>,
    pub roi_mask: Option<Array3<bool>>,
    pub wmaps_per_cat: Option<Array4<C>>,
}

/// A case after padding, together with the padding that was applied.
#[derive(Debug, Clone)]
pub struct PaddedCase<C = f32, L = i32> {
    pub images: CaseImages<C, L>,
    pub pad: PadSpec,
}

impl<C, L> CaseImages<C, L> {
    /// Case with only image channels.
    pub fn from_channels(channels: Array4<C>) -> Self {
        Self {
            channels,
            gt_lbl_img: None,
            roi_mask: None,
            wmaps_per_cat: None,
        }
    }

    /// Spatial shape `[x, y, z]` of the channels.
    pub fn spatial_dims(&self) -> [usize; 3] {
        let (_, x, y, z) = self.channels.dim();
        [x, y, z]
    }

    fn check_shapes(&self) -> Result<()> {
        let dims = self.spatial_dims();
        let mismatch = |name: &str, shape: &[usize]| {
            Error::ShapeMismatch(format!(
                "{} has spatial shape {:?}, channels have {:?}",
                name, shape, dims
            ))
        };

        if let Some(lbl) = &self.gt_lbl_img {
            if lbl.shape() != &dims[..] {
                return Err(mismatch("ground-truth labels", lbl.shape()));
            }
        }
        if let Some(mask) = &self.roi_mask {
            if mask.shape() != &dims[..] {
                return Err(mismatch("ROI mask", mask.shape()));
            }
        }
        if let Some(wmaps) = &self.wmaps_per_cat {
            if &wmaps.shape()[1..] != &dims[..] {
                return Err(mismatch("weight maps", &wmaps.shape()[1..]));
            }
        }
        Ok(())
    }
}

/// Pad every array of a case with the same reflect padding.
///
/// The padding is computed from the channels' spatial shape with
/// [`calc_pad_per_axis`]. When `enabled` is false the case is returned
/// untouched with [`PadSpec::ZERO`].
pub fn pad_imgs_of_case<C, L>(
    case: CaseImages<C, L>,
    enabled: bool,
    receptive_field_dims: [usize; 3],
    segment_dims: [usize; 3],
) -> Result<PaddedCase<C, L>>
where
    C: Clone,
    L: Clone,
{
    case.check_shapes()?;
    let pad = calc_pad_per_axis(
        enabled,
        case.spatial_dims(),
        receptive_field_dims,
        segment_dims,
    )?;
    if !enabled {
        return Ok(PaddedCase { images: case, pad });
    }
    log::debug!(
        "padding case of spatial shape {:?} with {:?}",
        case.spatial_dims(),
        pad.0
    );

    let images = CaseImages {
        channels: pad_4d_arr(&case.channels, &pad)?,
        gt_lbl_img: case
            .gt_lbl_img
            .as_ref()
            .map(|lbl| pad_3d_img(lbl, &pad))
            .transpose()?,
        roi_mask: case
            .roi_mask
            .as_ref()
            .map(|mask| pad_3d_img(mask, &pad))
            .transpose()?,
        wmaps_per_cat: case
            .wmaps_per_cat
            .as_ref()
            .map(|wmaps| pad_4d_arr(wmaps, &pad))
            .transpose()?,
    };
    Ok(PaddedCase { images, pad })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array1};

    fn ramp_3d(shape: (usize, usize, usize)) -> Array3<f32> {
        let n = shape.0 * shape.1 * shape.2;
        Array3::from_shape_vec(shape, (0..n).map(|i| i as f32).collect()).unwrap()
    }

    #[test]
    fn test_calc_pad_symmetric() {
        let pad = calc_pad_per_axis(true, [10, 10, 10], [5, 5, 5], [10, 10, 10]).unwrap();
        assert_eq!(pad, PadSpec([(2, 2), (2, 2), (2, 2)]));
    }

    #[test]
    fn test_calc_pad_even_receptive_field() {
        // rf - 1 = 5 split as 2 left, 3 right
        let pad = calc_pad_per_axis(true, [10, 10, 10], [6, 6, 1], [1, 1, 1]).unwrap();
        assert_eq!(pad, PadSpec([(2, 3), (2, 3), (0, 0)]));
    }

    #[test]
    fn test_calc_pad_disabled() {
        let pad = calc_pad_per_axis(false, [10, 10, 10], [5, 5, 5], [40, 40, 40]).unwrap();
        assert_eq!(pad, PadSpec::ZERO);
    }

    #[test]
    fn test_calc_pad_extra_right_for_large_segment() {
        let pad = calc_pad_per_axis(true, [10, 20, 10], [5, 5, 5], [25, 10, 14]).unwrap();
        // x: 10 + 4 = 14 < 25, so 11 more on the right
        assert_eq!(pad, PadSpec([(2, 13), (2, 2), (2, 2)]));
        let padded = pad.padded_dims([10, 20, 10]);
        assert_eq!(padded[0], 25);
        assert_eq!(padded[2], 14);
    }

    #[test]
    fn test_calc_pad_zero_receptive_field() {
        let result = calc_pad_per_axis(true, [10, 10, 10], [5, 0, 5], [10, 10, 10]);
        assert!(matches!(result, Err(Error::InvalidPadding(_))));
    }

    #[test]
    fn test_reflect_indices_match_numpy_reflect() {
        // np.pad([0, 1, 2, 3], (3, 2), 'reflect') -> [3, 2, 1, 0, 1, 2, 3, 2, 1]
        assert_eq!(
            reflect_indices(4, 3, 2).unwrap(),
            vec![3, 2, 1, 0, 1, 2, 3, 2, 1]
        );
        // wider than the axis: keeps bouncing
        assert_eq!(
            reflect_indices(3, 5, 0).unwrap(),
            vec![1, 0, 1, 2, 1, 0, 1, 2]
        );
        assert_eq!(reflect_indices(1, 2, 1).unwrap(), vec![0, 0, 0, 0]);
        assert!(reflect_indices(0, 1, 0).is_err());
    }

    #[test]
    fn test_pad_3d_mirrors_border() {
        let img = ramp_3d((4, 5, 6));
        let pad = PadSpec([(2, 1), (1, 2), (3, 0)]);
        let padded = pad_3d_img(&img, &pad).unwrap();
        assert_eq!(padded.dim(), (7, 8, 9));

        // interior is the original image
        assert_eq!(padded.slice(s![2..6, 1..6, 3..9]), img);

        // left of x: padded[1] mirrors img[1], padded[0] mirrors img[2]
        assert_eq!(padded.slice(s![1, 1..6, 3..9]), img.slice(s![1, .., ..]));
        assert_eq!(padded.slice(s![0, 1..6, 3..9]), img.slice(s![2, .., ..]));
        // right of y: padded[6] mirrors img[3], padded[7] mirrors img[2]
        assert_eq!(padded.slice(s![2..6, 6, 3..9]), img.slice(s![.., 3, ..]));
        assert_eq!(padded.slice(s![2..6, 7, 3..9]), img.slice(s![.., 2, ..]));
    }

    #[test]
    fn test_pad_4d_leaves_leading_axis() {
        let data: Vec<f32> = (0..2 * 3 * 3 * 3).map(|i| i as f32).collect();
        let arr = Array4::from_shape_vec((2, 3, 3, 3), data).unwrap();
        let pad = PadSpec([(1, 1), (1, 1), (1, 1)]);
        let padded = pad_4d_arr(&arr, &pad).unwrap();
        assert_eq!(padded.dim(), (2, 5, 5, 5));
        for c in 0..2 {
            let expected = pad_3d_img(&arr.index_axis(Axis(0), c), &pad).unwrap();
            assert_eq!(padded.index_axis(Axis(0), c), expected);
        }
    }

    #[test]
    fn test_unpad_roundtrip() {
        let img = ramp_3d((5, 4, 3));
        for pad in [
            PadSpec([(2, 2), (2, 2), (2, 2)]),
            PadSpec([(0, 3), (1, 0), (0, 0)]),
            PadSpec([(4, 7), (3, 5), (2, 6)]),
        ] {
            let padded = pad_3d_img(&img, &pad).unwrap();
            let restored = unpad_3d_img(&padded, &pad).unwrap();
            assert_eq!(restored, img, "roundtrip failed for {:?}", pad);
        }
    }

    #[test]
    fn test_unpad_zero_right_keeps_axis() {
        let img = ramp_3d((4, 4, 4));
        let pad = PadSpec([(1, 0), (0, 0), (0, 2)]);
        let out = unpad_3d_img(&img, &pad).unwrap();
        assert_eq!(out.dim(), (3, 4, 2));
        assert_eq!(out, img.slice(s![1.., .., ..2]));
    }

    #[test]
    fn test_unpad_4d_trailing_axis() {
        let arr = Array4::<f32>::ones((6, 6, 6, 3));
        let out = unpad_3d_img(&arr, &PadSpec([(1, 1), (2, 0), (0, 3)])).unwrap();
        assert_eq!(out.dim(), (4, 4, 3, 3));
    }

    #[test]
    fn test_unpad_errors() {
        let flat = Array1::<f32>::zeros(5);
        assert!(matches!(
            unpad_3d_img(&flat, &PadSpec::ZERO),
            Err(Error::InvalidDimensions(_))
        ));

        let img = ramp_3d((3, 3, 3));
        assert!(matches!(
            unpad_3d_img(&img, &PadSpec([(2, 2), (0, 0), (0, 0)])),
            Err(Error::InvalidPadding(_))
        ));
    }

    #[test]
    fn test_pad_case_all_arrays() {
        let channels = Array4::<f32>::ones((2, 6, 6, 6));
        let case = CaseImages {
            channels,
            gt_lbl_img: Some(Array3::<i32>::zeros((6, 6, 6))),
            roi_mask: Some(Array3::from_elem((6, 6, 6), true)),
            wmaps_per_cat: Some(Array4::<f32>::zeros((3, 6, 6, 6))),
        };
        let padded = pad_imgs_of_case(case, true, [3, 3, 5], [6, 6, 6]).unwrap();
        assert_eq!(padded.pad, PadSpec([(1, 1), (1, 1), (2, 2)]));
        assert_eq!(padded.images.channels.dim(), (2, 8, 8, 10));
        assert_eq!(padded.images.gt_lbl_img.unwrap().dim(), (8, 8, 10));
        assert_eq!(padded.images.roi_mask.unwrap().dim(), (8, 8, 10));
        assert_eq!(padded.images.wmaps_per_cat.unwrap().dim(), (3, 8, 8, 10));
    }

    #[test]
    fn test_pad_case_disabled_passthrough() {
        let channels = Array4::<f32>::from_elem((1, 4, 4, 4), 3.0);
        let case: CaseImages = CaseImages::from_channels(channels.clone());
        let padded = pad_imgs_of_case(case, false, [9, 9, 9], [20, 20, 20]).unwrap();
        assert!(padded.pad.is_zero());
        assert_eq!(padded.images.channels, channels);
    }

    #[test]
    fn test_pad_case_shape_mismatch() {
        let mut case: CaseImages = CaseImages::from_channels(Array4::zeros((1, 4, 4, 4)));
        case.roi_mask = Some(Array3::from_elem((4, 4, 5), true));
        let result = pad_imgs_of_case(case, true, [3, 3, 3], [4, 4, 4]);
        assert!(matches!(result, Err(Error::ShapeMismatch(_))));
    }
}

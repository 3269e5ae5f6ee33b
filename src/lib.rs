//! # medprep
//!
//! Preprocessing of volumetric medical images for patch-based CNN
//! segmentation: reflect padding sized to the network's receptive field,
//! exact unpadding of predictions, and z-score intensity normalization
//! with ROI masks and outlier cutoffs.
//!
//! ## Quick Start
//!
//! ```
//! use medprep::preprocessing::{
//!     normalize_int_zscore, pad_imgs_of_case, unpad_3d_img, CaseImages, LogFacade, ZScoreConfig,
//! };
//! use ndarray::{Array3, Array4};
//!
//! let channels = Array4::from_shape_fn((1, 8, 8, 8), |(_, x, y, z)| (x + 2 * y + 3 * z) as f32);
//! let roi = Array3::from_elem((8, 8, 8), true);
//!
//! let normalized = normalize_int_zscore(
//!     &LogFacade,
//!     channels.view(),
//!     roi.view(),
//!     Some(&ZScoreConfig::new()),
//!     "",
//! )?;
//!
//! let case: CaseImages = CaseImages::from_channels(normalized);
//! let padded = pad_imgs_of_case(case, true, [5, 5, 5], [8, 8, 8])?;
//! assert_eq!(padded.images.channels.dim(), (1, 12, 12, 12));
//!
//! let first = padded.images.channels.index_axis(ndarray::Axis(0), 0);
//! let restored = unpad_3d_img(&first, &padded.pad)?;
//! assert_eq!(restored.dim(), (8, 8, 8));
//! # Ok::<(), medprep::Error>(())
//! ```

pub mod error;
pub mod preprocessing;

#[cfg(feature = "python")]
pub mod python;

pub use error::{Error, Result};
pub use preprocessing::{
    calc_pad_per_axis, normalize_int_of_imgs, normalize_int_zscore, pad_imgs_of_case,
    unpad_3d_img, PadSpec, ZScoreConfig,
};

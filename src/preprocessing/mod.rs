//! Case preprocessing before CNN inference and training.
//!
//! Padding grows each case so the network's receptive field and sampled
//! segments fit around every voxel; normalization brings channel
//! intensities to zero mean and unit variance.

pub mod normalize;
pub mod padding;
pub mod reflect;
pub mod stats;

pub use normalize::{
    get_cutoff_mask, get_norm_stats, norm_log_summary, normalize_int_of_imgs,
    normalize_int_zscore, print_norm_log, roi_mask_from_values, AppliedCutoff, CutoffConfig,
    CutoffRule, LineLogger, LogFacade, NormStats, NormalizationConfig, ZScoreConfig,
};
pub use padding::{
    calc_pad_per_axis, pad_3d_img, pad_4d_arr, pad_imgs_of_case, unpad_3d_img, CaseImages,
    PadSpec, PaddedCase,
};
pub use reflect::reflect_array_if_needed;
pub use stats::{calc_border_int_of_3d_img, ImageStats};

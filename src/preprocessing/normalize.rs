//! Z-score intensity normalization of image channels.
//!
//! Each channel is shifted and scaled by a mean and standard deviation
//! computed over a subset of its voxels: the ROI, optionally narrowed by
//! outlier cutoffs. Cutoffs are listed once in a [`CutoffConfig`] and the
//! same list drives both the computation and the log summary.

use std::fmt;

use crate::error::{Error, Result};
use crate::preprocessing::stats::{percentiles, ImageStats};
use ndarray::{Array3, Array4, ArrayBase, ArrayView3, ArrayView4, Axis, Data, Ix3, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Sink for human-readable progress lines.
pub trait LineLogger {
    fn log_line(&self, line: &str);
}

/// [`LineLogger`] that forwards every line to the `log` crate at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl LineLogger for LogFacade {
    fn log_line(&self, line: &str) {
        log::info!(target: "medprep::normalize", "{}", line);
    }
}

/// Outlier cutoffs applied before computing normalization statistics.
///
/// Field names when (de)serialized follow the parameter names used in
/// model configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CutoffConfig {
    /// Keep ROI voxels strictly between these two percentiles (in `[0, 100]`) of the ROI.
    #[serde(rename = "cutoff_percents", default)]
    pub percents: Option<(f64, f64)>,
    /// Keep voxels strictly within `roi_mean - low * roi_std` and `roi_mean + high * roi_std`.
    #[serde(rename = "cutoff_times_std", default)]
    pub times_std: Option<(f64, f64)>,
    /// Drop voxels at or below the whole-image mean (air / background).
    #[serde(rename = "cutoff_below_mean", default)]
    pub below_mean: bool,
}

/// A single cutoff step, in the order it is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutoffRule {
    Percentile { low: f64, high: f64 },
    TimesStd { low: f64, high: f64 },
    BelowMean,
}

impl CutoffRule {
    /// Label used in the normalization summary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Percentile { .. } => "Percentile",
            Self::TimesStd { .. } => "Standard Deviation",
            Self::BelowMean => "Whole Image Mean",
        }
    }

    /// Intensity bounds `(low, high)` of this cutoff for one channel.
    ///
    /// `roi_values` are the channel's intensities inside the ROI.
    pub fn bounds(&self, img: &ImageStats, roi: &ImageStats, roi_values: &[f64]) -> Result<(f64, f64)> {
        match *self {
            Self::Percentile { low, high } => {
                let ps = percentiles(roi_values.to_vec(), &[low, high]).ok_or_else(|| {
                    Error::Configuration(format!(
                        "percentile cutoff ({}, {}) could not be evaluated on {} ROI voxels",
                        low,
                        high,
                        roi_values.len()
                    ))
                })?;
                Ok((ps[0], ps[1]))
            }
            Self::TimesStd { low, high } => {
                Ok((roi.mean - low * roi.std, roi.mean + high * roi.std))
            }
            // no real upper cutoff; the image max is the bound
            Self::BelowMean => Ok((img.mean, img.max)),
        }
    }

    fn describe(&self, low: f64, high: f64) -> String {
        match self {
            Self::Percentile { .. } => format!(
                "Cutting off intensities by [percentiles] within ROI. Cutoffs: Min={}, High={}",
                low, high
            ),
            Self::TimesStd { .. } => format!(
                "Cutting off intensities by [std] within ROI. Cutoffs: Min={}, High={}",
                low, high
            ),
            Self::BelowMean => format!(
                "Cutting off intensities [below original image mean] to drop air. Cutoff: Min={}",
                low
            ),
        }
    }
}

impl fmt::Display for CutoffRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl CutoffConfig {
    /// Active cutoff steps in application order: percentile, std, below-mean.
    pub fn rules(&self) -> Vec<CutoffRule> {
        let mut rules = Vec::with_capacity(3);
        if let Some((low, high)) = self.percents {
            rules.push(CutoffRule::Percentile { low, high });
        }
        if let Some((low, high)) = self.times_std {
            rules.push(CutoffRule::TimesStd { low, high });
        }
        if self.below_mean {
            rules.push(CutoffRule::BelowMean);
        }
        rules
    }

    /// Check that the configured values can be evaluated.
    pub fn validate(&self) -> Result<()> {
        if let Some((low, high)) = self.percents {
            let in_range = |p: f64| (0.0..=100.0).contains(&p);
            if !in_range(low) || !in_range(high) || low > high {
                return Err(Error::Configuration(format!(
                    "cutoff_percents must satisfy 0 <= low <= high <= 100, got ({}, {})",
                    low, high
                )));
            }
        }
        if let Some((low, high)) = self.times_std {
            let valid = |m: f64| m.is_finite() && m >= 0.0;
            if !valid(low) || !valid(high) {
                return Err(Error::Configuration(format!(
                    "cutoff_times_std must be finite and non-negative, got ({}, {})",
                    low, high
                )));
            }
        }
        Ok(())
    }
}

/// Z-score normalization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZScoreConfig {
    #[serde(default)]
    pub apply: bool,
    #[serde(flatten)]
    pub cutoffs: CutoffConfig,
    #[serde(default)]
    pub verbose: bool,
}

impl ZScoreConfig {
    /// Normalization enabled, without cutoffs.
    pub fn new() -> Self {
        Self {
            apply: true,
            ..Self::default()
        }
    }

    /// Settings commonly used for brain tumour MRI: percentiles 5-95,
    /// two standard deviations each side, and the below-mean cutoff.
    pub fn brats() -> Self {
        Self::new()
            .cutoff_percents(5.0, 95.0)
            .cutoff_times_std(2.0, 2.0)
            .cutoff_below_mean(true)
    }

    pub fn apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn cutoff_percents(mut self, low: f64, high: f64) -> Self {
        self.cutoffs.percents = Some((low, high));
        self
    }

    pub fn cutoff_times_std(mut self, low: f64, high: f64) -> Self {
        self.cutoffs.times_std = Some((low, high));
        self
    }

    pub fn cutoff_below_mean(mut self, enabled: bool) -> Self {
        self.cutoffs.below_mean = enabled;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.cutoffs.validate()
    }
}

/// Top-level intensity normalization parameters.
///
/// Only z-score normalization exists; an absent block means no normalization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizationConfig {
    #[serde(default)]
    pub zscore: Option<ZScoreConfig>,
}

/// A cutoff as evaluated on one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedCutoff {
    pub rule: CutoffRule,
    pub low: f64,
    pub high: f64,
}

/// Statistics used to normalize one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct NormStats {
    pub mean: f64,
    pub std: f64,
    /// Voxels that survived the ROI and every cutoff.
    pub n_selected: usize,
    pub cutoffs: Vec<AppliedCutoff>,
}

/// Mask of voxels with `low < value < high`.
pub fn get_cutoff_mask(img: ArrayView3<'_, f32>, low: f64, high: f64) -> Array3<bool> {
    img.mapv(|v| {
        let v = f64::from(v);
        v > low && v < high
    })
}

/// Convert a numeric mask to booleans with `value > 0`.
pub fn roi_mask_from_values<S, T>(mask: &ArrayBase<S, Ix3>) -> Array3<bool>
where
    S: Data<Elem = T>,
    T: PartialOrd + Default,
{
    let zero = T::default();
    mask.map(|v| *v > zero)
}

/// Compute the mean and standard deviation used to normalize `img`.
///
/// Statistics are taken over the voxels of `roi_mask` that pass every
/// configured cutoff.
pub fn get_norm_stats(
    img: ArrayView3<'_, f32>,
    roi_mask: ArrayView3<'_, bool>,
    cutoffs: &CutoffConfig,
) -> Result<NormStats> {
    if img.shape() != roi_mask.shape() {
        return Err(Error::ShapeMismatch(format!(
            "channel shape {:?} differs from ROI mask shape {:?}",
            img.shape(),
            roi_mask.shape()
        )));
    }

    let img_stats = ImageStats::from_values(img.iter().map(|&v| f64::from(v)))
        .ok_or_else(|| Error::EmptySelection("channel has no voxels".to_string()))?;

    let roi_values: Vec<f64> = Zip::from(&img)
        .and(&roi_mask)
        .fold(Vec::new(), |mut acc, &v, &m| {
            if m {
                acc.push(f64::from(v));
            }
            acc
        });
    let roi_stats = ImageStats::from_values(roi_values.iter().copied())
        .ok_or_else(|| Error::EmptySelection("ROI mask selects no voxels".to_string()))?;

    let mut norm_mask = roi_mask.to_owned();
    let mut applied = Vec::new();
    for rule in cutoffs.rules() {
        let (low, high) = rule.bounds(&img_stats, &roi_stats, &roi_values)?;
        norm_mask &= &get_cutoff_mask(img, low, high);
        applied.push(AppliedCutoff { rule, low, high });
    }

    let selected = Zip::from(&img)
        .and(&norm_mask)
        .fold(Vec::new(), |mut acc, &v, &m| {
            if m {
                acc.push(f64::from(v));
            }
            acc
        });
    let norm = ImageStats::from_values(selected.iter().copied()).ok_or_else(|| {
        Error::EmptySelection(format!(
            "no voxel left after cutoffs [{}]",
            applied
                .iter()
                .map(|c| c.rule.kind())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;

    Ok(NormStats {
        mean: norm.mean,
        std: norm.std,
        n_selected: selected.len(),
        cutoffs: applied,
    })
}

fn with_job_id(job_id: &str, line: &str) -> String {
    if job_id.is_empty() {
        line.to_string()
    } else {
        format!("{} {}", job_id, line)
    }
}

/// One-line summary of which cutoffs a normalization run uses.
pub fn norm_log_summary(cutoffs: &CutoffConfig, n_channels: usize, job_id: &str) -> String {
    let kinds: Vec<&str> = cutoffs.rules().iter().map(CutoffRule::kind).collect();
    let kinds = if kinds.is_empty() {
        "None".to_string()
    } else {
        kinds.join(", ")
    };
    with_job_id(
        job_id,
        &format!(
            "Normalizing {} channel(s) with the following cutoff type(s): {}",
            n_channels, kinds
        ),
    )
}

/// Write [`norm_log_summary`] to `logger`.
pub fn print_norm_log(
    logger: &dyn LineLogger,
    cutoffs: &CutoffConfig,
    n_channels: usize,
    job_id: &str,
) {
    logger.log_line(&norm_log_summary(cutoffs, n_channels, job_id));
}

/// Z-score normalize every channel of `channels` (`[n, x, y, z]`).
///
/// Returns an unmodified copy when `config` is `None` or `apply` is false.
/// Channels are processed in parallel; verbose output is written afterwards
/// in channel order.
///
/// # Errors
///
/// * `ShapeMismatch` if `roi_mask` does not match the channels' spatial shape
/// * `EmptySelection` if the ROI, or the ROI after cutoffs, selects nothing
/// * `ZeroVariance` if a channel is constant over the selected voxels
/// * `Configuration` if the cutoff values are out of range
pub fn normalize_int_zscore(
    logger: &dyn LineLogger,
    channels: ArrayView4<'_, f32>,
    roi_mask: ArrayView3<'_, bool>,
    config: Option<&ZScoreConfig>,
    job_id: &str,
) -> Result<Array4<f32>> {
    let config = match config {
        Some(c) if c.apply => c,
        _ => return Ok(channels.to_owned()),
    };
    config.validate()?;

    if channels.shape()[1..] != *roi_mask.shape() {
        return Err(Error::ShapeMismatch(format!(
            "channels have spatial shape {:?}, ROI mask has {:?}",
            &channels.shape()[1..],
            roi_mask.shape()
        )));
    }

    let n_channels = channels.len_of(Axis(0));
    if config.verbose {
        print_norm_log(logger, &config.cutoffs, n_channels, job_id);
    }

    let stats: Vec<NormStats> = channels
        .outer_iter()
        .into_par_iter()
        .map(|channel| get_norm_stats(channel, roi_mask, &config.cutoffs))
        .collect::<Result<_>>()?;

    let mut normalized = Array4::<f32>::zeros(channels.raw_dim());
    for (idx, (st, (channel, mut out))) in stats
        .iter()
        .zip(channels.outer_iter().zip(normalized.outer_iter_mut()))
        .enumerate()
    {
        if st.std == 0.0 || !st.std.is_finite() {
            return Err(Error::ZeroVariance {
                channel: idx,
                std: st.std,
            });
        }
        Zip::from(&mut out).and(&channel).par_for_each(|o, &v| {
            *o = ((f64::from(v) - st.mean) / st.std) as f32;
        });

        if config.verbose {
            for c in &st.cutoffs {
                logger.log_line(&with_job_id(job_id, &c.rule.describe(c.low, c.high)));
            }
            let old = ImageStats::from_values(channel.iter().map(|&v| f64::from(v)));
            let new = ImageStats::from_values(out.iter().map(|&v| f64::from(v)));
            if let (Some(old), Some(new)) = (old, new) {
                logger.log_line(&with_job_id(
                    job_id,
                    &format!(
                        "Original image stats (channel {}): Mean={}, Std={}",
                        idx, old.mean, old.std
                    ),
                ));
                logger.log_line(&with_job_id(
                    job_id,
                    &format!(
                        "Image was normalized using: Mean={}, Std={}",
                        st.mean, st.std
                    ),
                ));
                logger.log_line(&with_job_id(
                    job_id,
                    &format!(
                        "Normalized image stats (channel {}): Mean={}, Std={}",
                        idx, new.mean, new.std
                    ),
                ));
            }
        }
    }

    log::debug!("z-score normalized {} channel(s)", n_channels);
    Ok(normalized)
}

/// Apply the intensity normalization described by `params`.
///
/// `None` leaves the channels as they are.
pub fn normalize_int_of_imgs(
    logger: &dyn LineLogger,
    channels: ArrayView4<'_, f32>,
    roi_mask: ArrayView3<'_, bool>,
    params: Option<&NormalizationConfig>,
    job_id: &str,
) -> Result<Array4<f32>> {
    match params {
        Some(p) => normalize_int_zscore(logger, channels, roi_mask, p.zscore.as_ref(), job_id),
        None => Ok(channels.to_owned()),
    }
}

// THEORY:
// The `config` module holds the small numeric bundles that tune the engine. Each
// detector gets its own bundle because the two variants share no parameters beyond
// the mask stage, and the segmenter gets a third. `PipelineConfig` ties one detector
// choice to one segmenter for the orchestrators in `pipeline` and `parallel_pipeline`.
//
// Defaults mirror the values the engine was tuned with: a gentle 5px blur for
// frame-to-frame differencing of recorded files, and a heavy 21px blur plus a slow
// running average for live feeds. Bundles are validated once, up front, so the
// per-frame hot path never has to re-check them.

use crate::core_modules::pixel::ChannelOrder;
use crate::error::{MotionError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper bound on erosion and dilation passes per stage.
pub const MAX_MORPH_ITERS: u32 = u8::MAX as u32;

/// Upper bound on the pre-roll and post-roll margins, about 4.5 years at 30 fps.
pub const MAX_ROLL_FRAMES: u64 = u32::MAX as u64;

/// Named sensitivity levels that set the threshold and minimum blob area together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Sensitivity {
    /// Ignores small flicker; only large, strong changes count.
    Low,
    #[default]
    Balanced,
    /// Picks up small movement at the cost of more false alerts.
    High,
}

impl Sensitivity {
    /// Returns `(diff_threshold, min_contour_area)` for this level.
    pub fn levels(self) -> (u8, f64) {
        match self {
            Sensitivity::Low => (40, 1500.0),
            Sensitivity::Balanced => (25, 800.0),
            Sensitivity::High => (15, 400.0),
        }
    }
}

/// Tuning for frame-to-frame differencing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameDiffConfig {
    /// Pixels whose smoothed difference is strictly above this level (0-255) are changed.
    pub diff_threshold: u8,
    /// Blobs with a smaller contour area (px²) are discarded.
    pub min_contour_area: f64,
    /// Square blur kernel size. Even values are bumped to the next odd size.
    pub blur_kernel_size: u32,
    /// Erosion passes, applied first. Zero skips erosion.
    pub erode_iters: u32,
    /// Dilation passes, applied after erosion. Zero skips dilation.
    pub dilate_iters: u32,
}

impl Default for FrameDiffConfig {
    fn default() -> Self {
        Self {
            diff_threshold: 25,
            min_contour_area: 800.0,
            blur_kernel_size: 5,
            erode_iters: 1,
            dilate_iters: 2,
        }
    }
}

impl FrameDiffConfig {
    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        (self.diff_threshold, self.min_contour_area) = sensitivity.levels();
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_kernel(self.blur_kernel_size)?;
        validate_area(self.min_contour_area)?;
        validate_passes("erode_iters", self.erode_iters)?;
        validate_passes("dilate_iters", self.dilate_iters)
    }
}

/// Tuning for the running-average background detector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdaptiveConfig {
    pub diff_threshold: u8,
    pub min_contour_area: f64,
    pub blur_kernel_size: u32,
    /// Dilation passes; erosion runs `max(1, morph_iters - 1)` passes afterwards.
    pub morph_iters: u32,
    /// Background adaptation rate in `(0, 1]`. Higher follows lighting faster.
    pub alpha: f64,
    /// Motion is suppressed while fewer than this many frames have been seen.
    pub warmup_frames: u32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            diff_threshold: 25,
            min_contour_area: 800.0,
            blur_kernel_size: 21,
            morph_iters: 2,
            alpha: 0.05,
            warmup_frames: 15,
        }
    }
}

impl AdaptiveConfig {
    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        (self.diff_threshold, self.min_contour_area) = sensitivity.levels();
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_kernel(self.blur_kernel_size)?;
        validate_area(self.min_contour_area)?;
        validate_passes("morph_iters", self.morph_iters)?;
        if !self.alpha.is_finite() || self.alpha <= 0.0 || self.alpha > 1.0 {
            return Err(MotionError::invalid_config(
                "alpha",
                format!("must lie in (0, 1], got {}", self.alpha),
            ));
        }
        Ok(())
    }
}

/// Temporal margins and the minimum length of an emitted event, all in frames.
///
/// A `min_event_frames` of 0 behaves like 1: every event spans at least one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmenterConfig {
    pub pre_roll_frames: u64,
    pub post_roll_frames: u64,
    pub min_event_frames: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            pre_roll_frames: 10,
            post_roll_frames: 15,
            min_event_frames: 8,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<()> {
        validate_roll("pre_roll_frames", self.pre_roll_frames)?;
        validate_roll("post_roll_frames", self.post_roll_frames)
    }
}

/// Which detector a pipeline runs, together with its tuning.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "kebab-case"))]
pub enum DetectorKind {
    /// Offline processing of a finite recording.
    FrameDiff(FrameDiffConfig),
    /// Continuous feeds without a stable reference frame.
    AdaptiveBackground(AdaptiveConfig),
}

impl Default for DetectorKind {
    fn default() -> Self {
        DetectorKind::FrameDiff(FrameDiffConfig::default())
    }
}

impl DetectorKind {
    pub fn with_sensitivity(self, sensitivity: Sensitivity) -> Self {
        match self {
            DetectorKind::FrameDiff(cfg) => DetectorKind::FrameDiff(cfg.with_sensitivity(sensitivity)),
            DetectorKind::AdaptiveBackground(cfg) => {
                DetectorKind::AdaptiveBackground(cfg.with_sensitivity(sensitivity))
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            DetectorKind::FrameDiff(cfg) => cfg.validate(),
            DetectorKind::AdaptiveBackground(cfg) => cfg.validate(),
        }
    }
}

/// Configuration for a single-stream `MotionPipeline`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    pub detector: DetectorKind,
    pub segmenter: SegmenterConfig,
    /// Byte order of the colour channels in submitted frames.
    pub channel_order: ChannelOrder,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.segmenter.validate()
    }
}

fn validate_kernel(size: u32) -> Result<()> {
    if size == 0 {
        return Err(MotionError::invalid_config(
            "blur_kernel_size",
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_passes(field: &'static str, passes: u32) -> Result<()> {
    if passes > MAX_MORPH_ITERS {
        return Err(MotionError::invalid_config(
            field,
            format!("at most {MAX_MORPH_ITERS} passes, got {passes}"),
        ));
    }
    Ok(())
}

fn validate_roll(field: &'static str, frames: u64) -> Result<()> {
    if frames > MAX_ROLL_FRAMES {
        return Err(MotionError::invalid_config(
            field,
            format!("at most {MAX_ROLL_FRAMES} frames, got {frames}"),
        ));
    }
    Ok(())
}

fn validate_area(area: f64) -> Result<()> {
    if !area.is_finite() || area < 0.0 {
        return Err(MotionError::invalid_config(
            "min_contour_area",
            format!("must be a non-negative number, got {area}"),
        ));
    }
    Ok(())
}

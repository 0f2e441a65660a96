// THEORY:
// The `AdaptiveBackgroundDetector` serves continuous feeds, where there is no stable
// reference frame and plain frame-to-frame differencing re-triggers on every slow
// lighting drift. Instead it keeps a floating-point running average of the blurred
// luminance and compares each new frame against that estimate.
//
// Lifecycle:
// 1.  **Uninitialized**: no background. The next frame becomes the background and
//     is reported as "no motion" with a zero score; it cannot be motion by itself.
// 2.  **Warming**: the estimate is still converging. The mask is computed as usual
//     and the score reported, but motion and regions are suppressed.
// 3.  **Steady**: full detection. The model keeps adapting on every frame, forever,
//     until `reset` returns it to Uninitialized.
//
// The morphology is lopsided: `morph_iters` dilations followed by
// `max(1, morph_iters - 1)` erosions, so nearby fragments of one moving object
// connect more readily than isolated speckle is removed.

use crate::config::AdaptiveConfig;
use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::detector::{DetectionResult, MotionDetector};
use crate::core_modules::frame::Frame;
use crate::error::{MotionError, Result};
use image::{GrayImage, Luma};
use log::{debug, trace};

/// Where the background model is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundPhase {
    Uninitialized,
    Warming,
    Steady,
}

/// The running-average estimate and the number of frames it has absorbed.
struct BackgroundModel {
    width: u32,
    height: u32,
    accumulator: Vec<f32>,
    frame_count: u64,
}

impl BackgroundModel {
    fn seed(grey: &GrayImage) -> Self {
        Self {
            width: grey.width(),
            height: grey.height(),
            accumulator: grey.as_raw().iter().map(|&v| v as f32).collect(),
            frame_count: 1,
        }
    }

    /// `background <- background * (1 - alpha) + frame * alpha`
    fn absorb(&mut self, grey: &GrayImage, alpha: f32) {
        for (bg, &value) in self.accumulator.iter_mut().zip(grey.as_raw()) {
            *bg = *bg * (1.0 - alpha) + value as f32 * alpha;
        }
        self.frame_count += 1;
    }

    /// The estimate rounded back to 8-bit grey levels.
    fn as_grey(&self) -> GrayImage {
        let width = self.width as usize;
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let value = self.accumulator[y as usize * width + x as usize];
            Luma([value.abs().round().min(255.0) as u8])
        })
    }
}

pub struct AdaptiveBackgroundDetector {
    config: AdaptiveConfig,
    model: Option<BackgroundModel>,
}

impl AdaptiveBackgroundDetector {
    pub fn new(config: AdaptiveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: None,
        })
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Drops the background estimate and the frame counter.
    pub fn reset(&mut self) {
        if self.model.take().is_some() {
            debug!("adaptive background reset");
        }
    }

    pub fn phase(&self) -> BackgroundPhase {
        match &self.model {
            None => BackgroundPhase::Uninitialized,
            Some(model) if model.frame_count < self.config.warmup_frames as u64 => {
                BackgroundPhase::Warming
            }
            Some(_) => BackgroundPhase::Steady,
        }
    }

    /// Frames absorbed since the last reset, counting the one that seeded the model.
    pub fn frame_count(&self) -> u64 {
        self.model.as_ref().map_or(0, |model| model.frame_count)
    }

    /// Feeds one frame through the model and classifies it.
    pub fn update(&mut self, frame: &Frame<'_>) -> Result<DetectionResult> {
        if let Some(model) = &self.model {
            if (model.width, model.height) != frame.dimensions() {
                return Err(MotionError::DimensionMismatch {
                    expected: (model.width, model.height),
                    actual: frame.dimensions(),
                });
            }
        }
        if frame.is_empty() {
            return Ok(DetectionResult::empty());
        }

        let cfg = &self.config;
        let grey = blob_detector::blur(&frame.to_luma(), cfg.blur_kernel_size);

        let model = match self.model.as_mut() {
            Some(model) => model,
            None => {
                debug!(
                    "adaptive background seeded at {}x{}",
                    grey.width(),
                    grey.height()
                );
                self.model = Some(BackgroundModel::seed(&grey));
                return Ok(DetectionResult::empty());
            }
        };

        model.absorb(&grey, cfg.alpha as f32);

        let difference = blob_detector::absolute_difference(&grey, &model.as_grey());
        let mut mask = blob_detector::threshold(&difference, cfg.diff_threshold);
        mask = blob_detector::dilate(&mask, cfg.morph_iters);
        mask = blob_detector::erode(&mask, cfg.morph_iters.saturating_sub(1).max(1));

        let result = DetectionResult::from_mask(&mask, cfg.min_contour_area);
        let warmup = cfg.warmup_frames as u64;
        trace!(
            "adaptive frame {}: motion={} regions={} score={:.4}",
            model.frame_count,
            result.has_motion,
            result.regions.len(),
            result.score
        );

        if model.frame_count < warmup {
            return Ok(result.suppressed());
        }
        if model.frame_count == warmup {
            debug!("adaptive background warm after {warmup} frames");
        }
        Ok(result)
    }
}

impl MotionDetector for AdaptiveBackgroundDetector {
    fn name(&self) -> &'static str {
        "adaptive-background"
    }

    fn process(&mut self, _previous: Option<&Frame<'_>>, current: &Frame<'_>) -> Result<DetectionResult> {
        self.update(current)
    }

    fn reset(&mut self) {
        AdaptiveBackgroundDetector::reset(self);
    }
}

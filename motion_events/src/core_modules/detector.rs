// THEORY:
// Both detectors answer the same question for one frame: did anything move, where,
// and how much of the picture changed? They share no state and no base behaviour,
// only this output shape, so the common ground is a `DetectionResult` value and a
// small `MotionDetector` trait rather than a type hierarchy. Orchestrators hold a
// `Box<dyn MotionDetector>` and never need to know which variant they drive.

use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::frame::Frame;
use crate::core_modules::region::Region;
use crate::error::Result;
use image::GrayImage;

/// The per-frame output of a detector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    /// True iff at least one region survived the minimum-area filter.
    pub has_motion: bool,
    /// Bounding boxes of the surviving blobs, in contour discovery order.
    pub regions: Vec<Region>,
    /// Fraction of mask pixels flagged as changed, in `[0, 1]`.
    pub score: f64,
}

impl DetectionResult {
    /// No motion, no regions, zero score.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Extracts regions and the change score from a finished binary mask.
    pub fn from_mask(mask: &GrayImage, min_contour_area: f64) -> Self {
        let regions = blob_detector::find_regions(mask, min_contour_area);
        Self {
            has_motion: !regions.is_empty(),
            regions,
            score: blob_detector::changed_fraction(mask),
        }
    }

    /// Drops motion and regions but keeps the score.
    pub fn suppressed(self) -> Self {
        Self {
            has_motion: false,
            regions: Vec::new(),
            score: self.score,
        }
    }
}

/// A source of per-frame motion decisions.
///
/// `previous` is the frame handed in on the preceding call, if any. Detectors that
/// keep their own reference (a background model) ignore it.
pub trait MotionDetector {
    fn name(&self) -> &'static str;

    fn process(&mut self, previous: Option<&Frame<'_>>, current: &Frame<'_>) -> Result<DetectionResult>;

    /// Discards any cross-frame state.
    fn reset(&mut self) {}
}

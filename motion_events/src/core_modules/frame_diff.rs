// THEORY:
// The `FrameDiffDetector` compares two consecutive frames of a finite recording.
// It holds only its configuration: every call is independent, and the caller supplies
// both the previous and the current frame. Differencing first and blurring the
// difference (rather than each frame) keeps one blur per frame pair.
//
// Stages: luminance of both frames -> absolute difference -> odd-sized Gaussian blur
// -> strict threshold -> erosion passes -> dilation passes -> external contours
// filtered by area -> score over the final mask.

use crate::config::FrameDiffConfig;
use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::detector::{DetectionResult, MotionDetector};
use crate::core_modules::frame::Frame;
use crate::error::Result;
use log::trace;

pub struct FrameDiffDetector {
    config: FrameDiffConfig,
}

impl FrameDiffDetector {
    /// Validates `config` up front so `detect` never has to.
    pub fn new(config: FrameDiffConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FrameDiffConfig {
        &self.config
    }

    /// Classifies `current` against `previous`. Both frames must share dimensions.
    pub fn detect(&self, previous: &Frame<'_>, current: &Frame<'_>) -> Result<DetectionResult> {
        previous.ensure_same_dimensions(current)?;
        if current.is_empty() {
            return Ok(DetectionResult::empty());
        }

        let cfg = &self.config;
        let difference = blob_detector::absolute_difference(&previous.to_luma(), &current.to_luma());
        let smoothed = blob_detector::blur(&difference, cfg.blur_kernel_size);
        let mut mask = blob_detector::threshold(&smoothed, cfg.diff_threshold);
        mask = blob_detector::erode(&mask, cfg.erode_iters);
        mask = blob_detector::dilate(&mask, cfg.dilate_iters);

        let result = DetectionResult::from_mask(&mask, cfg.min_contour_area);
        trace!(
            "frame diff: motion={} regions={} score={:.4}",
            result.has_motion,
            result.regions.len(),
            result.score
        );
        Ok(result)
    }
}

impl MotionDetector for FrameDiffDetector {
    fn name(&self) -> &'static str {
        "frame-diff"
    }

    /// The first frame of a stream has nothing to compare against and reports no motion.
    fn process(&mut self, previous: Option<&Frame<'_>>, current: &Frame<'_>) -> Result<DetectionResult> {
        match previous {
            Some(previous) => self.detect(previous, current),
            None => Ok(DetectionResult::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::Region;
    use crate::error::MotionError;

    const W: u32 = 64;
    const H: u32 = 48;

    fn solid(level: u8) -> Vec<u8> {
        vec![level; (W * H * 3) as usize]
    }

    fn with_square(level: u8, x0: u32, y0: u32, size: u32, square: u8) -> Vec<u8> {
        let mut data = solid(level);
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                let i = ((y * W + x) * 3) as usize;
                data[i..i + 3].copy_from_slice(&[square; 3]);
            }
        }
        data
    }

    fn detector(min_area: f64) -> FrameDiffDetector {
        FrameDiffDetector::new(FrameDiffConfig {
            min_contour_area: min_area,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn identical_frames_have_no_motion() {
        let data = solid(90);
        let frame = Frame::new(W, H, &data).unwrap();
        let result = detector(0.0).detect(&frame, &frame).unwrap();
        assert_eq!(result, DetectionResult::empty());
    }

    #[test]
    fn bright_square_is_located() {
        let before = solid(20);
        let after = with_square(20, 20, 10, 16, 220);
        let prev = Frame::new(W, H, &before).unwrap();
        let curr = Frame::new(W, H, &after).unwrap();

        let result = detector(50.0).detect(&prev, &curr).unwrap();
        assert!(result.has_motion);
        assert_eq!(result.regions.len(), 1);
        let region = result.regions[0];
        // Blur and the extra dilation pass widen the square slightly.
        assert!(region.x <= 20 && region.y <= 10);
        assert!(region.right() >= 36 && region.bottom() >= 26);
        assert!(region.right() <= 40 && region.bottom() <= 30);
        assert!(result.score > 0.0 && result.score < 0.2);
    }

    #[test]
    fn small_change_is_filtered_by_area() {
        let before = solid(20);
        let after = with_square(20, 30, 30, 4, 220);
        let prev = Frame::new(W, H, &before).unwrap();
        let curr = Frame::new(W, H, &after).unwrap();

        let result = detector(800.0).detect(&prev, &curr).unwrap();
        assert!(!result.has_motion);
        assert!(result.regions.is_empty());
        assert!(result.score > 0.0, "score still reflects the mask");
    }

    #[test]
    fn mismatched_dimensions_fail_fast() {
        let a = solid(0);
        let b = vec![0u8; ((W - 1) * H * 3) as usize];
        let prev = Frame::new(W, H, &a).unwrap();
        let curr = Frame::new(W - 1, H, &b).unwrap();
        assert!(matches!(
            detector(0.0).detect(&prev, &curr),
            Err(MotionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn empty_frames_are_degenerate_not_errors() {
        let prev = Frame::new(0, 0, &[]).unwrap();
        let result = detector(0.0).detect(&prev, &prev).unwrap();
        assert_eq!(result, DetectionResult::empty());
    }

    #[test]
    fn first_frame_through_trait_has_no_motion() {
        let data = solid(10);
        let frame = Frame::new(W, H, &data).unwrap();
        let mut det = detector(0.0);
        assert_eq!(det.process(None, &frame).unwrap(), DetectionResult::empty());
        assert_eq!(det.name(), "frame-diff");
    }

    #[test]
    fn zero_kernel_is_a_configuration_error() {
        let cfg = FrameDiffConfig {
            blur_kernel_size: 0,
            ..Default::default()
        };
        assert!(FrameDiffDetector::new(cfg).is_err());
    }

    #[test]
    fn two_separate_squares_give_two_regions() {
        let before = solid(0);
        let mut after = with_square(0, 4, 4, 12, 255);
        for y in 30..42 {
            for x in 45..57 {
                let i = ((y * W + x) * 3) as usize;
                after[i..i + 3].copy_from_slice(&[255; 3]);
            }
        }
        let prev = Frame::new(W, H, &before).unwrap();
        let curr = Frame::new(W, H, &after).unwrap();
        let result = detector(20.0).detect(&prev, &curr).unwrap();
        assert_eq!(result.regions.len(), 2);
        let envelope = Region::envelope(&result.regions).unwrap();
        assert!(envelope.x <= 4 && envelope.right() >= 57);
    }
}

// THEORY:
// `core_modules` holds the building blocks of the engine, from the bottom up: pixel
// and frame views, the `Region` geometry type, the stateless mask utilities in
// `blob_detector`, the two detectors behind the `MotionDetector` trait, and the
// `EventSegmenter` that turns per-frame decisions into events.

pub mod adaptive_background;
pub mod blob_detector;
pub mod detector;
pub mod event_segmenter;
pub mod frame;
pub mod frame_diff;
pub mod pixel;
pub mod region;

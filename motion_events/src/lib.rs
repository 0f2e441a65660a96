// THEORY:
// This file is the main entry point for the `motion_events` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the `event_tester` binary).
//
// The primary goal is to export the `MotionPipeline` and `ParallelPipeline`
// orchestrators and their associated data structures (`PipelineConfig`, `Event`,
// `FrameReport`, etc.) as the high-level interface for the engine. The detectors
// and the segmenter stay reachable through `core_modules` for callers that want to
// drive them directly.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{
    AdaptiveConfig, DetectorKind, FrameDiffConfig, PipelineConfig, SegmenterConfig, Sensitivity,
};
pub use core_modules::adaptive_background::{AdaptiveBackgroundDetector, BackgroundPhase};
pub use core_modules::detector::{DetectionResult, MotionDetector};
pub use core_modules::event_segmenter::{Event, EventSegmenter, EventTiming};
pub use core_modules::frame::{Frame, OwnedFrame};
pub use core_modules::frame_diff::FrameDiffDetector;
pub use core_modules::pixel::ChannelOrder;
pub use core_modules::region::Region;
pub use error::{MotionError, Result};
pub use parallel_pipeline::{ParallelPipeline, StreamHandle};
pub use pipeline::{FrameReport, MotionPipeline, PipelineStats, PipelineSummary};

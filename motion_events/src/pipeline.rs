// THEORY:
// The `pipeline` module is the top-level API for a single video stream. It wires one
// motion detector to one event segmenter and takes care of the bookkeeping neither of
// them should own: numbering frames, keeping a copy of the previous frame for frame
// differencing, and gathering a few running statistics.
//
// Per frame: detector -> segmenter -> `FrameReport`. At the end of the stream
// `finish` flushes the segmenter and hands back every event together with the stats.
// The pipeline is strictly sequential; concurrency across streams lives in
// `parallel_pipeline`.

use crate::config::{DetectorKind, PipelineConfig};
use crate::core_modules::adaptive_background::AdaptiveBackgroundDetector;
use crate::core_modules::detector::{DetectionResult, MotionDetector};
use crate::core_modules::event_segmenter::EventSegmenter;
use crate::core_modules::frame::{Frame, OwnedFrame};
use crate::core_modules::frame_diff::FrameDiffDetector;
use crate::error::Result;
use log::{debug, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::event_segmenter::{Event, EventTiming};

/// The outcome of one `process_frame` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// 0-based position of the frame in the stream.
    pub frame_index: u64,
    pub detection: DetectionResult,
    /// An event that this frame closed, if any.
    pub closed_event: Option<Event>,
}

/// Running counters over the frames seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PipelineStats {
    pub frames_processed: u64,
    /// Frames whose detection reported motion.
    pub motion_frames: u64,
    /// Highest change score seen.
    pub peak_score: f64,
}

impl PipelineStats {
    fn record(&mut self, detection: &DetectionResult) {
        self.frames_processed += 1;
        if detection.has_motion {
            self.motion_frames += 1;
        }
        self.peak_score = self.peak_score.max(detection.score);
    }
}

/// Everything a finished stream produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub events: Vec<Event>,
    pub stats: PipelineStats,
}

/// Builds the detector selected by `kind`.
pub fn build_detector(kind: &DetectorKind) -> Result<Box<dyn MotionDetector + Send>> {
    let detector: Box<dyn MotionDetector + Send> = match kind {
        DetectorKind::FrameDiff(cfg) => Box::new(FrameDiffDetector::new(cfg.clone())?),
        DetectorKind::AdaptiveBackground(cfg) => Box::new(AdaptiveBackgroundDetector::new(cfg.clone())?),
    };
    Ok(detector)
}

/// The main, top-level struct for one stream.
pub struct MotionPipeline {
    config: PipelineConfig,
    detector: Box<dyn MotionDetector + Send>,
    segmenter: EventSegmenter,
    previous: Option<OwnedFrame>,
    next_index: u64,
    stats: PipelineStats,
}

impl MotionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let detector = build_detector(&config.detector)?;
        let segmenter = EventSegmenter::new(config.segmenter.clone());
        debug!("pipeline created with {} detector", detector.name());
        Ok(Self {
            config,
            detector,
            segmenter,
            previous: None,
            next_index: 0,
            stats: PipelineStats::default(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Events emitted so far.
    pub fn events(&self) -> &[Event] {
        self.segmenter.events()
    }

    /// Wraps raw interleaved bytes in the configured channel order and processes them.
    pub fn process_bytes(&mut self, width: u32, height: u32, data: &[u8]) -> Result<FrameReport> {
        let frame = Frame::with_order(width, height, self.config.channel_order, data)?;
        self.process_frame(&frame)
    }

    pub fn process_frame(&mut self, frame: &Frame<'_>) -> Result<FrameReport> {
        let previous = self.previous.as_ref().map(OwnedFrame::as_frame);
        let detection = self.detector.process(previous.as_ref(), frame)?;

        let frame_index = self.next_index;
        let closed_event = self
            .segmenter
            .update(frame_index, detection.has_motion, &detection.regions)?;
        self.next_index += 1;
        self.stats.record(&detection);

        match &mut self.previous {
            Some(previous) => previous.copy_from(frame),
            None => self.previous = Some(OwnedFrame::from_frame(frame)),
        }

        Ok(FrameReport {
            frame_index,
            detection,
            closed_event,
        })
    }

    /// Restarts the detector and forgets the previous frame. Frame numbering and the
    /// segmenter carry on, so a reset mid-stream never splits the event timeline.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.previous = None;
        debug!("pipeline reset at frame {}", self.next_index);
    }

    /// Flushes any open event and returns the stream's events and stats.
    pub fn finish(mut self) -> Result<PipelineSummary> {
        if let Some(last) = self.next_index.checked_sub(1) {
            self.segmenter.finalize(last)?;
        }
        let summary = PipelineSummary {
            events: self.segmenter.into_events(),
            stats: self.stats,
        };
        info!(
            "stream finished: {} frames, {} with motion, {} events",
            summary.stats.frames_processed,
            summary.stats.motion_frames,
            summary.events.len()
        );
        Ok(summary)
    }
}

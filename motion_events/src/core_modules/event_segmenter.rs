// THEORY:
// The `event_segmenter` is the temporal layer of the engine. It turns the stream of
// per-frame motion flags into a short list of discrete `Event`s: bounded intervals
// of sustained motion that a person can review or index.
//
// Key principles:
// 1.  **Pre-roll**: an event is recorded as starting `pre_roll_frames` before its
//     first motion frame (clamped at frame 0), so the onset is never cut off.
// 2.  **Post-roll**: a run stays open through quiet frames until the gap since the
//     last motion frame exceeds `post_roll_frames`. Short pauses inside one burst do
//     not split it, and the closed event ends `post_roll_frames` after the last
//     motion frame.
// 3.  **Minimum length**: runs shorter than `min_event_frames` are discarded
//     without consuming an id, so emitted ids stay gap-free.
// 4.  **Geometry**: every region reported while a run is active is folded into one
//     envelope box. The box only grows.
// 5.  **Explicit lifecycle**: `Inactive` / `Active` are modelled as an enum, and a
//     terminal `finalize` flushes whatever is still open. Events never overlap since
//     a run cannot start while another is active.

use crate::config::SegmenterConfig;
use crate::core_modules::region::{Region, extend_envelope};
use crate::error::{MotionError, Result};
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Frame rate assumed when a caller supplies a non-positive one.
pub const FALLBACK_FPS: f64 = 30.0;

/// A closed interval of sustained motion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// 1-based, increasing with emission order.
    pub id: u64,
    pub start_frame: u64,
    /// Inclusive.
    pub end_frame: u64,
    /// Envelope of every region seen while the event was active, if any were.
    pub bounding_box: Option<Region>,
}

/// Wall-clock position of an event at a given frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTiming {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub duration_seconds: f64,
}

impl Event {
    /// Number of frames covered, both ends included.
    pub fn frame_span(&self) -> u64 {
        self.end_frame.saturating_sub(self.start_frame).saturating_add(1)
    }

    /// Converts frame indices to seconds (`frame / fps`).
    pub fn timing(&self, fps: f64) -> EventTiming {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { FALLBACK_FPS };
        let start_seconds = self.start_frame as f64 / fps;
        let end_seconds = self.end_frame as f64 / fps;
        EventTiming {
            start_seconds,
            end_seconds,
            duration_seconds: end_seconds - start_seconds,
        }
    }
}

/// The run currently being accumulated.
#[derive(Debug, Clone, PartialEq)]
struct ActiveRun {
    start_frame: u64,
    last_motion_frame: Option<u64>,
    bounding_box: Option<Region>,
}

#[derive(Debug, Clone, PartialEq)]
enum SegmentState {
    Inactive,
    Active(ActiveRun),
    Finalized,
}

pub struct EventSegmenter {
    config: SegmenterConfig,
    state: SegmentState,
    last_frame: Option<u64>,
    events: Vec<Event>,
    next_id: u64,
}

impl EventSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            state: SegmentState::Inactive,
            last_frame: None,
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Events emitted so far, in emission order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Id the next emitted event will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SegmentState::Active(_))
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, SegmentState::Finalized)
    }

    /// Feeds one frame's motion flag and regions. `frame_index` must increase on
    /// every call. Returns the event closed by this frame, if one was emitted.
    pub fn update(&mut self, frame_index: u64, motion: bool, regions: &[Region]) -> Result<Option<Event>> {
        if self.is_finalized() {
            return Err(MotionError::SegmenterFinalized);
        }
        if let Some(previous) = self.last_frame {
            if frame_index <= previous {
                return Err(MotionError::NonMonotonicFrame {
                    previous,
                    received: frame_index,
                });
            }
        }
        self.last_frame = Some(frame_index);

        if motion {
            if !self.is_active() {
                let start_frame = frame_index.saturating_sub(self.config.pre_roll_frames);
                debug!("event run opened at frame {frame_index} (start {start_frame})");
                self.state = SegmentState::Active(ActiveRun {
                    start_frame,
                    last_motion_frame: None,
                    bounding_box: None,
                });
            }
            if let SegmentState::Active(run) = &mut self.state {
                run.last_motion_frame = Some(frame_index);
                extend_envelope(&mut run.bounding_box, regions);
            }
            return Ok(None);
        }

        let post_roll = self.config.post_roll_frames;
        let closing = match &self.state {
            SegmentState::Active(run) => match run.last_motion_frame {
                Some(last) if frame_index > last.saturating_add(post_roll) => {
                    Some((run.clone(), last.saturating_add(post_roll)))
                }
                _ => None,
            },
            _ => None,
        };

        match closing {
            Some((run, end_frame)) => {
                self.state = SegmentState::Inactive;
                Ok(self.close_run(run, end_frame))
            }
            None => Ok(None),
        }
    }

    /// Flushes a still-open run at the end of the stream. Must be called exactly once,
    /// with an index no lower than the last one passed to `update`. Returns the flushed
    /// event if it was long enough to be emitted.
    pub fn finalize(&mut self, last_frame_index: u64) -> Result<Option<Event>> {
        if self.is_finalized() {
            return Err(MotionError::SegmenterFinalized);
        }
        if let Some(previous) = self.last_frame {
            if last_frame_index < previous {
                return Err(MotionError::NonMonotonicFrame {
                    previous,
                    received: last_frame_index,
                });
            }
        }
        let state = std::mem::replace(&mut self.state, SegmentState::Finalized);
        match state {
            SegmentState::Finalized => Err(MotionError::SegmenterFinalized),
            SegmentState::Inactive => Ok(None),
            SegmentState::Active(run) => {
                let post_roll = self.config.post_roll_frames;
                let end_frame = match run.last_motion_frame {
                    Some(last) => last_frame_index.min(last.saturating_add(post_roll)),
                    None => last_frame_index,
                };
                Ok(self.close_run(run, end_frame))
            }
        }
    }

    fn close_run(&mut self, run: ActiveRun, end_frame: u64) -> Option<Event> {
        let span = end_frame.saturating_sub(run.start_frame).saturating_add(1);
        if span < self.config.min_event_frames {
            debug!(
                "dropped run {}..={} ({span} frames < {})",
                run.start_frame, end_frame, self.config.min_event_frames
            );
            return None;
        }

        let event = Event {
            id: self.next_id,
            start_frame: run.start_frame,
            end_frame,
            bounding_box: run.bounding_box,
        };
        self.next_id += 1;
        debug!(
            "event {} emitted: frames {}..={} box {:?}",
            event.id, event.start_frame, event.end_frame, event.bounding_box
        );
        self.events.push(event.clone());
        Some(event)
    }
}

// THEORY:
// The `parallel_pipeline` runs many independent video streams at once. Frames of one
// stream are inherently sequential (the detector and the segmenter both carry state
// from frame to frame), so a stream is never split across workers. Instead every
// stream gets its own tokio task that owns its own `MotionPipeline`, and frames reach
// it over an mpsc channel with a oneshot reply per task.
//
// A shared semaphore, sized to the number of CPUs by default, bounds how many streams
// are crunching a frame at the same moment. Streams that are waiting for a permit just
// queue; nothing is dropped and per-stream ordering is preserved by the channel.

use crate::config::PipelineConfig;
use crate::core_modules::frame::OwnedFrame;
use crate::error::{MotionError, Result};
use crate::pipeline::{FrameReport, MotionPipeline, PipelineSummary};
use futures::future::try_join_all;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;

enum StreamTask {
    Frame {
        frame: OwnedFrame,
        reply: oneshot::Sender<Result<FrameReport>>,
    },
    Finish {
        reply: oneshot::Sender<Result<PipelineSummary>>,
    },
}

/// The submitting side of one running stream.
pub struct StreamHandle {
    name: String,
    task_sender: mpsc::UnboundedSender<StreamTask>,
    worker: JoinHandle<()>,
}

impl StreamHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues `frame` behind any earlier ones and waits for its report.
    pub async fn submit(&self, frame: OwnedFrame) -> Result<FrameReport> {
        let (reply, result_receiver) = oneshot::channel();
        self.task_sender
            .send(StreamTask::Frame { frame, reply })
            .map_err(|_| self.unavailable())?;
        result_receiver.await.map_err(|_| self.unavailable())?
    }

    /// Flushes the stream's segmenter and stops its worker.
    pub async fn finish(self) -> Result<PipelineSummary> {
        let (reply, result_receiver) = oneshot::channel();
        self.task_sender
            .send(StreamTask::Finish { reply })
            .map_err(|_| self.unavailable())?;
        let summary = result_receiver.await.map_err(|_| self.unavailable())?;
        self.worker
            .await
            .map_err(|err| MotionError::WorkerUnavailable(format!("stream `{}`: {err}", self.name)))?;
        summary
    }

    fn unavailable(&self) -> MotionError {
        MotionError::WorkerUnavailable(format!("stream `{}` has stopped", self.name))
    }
}

pub struct ParallelPipeline {
    config: PipelineConfig,
    permits: Arc<Semaphore>,
}

impl ParallelPipeline {
    /// One concurrently processed frame per CPU.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_concurrency(config, num_cpus::get())
    }

    pub fn with_concurrency(config: PipelineConfig, max_concurrent_frames: usize) -> Result<Self> {
        config.validate()?;
        let limit = max_concurrent_frames.max(1);
        debug!("parallel pipeline allows {limit} concurrent frames");
        Ok(Self {
            config,
            permits: Arc::new(Semaphore::new(limit)),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Spawns a worker task for a new stream. Must be called from within a tokio runtime.
    pub fn open_stream(&self, name: impl Into<String>) -> Result<StreamHandle> {
        let name = name.into();
        let pipeline = MotionPipeline::new(self.config.clone())?;
        let (task_sender, task_receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(Self::stream_worker(
            name.clone(),
            pipeline,
            task_receiver,
            Arc::clone(&self.permits),
        ));
        debug!("stream `{name}` opened");
        Ok(StreamHandle {
            name,
            task_sender,
            worker,
        })
    }

    async fn stream_worker(
        name: String,
        mut pipeline: MotionPipeline,
        mut task_receiver: mpsc::UnboundedReceiver<StreamTask>,
        permits: Arc<Semaphore>,
    ) {
        while let Some(task) = task_receiver.recv().await {
            match task {
                StreamTask::Frame { frame, reply } => {
                    let result = match permits.acquire().await {
                        Ok(_permit) => pipeline.process_frame(&frame.as_frame()),
                        Err(err) => Err(MotionError::WorkerUnavailable(err.to_string())),
                    };
                    let _ = reply.send(result);
                }
                StreamTask::Finish { reply } => {
                    let _ = reply.send(pipeline.finish());
                    debug!("stream `{name}` finished");
                    return;
                }
            }
        }
        warn!("stream `{name}` dropped without finish; open events discarded");
    }

    /// Runs every stream to completion concurrently. Results keep the input order.
    /// The first stream error aborts the whole run.
    pub async fn run_streams(&self, streams: Vec<(String, Vec<OwnedFrame>)>) -> Result<Vec<(String, PipelineSummary)>> {
        let runs = streams.into_iter().map(|(name, frames)| async move {
            let handle = self.open_stream(name.clone())?;
            for frame in frames {
                handle.submit(frame).await?;
            }
            let summary = handle.finish().await?;
            Ok::<_, MotionError>((name, summary))
        });
        try_join_all(runs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetectorKind, FrameDiffConfig, SegmenterConfig};
    use crate::core_modules::pixel::ChannelOrder;

    const W: u32 = 40;
    const H: u32 = 30;

    fn frame(square_x: Option<u32>) -> OwnedFrame {
        let mut data = vec![0u8; (W * H * 3) as usize];
        if let Some(x0) = square_x {
            for y in 6..20 {
                for x in x0..x0 + 14 {
                    let i = ((y * W + x) * 3) as usize;
                    data[i..i + 3].copy_from_slice(&[250; 3]);
                }
            }
        }
        OwnedFrame::new(W, H, ChannelOrder::Rgb, data).unwrap()
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            detector: DetectorKind::FrameDiff(FrameDiffConfig {
                min_contour_area: 10.0,
                ..Default::default()
            }),
            segmenter: SegmenterConfig {
                pre_roll_frames: 1,
                post_roll_frames: 2,
                min_event_frames: 1,
            },
            ..Default::default()
        }
    }

    /// Stream `offset` has a square appear at frame `5 + offset`.
    fn stream(offset: u32, len: u32) -> Vec<OwnedFrame> {
        (0..len)
            .map(|i| if i >= 5 + offset && i < 8 + offset { frame(Some(2 + (i - 5 - offset) * 4)) } else { frame(None) })
            .collect()
    }

    fn sequential(frames: &[OwnedFrame]) -> PipelineSummary {
        let mut pipeline = MotionPipeline::new(config()).unwrap();
        for f in frames {
            pipeline.process_frame(&f.as_frame()).unwrap();
        }
        pipeline.finish().unwrap()
    }

    #[tokio::test]
    async fn parallel_streams_match_sequential_runs() {
        let inputs: Vec<(String, Vec<OwnedFrame>)> = (0..4)
            .map(|s| (format!("camera-{s}"), stream(s * 3, 30)))
            .collect();
        let expected: Vec<PipelineSummary> = inputs.iter().map(|(_, frames)| sequential(frames)).collect();

        let parallel = ParallelPipeline::with_concurrency(config(), 2).unwrap();
        let results = parallel.run_streams(inputs.clone()).await.unwrap();

        assert_eq!(results.len(), 4);
        for ((name, summary), ((input_name, _), want)) in results.iter().zip(inputs.iter().zip(&expected)) {
            assert_eq!(name, input_name);
            assert_eq!(summary, want);
            assert_eq!(summary.events.len(), 1);
        }
    }

    #[tokio::test]
    async fn stream_handle_reports_frames_in_order() {
        let parallel = ParallelPipeline::new(config()).unwrap();
        let handle = parallel.open_stream("door").unwrap();
        assert_eq!(handle.name(), "door");
        for (i, f) in stream(0, 12).into_iter().enumerate() {
            let report = handle.submit(f).await.unwrap();
            assert_eq!(report.frame_index, i as u64);
        }
        let summary = handle.finish().await.unwrap();
        assert_eq!(summary.stats.frames_processed, 12);
        assert_eq!(summary.events.len(), 1);
    }

    #[tokio::test]
    async fn frame_error_does_not_stop_the_stream() {
        let parallel = ParallelPipeline::new(config()).unwrap();
        let handle = parallel.open_stream("yard").unwrap();
        handle.submit(frame(None)).await.unwrap();

        let odd = OwnedFrame::new(2, 2, ChannelOrder::Rgb, vec![0; 12]).unwrap();
        assert!(matches!(
            handle.submit(odd).await,
            Err(MotionError::DimensionMismatch { .. })
        ));

        let report = handle.submit(frame(None)).await.unwrap();
        assert_eq!(report.frame_index, 1);
        handle.finish().await.unwrap();
    }

    #[test]
    fn invalid_config_is_rejected_before_any_stream() {
        let bad = PipelineConfig {
            detector: DetectorKind::FrameDiff(FrameDiffConfig {
                blur_kernel_size: 0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(ParallelPipeline::new(bad).is_err());
    }
}

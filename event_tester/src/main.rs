// THEORY:
// `event_tester` is the hands-on harness for the `motion_events` engine. It plays
// back a directory of still frames, runs them through a `MotionPipeline`, and writes
// the resulting events as a CSV table. It can also save every frame with its
// detected regions boxed, for checking the tuning by eye.
//
// A frame that fails to decode is treated like a camera read failure: the stream
// ends there, and whatever event is still open is flushed into the table.

mod annotate;
mod config;
mod frames;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Args, Settings};
use log::{info, warn};
use motion_events::{Frame, MotionPipeline, PipelineSummary};

fn main() -> Result<()> {
    // --- 1. Argument Parsing & Setup ---
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let settings = Settings::resolve(&args)?;

    // --- 2. Processing ---
    let summary = run(&settings)?;

    // --- 3. Results ---
    report::write_events(&settings.output, &summary.events, settings.fps)?;
    info!(
        "{} frames ({} with motion), {} events written to {}",
        summary.stats.frames_processed,
        summary.stats.motion_frames,
        summary.events.len(),
        settings.output.display()
    );
    if let Some(dir) = &settings.annotate_dir {
        info!("annotated frames in {}", dir.display());
    }
    Ok(())
}

/// Runs every frame in `settings.frames` through a fresh pipeline.
fn run(settings: &Settings) -> Result<PipelineSummary> {
    let paths = frames::list_frames(&settings.frames)?;
    if paths.is_empty() {
        warn!("no frames found in {}", settings.frames.display());
    }
    if let Some(dir) = &settings.annotate_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut pipeline = MotionPipeline::new(settings.pipeline.clone())?;
    info!(
        "processing {} frames with the {} detector",
        paths.len(),
        pipeline.detector_name()
    );

    for path in &paths {
        let mut image = match frames::load_frame(path) {
            Ok(image) => image,
            Err(err) => {
                warn!("{err:#}; ending stream");
                break;
            }
        };

        let report = pipeline
            .process_frame(&Frame::from_rgb_image(&image))
            .with_context(|| format!("processing {}", path.display()))?;

        if let Some(event) = &report.closed_event {
            info!(
                "event {}: frames {}..={}",
                event.id, event.start_frame, event.end_frame
            );
        }

        if let Some(dir) = &settings.annotate_dir {
            annotate::draw_regions(&mut image, &report.detection.regions);
            annotate::save_frame(dir, report.frame_index, &image)?;
        }
    }

    Ok(pipeline.finish()?)
}

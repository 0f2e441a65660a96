//! Command line and TOML configuration for the event tester.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file given with
//! `--config`, the sensitivity preset, then individual command line overrides.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use motion_events::{
    AdaptiveConfig, DetectorKind, FrameDiffConfig, PipelineConfig, SegmenterConfig, Sensitivity,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_FPS: f64 = 30.0;
pub const DEFAULT_OUTPUT: &str = "output/events.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorChoice {
    /// Frame-to-frame differencing, for recorded footage.
    FrameDiff,
    /// Running-average background, for live or long unattended feeds.
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Low,
    Balanced,
    High,
}

impl From<Preset> for Sensitivity {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Low => Sensitivity::Low,
            Preset::Balanced => Sensitivity::Balanced,
            Preset::High => Sensitivity::High,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "event_tester", version, about = "Detect motion events in a directory of frames")]
pub struct Args {
    /// Directory of PNG/JPEG/BMP frames, processed in file name order.
    #[arg(long, env = "EVENT_TESTER_FRAMES")]
    pub frames: PathBuf,

    #[arg(long, value_enum)]
    pub detector: Option<DetectorChoice>,

    /// Sets threshold and minimum area together.
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// TOML file with `[frame_diff]`, `[adaptive]` and `[segmenter]` tables.
    #[arg(long, env = "EVENT_TESTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Difference threshold (0-255).
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Minimum contour area in px².
    #[arg(long)]
    pub min_area: Option<f64>,

    #[arg(long)]
    pub pre_roll: Option<u64>,

    #[arg(long)]
    pub post_roll: Option<u64>,

    #[arg(long)]
    pub min_event: Option<u64>,

    /// Frame rate used to convert frame indices to seconds.
    #[arg(long)]
    pub fps: Option<f64>,

    /// CSV file to write. Defaults to `output/events.csv`.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write every processed frame, boxed, as PNG into this directory.
    #[arg(long)]
    pub annotate_dir: Option<PathBuf>,
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub detector: Option<DetectorChoice>,
    pub preset: Option<Sensitivity>,
    pub fps: Option<f64>,
    pub output: Option<PathBuf>,
    pub annotate_dir: Option<PathBuf>,
    pub frame_diff: Option<FrameDiffConfig>,
    pub adaptive: Option<AdaptiveConfig>,
    pub segmenter: Option<SegmenterConfig>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub frames: PathBuf,
    pub pipeline: PipelineConfig,
    pub fps: f64,
    pub output: PathBuf,
    pub annotate_dir: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: &Args, file: FileConfig) -> Result<Self> {
        let choice = args
            .detector
            .or(file.detector)
            .unwrap_or(DetectorChoice::FrameDiff);
        let preset = args.preset.map(Sensitivity::from).or(file.preset);

        let mut detector = match choice {
            DetectorChoice::FrameDiff => DetectorKind::FrameDiff(file.frame_diff.unwrap_or_default()),
            DetectorChoice::Adaptive => DetectorKind::AdaptiveBackground(file.adaptive.unwrap_or_default()),
        };
        if let Some(preset) = preset {
            detector = detector.with_sensitivity(preset);
        }
        match &mut detector {
            DetectorKind::FrameDiff(cfg) => {
                override_levels(&mut cfg.diff_threshold, &mut cfg.min_contour_area, args)
            }
            DetectorKind::AdaptiveBackground(cfg) => {
                override_levels(&mut cfg.diff_threshold, &mut cfg.min_contour_area, args)
            }
        }

        let mut segmenter = file.segmenter.unwrap_or_default();
        if let Some(frames) = args.pre_roll {
            segmenter.pre_roll_frames = frames;
        }
        if let Some(frames) = args.post_roll {
            segmenter.post_roll_frames = frames;
        }
        if let Some(frames) = args.min_event {
            segmenter.min_event_frames = frames;
        }

        let pipeline = PipelineConfig {
            detector,
            segmenter,
            ..Default::default()
        };
        pipeline.validate().context("invalid detector configuration")?;

        let fps = args.fps.or(file.fps).unwrap_or(DEFAULT_FPS);
        if !fps.is_finite() || fps <= 0.0 {
            bail!("fps must be a positive number, got {fps}");
        }

        Ok(Self {
            frames: args.frames.clone(),
            pipeline,
            fps,
            output: args
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            annotate_dir: args.annotate_dir.clone().or(file.annotate_dir),
        })
    }
}

fn override_levels(threshold: &mut u8, min_area: &mut f64, args: &Args) {
    if let Some(value) = args.threshold {
        *threshold = value;
    }
    if let Some(value) = args.min_area {
        *min_area = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["event_tester", "--frames", "frames"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_without_file() {
        let settings = Settings::merge(&args(&[]), FileConfig::default()).unwrap();
        assert_eq!(settings.pipeline, PipelineConfig::default());
        assert_eq!(settings.fps, DEFAULT_FPS);
        assert_eq!(settings.output, PathBuf::from(DEFAULT_OUTPUT));
        assert!(settings.annotate_dir.is_none());
    }

    #[test]
    fn preset_then_cli_override() {
        let settings = Settings::merge(
            &args(&["--detector", "adaptive", "--preset", "high", "--min-area", "123"]),
            FileConfig::default(),
        )
        .unwrap();
        match settings.pipeline.detector {
            DetectorKind::AdaptiveBackground(cfg) => {
                assert_eq!(cfg.diff_threshold, 15);
                assert_eq!(cfg.min_contour_area, 123.0);
                assert_eq!(cfg.blur_kernel_size, 21);
            }
            other => panic!("unexpected detector {other:?}"),
        }
    }

    #[test]
    fn file_values_are_used_and_cli_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
detector = "frame-diff"
fps = 12.5
output = "out/run.csv"

[frame_diff]
blur_kernel_size = 7
erode_iters = 0

[segmenter]
pre_roll_frames = 4
min_event_frames = 2
"#
        )
        .unwrap();

        let cli = args(&["--config", file.path().to_str().unwrap(), "--pre-roll", "1"]);
        let settings = Settings::resolve(&cli).unwrap();
        assert_eq!(settings.fps, 12.5);
        assert_eq!(settings.output, PathBuf::from("out/run.csv"));
        assert_eq!(
            settings.pipeline.segmenter,
            SegmenterConfig {
                pre_roll_frames: 1,
                post_roll_frames: 15,
                min_event_frames: 2,
            }
        );
        match settings.pipeline.detector {
            DetectorKind::FrameDiff(cfg) => {
                assert_eq!(cfg.blur_kernel_size, 7);
                assert_eq!(cfg.erode_iters, 0);
                assert_eq!(cfg.dilate_iters, 2);
            }
            other => panic!("unexpected detector {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "treshold = 3").unwrap();
        assert!(FileConfig::load(file.path()).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Settings::merge(&args(&["--fps", "0"]), FileConfig::default()).is_err());
        assert!(Settings::merge(&args(&["--min-area=-5"]), FileConfig::default()).is_err());
    }

    #[test]
    fn oversized_roll_margins_are_rejected() {
        let huge = u64::MAX.to_string();
        assert!(Settings::merge(&args(&["--post-roll", &huge]), FileConfig::default()).is_err());
        assert!(Settings::merge(&args(&["--pre-roll", &huge]), FileConfig::default()).is_err());
        let settings =
            Settings::merge(&args(&["--post-roll", "0", "--min-event", "0"]), FileConfig::default())
                .unwrap();
        assert_eq!(settings.pipeline.segmenter.post_roll_frames, 0);
    }
}

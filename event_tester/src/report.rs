//! Event table output.

use anyhow::{Context, Result};
use motion_events::Event;
use serde::Serialize;
use std::io;
use std::path::Path;

pub const HEADER: [&str; 10] = [
    "event_id",
    "start_frame",
    "end_frame",
    "start_seconds",
    "end_seconds",
    "duration_seconds",
    "bbox_x",
    "bbox_y",
    "bbox_w",
    "bbox_h",
];

/// One CSV line. Seconds are pre-formatted to three decimals; box columns stay
/// empty for events that never saw a region.
#[derive(Debug, Serialize, PartialEq)]
pub struct EventRow {
    pub event_id: u64,
    pub start_frame: u64,
    pub end_frame: u64,
    pub start_seconds: String,
    pub end_seconds: String,
    pub duration_seconds: String,
    pub bbox_x: Option<u32>,
    pub bbox_y: Option<u32>,
    pub bbox_w: Option<u32>,
    pub bbox_h: Option<u32>,
}

impl EventRow {
    pub fn new(event: &Event, fps: f64) -> Self {
        let timing = event.timing(fps);
        let bbox = event.bounding_box;
        Self {
            event_id: event.id,
            start_frame: event.start_frame,
            end_frame: event.end_frame,
            start_seconds: format!("{:.3}", timing.start_seconds),
            end_seconds: format!("{:.3}", timing.end_seconds),
            duration_seconds: format!("{:.3}", timing.duration_seconds),
            bbox_x: bbox.map(|b| b.x),
            bbox_y: bbox.map(|b| b.y),
            bbox_w: bbox.map(|b| b.width),
            bbox_h: bbox.map(|b| b.height),
        }
    }
}

/// Writes the header and one row per event. The header is written even when there
/// are no events.
pub fn write_events_to<W: io::Write>(writer: W, events: &[Event], fps: f64) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv.write_record(HEADER)?;
    for event in events {
        csv.serialize(EventRow::new(event, fps))?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the event table to `path`, creating parent directories as needed.
pub fn write_events(path: &Path, events: &[Event], fps: f64) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_events_to(file, events, fps).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_events::Region;

    fn render(events: &[Event], fps: f64) -> String {
        let mut out = Vec::new();
        write_events_to(&mut out, events, fps).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_table_still_has_header() {
        assert_eq!(
            render(&[], 30.0),
            "event_id,start_frame,end_frame,start_seconds,end_seconds,duration_seconds,bbox_x,bbox_y,bbox_w,bbox_h\n"
        );
    }

    #[test]
    fn rows_format_seconds_and_optional_box() {
        let events = [
            Event {
                id: 1,
                start_frame: 90,
                end_frame: 115,
                bounding_box: Some(Region::new(3, 4, 50, 60)),
            },
            Event {
                id: 2,
                start_frame: 200,
                end_frame: 210,
                bounding_box: None,
            },
        ];
        let text = render(&events, 30.0);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1,90,115,3.000,3.833,0.833,3,4,50,60");
        assert_eq!(lines[2], "2,200,210,6.667,7.000,0.333,,,,");
    }

    #[test]
    fn writes_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("events.csv");
        write_events(&path, &[], 25.0).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("event_id,"));
    }
}

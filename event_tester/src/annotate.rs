//! Preview output: frames with their detected regions boxed in green.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use motion_events::Region;
use std::path::{Path, PathBuf};

const BOX_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);

pub fn draw_regions(image: &mut RgbImage, regions: &[Region]) {
    for region in regions.iter().filter(|r| r.width > 0 && r.height > 0) {
        let rect = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
        draw_hollow_rect_mut(image, rect, BOX_COLOUR);
    }
}

/// Saves `image` as `frame_NNNNNN.png` inside `dir`.
pub fn save_frame(dir: &Path, frame_index: u64, image: &RgbImage) -> Result<PathBuf> {
    let path = dir.join(format!("frame_{frame_index:06}.png"));
    image
        .save(&path)
        .with_context(|| format!("saving annotated frame {}", path.display()))?;
    Ok(path)
}

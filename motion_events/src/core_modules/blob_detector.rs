// THEORY:
// The `blob_detector` is the engine of the mask stage shared by both detectors. It
// turns a single-channel difference image into a binary "changed" mask and then into
// a list of spatially coherent blobs, each summarised by its bounding `Region`.
//
// Algorithm steps:
// 1.  **Smoothing**: A square Gaussian kernel (size forced odd so it has a centre)
//     suppresses single-pixel sensor noise before any decision is made.
// 2.  **Binary Threshold**: Pixels strictly above the threshold become 255, all
//     others 0.
// 3.  **Morphology**: Erosion removes specks, dilation reconnects nearby fragments.
//     Each pass uses a 3x3 square neighbourhood. The order and pass counts are chosen
//     by the calling detector.
// 4.  **External Contours**: Only the outermost border of each blob is traced; holes
//     and blobs nested inside holes are ignored. A blob's area is the polygon area of
//     its traced border (so a lone pixel or a one-pixel-wide line has area zero) and
//     its box spans the extreme border pixels inclusively.
// 5.  **Stateless Utility**: Nothing here remembers previous frames.

use crate::core_modules::region::Region;
use image::{GrayImage, ImageBuffer, Luma, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::point::Point;

pub mod blob_detector {
    use super::*;

    /// Value written into the mask for changed pixels.
    pub const CHANGED: u8 = 255;

    /// Forces a blur kernel size to be odd; even sizes grow by one.
    pub fn odd_kernel_size(size: u32) -> u32 {
        if size % 2 == 0 { size + 1 } else { size }
    }

    /// Normalised 1D Gaussian weights for an odd `size`.
    /// Sigma follows the usual size-derived rule `0.3 * ((size - 1) / 2 - 1) + 0.8`.
    pub fn gaussian_kernel(size: u32) -> Vec<f32> {
        let size = odd_kernel_size(size);
        let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
        let centre = (size / 2) as f32;
        let mut weights: Vec<f32> = (0..size)
            .map(|i| {
                let offset = i as f32 - centre;
                (-(offset * offset) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let total: f32 = weights.iter().sum();
        for weight in &mut weights {
            *weight /= total;
        }
        weights
    }

    /// Gaussian blur with a square `size` x `size` kernel (size forced odd).
    /// Pixels beyond the image edge repeat the nearest edge pixel.
    pub fn blur(image: &GrayImage, size: u32) -> GrayImage {
        let size = odd_kernel_size(size);
        if size <= 1 || image.width() == 0 || image.height() == 0 {
            return image.clone();
        }
        let kernel = gaussian_kernel(size);
        let widened: ImageBuffer<Luma<f32>, Vec<f32>> =
            imageproc::map::map_colors(image, |p| Luma([p[0] as f32]));
        let smoothed = imageproc::filter::separable_filter_equal(&widened, &kernel);
        imageproc::map::map_colors(&smoothed, |p| Luma([p[0].round().clamp(0.0, 255.0) as u8]))
    }

    /// Per-pixel absolute difference of two equally sized grey images.
    pub fn absolute_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
        imageproc::map::map_colors2(a, b, |p, q| Luma([p[0].abs_diff(q[0])]))
    }

    /// Binary threshold: strictly above `level` becomes `CHANGED`, everything else 0.
    pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
        imageproc::map::map_colors(image, |p| Luma([if p[0] > level { CHANGED } else { 0 }]))
    }

    /// `iterations` passes of 3x3 erosion.
    pub fn erode(mask: &GrayImage, iterations: u32) -> GrayImage {
        if iterations == 0 || mask.is_empty() {
            return mask.clone();
        }
        imageproc::morphology::erode(mask, Norm::LInf, passes(iterations))
    }

    /// `iterations` passes of 3x3 dilation.
    pub fn dilate(mask: &GrayImage, iterations: u32) -> GrayImage {
        if iterations == 0 || mask.is_empty() {
            return mask.clone();
        }
        imageproc::morphology::dilate(mask, Norm::LInf, passes(iterations))
    }

    // Repeated 3x3 passes under the L-infinity norm equal one pass of radius n.
    // Configs reject more than `MAX_MORPH_ITERS` passes, so the cap never applies
    // to validated input.
    fn passes(iterations: u32) -> u8 {
        u8::try_from(iterations).unwrap_or(u8::MAX)
    }

    /// Fraction of mask pixels flagged as changed, 0 for an empty mask.
    pub fn changed_fraction(mask: &GrayImage) -> f64 {
        let total = mask.as_raw().len();
        if total == 0 {
            return 0.0;
        }
        let changed = mask.as_raw().iter().filter(|&&v| v != 0).count();
        changed as f64 / total as f64
    }

    /// Polygon area enclosed by a traced border (shoelace formula).
    pub fn contour_area(points: &[Point<i32>]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }
        let mut twice_area = 0i64;
        for (i, p) in points.iter().enumerate() {
            let q = &points[(i + 1) % points.len()];
            twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }

    fn bounding_region(points: &[Point<i32>]) -> Option<Region> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Region::from_inclusive_corners(
            min_x as u32,
            min_y as u32,
            max_x as u32,
            max_y as u32,
        ))
    }

    /// Traces the external border of every blob in `mask` and returns the bounding
    /// regions of those whose contour area is at least `min_area`.
    pub fn find_regions(mask: &GrayImage, min_area: f64) -> Vec<Region> {
        if mask.is_empty() {
            return Vec::new();
        }
        // The tracer only labels a border `Outer` when background surrounds the blob,
        // so blobs touching the image edge are traced inside a 1px empty frame.
        let mut framed = GrayImage::new(mask.width() + 2, mask.height() + 2);
        imageops::replace(&mut framed, mask, 1, 1);

        find_contours::<i32>(&framed)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .filter(|contour| contour_area(&contour.points) >= min_area)
            .filter_map(|contour| {
                let points: Vec<Point<i32>> = contour
                    .points
                    .iter()
                    .map(|p| Point::new(p.x - 1, p.y - 1))
                    .collect();
                bounding_region(&points)
            })
            .collect()
    }
}

// THEORY:
// A `Frame` is the engine's view of one decoded video frame: a borrowed, interleaved
// 3-channel byte buffer plus its dimensions and channel order. The caller owns the
// bytes; the detectors read them during one call and keep nothing that points back
// into them. `OwnedFrame` exists for orchestrators that must hold on to a frame
// beyond the call that produced it (frame differencing needs the previous one, and
// the parallel pipeline moves frames across tasks).

use crate::core_modules::pixel::{CHANNELS, ChannelOrder, Pixel};
use crate::error::{MotionError, Result};
use image::{GrayImage, Luma, RgbImage};

/// A borrowed colour frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Wraps an RGB buffer of `width * height * 3` bytes.
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Result<Self> {
        Self::with_order(width, height, ChannelOrder::Rgb, data)
    }

    pub fn with_order(width: u32, height: u32, order: ChannelOrder, data: &'a [u8]) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(MotionError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            order,
            data,
        })
    }

    pub fn from_rgb_image(image: &'a RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            order: ChannelOrder::Rgb,
            data: image.as_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// A frame with no pixels. Detectors treat it as degenerate input, not an error.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        (x < self.width && y < self.height).then(|| self.pixel_at(x, y))
    }

    // Caller keeps `x < width` and `y < height`.
    fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Pixel::from_bytes(&self.data[offset..offset + CHANNELS], self.order)
    }

    /// Converts the frame to a single luminance channel.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([self.pixel_at(x, y).luminance()])
        })
    }

    /// Fails with `DimensionMismatch` unless `other` has the same size as `self`.
    pub fn ensure_same_dimensions(&self, other: &Frame<'_>) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(MotionError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }
}

/// A colour frame that owns its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFrame {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl OwnedFrame {
    pub fn new(width: u32, height: u32, order: ChannelOrder, data: Vec<u8>) -> Result<Self> {
        Frame::with_order(width, height, order, &data)?;
        Ok(Self {
            width,
            height,
            order,
            data,
        })
    }

    pub fn from_frame(frame: &Frame<'_>) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            order: frame.order,
            data: frame.data.to_vec(),
        }
    }

    /// Overwrites this frame with `frame`, reusing the allocation when possible.
    pub fn copy_from(&mut self, frame: &Frame<'_>) {
        self.width = frame.width;
        self.height = frame.height;
        self.order = frame.order;
        self.data.clear();
        self.data.extend_from_slice(frame.data);
    }

    pub fn as_frame(&self) -> Frame<'_> {
        Frame {
            width: self.width,
            height: self.height,
            order: self.order,
            data: &self.data,
        }
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

impl From<RgbImage> for OwnedFrame {
    fn from(image: RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            order: ChannelOrder::Rgb,
            data: image.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let data = vec![0u8; 11];
        assert_eq!(
            Frame::new(2, 2, &data).unwrap_err(),
            MotionError::BufferSize {
                expected: 12,
                actual: 11
            }
        );
    }

    #[test]
    fn empty_frame_is_allowed() {
        let frame = Frame::new(0, 5, &[]).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.to_luma().len(), 0);
    }

    #[test]
    fn luma_respects_channel_order() {
        let data = [255u8, 0, 0];
        let rgb = Frame::with_order(1, 1, ChannelOrder::Rgb, &data).unwrap();
        let bgr = Frame::with_order(1, 1, ChannelOrder::Bgr, &data).unwrap();
        assert_eq!(rgb.to_luma().get_pixel(0, 0)[0], 76);
        assert_eq!(bgr.to_luma().get_pixel(0, 0)[0], 29);
    }

    #[test]
    fn dimension_check() {
        let a = vec![0u8; 2 * 3 * 3];
        let b = vec![0u8; 3 * 2 * 3];
        let fa = Frame::new(2, 3, &a).unwrap();
        let fb = Frame::new(3, 2, &b).unwrap();
        assert!(fa.ensure_same_dimensions(&fa).is_ok());
        assert_eq!(
            fa.ensure_same_dimensions(&fb).unwrap_err(),
            MotionError::DimensionMismatch {
                expected: (2, 3),
                actual: (3, 2)
            }
        );
    }

    #[test]
    fn owned_frame_round_trips_through_view() {
        let image = RgbImage::from_pixel(4, 2, image::Rgb([9, 8, 7]));
        let owned = OwnedFrame::from(image);
        let view = owned.as_frame();
        assert_eq!(view.dimensions(), (4, 2));
        assert_eq!(view.pixel(3, 1), Some(Pixel::new(9, 8, 7)));

        let mut copy = OwnedFrame::new(1, 1, ChannelOrder::Bgr, vec![0, 0, 0]).unwrap();
        copy.copy_from(&view);
        assert_eq!(copy, owned);
    }

    #[test]
    fn pixel_outside_the_frame_is_none() {
        let data = vec![5u8; 3 * 2 * 3];
        let frame = Frame::new(2, 3, &data).unwrap();
        assert_eq!(frame.pixel(1, 2), Some(Pixel::new(5, 5, 5)));
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.pixel(0, 3), None);
        assert_eq!(frame.pixel(u32::MAX, u32::MAX), None);

        let empty = Frame::new(0, 0, &[]).unwrap();
        assert_eq!(empty.pixel(0, 0), None);
    }
}

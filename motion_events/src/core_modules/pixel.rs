// THEORY (single-pixel luminance):
// The `pixel` module is the most fundamental unit of the engine. Both detectors
// work on a single luminance channel, never on colour, because brightness change is
// what motion looks like to a fixed camera and it is three times cheaper to process.
// Anything that needs a neighbour (blur, morphology, contours) belongs to the mask
// stage in `blob_detector`; anything that needs history belongs to a detector.
//
// Luminance uses the Rec. 601 luma weights (0.299, 0.587, 0.114). The weights are
// applied in 14-bit fixed point with round-half-up so that identical frames always
// produce identical grey values on every platform, which the adaptive detector's
// determinism relies on.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type Channel = u8;
pub type Luminance = u8;

const LUMA_SHIFT: u32 = 14;
const LUMA_RED: u32 = 4899; // 0.299 * 2^14
const LUMA_GREEN: u32 = 9617; // 0.587 * 2^14
const LUMA_BLUE: u32 = 1868; // 0.114 * 2^14
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Number of interleaved colour channels per pixel in a frame buffer.
pub const CHANNELS: usize = 3;

/// Byte order of the three colour channels in a frame buffer.
///
/// Video decoders commonly hand out BGR while cameras and image decoders hand out RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// A "dumb" data container for one colour pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
}

impl Pixel {
    pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
        Self { red, green, blue }
    }

    /// Reads one pixel from a 3-byte slice laid out in `order`.
    #[inline]
    pub fn from_bytes(bytes: &[Channel], order: ChannelOrder) -> Self {
        match order {
            ChannelOrder::Rgb => Self::new(bytes[0], bytes[1], bytes[2]),
            ChannelOrder::Bgr => Self::new(bytes[2], bytes[1], bytes[0]),
        }
    }

    /// Rec. 601 luma on the 0..255 scale.
    #[inline]
    pub fn luminance(&self) -> Luminance {
        let weighted = LUMA_RED * self.red as u32
            + LUMA_GREEN * self.green as u32
            + LUMA_BLUE * self.blue as u32;
        ((weighted + LUMA_ROUND) >> LUMA_SHIFT) as Luminance
    }
}

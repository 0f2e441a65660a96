// THEORY:
// A `Region` is the axis-aligned bounding box of one contiguous blob of changed
// pixels. It is a "dumb" data container: detectors produce fresh regions every
// frame and give them no identity. The only place regions persist is the event
// segmenter, which folds every region of an event into one enclosing box with
// `union` (the envelope union: smallest rectangle containing both inputs).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in pixel coordinates, `(x, y)` being the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds the region spanning the inclusive pixel corners `(min_x, min_y)`..=`(max_x, max_y)`.
    pub fn from_inclusive_corners(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Smallest region enclosing both `self` and `other`.
    pub fn union(&self, other: &Region) -> Region {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Region::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Envelope of every region in `regions`, or `None` when the slice is empty.
    pub fn envelope(regions: &[Region]) -> Option<Region> {
        regions.iter().copied().reduce(|acc, region| acc.union(&region))
    }
}

/// Grows an optional accumulated box by each region in turn. The box never shrinks.
pub fn extend_envelope(accumulated: &mut Option<Region>, regions: &[Region]) {
    for region in regions {
        *accumulated = Some(match accumulated {
            Some(current) => current.union(region),
            None => *region,
        });
    }
}

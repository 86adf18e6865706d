//! Boxes and counting lines in frame coordinates.
//!
//! The origin is the top-left corner of the frame; x grows right, y grows
//! down. `BoundingBox` keeps a signed origin so a padded box can extend past
//! the frame edge before it is clamped for cropping.

use anyhow::{anyhow, Result};

// ----------------------------------------------------------------------------
// BoundingBox
// ----------------------------------------------------------------------------

/// Axis-aligned box in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the rightmost pixel column.
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// One past the bottom pixel row.
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Grow the box by `pad_x` pixels left and right and `pad_y` pixels top
    /// and bottom. The result may extend outside the frame.
    pub fn padded(&self, pad_x: u32, pad_y: u32) -> BoundingBox {
        BoundingBox {
            x: self.x - pad_x as i32,
            y: self.y - pad_y as i32,
            width: self.width + 2 * pad_x,
            height: self.height + 2 * pad_y,
        }
    }

    /// Intersect with a `frame_width` x `frame_height` frame anchored at the
    /// origin. Returns `None` when no pixel of the box lies inside the frame.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(frame_width as i32);
        let y1 = self.bottom().min(frame_height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(BoundingBox {
            x: x0,
            y: y0,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

// ----------------------------------------------------------------------------
// CrossingLine
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A counting line: purely horizontal or purely vertical, never a point.
///
/// Construction checks shape only. Whether the endpoints fit the video's
/// resolution is checked separately by [`CrossingLine::validate_within`],
/// once per run, after the source reports its dimensions and before any
/// frame is processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrossingLine {
    start: (i32, i32),
    end: (i32, i32),
    orientation: Orientation,
}

impl CrossingLine {
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Result<Self> {
        if start == end {
            return Err(anyhow!(
                "crossing line ({}, {}) -> ({}, {}) is a point",
                start.0,
                start.1,
                end.0,
                end.1
            ));
        }
        let orientation = if start.0 == end.0 {
            Orientation::Vertical
        } else if start.1 == end.1 {
            Orientation::Horizontal
        } else {
            return Err(anyhow!(
                "crossing line ({}, {}) -> ({}, {}) must be horizontal or vertical",
                start.0,
                start.1,
                end.0,
                end.1
            ));
        };
        Ok(Self {
            start,
            end,
            orientation,
        })
    }

    pub fn start(&self) -> (i32, i32) {
        self.start
    }

    pub fn end(&self) -> (i32, i32) {
        self.end
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The fixed coordinate: x for a vertical line, y for a horizontal one.
    pub fn axis(&self) -> i32 {
        match self.orientation {
            Orientation::Vertical => self.start.0,
            Orientation::Horizontal => self.start.1,
        }
    }

    /// The varying coordinate's extent, ordered low to high.
    pub fn span(&self) -> (i32, i32) {
        let (a, b) = match self.orientation {
            Orientation::Vertical => (self.start.1, self.end.1),
            Orientation::Horizontal => (self.start.0, self.end.0),
        };
        (a.min(b), a.max(b))
    }

    /// Reject endpoints outside the frame. An out-of-bounds line is a
    /// configuration error that aborts the whole run before the first frame.
    /// Endpoints on the far edge (x == width, y == height) are accepted.
    pub fn validate_within(&self, frame_width: u32, frame_height: u32) -> Result<()> {
        let w = frame_width as i32;
        let h = frame_height as i32;
        for (x, y) in [self.start, self.end] {
            if x < 0 || y < 0 || x > w || y > h {
                return Err(anyhow!(
                    "crossing line endpoint ({}, {}) is outside the {}x{} frame",
                    x,
                    y,
                    frame_width,
                    frame_height
                ));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for CrossingLine {
    type Err = anyhow::Error;

    /// Parses the `x1,y1,x2,y2` form the command line uses.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|part| part.trim().parse())
            .collect::<Result<_, _>>()
            .map_err(|_| anyhow!("crossing line must be four integers x1,y1,x2,y2, got {:?}", s))?;
        let &[x1, y1, x2, y2] = parts.as_slice() else {
            return Err(anyhow!(
                "crossing line must be four integers x1,y1,x2,y2, got {:?}",
                s
            ));
        };
        Self::new((x1, y1), (x2, y2))
    }
}

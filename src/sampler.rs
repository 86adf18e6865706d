//! Uniform random rectangles for the negatives dataset.
//!
//! The sampler knows nothing about motion. One rectangle per frame, drawn
//! uniformly from configured inclusive ranges. The defaults suit wide
//! highway footage where the roadway sits in the 400..900 row band; other
//! cameras override them in configuration.

use anyhow::{anyhow, Result};
use rand::Rng;

use crate::geometry::BoundingBox;

/// Inclusive draw ranges for sampled rectangles.
#[derive(Clone, Copy, Debug)]
pub struct SamplerRanges {
    pub x: (i32, i32),
    pub y: (i32, i32),
    pub width: (u32, u32),
    pub height: (u32, u32),
}

impl Default for SamplerRanges {
    fn default() -> Self {
        Self {
            x: (0, 1800),
            y: (400, 900),
            width: (50, 120),
            height: (60, 90),
        }
    }
}

impl SamplerRanges {
    pub fn validate(&self) -> Result<()> {
        for (name, (lo, hi)) in [("x", self.x), ("y", self.y)] {
            if lo < 0 {
                return Err(anyhow!("sampler {} range must not be negative", name));
            }
            if lo > hi {
                return Err(anyhow!("sampler {} range is inverted: {}..={}", name, lo, hi));
            }
        }
        for (name, (lo, hi)) in [("width", self.width), ("height", self.height)] {
            if lo == 0 {
                return Err(anyhow!("sampler {} must be at least 1", name));
            }
            if lo > hi {
                return Err(anyhow!("sampler {} range is inverted: {}..={}", name, lo, hi));
            }
        }
        Ok(())
    }

    /// Cap the position ranges to the frame so every draw keeps at least its
    /// top-left pixel inside. Ranges that start beyond the frame cannot
    /// produce any in-frame rectangle and are a configuration error.
    pub fn fitted(&self, frame_width: u32, frame_height: u32) -> Result<Self> {
        self.validate()?;
        let max_x = frame_width as i32 - 1;
        let max_y = frame_height as i32 - 1;
        if self.x.0 > max_x {
            return Err(anyhow!(
                "sampler x range starts at {} but the frame is only {} wide",
                self.x.0,
                frame_width
            ));
        }
        if self.y.0 > max_y {
            return Err(anyhow!(
                "sampler y range starts at {} but the frame is only {} tall",
                self.y.0,
                frame_height
            ));
        }
        Ok(Self {
            x: (self.x.0, self.x.1.min(max_x)),
            y: (self.y.0, self.y.1.min(max_y)),
            width: self.width,
            height: self.height,
        })
    }
}

/// Inclusive serial range for one negatives run. The defaults continue a
/// vehicle dataset numbered below 3001 and produce exactly 1000 patches.
#[derive(Clone, Copy, Debug)]
pub struct SerialWindow {
    pub start: u64,
    pub end: u64,
}

impl Default for SerialWindow {
    fn default() -> Self {
        Self {
            start: 3001,
            end: 4000,
        }
    }
}

impl SerialWindow {
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(anyhow!(
                "serial window is inverted: {}..={}",
                self.start,
                self.end
            ));
        }
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.end - self.start + 1
    }
}

pub struct RandomPatchSampler {
    ranges: SamplerRanges,
}

impl RandomPatchSampler {
    pub fn new(ranges: SamplerRanges) -> Result<Self> {
        ranges.validate()?;
        Ok(Self { ranges })
    }

    /// Draw one rectangle. The caller owns the RNG so runs can be seeded.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BoundingBox {
        BoundingBox::new(
            rng.gen_range(self.ranges.x.0..=self.ranges.x.1),
            rng.gen_range(self.ranges.y.0..=self.ranges.y.1),
            rng.gen_range(self.ranges.width.0..=self.ranges.width.1),
            rng.gen_range(self.ranges.height.0..=self.ranges.height.1),
        )
    }
}

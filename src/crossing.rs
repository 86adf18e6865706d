//! Counting-line decisions for detected blobs.
//!
//! The gate owns the run's serial counter. Per frame it takes the detector's
//! blobs, drops the ones under the contour-area floor, and marks the rest as
//! crossing or not. Crossing assigns the next serial; serials are monotonic
//! and never reused within a run.
//!
//! A blob crosses when its extent across the line touches the line's
//! one-pixel band (`[axis, axis + 1]`) while its extent along the line lies
//! strictly between the endpoints. A box overlapping y=500..501 on a
//! horizontal line at y=500 crosses; one stopping at y=499 does not.

use crate::geometry::{BoundingBox, CrossingLine, Orientation};
use crate::motion::Blob;

/// Margin added around a surviving blob for annotation, in pixels.
pub const HIGHLIGHT_MARGIN: u32 = 10;

#[derive(Clone, Copy, Debug)]
pub struct GateConfig {
    /// Contour area below which a blob is ignored outright.
    pub area_floor: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { area_floor: 400.0 }
    }
}

/// Outcome for one blob that survived the area floor.
#[derive(Clone, Copy, Debug)]
pub struct GateDecision {
    /// Detected bounds, unpadded. Extraction crops from these.
    pub bounds: BoundingBox,
    /// Bounds grown by [`HIGHLIGHT_MARGIN`], for drawing only.
    pub highlight: BoundingBox,
    /// Present when the blob crossed the line this frame.
    pub serial: Option<u64>,
}

pub struct CrossingGate {
    line: CrossingLine,
    config: GateConfig,
    next_serial: u64,
}

impl CrossingGate {
    pub fn new(line: CrossingLine, config: GateConfig) -> Self {
        Self {
            line,
            config,
            next_serial: 0,
        }
    }

    pub fn line(&self) -> CrossingLine {
        self.line
    }

    /// Crossings confirmed so far; also the next serial to be assigned.
    pub fn confirmed(&self) -> u64 {
        self.next_serial
    }

    pub fn evaluate(&mut self, blobs: &[Blob]) -> Vec<GateDecision> {
        let mut decisions = Vec::with_capacity(blobs.len());
        for blob in blobs {
            if blob.area < self.config.area_floor {
                continue;
            }
            let serial = if self.crosses(&blob.bounds) {
                let serial = self.next_serial;
                self.next_serial += 1;
                Some(serial)
            } else {
                None
            };
            decisions.push(GateDecision {
                bounds: blob.bounds,
                highlight: blob.bounds.padded(HIGHLIGHT_MARGIN, HIGHLIGHT_MARGIN),
                serial,
            });
        }
        decisions
    }

    fn crosses(&self, bounds: &BoundingBox) -> bool {
        let band_lo = self.line.axis();
        let band_hi = band_lo + 1;
        let (span_lo, span_hi) = self.line.span();
        match self.line.orientation() {
            Orientation::Vertical => {
                bounds.x <= band_hi
                    && bounds.right() >= band_lo
                    && bounds.y > span_lo
                    && bounds.bottom() < span_hi
            }
            Orientation::Horizontal => {
                bounds.y <= band_hi
                    && bounds.bottom() >= band_lo
                    && bounds.x > span_lo
                    && bounds.right() < span_hi
            }
        }
    }
}

//! Highway vehicle image harvesting.
//!
//! This crate extracts vehicle image patches from fixed-camera highway
//! footage using frame differencing against a rolling reference frame.
//!
//! # Pipeline
//!
//! 1. **Source**: frames come from a local video file (feature `video-ffmpeg`)
//!    or a synthetic `stub://` scene.
//! 2. **Motion**: grayscale, Gaussian blur, absolute difference against the
//!    previous frame, threshold, dilate, external contours.
//! 3. **Crossing**: blobs with enough contour area are tested against a
//!    user-defined horizontal or vertical counting line.
//! 4. **Extract**: each confirmed crossing is cropped with padding, clamped to
//!    the frame, and written as `<prefix><serial>.jpg`.
//!
//! The `negatives` tool reuses the source and extraction layers but samples
//! uniform random background rectangles instead of detecting motion, to build
//! a non-vehicle dataset.
//!
//! # Module Structure
//!
//! - `source`: frame acquisition (synthetic scenes, optional ffmpeg decode)
//! - `geometry`: bounding boxes and the counting line
//! - `motion`: frame-differencing detector and its intermediate images
//! - `crossing`: counting-line validation and crossing decisions
//! - `extract`: padded, clamped patch crops and JPEG output
//! - `sampler`: uniform random rectangles for negative datasets
//! - `annotate`: optional per-frame image dumps (line, highlights, stages)
//! - `config`: file-backed settings for the two tools
//! - `pipeline`: the harvest and negatives run loops

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

pub mod annotate;
pub mod config;
pub mod crossing;
pub mod extract;
pub mod geometry;
pub mod motion;
pub mod pipeline;
pub mod sampler;
pub mod source;

pub use crossing::{CrossingGate, GateConfig, GateDecision};
pub use extract::{PatchConfig, PatchWriter};
pub use geometry::{BoundingBox, CrossingLine, Orientation};
pub use motion::{Blob, DetectorConfig, FrameAnalysis, MotionDetector};
pub use pipeline::{run_harvest, run_negatives, RunSummary};
pub use sampler::{RandomPatchSampler, SamplerRanges, SerialWindow};
pub use source::{Frame, SourceStats, VideoConfig, VideoSource};

// -------------------- Run Termination --------------------

/// Why a run loop stopped. All three are normal termination, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The frame source returned its terminal `None`.
    SourceExhausted,
    /// The cancellation token was observed set between frames.
    Cancelled,
    /// The negatives run wrote the patch for its final serial.
    SerialBoundReached,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::SourceExhausted => write!(f, "source exhausted"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::SerialBoundReached => write!(f, "serial bound reached"),
        }
    }
}

/// Cooperative stop signal, checked once per frame by the run loops.
///
/// Clones share the same flag, so a Ctrl-C handler can hold one clone while
/// the pipeline polls another.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// -------------------- Output Name Discipline --------------------

/// Patch filenames are `<prefix><serial>.jpg`. The prefix MUST be a plain
/// name fragment, never a path: we enforce a positive allowlist so a prefix
/// cannot smuggle separators or parent references into the output directory.
///
/// Allowed: "vehicle_image_", "non_vehicle_image_", "cam3.south_"
/// Disallowed: anything with slashes, whitespace, or other punctuation.
pub fn validate_patch_prefix(prefix: &str) -> Result<()> {
    // Compile once for hot paths.
    static PREFIX_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = PREFIX_RE.get_or_init(|| regex::Regex::new(r"^[A-Za-z0-9._-]{1,64}$").unwrap());

    if !re.is_match(prefix) {
        return Err(anyhow!("patch prefix must match ^[A-Za-z0-9._-]{{1,64}}$"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_allows_plain_names() {
        assert!(validate_patch_prefix("vehicle_image_").is_ok());
        assert!(validate_patch_prefix("non_vehicle_image_").is_ok());
        assert!(validate_patch_prefix("cam3.south-A_").is_ok());
    }

    #[test]
    fn prefix_rejects_path_fragments() {
        assert!(validate_patch_prefix("").is_err());
        assert!(validate_patch_prefix("a/b").is_err());
        assert!(validate_patch_prefix("..\\up").is_err());
        assert!(validate_patch_prefix("with space").is_err());
        assert!(validate_patch_prefix(&"x".repeat(65)).is_err());
    }

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}

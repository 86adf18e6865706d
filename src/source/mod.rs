//! Frame sources.
//!
//! A `VideoSource` yields decoded RGB frames one at a time until the stream
//! ends, signalled as `Ok(None)`. Two backends:
//! - `stub://` synthetic scenes, always compiled, used by tests and demos
//! - local video files decoded with ffmpeg, behind the `video-ffmpeg` feature
//!
//! The source is responsible for:
//! - decoding frames to packed RGB in-memory
//! - reporting the stream's dimensions before the first frame is read
//! - signalling end of stream as a value, never as an error
//!
//! The source MUST NOT:
//! - fetch remote URLs
//! - skip or reorder frames

use anyhow::{anyhow, Result};
use image::RgbImage;

mod synthetic;
use synthetic::SyntheticSource;

#[cfg(feature = "video-ffmpeg")]
mod ffmpeg;
#[cfg(feature = "video-ffmpeg")]
use ffmpeg::FfmpegSource;

/// One decoded frame. `index` counts yielded frames from zero.
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

/// Configuration for a frame source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Local file path or a `stub://` scene name
    /// (`stub://static`, `stub://traffic`).
    pub path: String,
    /// Frame budget for synthetic scenes. Real files end when the file does.
    pub stub_frames: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            stub_frames: 240,
        }
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_read: u64,
    pub path: String,
}

pub struct VideoSource {
    backend: Backend,
}

enum Backend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegSource),
}

impl VideoSource {
    pub fn open(config: VideoConfig) -> Result<Self> {
        if !is_local_path(&config.path) {
            return Err(anyhow!(
                "video input only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: Backend::Synthetic(SyntheticSource::new(config)?),
            })
        } else {
            #[cfg(feature = "video-ffmpeg")]
            {
                Ok(Self {
                    backend: Backend::Ffmpeg(FfmpegSource::new(config)?),
                })
            }
            #[cfg(not(feature = "video-ffmpeg"))]
            {
                Err(anyhow!(
                    "reading video files requires the video-ffmpeg feature"
                ))
            }
        }
    }

    /// Announce the source. Decoder state is already set up by `open`.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            Backend::Synthetic(source) => source.connect(),
            #[cfg(feature = "video-ffmpeg")]
            Backend::Ffmpeg(source) => source.connect(),
        }
    }

    /// Read the next frame. `Ok(None)` is the stream's normal end.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            Backend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "video-ffmpeg")]
            Backend::Ffmpeg(source) => source.next_frame(),
        }
    }

    /// Frame dimensions, known before the first read.
    pub fn dimensions(&self) -> (u32, u32) {
        match &self.backend {
            Backend::Synthetic(source) => source.dimensions(),
            #[cfg(feature = "video-ffmpeg")]
            Backend::Ffmpeg(source) => source.dimensions(),
        }
    }

    /// Total frame count when the container knows it. Used to size progress
    /// reporting; never trusted for loop termination.
    pub fn frame_count_hint(&self) -> Option<u64> {
        match &self.backend {
            Backend::Synthetic(source) => source.frame_count_hint(),
            #[cfg(feature = "video-ffmpeg")]
            Backend::Ffmpeg(source) => source.frame_count_hint(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            Backend::Synthetic(source) => source.stats(),
            #[cfg(feature = "video-ffmpeg")]
            Backend::Ffmpeg(source) => source.stats(),
        }
    }
}

fn is_local_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_remote_urls_and_empty_paths() {
        let remote = VideoConfig {
            path: "rtsp://cam/stream".to_string(),
            ..VideoConfig::default()
        };
        assert!(VideoSource::open(remote).is_err());
        assert!(VideoSource::open(VideoConfig::default()).is_err());
    }

    #[test]
    fn unknown_stub_scene_is_rejected() {
        let config = VideoConfig {
            path: "stub://parking_lot".to_string(),
            ..VideoConfig::default()
        };
        assert!(VideoSource::open(config).is_err());
    }

    #[test]
    fn synthetic_source_honors_its_frame_budget() -> Result<()> {
        let config = VideoConfig {
            path: "stub://static".to_string(),
            stub_frames: 3,
        };
        let mut source = VideoSource::open(config)?;
        source.connect()?;
        assert_eq!(source.frame_count_hint(), Some(3));

        for expected in 0..3u64 {
            let frame = source.next_frame()?.expect("frame within budget");
            assert_eq!(frame.index, expected);
            assert_eq!(frame.image.dimensions(), source.dimensions());
        }
        assert!(source.next_frame()?.is_none());
        // The terminal state is stable.
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_read, 3);
        Ok(())
    }

    #[test]
    fn static_scene_repeats_identically() -> Result<()> {
        let config = VideoConfig {
            path: "stub://static".to_string(),
            stub_frames: 2,
        };
        let mut source = VideoSource::open(config)?;
        let first = source.next_frame()?.expect("first frame");
        let second = source.next_frame()?.expect("second frame");
        assert_eq!(first.image, second.image);
        Ok(())
    }

    #[test]
    fn traffic_scene_moves_between_frames() -> Result<()> {
        let config = VideoConfig {
            path: "stub://traffic".to_string(),
            stub_frames: 60,
        };
        let mut source = VideoSource::open(config)?;
        // Skip ahead until the vehicle is well inside the frame.
        let mut previous = None;
        for _ in 0..40 {
            previous = Some(source.next_frame()?.expect("frame").image);
        }
        let current = source.next_frame()?.expect("frame").image;
        assert_ne!(Some(current), previous);
        Ok(())
    }
}

//! Settings for the harvest and negatives runs.
//!
//! One optional JSON file holds the numeric knobs for both tools: a shared
//! `video` entry plus a `harvest` and a `negatives` section. The bins load
//! it, overlay their command-line flags on top, and validate before the run
//! starts. Anything not in the file falls back to the defaults below.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::crossing::GateConfig;
use crate::extract::PatchConfig;
use crate::geometry::CrossingLine;
use crate::motion::DetectorConfig;
use crate::sampler::{SamplerRanges, SerialWindow};
use crate::source::VideoConfig;
use crate::validate_patch_prefix;

const DEFAULT_VIDEO: &str = "stub://traffic";
const DEFAULT_STUB_FRAMES: u64 = 240;
const DEFAULT_HARVEST_DIR: &str = "vehicle_images";
const DEFAULT_NEGATIVES_DIR: &str = "non_vehicle_images";
const DEFAULT_VEHICLE_PREFIX: &str = "vehicle_image_";
const DEFAULT_NEGATIVE_PREFIX: &str = "non_vehicle_image_";
const DEFAULT_DILATION: u8 = 5;
const DEFAULT_BLUR_KERNEL: u32 = 21;
const DEFAULT_AREA_FLOOR: f64 = 400.0;
const DEFAULT_PAD_X: u32 = 15;
const DEFAULT_PAD_Y: u32 = 10;
const DEFAULT_LINE: [i32; 4] = [100, 500, 800, 500];

#[derive(Debug, Deserialize, Default)]
struct SettingsFile {
    video: Option<String>,
    stub_frames: Option<u64>,
    harvest: Option<HarvestFile>,
    negatives: Option<NegativesFile>,
}

#[derive(Debug, Deserialize, Default)]
struct HarvestFile {
    out_dir: Option<PathBuf>,
    prefix: Option<String>,
    threshold: Option<u8>,
    dilation: Option<u8>,
    blur_kernel: Option<u32>,
    area_floor: Option<f64>,
    pad_x: Option<u32>,
    pad_y: Option<u32>,
    /// `[x1, y1, x2, y2]` in frame coordinates.
    line: Option<[i32; 4]>,
}

#[derive(Debug, Deserialize, Default)]
struct NegativesFile {
    out_dir: Option<PathBuf>,
    prefix: Option<String>,
    x: Option<[i32; 2]>,
    y: Option<[i32; 2]>,
    width: Option<[u32; 2]>,
    height: Option<[u32; 2]>,
    serial_start: Option<u64>,
    serial_end: Option<u64>,
    seed: Option<u64>,
}

/// Resolved settings for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub video: VideoConfig,
    pub out_dir: PathBuf,
    pub prefix: String,
    /// The one knob with no default. The run refuses to start without it.
    pub threshold: Option<u8>,
    pub dilation: u8,
    pub blur_kernel: u32,
    pub area_floor: f64,
    pub pad_x: u32,
    pub pad_y: u32,
    pub line: CrossingLine,
}

impl HarvestSettings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = read_settings(path)?;
        let harvest = file.harvest.unwrap_or_default();
        let [x1, y1, x2, y2] = harvest.line.unwrap_or(DEFAULT_LINE);
        Ok(Self {
            video: video_config(file.video, file.stub_frames),
            out_dir: harvest
                .out_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HARVEST_DIR)),
            prefix: harvest
                .prefix
                .unwrap_or_else(|| DEFAULT_VEHICLE_PREFIX.to_string()),
            threshold: harvest.threshold,
            dilation: harvest.dilation.unwrap_or(DEFAULT_DILATION),
            blur_kernel: harvest.blur_kernel.unwrap_or(DEFAULT_BLUR_KERNEL),
            area_floor: harvest.area_floor.unwrap_or(DEFAULT_AREA_FLOOR),
            pad_x: harvest.pad_x.unwrap_or(DEFAULT_PAD_X),
            pad_y: harvest.pad_y.unwrap_or(DEFAULT_PAD_Y),
            line: CrossingLine::new((x1, y1), (x2, y2))?,
        })
    }

    /// Detector knobs, or an error while the threshold is still unset.
    pub fn detector(&self) -> Result<DetectorConfig> {
        let threshold = self.threshold.ok_or_else(|| {
            anyhow!(
                "no threshold set; pass --threshold or set harvest.threshold in the settings file"
            )
        })?;
        Ok(DetectorConfig {
            threshold,
            dilation: self.dilation,
            blur_kernel: self.blur_kernel,
        })
    }

    pub fn gate(&self) -> GateConfig {
        GateConfig {
            area_floor: self.area_floor,
        }
    }

    pub fn patches(&self) -> PatchConfig {
        PatchConfig {
            out_dir: self.out_dir.clone(),
            prefix: self.prefix.clone(),
            pad_x: self.pad_x,
            pad_y: self.pad_y,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.detector()?.validate()?;
        validate_patch_prefix(&self.prefix)?;
        if self.area_floor < 0.0 {
            return Err(anyhow!("area floor must not be negative"));
        }
        Ok(())
    }
}

/// Resolved settings for one negatives run.
#[derive(Debug, Clone)]
pub struct NegativesSettings {
    pub video: VideoConfig,
    pub out_dir: PathBuf,
    pub prefix: String,
    pub ranges: SamplerRanges,
    pub window: SerialWindow,
    /// Fixed RNG seed for reproducible sampling; fresh entropy when unset.
    pub seed: Option<u64>,
}

impl NegativesSettings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = read_settings(path)?;
        let negatives = file.negatives.unwrap_or_default();
        let defaults = SamplerRanges::default();
        let window = SerialWindow::default();
        Ok(Self {
            video: video_config(file.video, file.stub_frames),
            out_dir: negatives
                .out_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_NEGATIVES_DIR)),
            prefix: negatives
                .prefix
                .unwrap_or_else(|| DEFAULT_NEGATIVE_PREFIX.to_string()),
            ranges: SamplerRanges {
                x: negatives.x.map(|[lo, hi]| (lo, hi)).unwrap_or(defaults.x),
                y: negatives.y.map(|[lo, hi]| (lo, hi)).unwrap_or(defaults.y),
                width: negatives
                    .width
                    .map(|[lo, hi]| (lo, hi))
                    .unwrap_or(defaults.width),
                height: negatives
                    .height
                    .map(|[lo, hi]| (lo, hi))
                    .unwrap_or(defaults.height),
            },
            window: SerialWindow {
                start: negatives.serial_start.unwrap_or(window.start),
                end: negatives.serial_end.unwrap_or(window.end),
            },
            seed: negatives.seed,
        })
    }

    pub fn patches(&self) -> PatchConfig {
        PatchConfig {
            out_dir: self.out_dir.clone(),
            prefix: self.prefix.clone(),
            pad_x: 0,
            pad_y: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.ranges.validate()?;
        self.window.validate()?;
        validate_patch_prefix(&self.prefix)?;
        Ok(())
    }
}

fn video_config(path: Option<String>, stub_frames: Option<u64>) -> VideoConfig {
    VideoConfig {
        path: path.unwrap_or_else(|| DEFAULT_VIDEO.to_string()),
        stub_frames: stub_frames.unwrap_or(DEFAULT_STUB_FRAMES),
    }
}

fn read_settings(path: Option<&Path>) -> Result<SettingsFile> {
    let Some(path) = path else {
        return Ok(SettingsFile::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read settings file {}: {}", path.display(), e))?;
    let file = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid settings file {}: {}", path.display(), e))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_without_a_file() -> Result<()> {
        let harvest = HarvestSettings::load(None)?;
        assert_eq!(harvest.video.path, "stub://traffic");
        assert_eq!(harvest.prefix, "vehicle_image_");
        assert_eq!(harvest.threshold, None);
        assert_eq!(harvest.dilation, 5);
        assert_eq!(harvest.blur_kernel, 21);
        assert_eq!(harvest.line.start(), (100, 500));
        assert_eq!(harvest.line.end(), (800, 500));
        assert!(harvest.detector().is_err());

        let negatives = NegativesSettings::load(None)?;
        assert_eq!(negatives.prefix, "non_vehicle_image_");
        assert_eq!(negatives.window.start, 3001);
        assert_eq!(negatives.window.end, 4000);
        assert_eq!(negatives.seed, None);
        negatives.validate()?;
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let file = settings_file(
            r#"{
                "video": "stub://static",
                "stub_frames": 12,
                "harvest": {
                    "threshold": 30,
                    "dilation": 3,
                    "line": [320, 100, 320, 400],
                    "out_dir": "patches"
                },
                "negatives": {
                    "x": [0, 500],
                    "serial_start": 1,
                    "serial_end": 10,
                    "seed": 99
                }
            }"#,
        );

        let harvest = HarvestSettings::load(Some(file.path()))?;
        assert_eq!(harvest.video.path, "stub://static");
        assert_eq!(harvest.video.stub_frames, 12);
        assert_eq!(harvest.threshold, Some(30));
        assert_eq!(harvest.dilation, 3);
        assert_eq!(harvest.out_dir, PathBuf::from("patches"));
        assert_eq!(harvest.line.start(), (320, 100));
        harvest.validate()?;
        assert_eq!(harvest.detector()?.threshold, 30);

        let negatives = NegativesSettings::load(Some(file.path()))?;
        assert_eq!(negatives.ranges.x, (0, 500));
        assert_eq!(negatives.window.count(), 10);
        assert_eq!(negatives.seed, Some(99));
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = settings_file("{ not json");
        assert!(HarvestSettings::load(Some(file.path())).is_err());
    }

    #[test]
    fn diagonal_line_in_the_file_is_rejected_at_load() {
        let file = settings_file(r#"{ "harvest": { "line": [0, 0, 100, 100] } }"#);
        assert!(HarvestSettings::load(Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_path_is_an_error() {
        let err = HarvestSettings::load(Some(Path::new("/no/such/settings.json")));
        assert!(err.is_err());
    }
}

//! Patch cropping and JPEG output.
//!
//! `PatchWriter` turns a confirmed bounding box into a file: pad, clamp to
//! the frame, crop from the clean color frame, save as `<prefix><serial>.jpg`
//! in the output directory. The directory is created if missing and never
//! wiped; a rerun with the same serials overwrites files one by one.
//!
//! Crops are clamped to the frame bounds. A padded box near an edge loses
//! its out-of-frame margin instead of failing; only a box with no pixels
//! inside the frame at all is an error.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

use crate::geometry::BoundingBox;
use crate::validate_patch_prefix;

#[derive(Clone, Debug)]
pub struct PatchConfig {
    /// Directory patches are written to. Created on construction.
    pub out_dir: PathBuf,
    /// Filename prefix; must satisfy [`validate_patch_prefix`].
    pub prefix: String,
    /// Horizontal padding added to each box before cropping.
    pub pad_x: u32,
    /// Vertical padding added to each box before cropping.
    pub pad_y: u32,
}

impl PatchConfig {
    /// Padded crop for harvested vehicle boxes: 15 px sideways, 10 px
    /// vertically, so a little road context survives around the vehicle.
    pub fn vehicles(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            prefix: "vehicle_image_".to_string(),
            pad_x: 15,
            pad_y: 10,
        }
    }

    /// Unpadded crop for sampled background rectangles.
    pub fn negatives(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            prefix: "non_vehicle_image_".to_string(),
            pad_x: 0,
            pad_y: 0,
        }
    }
}

pub struct PatchWriter {
    config: PatchConfig,
}

impl PatchWriter {
    pub fn new(config: PatchConfig) -> Result<Self> {
        validate_patch_prefix(&config.prefix)?;
        std::fs::create_dir_all(&config.out_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                config.out_dir.display()
            )
        })?;
        Ok(Self { config })
    }

    pub fn out_dir(&self) -> &Path {
        &self.config.out_dir
    }

    /// The file a given serial is (or will be) written to.
    pub fn path_for(&self, serial: u64) -> PathBuf {
        self.config
            .out_dir
            .join(format!("{}{}.jpg", self.config.prefix, serial))
    }

    /// Pad, clamp, crop and save one patch. Returns the written path.
    pub fn write(&self, image: &RgbImage, bounds: BoundingBox, serial: u64) -> Result<PathBuf> {
        let patch = self.crop(image, bounds)?;
        let path = self.path_for(serial);
        patch
            .save(&path)
            .with_context(|| format!("failed to write patch {}", path.display()))?;
        Ok(path)
    }

    fn crop(&self, image: &RgbImage, bounds: BoundingBox) -> Result<RgbImage> {
        let padded = bounds.padded(self.config.pad_x, self.config.pad_y);
        let clamped = padded
            .clamped(image.width(), image.height())
            .ok_or_else(|| {
                anyhow!(
                    "box at ({}, {}) has no pixels inside the {}x{} frame",
                    bounds.x,
                    bounds.y,
                    image.width(),
                    image.height()
                )
            })?;
        Ok(image::imageops::crop_imm(
            image,
            clamped.x as u32,
            clamped.y as u32,
            clamped.width,
            clamped.height,
        )
        .to_image())
    }
}

//! Observation dumps: annotated frames and detector stage images.
//!
//! The pipeline runs headless. What a live preview window would have shown
//! can instead be written to disk: the color frame with the counting line
//! and highlight rectangles drawn on a copy, and the detector's grayscale,
//! mask and dilated images. Dumps stop after a configured number of frames
//! so a long run cannot fill the disk.
//!
//! Crops for the dataset never come from annotated frames; drawing always
//! happens on a clone.

use anyhow::{Context, Result};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use crate::crossing::GateDecision;
use crate::geometry::{BoundingBox, CrossingLine};
use crate::motion::FrameAnalysis;

const LINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const HIGHLIGHT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Draw the counting line in red.
pub fn draw_crossing_line(image: &mut RgbImage, line: CrossingLine) {
    let (x1, y1) = line.start();
    let (x2, y2) = line.end();
    draw_line_segment_mut(
        image,
        (x1 as f32, y1 as f32),
        (x2 as f32, y2 as f32),
        LINE_COLOR,
    );
}

/// Draw each decision's highlight rectangle in green.
pub fn draw_highlights(image: &mut RgbImage, decisions: &[GateDecision]) {
    for decision in decisions {
        if let Some(rect) = frame_rect(decision.highlight, image.width(), image.height()) {
            draw_hollow_rect_mut(image, rect, HIGHLIGHT_COLOR);
        }
    }
}

fn frame_rect(bounds: BoundingBox, frame_width: u32, frame_height: u32) -> Option<Rect> {
    let clamped = bounds.clamped(frame_width, frame_height)?;
    Some(Rect::at(clamped.x, clamped.y).of_size(clamped.width, clamped.height))
}

/// Where observation images go, if anywhere.
#[derive(Clone, Debug)]
pub struct ObserveConfig {
    /// Annotated color frames (line plus highlights).
    pub annotate_dir: Option<PathBuf>,
    /// Detector stages (grayscale, mask, dilated).
    pub stages_dir: Option<PathBuf>,
    /// Stop dumping after this many processed frames.
    pub limit: u64,
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            annotate_dir: None,
            stages_dir: None,
            limit: 200,
        }
    }
}

pub struct ObserveSinks {
    config: ObserveConfig,
    frames_recorded: u64,
}

impl ObserveSinks {
    pub fn new(config: ObserveConfig) -> Result<Self> {
        for dir in [&config.annotate_dir, &config.stages_dir].into_iter().flatten() {
            std::fs::create_dir_all(dir).with_context(|| {
                format!("failed to create observation directory {}", dir.display())
            })?;
        }
        Ok(Self {
            config,
            frames_recorded: 0,
        })
    }

    fn active(&self) -> bool {
        (self.config.annotate_dir.is_some() || self.config.stages_dir.is_some())
            && self.frames_recorded < self.config.limit
    }

    /// Dump whatever is configured for one processed frame.
    pub fn record(
        &mut self,
        frame_index: u64,
        image: &RgbImage,
        line: Option<CrossingLine>,
        decisions: &[GateDecision],
        analysis: Option<&FrameAnalysis>,
    ) -> Result<()> {
        if !self.active() {
            return Ok(());
        }
        self.frames_recorded += 1;

        if let Some(dir) = &self.config.annotate_dir {
            let mut annotated = image.clone();
            if let Some(line) = line {
                draw_crossing_line(&mut annotated, line);
            }
            draw_highlights(&mut annotated, decisions);
            save_rgb_png(dir, "frame", frame_index, &annotated)?;
        }

        if let (Some(dir), Some(analysis)) = (&self.config.stages_dir, analysis) {
            save_gray_png(dir, "gray", frame_index, &analysis.grayscale)?;
            save_gray_png(dir, "mask", frame_index, &analysis.mask)?;
            save_gray_png(dir, "dilated", frame_index, &analysis.dilated)?;
        }
        Ok(())
    }

    /// Dump one frame with a sampled rectangle drawn on it. Used by the
    /// negatives run, which has no line and no detector stages.
    pub fn record_sample(
        &mut self,
        frame_index: u64,
        image: &RgbImage,
        sampled: BoundingBox,
    ) -> Result<()> {
        if !self.active() {
            return Ok(());
        }
        self.frames_recorded += 1;

        if let Some(dir) = &self.config.annotate_dir {
            let mut annotated = image.clone();
            if let Some(rect) = frame_rect(sampled, annotated.width(), annotated.height()) {
                draw_hollow_rect_mut(&mut annotated, rect, HIGHLIGHT_COLOR);
            }
            save_rgb_png(dir, "frame", frame_index, &annotated)?;
        }
        Ok(())
    }
}

fn save_rgb_png(dir: &Path, stage: &str, frame_index: u64, image: &RgbImage) -> Result<()> {
    let path = stage_path(dir, stage, frame_index);
    image
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn save_gray_png(dir: &Path, stage: &str, frame_index: u64, image: &GrayImage) -> Result<()> {
    let path = stage_path(dir, stage, frame_index);
    image
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn stage_path(dir: &Path, stage: &str, frame_index: u64) -> PathBuf {
    // Zero-padded so a directory listing sorts in frame order.
    dir.join(format!("{}_{:06}.png", stage, frame_index))
}

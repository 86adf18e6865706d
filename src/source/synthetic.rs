//! Synthetic `stub://` scenes.
//!
//! Deterministic, dependency-free stand-ins for real footage. `stub://static`
//! renders the same empty roadway every frame; `stub://traffic` adds one
//! bright vehicle translating left to right at a fixed speed, so detection
//! and crossing logic can be exercised end to end without a video file.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

use super::{Frame, SourceStats, VideoConfig};

const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 480;

const VEHICLE_WIDTH: u32 = 80;
const VEHICLE_HEIGHT: u32 = 50;
const VEHICLE_TOP: i32 = 215;
/// Pixels per frame. Fast enough to difference cleanly, slow enough that a
/// pass over a line spans many frames.
const VEHICLE_SPEED: i32 = 4;
const VEHICLE_SHADE: u8 = 230;

#[derive(Clone, Copy, Debug)]
enum Scene {
    Static,
    Traffic,
}

pub(super) struct SyntheticSource {
    config: VideoConfig,
    scene: Scene,
    frames_read: u64,
}

impl SyntheticSource {
    pub(super) fn new(config: VideoConfig) -> Result<Self> {
        let scene = match config.path.as_str() {
            "stub://static" => Scene::Static,
            "stub://traffic" => Scene::Traffic,
            other => {
                return Err(anyhow!(
                    "unknown stub scene '{}' (expected stub://static or stub://traffic)",
                    other
                ))
            }
        };
        Ok(Self {
            config,
            scene,
            frames_read: 0,
        })
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        log::info!(
            "VideoSource: connected to {} (synthetic {}x{}, {} frames)",
            self.config.path,
            STUB_WIDTH,
            STUB_HEIGHT,
            self.config.stub_frames
        );
        Ok(())
    }

    pub(super) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frames_read >= self.config.stub_frames {
            return Ok(None);
        }
        let index = self.frames_read;
        self.frames_read += 1;
        Ok(Some(Frame {
            index,
            image: self.render(index),
        }))
    }

    pub(super) fn dimensions(&self) -> (u32, u32) {
        (STUB_WIDTH, STUB_HEIGHT)
    }

    pub(super) fn frame_count_hint(&self) -> Option<u64> {
        Some(self.config.stub_frames)
    }

    pub(super) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            path: self.config.path.clone(),
        }
    }

    fn render(&self, index: u64) -> RgbImage {
        // Asphalt gradient, slightly brighter toward the bottom.
        let mut image = RgbImage::from_fn(STUB_WIDTH, STUB_HEIGHT, |_, y| {
            let shade = 46 + (y / 8) as u8;
            Rgb([shade, shade, shade])
        });
        if let Scene::Traffic = self.scene {
            // The vehicle starts just off the left edge and drives right.
            let left = index as i32 * VEHICLE_SPEED - VEHICLE_WIDTH as i32;
            draw_vehicle(&mut image, left);
        }
        image
    }
}

fn draw_vehicle(image: &mut RgbImage, left: i32) {
    for y in VEHICLE_TOP..VEHICLE_TOP + VEHICLE_HEIGHT as i32 {
        for x in left..left + VEHICLE_WIDTH as i32 {
            if x >= 0 && (x as u32) < image.width() && y >= 0 && (y as u32) < image.height() {
                image.put_pixel(
                    x as u32,
                    y as u32,
                    Rgb([VEHICLE_SHADE, VEHICLE_SHADE, VEHICLE_SHADE]),
                );
            }
        }
    }
}

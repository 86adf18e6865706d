//! Frame-differencing motion detector.
//!
//! The detector owns the rolling reference frame and turns each color frame
//! into a set of moving-region blobs. Per frame it:
//! - converts to grayscale and applies a Gaussian blur
//! - differences the result against the reference (the previous frame)
//! - thresholds the difference into a binary mask
//! - dilates the mask to merge fragmented regions
//! - traces external contours and computes their bounding boxes and areas
//! - replaces the reference with the current blurred grayscale
//!
//! The reference is the immediately preceding frame, never an average, so
//! slow movers and sudden lighting changes leak into the mask. That is the
//! intended model for this tool, not something to compensate for here.
//!
//! The detector MUST NOT:
//! - decide whether a blob counts as a crossing (that is `crossing`)
//! - read frames itself or decide when the stream ends (that is `source`)

use anyhow::{anyhow, Result};
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use imageproc::point::Point;

use crate::geometry::BoundingBox;

/// Tuning knobs for the detector.
#[derive(Clone, Copy, Debug)]
pub struct DetectorConfig {
    /// Per-pixel difference at or above this value becomes foreground.
    pub threshold: u8,
    /// Dilation strength, equivalent to this many passes of a 3x3 kernel.
    pub dilation: u8,
    /// Odd Gaussian kernel size in pixels. The blur sigma is derived from it.
    pub blur_kernel: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            dilation: 5,
            blur_kernel: 21,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(anyhow!("threshold must be between 1 and 255"));
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(anyhow!(
                "blur kernel must be odd, got {}",
                self.blur_kernel
            ));
        }
        Ok(())
    }

    /// Blur sigma for the configured kernel size, using OpenCV's rule so the
    /// same kernel number smooths the same amount it did there.
    fn sigma(&self) -> f32 {
        let k = self.blur_kernel as f32;
        0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
    }
}

/// One moving region: contour bounding box plus the contour's polygon area.
///
/// The area is the traced contour's shoelace area, not `width * height`; a
/// one-pixel-wide sliver can legitimately have area 0.
#[derive(Clone, Copy, Debug)]
pub struct Blob {
    pub bounds: BoundingBox,
    pub area: f64,
}

/// Everything the detector derived from one frame, in contour discovery
/// order. The intermediate images are kept for stage dumps and tests.
pub struct FrameAnalysis {
    pub blobs: Vec<Blob>,
    /// Blurred grayscale of the frame (this becomes the next reference).
    pub grayscale: GrayImage,
    /// Thresholded difference against the reference.
    pub mask: GrayImage,
    /// Mask after dilation; contours are traced on this image.
    pub dilated: GrayImage,
}

pub struct MotionDetector {
    config: DetectorConfig,
    reference: Option<GrayImage>,
}

impl MotionDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            reference: None,
        })
    }

    /// True until the first frame has seeded the reference.
    pub fn is_cold(&self) -> bool {
        self.reference.is_none()
    }

    /// Analyze one frame. Returns `None` for the first frame, which only
    /// seeds the reference (cold start).
    pub fn process(&mut self, image: &RgbImage) -> Result<Option<FrameAnalysis>> {
        let gray = image::imageops::grayscale(image);
        let blurred = gaussian_blur_f32(&gray, self.config.sigma());

        let reference = match self.reference.take() {
            None => {
                self.reference = Some(blurred);
                return Ok(None);
            }
            Some(reference) => reference,
        };

        if reference.dimensions() != blurred.dimensions() {
            return Err(anyhow!(
                "frame size changed mid-stream: reference is {}x{}, frame is {}x{}",
                reference.width(),
                reference.height(),
                blurred.width(),
                blurred.height()
            ));
        }

        let diff = absolute_difference(&reference, &blurred);
        let mask = binarize(&diff, self.config.threshold);
        let dilated = if self.config.dilation == 0 {
            mask.clone()
        } else {
            dilate(&mask, Norm::LInf, self.config.dilation)
        };

        let mut blobs = Vec::new();
        for contour in find_contours::<i32>(&dilated) {
            // External contours only; holes and nested borders are noise here.
            if contour.parent.is_some() {
                continue;
            }
            let Some(bounds) = contour_bounds(&contour.points) else {
                continue;
            };
            blobs.push(Blob {
                bounds,
                area: contour_area(&contour.points),
            });
        }

        self.reference = Some(blurred.clone());
        Ok(Some(FrameAnalysis {
            blobs,
            grayscale: blurred,
            mask,
            dilated,
        }))
    }
}

// ----------------------------------------------------------------------------
// Pixel passes
// ----------------------------------------------------------------------------

fn absolute_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].abs_diff(b.get_pixel(x, y)[0])])
    })
}

fn binarize(diff: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(diff.width(), diff.height(), |x, y| {
        if diff.get_pixel(x, y)[0] >= threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

fn contour_bounds(points: &[Point<i32>]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut min_x, mut min_y) = (first.x, first.y);
    let (mut max_x, mut max_y) = (first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox::new(
        min_x,
        min_y,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Shoelace area of the traced contour polygon.
fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut doubled = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        doubled += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    doubled.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn flat_frame(width: u32, height: u32, level: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([level, level, level]))
    }

    fn frame_with_block(
        width: u32,
        height: u32,
        background: u8,
        block: BoundingBox,
        level: u8,
    ) -> RgbImage {
        let mut image = flat_frame(width, height, background);
        for y in block.y..block.bottom() {
            for x in block.x..block.right() {
                image.put_pixel(x as u32, y as u32, Rgb([level, level, level]));
            }
        }
        image
    }

    fn test_config() -> DetectorConfig {
        // Small kernel so a compact block survives the blur in a small frame.
        DetectorConfig {
            threshold: 25,
            dilation: 2,
            blur_kernel: 3,
        }
    }

    #[test]
    fn first_frame_only_seeds_the_reference() -> Result<()> {
        let mut detector = MotionDetector::new(test_config())?;
        assert!(detector.is_cold());
        assert!(detector.process(&flat_frame(160, 120, 40))?.is_none());
        assert!(!detector.is_cold());
        assert!(detector.process(&flat_frame(160, 120, 40))?.is_some());
        Ok(())
    }

    #[test]
    fn static_scene_yields_empty_mask_every_frame() -> Result<()> {
        let mut detector = MotionDetector::new(test_config())?;
        let frame = frame_with_block(160, 120, 30, BoundingBox::new(40, 40, 30, 20), 200);
        detector.process(&frame)?;
        for _ in 0..5 {
            let analysis = detector.process(&frame)?.expect("warm detector");
            assert!(analysis.mask.pixels().all(|p| p[0] == 0));
            assert!(analysis.blobs.is_empty());
        }
        Ok(())
    }

    #[test]
    fn reference_is_the_previous_frame_not_an_average() -> Result<()> {
        let mut detector = MotionDetector::new(test_config())?;
        let first = flat_frame(160, 120, 10);
        let second = flat_frame(160, 120, 90);
        let third = flat_frame(160, 120, 10);

        detector.process(&first)?;
        detector.process(&second)?;
        // If the reference were averaged, first == third would still differ
        // from it. Rolling reference means third differs by |90 - 10|.
        let analysis = detector.process(&third)?.expect("warm detector");
        assert!(analysis.mask.pixels().all(|p| p[0] == 255));

        let expected =
            gaussian_blur_f32(&image::imageops::grayscale(&third), test_config().sigma());
        assert_eq!(detector.reference.as_ref(), Some(&expected));
        Ok(())
    }

    #[test]
    fn appearing_block_is_detected_with_sane_bounds() -> Result<()> {
        let mut detector = MotionDetector::new(test_config())?;
        let block = BoundingBox::new(50, 40, 40, 30);
        detector.process(&flat_frame(160, 120, 20))?;
        let analysis = detector
            .process(&frame_with_block(160, 120, 20, block, 230))?
            .expect("warm detector");

        assert_eq!(analysis.blobs.len(), 1);
        let bounds = analysis.blobs[0].bounds;
        // Blur and dilation grow the region a little; it must still contain
        // the block and stay in its neighborhood.
        assert!(bounds.x <= block.x && bounds.right() >= block.right());
        assert!(bounds.y <= block.y && bounds.bottom() >= block.bottom());
        assert!(bounds.x >= block.x - 6 && bounds.y >= block.y - 6);
        assert!(analysis.blobs[0].area > 0.0);
        Ok(())
    }

    #[test]
    fn frame_size_change_is_an_error() -> Result<()> {
        let mut detector = MotionDetector::new(test_config())?;
        detector.process(&flat_frame(160, 120, 40))?;
        assert!(detector.process(&flat_frame(80, 60, 40)).is_err());
        Ok(())
    }

    #[test]
    fn config_rejects_even_kernel_and_zero_threshold() {
        let bad_kernel = DetectorConfig {
            blur_kernel: 20,
            ..DetectorConfig::default()
        };
        assert!(bad_kernel.validate().is_err());

        let bad_threshold = DetectorConfig {
            threshold: 0,
            ..DetectorConfig::default()
        };
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn shoelace_area_matches_simple_rectangle() {
        let rect = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 5),
            Point::new(0, 5),
        ];
        assert_eq!(contour_area(&rect), 50.0);
        assert_eq!(contour_area(&rect[..2]), 0.0);
    }
}

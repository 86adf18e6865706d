//! Local video file source using FFmpeg.
//!
//! Frames are decoded in-memory and scaled to packed RGB24. End of file is
//! reported as `Ok(None)` after the decoder has been flushed, so the run
//! loops never see an error for a video that simply ended.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;

use super::{Frame, SourceStats, VideoConfig};

pub(super) struct FfmpegSource {
    config: VideoConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: Option<u64>,
    frames_read: u64,
    drained: bool,
}

impl FfmpegSource {
    pub(super) fn new(config: VideoConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open video file '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let frame_count = if input_stream.frames() > 0 {
            Some(input_stream.frames() as u64)
        } else {
            None
        };
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            frame_count,
            frames_read: 0,
            drained: false,
        })
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        log::info!(
            "VideoSource: connected to {} (ffmpeg {}x{})",
            self.config.path,
            self.decoder.width(),
            self.decoder.height()
        );
        Ok(())
    }

    pub(super) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        let mut rgb_frame = ffmpeg::frame::Video::empty();

        loop {
            // Drain frames the decoder already holds before feeding more.
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                self.scaler
                    .run(&decoded, &mut rgb_frame)
                    .context("scale frame to RGB")?;
                let image = frame_to_image(&rgb_frame)?;
                let index = self.frames_read;
                self.frames_read += 1;
                return Ok(Some(Frame { index, image }));
            }

            if self.drained {
                return Ok(None);
            }

            let mut sent = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?;
                sent = true;
                break;
            }
            if !sent {
                // End of file: flush the decoder, then drain what remains.
                self.decoder.send_eof().context("flush ffmpeg decoder")?;
                self.drained = true;
            }
        }
    }

    pub(super) fn dimensions(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }

    pub(super) fn frame_count_hint(&self) -> Option<u64> {
        self.frame_count
    }

    pub(super) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            path: self.config.path.clone(),
        }
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0) as usize;
    let data = frame.data(0);

    let pixels = if stride == row_bytes {
        data.to_vec()
    } else {
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            pixels.extend_from_slice(
                data.get(start..end)
                    .context("ffmpeg frame row is out of bounds")?,
            );
        }
        pixels
    };

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("ffmpeg frame buffer does not match its dimensions"))
}

//! The two run loops.
//!
//! `run_harvest` wires source -> detector -> gate -> writer and saves a crop
//! for every confirmed crossing. `run_negatives` bypasses detection and
//! saves one random rectangle per frame until its serial window is spent.
//!
//! Both loops are single threaded and check the cancel token once per
//! iteration, so a Ctrl-C lands between frames, never inside a write. All
//! configuration problems surface before the first frame is read; once the
//! loop is running the only errors left are real I/O failures, and those
//! abort the run.

use anyhow::Result;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::annotate::{ObserveConfig, ObserveSinks};
use crate::config::{HarvestSettings, NegativesSettings};
use crate::crossing::CrossingGate;
use crate::extract::PatchWriter;
use crate::motion::MotionDetector;
use crate::sampler::RandomPatchSampler;
use crate::source::VideoSource;
use crate::{CancelToken, StopReason};

/// Debug progress line cadence, in frames.
const PROGRESS_EVERY: u64 = 250;

/// What a finished run did and why it stopped.
#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    pub frames: u64,
    pub patches: u64,
    pub stop: StopReason,
}

/// Detect vehicles crossing the configured line and save a crop for each
/// confirmed crossing. Serials count up from 0 within the run.
pub fn run_harvest(
    settings: &HarvestSettings,
    observe: ObserveConfig,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    settings.validate()?;

    let mut source = VideoSource::open(settings.video.clone())?;
    source.connect()?;
    let (width, height) = source.dimensions();
    settings.line.validate_within(width, height)?;

    let mut detector = MotionDetector::new(settings.detector()?)?;
    let mut gate = CrossingGate::new(settings.line, settings.gate());
    let writer = PatchWriter::new(settings.patches())?;
    let mut sinks = ObserveSinks::new(observe)?;

    info!(
        "harvest: {} ({}x{}) -> {}",
        settings.video.path,
        width,
        height,
        settings.out_dir.display()
    );

    let mut frames = 0u64;
    let mut patches = 0u64;
    let stop = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }
        let Some(frame) = source.next_frame()? else {
            break StopReason::SourceExhausted;
        };
        frames += 1;

        let Some(analysis) = detector.process(&frame.image)? else {
            // First frame only seeds the reference.
            sinks.record(frame.index, &frame.image, Some(gate.line()), &[], None)?;
            continue;
        };

        let decisions = gate.evaluate(&analysis.blobs);
        for decision in &decisions {
            if let Some(serial) = decision.serial {
                // Crops come from the clean frame; annotation draws on a copy.
                let path = writer.write(&frame.image, decision.bounds, serial)?;
                patches += 1;
                info!(
                    "crossing {} at frame {}: box ({}, {}) {}x{} -> {}",
                    serial,
                    frame.index,
                    decision.bounds.x,
                    decision.bounds.y,
                    decision.bounds.width,
                    decision.bounds.height,
                    path.display()
                );
            }
        }
        sinks.record(
            frame.index,
            &frame.image,
            Some(gate.line()),
            &decisions,
            Some(&analysis),
        )?;

        if frames % PROGRESS_EVERY == 0 {
            debug!(
                "harvest: {} frames in, {} crossings so far",
                frames,
                gate.confirmed()
            );
        }
    };

    info!(
        "harvest: stopped ({}) after {} frames, {} patches written",
        stop, frames, patches
    );
    Ok(RunSummary {
        frames,
        patches,
        stop,
    })
}

/// Save one random background rectangle per frame, numbering files through
/// the settings' serial window. `on_frame` runs after every written patch,
/// for progress reporting. Annotated dumps show where each sample landed.
pub fn run_negatives<F>(
    settings: &NegativesSettings,
    observe: ObserveConfig,
    cancel: &CancelToken,
    mut on_frame: F,
) -> Result<RunSummary>
where
    F: FnMut(u64),
{
    settings.validate()?;

    let mut source = VideoSource::open(settings.video.clone())?;
    source.connect()?;
    let (width, height) = source.dimensions();

    let sampler = RandomPatchSampler::new(settings.ranges.fitted(width, height)?)?;
    let writer = PatchWriter::new(settings.patches())?;
    let mut sinks = ObserveSinks::new(observe)?;
    let mut rng: StdRng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if let Some(total) = source.frame_count_hint() {
        info!("negatives: source reports {} frames", total);
    }
    info!(
        "negatives: {} ({}x{}) -> {}, serials {}..={}",
        settings.video.path,
        width,
        height,
        settings.out_dir.display(),
        settings.window.start,
        settings.window.end
    );

    let mut frames = 0u64;
    let mut patches = 0u64;
    let mut serial = settings.window.start;
    let stop = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }
        if serial > settings.window.end {
            break StopReason::SerialBoundReached;
        }
        let Some(frame) = source.next_frame()? else {
            break StopReason::SourceExhausted;
        };
        frames += 1;

        let sampled = sampler.sample(&mut rng);
        writer.write(&frame.image, sampled, serial)?;
        sinks.record_sample(frame.index, &frame.image, sampled)?;
        patches += 1;
        serial += 1;
        on_frame(frames);

        if frames % PROGRESS_EVERY == 0 {
            debug!("negatives: {} frames in, next serial {}", frames, serial);
        }
    };

    info!(
        "negatives: stopped ({}) after {} frames, {} patches written",
        stop, frames, patches
    );
    Ok(RunSummary {
        frames,
        patches,
        stop,
    })
}

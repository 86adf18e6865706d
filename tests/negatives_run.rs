use anyhow::Result;
use tempfile::TempDir;

use roadcap::annotate::ObserveConfig;
use roadcap::config::NegativesSettings;
use roadcap::{run_negatives, CancelToken, SamplerRanges, StopReason};

/// Settings aimed at the 640x480 synthetic scene with a short serial window
/// so runs finish quickly.
fn stub_settings(out_dir: &TempDir, stub_frames: u64) -> Result<NegativesSettings> {
    let mut settings = NegativesSettings::load(None)?;
    settings.video.path = "stub://static".to_string();
    settings.video.stub_frames = stub_frames;
    settings.out_dir = out_dir.path().to_path_buf();
    settings.ranges = SamplerRanges {
        x: (0, 500),
        y: (0, 400),
        width: (20, 40),
        height: (20, 40),
    };
    settings.seed = Some(7);
    Ok(settings)
}

#[test]
fn writes_the_whole_serial_window() -> Result<()> {
    let out_dir = TempDir::new()?;
    let mut settings = stub_settings(&out_dir, 30)?;
    settings.window.start = 3001;
    settings.window.end = 3010;

    let summary = run_negatives(&settings, ObserveConfig::default(), &CancelToken::new(), |_| {})?;

    assert_eq!(summary.stop, StopReason::SerialBoundReached);
    assert_eq!(summary.frames, 10);
    assert_eq!(summary.patches, 10);
    for serial in 3001..=3010 {
        let path = out_dir
            .path()
            .join(format!("non_vehicle_image_{}.jpg", serial));
        assert!(path.is_file(), "missing {}", path.display());
        let patch = image::open(&path)?.to_rgb8();
        assert!(patch.width() >= 20 && patch.width() <= 40);
        assert!(patch.height() >= 20 && patch.height() <= 40);
    }
    assert!(!out_dir.path().join("non_vehicle_image_3011.jpg").exists());
    Ok(())
}

#[test]
fn stops_when_the_source_runs_dry() -> Result<()> {
    let out_dir = TempDir::new()?;
    let settings = stub_settings(&out_dir, 5)?;

    let summary = run_negatives(&settings, ObserveConfig::default(), &CancelToken::new(), |_| {})?;

    assert_eq!(summary.stop, StopReason::SourceExhausted);
    assert_eq!(summary.frames, 5);
    assert_eq!(summary.patches, 5);
    assert_eq!(std::fs::read_dir(out_dir.path())?.count(), 5);
    Ok(())
}

#[test]
fn default_ranges_fit_a_small_camera() -> Result<()> {
    let out_dir = TempDir::new()?;
    let mut settings = stub_settings(&out_dir, 30)?;
    // The stock ranges suit a 1080p highway camera; the run caps them to
    // the 640x480 stub instead of failing on an off-frame draw.
    settings.ranges = SamplerRanges::default();
    settings.window.start = 1;
    settings.window.end = 20;

    let summary = run_negatives(&settings, ObserveConfig::default(), &CancelToken::new(), |_| {})?;

    assert_eq!(summary.stop, StopReason::SerialBoundReached);
    assert_eq!(summary.patches, 20);
    Ok(())
}

#[test]
fn cancelling_from_the_frame_callback_stops_the_run() -> Result<()> {
    let out_dir = TempDir::new()?;
    let mut settings = stub_settings(&out_dir, 50)?;
    settings.window.start = 1;
    settings.window.end = 40;

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let summary = run_negatives(&settings, ObserveConfig::default(), &cancel, |frames| {
        if frames == 3 {
            trigger.cancel();
        }
    })?;

    assert_eq!(summary.stop, StopReason::Cancelled);
    assert_eq!(summary.patches, 3);
    Ok(())
}

#[test]
fn inverted_serial_window_is_rejected() -> Result<()> {
    let out_dir = TempDir::new()?;
    let mut settings = stub_settings(&out_dir, 10)?;
    settings.window.start = 10;
    settings.window.end = 9;

    let result = run_negatives(&settings, ObserveConfig::default(), &CancelToken::new(), |_| {});
    assert!(result.is_err());
    Ok(())
}

#[test]
fn seeded_runs_reproduce_the_same_patches() -> Result<()> {
    let first_dir = TempDir::new()?;
    let second_dir = TempDir::new()?;

    for dir in [&first_dir, &second_dir] {
        let mut settings = stub_settings(dir, 10)?;
        settings.window.start = 1;
        settings.window.end = 3;
        settings.seed = Some(42);
        run_negatives(&settings, ObserveConfig::default(), &CancelToken::new(), |_| {})?;
    }

    for serial in 1..=3 {
        let name = format!("non_vehicle_image_{}.jpg", serial);
        let first = std::fs::read(first_dir.path().join(&name))?;
        let second = std::fs::read(second_dir.path().join(&name))?;
        assert_eq!(first, second, "{} differs between seeded runs", name);
    }
    Ok(())
}

#[test]
fn annotated_dumps_show_samples_and_stop_at_the_limit() -> Result<()> {
    let out_dir = TempDir::new()?;
    let annotate_dir = TempDir::new()?;
    let mut settings = stub_settings(&out_dir, 10)?;
    settings.window.start = 1;
    settings.window.end = 100;
    let observe = ObserveConfig {
        annotate_dir: Some(annotate_dir.path().to_path_buf()),
        stages_dir: None,
        limit: 4,
    };

    let summary = run_negatives(&settings, observe, &CancelToken::new(), |_| {})?;

    assert_eq!(summary.patches, 10);
    assert_eq!(std::fs::read_dir(annotate_dir.path())?.count(), 4);
    assert!(annotate_dir.path().join("frame_000000.png").is_file());
    assert!(annotate_dir.path().join("frame_000003.png").is_file());
    assert!(!annotate_dir.path().join("frame_000004.png").exists());
    Ok(())
}

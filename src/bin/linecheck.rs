//! linecheck - validate a counting line against a video before a long run
//!
//! Opens the source, reports the resolution, and checks the line the same
//! way harvest will. Exits nonzero when the line does not fit, so this can
//! gate a scripted run. Optionally writes the first frame with the line
//! drawn, for eyeballing the placement.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use roadcap::annotate::draw_crossing_line;
use roadcap::config::HarvestSettings;
use roadcap::{CrossingLine, VideoSource};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video input: a local file path or a stub:// synthetic scene.
    #[arg(long, env = "ROADCAP_VIDEO")]
    video: Option<String>,
    /// Optional JSON settings file.
    #[arg(long, env = "ROADCAP_CONFIG")]
    config: Option<PathBuf>,
    /// Counting line to check; defaults to the settings file's line.
    #[arg(long, value_name = "X1,Y1,X2,Y2")]
    line: Option<CrossingLine>,
    /// Write the first frame with the line drawn to this PNG.
    #[arg(long)]
    preview: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let ui = ui::Ui::from_flag(Some(&args.ui), is_tty);

    let mut settings = HarvestSettings::load(args.config.as_deref())?;
    if let Some(video) = args.video {
        settings.video.path = video;
    }
    if let Some(line) = args.line {
        settings.line = line;
    }

    let mut source = {
        let _stage = ui.stage("Open source");
        let mut source = VideoSource::open(settings.video.clone())?;
        source.connect()?;
        source
    };

    let (width, height) = source.dimensions();
    println!("source: {} ({}x{})", settings.video.path, width, height);
    if let Some(total) = source.frame_count_hint() {
        println!("frames: {}", total);
    }

    settings.line.validate_within(width, height)?;
    let (x1, y1) = settings.line.start();
    let (x2, y2) = settings.line.end();
    println!("line ({}, {}) -> ({}, {}) fits the frame", x1, y1, x2, y2);

    if let Some(path) = &args.preview {
        let _stage = ui.stage("Write preview frame");
        let Some(frame) = source.next_frame()? else {
            return Err(anyhow!("source produced no frames"));
        };
        let mut preview = frame.image;
        draw_crossing_line(&mut preview, settings.line);
        preview
            .save(path)
            .with_context(|| format!("failed to write preview {}", path.display()))?;
        println!("preview: {}", path.display());
    }
    Ok(())
}

//! negatives - save one random background crop per frame for a non-vehicle
//! dataset

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use roadcap::annotate::ObserveConfig;
use roadcap::config::NegativesSettings;
use roadcap::{run_negatives, CancelToken};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video input: a local file path or a stub:// synthetic scene.
    #[arg(long, env = "ROADCAP_VIDEO")]
    video: Option<String>,
    /// Directory background crops are written to.
    #[arg(long, env = "ROADCAP_OUT_DIR")]
    out_dir: Option<PathBuf>,
    /// Optional JSON settings file.
    #[arg(long, env = "ROADCAP_CONFIG")]
    config: Option<PathBuf>,
    /// First serial to write.
    #[arg(long)]
    serial_start: Option<u64>,
    /// Last serial to write, inclusive.
    #[arg(long)]
    serial_end: Option<u64>,
    /// RNG seed for reproducible sampling.
    #[arg(long)]
    seed: Option<u64>,
    /// Write frames with the sampled rectangle drawn to this directory.
    #[arg(long)]
    annotate_dir: Option<PathBuf>,
    /// Stop observation dumps after this many frames.
    #[arg(long, default_value_t = 200)]
    observe_limit: u64,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let ui = ui::Ui::from_flag(Some(&args.ui), is_tty);

    let settings = {
        let _stage = ui.stage("Load settings");
        let mut settings = NegativesSettings::load(args.config.as_deref())?;
        if let Some(video) = args.video {
            settings.video.path = video;
        }
        if let Some(out_dir) = args.out_dir {
            settings.out_dir = out_dir;
        }
        if let Some(start) = args.serial_start {
            settings.window.start = start;
        }
        if let Some(end) = args.serial_end {
            settings.window.end = end;
        }
        if let Some(seed) = args.seed {
            settings.seed = Some(seed);
        }
        settings.validate()?;
        settings
    };

    let observe = ObserveConfig {
        annotate_dir: args.annotate_dir,
        stages_dir: None,
        limit: args.observe_limit,
    };

    let cancel = CancelToken::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || handler.cancel())?;

    // One patch per frame, so the serial window bounds the bar.
    let bar = ui.frame_bar(Some(settings.window.count()));
    let summary = run_negatives(&settings, observe, &cancel, |frames| bar.advance(frames));
    bar.finish();
    let summary = summary?;

    println!("negatives summary:");
    println!("  stop reason: {}", summary.stop);
    println!("  frames read: {}", summary.frames);
    println!("  patches written: {}", summary.patches);
    println!("  output dir: {}", settings.out_dir.display());
    Ok(())
}

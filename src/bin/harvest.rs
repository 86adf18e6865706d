//! harvest - save cropped vehicle images for blobs crossing a counting line

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use roadcap::annotate::ObserveConfig;
use roadcap::config::HarvestSettings;
use roadcap::{run_harvest, CancelToken, CrossingLine};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video input: a local file path or a stub:// synthetic scene.
    #[arg(long, env = "ROADCAP_VIDEO")]
    video: Option<String>,
    /// Directory vehicle crops are written to.
    #[arg(long, env = "ROADCAP_OUT_DIR")]
    out_dir: Option<PathBuf>,
    /// Optional JSON settings file.
    #[arg(long, env = "ROADCAP_CONFIG")]
    config: Option<PathBuf>,
    /// Difference threshold, 1-255. Required here or in the settings file.
    #[arg(long)]
    threshold: Option<u8>,
    /// Dilation passes applied to the motion mask.
    #[arg(long)]
    dilation: Option<u8>,
    /// Odd Gaussian blur kernel size in pixels.
    #[arg(long)]
    blur_kernel: Option<u32>,
    /// Contour area below which blobs are ignored.
    #[arg(long)]
    area_floor: Option<f64>,
    /// Counting line, axis aligned.
    #[arg(long, value_name = "X1,Y1,X2,Y2")]
    line: Option<CrossingLine>,
    /// Write annotated frames (line and highlights) to this directory.
    #[arg(long)]
    annotate_dir: Option<PathBuf>,
    /// Write detector stage images to this directory.
    #[arg(long)]
    stages_dir: Option<PathBuf>,
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
        let mut settings = HarvestSettings::load(args.config.as_deref())?;
        if let Some(video) = args.video {
            settings.video.path = video;
        }
        if let Some(out_dir) = args.out_dir {
            settings.out_dir = out_dir;
        }
        if let Some(threshold) = args.threshold {
            settings.threshold = Some(threshold);
        }
        if let Some(dilation) = args.dilation {
            settings.dilation = dilation;
        }
        if let Some(kernel) = args.blur_kernel {
            settings.blur_kernel = kernel;
        }
        if let Some(floor) = args.area_floor {
            settings.area_floor = floor;
        }
        if let Some(line) = args.line {
            settings.line = line;
        }
        settings.validate()?;
        settings
    };

    let observe = ObserveConfig {
        annotate_dir: args.annotate_dir,
        stages_dir: args.stages_dir,
        limit: args.observe_limit,
    };

    let cancel = CancelToken::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || handler.cancel())?;

    let summary = {
        let _stage = ui.stage("Harvest vehicle images");
        run_harvest(&settings, observe, &cancel)?
    };

    println!("harvest summary:");
    println!("  stop reason: {}", summary.stop);
    println!("  frames read: {}", summary.frames);
    println!("  patches written: {}", summary.patches);
    println!("  output dir: {}", settings.out_dir.display());
    Ok(())
}

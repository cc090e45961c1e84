mod camera;
mod contours;
mod display;

use anyhow::{Context, Result};
use camera::OpenCvCamera;
use clap::Parser;
use contours::OpenCvContours;
use display::{DisplayMode, HighGuiSink};
use shape_seeker::{read_batch_file, run_batch, InteractiveController, SeekerConfig};
use std::io::BufReader;
use std::path::PathBuf;

const BATCH_WINDOW: &str = "Detected Shapes";

/// Finds colored shapes in a live camera feed.
///
/// Without a batch file, type `<shape> <color>` (for example `Cirkel Groen`),
/// `stop` or `exit` on stdin while the camera runs. With a batch file, every line
/// is searched once on a fresh frame.
#[derive(Parser, Debug)]
#[command(name = "seeker_cam", version)]
struct Args {
    /// Batch file with one `<shape> <color>` per line.
    batch_file: Option<PathBuf>,

    /// TOML configuration file (defaults to $SEEKER_CONFIG, then built-in values).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera index, overriding the configuration.
    #[arg(long)]
    device: Option<i32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // --- 1. Configuration ---
    let mut config = SeekerConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(device) = args.device {
        config.capture.device = device;
    }

    // --- 2. Collaborators ---
    let camera = OpenCvCamera::open(config.capture.device)
        .with_context(|| format!("opening camera {}", config.capture.device))?;
    let contours = OpenCvContours::new(config.preprocess.clone());

    match args.batch_file {
        Some(path) => run_batch_mode(&config, &path, camera, contours),
        None => run_interactive(&config, camera, contours),
    }
}

fn run_interactive(config: &SeekerConfig, camera: OpenCvCamera, contours: OpenCvContours) -> Result<()> {
    let sink = HighGuiSink::new(
        config.capture.window_title.clone(),
        config.capture.display_scale,
        DisplayMode::Interactive {
            key_poll: config.capture.key_poll,
        },
    );

    println!("Enter 'shape color' (e.g., 'Cirkel Groen'), 'stop' to stop detection, or 'exit' to quit:");

    let controller = InteractiveController::new(camera, contours, sink);
    let summary = controller
        .run(BufReader::new(std::io::stdin()))
        .context("starting the command reader")?;

    log::info!(
        "processed {} frames, searched {}",
        summary.frames,
        summary.searched_frames
    );
    Ok(())
}

fn run_batch_mode(
    config: &SeekerConfig,
    path: &std::path::Path,
    mut camera: OpenCvCamera,
    mut contours: OpenCvContours,
) -> Result<()> {
    let entries = read_batch_file(path)
        .with_context(|| format!("reading batch file {}", path.display()))?;

    let mut sink = HighGuiSink::new(
        BATCH_WINDOW,
        config.batch.display_scale,
        DisplayMode::Batch {
            hold: config.batch.display,
        },
    );

    let summary = run_batch(&entries, &mut camera, &mut contours, &mut sink, &config.batch)
        .context("batch run aborted")?;

    log::info!(
        "batch finished: {} entries, {} searched, {} found",
        summary.processed,
        summary.searched,
        summary.found
    );
    Ok(())
}

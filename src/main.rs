use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};

use clipstitch::{config::Config, pipeline::BatchDriver, video::VideoEncoder};

#[derive(Parser)]
#[command(
    name = "clipstitch",
    version,
    about = "Stitch timestamped experiment recordings into continuous videos",
    long_about = "Clipstitch concatenates the clips of each experiment into a single video, \
                  inserting black filler frames for the wall-clock gaps between recordings \
                  and burning the reconstructed timestamp into every frame."
)]
struct Cli {
    /// Directory containing one subdirectory of raw clips per experiment
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for the stitched output videos
    #[arg(short, long)]
    output: PathBuf,

    /// Only process experiments whose directory name starts with this prefix
    #[arg(short, long)]
    filter: Option<String>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output frame rate in Hz (overrides config)
    #[arg(long)]
    fps: Option<f64>,

    /// Keep existing outputs and intermediates instead of overwriting them
    #[arg(long)]
    keep_existing: bool,

    /// Keep per-clip intermediates after concatenation
    #[arg(long)]
    keep_intermediates: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting clipstitch v{}", env!("CARGO_PKG_VERSION"));
    info!("Input: {:?}", cli.input);
    info!("Output: {:?}", cli.output);
    if let Some(filter) = &cli.filter {
        info!("Filter: {filter}*");
    }

    // Load configuration
    let mut config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    if let Some(fps) = cli.fps {
        config.video.frame_rate = fps;
    }
    if cli.keep_existing {
        config.video.overwrite = false;
    }
    if cli.keep_intermediates {
        config.conversion.cleanup_intermediates = false;
    }
    config.validate()?;

    if !VideoEncoder::check_ffmpeg_available() {
        anyhow::bail!("FFmpeg not found. Please install ffmpeg and ffprobe.");
    }

    let driver = BatchDriver::new(config);
    let summary = driver.run(&cli.input, &cli.output, cli.filter.as_deref())?;

    for (name, status) in &summary.statuses {
        info!("{name}: {status}");
    }

    let failed = summary.failed_count();
    if failed > 0 {
        anyhow::bail!("{failed} experiment(s) failed");
    }

    info!("All experiments complete");
    Ok(())
}

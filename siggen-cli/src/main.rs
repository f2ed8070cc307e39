//! SigGen CLI: stream a synthetic waveform, log it, optionally play it.

mod audio;
mod stats;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use siggen_core::prelude::Shape;
use siggen_engine::{ConfigUpdate, Engine, Outputs, Result, Runner, SigGenError};
use tracing_subscriber::EnvFilter;

use crate::stats::StatsSink;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(&args),
        Commands::Shapes => {
            for s in Shape::ALL {
                println!("{:<9} {}", s.name(), if s.is_periodic() { "periodic" } else { "" });
            }
            Ok(())
        }
        Commands::Devices => audio::list_output_devices(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Streaming synthetic waveform generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a stream until Ctrl+C (or `--duration`).
    Run(RunArgs),
    /// List the supported waveform shapes.
    Shapes,
    /// List audio output devices usable with `run --play`.
    Devices,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML file with any subset of the configuration fields.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    shape: Option<Shape>,
    /// Hz.
    #[arg(long)]
    frequency: Option<f64>,
    /// Samples per second.
    #[arg(long)]
    sample_rate: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    magnitude: Option<f64>,
    /// Samples per buffer.
    #[arg(long)]
    xfer_len: Option<usize>,
    #[arg(long)]
    stream_id: Option<String>,
    /// Pace output to real time.
    #[arg(long)]
    throttle: Option<bool>,
    /// Stop after this many seconds.
    #[arg(short, long)]
    duration: Option<f64>,
    /// Also play the stream on an audio device.
    #[arg(long)]
    play: bool,
    /// Output device name (see `siggen devices`).
    #[arg(long, requires = "play")]
    device: Option<String>,
    /// Playback level for a full-magnitude sample.
    #[arg(long, default_value_t = 0.35)]
    gain: f32,
    /// Log a summary line every N buffers.
    #[arg(long, default_value_t = 10)]
    report_every: u64,
}

impl RunArgs {
    fn overrides(&self) -> ConfigUpdate {
        ConfigUpdate {
            shape: self.shape,
            frequency: self.frequency,
            sample_rate: self.sample_rate,
            magnitude: self.magnitude,
            xfer_len: self.xfer_len,
            stream_id: self.stream_id.clone(),
            throttle: self.throttle,
            ..ConfigUpdate::default()
        }
    }
}

fn load_config(path: &Path) -> Result<ConfigUpdate> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SigGenError::msg(format!("reading {}: {e}", path.display())))?;
    toml::from_str(&text).map_err(|e| SigGenError::msg(format!("parsing {}: {e}", path.display())))
}

fn run(args: &RunArgs) -> Result<()> {
    let base = match &args.config {
        Some(path) => load_config(path)?,
        None => ConfigUpdate::new(),
    };
    let update = base.overlay(args.overrides());
    let engine = Engine::with_config(&update)?;
    let Some(cfg) = engine.config().cloned() else {
        return Err(SigGenError::fatal("engine has no configuration after configure"));
    };
    tracing::info!(
        shape = %cfg.shape,
        frequency = cfg.frequency,
        sample_rate = cfg.sample_rate,
        magnitude = cfg.magnitude,
        xfer_len = cfg.xfer_len,
        stream_id = cfg.stream_id(),
        throttle = cfg.throttle,
        "starting siggen"
    );
    if !cfg.throttle && args.duration.is_none() && !args.play {
        tracing::warn!("throttle is off: buffers are produced as fast as the sinks accept them");
    }

    let mut outputs = Outputs::new()
        .with_float(StatsSink::new("float", args.report_every))
        .with_fixed(StatsSink::new("fixed", args.report_every));
    let playback = if args.play {
        let (pb, sink) = audio::Playback::open(args.device.as_deref(), &cfg, args.gain)?;
        outputs.add_float(sink);
        Some(pb)
    } else {
        None
    };

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        tracing::info!("Ctrl+C received, stopping");
        let _ = stop_tx.try_send(());
    })
    .map_err(|e| SigGenError::msg(format!("installing Ctrl+C handler: {e}")))?;

    let handle = Runner::spawn(engine, outputs)?;
    let deadline = args
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| Instant::now() + Duration::from_secs_f64(d));

    // wake periodically so a halted runner is noticed
    while !handle.is_finished() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        if stop_rx.recv_timeout(Duration::from_millis(200)).is_ok() {
            break;
        }
    }

    let report = handle.stop()?;
    if let Some(pb) = playback {
        pb.close();
    }
    tracing::info!(
        buffers = report.buffers,
        samples = report.samples,
        reanchors = report.reanchors,
        "stream finished"
    );
    match report.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

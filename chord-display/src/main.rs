//! # Chord Display
//!
//! Realtime guitar chord recognition for small Linux screens: microphone
//! input -> chord recognition -> large terminal output.
//!
//! ## Architecture
//! - **Main thread**: owns the capture stream, renders accepted chords.
//! - **Recognition thread**: runs the streaming pipeline from `chord-core`.
//! - **Stdin thread**: watches for the quit command.
//! - **Communication**: crossbeam channels; capture never blocks on a
//!   slow consumer, the bounded raw-audio channel drops instead.

mod display;

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chord_core::audio::{self, Backend};
use chord_core::{ChordRecognizer, RecognizerConfig, pipeline};
use clap::{Parser, ValueEnum};
use crossbeam_channel::select;

/// Chunks of raw audio buffered between capture and recognition. At the
/// default settings this is several seconds of headroom before drops.
const RAW_CHANNEL_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "chord-display", about = "Realtime guitar chord recognition with a large terminal display")]
struct Cli {
    /// Settings file (JSON); flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capture backend
    #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
    backend: BackendArg,

    /// Capture sample rate in Hz
    #[arg(long)]
    rate: Option<u32>,

    /// FFT window size in samples
    #[arg(long)]
    window: Option<usize>,

    /// Window overlap fraction (0.0-1.0 exclusive)
    #[arg(long)]
    overlap: Option<f32>,

    /// Chroma smoothing factor (0.0-1.0 exclusive)
    #[arg(long)]
    smoothing: Option<f32>,

    /// Minimum match confidence before a chord can change
    #[arg(long)]
    confidence: Option<f32>,

    /// RMS level below which input counts as silence
    #[arg(long)]
    silence: Option<f32>,

    /// Consecutive windows a new chord must win before it is shown
    #[arg(long)]
    hold: Option<u32>,

    /// Low frequency cutoff in Hz (filters sub-bass hum)
    #[arg(long)]
    min_frequency: Option<f32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Cpal,
    Arecord,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Cpal => Backend::Cpal,
            BackendArg::Arecord => Backend::Arecord,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut config = build_config(&cli)?;

    let (raw_tx, raw_rx) = crossbeam_channel::bounded::<Vec<f32>>(RAW_CHANNEL_CAPACITY);
    let mut source = audio::open_capture(cli.backend.into(), config.sample_rate, raw_tx)
        .context("starting audio capture")?;

    // The device may run at a different rate than requested; all of the
    // frequency math has to follow the stream, not the wish.
    if source.sample_rate() != config.sample_rate {
        log::info!(
            "recognizing at the device rate of {} Hz instead of {} Hz",
            source.sample_rate(),
            config.sample_rate
        );
        config.sample_rate = source.sample_rate();
    }

    let recognizer = ChordRecognizer::new(&config).context("invalid configuration")?;

    let (update_tx, update_rx) = crossbeam_channel::unbounded();
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let worker = std::thread::spawn(move || {
        pipeline::run_recognition_loop(recognizer, raw_rx, update_tx, shutdown_rx);
    });

    let (quit_tx, quit_rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || watch_stdin(quit_tx));

    display::render_waiting(source.name(), source.sample_rate());

    loop {
        select! {
            recv(update_rx) -> msg => match msg {
                Ok(update) => display::render(&update),
                Err(_) => {
                    log::warn!("recognition stopped unexpectedly");
                    break;
                }
            },
            recv(quit_rx) -> _ => break,
        }
    }

    log::info!("shutting down");
    let _ = shutdown_tx.send(());
    source.stop();
    if worker.join().is_err() {
        log::warn!("recognition thread panicked during shutdown");
    }
    Ok(())
}

/// Loads the optional settings file and applies CLI overrides on top.
fn build_config(cli: &Cli) -> Result<RecognizerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing settings file {}", path.display()))?
        }
        None => RecognizerConfig::default(),
    };

    if let Some(rate) = cli.rate {
        config.sample_rate = rate;
    }
    if let Some(window) = cli.window {
        config.window_size = window;
    }
    if let Some(overlap) = cli.overlap {
        config.overlap = overlap;
    }
    if let Some(smoothing) = cli.smoothing {
        config.smoothing = smoothing;
    }
    if let Some(confidence) = cli.confidence {
        config.min_confidence = confidence;
    }
    if let Some(silence) = cli.silence {
        config.silence_rms = silence;
    }
    if let Some(hold) = cli.hold {
        config.hold_windows = hold;
    }
    if let Some(min_frequency) = cli.min_frequency {
        config.min_frequency = min_frequency;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Blocks on stdin until the user quits (`q` + Enter) or input closes.
fn watch_stdin(quit_tx: crossbeam_channel::Sender<()>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(text) if text.trim().eq_ignore_ascii_case("q") => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }
    let _ = quit_tx.send(());
}

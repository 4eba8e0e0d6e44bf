//! # Tuner - Terminal Front End
//!
//! Runs the headless tuning pipeline against the default input device or a
//! WAV file and prints one line per detection.
//!
//! ## Architecture
//! - **Main Thread**: owns the capture stream and controls shutdown, on
//!   Ctrl-C or after `--seconds`
//! - **Capture Callback**: pushes sample chunks into a bounded crossbeam queue
//! - **Analysis Thread**: ticks the pipeline and prints reports

mod report;
mod wav;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::info;
use tuner_core::tuning::{CONCERT_A4, PIANO_KEYS};
use tuner_core::{
    Detection, DistanceMetric, ReferenceTable, SampleChunk, TunerConfig, TunerPipeline, audio,
    runner,
};

/// Headless instrument tuner: HPS pitch detection with note locking
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    tuning: TuningArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tune from the default input device (the default command)
    Live {
        /// Stop after this many seconds instead of running until Ctrl-C
        #[arg(long)]
        seconds: Option<f64>,
    },
    /// Tune a WAV file, simulating the live tick schedule
    File {
        /// Path to the WAV file
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct TuningArgs {
    /// Capture sample rate in Hz (live mode only; files use their own rate)
    #[arg(long, global = true, default_value_t = tuner_core::config::DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Number of harmonics in the Harmonic Product Spectrum
    #[arg(long, global = true, default_value_t = tuner_core::config::DEFAULT_HARMONICS)]
    harmonics: usize,

    /// Lowest accepted frequency in Hz, also the rumble cutoff
    #[arg(long, global = true, default_value_t = tuner_core::config::DEFAULT_LOW_THRESHOLD)]
    low: f32,

    /// Highest accepted frequency in Hz
    #[arg(long, global = true, default_value_t = tuner_core::config::DEFAULT_HIGH_THRESHOLD)]
    high: f32,

    /// Analysis tick interval in milliseconds
    #[arg(long, global = true, default_value_t = 50)]
    tick_ms: u64,

    /// Match against all 88 equal-tempered piano notes instead of guitar strings
    #[arg(long, global = true)]
    chromatic: bool,

    /// Distance used when deciding whether to leave a locked note
    #[arg(long, global = true, value_enum, default_value_t = MetricArg::Cents)]
    metric: MetricArg,

    /// Print one JSON object per report
    #[arg(long, global = true)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    Hz,
    Cents,
}

impl From<MetricArg> for DistanceMetric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::Hz => DistanceMetric::Hertz,
            MetricArg::Cents => DistanceMetric::Cents,
        }
    }
}

impl TuningArgs {
    fn config(&self, sample_rate: u32) -> TunerConfig {
        TunerConfig {
            harmonics: self.harmonics,
            low_threshold: self.low,
            high_threshold: self.high,
            rumble_cutoff: Some(self.low),
            tick_interval: Duration::from_millis(self.tick_ms),
            metric: self.metric.into(),
            ..TunerConfig::with_sample_rate(sample_rate)
        }
    }

    fn table(&self) -> Result<ReferenceTable> {
        if self.chromatic {
            Ok(ReferenceTable::equal_temperament(CONCERT_A4, 0..=PIANO_KEYS - 1)?)
        } else {
            Ok(ReferenceTable::standard_guitar())
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Some(Command::File { ref path }) => run_file(&args.tuning, path),
        Some(Command::Live { seconds }) => run_live(&args.tuning, seconds),
        None => run_live(&args.tuning, None),
    }
}

/// Captures from the default device and prints reports until Ctrl-C or until
/// `seconds` pass.
fn run_live(args: &TuningArgs, seconds: Option<f64>) -> Result<()> {
    let config = args.config(args.sample_rate);
    let mut pipeline = TunerPipeline::new(config.clone(), args.table()?)?;

    let (chunk_tx, chunk_rx) = crossbeam_channel::bounded::<SampleChunk>(config.queue_capacity);
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;

    let capture = audio::start_audio_capture(chunk_tx, &config)?;
    info!(
        "capturing at {} Hz from {} channel(s), matching {} references",
        capture.sample_rate(),
        capture.channels(),
        pipeline.table().len()
    );

    let json = args.json;
    let worker = thread::spawn(move || {
        runner::run(&mut pipeline, &chunk_rx, &shutdown_rx, |r| report::print(r, json, None))
    });

    info!("press Ctrl-C to quit");
    let limit = seconds.map(|s| Duration::from_secs_f64(s.max(0.0)));
    if wait_for_stop(&interrupt_rx, limit) {
        info!("interrupted, shutting down");
    }

    // Capture stops before the analysis side so nothing writes into a
    // pipeline whose owner has exited.
    capture.stop();
    let _ = shutdown_tx.send(());
    let ticks = worker
        .join()
        .map_err(|_| anyhow!("analysis thread panicked"))?;
    info!("ran {} analysis ticks", ticks);
    Ok(())
}

/// Blocks until an interrupt arrives or `limit` elapses.
///
/// Returns `true` when stopped by an interrupt.
fn wait_for_stop(interrupts: &Receiver<()>, limit: Option<Duration>) -> bool {
    match limit {
        Some(limit) => match interrupts.recv_timeout(limit) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(limit);
                false
            }
        },
        None => interrupts.recv().is_ok(),
    }
}

/// Streams a WAV file through the pipeline in capture-sized blocks, analysing
/// once per tick interval of audio.
fn run_file(args: &TuningArgs, path: &std::path::Path) -> Result<()> {
    let (samples, sample_rate) = wav::read_mono(path)?;
    info!(
        "{}: {} samples at {} Hz ({:.2}s)",
        path.display(),
        samples.len(),
        sample_rate,
        samples.len() as f32 / sample_rate as f32
    );

    let config = args.config(sample_rate);
    let mut pipeline = TunerPipeline::new(config.clone(), args.table()?)?;

    let block = config.block_size as usize;
    let samples_per_tick =
        ((sample_rate as u128 * config.tick_interval.as_millis()) / 1000).max(1) as usize;

    let mut fed = 0usize;
    let mut next_tick = samples_per_tick;
    let mut detections = 0usize;
    for chunk in samples.chunks(block) {
        pipeline.ingest(&SampleChunk::new(chunk.to_vec()));
        fed += chunk.len();

        if fed < next_tick {
            continue;
        }
        while next_tick <= fed {
            next_tick += samples_per_tick;
        }
        if let Detection::Detected(r) = pipeline.analyze() {
            detections += 1;
            report::print(&r, args.json, Some(fed as f32 / sample_rate as f32));
        }
    }

    info!("{} detections", detections);
    Ok(())
}

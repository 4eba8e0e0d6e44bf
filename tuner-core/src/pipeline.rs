//! # Tuning Pipeline
//!
//! The analysis side of the tuner as one owned object. A [`TunerPipeline`]
//! holds the rolling window, the planned spectral estimator and the note
//! matcher, and runs them in order once per tick:
//!
//! ingest → HPS spectrum → peak refinement → range gate → note match → cents
//!
//! Nothing here blocks. A tick with no new chunks re-analyses the previous
//! window.

use crossbeam_channel::Receiver;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::config::TunerConfig;
use crate::error::Result;
use crate::fft::{SpectralEstimator, Spectrum};
use crate::ingest::{AnalysisBuffer, SampleChunk};
use crate::matcher::{NoteMatcher, TunerState};
use crate::pitch;
use crate::tuning::{self, ReferenceTable};

/// What the presentation layer receives for a tick with a detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    /// Detected fundamental in Hz.
    pub frequency: f32,
    /// Frequency of the locked reference note in Hz.
    pub reference_freq: f32,
    /// Label of the locked reference note.
    pub note: String,
    /// Deviation from the reference, clamped to ±50 cents.
    pub cents: f32,
    /// Meter position, 0 to 100 with 50 in tune.
    pub meter: f32,
}

/// Result of one analysis tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Detected(TuningReport),
    /// The estimate fell outside the detection range. `frequency` is the raw
    /// estimate, kept for diagnostics only.
    NoDetection { frequency: f32 },
}

impl Detection {
    pub fn report(&self) -> Option<&TuningReport> {
        match self {
            Detection::Detected(report) => Some(report),
            Detection::NoDetection { .. } => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, Detection::Detected(_))
    }
}

/// Owns every piece of mutable analysis state.
#[derive(Debug)]
pub struct TunerPipeline {
    config: TunerConfig,
    buffer: AnalysisBuffer,
    estimator: SpectralEstimator,
    matcher: NoteMatcher,
}

impl TunerPipeline {
    /// Validates `config` and plans the FFT for its window length.
    ///
    /// # Arguments
    /// * `config` - Sample rate, window, HPS order and detection range
    /// * `table` - Reference notes; the lock starts on its lowest entry
    ///
    /// # Returns
    /// The pipeline with a zero-filled window, or
    /// [`TunerError::InvalidConfig`](crate::TunerError::InvalidConfig) if
    /// `config` fails validation.
    pub fn new(config: TunerConfig, table: ReferenceTable) -> Result<Self> {
        config.validate()?;
        debug!(
            "pipeline: {} Hz, window {} ({:.3} Hz bins), H={}, range ({}, {}) Hz, {} refs",
            config.sample_rate,
            config.window_len,
            config.bin_spacing(),
            config.harmonics,
            config.low_threshold,
            config.high_threshold,
            table.len()
        );

        Ok(Self {
            buffer: AnalysisBuffer::new(config.window_len),
            estimator: SpectralEstimator::new(&config),
            matcher: NoteMatcher::new(table, config.metric),
            config,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn state(&self) -> &TunerState {
        self.matcher.state()
    }

    pub fn buffer(&self) -> &AnalysisBuffer {
        &self.buffer
    }

    pub fn table(&self) -> &ReferenceTable {
        self.matcher.table()
    }

    /// Adds one chunk to the rolling window.
    pub fn ingest(&mut self, chunk: &SampleChunk) {
        self.buffer.push_chunk(chunk);
    }

    /// Drains every chunk currently queued, without blocking.
    pub fn drain(&mut self, chunks: &Receiver<SampleChunk>) -> Result<usize> {
        self.buffer.drain(chunks)
    }

    /// HPS spectrum of the current window.
    pub fn spectrum(&mut self) -> Spectrum {
        self.estimator.estimate(self.buffer.as_slice())
    }

    /// Analyses the current window and updates the note lock.
    ///
    /// Runs the HPS, refines its peak and gates the estimate on the
    /// detection range. Only an in-range estimate moves the lock.
    ///
    /// # Returns
    /// [`Detection::Detected`] with note, cents and meter, or
    /// [`Detection::NoDetection`] carrying the raw out-of-range estimate.
    pub fn analyze(&mut self) -> Detection {
        let spectrum = self.spectrum();
        let frequency = pitch::refine(&spectrum);

        if !self.config.in_detection_range(frequency) {
            trace!("no detection, estimate {:.2} Hz", frequency);
            return Detection::NoDetection { frequency };
        }

        let matched = self.matcher.match_frequency(frequency);
        let report = TuningReport {
            frequency,
            reference_freq: matched.reference_freq,
            cents: tuning::cents(frequency, matched.reference_freq),
            meter: tuning::meter_position(
                frequency,
                matched.reference_freq,
                matched.neighbour_freq,
            ),
            note: matched.note,
        };
        debug!(
            "{:.2} Hz -> {} ({:.2} Hz) {:+.1} cents",
            report.frequency, report.note, report.reference_freq, report.cents
        );
        Detection::Detected(report)
    }

    /// One analysis tick: drain the queue, then analyse.
    ///
    /// If the queue has disconnected, leftover chunks are ingested and the
    /// error is returned without analysing.
    pub fn tick(&mut self, chunks: &Receiver<SampleChunk>) -> Result<Detection> {
        let consumed = self.drain(chunks)?;
        trace!("tick drained {} chunks", consumed);
        Ok(self.analyze())
    }

    /// Fundamental of a standalone recording, ignoring the note lock.
    ///
    /// Replaces the window with the last `window_len` samples of `recording`
    /// (zero-padded at the head when shorter) and returns the refined HPS
    /// peak, without range gating.
    pub fn detect_once(&mut self, recording: &[f32]) -> f32 {
        self.buffer.clear();
        self.buffer.ingest(recording);
        let spectrum = self.spectrum();
        pitch::refine(&spectrum)
    }
}

//! # Configuration Module
//!
//! Startup constants for the tuning pipeline. There are no configuration
//! files and nothing is reloaded at runtime: a [`TunerConfig`] is built once
//! (usually from `TunerConfig::default()` plus command-line overrides),
//! validated, and handed to [`crate::pipeline::TunerPipeline::new`].

use std::time::Duration;

use crate::error::{Result, TunerError};
use crate::matcher::DistanceMetric;

/// Default capture sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Number of harmonics folded into the Harmonic Product Spectrum.
pub const DEFAULT_HARMONICS: usize = 5;

/// Lower edge of the accepted detection range, also used as rumble cutoff.
pub const DEFAULT_LOW_THRESHOLD: f32 = 62.0;

/// Upper edge of the accepted detection range.
pub const DEFAULT_HIGH_THRESHOLD: f32 = 450.0;

/// Capture block size in frames (~46 ms at 44.1 kHz).
pub const DEFAULT_BLOCK_SIZE: u32 = 2048;

/// Analysis tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Pipeline configuration, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerConfig {
    /// Sample rate of the incoming chunks in Hz.
    pub sample_rate: u32,
    /// Length of the rolling analysis window in samples.
    pub window_len: usize,
    /// Highest harmonic order `H` used by the HPS (1 disables it).
    pub harmonics: usize,
    /// Frequencies at or below this are "no detection".
    pub low_threshold: f32,
    /// Frequencies at or above this are "no detection".
    pub high_threshold: f32,
    /// Raw magnitudes below this frequency are zeroed before the HPS.
    /// `None` keeps the full spectrum.
    pub rumble_cutoff: Option<f32>,
    /// How often the analysis tick runs.
    pub tick_interval: Duration,
    /// Capture block size requested from the device.
    pub block_size: u32,
    /// Capacity of the capture → analysis chunk queue.
    pub queue_capacity: usize,
    /// Distance used by the hysteresis comparison.
    pub metric: DistanceMetric,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            // One second of audio: 1 Hz bins.
            window_len: DEFAULT_SAMPLE_RATE as usize,
            harmonics: DEFAULT_HARMONICS,
            low_threshold: DEFAULT_LOW_THRESHOLD,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            rumble_cutoff: Some(DEFAULT_LOW_THRESHOLD),
            tick_interval: DEFAULT_TICK_INTERVAL,
            block_size: DEFAULT_BLOCK_SIZE,
            queue_capacity: 64,
            metric: DistanceMetric::Cents,
        }
    }
}

impl TunerConfig {
    /// Builds a config for `sample_rate` with a one-second window.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            window_len: sample_rate as usize,
            ..Self::default()
        }
    }

    /// Width of one spectrum bin in Hz.
    pub fn bin_spacing(&self) -> f32 {
        self.sample_rate as f32 / self.window_len as f32
    }

    /// Nyquist frequency in Hz.
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Whether `frequency` lies strictly inside the detection range.
    pub fn in_detection_range(&self, frequency: f32) -> bool {
        frequency > self.low_threshold && frequency < self.high_threshold
    }

    /// Checks every field, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(TunerError::InvalidConfig("sample rate must be positive".into()));
        }
        if self.window_len < 4 {
            return Err(TunerError::InvalidConfig(format!(
                "window length {} is too short, need at least 4 samples",
                self.window_len
            )));
        }
        if self.harmonics == 0 {
            return Err(TunerError::InvalidConfig("harmonic count must be at least 1".into()));
        }
        if !(self.low_threshold.is_finite() && self.high_threshold.is_finite())
            || self.low_threshold < 0.0
            || self.low_threshold >= self.high_threshold
        {
            return Err(TunerError::InvalidConfig(format!(
                "detection range ({}, {}) must satisfy 0 <= low < high",
                self.low_threshold, self.high_threshold
            )));
        }
        if self.high_threshold >= self.nyquist() {
            return Err(TunerError::InvalidConfig(format!(
                "upper threshold {} Hz must be below Nyquist ({} Hz)",
                self.high_threshold,
                self.nyquist()
            )));
        }
        if let Some(cutoff) = self.rumble_cutoff {
            if !cutoff.is_finite() || cutoff < 0.0 {
                return Err(TunerError::InvalidConfig(format!(
                    "rumble cutoff {cutoff} Hz is not usable"
                )));
            }
        }
        if self.tick_interval.is_zero() {
            return Err(TunerError::InvalidConfig("tick interval must be non-zero".into()));
        }
        if self.queue_capacity == 0 {
            return Err(TunerError::InvalidConfig("chunk queue capacity must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_len, 44_100);
        assert_eq!(config.bin_spacing(), 1.0);
    }

    #[test]
    fn detection_range_is_exclusive() {
        let config = TunerConfig::default();
        assert!(!config.in_detection_range(62.0));
        assert!(config.in_detection_range(62.5));
        assert!(config.in_detection_range(449.9));
        assert!(!config.in_detection_range(450.0));
    }

    #[test]
    fn rejects_inverted_range() {
        let config = TunerConfig {
            low_threshold: 500.0,
            high_threshold: 100.0,
            ..TunerConfig::default()
        };
        assert!(matches!(config.validate(), Err(TunerError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_range_above_nyquist() {
        let config = TunerConfig {
            sample_rate: 800,
            window_len: 800,
            ..TunerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_harmonics_and_tiny_window() {
        let config = TunerConfig { harmonics: 0, ..TunerConfig::default() };
        assert!(config.validate().is_err());

        let config = TunerConfig { window_len: 2, ..TunerConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn with_sample_rate_keeps_one_second_window() {
        let config = TunerConfig::with_sample_rate(48_000);
        assert_eq!(config.window_len, 48_000);
        assert_eq!(config.harmonics, DEFAULT_HARMONICS);
    }
}

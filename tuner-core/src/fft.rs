//! # Spectral Estimation Module
//!
//! Turns the rolling analysis window into a Harmonic Product Spectrum (HPS).
//!
//! ## Steps
//! - Hann windowing to reduce spectral leakage at the window edges
//! - Forward FFT using RustFFT, keeping the `N/2 + 1` non-negative bins
//! - Optional zeroing of the rumble band below a cutoff frequency
//! - HPS: the magnitude spectrum multiplied by its decimated copies, so the
//!   fundamental's bin dominates even when overtones carry more energy
//! - Only the leading bins that every decimated copy reaches are kept; the
//!   tail past them is raw noise floor, not a product
//!
//! The FFT plan, window and scratch space are built once per window length
//! and reused on every tick.

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::config::TunerConfig;

/// Precomputed analysis window coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFunction {
    coefficients: Vec<f32>,
}

impl WindowFunction {
    /// Symmetric Hann window: `0.5 - 0.5 cos(2πn / (N - 1))`.
    pub fn hann(len: usize) -> Self {
        if len < 2 {
            return Self {
                coefficients: vec![1.0; len],
            };
        }
        let n_minus_1 = (len - 1) as f32;
        let coefficients = (0..len)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos()))
            .collect();
        Self { coefficients }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }
}

/// Bin-centre frequencies paired with (HPS-weighted) magnitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub frequencies: Vec<f32>,
    pub magnitudes: Vec<f32>,
}

impl Spectrum {
    /// Builds a spectrum with bin `i` centred on `i * bin_spacing` Hz.
    pub fn from_magnitudes(magnitudes: Vec<f32>, bin_spacing: f32) -> Self {
        let frequencies = (0..magnitudes.len()).map(|i| i as f32 * bin_spacing).collect();
        Self {
            frequencies,
            magnitudes,
        }
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Distance between adjacent bin centres in Hz.
    pub fn bin_spacing(&self) -> f32 {
        match self.frequencies.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }

    /// Frequency of bin 0.
    pub fn base_frequency(&self) -> f32 {
        self.frequencies.first().copied().unwrap_or(0.0)
    }
}

/// Multiplies `magnitudes` by its copies decimated by `2..=harmonics`.
///
/// The decimated copy for harmonic `h` holds every `h`-th bin and is aligned
/// at index 0; bins past its length are left untouched by that harmonic.
pub fn harmonic_product_spectrum(magnitudes: &[f32], harmonics: usize) -> Vec<f32> {
    let mut product = magnitudes.to_vec();
    for h in 2..=harmonics {
        for (bin, decimated) in product.iter_mut().zip(magnitudes.iter().step_by(h)) {
            *bin *= decimated;
        }
    }
    product
}

/// Number of leading bins of a `len`-bin spectrum that every decimated copy
/// up to `harmonics` multiplies.
pub fn reinforced_len(len: usize, harmonics: usize) -> usize {
    len.div_ceil(harmonics.max(1))
}

/// Windowed FFT + HPS, sized for one analysis window length.
pub struct SpectralEstimator {
    fft: Arc<dyn Fft<f32>>,
    window: WindowFunction,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    bin_spacing: f32,
    harmonics: usize,
    rumble_cutoff: Option<f32>,
}

impl std::fmt::Debug for SpectralEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralEstimator")
            .field("len", &self.window.len())
            .field("bin_spacing", &self.bin_spacing)
            .field("harmonics", &self.harmonics)
            .field("rumble_cutoff", &self.rumble_cutoff)
            .finish()
    }
}

impl SpectralEstimator {
    /// Plans the FFT and precomputes the Hann window for `config.window_len`.
    pub fn new(config: &TunerConfig) -> Self {
        let len = config.window_len;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            window: WindowFunction::hann(len),
            buffer: vec![Complex::new(0.0, 0.0); len],
            scratch,
            bin_spacing: config.bin_spacing(),
            harmonics: config.harmonics,
            rumble_cutoff: config.rumble_cutoff,
        }
    }

    /// Length of the window this estimator was planned for.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn bin_spacing(&self) -> f32 {
        self.bin_spacing
    }

    /// Magnitudes of the `N/2 + 1` non-negative FFT bins of the windowed signal.
    ///
    /// # Panics
    /// If `signal` is not exactly `window_len()` samples long.
    pub fn magnitudes(&mut self, signal: &[f32]) -> Vec<f32> {
        assert_eq!(
            signal.len(),
            self.window_len(),
            "input frame size must match the planned window length"
        );

        for ((slot, &sample), &coeff) in self
            .buffer
            .iter_mut()
            .zip(signal)
            .zip(self.window.coefficients())
        {
            *slot = Complex::new(sample * coeff, 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        self.buffer
            .iter()
            .take(signal.len() / 2 + 1)
            .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
            .collect()
    }

    /// Computes the HPS-weighted spectrum of `signal`.
    ///
    /// The result covers bins `0..reinforced_len(N/2 + 1, harmonics)`, so for
    /// `H > 1` it ends well below Nyquist.
    ///
    /// # Panics
    /// If `signal` is not exactly `window_len()` samples long.
    pub fn estimate(&mut self, signal: &[f32]) -> Spectrum {
        let mut magnitudes = self.magnitudes(signal);

        if let Some(cutoff) = self.rumble_cutoff {
            for (i, magnitude) in magnitudes.iter_mut().enumerate() {
                if (i as f32) * self.bin_spacing >= cutoff {
                    break;
                }
                *magnitude = 0.0;
            }
        }

        let mut hps = harmonic_product_spectrum(&magnitudes, self.harmonics);
        hps.truncate(reinforced_len(hps.len(), self.harmonics));
        Spectrum::from_magnitudes(hps, self.bin_spacing)
    }
}

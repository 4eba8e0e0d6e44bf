//! Deterministic test tones.

use std::f64::consts::TAU;

/// `len` samples of a sine at `frequency` Hz.
pub fn sine(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    harmonic_tone(frequency, &[amplitude], sample_rate, len)
}

/// A tone whose `k`-th partial (`k` from 1) sits at `k * fundamental` with
/// amplitude `amplitudes[k - 1]`.
pub fn harmonic_tone(
    fundamental: f32,
    amplitudes: &[f32],
    sample_rate: u32,
    len: usize,
) -> Vec<f32> {
    let sample_rate = sample_rate as f64;
    (0..len)
        .map(|n| {
            let t = n as f64 / sample_rate;
            amplitudes
                .iter()
                .enumerate()
                .map(|(k, &amplitude)| {
                    // Phase in f64 keeps long tones from drifting.
                    let phase = (TAU * fundamental as f64 * (k + 1) as f64 * t) % TAU;
                    amplitude * (phase as f32).sin()
                })
                .sum::<f32>()
        })
        .collect()
}

/// `len` samples of digital silence.
pub fn silence(len: usize) -> Vec<f32> {
    vec![0.0; len]
}

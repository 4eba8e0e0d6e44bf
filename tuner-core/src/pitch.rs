//! # Pitch Refinement Module
//!
//! Picks the dominant bin of a Harmonic Product Spectrum and refines it to
//! sub-bin resolution with parabolic interpolation.
//!
//! The estimate is returned for every tick, including silent ones. Callers
//! gate it on the detection range before treating it as a pitch.

use crate::fft::Spectrum;

/// Index of the largest magnitude, ties broken by the lowest index.
///
/// Returns `None` for an empty slice. NaN magnitudes never win.
pub fn peak_index(magnitudes: &[f32]) -> Option<usize> {
    let mut peak: Option<(usize, f32)> = None;
    for (i, &magnitude) in magnitudes.iter().enumerate() {
        if magnitude.is_nan() {
            continue;
        }
        if peak.is_none_or(|(_, best)| magnitude > best) {
            peak = Some((i, magnitude));
        }
    }
    peak.map(|(i, _)| i)
}

/// Fractional bin offset of the vertex of the parabola through
/// `(-1, left)`, `(0, centre)`, `(1, right)`.
///
/// A flat top (vanishing curvature) yields 0.
pub fn parabolic_offset(left: f32, centre: f32, right: f32) -> f32 {
    let denominator = left - 2.0 * centre + right;
    let scale = left.abs() + centre.abs() + right.abs();
    if denominator.abs() <= f32::EPSILON * scale {
        return 0.0;
    }
    let offset = 0.5 * (left - right) / denominator;
    if offset.is_finite() { offset } else { 0.0 }
}

/// Refined frequency of the dominant spectrum peak in Hz.
///
/// Peaks on the first or last bin are returned unrefined. An empty spectrum
/// yields 0.
pub fn refine(spectrum: &Spectrum) -> f32 {
    let magnitudes = &spectrum.magnitudes;
    let Some(peak) = peak_index(magnitudes) else {
        return 0.0;
    };

    let offset = if peak > 0 && peak + 1 < magnitudes.len() {
        parabolic_offset(magnitudes[peak - 1], magnitudes[peak], magnitudes[peak + 1])
    } else {
        0.0
    };

    let frequency = spectrum.base_frequency() + spectrum.bin_spacing() * (peak as f32 + offset);
    frequency.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn peak_ties_go_to_lowest_index() {
        assert_eq!(peak_index(&[1.0, 3.0, 2.0, 3.0]), Some(1));
        assert_eq!(peak_index(&[0.0, 0.0, 0.0]), Some(0));
        assert_eq!(peak_index(&[]), None);
    }

    #[test]
    fn peak_ignores_nan() {
        assert_eq!(peak_index(&[f32::NAN, 1.0, 0.5]), Some(1));
    }

    #[test]
    fn symmetric_neighbours_give_zero_offset() {
        assert_eq!(parabolic_offset(2.0, 5.0, 2.0), 0.0);
    }

    #[test]
    fn offset_recovers_vertex_of_sampled_parabola() {
        // y = 100 - (x - 10.3)^2 sampled at x = 9, 10, 11
        let y = |x: f32| 100.0 - (x - 10.3) * (x - 10.3);
        let offset = parabolic_offset(y(9.0), y(10.0), y(11.0));
        assert_relative_eq!(offset, 0.3, epsilon = 1e-4);
    }

    #[test]
    fn flat_top_falls_back_to_zero_offset() {
        assert_eq!(parabolic_offset(4.0, 4.0, 4.0), 0.0);
        assert_eq!(parabolic_offset(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn aligned_peak_returns_bin_frequency() {
        let spectrum = Spectrum::from_magnitudes(vec![0.0, 1.0, 4.0, 1.0, 0.0], 2.5);
        assert_relative_eq!(refine(&spectrum), 5.0);
    }

    #[test]
    fn interpolates_between_bins() {
        let spectrum = Spectrum::from_magnitudes(vec![0.0, 2.0, 4.0, 3.0, 0.0], 1.0);
        // p = 0.5 * (2 - 3) / (2 - 8 + 3) = 1/6
        assert_relative_eq!(refine(&spectrum), 2.0 + 1.0 / 6.0, epsilon = 1e-5);
    }

    #[test]
    fn boundary_peaks_skip_interpolation() {
        let first = Spectrum::from_magnitudes(vec![9.0, 1.0, 0.0], 10.0);
        assert_eq!(refine(&first), 0.0);

        let last = Spectrum::from_magnitudes(vec![0.0, 1.0, 9.0], 10.0);
        assert_eq!(refine(&last), 20.0);
    }

    #[test]
    fn silent_spectrum_refines_to_zero() {
        let spectrum = Spectrum::from_magnitudes(vec![0.0; 16], 1.0);
        assert_eq!(refine(&spectrum), 0.0);
        assert_eq!(refine(&Spectrum::from_magnitudes(Vec::new(), 1.0)), 0.0);
    }
}

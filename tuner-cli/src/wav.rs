//! WAV input for offline tuning runs.

use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};

/// Reads the first channel of a WAV file as `f32` samples in [-1, 1].
///
/// Returns the samples and the file's sample rate.
pub fn read_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        WavReader::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = interleaved.into_iter().step_by(channels).collect();
    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    #[test]
    fn reads_first_channel_of_int_wav() {
        let path = std::env::temp_dir().join(format!("tuner-cli-wav-{}.wav", std::process::id()));
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for (left, right) in [(16384i16, -1i16), (-16384, -1), (0, -1)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, rate) = read_mono(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rate, 8000);
        assert_eq!(samples, vec![0.5, -0.5, 0.0]);
    }
}

use std::thread;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use tuner_core::fft::{SpectralEstimator, reinforced_len};
use tuner_core::pitch::{self, peak_index};
use tuner_core::{
    Detection, ReferenceTable, SampleChunk, TunerConfig, TunerPipeline, runner, synth,
};

const RATE: u32 = 44_100;

fn full_config(harmonics: usize) -> TunerConfig {
    TunerConfig {
        harmonics,
        ..TunerConfig::default()
    }
}

fn fast_config() -> TunerConfig {
    TunerConfig {
        sample_rate: 8000,
        window_len: 8000,
        tick_interval: Duration::from_millis(1),
        ..TunerConfig::default()
    }
}

#[test]
fn hps_prefers_fundamental_over_louder_octave() {
    // Two partials, so two harmonic orders.
    let config = full_config(2);
    let mut estimator = SpectralEstimator::new(&config);
    let signal = synth::harmonic_tone(220.0, &[0.3, 0.6], RATE, RATE as usize);

    let raw = estimator.magnitudes(&signal);
    assert_eq!(peak_index(&raw), Some(440));

    let frequency = pitch::refine(&estimator.estimate(&signal));
    assert_abs_diff_eq!(frequency, 220.0, epsilon = 2.0);
}

#[test]
fn hps_recovers_weak_fundamental_with_five_harmonics() {
    let config = full_config(5);
    let mut estimator = SpectralEstimator::new(&config);
    let signal = synth::harmonic_tone(220.0, &[0.1, 0.5, 0.4, 0.3, 0.2], RATE, RATE as usize);

    let frequency = pitch::refine(&estimator.estimate(&signal));
    assert_abs_diff_eq!(frequency, 220.0, epsilon = 2.0);
}

#[test]
fn default_estimate_stays_in_reinforced_bins() {
    let config = TunerConfig::default();
    let mut estimator = SpectralEstimator::new(&config);
    let bins = config.window_len / 2 + 1;
    let ceiling = reinforced_len(bins, config.harmonics) as f32 * config.bin_spacing();

    // Two partials under five harmonic orders: the peak may land on a
    // subharmonic, but never on the unmultiplied noise tail.
    for partials in [[0.5, 0.5], [0.3, 0.6], [0.6, 0.3]] {
        let signal = synth::harmonic_tone(220.0, &partials, RATE, RATE as usize);
        let frequency = pitch::refine(&estimator.estimate(&signal));
        assert!(frequency < ceiling, "{partials:?} estimated at {frequency} Hz");
        assert!(
            config.in_detection_range(frequency),
            "{partials:?} estimated at {frequency} Hz"
        );
    }

    let mut pipeline =
        TunerPipeline::new(config.clone(), ReferenceTable::standard_guitar()).unwrap();
    pipeline.ingest(&SampleChunk::new(synth::sine(220.0, 0.8, RATE, RATE as usize)));
    if let Detection::NoDetection { frequency } = pipeline.analyze() {
        assert!(frequency < ceiling, "pure sine estimated at {frequency} Hz");
    }
}

#[test]
fn silence_stays_out_of_detection_range() {
    let config = TunerConfig::default();
    let mut pipeline =
        TunerPipeline::new(config.clone(), ReferenceTable::standard_guitar()).unwrap();

    for _ in 0..3 {
        pipeline.ingest(&SampleChunk::new(synth::silence(2048)));
        let detection = pipeline.analyze();
        match detection {
            Detection::NoDetection { frequency } => {
                assert!(!config.in_detection_range(frequency))
            }
            Detection::Detected(report) => panic!("silence detected as {report:?}"),
        }
    }
}

#[test]
fn buffer_length_is_constant_across_ticks() {
    let mut pipeline =
        TunerPipeline::new(fast_config(), ReferenceTable::standard_guitar()).unwrap();
    for size in [0, 1, 2048, 8000, 20_000] {
        pipeline.ingest(&SampleChunk::new(vec![0.1; size]));
        assert_eq!(pipeline.buffer().len(), 8000);
    }
}

#[test]
fn locked_note_survives_jittery_input() {
    let table = ReferenceTable::standard_guitar();
    let mut pipeline = TunerPipeline::new(fast_config(), table).unwrap();

    let partials = [0.4, 0.5, 0.4, 0.3, 0.2];
    for frequency in [110.0, 112.0, 108.0, 113.0, 107.0] {
        let tone = synth::harmonic_tone(frequency, &partials, 8000, 8000);
        pipeline.ingest(&SampleChunk::new(tone));
        let report = pipeline.analyze();
        let report = report.report().expect("tone in range");
        assert_eq!(report.note, "A", "relabelled at {frequency} Hz");
        assert_eq!(report.reference_freq, 110.0);
        assert_abs_diff_eq!(report.frequency, frequency, epsilon = 1.0);
    }
}

#[test]
fn chromatic_table_tracks_sharp_note() {
    let table = ReferenceTable::equal_temperament(440.0, 19..=55).unwrap();
    let mut pipeline = TunerPipeline::new(fast_config(), table).unwrap();

    // 225 Hz is about 39 cents sharp of A3 (220 Hz).
    let tone = synth::harmonic_tone(225.0, &[0.5, 0.4, 0.3, 0.2, 0.1], 8000, 8000);
    pipeline.ingest(&SampleChunk::new(tone));
    let detection = pipeline.analyze();
    let report = detection.report().expect("tone in range");
    assert_eq!(report.note, "A3");
    assert_abs_diff_eq!(report.cents, 38.9, epsilon = 3.0);
    assert!(report.meter > 50.0);
}

#[test]
fn runner_finishes_when_capture_hangs_up() {
    let mut pipeline =
        TunerPipeline::new(fast_config(), ReferenceTable::standard_guitar()).unwrap();
    let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(16);
    let (_shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

    let producer = thread::spawn(move || {
        let tone = synth::harmonic_tone(110.0, &[0.4, 0.6, 0.5, 0.3, 0.2], 8000, 8000);
        for block in tone.chunks(2048) {
            chunk_tx.send(SampleChunk::new(block.to_vec())).unwrap();
        }
    });
    producer.join().unwrap();

    let mut reports = Vec::new();
    let ticks = runner::run(&mut pipeline, &chunk_rx, &shutdown_rx, |report| {
        reports.push(report.clone())
    });

    assert_eq!(ticks, 1);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].note, "A");
    assert_eq!(pipeline.state().reference_freq, 110.0);
}

#[test]
fn runner_stops_on_shutdown_signal() {
    let config = TunerConfig {
        tick_interval: Duration::from_secs(3600),
        ..fast_config()
    };
    let mut pipeline = TunerPipeline::new(config, ReferenceTable::standard_guitar()).unwrap();
    let (_chunk_tx, chunk_rx) = crossbeam_channel::bounded::<SampleChunk>(4);
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    shutdown_tx.send(()).unwrap();

    let ticks = runner::run(&mut pipeline, &chunk_rx, &shutdown_rx, |_| {
        panic!("no report expected")
    });
    assert_eq!(ticks, 0);
}

//! # Musical Tuning Module
//!
//! Reference pitch tables and the tuning-deviation measures computed against
//! them.
//!
//! ## Features
//! - Standard six-string guitar table (E2 A2 D3 G3 B3 E4, rounded to whole Hz)
//! - Equal temperament tables over the 88-key piano range (A0 to C8)
//! - O(log n) nearest-reference search, with an optional excluded entry
//! - Cent deviation, clamped for display
//! - Meter position relative to the neighbouring reference

use std::ops::RangeInclusive;

use once_cell::sync::Lazy;

use crate::error::{Result, TunerError};

/// Deviation shown on the display is clamped to ± this many cents.
pub const CENTS_DISPLAY_LIMIT: f32 = 50.0;

/// Concert pitch for A4 in Hz.
pub const CONCERT_A4: f32 = 440.0;

/// Number of keys on a standard piano.
pub const PIANO_KEYS: u8 = 88;

/// Represents a single reference pitch with its label and frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Note name (e.g., "A", "E", "C#3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

/// Standard guitar tuning, lowest string first.
static STANDARD_GUITAR: Lazy<ReferenceTable> = Lazy::new(|| ReferenceTable {
    notes: [
        (82.0, "E"),
        (110.0, "A"),
        (147.0, "D"),
        (196.0, "G"),
        (247.0, "B"),
        (330.0, "E"),
    ]
    .into_iter()
    .map(|(frequency, name)| Note {
        name: name.to_string(),
        frequency,
    })
    .collect(),
});

/// Name of a piano key, 0 = A0 ... 87 = C8.
pub fn piano_key_name(key_index: u8) -> String {
    const NOTE_NAMES: [&str; 12] = [
        "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
    ];
    // The octave number changes at C, three keys above each A.
    let octave = (key_index as usize + 9) / 12;
    format!("{}{}", NOTE_NAMES[key_index as usize % 12], octave)
}

/// Equal-tempered frequency of a piano key, A4 (index 48) = `a4`.
pub fn piano_key_frequency(key_index: u8, a4: f32) -> f32 {
    a4 * 2.0_f32.powf((key_index as f32 - 48.0) / 12.0)
}

/// Immutable reference table, sorted by ascending frequency.
///
/// Frequencies are unique; labels may repeat (a guitar has two E strings).
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable {
    notes: Vec<Note>,
}

impl ReferenceTable {
    /// Builds a table from `(frequency, label)` pairs in any order.
    ///
    /// # Arguments
    /// * `entries` - Reference frequencies in Hz with their note labels
    ///
    /// # Returns
    /// The table sorted by ascending frequency, or
    /// [`TunerError::InvalidReferenceTable`] if it is empty, holds a
    /// non-finite or non-positive frequency, or repeats a frequency.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f32, S)>,
        S: Into<String>,
    {
        let mut notes: Vec<Note> = entries
            .into_iter()
            .map(|(frequency, name)| Note {
                name: name.into(),
                frequency,
            })
            .collect();

        if notes.is_empty() {
            return Err(TunerError::InvalidReferenceTable("table is empty".into()));
        }
        if let Some(bad) = notes.iter().find(|n| !n.frequency.is_finite() || n.frequency <= 0.0) {
            return Err(TunerError::InvalidReferenceTable(format!(
                "note {:?} has unusable frequency {}",
                bad.name, bad.frequency
            )));
        }

        notes.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        if let Some(pair) = notes.windows(2).find(|w| w[0].frequency == w[1].frequency) {
            return Err(TunerError::InvalidReferenceTable(format!(
                "duplicate frequency {} Hz ({:?} and {:?})",
                pair[0].frequency, pair[0].name, pair[1].name
            )));
        }

        Ok(Self { notes })
    }

    /// E A D G B E, rounded to whole Hz.
    pub fn standard_guitar() -> Self {
        STANDARD_GUITAR.clone()
    }

    /// Equal-tempered chromatic table over a range of piano keys (0 = A0).
    pub fn equal_temperament(a4: f32, keys: RangeInclusive<u8>) -> Result<Self> {
        if *keys.end() >= PIANO_KEYS {
            return Err(TunerError::InvalidReferenceTable(format!(
                "piano key {} is out of range, last key is {}",
                keys.end(),
                PIANO_KEYS - 1
            )));
        }
        Self::new(keys.map(|key| (piano_key_frequency(key, a4), piano_key_name(key))))
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Lowest-frequency entry.
    pub fn first(&self) -> &Note {
        // Construction rejects empty tables.
        &self.notes[0]
    }

    /// The entries immediately below and at-or-above `frequency`, skipping the
    /// entry whose frequency equals `excluded`.
    pub fn bracket(&self, frequency: f32, excluded: Option<f32>) -> (Option<&Note>, Option<&Note>) {
        let split = self.notes.partition_point(|n| n.frequency < frequency);
        let is_excluded = |n: &&Note| excluded.is_some_and(|x| n.frequency == x);

        let below = self.notes[..split].iter().rev().find(|n| !is_excluded(n));
        let above = self.notes[split..].iter().find(|n| !is_excluded(n));
        (below, above)
    }

    /// Entry closest to `frequency` in Hz.
    ///
    /// An exact match always wins; equidistant neighbours resolve to the lower one.
    pub fn nearest(&self, frequency: f32) -> &Note {
        self.nearest_excluding(frequency, None)
            .unwrap_or_else(|| self.first())
    }

    /// Entry closest to `frequency` in Hz, ignoring the entry at `excluded`.
    ///
    /// `None` only when the exclusion removes the sole entry.
    pub fn nearest_excluding(&self, frequency: f32, excluded: Option<f32>) -> Option<&Note> {
        match self.bracket(frequency, excluded) {
            (Some(below), Some(above)) => {
                if (above.frequency - frequency).abs() < (frequency - below.frequency).abs() {
                    Some(above)
                } else {
                    Some(below)
                }
            }
            (below, above) => below.or(above),
        }
    }
}

/// Unclamped deviation of `frequency` from `reference` in cents.
///
/// Zero when either input is not strictly positive.
pub fn raw_cents(frequency: f32, reference: f32) -> f32 {
    if frequency > 0.0 && reference > 0.0 {
        1200.0 * (frequency / reference).log2()
    } else {
        0.0
    }
}

/// Deviation in cents, clamped to ±[`CENTS_DISPLAY_LIMIT`].
pub fn cents(frequency: f32, reference: f32) -> f32 {
    raw_cents(frequency, reference).clamp(-CENTS_DISPLAY_LIMIT, CENTS_DISPLAY_LIMIT)
}

/// Position of a 0–100 tuning meter, 50 being in tune.
///
/// Full scale on either side is half the distance from `reference` to
/// `neighbour`, the nearest other reference. Without a neighbour the meter
/// follows the clamped cents value instead.
pub fn meter_position(frequency: f32, reference: f32, neighbour: Option<f32>) -> f32 {
    let half_range = neighbour
        .map(|n| (n - reference).abs() / 2.0)
        .filter(|h| *h > 0.0);

    let deviation = match half_range {
        Some(half_range) => (frequency - reference) / half_range,
        None => cents(frequency, reference) / CENTS_DISPLAY_LIMIT,
    };
    (deviation.clamp(-1.0, 1.0) + 1.0) * 50.0
}

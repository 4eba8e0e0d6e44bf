//! # Note Matching Module
//!
//! Assigns a detected frequency to a reference note and keeps that assignment
//! locked across ticks.
//!
//! Each call runs two stages:
//! 1. The closest reference (in Hz) replaces the lock if its label differs.
//! 2. The closest reference other than the locked one replaces the lock if it
//!    is strictly closer under the configured [`DistanceMetric`].
//!
//! Jitter around a locked note therefore never relabels it; only a strictly
//! closer candidate does.

use log::debug;

use crate::tuning::{Note, ReferenceTable, raw_cents};

/// Distance used when comparing the locked note against the alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Absolute difference in Hz.
    Hertz,
    /// Absolute difference in cents (log-frequency).
    #[default]
    Cents,
}

impl DistanceMetric {
    pub fn distance(self, frequency: f32, reference: f32) -> f32 {
        match self {
            DistanceMetric::Hertz => (frequency - reference).abs(),
            // Cents are undefined for non-positive input, fall back to Hz.
            DistanceMetric::Cents if frequency <= 0.0 => (frequency - reference).abs(),
            DistanceMetric::Cents => raw_cents(frequency, reference).abs(),
        }
    }
}

/// The note currently locked in.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerState {
    pub note: String,
    pub reference_freq: f32,
}

impl From<&Note> for TunerState {
    fn from(note: &Note) -> Self {
        Self {
            note: note.name.clone(),
            reference_freq: note.frequency,
        }
    }
}

/// Outcome of matching one frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMatch {
    pub note: String,
    pub reference_freq: f32,
    /// Nearest other reference to the detected frequency, if the table has one.
    pub neighbour_freq: Option<f32>,
}

/// Maps frequencies onto a [`ReferenceTable`] with note locking.
#[derive(Debug, Clone)]
pub struct NoteMatcher {
    table: ReferenceTable,
    state: TunerState,
    metric: DistanceMetric,
}

impl NoteMatcher {
    /// Starts locked to the lowest entry of `table`.
    pub fn new(table: ReferenceTable, metric: DistanceMetric) -> Self {
        let state = TunerState::from(table.first());
        Self { table, state, metric }
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    pub fn state(&self) -> &TunerState {
        &self.state
    }

    /// Closest reference to `frequency` excluding `excluded`, by the metric.
    /// Equal distances resolve to the lower reference.
    fn closest_other(&self, frequency: f32, excluded: f32) -> Option<&Note> {
        match self.table.bracket(frequency, Some(excluded)) {
            (Some(below), Some(above)) => {
                let d_below = self.metric.distance(frequency, below.frequency);
                let d_above = self.metric.distance(frequency, above.frequency);
                Some(if d_above < d_below { above } else { below })
            }
            (below, above) => below.or(above),
        }
    }

    /// Matches `frequency` and updates the lock. No range gating happens here.
    pub fn match_frequency(&mut self, frequency: f32) -> NoteMatch {
        let closest = self.table.nearest(frequency);
        if closest.name != self.state.note {
            debug!(
                "relock {} ({:.2} Hz) -> {} ({:.2} Hz)",
                self.state.note, self.state.reference_freq, closest.name, closest.frequency
            );
            self.state = TunerState::from(closest);
        }

        if let Some(second) = self.closest_other(frequency, self.state.reference_freq) {
            let current = self.metric.distance(frequency, self.state.reference_freq);
            if self.metric.distance(frequency, second.frequency) < current {
                debug!(
                    "switch {} ({:.2} Hz) -> {} ({:.2} Hz)",
                    self.state.note, self.state.reference_freq, second.name, second.frequency
                );
                self.state = TunerState::from(second);
            }
        }

        let neighbour_freq = self
            .closest_other(frequency, self.state.reference_freq)
            .map(|n| n.frequency);

        NoteMatch {
            note: self.state.note.clone(),
            reference_freq: self.state.reference_freq,
            neighbour_freq,
        }
    }
}

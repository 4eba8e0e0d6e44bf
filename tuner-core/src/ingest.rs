//! # Sample Ingestion Module
//!
//! Merges the variably sized chunks delivered by the capture source into a
//! fixed-length rolling analysis window. The newest samples always sit at the
//! tail of the window; the oldest are evicted from the head.
//!
//! The capture side and the analysis side only meet through a
//! `crossbeam_channel` queue of [`SampleChunk`]s. The window itself is owned
//! and mutated by the analysis side alone.

use std::fmt;

use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, warn};

use crate::error::{Result, TunerError};

/// A diagnostic raised by the capture source. Never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureWarning {
    /// The queue was full and this many frames were thrown away.
    Overrun { dropped_frames: usize },
    /// The audio backend reported a stream error.
    Stream(String),
}

impl fmt::Display for CaptureWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureWarning::Overrun { dropped_frames } => {
                write!(f, "input overrun, {} frames dropped", dropped_frames)
            }
            CaptureWarning::Stream(msg) => write!(f, "stream error: {}", msg),
        }
    }
}

/// One block of mono samples handed over by the capture source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleChunk {
    pub samples: Vec<f32>,
    pub status: Option<CaptureWarning>,
}

impl SampleChunk {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples, status: None }
    }

    /// A sample-less chunk that only carries a warning.
    pub fn warning(status: CaptureWarning) -> Self {
        Self {
            samples: Vec::new(),
            status: Some(status),
        }
    }

    /// Number of frames in the chunk.
    pub fn frame_count(&self) -> usize {
        self.samples.len()
    }
}

/// Fixed-capacity rolling window of samples, zero-filled at construction.
#[derive(Debug, Clone)]
pub struct AnalysisBuffer {
    samples: Vec<f32>,
}

impl AnalysisBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
        }
    }

    /// Window length. Constant for the buffer's lifetime.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Shifts the window left by `chunk.len()` and appends `chunk` at the tail.
    ///
    /// A chunk longer than the window keeps only its most recent `len()`
    /// samples. An empty chunk is a no-op.
    pub fn ingest(&mut self, chunk: &[f32]) {
        let len = self.samples.len();
        if chunk.is_empty() || len == 0 {
            return;
        }
        if chunk.len() >= len {
            self.samples.copy_from_slice(&chunk[chunk.len() - len..]);
            return;
        }
        let keep = len - chunk.len();
        self.samples.copy_within(chunk.len().., 0);
        self.samples[keep..].copy_from_slice(chunk);
    }

    /// Ingests one queued chunk, surfacing its status as a log warning.
    pub fn push_chunk(&mut self, chunk: &SampleChunk) {
        if let Some(status) = &chunk.status {
            warn!("capture warning: {}", status);
        }
        self.ingest(&chunk.samples);
    }

    /// Drains every chunk currently queued without blocking.
    ///
    /// Returns the number of chunks consumed. When the sender side has hung
    /// up, the remaining chunks are still ingested and
    /// [`TunerError::ChunkQueueDisconnected`] is returned afterwards.
    pub fn drain(&mut self, chunks: &Receiver<SampleChunk>) -> Result<usize> {
        let mut consumed = 0;
        loop {
            match chunks.try_recv() {
                Ok(chunk) => {
                    self.push_chunk(&chunk);
                    consumed += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("chunk queue disconnected after {} chunks", consumed);
                    return Err(TunerError::ChunkQueueDisconnected);
                }
            }
        }
        Ok(consumed)
    }

    /// Resets the window to silence.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_silent() {
        let buffer = AnalysisBuffer::new(8);
        assert_eq!(buffer.len(), 8);
        assert!(buffer.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn ingest_shifts_and_appends() {
        let mut buffer = AnalysisBuffer::new(5);
        buffer.ingest(&[1.0, 2.0]);
        assert_eq!(buffer.as_slice(), &[0.0, 0.0, 0.0, 1.0, 2.0]);
        buffer.ingest(&[3.0, 4.0, 5.0]);
        assert_eq!(buffer.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        buffer.ingest(&[6.0]);
        assert_eq!(buffer.as_slice(), &[2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn oversized_chunk_keeps_most_recent_samples() {
        let mut buffer = AnalysisBuffer::new(3);
        buffer.ingest(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buffer.as_slice(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn empty_chunk_is_noop() {
        let mut buffer = AnalysisBuffer::new(3);
        buffer.ingest(&[1.0, 2.0, 3.0]);
        buffer.ingest(&[]);
        assert_eq!(buffer.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn length_is_constant_for_any_chunk_size() {
        let mut buffer = AnalysisBuffer::new(64);
        for size in [0, 1, 7, 63, 64, 65, 500] {
            buffer.ingest(&vec![0.5; size]);
            assert_eq!(buffer.len(), 64);
        }
    }

    #[test]
    fn drain_consumes_all_pending_chunks() {
        let (tx, rx) = crossbeam_channel::bounded(8);
        tx.send(SampleChunk::new(vec![1.0])).unwrap();
        tx.send(SampleChunk::warning(CaptureWarning::Overrun { dropped_frames: 16 }))
            .unwrap();
        tx.send(SampleChunk::new(vec![2.0, 3.0])).unwrap();

        let mut buffer = AnalysisBuffer::new(4);
        assert_eq!(buffer.drain(&rx).unwrap(), 3);
        assert_eq!(buffer.as_slice(), &[0.0, 1.0, 2.0, 3.0]);

        // Nothing pending: the previous window is reused.
        assert_eq!(buffer.drain(&rx).unwrap(), 0);
        assert_eq!(buffer.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn drain_reports_disconnect_after_ingesting_leftovers() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        tx.send(SampleChunk::new(vec![9.0])).unwrap();
        drop(tx);

        let mut buffer = AnalysisBuffer::new(2);
        assert_eq!(buffer.drain(&rx), Err(TunerError::ChunkQueueDisconnected));
        assert_eq!(buffer.as_slice(), &[0.0, 9.0]);
    }

    #[test]
    fn warning_display() {
        let warning = CaptureWarning::Overrun { dropped_frames: 2048 };
        assert_eq!(warning.to_string(), "input overrun, 2048 frames dropped");
    }
}

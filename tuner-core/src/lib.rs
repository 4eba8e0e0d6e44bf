// tuner-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate is responsible for sample ingestion, HPS pitch estimation,
//! note matching and cent deviation. It is completely headless
//! and contains no presentation code.

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod ingest;
pub mod matcher;
pub mod pipeline;
pub mod pitch;
pub mod runner;
pub mod synth;
pub mod tuning;

pub use config::TunerConfig;
pub use error::TunerError;
pub use ingest::{CaptureWarning, SampleChunk};
pub use matcher::{DistanceMetric, TunerState};
pub use pipeline::{Detection, TunerPipeline, TuningReport};
pub use tuning::ReferenceTable;

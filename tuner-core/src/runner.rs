//! # Analysis Loop
//!
//! Drives a [`TunerPipeline`] from a periodic tick. The capture source feeds
//! the chunk queue on its own thread; this loop is the only consumer.
//!
//! ## Shutdown
//! Stop the capture stream first, then signal `shutdown` (or drop its
//! sender). The tick in flight always completes. If the capture side drops
//! the chunk queue instead, the loop ingests what is left, analyses once more
//! and returns.

use crossbeam_channel::{Receiver, select, tick};
use log::{info, warn};

use crate::error::TunerError;
use crate::ingest::SampleChunk;
use crate::pipeline::{Detection, TunerPipeline, TuningReport};

/// Runs ticks until shutdown, calling `on_report` for every detection.
///
/// Each tick drains `chunks` without blocking and analyses the window. A
/// disconnected `chunks` queue gets one last analysis of the leftovers before
/// the loop ends.
///
/// # Arguments
/// * `pipeline` - Analysis state, ticked on `pipeline.config().tick_interval`
/// * `chunks` - Receiving end of the capture queue
/// * `shutdown` - Any message or disconnect stops the loop
/// * `on_report` - Called with every detected [`TuningReport`]
///
/// # Returns
/// The number of ticks run.
pub fn run<F>(
    pipeline: &mut TunerPipeline,
    chunks: &Receiver<SampleChunk>,
    shutdown: &Receiver<()>,
    mut on_report: F,
) -> usize
where
    F: FnMut(&TuningReport),
{
    let ticker = tick(pipeline.config().tick_interval);
    let mut ticks = 0;
    info!("analysis loop started, tick every {:?}", pipeline.config().tick_interval);

    loop {
        select! {
            recv(ticker) -> _ => {
                ticks += 1;
                match pipeline.tick(chunks) {
                    Ok(Detection::Detected(report)) => on_report(&report),
                    Ok(Detection::NoDetection { .. }) => {}
                    Err(TunerError::ChunkQueueDisconnected) => {
                        info!("capture queue closed, running final analysis");
                        if let Detection::Detected(report) = pipeline.analyze() {
                            on_report(&report);
                        }
                        break;
                    }
                    Err(e) => {
                        warn!("analysis tick failed: {}", e);
                        break;
                    }
                }
            },
            recv(shutdown) -> _ => {
                info!("analysis loop received shutdown signal");
                break;
            },
        }
    }

    info!("analysis loop finished after {} ticks", ticks);
    ticks
}

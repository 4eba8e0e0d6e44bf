//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It opens the default input device and pushes mono [`SampleChunk`]s into the
//! analysis queue from the device callback.
//!
//! ## Features
//! - Automatic audio device selection
//! - Sample rate and block size taken from [`TunerConfig`]
//! - First-channel extraction for multi-channel devices
//! - Overruns and stream errors forwarded as chunk warnings, never fatal

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedBufferSize, SupportedStreamConfigRange};
use crossbeam_channel::{Sender, TrySendError};
use log::{info, warn};

use crate::config::TunerConfig;
use crate::ingest::{CaptureWarning, SampleChunk};

/// A running input stream. Dropping it stops capture.
pub struct AudioCapture {
    stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Actual sample rate of the device stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Pauses and releases the stream. No chunk is sent after this returns.
    pub fn stop(self) {
        if let Err(e) = self.stream.pause() {
            warn!("error pausing input stream: {}", e);
        }
        drop(self.stream);
        info!("audio capture stopped");
    }
}

/// Starts audio capture from the default input device.
///
/// Every device callback becomes one chunk on `sender`. When the queue is
/// full the block is dropped and the next chunk that gets through carries a
/// [`CaptureWarning::Overrun`].
///
/// # Audio Configuration
/// - Sample Rate: `config.sample_rate` (must be supported by the device)
/// - Format: 32-bit float
/// - Channels: mono preferred, otherwise the first channel is used
/// - Buffer Size: `config.block_size` frames when the device allows it
pub fn start_audio_capture(
    sender: Sender<SampleChunk>,
    config: &TunerConfig,
) -> Result<AudioCapture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, config.sample_rate)
        .ok_or_else(|| anyhow!("No f32 input format supports {} Hz", config.sample_rate))?;

    let buffer_size = match supported_config.buffer_size() {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&config.block_size) => {
            cpal::BufferSize::Fixed(config.block_size)
        }
        _ => cpal::BufferSize::Default,
    };

    let supported_config = supported_config
        .try_with_sample_rate(cpal::SampleRate(config.sample_rate))
        .ok_or_else(|| anyhow!("Device rejected sample rate {} Hz", config.sample_rate))?;
    let sample_rate = supported_config.sample_rate().0;
    let channels = supported_config.channels();

    let mut stream_config: cpal::StreamConfig = supported_config.into();
    stream_config.buffer_size = buffer_size;

    info!(
        "Selected {} Hz, {} channel(s), buffer {:?}",
        sample_rate, channels, stream_config.buffer_size
    );

    let err_sender = sender.clone();
    let err_fn = move |err: cpal::StreamError| {
        // The error callback must not block; a full queue loses the warning.
        let _ = err_sender.try_send(SampleChunk::warning(CaptureWarning::Stream(err.to_string())));
    };

    let mut forwarder = ChunkForwarder::new(sender);
    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            forwarder.forward(data.iter().step_by(channels as usize).copied().collect());
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(AudioCapture {
        stream,
        sample_rate,
        channels,
    })
}

/// Non-blocking hand-off from the device callback to the analysis queue.
///
/// Blocks that find the queue full are dropped and counted. The next block
/// that gets through carries [`CaptureWarning::Overrun`] with that count.
#[derive(Debug)]
struct ChunkForwarder {
    sender: Sender<SampleChunk>,
    dropped_frames: usize,
}

impl ChunkForwarder {
    fn new(sender: Sender<SampleChunk>) -> Self {
        Self {
            sender,
            dropped_frames: 0,
        }
    }

    fn forward(&mut self, samples: Vec<f32>) {
        let status = (self.dropped_frames > 0).then_some(CaptureWarning::Overrun {
            dropped_frames: self.dropped_frames,
        });
        let chunk = SampleChunk { samples, status };
        let frames = chunk.frame_count();

        match self.sender.try_send(chunk) {
            Ok(()) => self.dropped_frames = 0,
            Err(TrySendError::Full(_)) => self.dropped_frames += frames,
            // Analysis has exited; the stream is about to be stopped.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float ranges that contain `target_rate` qualify; among those a
/// mono configuration wins, then the one with the fewest channels.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate))
        .min_by_key(|c| c.channels())
}

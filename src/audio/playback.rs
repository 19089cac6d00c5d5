//! Speaker playback
//!
//! The receiver pushes arriving chunks into the shared queue; a cpal
//! output stream drains them sample by sample, carrying partial chunks
//! across callbacks and emitting silence on underrun. No resampling,
//! jitter buffering, or reordering: chunks play strictly in arrival
//! order.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use std::collections::VecDeque;

use crate::audio::buffer::SharedChunkQueue;
use crate::audio::AudioSink;
use crate::error::AudioError;

/// Output stream handle for the default output device
pub struct SpeakerPlayback {
    // Held for its lifetime; dropping the stream stops playback
    _stream: Stream,
    queue: SharedChunkQueue,
}

impl SpeakerPlayback {
    /// Open the default output device and start draining the queue
    pub fn start(sample_rate: u32, queue: SharedChunkQueue) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound("no default output device".to_string()))?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue_cb = queue.clone();
        let mut carry: VecDeque<i16> = VecDeque::new();

        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for slot in out.iter_mut() {
                        if carry.is_empty() {
                            if let Some(chunk) = queue_cb.try_pop() {
                                carry.extend(chunk);
                            }
                        }
                        *slot = match carry.pop_front() {
                            Some(sample) => sample as f32 / i16::MAX as f32,
                            None => 0.0,
                        };
                    }
                },
                move |err| {
                    tracing::warn!("output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            queue,
        })
    }
}

/// [`AudioSink`] over a running [`SpeakerPlayback`]
pub struct SpeakerSink {
    playback: SpeakerPlayback,
}

impl SpeakerSink {
    pub fn new(playback: SpeakerPlayback) -> Self {
        Self { playback }
    }
}

impl AudioSink for SpeakerSink {
    fn play(&mut self, samples: &[i16]) -> Result<(), AudioError> {
        // Overflow means playback is far behind the network; dropping the
        // chunk keeps the stream live rather than letting latency grow
        if !self.playback.queue.push(samples.to_vec()) {
            tracing::warn!("playback queue full, dropping {} samples", samples.len());
        }
        Ok(())
    }
}

//! Microphone capture
//!
//! Runs a cpal input stream on its own thread, accumulating samples into
//! fixed-size mono i16 chunks pushed through the shared chunk queue. The
//! pipeline loop pulls complete chunks without ever touching the device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::buffer::SharedChunkQueue;
use crate::audio::AudioSource;
use crate::error::AudioError;

/// Capture handle for the default input device
pub struct MicCapture {
    running: Arc<AtomicBool>,
    queue: SharedChunkQueue,
    thread_handle: Option<JoinHandle<()>>,
    error_rx: Receiver<AudioError>,
    sample_rate: u32,
    chunk_samples: usize,
}

impl MicCapture {
    /// Open the default input device and start capturing
    ///
    /// Fails fast when no input device exists; an unusable microphone is
    /// a fatal setup condition, not something to limp past.
    pub fn start(
        sample_rate: u32,
        chunk_samples: usize,
        queue: SharedChunkQueue,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceNotFound("no default input device".to_string()))?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let running = Arc::new(AtomicBool::new(true));
        let (error_tx, error_rx) = bounded::<AudioError>(16);

        let running_cb = running.clone();
        let running_loop = running.clone();
        let queue_cb = queue.clone();
        let stream_error_tx = error_tx.clone();

        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                // Accumulator carried across callbacks; chunks leave only
                // when complete
                let mut pending: Vec<i16> = Vec::with_capacity(chunk_samples);

                let stream = device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !running_cb.load(Ordering::Relaxed) {
                            return;
                        }
                        for &sample in data {
                            let clamped = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                            pending.push(clamped);
                            if pending.len() == chunk_samples {
                                let chunk = std::mem::replace(
                                    &mut pending,
                                    Vec::with_capacity(chunk_samples),
                                );
                                let _ = queue_cb.push(chunk);
                            }
                        }
                    },
                    move |err| {
                        let _ = stream_error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = error_tx.try_send(AudioError::StreamError(e.to_string()));
                            return;
                        }
                        while running_loop.load(Ordering::Relaxed) {
                            thread::sleep(std::time::Duration::from_millis(10));
                        }
                        // Stream is dropped here, stopping capture
                    }
                    Err(e) => {
                        let _ = error_tx.try_send(AudioError::StreamError(e.to_string()));
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        Ok(Self {
            running,
            queue,
            thread_handle: Some(handle),
            error_rx,
            sample_rate,
            chunk_samples,
        })
    }

    /// Stop capturing and release the device
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    /// Latest stream error, if the device reported one
    pub fn check_error(&self) -> Option<AudioError> {
        self.error_rx.try_recv().ok()
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// [`AudioSource`] over a running [`MicCapture`]
pub struct MicSource {
    capture: MicCapture,
}

impl MicSource {
    pub fn new(capture: MicCapture) -> Self {
        Self { capture }
    }
}

impl AudioSource for MicSource {
    fn next_chunk(&mut self) -> Result<Option<Vec<i16>>, AudioError> {
        if let Some(err) = self.capture.check_error() {
            return Err(err);
        }
        Ok(self.capture.queue.try_pop())
    }
}

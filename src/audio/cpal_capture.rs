//! cpal-based audio capture
//!
//! Uses the cpal crate for cross-platform audio input. The capture
//! callback mixes frames to mono, resamples to the configured rate, and
//! writes 16-bit little-endian PCM bytes into the shared buffer.
//!
//! Note: cpal::Stream is not Send, so the stream lives on a dedicated
//! thread and is controlled via a command channel.

use super::AudioCapture;
use crate::buffer::SharedBuffer;
use crate::config::AudioConfig;
use crate::error::AudioError;
use std::thread;
use tokio::sync::oneshot;

/// Commands sent to the capture thread
enum CaptureCommand {
    Stop(oneshot::Sender<()>),
}

/// cpal-based audio capture implementation
pub struct CpalCapture {
    config: AudioConfig,
    cmd_tx: Option<std::sync::mpsc::Sender<CaptureCommand>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl CpalCapture {
    /// Create a new cpal audio capture instance
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            config: config.clone(),
            cmd_tx: None,
            thread_handle: None,
        }
    }
}

/// Find an audio input device by name with flexible matching:
/// exact, then case-insensitive, then substring.
fn find_audio_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?
        .collect();

    let search_lower = device_name.to_lowercase();

    let matched = devices
        .iter()
        .position(|d| d.name().map(|n| n == device_name).unwrap_or(false))
        .or_else(|| {
            devices
                .iter()
                .position(|d| d.name().map(|n| n.to_lowercase() == search_lower).unwrap_or(false))
        })
        .or_else(|| {
            devices.iter().position(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&search_lower))
                    .unwrap_or(false)
            })
        });

    match matched {
        Some(idx) => {
            let device = devices.into_iter().nth(idx);
            if let Some(ref d) = device {
                tracing::debug!(
                    "Matched audio device: {} (searched for: {})",
                    d.name().unwrap_or_else(|_| "unknown".to_string()),
                    device_name
                );
            }
            device.ok_or_else(|| AudioError::DeviceNotFound(device_name.to_string()))
        }
        None => Err(AudioError::DeviceNotFound(device_name.to_string())),
    }
}

#[async_trait::async_trait]
impl AudioCapture for CpalCapture {
    async fn start(&mut self, sink: SharedBuffer) -> Result<(), AudioError> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

        if self.is_running() {
            tracing::debug!("Capture already running, ignoring start");
            return Ok(());
        }

        let host = cpal::default_host();

        let device = if self.config.device == "default" {
            host.default_input_device()
                .ok_or(AudioError::CaptureUnavailable)?
        } else {
            find_audio_device(&host, &self.config.device)?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("Using audio device: {}", device_name);

        let supported_config = device
            .default_input_config()
            .map_err(|e| AudioError::Connection(e.to_string()))?;

        let source_rate = supported_config.sample_rate().0;
        let source_channels = supported_config.channels() as usize;
        let target_rate = self.config.sample_rate;
        let sample_format = supported_config.sample_format();

        tracing::debug!(
            "Device config: {} Hz, {} channel(s), format: {:?}; capturing at {} Hz",
            source_rate,
            source_channels,
            sample_format,
            target_rate
        );

        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel::<CaptureCommand>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), AudioError>>();

        let thread_handle = thread::spawn(move || {
            let stream_config = cpal::StreamConfig {
                channels: supported_config.channels(),
                sample_rate: supported_config.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            };

            let err_fn = |err| tracing::error!("Audio stream error: {}", err);

            let stream_result = match sample_format {
                cpal::SampleFormat::F32 => build_stream::<f32>(
                    &device,
                    &stream_config,
                    sink,
                    source_rate,
                    target_rate,
                    source_channels,
                    err_fn,
                ),
                cpal::SampleFormat::I16 => build_stream::<i16>(
                    &device,
                    &stream_config,
                    sink,
                    source_rate,
                    target_rate,
                    source_channels,
                    err_fn,
                ),
                cpal::SampleFormat::U16 => build_stream::<u16>(
                    &device,
                    &stream_config,
                    sink,
                    source_rate,
                    target_rate,
                    source_channels,
                    err_fn,
                ),
                format => Err(AudioError::StreamError(format!(
                    "Unsupported sample format: {:?}",
                    format
                ))),
            };

            let stream = match stream_result {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(()));
            tracing::debug!("Audio capture thread started");

            // Hold the stream alive until told to stop
            if let Ok(CaptureCommand::Stop(ack_tx)) = cmd_rx.recv() {
                drop(stream);
                let _ = ack_tx.send(());
            }

            tracing::debug!("Audio capture thread stopped");
        });

        // Surface stream construction errors from the capture thread
        match ready_rx.await {
            Ok(Ok(())) => {
                self.cmd_tx = Some(cmd_tx);
                self.thread_handle = Some(thread_handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread_handle.join();
                Err(AudioError::StreamError(
                    "Capture thread exited unexpectedly".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let (ack_tx, ack_rx) = oneshot::channel();

            if cmd_tx.send(CaptureCommand::Stop(ack_tx)).is_ok() {
                match tokio::time::timeout(std::time::Duration::from_secs(2), ack_rx).await {
                    Ok(_) => {}
                    Err(_) => {
                        return Err(AudioError::StreamError(
                            "Timed out waiting for capture thread".to_string(),
                        ))
                    }
                }
            }
        }

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        tracing::debug!("Audio capture stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.cmd_tx.is_some()
    }
}

/// Build an input stream for a specific sample type. The callback mixes
/// to mono, resamples, converts to i16 little-endian bytes, and writes
/// them into the shared buffer.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sink: SharedBuffer,
    source_rate: u32,
    target_rate: u32,
    source_channels: usize,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Convert to f32 and mix to mono
                let mono: Vec<f32> = data
                    .chunks(source_channels)
                    .map(|frame| {
                        let sum: f32 = frame
                            .iter()
                            .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                            .sum();
                        sum / source_channels as f32
                    })
                    .collect();

                let resampled = if source_rate != target_rate {
                    resample(&mono, source_rate, target_rate)
                } else {
                    mono
                };

                sink.write(&pcm_bytes(&resampled));
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}

/// Convert f32 samples in [-1.0, 1.0] to s16le PCM bytes
fn pcm_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&scaled.to_le_bytes());
    }
    bytes
}

/// Linear interpolation resampling
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.get(idx).copied().unwrap_or(0.0)
        };

        output.push(sample);
    }

    output
}

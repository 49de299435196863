//! System microphone capture via CPAL.
//!
//! Handles device selection, format conversion, and sample rate normalization.
//! All audio is converted to 16 kHz mono f32 PCM before it reaches the
//! encoder, regardless of the device's native format.

use super::capture::{
    CaptureConfig, CaptureMetrics, CaptureResult, FrameAccumulator, SilenceTimer, StopReason,
};
use super::dispatch::FrameDispatcher;
use super::meter::{rms_amplitude, LiveMeter};
use super::resample::convert_frame_to_target;
use super::{FRAME_MS, FRAME_SAMPLES, TARGET_RATE};
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Audio input device wrapper.
///
/// A `Recorder` only holds the device; the stream and every other capture
/// resource live inside `record_until_silence` so nothing outlasts a session.
pub struct Recorder {
    device: cpal::Device,
}

impl Recorder {
    /// List microphone names so the CLI can expose a selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a recorder, optionally forcing a specific device so users can
    /// pick the right microphone when a machine exposes multiple inputs.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self { device })
    }

    /// Get the name of the active recording device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Record until the silence timer fires, the stop flag is raised, or the
    /// max-duration cap is hit. Returns 16 kHz mono audio in capture order.
    ///
    /// All capture resources are torn down before this returns, on success and
    /// on every error path.
    pub fn record_until_silence(
        &self,
        cfg: &CaptureConfig,
        stop_flag: Option<Arc<AtomicBool>>,
        meter: Option<LiveMeter>,
    ) -> Result<CaptureResult> {
        let default_config = self
            .device
            .default_input_config()
            .context("no usable input configuration; check microphone permissions")?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let device_sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));
        let device_frame_samples =
            ((u64::from(device_sample_rate) * FRAME_MS) / 1000).max(1) as usize;

        log_debug(&format!(
            "capture config: format={format:?} sample_rate={device_sample_rate}Hz channels={channels}"
        ));

        let (sender, receiver) = bounded::<Vec<f32>>(cfg.channel_capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(Mutex::new(FrameDispatcher::new(
            device_frame_samples,
            sender,
            dropped.clone(),
        )));

        // Keep the error callback quiet in the UI and mirror issues into the log.
        let err_fn = |err| log_debug(&format!("audio_stream_error: {err}"));

        // Convert every supported sample type to f32 up front so the rest of
        // the pipeline stays format-agnostic.
        let stream = match format {
            SampleFormat::F32 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| sample);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::I16 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| sample as f32 / 32_768.0);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let dispatcher = dispatcher.clone();
                let dropped = dropped.clone();
                self.device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| {
                                (sample as f32 - 32_768.0) / 32_768.0
                            });
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play().context("failed to start microphone stream")?;
        let mut graph = CaptureGraph::new(stream);

        let mut accumulator = FrameAccumulator::new();
        let mut silence = SilenceTimer::new(cfg.amplitude_threshold, cfg.silence_timeout_ms);
        let mut metrics = CaptureMetrics::default();
        let mut now_ms = 0u64;
        let wait_time = Duration::from_millis(FRAME_MS);

        let stop_reason = loop {
            if now_ms >= cfg.max_capture_ms {
                break StopReason::MaxDuration;
            }
            if let Some(ref flag) = stop_flag {
                if flag.load(Ordering::Relaxed) {
                    break StopReason::ManualStop;
                }
            }
            match receiver.recv_timeout(wait_time) {
                Ok(frame) => {
                    let frame = convert_frame_to_target(
                        frame,
                        device_sample_rate,
                        TARGET_RATE,
                        FRAME_SAMPLES,
                    );
                    if frame.is_empty() {
                        continue;
                    }
                    now_ms = now_ms.saturating_add(FRAME_MS);
                    metrics.frames_processed += 1;

                    let amplitude = rms_amplitude(&frame);
                    if let Some(ref meter) = meter {
                        meter.set_level(amplitude);
                    }
                    let expired = silence.observe(amplitude, now_ms);
                    accumulator.push_frame(frame);
                    if expired {
                        break StopReason::Silence {
                            tail_ms: cfg.silence_timeout_ms,
                        };
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    // The device delivered nothing for a whole frame; keep the
                    // capture clock moving so the max-duration cap still holds.
                    now_ms = now_ms.saturating_add(FRAME_MS);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break StopReason::Error("audio stream disconnected".to_string());
                }
            }
        };

        // Every exit path releases the hardware before any encode/network work.
        graph.teardown();
        silence.cancel();
        if let Some(ref meter) = meter {
            meter.set_level(0.0);
        }

        metrics.capture_ms = now_ms;
        metrics.frames_dropped = dropped.load(Ordering::Relaxed);
        metrics.stop_reason = stop_reason;

        if accumulator.is_empty() {
            if matches!(metrics.stop_reason, StopReason::ManualStop) {
                return Ok(CaptureResult {
                    audio: Vec::new(),
                    metrics,
                });
            }
            return Err(anyhow!(
                "no samples captured from '{}'; check microphone permissions and availability. {}",
                self.device_name(),
                mic_permission_hint()
            ));
        }

        Ok(CaptureResult {
            audio: accumulator.into_audio(),
            metrics,
        })
    }
}

/// Pausable capture stream handle, seamed so graph teardown can be exercised
/// without audio hardware.
pub(super) trait StreamControl {
    fn halt(&self);
}

impl StreamControl for cpal::Stream {
    fn halt(&self) {
        if let Err(err) = self.pause() {
            log_debug(&format!("failed to pause input stream: {err}"));
        }
    }
}

/// Owns the live input stream. Teardown is guarded on the stream still being
/// present, so it is idempotent and safe to call from every exit path; `Drop`
/// covers panics between creation and the explicit call.
pub(super) struct CaptureGraph<S: StreamControl> {
    stream: Option<S>,
}

impl<S: StreamControl> CaptureGraph<S> {
    pub(super) fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub(super) fn teardown(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.halt();
            drop(stream);
        }
    }

    #[cfg(test)]
    pub(super) fn is_live(&self) -> bool {
        self.stream.is_some()
    }
}

impl<S: StreamControl> Drop for CaptureGraph<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}

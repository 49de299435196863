//! Audio capture, silence detection, and encoding pipeline.
//!
//! Provides microphone recording that stops itself after a fixed stretch of
//! silence. Audio is captured via CPAL, resampled to 16 kHz mono, and handed
//! to the caller as normalized f32 PCM ready for WAV encoding.

/// Sample rate the rest of the pipeline (and the transcription endpoint) expects.
pub const TARGET_RATE: u32 = 16_000;

/// Mono output regardless of the microphone layout.
pub const TARGET_CHANNELS: u16 = 1;

/// Samples per delivered frame at the target rate.
pub const FRAME_SAMPLES: usize = 1024;

/// Duration of one frame at the target rate, in milliseconds (64 ms).
pub const FRAME_MS: u64 = (FRAME_SAMPLES as u64 * 1000) / TARGET_RATE as u64;

mod capture;
mod dispatch;
mod meter;
mod playback;
mod recorder;
mod resample;
mod wav;

pub use capture::{
    CaptureConfig, CaptureMetrics, CaptureResult, FrameAccumulator, SilenceTimer, StopReason,
};
pub use meter::{rms_amplitude, LiveMeter};
pub use playback::{AudioSink, NullSink, RodioSink};
pub use recorder::Recorder;
pub use wav::encode_wav_mono_16k;

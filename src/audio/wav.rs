//! WAV container encoding for captured speech.

use super::{TARGET_CHANNELS, TARGET_RATE};
use anyhow::{Context, Result};
use std::io::Cursor;

/// Encode normalized mono samples as 16-bit PCM WAV declared at 16 kHz.
///
/// The input is expected to already be at the target rate (capture resamples
/// per frame), so the container just pins the format the transcription
/// endpoint wants. Fails explicitly rather than producing a truncated buffer.
pub fn encode_wav_mono_16k(samples: &[f32]) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: TARGET_CHANNELS,
        sample_rate: TARGET_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).context("failed to start WAV writer")?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * f32::from(i16::MAX)) as i16)
            .context("failed to write WAV sample")?;
    }
    writer.finalize().context("failed to finalize WAV container")?;

    Ok(cursor.into_inner())
}

//! Playback of synthesized reply audio.

use anyhow::{Context, Result};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Output seam so the round-trip logic can run without an audio device.
pub trait AudioSink: Send + Sync {
    /// Play an encoded audio buffer to completion.
    fn play(&self, bytes: &[u8]) -> Result<()>;
}

/// Default sink backed by the system output device. The backend sends WAV or
/// MP3; rodio's decoder handles both.
pub struct RodioSink;

impl AudioSink for RodioSink {
    fn play(&self, bytes: &[u8]) -> Result<()> {
        let (_stream, handle) =
            rodio::OutputStream::try_default().context("no audio output device available")?;
        let sink = rodio::Sink::try_new(&handle).context("failed to open audio output sink")?;
        let source = rodio::Decoder::new(Cursor::new(bytes.to_vec()))
            .context("failed to decode reply audio")?;
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}

/// Counting sink for tests: records playbacks without touching hardware.
#[derive(Debug, Default)]
pub struct NullSink {
    played: AtomicUsize,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play_count(&self) -> usize {
        self.played.load(Ordering::Relaxed)
    }
}

impl AudioSink for NullSink {
    fn play(&self, _bytes: &[u8]) -> Result<()> {
        self.played.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

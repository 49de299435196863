use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared live amplitude cell, updated once per captured frame by the audio
/// worker and read by the UI for the level indicator.
#[derive(Clone, Debug)]
pub struct LiveMeter {
    level_bits: Arc<AtomicU32>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            level_bits: Arc::new(AtomicU32::new(0.0f32.to_bits())),
        }
    }

    pub fn set_level(&self, amplitude: f32) {
        self.level_bits.store(amplitude.to_bits(), Ordering::Relaxed);
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Root-mean-square of a frame of normalized samples, used as the loudness
/// proxy for silence detection. Returns 0.0 for an empty frame.
pub fn rms_amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    energy.sqrt()
}

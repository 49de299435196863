//! Frame accumulation and silence-triggered stop decisions.
//!
//! The accumulator keeps every delivered frame in arrival order; the silence
//! timer decides when the speaker has stopped talking.

/// Tunables for one capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Normalized RMS level above which a frame counts as speech.
    pub amplitude_threshold: f32,
    /// Trailing silence required before the recording stops on its own.
    pub silence_timeout_ms: u64,
    /// Hard cap on a single session, for the case where silence never comes.
    pub max_capture_ms: u64,
    /// Capacity of the frame channel between the CPAL callback and the worker.
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            amplitude_threshold: 0.01,
            silence_timeout_ms: 1_000,
            max_capture_ms: 120_000,
            channel_capacity: 64,
        }
    }
}

/// Explains why a capture session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Silence { tail_ms: u64 },
    ManualStop,
    MaxDuration,
    Error(String),
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Silence { .. } => "silence",
            StopReason::ManualStop => "manual_stop",
            StopReason::MaxDuration => "max_duration",
            StopReason::Error(_) => "error",
        }
    }
}

/// Metrics collected during capture for observability and debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureMetrics {
    pub capture_ms: u64,
    pub frames_processed: usize,
    pub frames_dropped: usize,
    pub stop_reason: StopReason,
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self {
            capture_ms: 0,
            frames_processed: 0,
            frames_dropped: 0,
            stop_reason: StopReason::MaxDuration,
        }
    }
}

/// Caller-facing result: mono 16 kHz PCM plus session metrics.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub audio: Vec<f32>,
    pub metrics: CaptureMetrics,
}

/// Append-only store of captured frames. Frames are never mutated once pushed
/// and concatenation preserves arrival order.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    frames: Vec<Vec<f32>>,
    total_samples: usize,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, samples: Vec<f32>) {
        self.total_samples = self.total_samples.saturating_add(samples.len());
        self.frames.push(samples);
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Concatenate every frame in arrival order. Length-additive: the output
    /// holds exactly `total_samples` samples.
    pub fn into_audio(self) -> Vec<f32> {
        let mut audio = Vec::with_capacity(self.total_samples);
        for frame in self.frames {
            audio.extend(frame);
        }
        audio
    }
}

/// Edge-triggered silence timer: at most one deadline is outstanding per
/// session. A loud frame cancels it; a quiet frame arms it only if nothing is
/// pending; an expired deadline stops the recording.
#[derive(Debug)]
pub struct SilenceTimer {
    threshold: f32,
    timeout_ms: u64,
    deadline_ms: Option<u64>,
}

impl SilenceTimer {
    pub fn new(threshold: f32, timeout_ms: u64) -> Self {
        Self {
            threshold,
            timeout_ms,
            deadline_ms: None,
        }
    }

    /// Feed one frame's amplitude at capture-clock time `now_ms`. Returns true
    /// when the pending deadline has expired and the recording should stop.
    pub fn observe(&mut self, amplitude: f32, now_ms: u64) -> bool {
        if amplitude > self.threshold {
            self.deadline_ms = None;
            return false;
        }
        match self.deadline_ms {
            None => {
                self.deadline_ms = Some(now_ms.saturating_add(self.timeout_ms));
                false
            }
            Some(deadline) => now_ms >= deadline,
        }
    }

    /// Drop any pending deadline. Called on teardown so a stale timer can
    /// never fire against a finished session.
    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline_ms.is_some()
    }
}

//! Voice round trip: capture, transcribe, chat, play the spoken reply.
//!
//! The whole trip runs on a worker thread and reports progress over a
//! channel, so the UI thread only ever drains messages. A blank or
//! noise-only transcript short-circuits the trip before any chat request.

use crate::api::{AssistantApi, ChatReply};
use crate::audio::{
    encode_wav_mono_16k, AudioSink, CaptureConfig, CaptureMetrics, CaptureResult, LiveMeter,
    Recorder,
};
use crate::app::logging::log_debug_content;
use crate::log_debug;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Progress of one voice turn, in the order the UI should expect them.
#[derive(Debug, Clone)]
pub enum VoiceJobMessage {
    /// Microphone released; transcription is starting.
    CaptureEnded { metrics: CaptureMetrics },
    /// Transcript accepted; it is now the pending user message.
    TranscriptReady { text: String },
    /// The assistant answered the transcribed turn.
    ReplyReady { reply: ChatReply },
    PlaybackStarted,
    PlaybackFinished,
    /// Nothing usable was captured or transcribed; no chat request was made.
    Empty,
    Error(String),
}

/// Handle to an in-flight voice turn.
pub struct VoiceJob {
    receiver: mpsc::Receiver<VoiceJobMessage>,
    handle: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
}

impl VoiceJob {
    pub fn try_message(&self) -> Option<VoiceJobMessage> {
        self.receiver.try_recv().ok()
    }

    /// Ask the capture loop to stop at the next frame boundary.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Record from the microphone and run the full round trip on a worker thread.
pub fn start_voice_job(
    recorder: Arc<Mutex<Recorder>>,
    api: Arc<dyn AssistantApi>,
    sink: Arc<dyn AudioSink>,
    cfg: CaptureConfig,
    meter: Option<LiveMeter>,
) -> VoiceJob {
    let (sender, receiver) = mpsc::channel();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let capture_stop = stop_flag.clone();

    let handle = thread::spawn(move || {
        let captured = match recorder.lock() {
            Ok(recorder) => recorder.record_until_silence(&cfg, Some(capture_stop), meter),
            Err(_) => {
                let _ = sender.send(VoiceJobMessage::Error(
                    "Could not access the microphone: recorder is busy.".to_string(),
                ));
                return;
            }
        };

        let capture = match captured {
            Ok(capture) => capture,
            Err(err) => {
                log_debug(&format!("capture_failed: {err:#}"));
                let _ = sender.send(VoiceJobMessage::Error(format!(
                    "Could not access the microphone: {err}"
                )));
                return;
            }
        };

        log_voice_metrics(&capture.metrics);
        let _ = sender.send(VoiceJobMessage::CaptureEnded {
            metrics: capture.metrics.clone(),
        });
        run_round_trip(api.as_ref(), sink.as_ref(), capture, &sender);
    });

    VoiceJob {
        receiver,
        handle: Some(handle),
        stop_flag,
    }
}

/// Everything after capture. Separated from the thread spawn so tests can
/// drive it with fakes and a canned capture.
pub fn run_round_trip(
    api: &dyn AssistantApi,
    sink: &dyn AudioSink,
    capture: CaptureResult,
    sender: &mpsc::Sender<VoiceJobMessage>,
) {
    if capture.audio.is_empty() {
        let _ = sender.send(VoiceJobMessage::Empty);
        return;
    }

    let wav = match encode_wav_mono_16k(&capture.audio) {
        Ok(wav) => wav,
        Err(err) => {
            log_debug(&format!("wav_encode_failed: {err:#}"));
            let _ = sender.send(VoiceJobMessage::Error("Error encoding audio.".to_string()));
            return;
        }
    };

    let stt_started = Instant::now();
    let transcription = match api.transcribe(wav) {
        Ok(reply) => reply,
        Err(err) => {
            log_debug(&format!("transcribe_failed: {err}"));
            let _ = sender.send(VoiceJobMessage::Error("Error processing audio.".to_string()));
            return;
        }
    };
    tracing::debug!(elapsed_ms = stt_started.elapsed().as_millis() as u64, "transcription done");

    if let Some(error) = transcription.error {
        let _ = sender.send(VoiceJobMessage::Error(format!("Error: {error}")));
        return;
    }

    let text = sanitize_transcript(transcription.transcription.as_deref().unwrap_or_default());
    if text.is_empty() {
        let _ = sender.send(VoiceJobMessage::Empty);
        return;
    }
    log_debug_content(&format!("transcript: {text}"));
    let _ = sender.send(VoiceJobMessage::TranscriptReady { text: text.clone() });

    let reply = match api.chat(&text, true) {
        Ok(reply) => reply,
        Err(err) => {
            log_debug(&format!("voice_chat_failed: {err}"));
            let _ = sender.send(VoiceJobMessage::Error(
                "Error processing request.".to_string(),
            ));
            return;
        }
    };

    let audio = reply.audio.clone();
    let _ = sender.send(VoiceJobMessage::ReplyReady { reply });

    if let Some(encoded) = audio {
        match BASE64.decode(encoded.as_bytes()) {
            Ok(bytes) => {
                let _ = sender.send(VoiceJobMessage::PlaybackStarted);
                if let Err(err) = sink.play(&bytes) {
                    // The text reply already landed; a playback failure is
                    // only worth a log line.
                    log_debug(&format!("playback_failed: {err:#}"));
                }
                let _ = sender.send(VoiceJobMessage::PlaybackFinished);
            }
            Err(err) => {
                log_debug(&format!("audio_decode_failed: {err}"));
            }
        }
    }
}

/// Strip non-speech markers the transcription model emits for noise and
/// collapse whitespace. An empty result means "nothing was said".
pub fn sanitize_transcript(raw: &str) -> String {
    // Markers look like [BLANK_AUDIO], (wind blowing), *laughs*.
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    let markers = MARKERS
        .get_or_init(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|\*[^*]*\*").expect("literal pattern"));
    let stripped = markers.replace_all(raw, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn log_voice_metrics(metrics: &CaptureMetrics) {
    log_debug(&format!(
        "voice_metrics|capture_ms={}|frames_processed={}|frames_dropped={}|stop={}",
        metrics.capture_ms,
        metrics.frames_processed,
        metrics.frames_dropped,
        metrics.stop_reason.label()
    ));
}

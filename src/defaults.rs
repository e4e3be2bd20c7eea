//! Default configuration constants for voicsh.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default Voice Activity Detection (VAD) threshold.
///
/// This RMS-based threshold (0.0 to 1.0) determines when audio is considered speech.
/// A value of 0.02 is tuned for typical microphone input levels and provides
/// good sensitivity while filtering out background noise.
pub const VAD_THRESHOLD: f32 = 0.02;

/// Default silence duration in milliseconds before speech is considered ended.
///
/// 1500ms (1.5 seconds) allows for natural pauses in speech without prematurely
/// ending the recording session.
pub const SILENCE_DURATION_MS: u32 = 1500;

/// Default Whisper model name.
///
/// "base" (multilingual) supports auto-detection of any language.
/// Use "base.en" explicitly for English-only optimized transcription.
pub const DEFAULT_MODEL: &str = "base";

/// Default language code for transcription.
///
/// "auto" lets Whisper detect the spoken language automatically.
/// Set to a specific code (e.g., "en", "de") to force a language.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Suffix for English-only model variants.
pub const ENGLISH_ONLY_SUFFIX: &str = ".en";

/// Fixed duration, in seconds, of each chunk produced by the frame
/// assembler (C2).
pub const CHUNK_DURATION_SECS: f32 = 2.0;

/// How much rolling context (in seconds) the session controller keeps
/// available to the accurate transcriber once an utterance turns active.
pub const CONTEXT_SECONDS: f32 = 30.0;

/// Trailing silence, in seconds, after which an active session moves to
/// dispatching.
pub const SILENCE_SECONDS: f32 = 3.0;

/// Below this mean-abs-amplitude a chunk is too weak to analyze at all.
pub const VERY_WEAK_THRESHOLD: f32 = 0.003;

/// Below this, a chunk counts as silence rather than distant speech.
pub const SILENCE_THRESHOLD: f32 = 0.008;

/// Above this, a chunk counts as close (confident) speech.
pub const CLOSE_SPEECH_THRESHOLD: f32 = 0.02;

/// Above this (and below the close threshold) a chunk counts as speech.
pub const SPEECH_THRESHOLD: f32 = 0.01;

/// Above this (and below the speech threshold) a chunk counts as distant
/// speech rather than silence.
pub const DISTANT_SPEECH_THRESHOLD: f32 = 0.005;

/// A chunk whose energy is dominated by uniform noise rather than
/// speech-like variation is downgraded regardless of amplitude.
pub const MAX_NOISE_RATIO: f32 = 0.9;

/// Minimum fuzzy-match score (0-100, `strsim::jaro_winkler` scaled) for a
/// wake word/phrase to be accepted via the fuzzy matching steps.
pub const FUZZY_THRESHOLD: u8 = 80;

/// Minimum address-classifier confidence for an activation to be
/// accepted rather than logged-and-discarded.
pub const CLASSIFIER_THRESHOLD: f32 = 0.6;

/// Model file name for the cheap tier (C4), resolved under the
/// configured data directory's `models/` subdirectory.
pub const CHEAP_MODEL_FILENAME: &str = "ggml-tiny.bin";

/// Model file name for the accurate tier (C5), resolved the same way.
pub const ACCURATE_MODEL_FILENAME: &str = "ggml-base.bin";

/// How many seconds of unconsumed capture audio the live audio source will
/// buffer before it starts dropping the oldest samples to make room for
/// new ones. Several chunk-durations of headroom so a slow poll of
/// `read_samples` doesn't lose audio, without letting a stalled consumer
/// grow the buffer without bound.
pub const MAX_CAPTURE_BUFFER_SECONDS: f32 = 10.0;


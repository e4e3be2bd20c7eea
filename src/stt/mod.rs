//! Speech-to-text backends: the `Transcriber` trait plus the Whisper
//! implementation and test mocks. Used by both the cheap (C4) and accurate
//! (C5) transcription stages.

pub mod transcriber;
pub mod whisper;

pub use transcriber::{MockTranscriber, Transcriber, TranscriberConfig, TranscriptionResult};
pub use whisper::{WhisperConfig, WhisperTranscriber};

use crate::defaults;
use crate::error::{ListenError, Result};
use crate::pipeline::types::TranscriberTier;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of a transcription, including detected language and confidence.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// The transcribed text.
    pub text: String,
    /// Detected or configured language code (e.g., "en", "de"). Empty if unknown.
    pub language: String,
    /// Confidence score in 0.0..1.0, derived from segment probabilities.
    pub confidence: f32,
}

impl TranscriptionResult {
    /// Create a result with just text (unknown language, full confidence).
    pub fn from_text(text: String) -> Self {
        Self {
            text,
            language: String::new(),
            confidence: 1.0,
        }
    }
}

/// Trait for speech-to-text transcription. Implemented by both ASR tiers
/// (cheap/low-latency and accurate/high-quality) and by the mock used in
/// tests — the pipeline only ever depends on this trait, never a concrete
/// backend.
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples to text.
    ///
    /// # Arguments
    /// * `audio` - normalized float32 PCM in `[-1.0, 1.0]`, 16kHz mono
    ///
    /// # Returns
    /// Transcription result with text, language, and confidence, or error.
    fn transcribe(&self, audio: &[f32]) -> Result<TranscriptionResult>;

    /// Get the name of the loaded model.
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready.
    fn is_ready(&self) -> bool;

    /// Which tier this transcriber fills in the pipeline. Used to tag
    /// `Transcript` values with their origin.
    fn tier(&self) -> TranscriberTier;
}

/// Implement `Transcriber` for `Arc<T>` to allow sharing across sessions.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[f32]) -> Result<TranscriptionResult> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn tier(&self) -> TranscriberTier {
        (**self).tier()
    }
}

/// Configuration for transcriber initialization.
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    pub model_path: PathBuf,
    pub language: String,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(""),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Mock transcriber for testing.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    confidence: f32,
    language: String,
    delay: Option<std::time::Duration>,
    tier: TranscriberTier,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            confidence: 1.0,
            language: String::new(),
            delay: None,
            tier: TranscriberTier::Cheap,
        }
    }

    /// Configure the mock to return a specific response.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the mock to return a specific confidence score.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Configure the mock to return a specific language.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Configure the mock to sleep before returning (simulates slow transcription).
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Configure which tier this mock reports itself as.
    pub fn with_tier(mut self, tier: TranscriberTier) -> Self {
        self.tier = tier;
        self
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio: &[f32]) -> Result<TranscriptionResult> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.should_fail {
            Err(ListenError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(TranscriptionResult {
                text: self.response.clone(),
                language: self.language.clone(),
                confidence: self.confidence,
            })
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }

    fn tier(&self) -> TranscriberTier {
        self.tier
    }
}

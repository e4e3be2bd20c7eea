//! Whisper-based speech-to-text transcription.
//!
//! Provides a Whisper implementation of the `Transcriber` trait using
//! whisper-rs. The same struct backs both ASR tiers — which one a given
//! instance fills is purely a function of which `WhisperConfig` (and thus
//! which model file) it was constructed with, set via `with_tier`.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed. To build with Whisper support:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::defaults;
use crate::error::{ListenError, Result};
use crate::pipeline::types::TranscriberTier;
use crate::stt::transcriber::{Transcriber, TranscriptionResult};
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::Mutex;
#[cfg(feature = "whisper")]
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Configuration for a Whisper transcriber instance.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file.
    pub model_path: PathBuf,
    /// Language code (e.g., "en", "es", "fr").
    pub language: String,
    /// Number of threads for inference (None = auto-detect).
    pub threads: Option<usize>,
    /// Which tier this instance fills. The cheap tier is typically backed
    /// by a small/quantized model, the accurate tier by a larger one.
    pub tier: TranscriberTier,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
            tier: TranscriberTier::Cheap,
        }
    }
}

/// Whisper-based transcriber implementation.
///
/// Uses whisper-rs for speech-to-text transcription. The WhisperContext is
/// wrapped in a Mutex to ensure thread safety.
///
/// # Feature Gate
///
/// This type is only available when the `whisper` feature is enabled.
#[cfg(feature = "whisper")]
#[derive(Debug)]
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

/// Whisper-based transcriber placeholder (without whisper feature).
///
/// This is a stub implementation that returns errors when used. Enable the
/// `whisper` feature to use real transcription.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperTranscriber {
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Create a new Whisper transcriber.
    ///
    /// # Errors
    /// Returns `ListenError::ModelNotFound` if the model file doesn't exist,
    /// `ListenError::ModelLoad` if loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(ListenError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let context_params = WhisperContextParameters::default();
        let context = WhisperContext::new_with_params(
            config.model_path.to_str().ok_or_else(|| ListenError::ModelLoad {
                message: "invalid UTF-8 in model path".to_string(),
            })?,
            context_params,
        )
        .map_err(|e| ListenError::ModelLoad {
            message: format!("failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    /// Create a new Whisper transcriber (stub implementation).
    ///
    /// Returns an error indicating that the whisper feature is not enabled,
    /// unless the model file is simply missing, in which case that error
    /// takes priority so callers see a consistent failure regardless of
    /// which build they're running.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(ListenError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self { config, model_name })
    }

    /// Get the configuration.
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio: &[f32]) -> Result<TranscriptionResult> {
        let mut context = self
            .context
            .lock()
            .map_err(|e| ListenError::Transcription {
                message: format!("failed to acquire context lock: {}", e),
            })?;

        let mut state = context.create_state().map_err(|e| ListenError::Transcription {
            message: format!("failed to create Whisper state: {}", e),
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.config.language));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, audio)
            .map_err(|e| ListenError::Transcription {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| ListenError::Transcription {
                message: format!("failed to get segment count: {}", e),
            })?;

        let mut text = String::new();
        for i in 0..num_segments {
            let segment_text = state
                .full_get_segment_text(i)
                .map_err(|e| ListenError::Transcription {
                    message: format!("failed to get segment text: {}", e),
                })?;
            text.push_str(&segment_text);
        }

        Ok(TranscriptionResult {
            text: text.trim().to_string(),
            language: self.config.language.clone(),
            confidence: 1.0,
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn tier(&self) -> TranscriberTier {
        self.config.tier
    }
}

#[cfg(not(feature = "whisper"))]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, _audio: &[f32]) -> Result<TranscriptionResult> {
        Err(ListenError::Transcription {
            message: "whisper feature not enabled, rebuild with --features whisper".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn tier(&self) -> TranscriberTier {
        self.config.tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.language, "en");
        assert_eq!(config.threads, None);
        assert_eq!(config.tier, TranscriberTier::Cheap);
    }

    #[test]
    fn test_whisper_config_custom() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/custom/model.bin"),
            language: "es".to_string(),
            threads: Some(4),
            tier: TranscriberTier::Accurate,
        };
        assert_eq!(config.model_path, PathBuf::from("/custom/model.bin"));
        assert_eq!(config.language, "es");
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.tier, TranscriberTier::Accurate);
    }

    #[test]
    fn test_whisper_transcriber_new_fails_for_missing_model() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            language: "en".to_string(),
            threads: None,
            tier: TranscriberTier::Cheap,
        };

        let result = WhisperTranscriber::new(config);
        assert!(result.is_err());

        match result {
            Err(ListenError::ModelNotFound { path }) => {
                assert_eq!(path, "/nonexistent/model.bin");
            }
            _ => panic!("Expected ModelNotFound error"),
        }
    }

    #[test]
    fn test_whisper_transcriber_model_name_extraction() {
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path();

        let model_dir = temp_path.parent().unwrap();
        let model_path = model_dir.join("ggml-base.bin");
        std::fs::write(&model_path, b"fake model data").unwrap();

        let config = WhisperConfig {
            model_path: model_path.clone(),
            language: "en".to_string(),
            threads: None,
            tier: TranscriberTier::Cheap,
        };

        let result = WhisperTranscriber::new(config);

        #[cfg(feature = "whisper")]
        assert!(result.is_err(), "should fail with invalid model file");

        #[cfg(not(feature = "whisper"))]
        {
            assert!(result.is_ok(), "stub should succeed if file exists");
            let transcriber = result.unwrap();
            assert_eq!(transcriber.model_name(), "ggml-base");
        }

        std::fs::remove_file(&model_path).unwrap();
    }

    #[test]
    fn test_whisper_config_clone() {
        let config = WhisperConfig::default();
        let cloned = config.clone();
        assert_eq!(config.model_path, cloned.model_path);
        assert_eq!(config.language, cloned.language);
        assert_eq!(config.threads, cloned.threads);
    }

    #[test]
    fn test_whisper_config_debug() {
        let config = WhisperConfig::default();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("WhisperConfig"));
        assert!(debug_str.contains("model_path"));
        assert!(debug_str.contains("language"));
    }

    #[test]
    fn test_whisper_transcriber_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<WhisperTranscriber>();
        assert_sync::<WhisperTranscriber>();
    }

    #[test]
    fn test_whisper_transcriber_implements_transcriber_trait() {
        fn accepts_transcriber(_t: &dyn Transcriber) {}
        let _ = accepts_transcriber;
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn test_stub_transcriber_reports_configured_tier() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = WhisperConfig {
            model_path: temp_file.path().to_path_buf(),
            language: "en".to_string(),
            threads: None,
            tier: TranscriberTier::Accurate,
        };
        let transcriber = WhisperTranscriber::new(config).unwrap();
        assert_eq!(transcriber.tier(), TranscriberTier::Accurate);
        assert!(!transcriber.is_ready());
    }

    // Integration tests that require an actual model file. Marked #[ignore];
    // run manually with a real model.

    #[test]
    #[ignore]
    fn test_whisper_transcriber_with_real_model() {
        let model_path = PathBuf::from("models/ggml-base.en.bin");
        if !model_path.exists() {
            panic!(
                "Model not found at {:?}. Download it before running this test.",
                model_path
            );
        }

        let config = WhisperConfig {
            model_path,
            language: "en".to_string(),
            threads: Some(4),
            tier: TranscriberTier::Accurate,
        };

        let transcriber = WhisperTranscriber::new(config).unwrap();
        assert!(transcriber.is_ready());
        assert_eq!(transcriber.model_name(), "ggml-base.en");
    }

    #[test]
    #[ignore]
    fn test_whisper_transcribe_with_real_audio() {
        let model_path = PathBuf::from("models/ggml-base.en.bin");
        if !model_path.exists() {
            panic!(
                "Model not found at {:?}. Download it before running this test.",
                model_path
            );
        }

        let config = WhisperConfig {
            model_path,
            language: "en".to_string(),
            threads: Some(4),
            tier: TranscriberTier::Accurate,
        };

        let transcriber = WhisperTranscriber::new(config).unwrap();

        let audio = vec![0.0f32; 16000];
        let result = transcriber.transcribe(&audio);

        assert!(result.is_ok());
        println!("Transcription result: '{}'", result.unwrap().text);
    }
}

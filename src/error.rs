//! Error types for the voice ingress pipeline.

use thiserror::Error;

/// The five error kinds recognised by the pipeline. Each worker converts
/// whatever it sees at its boundary into one of these before it ever reaches
/// the session controller.
#[derive(Error, Debug)]
pub enum ListenError {
    // DeviceError: fatal to the voice path, exit code 2.
    #[error("audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("audio device error: {message}")]
    Device { message: String },

    // ModelLoadError: policy depends on which model (see pipeline::error mapping).
    #[error("model not found at {path}")]
    ModelNotFound { path: String },

    #[error("model failed to load: {message}")]
    ModelLoad { message: String },

    // TranscriptionError: never fatal.
    #[error("transcription failed: {message}")]
    Transcription { message: String },

    #[error("transcription timed out after {millis}ms")]
    TranscriptionTimeout { millis: u64 },

    // IOError: log, skip the artifact, keep running.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write artifact {path}: {message}")]
    ArtifactWrite { path: String, message: String },

    // ConfigError: fatal before pipeline start, exit code 1.
    #[error("invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Generic error for cases not covered above.
    #[error("{0}")]
    Other(String),
}

impl ListenError {
    /// Exit code this error should produce if it aborts startup, per the
    /// command-line contract. Returns `None` for errors that never abort
    /// the whole process (transcription/IO failures are always recovered
    /// from in place).
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ListenError::AudioDeviceNotFound { .. } | ListenError::Device { .. } => Some(2),
            ListenError::ModelNotFound { .. } | ListenError::ModelLoad { .. } => Some(3),
            ListenError::ConfigInvalidValue { .. } | ListenError::ConfigParse(_) => Some(1),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ListenError>;

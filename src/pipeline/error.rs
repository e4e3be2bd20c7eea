//! Error types and reporting for continuous pipeline stations.

use std::fmt;

/// Errors that can occur during station processing.
#[derive(Debug, Clone)]
pub enum StationError {
    /// Recoverable error that allows the station to continue processing.
    Recoverable(String),
    /// Fatal error that requires the station to shut down.
    Fatal(String),
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationError::Recoverable(msg) => write!(f, "Recoverable error: {}", msg),
            StationError::Fatal(msg) => write!(f, "Fatal error: {}", msg),
        }
    }
}

impl std::error::Error for StationError {}

/// Trait for reporting station errors.
pub trait ErrorReporter: Send + Sync {
    /// Reports an error from a station.
    fn report(&self, station: &str, error: &StationError);
}

/// Simple error reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, station: &str, error: &StationError) {
        eprintln!("[{}] {}", station, error);
    }
}

/// Print a message to stderr, clearing any active level meter line first.
pub fn eprintln_clear(msg: &str) {
    eprint!("\r\x1b[2K");
    eprintln!("{}", msg);
}

/// Maps the crate-wide error taxonomy onto the binary Recoverable/Fatal split
/// a `Station` understands. `DeviceError`, `ModelLoadError` and `ConfigError`
/// are fatal; `TranscriptionError` and `IOError` are recoverable.
impl From<crate::error::ListenError> for StationError {
    fn from(err: crate::error::ListenError) -> Self {
        use crate::error::ListenError;
        match err {
            ListenError::AudioDeviceNotFound { .. }
            | ListenError::Device { .. }
            | ListenError::ModelNotFound { .. }
            | ListenError::ModelLoad { .. }
            | ListenError::ConfigInvalidValue { .. }
            | ListenError::ConfigParse(_) => StationError::Fatal(err.to_string()),
            ListenError::Transcription { .. }
            | ListenError::TranscriptionTimeout { .. }
            | ListenError::Io(_)
            | ListenError::ArtifactWrite { .. }
            | ListenError::Other(_) => StationError::Recoverable(err.to_string()),
        }
    }
}

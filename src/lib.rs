//! goose-listen - always-on ambient voice-and-screen ingress for the Goose
//! assistant.
//!
//! Ten components, wired in `pipeline::orchestrator`: audio capture feeds
//! a frame assembler, whose fixed-duration chunks are classified by the
//! signal analyzer and fed to a cheap transcriber for wake-word scanning;
//! a hit promotes the session into active listening, where a second,
//! accurate transcriber re-transcribes on dispatch. An independent hotkey
//! path captures the screen and a typed instruction on demand.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod stt;

// Composition root - needs every pluggable component's real implementation.
#[cfg(all(feature = "cpal-audio", feature = "whisper", feature = "cli"))]
pub mod app;

// Core traits (source → process → sink)
pub use audio::recorder::AudioSource;
pub use stt::transcriber::Transcriber;

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig};

// Error handling
pub use error::{ListenError, Result};

// Config
pub use config::Config;

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

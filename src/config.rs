//! Ambient configuration: the knobs every pipeline component reads,
//! loaded from an optional TOML file and overridable by CLI flags.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub signal: SignalConfig,
    pub wake: WakeConfig,
    pub session: SessionConfig,
    pub paths: PathsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            signal: SignalConfig::default(),
            wake: WakeConfig::default(),
            session: SessionConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// Audio capture configuration (C1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub language: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            channels: 1,
            language: defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Signal analysis thresholds (C3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalConfig {
    pub silence_threshold: f32,
    pub speech_threshold: f32,
    pub noise_ratio: f32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            silence_threshold: defaults::SILENCE_THRESHOLD,
            speech_threshold: defaults::SPEECH_THRESHOLD,
            noise_ratio: defaults::MAX_NOISE_RATIO,
        }
    }
}

/// Wake detection and address classification (C6/C7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WakeConfig {
    pub fuzzy_threshold: u8,
    pub classifier_threshold: f32,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: defaults::FUZZY_THRESHOLD,
            classifier_threshold: defaults::CLASSIFIER_THRESHOLD,
        }
    }
}

/// Session controller timing (C8).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub context_seconds: f32,
    pub silence_seconds: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_seconds: defaults::CONTEXT_SECONDS,
            silence_seconds: defaults::SILENCE_SECONDS,
        }
    }
}

/// Where artifacts get written (C9), and where the ASR model files for
/// the cheap and accurate tiers (C4/C5) are expected to live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub recordings_dir: PathBuf,
    pub data_dir: PathBuf,
    pub cheap_model_path: PathBuf,
    pub accurate_model_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = dirs_home();
        let data_dir = home.join(".local/share/goose-perception");
        Self {
            recordings_dir: data_dir.join("recordings"),
            cheap_model_path: data_dir.join("models").join(defaults::CHEAP_MODEL_FILENAME),
            accurate_model_path: data_dir.join("models").join(defaults::ACCURATE_MODEL_FILENAME),
            data_dir,
        }
    }
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Loads configuration from a TOML file. Missing keys fall back to
    /// their defaults via `#[serde(default)]` on every nested struct.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration, validated (defaults are always
    /// valid, but this keeps the invariant in one place).
    pub fn load_or_default(path: Option<&Path>) -> crate::error::Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(crate::error::ListenError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.signal.silence_threshold) {
            return Err(crate::error::ListenError::ConfigInvalidValue {
                key: "signal.silence_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.wake.classifier_threshold) {
            return Err(crate::error::ListenError::ConfigInvalidValue {
                key: "wake.classifier_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.session.context_seconds <= 0.0 {
            return Err(crate::error::ListenError::ConfigInvalidValue {
                key: "session.context_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.session.silence_seconds <= 0.0 {
            return Err(crate::error::ListenError::ConfigInvalidValue {
                key: "session.silence_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

//! Command-line surface for the voice ingress binary.
//!
//! Flag names and defaults are contractual (§6): every flag here maps
//! directly onto a `Config` field, with the CLI value taking precedence
//! over whatever a `--config` file supplied.

use clap::Parser;
use std::path::PathBuf;

/// Always-on ambient voice-and-screen assistant front-end.
#[derive(Parser, Debug)]
#[command(name = "goose-listen", version, about = "Voice ingress pipeline for the Goose assistant")]
pub struct Cli {
    /// ASR language hint (e.g. en, de, fr). Defaults to auto-detect.
    #[arg(long, value_name = "CODE")]
    pub language: Option<String>,

    /// Audio input device name or index.
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Number of input channels.
    #[arg(long, value_name = "N")]
    pub channels: Option<u16>,

    /// Print available audio input devices and exit.
    #[arg(long)]
    pub list_devices: bool,

    /// Output directory for per-utterance conversation artifacts.
    #[arg(long, value_name = "PATH")]
    pub recordings_dir: Option<PathBuf>,

    /// How many seconds of rolling pre-roll context to retain while passive.
    #[arg(long, value_name = "SECONDS")]
    pub context_seconds: Option<f32>,

    /// Consecutive seconds of trailing silence that ends an utterance.
    #[arg(long, value_name = "SECONDS")]
    pub silence_seconds: Option<f32>,

    /// Fuzzy wake-word match threshold, 0..100.
    #[arg(long, value_name = "0..100")]
    pub fuzzy_threshold: Option<u8>,

    /// Address classifier acceptance threshold, 0.0..1.0.
    #[arg(long, value_name = "0.0..1.0")]
    pub classifier_threshold: Option<f32>,

    /// Mean-amplitude threshold below which a chunk is classified Silence.
    #[arg(long, value_name = "FLOAT")]
    pub silence_threshold: Option<f32>,

    /// Mean-amplitude threshold above which a chunk counts as Speech.
    #[arg(long, value_name = "FLOAT")]
    pub speech_threshold: Option<f32>,

    /// Maximum noise ratio before a loud chunk is downgraded from Speech.
    #[arg(long, value_name = "FLOAT")]
    pub noise_ratio: Option<f32>,

    /// Path to an optional TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Per-user data directory override (spoken.txt, words.json, ACTIVITY-LOG.md).
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output (-v: wake detector decisions, -vv: full chunk metrics).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Applies every CLI override onto a loaded `Config`, returning the
    /// merged result. Only flags the user actually passed take effect;
    /// everything else keeps whatever `Config::load_or_default` produced.
    pub fn apply_overrides(&self, mut config: crate::config::Config) -> crate::config::Config {
        if let Some(language) = &self.language {
            config.audio.language = language.clone();
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(channels) = self.channels {
            config.audio.channels = channels;
        }
        if let Some(recordings_dir) = &self.recordings_dir {
            config.paths.recordings_dir = recordings_dir.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.paths.data_dir = data_dir.clone();
        }
        if let Some(context_seconds) = self.context_seconds {
            config.session.context_seconds = context_seconds;
        }
        if let Some(silence_seconds) = self.silence_seconds {
            config.session.silence_seconds = silence_seconds;
        }
        if let Some(fuzzy_threshold) = self.fuzzy_threshold {
            config.wake.fuzzy_threshold = fuzzy_threshold;
        }
        if let Some(classifier_threshold) = self.classifier_threshold {
            config.wake.classifier_threshold = classifier_threshold;
        }
        if let Some(silence_threshold) = self.silence_threshold {
            config.signal.silence_threshold = silence_threshold;
        }
        if let Some(speech_threshold) = self.speech_threshold {
            config.signal.speech_threshold = speech_threshold;
        }
        if let Some(noise_ratio) = self.noise_ratio {
            config.signal.noise_ratio = noise_ratio;
        }
        config
    }
}

//! Composition root: wires real implementations of every pluggable
//! component (audio source, both ASR tiers, address classifier, sink)
//! into a `Pipeline` and runs it, plus the independent hotkey path.

use crate::audio::capture::{self, CpalAudioSource};
use crate::audio::recorder::AudioSource;
use crate::clock::SystemClock;
use crate::cli::Cli;
use crate::config::Config;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::address_classifier::RuleBasedClassifier;
use crate::pipeline::frame_assembler::FrameAssemblerConfig;
use crate::pipeline::orchestrator::{Pipeline, PipelineConfig};
use crate::pipeline::session_controller::SessionControllerConfig;
use crate::pipeline::signal_analyzer::SignalAnalyzerConfig;
use crate::pipeline::transcript_sink::{
    HeuristicPosTagger, NoopAgentInvoker, TranscriptSink, TranscriptSinkConfig,
};
use crate::pipeline::types::TranscriberTier;
use crate::pipeline::wake_detector::WakeDetectorConfig;
use crate::stt::whisper::{WhisperConfig, WhisperTranscriber};
use std::sync::Arc;

/// Runs the voice ingress pipeline to completion (or forever, for a live
/// audio source). Returns before constructing anything if `--list-devices`
/// was passed.
pub fn run(cli: Cli) -> Result<()> {
    capture::suppress_audio_warnings();

    if cli.list_devices {
        for name in capture::list_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let config = cli.apply_overrides(Config::load_or_default(cli.config.as_deref())?);

    #[cfg(feature = "hotkey")]
    spawn_hotkey_listener(&config);

    let source: Box<dyn AudioSource> =
        Box::new(CpalAudioSource::new(config.audio.device.as_deref())?);

    let cheap = Arc::new(WhisperTranscriber::new(WhisperConfig {
        model_path: config.paths.cheap_model_path.clone(),
        language: config.audio.language.clone(),
        threads: None,
        tier: TranscriberTier::Cheap,
    })?);

    // Unlike the cheap tier, a missing accurate model degrades rather than
    // aborts: the session controller falls back to cheap-tier transcripts
    // for an active utterance when no accurate transcriber is available.
    let accurate = match WhisperTranscriber::new(WhisperConfig {
        model_path: config.paths.accurate_model_path.clone(),
        language: config.audio.language.clone(),
        threads: None,
        tier: TranscriberTier::Accurate,
    }) {
        Ok(transcriber) => Some(Arc::new(transcriber)),
        Err(e) => {
            eprintln!(
                "accurate model unavailable ({e}), degrading to cheap-tier transcripts while active"
            );
            None
        }
    };

    let sink = TranscriptSink::new(
        TranscriptSinkConfig {
            recordings_dir: config.paths.recordings_dir.clone(),
            data_dir: config.paths.data_dir.clone(),
            sample_rate: config.audio.sample_rate,
        },
        NoopAgentInvoker,
        HeuristicPosTagger,
    );

    let pipeline_config = PipelineConfig {
        frame_assembler: FrameAssemblerConfig {
            sample_rate: config.audio.sample_rate,
            chunk_duration_secs: defaults::CHUNK_DURATION_SECS,
        },
        signal_analyzer: SignalAnalyzerConfig {
            very_weak_threshold: defaults::VERY_WEAK_THRESHOLD,
            silence_threshold: config.signal.silence_threshold,
            close_threshold: defaults::CLOSE_SPEECH_THRESHOLD,
            speech_threshold: config.signal.speech_threshold,
            distant_threshold: defaults::DISTANT_SPEECH_THRESHOLD,
            max_noise_ratio: config.signal.noise_ratio,
            sample_rate: config.audio.sample_rate,
        },
        session_controller: SessionControllerConfig {
            chunk_duration_secs: defaults::CHUNK_DURATION_SECS,
            context_seconds: config.session.context_seconds,
            silence_seconds: config.session.silence_seconds,
        },
        wake_detector: WakeDetectorConfig {
            fuzzy_threshold: config.wake.fuzzy_threshold,
            classifier_threshold: config.wake.classifier_threshold,
            verbosity: cli.verbose,
        },
        verbosity: cli.verbose,
        quiet: cli.quiet,
    };

    let mut pipeline = Pipeline::new(
        pipeline_config,
        source,
        RuleBasedClassifier,
        Arc::new(SystemClock),
        cheap,
        accurate,
        sink,
    );

    pipeline.run()
}

/// Spawns the hotkey listener (C10) on its own thread, independent of the
/// voice pipeline above. A cancelled prompt or a capture failure is logged
/// and dropped; the listener keeps running either way.
#[cfg(feature = "hotkey")]
fn spawn_hotkey_listener(config: &Config) {
    use crate::pipeline::hotkey::{
        HotkeyChord, HotkeyConfig, HotkeyController, HotkeyOutcome, InstructionPrompt,
        ScreenCapturer,
    };
    use crate::pipeline::transcript_sink::timestamp_slug;
    use std::path::Path;

    struct NoopCapturer;
    impl ScreenCapturer for NoopCapturer {
        fn capture(&self, destination: &Path) -> Result<()> {
            std::fs::write(destination, b"")?;
            Ok(())
        }
    }

    struct NoPrompt;
    impl InstructionPrompt for NoPrompt {
        fn prompt(&self) -> Option<String> {
            None
        }
    }

    let recordings_dir = config.paths.recordings_dir.clone();
    let data_dir = config.paths.data_dir.clone();
    let sample_rate = config.audio.sample_rate;

    std::thread::spawn(move || {
        let sink = TranscriptSink::new(
            TranscriptSinkConfig {
                recordings_dir,
                data_dir,
                sample_rate,
            },
            NoopAgentInvoker,
            HeuristicPosTagger,
        );
        let controller = HotkeyController::new(
            HotkeyConfig {
                chord: HotkeyChord::default(),
                screenshot_dir: std::env::temp_dir(),
            },
            NoopCapturer,
            NoPrompt,
        );

        crate::pipeline::hotkey::listener::listen(HotkeyChord::default(), move || {
            let slug = timestamp_slug();
            match controller.trigger(&slug) {
                Ok(HotkeyOutcome::Confirmed {
                    screenshot_path,
                    instruction,
                }) => {
                    if let Err(e) = sink.handle_screen(&slug, &screenshot_path, &instruction) {
                        eprintln!("failed to write screen conversation artifact: {e}");
                    }
                }
                Ok(HotkeyOutcome::Cancelled) => {}
                Err(e) => eprintln!("hotkey trigger failed: {e}"),
            }
        });
    });
}

//! Voice ingress pipeline: ten components, most running as a dedicated
//! `Station` thread wired to its neighbours by bounded crossbeam
//! channels, plus the session controller (which fans out conditionally)
//! and the hotkey path (which runs independently of the rest).

pub mod address_classifier;
pub mod error;
pub mod frame_assembler;
pub mod hotkey;
pub mod orchestrator;
pub mod session_controller;
pub mod signal_analyzer;
pub mod station;
pub mod transcript_sink;
pub mod transcription_worker;
pub mod types;
pub mod wake_detector;

pub use address_classifier::{AddressClassifier, RuleBasedClassifier};
pub use error::{ErrorReporter, LogReporter, StationError};
pub use frame_assembler::{FrameAssembler, FrameAssemblerConfig, FrameAssemblerStation};
pub use hotkey::{
    HotkeyChord, HotkeyConfig, HotkeyController, HotkeyOutcome, InstructionPrompt, ScreenCapturer,
    UtteranceOrigin,
};
pub use orchestrator::{Pipeline, PipelineConfig};
pub use session_controller::{
    ControllerAction, SessionController, SessionControllerConfig, SessionState,
};
pub use signal_analyzer::{SignalAnalyzerConfig, SignalAnalyzerStation};
pub use station::{Station, StationRunner};
pub use transcript_sink::{
    AgentInvoker, HeuristicPosTagger, NoopAgentInvoker, PosTagger, TranscriptSink,
    TranscriptSinkConfig, timestamp_slug,
};
pub use transcription_worker::{
    AccurateOutcome, AccurateRequest, AccurateStation, CheapOutcome, CheapRequest, CheapStation,
};
pub use types::{
    AnalyzedChunk, AudioChunk, AudioFrame, ChunkClass, ChunkMetrics, Transcript, TranscriberTier,
};
pub use wake_detector::{MatchKind, WakeDetection, WakeDetector, WakeDetectorConfig};

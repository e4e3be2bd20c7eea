//! Wires C1-C9 together: audio capture feeds the frame assembler, which
//! feeds the signal analyzer, whose output drives the cheap transcriber
//! and the session controller; the controller's dispatch requests go to
//! the accurate transcriber, and finished utterances go to the sink.
//! The hotkey path (C10) is independent and not wired in here.

use crate::audio::recorder::AudioSource;
use crate::clock::Clock;
use crate::error::Result;
use crate::pipeline::address_classifier::AddressClassifier;
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::pipeline::frame_assembler::{FrameAssembler, FrameAssemblerConfig};
use crate::pipeline::session_controller::{
    ControllerAction, SessionController, SessionControllerConfig, SessionState,
};
use crate::pipeline::signal_analyzer::{self, SignalAnalyzerConfig};
use crate::pipeline::station::StationRunner;
use crate::pipeline::transcript_sink::{AgentInvoker, PosTagger, TranscriptSink, timestamp_slug};
use crate::pipeline::transcription_worker::{
    AccurateOutcome, AccurateRequest, AccurateStation, CheapOutcome, CheapRequest, CheapStation,
};
use crate::pipeline::types::{AnalyzedChunk, AudioChunk, AudioFrame, Transcript, TranscriberTier};
use crate::pipeline::wake_detector::WakeDetectorConfig;
use crate::stt::transcriber::Transcriber;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::time::Instant;

/// Everything the orchestrator needs to run the pipeline end to end.
#[derive(Clone)]
pub struct PipelineConfig {
    pub frame_assembler: FrameAssemblerConfig,
    pub signal_analyzer: SignalAnalyzerConfig,
    pub session_controller: SessionControllerConfig,
    pub wake_detector: WakeDetectorConfig,
    pub verbosity: u8,
    pub quiet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_assembler: FrameAssemblerConfig::default(),
            signal_analyzer: SignalAnalyzerConfig::default(),
            session_controller: SessionControllerConfig::default(),
            wake_detector: WakeDetectorConfig::default(),
            verbosity: 0,
            quiet: false,
        }
    }
}

/// Drives the pipeline from an `AudioSource` to a `TranscriptSink` on the
/// calling thread. The session controller itself is not split across
/// per-station threads the way the signal analyzer alone is: its
/// branching logic means one place has to see every chunk and every
/// transcript in order, and a single control loop reading directly off
/// the audio source keeps that order without shuttling chunks across
/// multiple channels. Transcription is the exception — both ASR tiers
/// run on their own worker threads so a slow `transcribe()` call never
/// stalls audio capture.
pub struct Pipeline<C, Cheap, Accurate, A, P>
where
    C: AddressClassifier,
    Cheap: Transcriber + 'static,
    Accurate: Transcriber + 'static,
    A: AgentInvoker,
    P: PosTagger,
{
    config: PipelineConfig,
    source: Box<dyn AudioSource>,
    frame_assembler: FrameAssembler,
    controller: SessionController<C>,
    cheap_request_tx: Sender<CheapRequest>,
    cheap_result_rx: Receiver<CheapOutcome>,
    // Kept only to own the worker thread for the pipeline's lifetime; the
    // request/reply channels above are the actual interface to it.
    #[allow(dead_code)]
    cheap_runner: StationRunner<CheapStation<Cheap>>,
    accurate_request_tx: Option<Sender<AccurateRequest>>,
    accurate_result_rx: Option<Receiver<AccurateOutcome>>,
    #[allow(dead_code)]
    accurate_runner: Option<StationRunner<AccurateStation<Accurate>>>,
    sink: TranscriptSink<A, P>,
    error_reporter: Arc<dyn ErrorReporter>,
    sequence: u64,
}

impl<C, Cheap, Accurate, A, P> Pipeline<C, Cheap, Accurate, A, P>
where
    C: AddressClassifier,
    Cheap: Transcriber + 'static,
    Accurate: Transcriber + 'static,
    A: AgentInvoker,
    P: PosTagger,
{
    /// `accurate` is `None` when the accurate model failed to load; the
    /// orchestrator then substitutes cheap-tier text everywhere the
    /// accurate transcriber would otherwise have been consulted.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn AudioSource>,
        classifier: C,
        clock: Arc<dyn Clock>,
        cheap: Arc<Cheap>,
        accurate: Option<Arc<Accurate>>,
        sink: TranscriptSink<A, P>,
    ) -> Self {
        let controller = SessionController::new(
            config.session_controller,
            config.wake_detector,
            classifier,
            clock,
        );

        let error_reporter: Arc<dyn ErrorReporter> = Arc::new(LogReporter);

        let (cheap_request_tx, cheap_request_rx) = bounded(1);
        let (cheap_result_tx, cheap_result_rx) = bounded(1);
        let cheap_runner = StationRunner::spawn(
            CheapStation::new(cheap),
            cheap_request_rx,
            cheap_result_tx,
            error_reporter.clone(),
        );

        let (accurate_request_tx, accurate_result_rx, accurate_runner) = match accurate {
            Some(accurate) => {
                let (req_tx, req_rx) = bounded(8);
                let (out_tx, out_rx) = bounded(8);
                let runner = StationRunner::spawn(
                    AccurateStation::new(accurate),
                    req_rx,
                    out_tx,
                    error_reporter.clone(),
                );
                (Some(req_tx), Some(out_rx), Some(runner))
            }
            None => (None, None, None),
        };

        Self {
            frame_assembler: FrameAssembler::new(config.frame_assembler),
            controller,
            cheap_request_tx,
            cheap_result_rx,
            cheap_runner,
            accurate_request_tx,
            accurate_result_rx,
            accurate_runner,
            sink,
            error_reporter,
            config,
            source,
            sequence: 0,
        }
    }

    /// Starts the audio source and runs until it reports exhaustion
    /// (finite sources only; live sources run until the process exits).
    pub fn run(&mut self) -> Result<()> {
        self.source.start()?;

        loop {
            let samples = match self.source.read_samples() {
                Ok(samples) => samples,
                Err(e) => {
                    self.error_reporter.report("audio_source", &StationError::from(e));
                    if self.source.is_finite() {
                        break;
                    }
                    continue;
                }
            };

            if samples.is_empty() {
                if self.source.is_finite() {
                    break;
                }
                let actions = self.controller.poll_dispatch_deadline();
                self.run_actions(actions);
                self.drain_accurate_results();
                continue;
            }

            let frame = AudioFrame::new(samples, Instant::now(), self.sequence);
            self.sequence += 1;

            let chunks = self.frame_assembler.push(&frame);
            for chunk in chunks {
                self.handle_chunk(chunk);
            }
        }

        if let Some(chunk) = self.frame_assembler.flush() {
            self.handle_chunk(chunk);
        }

        self.finish_pending_dispatch();
        self.source.stop()?;
        Ok(())
    }

    fn handle_chunk(&mut self, chunk: AudioChunk) {
        let metrics = signal_analyzer::analyze(&chunk.samples, &self.config.signal_analyzer);
        let sequence = chunk.sequence;
        let samples = chunk.samples.clone();
        let analyzed = AnalyzedChunk { chunk, metrics };

        // C4 only runs while passive: once an utterance is active, C5 is
        // asked to re-transcribe every chunk instead (see
        // `ControllerAction::RequestChunkTranscription` below).
        let cheap_transcript = if metrics.class.is_transcribable()
            && self.controller.state() == SessionState::Passive
        {
            self.request_cheap_transcript(sequence, samples)
        } else {
            None
        };

        let actions = self.controller.on_chunk(analyzed, cheap_transcript);
        self.run_actions(actions);
        self.drain_accurate_results();
    }

    /// Blocking round trip to the cheap-tier worker thread. There's only
    /// ever one outstanding cheap request, so this can't deadlock against
    /// anything else draining `cheap_result_rx`.
    fn request_cheap_transcript(&mut self, sequence: u64, samples: Vec<f32>) -> Option<Transcript> {
        if self.cheap_request_tx.send(CheapRequest { samples }).is_err() {
            return None;
        }
        self.cheap_result_rx
            .recv()
            .ok()
            .map(|outcome| Transcript::new(outcome.text, TranscriberTier::Cheap, sequence))
    }

    /// Drains whatever accurate-tier results have come back since the last
    /// call, non-blocking. Per-chunk results feed wake re-detection;
    /// whole-utterance results finalize a dispatch.
    fn drain_accurate_results(&mut self) {
        let mut follow_up = Vec::new();
        if let Some(rx) = &self.accurate_result_rx {
            while let Ok(outcome) = rx.try_recv() {
                match outcome {
                    AccurateOutcome::Chunk { sequence, text } => {
                        let transcript = Transcript::new(text, TranscriberTier::Accurate, sequence);
                        follow_up.extend(self.controller.on_accurate_chunk_result(transcript));
                    }
                    AccurateOutcome::WholeUtterance { text } => {
                        follow_up.extend(self.controller.on_whole_utterance_result(text));
                    }
                }
            }
        }
        if !follow_up.is_empty() {
            self.run_actions(follow_up);
        }
    }

    /// Called once after a finite source is exhausted. A dispatch left
    /// in flight would otherwise be silently dropped when `run` returns,
    /// so this blocks (up to the usual dispatch deadline) to resolve it.
    fn finish_pending_dispatch(&mut self) {
        if self.controller.state() != SessionState::Dispatching {
            return;
        }

        let Some(rx) = self.accurate_result_rx.clone() else {
            let actions = self.controller.poll_dispatch_deadline();
            self.run_actions(actions);
            return;
        };

        while self.controller.state() == SessionState::Dispatching {
            match rx.recv_timeout(self.config.session_controller.dispatch_deadline()) {
                Ok(AccurateOutcome::WholeUtterance { text }) => {
                    let actions = self.controller.on_whole_utterance_result(text);
                    self.run_actions(actions);
                }
                Ok(AccurateOutcome::Chunk { sequence, text }) => {
                    let transcript = Transcript::new(text, TranscriberTier::Accurate, sequence);
                    let actions = self.controller.on_accurate_chunk_result(transcript);
                    self.run_actions(actions);
                }
                Err(_) => {
                    let actions = self.controller.poll_dispatch_deadline();
                    self.run_actions(actions);
                    break;
                }
            }
        }
    }

    fn run_actions(&mut self, actions: Vec<ControllerAction>) {
        for action in actions {
            match action {
                ControllerAction::RequestWholeUtteranceTranscription { audio } => {
                    self.request_whole_utterance(audio);
                }
                ControllerAction::RequestChunkTranscription { sequence, audio } => {
                    self.request_chunk_transcription(sequence, audio);
                }
                ControllerAction::Dispatch { transcript, audio } => {
                    self.dispatch(&transcript.text, &audio);
                }
                ControllerAction::DispatchTimedOut { audio } => {
                    if self.config.verbosity >= 1 {
                        eprintln!("dispatch deadline elapsed with no accurate result");
                    }
                    self.dispatch("", &audio);
                }
                ControllerAction::RecordWakeAudit {
                    transcript,
                    confidence,
                    triggered,
                } => {
                    let slug = timestamp_slug();
                    if let Err(e) = self.sink.record_activation(&slug, &transcript, confidence, triggered) {
                        if !self.config.quiet {
                            eprintln!("failed to write activation audit record: {e}");
                        }
                    }
                }
            }
        }
    }

    /// Fires the whole-utterance re-transcription at the accurate worker
    /// if one is running. With no accurate transcriber configured, the
    /// cheap worker stands in for it and the result resolves immediately.
    fn request_whole_utterance(&mut self, audio: Vec<f32>) {
        match &self.accurate_request_tx {
            Some(tx) => {
                if tx.try_send(AccurateRequest::WholeUtterance { samples: audio }).is_err() && self.config.verbosity >= 1 {
                    eprintln!("accurate transcriber worker unavailable, dropping whole-utterance request");
                }
            }
            None => {
                let text = self
                    .request_cheap_transcript(0, audio)
                    .map(|t| t.text)
                    .unwrap_or_default();
                let follow_up = self.controller.on_whole_utterance_result(text);
                self.run_actions(follow_up);
            }
        }
    }

    /// Same degrade policy as `request_whole_utterance`, but for a single
    /// chunk re-transcription during an active utterance.
    fn request_chunk_transcription(&mut self, sequence: u64, audio: Vec<f32>) {
        match &self.accurate_request_tx {
            Some(tx) => {
                if tx
                    .try_send(AccurateRequest::Chunk { sequence, samples: audio })
                    .is_err()
                    && self.config.verbosity >= 1
                {
                    eprintln!("accurate transcriber worker unavailable, dropping chunk {sequence} re-transcription");
                }
            }
            None => {
                if let Some(transcript) = self.request_cheap_transcript(sequence, audio) {
                    let follow_up = self.controller.on_accurate_chunk_result(transcript);
                    self.run_actions(follow_up);
                }
            }
        }
    }

    fn dispatch(&mut self, transcript: &str, audio: &[f32]) {
        let slug = timestamp_slug();
        if let Err(e) = self.sink.handle(&slug, transcript, audio) {
            if !self.config.quiet {
                eprintln!("failed to write conversation artifact: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::recorder::{FramePhase, MockAudioSource};
    use crate::clock::MockClock;
    use crate::pipeline::address_classifier::RuleBasedClassifier;
    use crate::pipeline::transcript_sink::{HeuristicPosTagger, NoopAgentInvoker, TranscriptSinkConfig};
    use crate::stt::transcriber::MockTranscriber;
    use tempfile::tempdir;

    fn sink(dir: &std::path::Path) -> TranscriptSink<NoopAgentInvoker, HeuristicPosTagger> {
        TranscriptSink::new(
            TranscriptSinkConfig {
                recordings_dir: dir.join("recordings"),
                data_dir: dir.join("data"),
                sample_rate: 16000,
            },
            NoopAgentInvoker,
            HeuristicPosTagger,
        )
    }

    #[test]
    fn runs_to_completion_on_a_finite_silent_source() {
        let dir = tempdir().unwrap();
        let source = Box::new(
            MockAudioSource::new().with_frame_sequence(vec![FramePhase {
                samples: vec![0.0; 32000],
                count: 1,
            }]),
        );

        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            source,
            RuleBasedClassifier,
            Arc::new(MockClock::new()),
            Arc::new(MockTranscriber::new("cheap")),
            Some(Arc::new(MockTranscriber::new("accurate"))),
            sink(dir.path()),
        );

        pipeline.run().unwrap();
    }

    #[test]
    fn dispatches_on_wake_word_and_trailing_silence() {
        let dir = tempdir().unwrap();
        let loud: Vec<f32> = (0..32000)
            .map(|i| if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        let silent = vec![0.0f32; 32000];

        let source = Box::new(MockAudioSource::new().with_frame_sequence(vec![
            FramePhase { samples: loud, count: 1 },
            FramePhase {
                samples: silent.clone(),
                count: 1,
            },
            FramePhase { samples: silent, count: 1 },
        ]));

        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            source,
            RuleBasedClassifier,
            Arc::new(MockClock::new()),
            Arc::new(MockTranscriber::new("cheap").with_response("goose can you help")),
            Some(Arc::new(MockTranscriber::new("accurate").with_response("please water the plants"))),
            sink(dir.path()),
        );

        pipeline.run().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("recordings"))
            .map(|rd| rd.collect())
            .unwrap_or_default();
        assert!(!entries.is_empty(), "expected a dispatched conversation artifact");
    }

    /// Stands in for the cheap transcriber in the no-accurate-transcriber
    /// test below: reports the wake phrase for loud audio and nothing for
    /// silence, the way a real ASR tier would, so repeated mid-utterance
    /// re-transcriptions of trailing silence don't themselves look like a
    /// fresh wake word and keep resetting the silence counter forever.
    struct AmplitudeGatedTranscriber;

    impl crate::stt::transcriber::Transcriber for AmplitudeGatedTranscriber {
        fn transcribe(
            &self,
            audio: &[f32],
        ) -> crate::error::Result<crate::stt::transcriber::TranscriptionResult> {
            let loud = audio.iter().any(|s| s.abs() > 0.01);
            let text = if loud { "goose can you help" } else { "" };
            Ok(crate::stt::transcriber::TranscriptionResult::from_text(text.to_string()))
        }

        fn model_name(&self) -> &str {
            "amplitude-gated"
        }

        fn is_ready(&self) -> bool {
            true
        }

        fn tier(&self) -> TranscriberTier {
            TranscriberTier::Cheap
        }
    }

    #[test]
    fn dispatches_using_cheap_transcript_when_no_accurate_transcriber_is_configured() {
        let dir = tempdir().unwrap();
        let loud: Vec<f32> = (0..32000)
            .map(|i| if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        let silent = vec![0.0f32; 32000];

        let source = Box::new(MockAudioSource::new().with_frame_sequence(vec![
            FramePhase { samples: loud, count: 1 },
            FramePhase {
                samples: silent.clone(),
                count: 1,
            },
            FramePhase { samples: silent, count: 1 },
        ]));

        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            source,
            RuleBasedClassifier,
            Arc::new(MockClock::new()),
            Arc::new(AmplitudeGatedTranscriber),
            None::<Arc<AmplitudeGatedTranscriber>>,
            sink(dir.path()),
        );

        pipeline.run().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("recordings"))
            .map(|rd| rd.collect())
            .unwrap_or_default();
        assert!(
            !entries.is_empty(),
            "expected a dispatched conversation artifact even without an accurate transcriber"
        );
    }

    #[test]
    fn propagates_device_start_failure() {
        let dir = tempdir().unwrap();
        let source = Box::new(MockAudioSource::new().with_start_failure());

        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            source,
            RuleBasedClassifier,
            Arc::new(MockClock::new()),
            Arc::new(MockTranscriber::new("cheap")),
            Some(Arc::new(MockTranscriber::new("accurate"))),
            sink(dir.path()),
        );

        assert!(pipeline.run().is_err());
    }
}

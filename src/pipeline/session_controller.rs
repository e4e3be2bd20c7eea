//! Session Controller (C8): the state machine deciding when the assistant
//! is listening passively, actively engaged, and wrapping up an
//! utterance. Not a `Station` — it fans out conditionally (talks to the
//! wake detector, the accurate transcriber, and the sink on different
//! paths depending on state) rather than doing one input-to-output
//! transform per call.

use crate::clock::Clock;
use crate::defaults;
use crate::pipeline::address_classifier::AddressClassifier;
use crate::pipeline::types::{AnalyzedChunk, Transcript, TranscriberTier};
use crate::pipeline::wake_detector::{WakeDetector, WakeDetectorConfig};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct SessionControllerConfig {
    pub chunk_duration_secs: f32,
    pub context_seconds: f32,
    pub silence_seconds: f32,
}

impl Default for SessionControllerConfig {
    fn default() -> Self {
        Self {
            chunk_duration_secs: defaults::CHUNK_DURATION_SECS,
            context_seconds: defaults::CONTEXT_SECONDS,
            silence_seconds: defaults::SILENCE_SECONDS,
        }
    }
}

impl SessionControllerConfig {
    /// How many chunks of rolling context to retain.
    pub fn context_capacity(&self) -> usize {
        (self.context_seconds / self.chunk_duration_secs).ceil().max(1.0) as usize
    }

    /// How many consecutive silent/too-weak chunks trigger dispatch.
    pub fn silence_chunk_threshold(&self) -> usize {
        (self.silence_seconds / self.chunk_duration_secs).ceil().max(1.0) as usize
    }

    /// How long an outstanding whole-utterance accurate transcription is
    /// allowed to run before the controller gives up waiting on it.
    pub fn dispatch_deadline(&self) -> Duration {
        Duration::from_secs_f32(self.chunk_duration_secs * 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Passive,
    Active,
    Dispatching,
}

/// Bounded rolling buffer of recently seen chunks, kept even while passive
/// so an activation can be seeded with a little pre-roll context.
struct RollingContext {
    chunks: VecDeque<AnalyzedChunk>,
    capacity: usize,
}

impl RollingContext {
    fn new(capacity: usize) -> Self {
        Self {
            chunks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, chunk: AnalyzedChunk) {
        if self.chunks.len() >= self.capacity {
            self.chunks.pop_front();
        }
        self.chunks.push_back(chunk);
    }

    fn snapshot(&self) -> Vec<AnalyzedChunk> {
        self.chunks.iter().cloned().collect()
    }
}

/// Chunks and per-chunk accurate-transcript slots collected since
/// activation, used to build the whole-utterance audio handed to the
/// accurate transcriber at dispatch time.
struct ActiveUtterance {
    chunks: Vec<AnalyzedChunk>,
    accurate_results: HashMap<u64, Transcript>,
    trailing_silent_chunks: usize,
    activated_at: Instant,
}

impl ActiveUtterance {
    fn new(preroll: Vec<AnalyzedChunk>, now: Instant) -> Self {
        Self {
            chunks: preroll,
            accurate_results: HashMap::new(),
            trailing_silent_chunks: 0,
            activated_at: now,
        }
    }

    fn push(&mut self, chunk: AnalyzedChunk) {
        if chunk.metrics.class.counts_as_silence() {
            self.trailing_silent_chunks += 1;
        } else {
            self.trailing_silent_chunks = 0;
        }
        self.chunks.push(chunk);
    }

    /// Concatenated raw samples across every chunk collected so far, in
    /// capture order — the whole-utterance audio for re-transcription.
    fn concatenated_audio(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.chunks.iter().map(|c| c.chunk.samples.len()).sum());
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.chunk.samples);
        }
        out
    }
}

/// An outstanding whole-utterance accurate transcription, tracked so the
/// controller can give up on it past its deadline instead of stalling
/// forever.
struct PendingDispatch {
    deadline: Instant,
}

/// What the controller wants done next. The orchestrator drives the
/// controller and acts on these; the controller itself performs no I/O.
#[derive(Debug, Clone)]
pub enum ControllerAction {
    /// Ask the accurate transcriber to re-transcribe the whole utterance.
    RequestWholeUtteranceTranscription { audio: Vec<f32> },
    /// Hand a finished utterance (transcript + its audio) to the sink.
    Dispatch {
        transcript: Transcript,
        audio: Vec<f32>,
    },
    /// Dispatch deadline passed with no accurate result; fall back to
    /// whatever cheap-tier text was collected, or drop silently if none.
    DispatchTimedOut { audio: Vec<f32> },
    /// Ask the accurate transcriber to re-transcribe one chunk while the
    /// utterance is still active. The result comes back via
    /// `on_accurate_chunk_result`, identified by `sequence`.
    RequestChunkTranscription { sequence: u64, audio: Vec<f32> },
    /// A wake word/phrase was found in a cheap transcript while passive,
    /// whether or not the classifier went on to accept it. Written to the
    /// `activation_triggered_*`/`activation_bypassed_*` audit trail.
    RecordWakeAudit {
        transcript: String,
        confidence: f32,
        triggered: bool,
    },
}

pub struct SessionController<C: AddressClassifier> {
    config: SessionControllerConfig,
    state: SessionState,
    clock: Arc<dyn Clock>,
    wake_detector: WakeDetector<C>,
    rolling: RollingContext,
    active: Option<ActiveUtterance>,
    pending_dispatch: Option<PendingDispatch>,
    sequence: u64,
}

impl<C: AddressClassifier> SessionController<C> {
    pub fn new(
        config: SessionControllerConfig,
        wake_config: WakeDetectorConfig,
        classifier: C,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let capacity = config.context_capacity();
        Self {
            config,
            state: SessionState::Passive,
            clock,
            wake_detector: WakeDetector::new(wake_config, classifier),
            rolling: RollingContext::new(capacity),
            active: None,
            pending_dispatch: None,
            sequence: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Feed one analyzed chunk, plus the cheap-tier transcript produced
    /// for it (if the chunk was transcribable), into the controller.
    /// Returns zero or more actions for the orchestrator to carry out.
    pub fn on_chunk(
        &mut self,
        chunk: AnalyzedChunk,
        cheap_transcript: Option<Transcript>,
    ) -> Vec<ControllerAction> {
        let mut actions = Vec::new();

        match self.state {
            SessionState::Passive => {
                self.rolling.push(chunk.clone());
                if let Some(transcript) = cheap_transcript.filter(|t| !t.is_empty()) {
                    let detection = self.wake_detector.detect(&transcript.text);
                    if detection.matched {
                        actions.push(ControllerAction::RecordWakeAudit {
                            transcript: transcript.text.clone(),
                            confidence: detection.confidence,
                            triggered: detection.accepted,
                        });
                    }
                    if detection.accepted {
                        let preroll = self.rolling.snapshot();
                        self.active = Some(ActiveUtterance::new(preroll, self.clock.now()));
                        self.state = SessionState::Active;
                    }
                }
            }
            SessionState::Active => {
                let threshold = self.config.silence_chunk_threshold();
                let sequence = chunk.chunk.sequence;
                let samples = chunk.chunk.samples.clone();

                let active = self.active.as_mut().expect("active state implies an utterance");
                active.push(chunk);
                actions.push(ControllerAction::RequestChunkTranscription { sequence, audio: samples });

                if active.trailing_silent_chunks >= threshold {
                    let audio = active.concatenated_audio();
                    self.pending_dispatch = Some(PendingDispatch {
                        deadline: self.clock.now() + self.config.dispatch_deadline(),
                    });
                    self.state = SessionState::Dispatching;
                    actions.push(ControllerAction::RequestWholeUtteranceTranscription { audio });
                }
            }
            SessionState::Dispatching => {
                // New audio keeps accumulating in the rolling context so a
                // fresh activation right after dispatch still has pre-roll.
                self.rolling.push(chunk);
                actions.extend(self.poll_dispatch_deadline());
            }
        }

        actions
    }

    /// Per-chunk accurate-transcriber results may arrive out of order;
    /// slot them in by the originating chunk's sequence number so a late
    /// result from an earlier chunk doesn't clobber a later one.
    ///
    /// Also re-runs wake detection on the completed transcript: a new wake
    /// accepted mid-utterance resets `trailing_silent_chunks` to 0,
    /// treating it as a continuation rather than letting unrelated
    /// trailing silence end the utterance early.
    pub fn on_accurate_chunk_result(&mut self, transcript: Transcript) -> Vec<ControllerAction> {
        let mut actions = Vec::new();

        let Some(active) = self.active.as_mut() else {
            return actions;
        };

        active
            .accurate_results
            .insert(transcript.sequence, transcript.clone());

        if transcript.is_empty() {
            return actions;
        }

        let detection = self.wake_detector.detect(&transcript.text);
        if detection.matched {
            actions.push(ControllerAction::RecordWakeAudit {
                transcript: transcript.text.clone(),
                confidence: detection.confidence,
                triggered: detection.accepted,
            });
        }
        if detection.accepted {
            active.trailing_silent_chunks = 0;
        }

        actions
    }

    /// The whole-utterance accurate transcription requested at dispatch
    /// has come back. Finalizes the utterance and returns to passive.
    pub fn on_whole_utterance_result(&mut self, text: String) -> Vec<ControllerAction> {
        if self.state != SessionState::Dispatching {
            return Vec::new();
        }

        let active = match self.active.take() {
            Some(active) => active,
            None => return Vec::new(),
        };

        let audio = active.concatenated_audio();
        let sequence = self.sequence;
        self.sequence += 1;
        let transcript = Transcript::new(text, TranscriberTier::Accurate, sequence);

        self.pending_dispatch = None;
        self.state = SessionState::Passive;

        vec![ControllerAction::Dispatch { transcript, audio }]
    }

    /// Checked on every tick (or explicitly by the orchestrator) to catch
    /// a dispatch whose accurate-transcription call never returned.
    pub fn poll_dispatch_deadline(&mut self) -> Vec<ControllerAction> {
        if self.state != SessionState::Dispatching {
            return Vec::new();
        }

        let Some(pending) = &self.pending_dispatch else {
            return Vec::new();
        };

        if self.clock.now() < pending.deadline {
            return Vec::new();
        }

        let active = match self.active.take() {
            Some(active) => active,
            None => {
                self.pending_dispatch = None;
                self.state = SessionState::Passive;
                return Vec::new();
            }
        };

        let audio = active.concatenated_audio();
        self.pending_dispatch = None;
        self.state = SessionState::Passive;

        vec![ControllerAction::DispatchTimedOut { audio }]
    }
}

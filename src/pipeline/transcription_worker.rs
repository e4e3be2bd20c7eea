//! Station adapters that put the cheap (C4) and accurate (C5) transcribers
//! on their own dedicated threads, so a slow `transcribe()` call never
//! blocks the thread that's draining the audio capture buffer.
//!
//! The cheap tier is used in a blocking request/reply style: Passive-state
//! wake detection needs its result before the controller can decide
//! anything about the chunk, so the orchestrator sends a request and
//! waits on the matching reply. Moving it to its own thread still pays
//! off, because the model stays loaded across calls and the audio capture
//! callback is never the thread stuck waiting on inference.
//!
//! The accurate tier is used asynchronously: requests are fired with a
//! non-blocking send, and results are drained opportunistically on each
//! turn of the control loop, so a per-chunk re-transcription result
//! arrives whenever it arrives without the controller blocking on it.

use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::stt::transcriber::Transcriber;
use std::sync::Arc;

/// One transcription request for the cheap tier: samples in, matched back
/// to the caller purely by the blocking request/reply pairing (there is
/// only ever one outstanding cheap request at a time).
pub struct CheapRequest {
    pub samples: Vec<f32>,
}

pub struct CheapOutcome {
    pub text: String,
}

pub struct CheapStation<T: Transcriber> {
    transcriber: Arc<T>,
}

impl<T: Transcriber> CheapStation<T> {
    pub fn new(transcriber: Arc<T>) -> Self {
        Self { transcriber }
    }
}

impl<T: Transcriber + 'static> Station for CheapStation<T> {
    type Input = CheapRequest;
    type Output = CheapOutcome;

    /// Always answers, even on failure: the orchestrator sends one request
    /// and blocks on one reply, so a caught-and-reported `StationError`
    /// with no output would leave that `recv()` waiting forever.
    fn process(&mut self, input: Self::Input) -> Result<Option<Self::Output>, StationError> {
        match self.transcriber.transcribe(&input.samples) {
            Ok(result) => Ok(Some(CheapOutcome { text: result.text })),
            Err(e) => {
                eprintln!("cheap transcription failed: {e}");
                Ok(Some(CheapOutcome { text: String::new() }))
            }
        }
    }

    fn name(&self) -> &'static str {
        "cheap_transcriber"
    }
}

/// A request for the accurate tier: either a per-chunk re-transcription
/// (identified by the chunk's sequence number, tagged onto the reply) or
/// the once-per-utterance whole-buffer re-transcription at dispatch.
pub enum AccurateRequest {
    Chunk { sequence: u64, samples: Vec<f32> },
    WholeUtterance { samples: Vec<f32> },
}

pub enum AccurateOutcome {
    Chunk { sequence: u64, text: String },
    WholeUtterance { text: String },
}

pub struct AccurateStation<T: Transcriber> {
    transcriber: Arc<T>,
}

impl<T: Transcriber> AccurateStation<T> {
    pub fn new(transcriber: Arc<T>) -> Self {
        Self { transcriber }
    }
}

impl<T: Transcriber + 'static> Station for AccurateStation<T> {
    type Input = AccurateRequest;
    type Output = AccurateOutcome;

    fn process(&mut self, input: Self::Input) -> Result<Option<Self::Output>, StationError> {
        match input {
            AccurateRequest::Chunk { sequence, samples } => {
                let result = self
                    .transcriber
                    .transcribe(&samples)
                    .map_err(|e| StationError::Recoverable(e.to_string()))?;
                Ok(Some(AccurateOutcome::Chunk { sequence, text: result.text }))
            }
            AccurateRequest::WholeUtterance { samples } => {
                let result = self
                    .transcriber
                    .transcribe(&samples)
                    .map_err(|e| StationError::Recoverable(e.to_string()))?;
                Ok(Some(AccurateOutcome::WholeUtterance { text: result.text }))
            }
        }
    }

    fn name(&self) -> &'static str {
        "accurate_transcriber"
    }
}

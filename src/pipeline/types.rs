//! Data types flowing through the voice ingress pipeline.

use std::time::Instant;

/// A frame of raw audio samples with timing information, as delivered by the
/// audio source callback (C1). Not yet chunked to a fixed duration.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// PCM samples as float32 in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Timestamp when this frame was captured.
    pub timestamp: Instant,
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, timestamp: Instant, sequence: u64) -> Self {
        Self {
            samples,
            timestamp,
            sequence,
        }
    }
}

/// A fixed-duration chunk of audio, produced by the Frame Assembler (C2).
/// Immutable once produced; later stages only ever read it or attach new
/// values alongside it, they never mutate `samples` in place.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// PCM samples as float32 in `[-1.0, 1.0]`, exactly
    /// `sample_rate * chunk_duration` long (the last chunk of a finite
    /// source may be shorter).
    pub samples: Vec<f32>,
    /// Monotonic timestamp of the first sample in the chunk.
    pub captured_at: Instant,
    /// Sequence number, strictly increasing in capture order. Used as the
    /// chunk identity for slotting out-of-order accurate-transcriber
    /// results back into place.
    pub sequence: u64,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sequence: u64) -> Self {
        Self {
            samples,
            captured_at: Instant::now(),
            sequence,
        }
    }

    pub fn with_timing(samples: Vec<f32>, sequence: u64, captured_at: Instant) -> Self {
        Self {
            samples,
            captured_at,
            sequence,
        }
    }

    /// Duration of this chunk in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        ((self.samples.len() as u64 * 1000) / sample_rate.max(1) as u64) as u32
    }
}

/// Classification produced by the Signal Analyzer (C3), §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkClass {
    TooWeak,
    Silence,
    DistantSpeech,
    Speech,
    CloseSpeech,
}

impl ChunkClass {
    /// Whether a chunk of this class is worth handing to a transcriber.
    /// This is the single authoritative energy gate (§9 open question,
    /// resolved in favour of the analyzer): only `TooWeak` is excluded.
    pub fn is_transcribable(self) -> bool {
        !matches!(self, ChunkClass::TooWeak)
    }

    /// Whether a chunk of this class counts towards trailing-silence
    /// tracking in the session controller (§4.7).
    pub fn counts_as_silence(self) -> bool {
        matches!(self, ChunkClass::TooWeak | ChunkClass::Silence)
    }
}

/// Per-chunk signal metrics, attached to a chunk by C3 (§3 ChunkMetrics).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkMetrics {
    pub mean_abs: f32,
    pub rms: f32,
    pub peak: f32,
    pub zero_crossing_rate: f32,
    pub speech_band_ratio: f32,
    pub class: ChunkClass,
}

/// A chunk with its metrics attached — the unit the Signal Analyzer hands
/// to the Session Controller. Every chunk entering C8 has this shape
/// (§3 invariant: "every chunk that enters C8 has a ChunkMetrics attached").
#[derive(Debug, Clone)]
pub struct AnalyzedChunk {
    pub chunk: AudioChunk,
    pub metrics: ChunkMetrics,
}

/// Which ASR tier produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriberTier {
    Cheap,
    Accurate,
}

/// A transcript produced for one chunk (or, at dispatch time, for a whole
/// concatenated utterance) by either transcriber tier. May be empty — an
/// empty string is the non-fatal outcome of a transcription failure or
/// timeout (§4.4).
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub tier: TranscriberTier,
    /// Sequence number of the originating chunk, used to slot accurate
    /// results back into the active utterance by identity even if they
    /// complete out of order.
    pub sequence: u64,
}

impl Transcript {
    pub fn new(text: String, tier: TranscriberTier, sequence: u64) -> Self {
        Self {
            text,
            tier,
            sequence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

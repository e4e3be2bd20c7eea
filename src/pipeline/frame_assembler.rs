//! Frame Assembler (C2): concatenates incoming audio buffers into
//! fixed-duration chunks.
//!
//! Unlike the donor's adaptive, VAD-gap-driven chunker, this assembler's
//! chunk boundaries are a pure function of sample count: exactly
//! `chunk_duration * sample_rate` samples per chunk, deterministic
//! regardless of how the upstream buffers happen to be sized.

use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::{AudioChunk, AudioFrame};

#[derive(Debug, Clone, Copy)]
pub struct FrameAssemblerConfig {
    pub sample_rate: u32,
    pub chunk_duration_secs: f32,
}

impl Default for FrameAssemblerConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::defaults::SAMPLE_RATE,
            chunk_duration_secs: 2.0,
        }
    }
}

impl FrameAssemblerConfig {
    /// Number of samples in one chunk at this config's rate and duration.
    pub fn chunk_len(&self) -> usize {
        (self.sample_rate as f32 * self.chunk_duration_secs).round() as usize
    }
}

/// Accumulates incoming frames and splits them into fixed-size chunks on
/// exact sample boundaries. Partial buffers are carried over; buffers
/// larger than one chunk are split, possibly emitting more than one chunk
/// per `process` call is not supported by the `Station` one-in-one-out
/// contract, so the assembler instead holds any surplus samples and emits
/// them on the next call (see `drain_ready`).
pub struct FrameAssembler {
    config: FrameAssemblerConfig,
    carry: Vec<f32>,
    sequence: u64,
}

impl FrameAssembler {
    pub fn new(config: FrameAssemblerConfig) -> Self {
        Self {
            config,
            carry: Vec::new(),
            sequence: 0,
        }
    }

    /// Push a frame's samples in and return every chunk that can now be
    /// completed, in order. Always drains the fully-formed chunks; any
    /// leftover partial chunk stays buffered for the next push.
    pub fn push(&mut self, frame: &AudioFrame) -> Vec<AudioChunk> {
        self.carry.extend_from_slice(&frame.samples);
        self.drain_ready()
    }

    /// Emit one AudioChunk per full `chunk_len()` worth of buffered
    /// samples, oldest first.
    fn drain_ready(&mut self) -> Vec<AudioChunk> {
        let chunk_len = self.config.chunk_len().max(1);
        let mut chunks = Vec::new();

        while self.carry.len() >= chunk_len {
            let samples: Vec<f32> = self.carry.drain(0..chunk_len).collect();
            chunks.push(AudioChunk::new(samples, self.sequence));
            self.sequence += 1;
        }

        chunks
    }

    /// Flush any remaining partial samples as a final, shorter chunk (used
    /// on finite-source end-of-stream and on shutdown).
    pub fn flush(&mut self) -> Option<AudioChunk> {
        if self.carry.is_empty() {
            return None;
        }
        let samples = std::mem::take(&mut self.carry);
        let chunk = AudioChunk::new(samples, self.sequence);
        self.sequence += 1;
        Some(chunk)
    }
}

/// Station wrapper around `FrameAssembler`. Because a `Station::process`
/// call produces at most one output, multi-chunk bursts are queued
/// internally and drained one at a time on subsequent (synthetic) calls
/// by the orchestrator; in practice frames arrive at roughly chunk-sized
/// granularity so this rarely queues more than one extra chunk.
pub struct FrameAssemblerStation {
    assembler: FrameAssembler,
    pending: std::collections::VecDeque<AudioChunk>,
}

impl FrameAssemblerStation {
    pub fn new(config: FrameAssemblerConfig) -> Self {
        Self {
            assembler: FrameAssembler::new(config),
            pending: std::collections::VecDeque::new(),
        }
    }
}

impl Station for FrameAssemblerStation {
    type Input = AudioFrame;
    type Output = AudioChunk;

    fn process(&mut self, frame: AudioFrame) -> Result<Option<AudioChunk>, StationError> {
        if let Some(chunk) = self.pending.pop_front() {
            // Drain backlog before accepting new input's chunks, preserving order.
            self.pending.extend(self.assembler.push(&frame));
            return Ok(Some(chunk));
        }

        let mut chunks = self.assembler.push(&frame);
        if chunks.is_empty() {
            return Ok(None);
        }
        let first = chunks.remove(0);
        self.pending.extend(chunks);
        Ok(Some(first))
    }

    fn name(&self) -> &'static str {
        "frame_assembler"
    }

    fn shutdown(&mut self) {
        if let Some(chunk) = self.assembler.flush() {
            self.pending.push_back(chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn frame(samples: Vec<f32>) -> AudioFrame {
        AudioFrame::new(samples, Instant::now(), 0)
    }

    fn config(sample_rate: u32, duration: f32) -> FrameAssemblerConfig {
        FrameAssemblerConfig {
            sample_rate,
            chunk_duration_secs: duration,
        }
    }

    #[test]
    fn chunk_len_matches_rate_times_duration() {
        let config = config(16000, 2.0);
        assert_eq!(config.chunk_len(), 32000);
    }

    #[test]
    fn accumulates_partial_buffers_until_chunk_is_full() {
        let mut assembler = FrameAssembler::new(config(1000, 1.0)); // chunk_len = 1000
        assert!(assembler.push(&frame(vec![0.0; 400])).is_empty());
        assert!(assembler.push(&frame(vec![0.0; 400])).is_empty());
        let chunks = assembler.push(&frame(vec![0.0; 400]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples.len(), 1000);
    }

    #[test]
    fn splits_large_buffer_into_multiple_chunks_on_exact_boundaries() {
        let mut assembler = FrameAssembler::new(config(1000, 1.0)); // chunk_len = 1000
        let chunks = assembler.push(&frame(vec![0.0; 2500]));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].samples.len(), 1000);
        assert_eq!(chunks[1].samples.len(), 1000);
    }

    #[test]
    fn sequence_numbers_increase_monotonically() {
        let mut assembler = FrameAssembler::new(config(1000, 1.0));
        let chunks = assembler.push(&frame(vec![0.0; 3000]));
        let sequences: Vec<u64> = chunks.iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn flush_emits_remaining_partial_chunk() {
        let mut assembler = FrameAssembler::new(config(1000, 1.0));
        assembler.push(&frame(vec![0.0; 400]));
        let flushed = assembler.flush().unwrap();
        assert_eq!(flushed.samples.len(), 400);
        assert!(assembler.flush().is_none());
    }

    #[test]
    fn station_drains_multiple_pending_chunks_across_calls() {
        let mut station = FrameAssemblerStation::new(config(1000, 1.0));
        let out1 = station.process(frame(vec![0.0; 2500])).unwrap();
        assert!(out1.is_some());
        assert_eq!(out1.unwrap().samples.len(), 1000);

        // A no-op-ish next frame still drains the backlog before its own data.
        let out2 = station.process(frame(vec![])).unwrap();
        assert!(out2.is_some());
        assert_eq!(out2.unwrap().samples.len(), 1000);
    }

    #[test]
    fn station_shutdown_flushes_partial_chunk_into_pending() {
        let mut station = FrameAssemblerStation::new(config(1000, 1.0));
        station.process(frame(vec![0.0; 400])).unwrap();
        station.shutdown();
        assert_eq!(station.pending.len(), 1);
        assert_eq!(station.pending[0].samples.len(), 400);
    }
}

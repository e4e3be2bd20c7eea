use crate::defaults;
use crate::error::{ListenError, Result};

/// Trait for audio source devices: "a thing that produces float32 PCM
/// frames on demand". Implemented by the real cpal-backed capture device
/// and by finite sources (WAV file, stdin) used in tests and pipe mode.
pub trait AudioSource: Send + Sync {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read the next buffer of samples, normalized float32 in `[-1.0, 1.0]`.
    fn read_samples(&mut self) -> Result<Vec<f32>>;

    /// Returns true if this source will eventually stop producing samples
    /// (file, pipe). Returns false for live sources (microphone), where
    /// empty reads are normal and not end-of-stream.
    fn is_finite(&self) -> bool {
        false
    }
}

impl AudioSource for Box<dyn AudioSource> {
    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        (**self).read_samples()
    }

    fn is_finite(&self) -> bool {
        (**self).is_finite()
    }
}

/// Configuration for audio source initialization.
#[derive(Debug, Clone)]
pub struct AudioSourceConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub device: Option<String>,
}

impl Default for AudioSourceConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channels: 1,
            device: None,
        }
    }
}

/// A phase in a frame sequence: specific samples repeated `count` times.
/// Used to script multi-phase test scenarios (e.g. silence, then speech,
/// then silence again) deterministically.
#[derive(Debug, Clone)]
pub struct FramePhase {
    pub samples: Vec<f32>,
    pub count: u32,
}

/// Mock audio source for testing.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    force_live: bool,
    samples: Vec<f32>,
    should_fail_start: bool,
    should_fail_stop: bool,
    should_fail_read: bool,
    error_message: String,
    frame_sequence: Option<Vec<FramePhase>>,
    sequence_index: usize,
    sequence_remaining: u32,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self {
            is_started: false,
            force_live: false,
            samples: vec![0.0; 160],
            should_fail_start: false,
            should_fail_stop: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
            frame_sequence: None,
            sequence_index: 0,
            sequence_remaining: 0,
        }
    }

    pub fn with_samples(mut self, samples: Vec<f32>) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the mock with a sequence of frame phases. After all phases
    /// are exhausted, `read_samples` returns empty (signaling end).
    pub fn with_frame_sequence(mut self, phases: Vec<FramePhase>) -> Self {
        if let Some(first) = phases.first() {
            self.sequence_remaining = first.count;
        }
        self.frame_sequence = Some(phases);
        self.sequence_index = 0;
        self
    }

    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Mark this source as a live (infinite) source, overriding the default
    /// inference from `frame_sequence`.
    pub fn as_live_source(mut self) -> Self {
        self.force_live = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(ListenError::Device {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            Err(ListenError::Device {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = false;
            Ok(())
        }
    }

    fn is_finite(&self) -> bool {
        self.frame_sequence.is_some() && !self.force_live
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if self.should_fail_read {
            return Err(ListenError::Device {
                message: self.error_message.clone(),
            });
        }

        if let Some(ref phases) = self.frame_sequence {
            if self.sequence_index >= phases.len() {
                return Ok(Vec::new());
            }

            let samples = phases[self.sequence_index].samples.clone();
            self.sequence_remaining -= 1;

            if self.sequence_remaining == 0 {
                self.sequence_index += 1;
                if self.sequence_index < phases.len() {
                    self.sequence_remaining = phases[self.sequence_index].count;
                }
            }

            return Ok(samples);
        }

        Ok(self.samples.clone())
    }
}

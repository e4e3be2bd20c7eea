//! Audio ingress: device capture, WAV/stdin sources, and the `AudioSource`
//! trait they share (C1).

pub mod capture;
pub mod recorder;
pub mod wav;

pub use capture::{CpalAudioSource, list_devices, suppress_audio_warnings};
pub use recorder::{AudioSource, AudioSourceConfig, FramePhase, MockAudioSource};
pub use wav::{WavAudioSource, write_wav_f32};

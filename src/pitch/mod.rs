//! Pitch detection contract and the detectors built on it.

pub mod sliced;
pub mod yin;

use serde::{Deserialize, Serialize};

use crate::midi;

/// A pitch found in a window of microphone samples.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PitchEvent {
    pub midi_note: i32,
    pub frequency: f32,
}

impl PitchEvent {
    pub fn new(midi_note: i32, frequency: f32) -> Self {
        PitchEvent {
            midi_note,
            frequency,
        }
    }

    pub fn from_midi_note(midi_note: i32) -> Self {
        PitchEvent::new(midi_note, midi::frequency_of(midi_note))
    }

    pub fn from_frequency(frequency: f32) -> Self {
        PitchEvent::new(midi::midi_note_from_frequency(frequency), frequency)
    }
}

/// Per-device microphone settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MicProfile {
    pub name: String,
    /// Input latency of the device and OS, subtracted from the playback
    /// position when mapping song time onto the sample buffer.
    pub delay_ms: u32,
    /// Linear gain applied before the noise gate.
    pub amplification: f32,
    /// Minimum RMS (after amplification) for a window to be analyzed.
    pub noise_threshold: f32,
}

impl Default for MicProfile {
    fn default() -> Self {
        MicProfile {
            name: "Default".to_string(),
            delay_ms: 0,
            amplification: 1.0,
            noise_threshold: 0.02,
        }
    }
}

/// Frame-level pitch detection over `samples[start..end]`.
///
/// Implementations must be deterministic for identical inputs and run in
/// time bounded by the sample count. `None` means no pitch was found
/// (silence or noise) and is not an error.
pub trait PitchDetector {
    fn detect(
        &mut self,
        samples: &[f32],
        start: usize,
        end: usize,
        mic_profile: &MicProfile,
    ) -> Option<PitchEvent>;
}

impl<D: PitchDetector + ?Sized> PitchDetector for Box<D> {
    fn detect(
        &mut self,
        samples: &[f32],
        start: usize,
        end: usize,
        mic_profile: &MicProfile,
    ) -> Option<PitchEvent> {
        (**self).detect(samples, start, end, mic_profile)
    }
}

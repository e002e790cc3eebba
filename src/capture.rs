//! Microphone sample storage read by the beat tracker.

use crate::error::TrackerError;

/// A continuously appended buffer of mono samples. The newest sample has
/// the highest index.
pub trait SampleCapture {
    fn samples(&self) -> &[f32];
    fn sample_rate(&self) -> u32;
}

/// Fixed-length sample buffer. New samples push older ones towards index 0.
#[derive(Clone, Debug)]
pub struct MicSampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl MicSampleBuffer {
    /// A silent buffer holding `len` samples.
    pub fn new(len: usize, sample_rate: u32) -> Result<Self, TrackerError> {
        if sample_rate == 0 {
            return Err(TrackerError::InvalidSampleRate(sample_rate));
        }
        Ok(MicSampleBuffer {
            samples: vec![0.0; len],
            sample_rate,
        })
    }

    /// Wrap a complete recording whose last sample is the newest.
    pub fn from_recording(samples: Vec<f32>, sample_rate: u32) -> Result<Self, TrackerError> {
        if sample_rate == 0 {
            return Err(TrackerError::InvalidSampleRate(sample_rate));
        }
        Ok(MicSampleBuffer {
            samples,
            sample_rate,
        })
    }

    /// Buffer sized to hold `duration_ms` of audio.
    pub fn with_duration(duration_ms: u32, sample_rate: u32) -> Result<Self, TrackerError> {
        let len = (duration_ms as u64 * sample_rate as u64 / 1000) as usize;
        Self::new(len, sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push_samples(&mut self, new_samples: &[f32]) {
        let len = self.samples.len();
        if new_samples.len() >= len {
            self.samples
                .copy_from_slice(&new_samples[new_samples.len() - len..]);
            return;
        }
        let keep = len - new_samples.len();
        self.samples.copy_within(new_samples.len().., 0);
        self.samples[keep..].copy_from_slice(new_samples);
    }
}

impl SampleCapture for MicSampleBuffer {
    fn samples(&self) -> &[f32] {
        &self.samples
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_shifts_old_samples_down() {
        let mut buffer = MicSampleBuffer::new(5, 44100).unwrap();
        buffer.push_samples(&[1.0, 2.0]);
        assert_eq!(buffer.samples(), &[0.0, 0.0, 0.0, 1.0, 2.0]);
        buffer.push_samples(&[3.0, 4.0, 5.0]);
        assert_eq!(buffer.samples(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_push_more_than_capacity_keeps_newest() {
        let mut buffer = MicSampleBuffer::new(3, 44100).unwrap();
        buffer.push_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buffer.samples(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_with_duration() {
        let buffer = MicSampleBuffer::with_duration(500, 44100).unwrap();
        assert_eq!(buffer.len(), 22050);
        assert_eq!(buffer.sample_rate(), 44100);
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        assert!(matches!(
            MicSampleBuffer::new(10, 0),
            Err(TrackerError::InvalidSampleRate(0))
        ));
    }
}

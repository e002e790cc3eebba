use crate::midi::{self, SINGABLE_NOTE_MIN, SINGABLE_NOTE_RANGE};
use crate::pitch::{MicProfile, PitchDetector, PitchEvent};

const YIN_THRESHOLD: f32 = 0.15;

/// Above this normalized difference the signal is treated as unpitched.
const MAX_APERIODICITY: f32 = 0.5;

/// YIN pitch detector limited to the singable range C2..C6.
///
/// The difference buffer is allocated once and reused between calls.
pub struct YinDetector {
    sample_rate: u32,
    min_lag: usize,
    max_lag: usize,
    diff: Vec<f32>,
    cmnd: Vec<f32>,
}

impl YinDetector {
    pub fn new(sample_rate: u32) -> Self {
        let frequencies = midi::precalculate_frequencies(SINGABLE_NOTE_MIN, SINGABLE_NOTE_RANGE);
        let delays = midi::precalculate_sample_delays(sample_rate, &frequencies);
        // Highest note has the shortest period. Allow one extra sample on each
        // side so the edge notes survive rounding.
        let min_lag = delays.last().copied().unwrap_or(2).saturating_sub(1).max(2);
        let max_lag = delays.first().copied().unwrap_or(2) + 1;
        YinDetector {
            sample_rate,
            min_lag,
            max_lag,
            diff: vec![0.0; max_lag + 1],
            cmnd: vec![0.0; max_lag + 1],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Detect the fundamental frequency of `samples` in Hz.
    pub fn detect_frequency(&mut self, samples: &[f32], mic_profile: &MicProfile) -> Option<f32> {
        if samples.len() < 2 || self.sample_rate == 0 {
            return None;
        }

        // Noise gate on the DC-free RMS
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let energy: f32 = samples.iter().map(|&s| (s - mean) * (s - mean)).sum();
        let rms = (energy / samples.len() as f32).sqrt() * mic_profile.amplification;
        if rms < mic_profile.noise_threshold {
            return None;
        }

        let half_len = samples.len() / 2;
        let max_lag = self.max_lag.min(half_len);
        let min_lag = self.min_lag;
        if min_lag >= max_lag {
            return None;
        }

        // Difference function
        for tau in 1..=max_lag {
            let mut sum = 0.0f32;
            for j in 0..half_len {
                let d = samples[j] - samples[j + tau];
                sum += d * d;
            }
            self.diff[tau] = sum;
        }

        // Cumulative mean normalized difference
        let cmnd = &mut self.cmnd;
        cmnd[0] = 1.0;
        let mut running_sum = 0.0f32;
        for tau in 1..=max_lag {
            running_sum += self.diff[tau];
            cmnd[tau] = if running_sum > 0.0 {
                self.diff[tau] * tau as f32 / running_sum
            } else {
                1.0
            };
        }

        // First dip below the threshold, walked down to its local minimum
        let mut best_tau = 0usize;
        for tau in min_lag..=max_lag {
            if cmnd[tau] < YIN_THRESHOLD {
                let mut t = tau;
                while t < max_lag && cmnd[t + 1] < cmnd[t] {
                    t += 1;
                }
                best_tau = t;
                break;
            }
        }

        if best_tau == 0 {
            let mut min_val = f32::MAX;
            for tau in min_lag..=max_lag {
                if cmnd[tau] < min_val {
                    min_val = cmnd[tau];
                    best_tau = tau;
                }
            }
            if min_val > MAX_APERIODICITY {
                return None;
            }
        }

        // Parabolic interpolation
        let tau_refined = if best_tau > 0 && best_tau < max_lag {
            let alpha = cmnd[best_tau - 1];
            let beta = cmnd[best_tau];
            let gamma = cmnd[best_tau + 1];
            let denom = 2.0 * (2.0 * beta - alpha - gamma);
            if denom.abs() > 1e-10 {
                best_tau as f32 + (alpha - gamma) / denom
            } else {
                best_tau as f32
            }
        } else {
            best_tau as f32
        };

        if tau_refined <= 0.0 {
            return None;
        }

        let hz = self.sample_rate as f32 / tau_refined;
        hz.is_finite().then_some(hz)
    }
}

impl PitchDetector for YinDetector {
    fn detect(
        &mut self,
        samples: &[f32],
        start: usize,
        end: usize,
        mic_profile: &MicProfile,
    ) -> Option<PitchEvent> {
        let end = end.min(samples.len());
        if start >= end {
            return None;
        }
        let hz = self.detect_frequency(&samples[start..end], mic_profile)?;
        Some(PitchEvent::from_frequency(hz))
    }
}

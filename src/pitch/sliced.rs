use log::trace;

use crate::error::TrackerError;
use crate::midi;
use crate::pitch::{MicProfile, PitchDetector, PitchEvent};
use crate::scoring::types::Note;

/// Retries a detector on fixed-size slices when the whole window misses the
/// target note. Averaging over a long window can wash out a short correct
/// pitch; a slice may still catch it.
pub struct SlicedPitchAnalyzer<D> {
    slice_size: usize,
    detector: D,
}

impl<D: PitchDetector> SlicedPitchAnalyzer<D> {
    pub fn new(slice_size: usize, detector: D) -> Result<Self, TrackerError> {
        if slice_size == 0 {
            return Err(TrackerError::InvalidSliceSize(slice_size));
        }
        Ok(SlicedPitchAnalyzer {
            slice_size,
            detector,
        })
    }

    pub fn slice_size(&self) -> usize {
        self.slice_size
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Best-effort pitch for `samples[start..end]` with respect to `target_note`.
    ///
    /// Returns the whole-window result unless it misses and some slice hits,
    /// in which case the first hitting slice wins. An empty window yields
    /// `None` without invoking the detector.
    pub fn process(
        &mut self,
        samples: &[f32],
        start: usize,
        end: usize,
        mic_profile: &MicProfile,
        target_note: &Note,
        rounding_distance: u8,
    ) -> Option<PitchEvent> {
        if start >= end {
            return None;
        }

        let whole = self.detector.detect(samples, start, end, mic_profile);
        if midi::is_note_hit(target_note, whole.as_ref(), rounding_distance) {
            return whole;
        }

        let sample_count = end - start;
        if sample_count > self.slice_size {
            let slice_count = sample_count.div_ceil(self.slice_size);
            for i in 0..slice_count {
                let slice_start = start + i * self.slice_size;
                let slice_end = (slice_start + self.slice_size).min(end);
                let slice_event = self.detector.detect(samples, slice_start, slice_end, mic_profile);
                if midi::is_note_hit(target_note, slice_event.as_ref(), rounding_distance) {
                    trace!(
                        "slice {}/{} [{}, {}) hit note {}",
                        i + 1,
                        slice_count,
                        slice_start,
                        slice_end,
                        target_note.midi_note
                    );
                    return slice_event;
                }
            }
        }

        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::types::NoteType;
    use std::collections::HashMap;

    /// Detector answering from a table keyed by `(start, end)`.
    #[derive(Default)]
    struct ScriptedDetector {
        responses: HashMap<(usize, usize), PitchEvent>,
        calls: Vec<(usize, usize)>,
    }

    impl ScriptedDetector {
        fn with(mut self, start: usize, end: usize, midi_note: i32) -> Self {
            self.responses
                .insert((start, end), PitchEvent::from_midi_note(midi_note));
            self
        }
    }

    impl PitchDetector for ScriptedDetector {
        fn detect(
            &mut self,
            _samples: &[f32],
            start: usize,
            end: usize,
            _mic_profile: &MicProfile,
        ) -> Option<PitchEvent> {
            self.calls.push((start, end));
            self.responses.get(&(start, end)).copied()
        }
    }

    fn target() -> Note {
        Note::new(0, 4, 60, NoteType::Normal)
    }

    #[test]
    fn test_rejects_zero_slice_size() {
        let result = SlicedPitchAnalyzer::new(0, ScriptedDetector::default());
        assert!(matches!(result, Err(TrackerError::InvalidSliceSize(0))));
    }

    #[test]
    fn test_whole_range_hit_needs_one_call() {
        let detector = ScriptedDetector::default().with(0, 2000, 60);
        let mut analyzer = SlicedPitchAnalyzer::new(512, detector).unwrap();
        let samples = vec![0.0; 2000];
        let event = analyzer.process(&samples, 0, 2000, &MicProfile::default(), &target(), 0);
        assert_eq!(event.map(|e| e.midi_note), Some(60));
        assert_eq!(analyzer.detector().calls.len(), 1);
    }

    #[test]
    fn test_slice_hit_after_whole_range_miss() {
        let detector = ScriptedDetector::default()
            .with(0, 2000, 65)
            .with(512, 1024, 72);
        let mut analyzer = SlicedPitchAnalyzer::new(512, detector).unwrap();
        let samples = vec![0.0; 2000];
        let event = analyzer.process(&samples, 0, 2000, &MicProfile::default(), &target(), 0);
        assert_eq!(event.map(|e| e.midi_note), Some(72));
        assert_eq!(
            analyzer.detector().calls,
            vec![(0, 2000), (0, 512), (512, 1024)]
        );
    }

    #[test]
    fn test_no_slice_hit_returns_whole_range_result() {
        let detector = ScriptedDetector::default()
            .with(100, 1300, 65)
            .with(612, 1124, 66);
        let mut analyzer = SlicedPitchAnalyzer::new(512, detector).unwrap();
        let samples = vec![0.0; 2000];
        let event = analyzer.process(&samples, 100, 1300, &MicProfile::default(), &target(), 0);
        assert_eq!(event.map(|e| e.midi_note), Some(65));
        // ceil(1200 / 512) = 3 slices, last one clamped to the range end
        assert_eq!(
            analyzer.detector().calls,
            vec![(100, 1300), (100, 612), (612, 1124), (1124, 1300)]
        );
    }

    #[test]
    fn test_short_range_is_not_sliced() {
        let mut analyzer = SlicedPitchAnalyzer::new(512, ScriptedDetector::default()).unwrap();
        let samples = vec![0.0; 2000];
        let event = analyzer.process(&samples, 0, 512, &MicProfile::default(), &target(), 0);
        assert_eq!(event, None);
        assert_eq!(analyzer.detector().calls, vec![(0, 512)]);
    }

    #[test]
    fn test_empty_range_skips_detector() {
        let mut analyzer = SlicedPitchAnalyzer::new(512, ScriptedDetector::default()).unwrap();
        let samples = vec![0.0; 2000];
        let event = analyzer.process(&samples, 700, 700, &MicProfile::default(), &target(), 0);
        assert_eq!(event, None);
        assert!(analyzer.detector().calls.is_empty());
    }
}

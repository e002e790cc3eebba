use crate::scoring::types::{Sentence, Song};

/// Song-time queries needed by the tracker.
pub trait SongTimeline {
    /// Milliseconds from the start of the audio to `beat`.
    fn beat_to_millis(&self, beat: i32) -> f64;

    /// Sentences in singing order.
    fn sentences(&self) -> &[Sentence];

    fn sentence(&self, index: usize) -> Option<&Sentence> {
        self.sentences().get(index)
    }
}

fn millis_per_beat(bpm: f64) -> f64 {
    60_000.0 / bpm / 4.0
}

impl SongTimeline for Song {
    fn beat_to_millis(&self, beat: i32) -> f64 {
        let mut millis = self.gap_ms;
        let mut segment_start = 0;
        let mut segment_bpm = self.bpm;
        for change in &self.tempo_changes {
            if change.beat >= beat {
                break;
            }
            millis += (change.beat - segment_start) as f64 * millis_per_beat(segment_bpm);
            segment_start = change.beat;
            segment_bpm = change.bpm;
        }
        millis + (beat - segment_start) as f64 * millis_per_beat(segment_bpm)
    }

    fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::types::TempoChange;

    #[test]
    fn test_constant_tempo() {
        // 300 BPM -> 50 ms per quarter beat
        let song = Song::new(300.0, 1000.0, vec![]).unwrap();
        assert_eq!(song.beat_to_millis(0), 1000.0);
        assert_eq!(song.beat_to_millis(4), 1200.0);
        assert_eq!(song.beat_to_millis(-2), 900.0);
    }

    #[test]
    fn test_tempo_changes() {
        let song = Song::new(300.0, 0.0, vec![])
            .unwrap()
            .with_tempo_changes(vec![TempoChange { beat: 8, bpm: 150.0 }])
            .unwrap();
        assert_eq!(song.beat_to_millis(8), 400.0);
        // after the change a beat lasts 100 ms
        assert_eq!(song.beat_to_millis(10), 600.0);
        assert_eq!(song.beat_to_millis(4), 200.0);
    }

    #[test]
    fn test_sentence_past_end() {
        let song = Song::new(300.0, 0.0, vec![]).unwrap();
        assert!(song.sentence(0).is_none());
    }
}

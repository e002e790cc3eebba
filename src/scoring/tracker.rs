//! Beat-by-beat scoring of a singer against the song's note timeline.
//!
//! The tracker is driven by the playback clock: each call to
//! [`BeatScoringTracker::tick`] analyzes at most one beat whose samples are
//! fully recorded, applies rounding and the joker rule, and publishes the
//! resulting events.

use log::{debug, trace, warn};

use crate::capture::SampleCapture;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::midi;
use crate::pitch::sliced::SlicedPitchAnalyzer;
use crate::pitch::{MicProfile, PitchDetector};
use crate::scoring::events::{
    BeatAnalyzedEvent, NoteAnalyzedEvent, SentenceAnalyzedEvent, TrackerEvent,
};
use crate::scoring::timeline::SongTimeline;
use crate::scoring::types::Sentence;

/// Position of the analysis within the song.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AnalysisCursor {
    sentence_index: usize,
    beat_to_analyze: i32,
    /// Index into the sentence's sorted notes of the current or upcoming note.
    next_note: usize,
}

/// One-shot leniency earned by singing correctly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JokerState {
    has_joker: bool,
    used_count: u32,
}

impl JokerState {
    pub fn has_joker(&self) -> bool {
        self.has_joker
    }

    pub fn used_count(&self) -> u32 {
        self.used_count
    }

    /// Returns the rounded note to report for a beat whose target is `target`.
    ///
    /// A correct beat earns the joker, silence forfeits it, and a wrong beat
    /// while holding it consumes it and is reported as the target.
    fn apply(&mut self, pitch_detected: bool, rounded: Option<i32>, target: i32) -> Option<i32> {
        if pitch_detected && rounded == Some(target) {
            self.has_joker = true;
        }
        if !pitch_detected {
            self.has_joker = false;
        }
        if rounded != Some(target) && self.has_joker {
            self.has_joker = false;
            self.used_count += 1;
            return Some(target);
        }
        rounded
    }
}

type Listener<'a> = Box<dyn FnMut(&TrackerEvent<'a>) + 'a>;

/// Scores one singer. Independent trackers share nothing, so each player
/// gets their own instance.
pub struct BeatScoringTracker<'a, T, D> {
    timeline: &'a T,
    analyzer: SlicedPitchAnalyzer<D>,
    mic_profile: Option<MicProfile>,
    rounding_distance: u8,
    /// `None` once every sentence has been analyzed.
    cursor: Option<AnalysisCursor>,
    joker: JokerState,
    listeners: Vec<Listener<'a>>,
}

impl<'a, T: SongTimeline, D: PitchDetector> BeatScoringTracker<'a, T, D> {
    /// Without a microphone profile the tracker is disabled and never emits
    /// events.
    pub fn new(
        timeline: &'a T,
        detector: D,
        mic_profile: Option<MicProfile>,
        config: &TrackerConfig,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        let analyzer = SlicedPitchAnalyzer::new(config.slice_size, detector)?;
        if mic_profile.is_none() {
            warn!("No microphone configured, not recording notes for this player");
        }
        Ok(BeatScoringTracker {
            timeline,
            analyzer,
            mic_profile,
            rounding_distance: config.rounding_distance,
            cursor: cursor_at_sentence(timeline, 0),
            joker: JokerState::default(),
            listeners: Vec::new(),
        })
    }

    /// Register a listener called synchronously for every published event.
    /// Listeners cannot reach the tracker, so they never disturb the cursor.
    pub fn add_listener(&mut self, listener: impl FnMut(&TrackerEvent<'a>) + 'a) {
        self.listeners.push(Box::new(listener));
    }

    pub fn is_enabled(&self) -> bool {
        self.mic_profile.is_some()
    }

    pub fn is_idle(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn beat_to_analyze(&self) -> Option<i32> {
        self.cursor.map(|c| c.beat_to_analyze)
    }

    pub fn recording_sentence_index(&self) -> Option<usize> {
        self.cursor.map(|c| c.sentence_index)
    }

    pub fn recording_sentence(&self) -> Option<&'a Sentence> {
        let timeline: &'a T = self.timeline;
        self.cursor
            .and_then(|c| timeline.sentence(c.sentence_index))
    }

    pub fn joker(&self) -> JokerState {
        self.joker
    }

    pub fn has_joker(&self) -> bool {
        self.joker.has_joker
    }

    pub fn used_joker_count(&self) -> u32 {
        self.joker.used_count
    }

    pub fn rounding_distance(&self) -> u8 {
        self.rounding_distance
    }

    /// Analyze the next beat if its samples have been fully recorded at
    /// `position_ms` (song playback position). Returns the events of this
    /// tick after delivering them to the listeners.
    pub fn tick<C: SampleCapture + ?Sized>(
        &mut self,
        capture: &C,
        position_ms: f64,
    ) -> Vec<TrackerEvent<'a>> {
        let Some(mic_profile) = &self.mic_profile else {
            return Vec::new();
        };
        let Some(cursor) = self.cursor else {
            return Vec::new();
        };
        let timeline: &'a T = self.timeline;
        let Some(sentence) = timeline.sentence(cursor.sentence_index) else {
            self.cursor = None;
            return Vec::new();
        };

        let delay_ms = mic_profile.delay_ms as f64;
        let beat = cursor.beat_to_analyze;
        if timeline.beat_to_millis(beat + 1) >= position_ms - delay_ms {
            return Vec::new();
        }

        let mut start = sample_index_for_beat(timeline, capture, beat, position_ms, delay_ms);
        let mut end = sample_index_for_beat(timeline, capture, beat + 1, position_ms, delay_ms);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }

        let note_at_beat = sentence
            .notes()
            .get(cursor.next_note)
            .filter(|note| note.contains_beat(beat));

        let beat_event = match note_at_beat {
            Some(note) => {
                let pitch_event = self.analyzer.process(
                    capture.samples(),
                    start,
                    end,
                    mic_profile,
                    note,
                    self.rounding_distance,
                );
                let rounded = pitch_event.map(|event| {
                    midi::round_recorded_note_for_target_note(
                        note,
                        event.midi_note,
                        self.rounding_distance,
                    )
                });
                let rounded = self
                    .joker
                    .apply(pitch_event.is_some(), rounded, note.midi_note);
                BeatAnalyzedEvent {
                    pitch_event,
                    beat,
                    note_at_beat: Some(note),
                    rounded_note: rounded,
                }
            }
            None => BeatAnalyzedEvent {
                pitch_event: None,
                beat,
                note_at_beat: None,
                rounded_note: None,
            },
        };
        trace!(
            "beat {} samples [{}, {}) detected {:?} rounded {:?}",
            beat,
            start,
            end,
            beat_event.pitch_event.map(|e| e.midi_note),
            beat_event.rounded_note
        );

        let mut events = vec![TrackerEvent::BeatAnalyzed(beat_event)];
        self.go_to_next_beat(&mut events);
        self.publish(&events);
        events
    }

    /// Re-derive the cursor for playback continuing at `target_beat`,
    /// without replaying the beats in between. No events are published.
    pub fn seek_to_beat(&mut self, target_beat: f64) {
        let timeline: &'a T = self.timeline;
        let sentences = timeline.sentences();
        let Some(sentence_index) = sentences
            .iter()
            .position(|s| target_beat <= s.max_beat() as f64)
        else {
            debug!("seek to beat {} is past the last sentence", target_beat);
            self.cursor = None;
            return;
        };

        let sentence = &sentences[sentence_index];
        let notes = sentence.notes();
        // Notes are sorted and disjoint, so the ones ending at or after the
        // target form a suffix.
        let next_note = notes
            .iter()
            .position(|n| target_beat <= n.end_beat as f64)
            .unwrap_or(notes.len());
        let beat_to_analyze = match notes.get(next_note) {
            Some(note) if (note.start_beat as f64) < target_beat => target_beat.floor() as i32,
            Some(note) => note.start_beat,
            None => sentence.max_beat(),
        };

        debug!(
            "seek to beat {}: sentence {}, next beat {}",
            target_beat, sentence_index, beat_to_analyze
        );
        self.cursor = Some(AnalysisCursor {
            sentence_index,
            beat_to_analyze,
            next_note,
        });
    }

    fn go_to_next_beat(&mut self, events: &mut Vec<TrackerEvent<'a>>) {
        let timeline: &'a T = self.timeline;
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        let Some(sentence) = timeline.sentence(cursor.sentence_index) else {
            self.cursor = None;
            return;
        };

        cursor.beat_to_analyze += 1;
        if cursor.beat_to_analyze > sentence.max_beat() {
            self.go_to_next_sentence(events);
            return;
        }

        let notes = sentence.notes();
        if let Some(note) = notes.get(cursor.next_note) {
            if note.end_beat <= cursor.beat_to_analyze {
                cursor.next_note += 1;
                events.push(TrackerEvent::NoteAnalyzed(NoteAnalyzedEvent { note }));
            }
        }

        match notes.get(cursor.next_note) {
            Some(note) => {
                // Skip the silent gap up to the next note
                if note.start_beat > cursor.beat_to_analyze {
                    cursor.beat_to_analyze = note.start_beat;
                }
            }
            None => self.go_to_next_sentence(events),
        }
    }

    fn go_to_next_sentence(&mut self, events: &mut Vec<TrackerEvent<'a>>) {
        let timeline: &'a T = self.timeline;
        let Some(cursor) = self.cursor else {
            return;
        };
        let next_index = cursor.sentence_index + 1;
        if let Some(sentence) = timeline.sentence(cursor.sentence_index) {
            let is_last_sentence = timeline.sentence(next_index).is_none();
            events.push(TrackerEvent::SentenceAnalyzed(SentenceAnalyzedEvent {
                sentence_index: cursor.sentence_index,
                sentence,
                is_last_sentence,
            }));
        }
        self.cursor = cursor_at_sentence(timeline, next_index);
        match self.cursor {
            Some(next) => debug!(
                "sentence {} analyzed, continuing at beat {}",
                cursor.sentence_index, next.beat_to_analyze
            ),
            None => debug!("sentence {} analyzed, song finished", cursor.sentence_index),
        }
    }

    fn publish(&mut self, events: &[TrackerEvent<'a>]) {
        for event in events {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
    }
}

fn cursor_at_sentence<T: SongTimeline>(timeline: &T, sentence_index: usize) -> Option<AnalysisCursor> {
    timeline
        .sentence(sentence_index)
        .map(|sentence| AnalysisCursor {
            sentence_index,
            beat_to_analyze: sentence.min_beat(),
            next_note: 0,
        })
}

/// Buffer index of the sample recorded at `beat`. The newest sample sits at
/// the end of the buffer, so older beats map to lower indices. The result is
/// clamped to `0..=len` and may be used as an exclusive end.
fn sample_index_for_beat<T: SongTimeline, C: SampleCapture + ?Sized>(
    timeline: &T,
    capture: &C,
    beat: i32,
    position_ms: f64,
    delay_ms: f64,
) -> usize {
    let len = capture.samples().len() as i64;
    let passed_ms = position_ms - timeline.beat_to_millis(beat) - delay_ms;
    let passed_samples = (passed_ms / 1000.0 * capture.sample_rate() as f64).round() as i64;
    (len - passed_samples).clamp(0, len) as usize
}

/// Events of a complete offline analysis.
#[derive(Debug, Clone)]
pub struct RecordingAnalysis<'a> {
    pub events: Vec<TrackerEvent<'a>>,
    pub used_joker_count: u32,
}

/// Score a complete recording that started together with the song. The
/// playback position is taken to be the end of the recording.
pub fn analyze_recording<'a, T, D, C>(
    timeline: &'a T,
    detector: D,
    mic_profile: MicProfile,
    config: &TrackerConfig,
    capture: &C,
) -> Result<RecordingAnalysis<'a>, TrackerError>
where
    T: SongTimeline,
    D: PitchDetector,
    C: SampleCapture + ?Sized,
{
    if capture.sample_rate() == 0 {
        return Err(TrackerError::InvalidSampleRate(0));
    }
    let position_ms = capture.samples().len() as f64 * 1000.0 / capture.sample_rate() as f64;
    let mut tracker = BeatScoringTracker::new(timeline, detector, Some(mic_profile), config)?;
    let mut events = Vec::new();
    loop {
        let tick_events = tracker.tick(capture, position_ms);
        if tick_events.is_empty() {
            break;
        }
        events.extend(tick_events);
    }
    Ok(RecordingAnalysis {
        events,
        used_joker_count: tracker.used_joker_count(),
    })
}

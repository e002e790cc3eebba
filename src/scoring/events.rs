use serde::Serialize;

use crate::pitch::PitchEvent;
use crate::scoring::types::{Note, Sentence};

/// Result of analyzing one beat.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct BeatAnalyzedEvent<'a> {
    /// Raw detection, `None` when nothing was sung or the beat has no note.
    pub pitch_event: Option<PitchEvent>,
    pub beat: i32,
    pub note_at_beat: Option<&'a Note>,
    /// Detected note after rounding and the joker rule.
    pub rounded_note: Option<i32>,
}

impl BeatAnalyzedEvent<'_> {
    /// True when the beat counts as sung correctly.
    pub fn is_correct(&self) -> bool {
        match (self.note_at_beat, self.rounded_note) {
            (Some(note), Some(rounded)) => rounded == note.midi_note,
            _ => false,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NoteAnalyzedEvent<'a> {
    pub note: &'a Note,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SentenceAnalyzedEvent<'a> {
    pub sentence_index: usize,
    pub sentence: &'a Sentence,
    pub is_last_sentence: bool,
}

/// Events published by the tracker. Within one tick they are ordered beat,
/// then note, then sentence.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent<'a> {
    BeatAnalyzed(BeatAnalyzedEvent<'a>),
    NoteAnalyzed(NoteAnalyzedEvent<'a>),
    SentenceAnalyzed(SentenceAnalyzedEvent<'a>),
}

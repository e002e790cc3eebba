use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    #[default]
    Normal,
    Golden,
    Freestyle,
    Rap,
    RapGolden,
}

impl NoteType {
    /// Rap notes accept any detected sound as correct.
    pub fn is_rap(self) -> bool {
        matches!(self, NoteType::Rap | NoteType::RapGolden)
    }

    pub fn is_golden(self) -> bool {
        matches!(self, NoteType::Golden | NoteType::RapGolden)
    }

    pub fn is_freestyle(self) -> bool {
        self == NoteType::Freestyle
    }
}

/// A sung note covering beats `start_beat..end_beat`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Note {
    pub start_beat: i32,
    pub end_beat: i32,
    pub midi_note: i32,
    #[serde(default)]
    pub note_type: NoteType,
    #[serde(default)]
    pub text: String,
}

impl Note {
    pub fn new(start_beat: i32, end_beat: i32, midi_note: i32, note_type: NoteType) -> Self {
        Note {
            start_beat,
            end_beat,
            midi_note,
            note_type,
            text: String::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn length_in_beats(&self) -> i32 {
        self.end_beat - self.start_beat
    }

    pub fn contains_beat(&self, beat: i32) -> bool {
        self.start_beat <= beat && beat < self.end_beat
    }
}

#[derive(Deserialize)]
struct SentenceData {
    notes: Vec<Note>,
}

/// One line of lyrics: a non-empty run of notes sorted by start beat that
/// never overlap.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "SentenceData")]
pub struct Sentence {
    notes: Vec<Note>,
}

impl Sentence {
    pub fn new(mut notes: Vec<Note>) -> Result<Self, TrackerError> {
        if notes.is_empty() {
            return Err(TrackerError::EmptySentence);
        }
        for note in &notes {
            if note.start_beat >= note.end_beat {
                return Err(TrackerError::InvalidNoteInterval {
                    start: note.start_beat,
                    end: note.end_beat,
                });
            }
        }
        notes.sort_by_key(|n| n.start_beat);
        for pair in notes.windows(2) {
            if pair[1].start_beat < pair[0].end_beat {
                return Err(TrackerError::OverlappingNotes {
                    previous_end: pair[0].end_beat,
                    next_start: pair[1].start_beat,
                });
            }
        }
        Ok(Sentence { notes })
    }

    /// Notes sorted by start beat.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn min_beat(&self) -> i32 {
        self.notes.first().map_or(0, |n| n.start_beat)
    }

    /// End beat (exclusive) of the last note.
    pub fn max_beat(&self) -> i32 {
        self.notes.iter().map(|n| n.end_beat).max().unwrap_or(0)
    }
}

impl TryFrom<SentenceData> for Sentence {
    type Error = TrackerError;

    fn try_from(data: SentenceData) -> Result<Self, Self::Error> {
        Sentence::new(data.notes)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TempoChange {
    pub beat: i32,
    pub bpm: f64,
}

#[derive(Deserialize)]
struct SongData {
    bpm: f64,
    #[serde(default)]
    gap_ms: f64,
    #[serde(default)]
    tempo_changes: Vec<TempoChange>,
    sentences: Vec<Sentence>,
    #[serde(default)]
    title: Option<String>,
}

/// The note timeline of one voice of a song.
///
/// Beats are quarter beats of the song's BPM, as in UltraStar song files.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(try_from = "SongData")]
pub struct Song {
    pub(crate) bpm: f64,
    pub(crate) gap_ms: f64,
    pub(crate) tempo_changes: Vec<TempoChange>,
    pub(crate) sentences: Vec<Sentence>,
    pub title: Option<String>,
}

impl Song {
    pub fn new(bpm: f64, gap_ms: f64, sentences: Vec<Sentence>) -> Result<Self, TrackerError> {
        let song = Song {
            bpm,
            gap_ms,
            tempo_changes: Vec::new(),
            sentences,
            title: None,
        };
        song.validate()?;
        Ok(song)
    }

    pub fn with_tempo_changes(mut self, tempo_changes: Vec<TempoChange>) -> Result<Self, TrackerError> {
        self.tempo_changes = tempo_changes;
        self.validate()?;
        Ok(self)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn gap_ms(&self) -> f64 {
        self.gap_ms
    }

    pub fn tempo_changes(&self) -> &[TempoChange] {
        &self.tempo_changes
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(TrackerError::InvalidTempo(self.bpm));
        }
        let mut previous_beat: Option<i32> = None;
        for change in &self.tempo_changes {
            if !(change.bpm.is_finite() && change.bpm > 0.0) {
                return Err(TrackerError::InvalidTempo(change.bpm));
            }
            if previous_beat.is_some_and(|beat| change.beat <= beat) {
                return Err(TrackerError::UnsortedTempoChanges(change.beat));
            }
            previous_beat = Some(change.beat);
        }
        for (index, pair) in self.sentences.windows(2).enumerate() {
            if pair[1].min_beat() < pair[0].max_beat() {
                return Err(TrackerError::UnorderedSentences {
                    index: index + 1,
                    min_beat: pair[1].min_beat(),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<SongData> for Song {
    type Error = TrackerError;

    fn try_from(data: SongData) -> Result<Self, Self::Error> {
        let song = Song {
            bpm: data.bpm,
            gap_ms: data.gap_ms,
            tempo_changes: data.tempo_changes,
            sentences: data.sentences,
            title: data.title,
        };
        song.validate()?;
        Ok(song)
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::midi;
use crate::scoring::events::TrackerEvent;
use crate::scoring::types::{Note, NoteType, Sentence};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    Perfect,
    Partial,
    Missed,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SentenceRating {
    Awful,
    Bad,
    NotBad,
    Good,
    Great,
    Perfect,
}

impl SentenceRating {
    pub fn from_ratio(correct_ratio: f64) -> Self {
        if correct_ratio >= 0.95 {
            SentenceRating::Perfect
        } else if correct_ratio >= 0.8 {
            SentenceRating::Great
        } else if correct_ratio >= 0.6 {
            SentenceRating::Good
        } else if correct_ratio >= 0.4 {
            SentenceRating::NotBad
        } else if correct_ratio >= 0.2 {
            SentenceRating::Bad
        } else {
            SentenceRating::Awful
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct NoteResult {
    pub start_beat: i32,
    pub target_midi: i32,
    pub target_name: String,
    pub note_type: NoteType,
    pub length_in_beats: u32,
    pub beats_analyzed: u32,
    pub beats_correct: u32,
    pub status: NoteStatus,
}

#[derive(Serialize, Clone, Debug)]
pub struct SentenceResult {
    pub sentence_index: usize,
    pub correct_ratio: f64,
    pub rating: SentenceRating,
}

#[derive(Serialize, Clone, Debug)]
pub struct PerformanceAnalysis {
    pub total_notes: u32,
    pub notes_perfect: u32,
    pub notes_partial: u32,
    pub notes_missed: u32,
    pub beats_analyzed: u32,
    pub beats_correct: u32,
    pub golden_beats_correct: u32,
    pub used_joker_count: u32,
    pub overall_score: f64, // 0-100
    pub note_results: Vec<NoteResult>,
    pub sentence_results: Vec<SentenceResult>,
    pub feedback: Vec<String>,
}

/// Hit or miss per analyzed beat of a note. Replayed beats overwrite.
#[derive(Default, Clone)]
struct BeatTally {
    beats: BTreeMap<i32, bool>,
}

impl BeatTally {
    fn analyzed(&self) -> u32 {
        self.beats.len() as u32
    }

    fn correct(&self) -> u32 {
        self.beats.values().filter(|&&hit| hit).count() as u32
    }
}

/// Beat weight in the score. Freestyle notes are not scored.
fn beat_weight(note_type: NoteType) -> u32 {
    if note_type.is_freestyle() {
        0
    } else if note_type.is_golden() {
        2
    } else {
        1
    }
}

/// Collects tracker events into a performance summary.
///
/// Notes and sentences are keyed by their start beat and index, so parts
/// sung again after a backward seek replace their earlier results.
#[derive(Default)]
pub struct PerformanceAnalyzer {
    open_notes: BTreeMap<i32, BeatTally>,
    note_results: Vec<NoteResult>,
    sentence_results: Vec<SentenceResult>,
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &TrackerEvent) {
        match event {
            TrackerEvent::BeatAnalyzed(beat) => {
                let Some(note) = beat.note_at_beat else {
                    return;
                };
                if note.note_type.is_freestyle() {
                    return;
                }
                self.open_notes
                    .entry(note.start_beat)
                    .or_default()
                    .beats
                    .insert(beat.beat, beat.is_correct());
            }
            TrackerEvent::NoteAnalyzed(finished) => self.finish_note(finished.note),
            TrackerEvent::SentenceAnalyzed(finished) => {
                self.finish_sentence(finished.sentence_index, finished.sentence)
            }
        }
    }

    fn finish_note(&mut self, note: &Note) {
        if note.note_type.is_freestyle() {
            return;
        }
        let tally = self.open_notes.remove(&note.start_beat).unwrap_or_default();
        let length_in_beats = note.length_in_beats() as u32;
        let beats_correct = tally.correct();
        let status = if beats_correct == 0 {
            NoteStatus::Missed
        } else if beats_correct >= length_in_beats {
            NoteStatus::Perfect
        } else {
            NoteStatus::Partial
        };
        let result = NoteResult {
            start_beat: note.start_beat,
            target_midi: note.midi_note,
            target_name: midi::absolute_name(note.midi_note),
            note_type: note.note_type,
            length_in_beats,
            beats_analyzed: tally.analyzed(),
            beats_correct,
            status,
        };
        match self
            .note_results
            .iter_mut()
            .find(|r| r.start_beat == note.start_beat)
        {
            Some(existing) => *existing = result,
            None => self.note_results.push(result),
        }
    }

    fn finish_sentence(&mut self, sentence_index: usize, sentence: &Sentence) {
        let mut correct = 0;
        let mut total = 0;
        for note in sentence.notes() {
            let weight = beat_weight(note.note_type);
            total += note.length_in_beats() as u32 * weight;
            if let Some(result) = self
                .note_results
                .iter()
                .find(|r| r.start_beat == note.start_beat)
            {
                correct += result.beats_correct * weight;
            }
        }
        // Notes cut short by a seek never get their own event
        self.open_notes.clear();
        // A sentence of freestyle notes has nothing to get wrong
        let correct_ratio = if total > 0 {
            correct as f64 / total as f64
        } else {
            1.0
        };
        let result = SentenceResult {
            sentence_index,
            correct_ratio,
            rating: SentenceRating::from_ratio(correct_ratio),
        };
        match self
            .sentence_results
            .iter_mut()
            .find(|r| r.sentence_index == sentence_index)
        {
            Some(existing) => *existing = result,
            None => self.sentence_results.push(result),
        }
    }

    pub fn finish(&self, used_joker_count: u32) -> PerformanceAnalysis {
        let count = |status: NoteStatus| {
            self.note_results
                .iter()
                .filter(|r| r.status == status)
                .count() as u32
        };
        let notes_perfect = count(NoteStatus::Perfect);
        let notes_partial = count(NoteStatus::Partial);
        let notes_missed = count(NoteStatus::Missed);
        let total_notes = self.note_results.len() as u32;
        let beats_analyzed = self.note_results.iter().map(|r| r.beats_analyzed).sum();
        let beats_correct = self.note_results.iter().map(|r| r.beats_correct).sum();
        let golden_beats_correct = self
            .note_results
            .iter()
            .filter(|r| r.note_type.is_golden())
            .map(|r| r.beats_correct)
            .sum();
        let weighted_correct: u32 = self
            .note_results
            .iter()
            .map(|r| r.beats_correct * beat_weight(r.note_type))
            .sum();
        let weighted_total: u32 = self
            .note_results
            .iter()
            .map(|r| r.length_in_beats * beat_weight(r.note_type))
            .sum();

        let overall_score = if weighted_total > 0 {
            (weighted_correct as f64 / weighted_total as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        let mut feedback: Vec<String> = Vec::new();
        if total_notes == 0 {
            feedback.push("No notes were sung yet.".to_string());
        } else {
            if overall_score >= 90.0 {
                feedback.push(format!("Superstar! You hit {:.0}% of the beats.", overall_score));
            } else if overall_score >= 70.0 {
                feedback.push(format!("Great singing! You hit {:.0}% of the beats.", overall_score));
            } else if overall_score >= 40.0 {
                feedback.push(format!(
                    "Keep practicing! You hit {:.0}% of the beats.",
                    overall_score
                ));
            } else {
                feedback.push(format!(
                    "This one's tough! You hit {:.0}% of the beats. Try an easier difficulty.",
                    overall_score
                ));
            }

            if notes_missed > 0 {
                feedback.push(format!(
                    "You missed {} note{} completely.",
                    notes_missed,
                    if notes_missed == 1 { "" } else { "s" }
                ));
            }

            let perfect_sentences = self
                .sentence_results
                .iter()
                .filter(|s| s.rating == SentenceRating::Perfect)
                .count();
            if perfect_sentences > 0 {
                feedback.push(format!(
                    "{} perfect line{}.",
                    perfect_sentences,
                    if perfect_sentences == 1 { "" } else { "s" }
                ));
            }
        }

        if used_joker_count > 0 {
            feedback.push(format!(
                "{} wobble{} forgiven while you kept singing.",
                used_joker_count,
                if used_joker_count == 1 { " was" } else { "s were" }
            ));
        }

        PerformanceAnalysis {
            total_notes,
            notes_perfect,
            notes_partial,
            notes_missed,
            beats_analyzed,
            beats_correct,
            golden_beats_correct,
            used_joker_count,
            overall_score,
            note_results: self.note_results.clone(),
            sentence_results: self.sentence_results.clone(),
            feedback,
        }
    }
}

/// Summarize a finished list of tracker events.
pub fn analyze_events(events: &[TrackerEvent], used_joker_count: u32) -> PerformanceAnalysis {
    let mut analyzer = PerformanceAnalyzer::new();
    for event in events {
        analyzer.observe(event);
    }
    analyzer.finish(used_joker_count)
}

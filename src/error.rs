use thiserror::Error;

/// Contract violations detected while building songs, analyzers or trackers.
///
/// Nothing in the per-beat loop returns these; a missing pitch is a normal
/// value, not an error.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid slice size: {0}. Must be greater than 0")]
    InvalidSliceSize(usize),

    #[error("Invalid rounding distance: {0}. Must be between 0 and 6")]
    InvalidRoundingDistance(u8),

    #[error("Invalid note interval: start beat {start} must be before end beat {end}")]
    InvalidNoteInterval { start: i32, end: i32 },

    #[error("Sentence has no notes")]
    EmptySentence,

    #[error("Notes overlap: note ending at beat {previous_end} and note starting at beat {next_start}")]
    OverlappingNotes { previous_end: i32, next_start: i32 },

    #[error("Sentence {index} starts at beat {min_beat} before the previous sentence ends")]
    UnorderedSentences { index: usize, min_beat: i32 },

    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f64),

    #[error("Tempo changes must be sorted by beat, found beat {0} out of order")]
    UnsortedTempoChanges(i32),

    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

//! MIDI note arithmetic shared by the detector, the slicing analyzer and the
//! beat tracker. Every function is total over `i32` notes.

use crate::pitch::PitchEvent;
use crate::scoring::types::Note;

/// Lowest singable note, C2 (65.41 Hz).
pub const SINGABLE_NOTE_MIN: i32 = 36;
/// Highest singable note, C6 (1046.50 Hz).
pub const SINGABLE_NOTE_MAX: i32 = 84;
/// Number of halftones in the singable range.
pub const SINGABLE_NOTE_RANGE: usize = 49;

/// A4, the concert pitch reference.
pub const CONCERT_PITCH_NOTE: i32 = 69;
pub const CONCERT_PITCH_FREQUENCY: f64 = 440.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const BLACK_KEY_PITCH_CLASSES: [i32; 5] = [1, 3, 6, 8, 10];

/// Octave of a note, with C4 = 60 in octave 4.
pub fn octave(midi_note: i32) -> i32 {
    midi_note / 12 - 1
}

/// Note reduced to one of the 12 semitones, always in `0..12`.
pub fn pitch_class(midi_note: i32) -> i32 {
    midi_note.rem_euclid(12)
}

pub fn relative_name(midi_note: i32) -> &'static str {
    NOTE_NAMES[pitch_class(midi_note) as usize]
}

/// Name including octave, e.g. "A4" for 69.
pub fn absolute_name(midi_note: i32) -> String {
    format!("{}{}", relative_name(midi_note), octave(midi_note))
}

/// Shortest distance around the pitch-class circle, in `0..=6`.
pub fn unsigned_pitch_class_distance(from_note: i32, to_note: i32) -> i32 {
    let unwrapped = (pitch_class(to_note) - pitch_class(from_note)).abs();
    let wrapped = 12 - unwrapped;
    unwrapped.min(wrapped)
}

/// Shortest distance around the pitch-class circle, keeping the direction
/// (positive is upwards from `from_note`).
pub fn signed_pitch_class_distance(from_note: i32, to_note: i32) -> i32 {
    let unwrapped = pitch_class(to_note) - pitch_class(from_note);
    let wrapped = if unwrapped >= 0 {
        unwrapped - 12
    } else {
        unwrapped + 12
    };
    if unwrapped.abs() < wrapped.abs() {
        unwrapped
    } else {
        wrapped
    }
}

pub fn is_black_key(midi_note: i32) -> bool {
    BLACK_KEY_PITCH_CLASSES.contains(&pitch_class(midi_note))
}

pub fn is_white_key(midi_note: i32) -> bool {
    !is_black_key(midi_note)
}

pub fn is_singable(midi_note: i32) -> bool {
    (SINGABLE_NOTE_MIN..=SINGABLE_NOTE_MAX).contains(&midi_note)
}

/// Snap `recorded` onto `target` when their pitch classes are at most
/// `distance` apart. Octaves are ignored.
pub fn round_toward_target(recorded: i32, target: i32, distance: u8) -> i32 {
    if unsigned_pitch_class_distance(recorded, target) <= distance as i32 {
        target
    } else {
        recorded
    }
}

/// Rounds a detected note for scoring against `target_note`.
///
/// Rap notes accept any sound. A detection outside the singable range is
/// treated as a detector failure and gets the benefit of the doubt.
pub fn round_recorded_note_for_target_note(
    target_note: &Note,
    recorded_note: i32,
    distance: u8,
) -> i32 {
    if target_note.note_type.is_rap() || !is_singable(recorded_note) {
        target_note.midi_note
    } else {
        round_toward_target(recorded_note, target_note.midi_note, distance)
    }
}

pub fn is_note_hit(target_note: &Note, pitch_event: Option<&PitchEvent>, distance: u8) -> bool {
    match pitch_event {
        Some(event) => {
            let rounded =
                round_recorded_note_for_target_note(target_note, event.midi_note, distance);
            pitch_class(target_note.midi_note) == pitch_class(rounded)
        }
        None => false,
    }
}

/// Equal-tempered frequency of a note.
pub fn frequency_of(midi_note: i32) -> f32 {
    let octave_offset = (midi_note - CONCERT_PITCH_NOTE) as f64 / 12.0;
    (CONCERT_PITCH_FREQUENCY * 2.0_f64.powf(octave_offset)) as f32
}

/// Nearest note for a frequency in Hz.
pub fn midi_note_from_frequency(freq_hz: f32) -> i32 {
    let midi_float = CONCERT_PITCH_NOTE as f64 + 12.0 * (freq_hz as f64 / CONCERT_PITCH_FREQUENCY).log2();
    midi_float.round() as i32
}

/// Frequencies of `note_count` consecutive halftones starting at `note_min`.
pub fn precalculate_frequencies(note_min: i32, note_count: usize) -> Vec<f32> {
    (0..note_count)
        .map(|i| frequency_of(note_min + i as i32))
        .collect()
}

/// Period length in samples for each frequency.
pub fn precalculate_sample_delays(sample_rate_hz: u32, frequencies: &[f32]) -> Vec<usize> {
    frequencies
        .iter()
        .map(|&f| (sample_rate_hz as f32 / f).round() as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::types::NoteType;

    fn note(midi_note: i32, note_type: NoteType) -> Note {
        Note::new(0, 4, midi_note, note_type)
    }

    #[test]
    fn test_octave_and_names() {
        assert_eq!(octave(60), 4);
        assert_eq!(octave(12), 0);
        assert_eq!(octave(36), 2);
        assert_eq!(relative_name(61), "C#");
        assert_eq!(absolute_name(69), "A4");
        assert_eq!(absolute_name(84), "C6");
        assert_eq!(absolute_name(47), "B2");
    }

    #[test]
    fn test_pitch_class_octave_invariance() {
        for n in -30..130 {
            let pc = pitch_class(n);
            assert!((0..12).contains(&pc));
            for k in -3..=3 {
                assert_eq!(pitch_class(n + 12 * k), pc, "note {} shifted by {} octaves", n, k);
            }
        }
    }

    #[test]
    fn test_unsigned_distance_symmetric() {
        for a in 0..12 {
            for b in 0..12 {
                let d = unsigned_pitch_class_distance(a, b);
                assert_eq!(d, unsigned_pitch_class_distance(b, a));
                assert!((0..=6).contains(&d), "distance {} out of range", d);
            }
        }
        assert_eq!(unsigned_pitch_class_distance(2, 10), 4);
        assert_eq!(unsigned_pitch_class_distance(60, 73), 1);
    }

    #[test]
    fn test_signed_distance() {
        assert_eq!(signed_pitch_class_distance(2, 10), -4);
        assert_eq!(signed_pitch_class_distance(10, 2), 4);
        assert_eq!(signed_pitch_class_distance(60, 62), 2);
        assert_eq!(signed_pitch_class_distance(62, 60), -2);
        for a in 0..12 {
            for b in 0..12 {
                let d = signed_pitch_class_distance(a, b);
                assert_eq!(d, -signed_pitch_class_distance(b, a), "a={} b={}", a, b);
                assert_eq!(d.abs(), unsigned_pitch_class_distance(a, b));
            }
        }
    }

    #[test]
    fn test_black_and_white_keys() {
        let black: Vec<i32> = (60..72).filter(|&n| is_black_key(n)).collect();
        assert_eq!(black, vec![61, 63, 66, 68, 70]);
        assert!(is_white_key(60));
        assert!(is_white_key(71));
        assert!(!is_white_key(61));
        assert!(is_black_key(49));
    }

    #[test]
    fn test_round_toward_target_boundaries() {
        // distance 0: only exact pitch class rounds
        assert_eq!(round_toward_target(60, 60, 0), 60);
        assert_eq!(round_toward_target(61, 60, 0), 61);
        // other octave, same pitch class
        assert_eq!(round_toward_target(48, 60, 0), 60);
        // distance 6: everything rounds
        for recorded in 36..=84 {
            assert_eq!(round_toward_target(recorded, 60, 6), 60);
        }
        // one above the limit stays
        assert_eq!(round_toward_target(62, 60, 1), 62);
        assert_eq!(round_toward_target(62, 60, 2), 60);
    }

    #[test]
    fn test_round_recorded_note_out_of_range() {
        let target = note(62, NoteType::Normal);
        assert_eq!(round_recorded_note_for_target_note(&target, 20, 0), 62);
        assert_eq!(round_recorded_note_for_target_note(&target, 100, 0), 62);
        assert_eq!(round_recorded_note_for_target_note(&target, 35, 0), 62);
        assert_eq!(round_recorded_note_for_target_note(&target, 36, 0), 36);
        assert_eq!(round_recorded_note_for_target_note(&target, 85, 0), 62);
        assert_eq!(round_recorded_note_for_target_note(&target, 84, 0), 84);
        // same pitch class as the target rounds even at the range edges
        let c4 = note(60, NoteType::Normal);
        assert_eq!(round_recorded_note_for_target_note(&c4, 36, 0), 60);
        assert_eq!(round_recorded_note_for_target_note(&c4, 84, 0), 60);
    }

    #[test]
    fn test_rap_note_always_hit() {
        for note_type in [NoteType::Rap, NoteType::RapGolden] {
            let target = note(64, note_type);
            for recorded in [0, 20, 36, 50, 61, 84, 127] {
                let event = PitchEvent::from_midi_note(recorded);
                assert!(is_note_hit(&target, Some(&event), 0), "recorded {}", recorded);
            }
        }
    }

    #[test]
    fn test_is_note_hit_absent_event() {
        for note_type in [NoteType::Normal, NoteType::Golden, NoteType::Rap] {
            let target = note(60, note_type);
            for distance in 0..=6 {
                assert!(!is_note_hit(&target, None, distance));
            }
        }
    }

    #[test]
    fn test_is_note_hit_with_rounding() {
        let target = note(60, NoteType::Normal);
        let near = PitchEvent::from_midi_note(61);
        assert!(!is_note_hit(&target, Some(&near), 0));
        assert!(is_note_hit(&target, Some(&near), 1));
        let octave_up = PitchEvent::from_midi_note(72);
        assert!(is_note_hit(&target, Some(&octave_up), 0));
    }

    #[test]
    fn test_precalculate_frequencies() {
        assert_eq!(precalculate_frequencies(69, 1)[0], 440.0);
        assert!((precalculate_frequencies(57, 1)[0] - 220.0).abs() < 1e-3);
        let table = precalculate_frequencies(SINGABLE_NOTE_MIN, SINGABLE_NOTE_RANGE);
        assert_eq!(table.len(), 49);
        assert!((table[0] - 65.406).abs() < 0.01);
        assert!((table[48] - 1046.502).abs() < 0.01);
        assert!(table.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_precalculate_sample_delays() {
        let delays = precalculate_sample_delays(44100, &[440.0, 220.0, 1000.0]);
        assert_eq!(delays, vec![100, 200, 44]);
    }

    #[test]
    fn test_midi_note_from_frequency() {
        assert_eq!(midi_note_from_frequency(440.0), 69);
        assert_eq!(midi_note_from_frequency(261.63), 60);
        assert_eq!(midi_note_from_frequency(frequency_of(45)), 45);
    }
}

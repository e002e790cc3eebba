//! Real-time vocal pitch tracking and beat scoring for a singing game.
//!
//! [`scoring::tracker::BeatScoringTracker`] walks a song's sentences beat by
//! beat, runs pitch detection over the microphone samples of each beat and
//! publishes the analysis as [`scoring::events::TrackerEvent`]s.

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod capture;
pub mod config;
pub mod error;
pub mod midi;
pub mod pitch;
pub mod scoring;

pub use config::{Difficulty, TrackerConfig};
pub use error::TrackerError;

use capture::MicSampleBuffer;
use pitch::yin::YinDetector;
use pitch::MicProfile;
use scoring::analyzer::PerformanceAnalysis;
use scoring::events::TrackerEvent;
use scoring::types::Song;

use std::cell::RefCell;

thread_local! {
    static DETECTOR: RefCell<Option<YinDetector>> = RefCell::new(None);
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// YIN pitch detection returning Float64Array [hz, midi_note], or an empty
/// array when no pitch was found.
/// Reuses a thread-local detector while the sample rate stays the same.
#[wasm_bindgen]
pub fn detect_pitch(samples: &[f32], sample_rate: u32) -> js_sys::Float64Array {
    let event = DETECTOR.with(|cell| {
        let mut borrow = cell.borrow_mut();
        if borrow.as_ref().map(|d| d.sample_rate()) != Some(sample_rate) {
            *borrow = Some(YinDetector::new(sample_rate));
        }
        borrow.as_mut().and_then(|detector| {
            pitch::PitchDetector::detect(detector, samples, 0, samples.len(), &MicProfile::default())
        })
    });

    match event {
        Some(event) => {
            let arr = js_sys::Float64Array::new_with_length(2);
            arr.set_index(0, event.frequency as f64);
            arr.set_index(1, event.midi_note as f64);
            arr
        }
        None => js_sys::Float64Array::new_with_length(0),
    }
}

#[wasm_bindgen]
pub fn midi_note_name(midi_note: i32) -> String {
    midi::absolute_name(midi_note)
}

#[wasm_bindgen]
pub fn precalculate_frequencies(note_min: i32, note_count: usize) -> Vec<f32> {
    midi::precalculate_frequencies(note_min, note_count)
}

#[derive(Serialize)]
struct RecordingReport<'a> {
    events: Vec<TrackerEvent<'a>>,
    analysis: PerformanceAnalysis,
}

/// Score a full recording against a song. `mic_js` and `config_js` may be
/// null to use the defaults.
#[wasm_bindgen]
pub fn analyze_recording(
    song_js: JsValue,
    samples: &[f32],
    sample_rate: u32,
    mic_js: JsValue,
    config_js: JsValue,
) -> Result<JsValue, JsValue> {
    let song: Song = serde_wasm_bindgen::from_value(song_js).map_err(to_js_error)?;
    let mic_profile: MicProfile = if mic_js.is_null() || mic_js.is_undefined() {
        MicProfile::default()
    } else {
        serde_wasm_bindgen::from_value(mic_js).map_err(to_js_error)?
    };
    let config: TrackerConfig = if config_js.is_null() || config_js.is_undefined() {
        TrackerConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config_js).map_err(to_js_error)?
    };

    let capture = MicSampleBuffer::from_recording(samples.to_vec(), sample_rate).map_err(to_js_error)?;
    let recording = scoring::tracker::analyze_recording(
        &song,
        YinDetector::new(sample_rate),
        mic_profile,
        &config,
        &capture,
    )
    .map_err(to_js_error)?;

    let analysis = scoring::analyzer::analyze_events(&recording.events, recording.used_joker_count);
    let report = RecordingReport {
        events: recording.events,
        analysis,
    };
    serde_wasm_bindgen::to_value(&report).map_err(to_js_error)
}

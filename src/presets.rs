//! Built-in demo compositions for the CLI and examples.
//!
//! Pitches are given as MIDI note numbers and converted to Hz, A4 = 440.

use crate::types::{Envelope, Note, BEATS_PER_LOOP};

/// Convert MIDI note number (fractional) to Hz. A4 = MIDI 69 = 440 Hz.
pub fn midi_to_hz(midi: f64) -> f64 {
    440.0 * 2.0_f64.powf((midi - 69.0) / 12.0)
}

/// A minor-pentatonic lead phrase repeating every four measures.
///
/// Each entry: (beat offset within the 16-beat phrase, MIDI note, beats).
const MELODY_PHRASE: [(f64, f64, f64); 8] = [
    (0.0, 69.0, 1.0),  // A4
    (1.5, 72.0, 0.5),  // C5
    (2.0, 74.0, 1.0),  // D5
    (4.0, 76.0, 2.0),  // E5
    (7.0, 74.0, 0.5),  // D5
    (8.0, 72.0, 1.5),  // C5
    (10.0, 67.0, 1.0), // G4
    (12.0, 69.0, 3.0), // A4
];

/// The lead line: the four-measure phrase laid out four times across the
/// loop, alternating pan.
pub fn demo_melody() -> Vec<Note> {
    let envelope = Envelope {
        attack: 0.02,
        decay: 0.1,
        sustain: 0.6,
        release: 0.25,
    };
    let mut notes = Vec::new();
    for rep in 0..4 {
        let base = rep as f64 * 16.0;
        let pan = if rep % 2 == 0 { -0.3 } else { 0.3 };
        for (i, &(offset, midi, beats)) in MELODY_PHRASE.iter().enumerate() {
            notes.push(
                Note::new(
                    format!("lead-{}-{}", rep, i),
                    base + offset,
                    beats,
                    midi_to_hz(midi),
                )
                .with_volume(0.8)
                .with_pan(pan)
                .with_envelope(envelope),
            );
        }
    }
    notes
}

/// A kick on every beat and a hat on every offbeat, across all 16 measures.
pub fn four_on_the_floor() -> Vec<Note> {
    let kick_env = Envelope {
        attack: 0.001,
        decay: 0.08,
        sustain: 0.0,
        release: 0.05,
    };
    let hat_env = Envelope {
        attack: 0.001,
        decay: 0.03,
        sustain: 0.0,
        release: 0.02,
    };
    let mut notes = Vec::new();
    let beats = BEATS_PER_LOOP as usize;
    for beat in 0..beats {
        notes.push(
            Note::new(format!("kick-{}", beat), beat as f64, 0.25, midi_to_hz(36.0))
                .with_volume(1.0)
                .with_envelope(kick_env),
        );
        notes.push(
            Note::new(
                format!("hat-{}", beat),
                beat as f64 + 0.5,
                0.125,
                midi_to_hz(90.0),
            )
            .with_volume(0.4)
            .with_envelope(hat_env),
        );
    }
    notes
}

/// Melody plus pulse, for the full demo.
pub fn demo_full() -> Vec<Note> {
    let mut notes = four_on_the_floor();
    notes.extend(demo_melody());
    notes
}

/// A sparse arrangement: measures 0–3 and 8–11 active, the rest muted.
pub fn demo_arrangement() -> Vec<bool> {
    (0..16).map(|m| !(4..8).contains(&m) && !(12..16).contains(&m)).collect()
}

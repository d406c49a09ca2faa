//! Loop grid arithmetic: conversions between beats, seconds, and measures
//! on the fixed 16-measure / 64-beat loop.
//!
//! Pure functions, no state. All callers pass a bpm already checked by the
//! config validator (finite, > 0), so division by zero never reaches here.

use crate::types::{BEATS_PER_LOOP, BEATS_PER_MEASURE, MEASURES_PER_LOOP};

/// Length of one full loop in seconds: 64 beats at `bpm`.
pub fn loop_length_seconds(bpm: f64) -> f64 {
    BEATS_PER_LOOP * 60.0 / bpm
}

/// Beats elapsing per second at `bpm`.
pub fn beats_per_second(bpm: f64) -> f64 {
    bpm / 60.0
}

/// Seconds spanned by one beat at `bpm`.
pub fn seconds_per_beat(bpm: f64) -> f64 {
    60.0 / bpm
}

/// Measure index (0..15) containing a wrapped or unwrapped beat position.
pub fn measure_of_beat(beat: f64) -> usize {
    ((beat / BEATS_PER_MEASURE).floor() as i64).rem_euclid(MEASURES_PER_LOOP as i64) as usize
}

/// Euclidean wrap into `[0, modulus)`. On floats, `rem_euclid` can round
/// up to the modulus itself for tiny negative inputs, so that edge is
/// folded back to zero.
pub fn wrap(x: f64, modulus: f64) -> f64 {
    let r = x.rem_euclid(modulus);
    if r >= modulus {
        0.0
    } else {
        r
    }
}

/// Position within the measure, 0..4.
pub fn beat_in_measure(beat: f64) -> f64 {
    wrap(beat, BEATS_PER_MEASURE)
}

/// Wrapped beat position 0..64 for a global-clock time.
/// Well-defined for negative times via euclidean remainder.
pub fn beat_at(now_seconds: f64, bpm: f64) -> f64 {
    wrap(now_seconds * beats_per_second(bpm), BEATS_PER_LOOP)
}

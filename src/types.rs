use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Grid constants ─────────────────────────────────────────────────────────

/// Measures per loop. The loop grid is fixed: 16 measures of 4 beats.
pub const MEASURES_PER_LOOP: usize = 16;
/// Beats per measure.
pub const BEATS_PER_MEASURE: f64 = 4.0;
/// Beats per full loop (16 × 4).
pub const BEATS_PER_LOOP: f64 = 64.0;

// ─── Note definitions (caller-supplied, immutable) ──────────────────────────

/// ADSR envelope for a note. All times in seconds, sustain is a level 0–1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.05,
            sustain: 0.8,
            release: 0.1,
        }
    }
}

/// One note of the looping composition.
///
/// `start` is a beat offset into the 64-beat loop. It is not wrapped: the
/// note sounds at the same offset in every loop iteration. Notes are
/// read-only inputs to the resolver; id uniqueness is the caller's
/// responsibility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    /// Stable identifier, unique within a configuration.
    pub id: String,
    /// Beat offset within the loop, >= 0.
    pub start: f64,
    /// Length in beats, >= 0.001.
    pub duration: f64,
    /// Frequency in Hz, > 0.
    pub pitch: f64,
    /// Gain 0–1. Defaults to 1.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Stereo position -1 (left) to 1 (right). Defaults to 0 (center).
    #[serde(default)]
    pub pan: f64,
    /// Optional ADSR envelope for the audio backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Envelope>,
}

fn default_volume() -> f64 {
    1.0
}

impl Note {
    pub fn new(id: impl Into<String>, start: f64, duration: f64, pitch: f64) -> Self {
        Self {
            id: id.into(),
            start,
            duration,
            pitch,
            volume: 1.0,
            pan: 0.0,
            envelope: None,
        }
    }

    /// Measure the note nominally belongs to: floor(start / 4).
    /// May exceed 15 for starts past the end of the loop grid.
    pub fn home_measure(&self) -> usize {
        (self.start / BEATS_PER_MEASURE).floor() as usize
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_pan(mut self, pan: f64) -> Self {
        self.pan = pan;
        self
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: beat {:.2} +{:.2}  {:.1}Hz  vol={:.2} pan={:+.2}",
            self.id, self.start, self.duration, self.pitch, self.volume, self.pan
        )
    }
}

// ─── Derived note instances ─────────────────────────────────────────────────

/// Playback classification of a note instance relative to "now".
/// Serializes as plain strings ("Playing", "Upcoming", "Recent").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlayState {
    /// occ_start <= now < occ_end
    Playing,
    /// Starts within the lookahead window
    Upcoming,
    /// Ended within the retention window
    Recent,
}

/// One concrete sounding of a Note at an absolute time, produced by
/// projecting the note onto a specific loop iteration. Ephemeral: instances
/// are fully recomputed on every refresh and never patched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteInstance {
    /// Copied from the note for quick keying.
    pub id: String,
    /// The note this instance was projected from.
    pub note: Note,
    /// Absolute start, in global-clock seconds.
    pub start_seconds: f64,
    /// Absolute end, in global-clock seconds. Always > start_seconds.
    pub end_seconds: f64,
    pub state: PlayState,
}

impl fmt::Display for NoteInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            PlayState::Playing => "playing",
            PlayState::Upcoming => "upcoming",
            PlayState::Recent => "recent",
        };
        write!(
            f,
            "{} [{:>8}] {:.3}s–{:.3}s {:.1}Hz",
            self.id, state, self.start_seconds, self.end_seconds, self.note.pitch
        )
    }
}

// ─── Resolver output ────────────────────────────────────────────────────────

/// Complete derived state at a moment in time.
/// Produced by the resolver, published on the session's cell, consumed by
/// UI and audio backends. Every field is derivable from the clock value and
/// the configuration alone; there is no hidden transport state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// Global-clock time this snapshot was computed for.
    pub now_seconds: f64,
    /// Wrapped beat position, 0..64.
    pub current_beat: f64,
    /// Current measure index, 0..15.
    pub current_measure: usize,
    /// Beat within the current measure, 0..4.
    pub beat_in_measure: f64,
    /// Completed loop count since the shared epoch. Clamped to 0 for clocks
    /// that read before the epoch.
    pub loop_iteration: u64,
    /// Whether the current measure is active under the arrangement mask.
    pub measure_active: bool,
    /// Indices of all active measures, ascending.
    pub active_measures: Vec<usize>,
    /// Loop length in seconds at the configured tempo.
    pub loop_length_seconds: f64,
    /// Fraction through the current loop, 0..1.
    pub loop_progress: f64,
    /// Count of occurrences satisfying the playing predicate.
    pub playing_count: usize,
    /// Count of occurrences satisfying the upcoming predicate.
    pub upcoming_count: usize,
    /// Count of occurrences satisfying the recently-played predicate.
    pub recent_count: usize,
    /// All qualifying instances, sorted by start_seconds ascending,
    /// ties broken by input note order. Deduplicated per occurrence.
    pub instances: Vec<NoteInstance>,
}

impl Snapshot {
    /// Instances currently sounding.
    pub fn playing(&self) -> impl Iterator<Item = &NoteInstance> + '_ {
        self.instances
            .iter()
            .filter(|i| i.state == PlayState::Playing)
    }

    /// Instances starting within the lookahead window.
    pub fn upcoming(&self) -> impl Iterator<Item = &NoteInstance> + '_ {
        self.instances
            .iter()
            .filter(|i| i.state == PlayState::Upcoming)
    }

    /// Instances that ended within the retention window.
    pub fn recently_played(&self) -> impl Iterator<Item = &NoteInstance> + '_ {
        self.instances
            .iter()
            .filter(|i| i.state == PlayState::Recent)
    }

    /// Whether measure `index` is active. Out-of-range indices are inactive.
    pub fn is_measure_active(&self, index: usize) -> bool {
        self.active_measures.contains(&index)
    }

    /// Loop position summary.
    pub fn loop_info(&self) -> LoopInfo {
        LoopInfo {
            iteration: self.loop_iteration,
            length_seconds: self.loop_length_seconds,
            progress: self.loop_progress,
        }
    }
}

/// Projection of the snapshot's loop-position fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LoopInfo {
    pub iteration: u64,
    pub length_seconds: f64,
    pub progress: f64,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:.3}s  beat={:5.2}  m={:>2}+{:.2}  iter={}  play={} next={} past={}",
            self.now_seconds,
            self.current_beat,
            self.current_measure,
            self.beat_in_measure,
            self.loop_iteration,
            self.playing_count,
            self.upcoming_count,
            self.recent_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_defaults_via_serde() {
        let json = r#"{"id":"a","start":0.0,"duration":1.0,"pitch":440.0}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.volume, 1.0);
        assert_eq!(note.pan, 0.0);
        assert!(note.envelope.is_none());
    }

    #[test]
    fn test_home_measure() {
        assert_eq!(Note::new("a", 0.0, 1.0, 440.0).home_measure(), 0);
        assert_eq!(Note::new("b", 3.99, 1.0, 440.0).home_measure(), 0);
        assert_eq!(Note::new("c", 4.0, 1.0, 440.0).home_measure(), 1);
        assert_eq!(Note::new("d", 63.5, 1.0, 440.0).home_measure(), 15);
        // Starts past the grid are not wrapped
        assert_eq!(Note::new("e", 70.0, 1.0, 440.0).home_measure(), 17);
    }

    #[test]
    fn test_play_state_serializes_as_string() {
        let json = serde_json::to_string(&PlayState::Playing).unwrap();
        assert_eq!(json, "\"Playing\"");
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snap = Snapshot {
            now_seconds: 1.5,
            current_beat: 3.0,
            current_measure: 0,
            beat_in_measure: 3.0,
            loop_iteration: 0,
            measure_active: true,
            active_measures: (0..16).collect(),
            loop_length_seconds: 32.0,
            loop_progress: 0.046875,
            playing_count: 1,
            upcoming_count: 0,
            recent_count: 0,
            instances: vec![NoteInstance {
                id: "a".into(),
                note: Note::new("a", 2.0, 1.0, 440.0),
                start_seconds: 1.0,
                end_seconds: 1.5,
                state: PlayState::Playing,
            }],
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"current_measure\":0"));
        assert!(json.contains("\"state\":\"Playing\""));
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}

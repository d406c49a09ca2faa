//! Session configuration and its validator.
//!
//! Validation is strict, ordered, and fail-fast: the first violation is
//! returned as a stable, human-readable message naming the field (and the
//! note index for per-note fields). It is a pure check — no partial
//! mutation happens on either side of a failure, and a session is only
//! ever constructed from a configuration that passed in full.

use crate::types::{Note, MEASURES_PER_LOOP};
use serde::{Deserialize, Serialize};

/// Everything a session needs, supplied once at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequencerConfig {
    /// Tempo in beats per minute. Finite, > 0.
    pub bpm: f64,
    /// The looping composition.
    pub notes: Vec<Note>,
    /// Per-measure activation flags. Exactly 16 entries when present;
    /// absent means all measures active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrangement: Option<Vec<bool>>,
    /// How far ahead (seconds) an occurrence still counts as upcoming.
    #[serde(default = "default_lookahead")]
    pub lookahead_seconds: f64,
    /// How long after ending (seconds) an occurrence still counts as
    /// recently played.
    #[serde(default = "default_retention")]
    pub retention_seconds: f64,
    /// Refresh cadence of the push-driven publisher.
    #[serde(default = "default_refresh_ms")]
    pub refresh_interval_ms: u64,
}

fn default_lookahead() -> f64 {
    2.0
}

fn default_retention() -> f64 {
    0.5
}

fn default_refresh_ms() -> u64 {
    50
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            notes: Vec::new(),
            arrangement: None,
            lookahead_seconds: default_lookahead(),
            retention_seconds: default_retention(),
            refresh_interval_ms: default_refresh_ms(),
        }
    }
}

impl SequencerConfig {
    pub fn new(bpm: f64, notes: Vec<Note>) -> Self {
        Self {
            bpm,
            notes,
            ..Self::default()
        }
    }

    /// Parse a JSON configuration and validate it in one step.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field in order, returning the first violation.
    pub fn validate(&self) -> Result<(), String> {
        // Comparisons are written negated so NaN fails them too.
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err("bpm must be a positive number".into());
        }

        for (i, note) in self.notes.iter().enumerate() {
            if note.id.is_empty() {
                return Err(format!("note {}: id must be a non-empty string", i));
            }
            if !(note.start.is_finite() && note.start >= 0.0) {
                return Err(format!("note {}: start must be >= 0", i));
            }
            if !(note.duration.is_finite() && note.duration >= 0.001) {
                return Err(format!("note {}: duration must be >= 0.001", i));
            }
            if !(note.pitch.is_finite() && note.pitch > 0.0) {
                return Err(format!("note {}: pitch must be > 0", i));
            }
            if !(0.0..=1.0).contains(&note.volume) {
                return Err(format!("note {}: volume must be within 0..1", i));
            }
            if !(-1.0..=1.0).contains(&note.pan) {
                return Err(format!("note {}: pan must be within -1..1", i));
            }
            if let Some(env) = &note.envelope {
                if !(env.attack.is_finite() && env.attack >= 0.0) {
                    return Err(format!("note {}: envelope attack must be >= 0", i));
                }
                if !(env.decay.is_finite() && env.decay >= 0.0) {
                    return Err(format!("note {}: envelope decay must be >= 0", i));
                }
                if !(0.0..=1.0).contains(&env.sustain) {
                    return Err(format!("note {}: envelope sustain must be within 0..1", i));
                }
                if !(env.release.is_finite() && env.release >= 0.0) {
                    return Err(format!("note {}: envelope release must be >= 0", i));
                }
            }
        }

        if let Some(arrangement) = &self.arrangement {
            if arrangement.len() != MEASURES_PER_LOOP {
                return Err(format!(
                    "arrangement must have exactly 16 entries (got {})",
                    arrangement.len()
                ));
            }
        }

        if !(self.lookahead_seconds.is_finite() && self.lookahead_seconds > 0.0) {
            return Err("lookahead_seconds must be > 0".into());
        }
        if self.refresh_interval_ms == 0 {
            return Err("refresh_interval_ms must be > 0".into());
        }
        if !(self.retention_seconds.is_finite() && self.retention_seconds >= 0.0) {
            return Err("retention_seconds must be >= 0".into());
        }

        Ok(())
    }

    /// The arrangement as a fixed 16-flag mask, all-active when absent.
    /// Meaningful only for a validated configuration.
    pub fn arrangement_mask(&self) -> [bool; MEASURES_PER_LOOP] {
        let mut mask = [true; MEASURES_PER_LOOP];
        if let Some(arrangement) = &self.arrangement {
            for (slot, &flag) in mask.iter_mut().zip(arrangement.iter()) {
                *slot = flag;
            }
        }
        mask
    }
}

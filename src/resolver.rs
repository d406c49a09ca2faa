//! The note window resolver: a pure function from (time, tempo, notes,
//! arrangement, windows) to a complete state snapshot.
//!
//! Nothing here fails at call time — malformed numbers are rejected by the
//! config validator before a resolver ever runs — and nothing is cached:
//! every call recomputes the full instance list from scratch, so a snapshot
//! can never accumulate stale entries.

use crate::config::SequencerConfig;
use crate::grid;
use crate::types::{Note, NoteInstance, PlayState, Snapshot, MEASURES_PER_LOOP};

/// Resolve the snapshot for `now` against a validated configuration.
pub fn resolve_config(now: f64, config: &SequencerConfig) -> Snapshot {
    resolve(
        now,
        config.bpm,
        &config.notes,
        &config.arrangement_mask(),
        config.lookahead_seconds,
        config.retention_seconds,
    )
}

/// Resolve which note occurrences are playing, upcoming, or recently played
/// at `now`, together with loop-position metadata.
///
/// Occurrence scan is bounded to the current loop iteration, plus the next
/// one when the lookahead window crosses the loop boundary — O(2 × notes)
/// per call no matter how long the clock has been running.
///
/// Measure gating uses the note's home measure (`floor(start / 4)`) against
/// the arrangement mask, so a note is either always or never eligible for a
/// given configuration regardless of which iteration is scanned. Notes whose
/// start lies beyond the 16-measure grid have no mask entry and are always
/// eligible.
pub fn resolve(
    now: f64,
    bpm: f64,
    notes: &[Note],
    arrangement: &[bool; MEASURES_PER_LOOP],
    lookahead_seconds: f64,
    retention_seconds: f64,
) -> Snapshot {
    let loop_length = grid::loop_length_seconds(bpm);
    let seconds_per_beat = grid::seconds_per_beat(bpm);

    // True floored iteration, possibly negative for pre-epoch clocks.
    // Occurrence math needs the real value; the snapshot clamps to zero.
    let mut iteration = (now / loop_length).floor();
    let mut loop_time = now - iteration * loop_length;
    // Float rounding at a tiny negative `now` can land loop_time on the
    // loop length itself; fold that edge onto the next iteration's start
    // so loop_time stays in [0, loop_length) and matches the iteration.
    if loop_time >= loop_length {
        iteration += 1.0;
        loop_time = 0.0;
    }

    let current_beat = grid::beat_at(now, bpm);
    let current_measure = grid::measure_of_beat(current_beat);
    let beat_in_measure = grid::beat_in_measure(current_beat);

    // The next iteration matters only when the lookahead window spills past
    // the loop boundary.
    let span_next = loop_time + lookahead_seconds > loop_length;
    let iterations_to_scan = if span_next { 2 } else { 1 };

    let mut instances = Vec::new();
    let mut playing_count = 0;
    let mut upcoming_count = 0;
    let mut recent_count = 0;

    for k in 0..iterations_to_scan {
        let iteration_start = (iteration + k as f64) * loop_length;

        // Notes are visited in input order within each iteration so the
        // stable sort below breaks start-time ties by input order.
        for note in notes {
            let home = note.home_measure();
            if home < MEASURES_PER_LOOP && !arrangement[home] {
                continue;
            }

            let occ_start = iteration_start + note.start * seconds_per_beat;
            let occ_end = occ_start + note.duration * seconds_per_beat;

            let playing = occ_start <= now && now < occ_end;
            let upcoming = occ_start >= now && occ_start < now + lookahead_seconds;
            let recent = occ_end >= now - retention_seconds && occ_end <= now;

            // Counts reflect every predicate match; the list holds each
            // occurrence once, under its strongest classification.
            if playing {
                playing_count += 1;
            }
            if upcoming {
                upcoming_count += 1;
            }
            if recent {
                recent_count += 1;
            }

            if playing || upcoming || recent {
                let state = if playing {
                    PlayState::Playing
                } else if upcoming {
                    PlayState::Upcoming
                } else {
                    PlayState::Recent
                };
                instances.push(NoteInstance {
                    id: note.id.clone(),
                    note: note.clone(),
                    start_seconds: occ_start,
                    end_seconds: occ_end,
                    state,
                });
            }
        }
    }

    // Vec::sort_by is stable, preserving input-order ties.
    instances.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));

    let active_measures: Vec<usize> = arrangement
        .iter()
        .enumerate()
        .filter(|(_, &active)| active)
        .map(|(i, _)| i)
        .collect();

    Snapshot {
        now_seconds: now,
        current_beat,
        current_measure,
        beat_in_measure,
        loop_iteration: iteration.max(0.0) as u64,
        measure_active: arrangement[current_measure],
        active_measures,
        loop_length_seconds: loop_length,
        loop_progress: loop_time / loop_length,
        playing_count,
        upcoming_count,
        recent_count,
        instances,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayState;

    const ALL_ACTIVE: [bool; 16] = [true; 16];

    /// bpm 120: 2 beats/s, 0.5 s/beat, 32 s loop. One 0.5-beat note at
    /// beat 0 occupies [0, 0.25] s of every iteration.
    fn one_note() -> Vec<Note> {
        vec![Note::new("n0", 0.0, 0.5, 440.0)]
    }

    fn resolve_simple(now: f64, notes: &[Note]) -> Snapshot {
        resolve(now, 120.0, notes, &ALL_ACTIVE, 2.0, 0.5)
    }

    #[test]
    fn test_loop_metadata_at_origin() {
        let snap = resolve_simple(0.0, &one_note());
        assert_eq!(snap.loop_length_seconds, 32.0);
        assert_eq!(snap.current_beat, 0.0);
        assert_eq!(snap.current_measure, 0);
        assert_eq!(snap.beat_in_measure, 0.0);
        assert_eq!(snap.loop_iteration, 0);
        assert_eq!(snap.loop_progress, 0.0);
        assert!(snap.measure_active);
        assert_eq!(snap.active_measures.len(), 16);
    }

    #[test]
    fn test_note_present_at_start() {
        // At now=0 the occurrence both starts and plays; it appears once.
        let snap = resolve_simple(0.0, &one_note());
        assert_eq!(snap.instances.len(), 1);
        assert_eq!(snap.instances[0].note.pitch, 440.0);
        assert_eq!(snap.instances[0].state, PlayState::Playing);
        // Exact-boundary start satisfies both predicates in the counts.
        assert_eq!(snap.playing_count, 1);
        assert_eq!(snap.upcoming_count, 1);
    }

    #[test]
    fn test_note_playing_mid_occurrence() {
        let snap = resolve_simple(0.1, &one_note());
        let playing: Vec<_> = snap.playing().collect();
        assert_eq!(playing.len(), 1);
        assert_eq!(playing[0].id, "n0");
        assert_eq!(playing[0].start_seconds, 0.0);
        assert_eq!(playing[0].end_seconds, 0.25);
    }

    #[test]
    fn test_note_retained_after_ending() {
        // Ended at 0.25 s; at 0.75 s it is exactly retention (0.5 s) old.
        let snap = resolve_simple(0.75, &one_note());
        assert_eq!(snap.instances.len(), 1);
        assert_eq!(snap.instances[0].state, PlayState::Recent);
        assert_eq!(snap.recent_count, 1);
        assert_eq!(snap.playing_count, 0);
    }

    #[test]
    fn test_note_absent_between_windows() {
        // 1.3 s: ended 1.05 s ago (past retention), next occurrence at 32 s
        // (far past the 2 s lookahead).
        let snap = resolve_simple(1.3, &one_note());
        assert!(snap.instances.is_empty());
        assert_eq!(snap.playing_count + snap.upcoming_count + snap.recent_count, 0);
    }

    #[test]
    fn test_lookahead_spans_loop_boundary() {
        // 30.5 s + 2 s lookahead reaches into the next iteration; the
        // occurrence at 32 s must surface as upcoming.
        let snap = resolve_simple(30.5, &one_note());
        assert_eq!(snap.instances.len(), 1);
        let inst = &snap.instances[0];
        assert_eq!(inst.state, PlayState::Upcoming);
        assert_eq!(inst.start_seconds, 32.0);
        assert_eq!(inst.note.pitch, 440.0);
        assert_eq!(snap.upcoming_count, 1);
    }

    #[test]
    fn test_no_lookahead_reach_no_next_iteration() {
        // 29.0 s + 2 s = 31 s < 32 s: next iteration is not scanned.
        let snap = resolve_simple(29.0, &one_note());
        assert!(snap.instances.is_empty());
    }

    #[test]
    fn test_home_measure_gating_blocks_note() {
        // Measure 0 inactive: the note never qualifies, even while its
        // occurrence window covers now.
        let mut mask = [true; 16];
        mask[0] = false;
        let snap = resolve(0.1, 120.0, &one_note(), &mask, 2.0, 0.5);
        assert!(snap.instances.is_empty());
        assert_eq!(snap.playing_count, 0);
        assert!(!snap.measure_active);
        assert_eq!(snap.active_measures.len(), 15);
    }

    #[test]
    fn test_only_measure_zero_active_now_in_measure_two() {
        // Mask selects only measure 0; at a time inside measure 2 the
        // note's windows are all empty.
        let mut mask = [false; 16];
        mask[0] = true;
        // beat 9 → measure 2; at 120 bpm that is 4.5 s.
        let snap = resolve(4.5, 120.0, &one_note(), &mask, 2.0, 0.5);
        assert_eq!(snap.current_measure, 2);
        assert!(!snap.measure_active);
        assert!(snap.instances.is_empty());
    }

    #[test]
    fn test_gating_ignores_occurrence_time() {
        // A note in measure 3 stays eligible at every iteration; one in a
        // masked measure never appears in any iteration.
        let notes = vec![
            Note::new("m3", 12.0, 1.0, 220.0),
            Note::new("m5", 20.0, 1.0, 330.0),
        ];
        let mut mask = [true; 16];
        mask[5] = false;
        // Iteration 3, inside measure 3: 3 * 32 + 6.25 = 102.25 s
        let snap = resolve(102.25, 120.0, &notes, &mask, 2.0, 0.5);
        assert_eq!(snap.instances.len(), 1);
        assert_eq!(snap.instances[0].id, "m3");
        assert_eq!(snap.loop_iteration, 3);
    }

    #[test]
    fn test_note_beyond_grid_is_not_gated() {
        // start 70 (beyond the 16-measure grid) has no mask entry: even an
        // all-inactive arrangement does not suppress it. It sounds 35 s
        // into each iteration; from now=31.9 a 10 s lookahead reaches it.
        let notes = vec![Note::new("tail", 70.0, 1.0, 110.0)];
        let mask = [false; 16];
        let snap = resolve(31.9, 120.0, &notes, &mask, 10.0, 0.5);
        assert_eq!(snap.instances.len(), 1);
        assert_eq!(snap.instances[0].id, "tail");
        assert_eq!(snap.instances[0].state, PlayState::Upcoming);
        assert_eq!(snap.instances[0].start_seconds, 35.0);
    }

    #[test]
    fn test_sorted_by_start_with_stable_ties() {
        let notes = vec![
            Note::new("late", 8.0, 1.0, 660.0),
            Note::new("tie-a", 2.0, 1.0, 440.0),
            Note::new("tie-b", 2.0, 1.0, 550.0),
            Note::new("early", 0.0, 1.0, 330.0),
        ];
        // Large lookahead pulls all four into the window.
        let snap = resolve(0.0, 120.0, &notes, &ALL_ACTIVE, 10.0, 0.5);
        let ids: Vec<&str> = snap.instances.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["early", "tie-a", "tie-b", "late"]);
        for pair in snap.instances.windows(2) {
            assert!(pair[0].start_seconds <= pair[1].start_seconds);
        }
    }

    #[test]
    fn test_idempotent() {
        let notes = vec![
            Note::new("a", 0.0, 2.0, 220.0),
            Note::new("b", 17.0, 4.0, 440.0),
        ];
        let mut mask = [true; 16];
        mask[7] = false;
        let s1 = resolve(123.456, 97.0, &notes, &mask, 2.0, 0.5);
        let s2 = resolve(123.456, 97.0, &notes, &mask, 2.0, 0.5);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_ranges_hold_across_times() {
        let notes = one_note();
        for now in [-100.0, -0.25, 0.0, 0.1, 15.9, 31.99, 32.0, 1000.5] {
            let snap = resolve_simple(now, &notes);
            assert!(
                (0.0..64.0).contains(&snap.current_beat),
                "now={}: beat {}",
                now,
                snap.current_beat
            );
            assert!(snap.current_measure < 16, "now={}", now);
            assert!(
                (0.0..4.0).contains(&snap.beat_in_measure),
                "now={}: bim {}",
                now,
                snap.beat_in_measure
            );
            assert!(
                (0.0..1.0).contains(&snap.loop_progress),
                "now={}: progress {}",
                now,
                snap.loop_progress
            );
        }
    }

    #[test]
    fn test_negative_clock_clamps_iteration() {
        let snap = resolve_simple(-5.0, &one_note());
        assert_eq!(snap.loop_iteration, 0);
        // Wrapped position is near the end of the loop.
        assert!(snap.current_beat > 53.0);
    }

    #[test]
    fn test_instant_before_origin_keeps_ranges_and_window() {
        // -1e-16 wraps to exactly the loop length under plain rem_euclid;
        // the snapshot must still read as the top of iteration zero, with
        // the beat-0 note visible in the lookahead window.
        let snap = resolve_simple(-1e-16, &one_note());
        assert!(
            (0.0..64.0).contains(&snap.current_beat),
            "beat {}",
            snap.current_beat
        );
        assert!((0.0..1.0).contains(&snap.loop_progress));
        assert_eq!(snap.current_beat, 0.0);
        assert_eq!(snap.current_measure, 0);
        assert_eq!(snap.loop_iteration, 0);
        assert_eq!(snap.upcoming_count, 1);
        assert_eq!(snap.instances[0].start_seconds, 0.0);
    }

    #[test]
    fn test_long_note_stays_playing() {
        // 128 beats = 64 s at 120 bpm: twice the loop length. Within its
        // own iteration it reads as playing at every refresh; no capping.
        let notes = vec![Note::new("drone", 0.0, 128.0, 55.0)];
        for now in [0.0, 10.0, 25.0, 31.9] {
            let snap = resolve_simple(now, &notes);
            assert_eq!(snap.playing_count, 1, "now={}", now);
            assert_eq!(snap.instances[0].state, PlayState::Playing);
        }
    }

    #[test]
    fn test_pathological_windows_emit_once_per_occurrence() {
        // Lookahead far larger than the loop: both scanned occurrences
        // qualify, each exactly once; counts may exceed a per-state
        // partition of the list.
        let snap = resolve(0.0, 120.0, &one_note(), &ALL_ACTIVE, 100.0, 100.0);
        assert_eq!(snap.instances.len(), 2);
        assert_eq!(snap.instances[0].state, PlayState::Playing);
        assert_eq!(snap.instances[1].state, PlayState::Upcoming);
        assert_eq!(snap.instances[1].start_seconds, 32.0);
        // Occurrence 0 is both playing and upcoming at its exact start.
        assert_eq!(snap.playing_count, 1);
        assert_eq!(snap.upcoming_count, 2);
    }

    #[test]
    fn test_resolve_config_matches_resolve() {
        let config = SequencerConfig::new(120.0, one_note());
        let a = resolve_config(0.1, &config);
        let b = resolve(0.1, 120.0, &config.notes, &[true; 16], 2.0, 0.5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_instance_end_exceeds_start() {
        let notes = vec![
            Note::new("short", 1.0, 0.001, 440.0),
            Note::new("long", 5.0, 32.0, 220.0),
        ];
        let snap = resolve(0.0, 120.0, &notes, &ALL_ACTIVE, 50.0, 0.5);
        assert!(!snap.instances.is_empty());
        for inst in &snap.instances {
            assert!(inst.end_seconds > inst.start_seconds, "{}", inst);
        }
    }
}

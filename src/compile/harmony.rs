//! Chord-map conformance: snap out-of-chord pitches onto the active harmony.

use log::debug;

use crate::compile::normalize::fit_pitch;
use crate::event::{ChordSpan, NoteEvent, Tq};
use crate::profile::InstrumentProfile;

/// Snap each note onto the chord active at its onset. The map must be
/// sorted by time; notes starting before the first span, or under a span
/// with no tones, are left alone. A note that lands on a tone of the *next*
/// chord shortly before its change is treated as a pickup and kept.
///
/// Returns the notes plus the number of corrected pitches.
pub fn apply_chord_map(
    notes: Vec<NoteEvent>,
    chord_map: &[ChordSpan],
    profile: &InstrumentProfile,
) -> (Vec<NoteEvent>, usize) {
    if chord_map.is_empty() {
        return (notes, 0);
    }
    let pickup_window = Tq::from_f64(profile.tuning.pickup_window_q);
    let bounds = profile.range.absolute_bounds();
    let policy = profile.fix_policy.pitch;

    let mut corrected = 0;
    let notes = notes
        .into_iter()
        .map(|mut note| {
            let Some(active) = active_span(chord_map, note.start_q) else {
                return note;
            };
            let span = &chord_map[active];
            if span.tones.is_empty() || span.contains_pitch(note.pitch) {
                return note;
            }
            if let Some(next) = chord_map.get(active + 1) {
                let is_pickup = next.time_q - note.start_q <= pickup_window
                    && next.contains_pitch(note.pitch);
                if is_pickup {
                    return note;
                }
            }
            let snapped = fit_pitch(snap_pitch(note.pitch, &span.tones) as i32, bounds, policy);
            if snapped != note.pitch {
                debug!(
                    "pitch {} outside chord {:?} at {}, snapped to {}",
                    note.pitch, span.label, note.start_q, snapped
                );
                note.pitch = snapped;
                corrected += 1;
            }
            note
        })
        .collect();
    (notes, corrected)
}

/// Index of the last span starting at or before `t`.
fn active_span(chord_map: &[ChordSpan], t: Tq) -> Option<usize> {
    chord_map
        .iter()
        .rposition(|span| span.time_q <= t)
}

/// Move `pitch` to the nearest chord tone by pitch class, preferring the
/// downward direction on a tie.
fn snap_pitch(pitch: u8, tones: &[u8]) -> u8 {
    let pc = i64::from(pitch) % 12;
    let mut best: Option<i64> = None;
    for &tone in tones {
        let up = (i64::from(tone) - pc).rem_euclid(12);
        for delta in [up - 12, up] {
            let better = match best {
                None => true,
                Some(b) => delta.abs() < b.abs() || (delta.abs() == b.abs() && delta < b),
            };
            if better {
                best = Some(delta);
            }
        }
    }
    let delta = best.unwrap_or(0);
    (i64::from(pitch) + delta).clamp(0, 127) as u8
}

//! Note normalization: selection clamping, range fitting, monophony.

use log::debug;

use crate::candidate::ParsedNote;
use crate::event::{NoteEvent, Selection, Tq};
use crate::profile::{InstrumentProfile, PitchFixPolicy};

use super::{MIN_NOTE_DUR, MIN_NOTE_GAP};

/// Turn parsed notes into playable ones satisfying the profile contract.
///
/// Every output note lies inside the selection, inside the absolute pitch
/// range (unless the profile is a drum kit, whose trigger pitches are taken
/// as-is), with velocity in 1–127 and channel in 1–16. Monophonic profiles
/// additionally get strictly non-overlapping notes.
pub fn normalize(
    notes: Vec<ParsedNote>,
    profile: &InstrumentProfile,
    selection: Selection,
) -> Vec<NoteEvent> {
    if selection.length_q < MIN_NOTE_DUR {
        debug!("selection shorter than the minimum note duration, nothing to emit");
        return Vec::new();
    }
    let latest_start = selection.length_q - MIN_NOTE_DUR;
    let bounds = profile.range.absolute_bounds();

    let mut out: Vec<NoteEvent> = notes
        .into_iter()
        .map(|note| {
            let start_q = note.start_q.clamp(Tq::ZERO, latest_start);
            let mut dur_q = note.dur_q.max(MIN_NOTE_DUR);
            if start_q + dur_q > selection.length_q {
                dur_q = selection.length_q - start_q;
            }
            let pitch = if profile.is_drum() {
                note.pitch.clamp(0, 127) as u8
            } else {
                fit_pitch(note.pitch, bounds, profile.fix_policy.pitch)
            };
            NoteEvent {
                start_q,
                dur_q,
                pitch,
                velocity: note.velocity.clamp(1, 127) as u8,
                channel: fit_channel(note.channel, profile),
                articulation: note.articulation,
            }
        })
        .collect();

    if profile.is_mono() {
        out = enforce_monophony(out);
    }
    out
}

/// Force a pitch into `bounds`. Octave shifting preserves the pitch class;
/// a range narrower than an octave can still need the final clamp.
pub(crate) fn fit_pitch(pitch: i32, bounds: (u8, u8), policy: PitchFixPolicy) -> u8 {
    let (lo, hi) = (bounds.0 as i64, bounds.1 as i64);
    let mut p = pitch as i64;
    match policy {
        PitchFixPolicy::OctaveShiftToFit => {
            if p < lo {
                p += 12 * ((lo - p + 11) / 12);
            }
            if p > hi {
                p -= 12 * ((p - hi + 11) / 12);
            }
        }
        PitchFixPolicy::Clamp => {}
    }
    p.clamp(lo, hi) as u8
}

/// Channel 0 is read as 0-based input for channel 1; 1–16 pass through;
/// anything else falls back to the profile default.
fn fit_channel(channel: Option<i64>, profile: &InstrumentProfile) -> u8 {
    match channel {
        Some(0) => 1,
        Some(c) if (1..=16).contains(&c) => c as u8,
        Some(c) => {
            debug!("channel {c} out of range, using profile default");
            profile.default_channel()
        }
        None => profile.default_channel(),
    }
}

/// Shrink overlapping predecessors so at most one note sounds at a time. A
/// predecessor left with no room to sound (onsets closer than
/// MIN_NOTE_DUR + MIN_NOTE_GAP) is dropped rather than left overlapping.
fn enforce_monophony(mut notes: Vec<NoteEvent>) -> Vec<NoteEvent> {
    notes.sort_by_key(|n| (n.start_q, n.pitch));
    let mut kept: Vec<NoteEvent> = Vec::with_capacity(notes.len());
    for note in notes {
        while let Some(prev) = kept.last_mut() {
            if prev.end_q() <= note.start_q {
                break;
            }
            let room = note.start_q - prev.start_q - MIN_NOTE_GAP;
            if room >= MIN_NOTE_DUR {
                prev.dur_q = room;
                break;
            }
            debug!(
                "monophony: note at {} leaves no room for the note at {}, dropping it",
                note.start_q, prev.start_q
            );
            kept.pop();
        }
        kept.push(note);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Polyphony;

    fn parsed(start: f64, dur: f64, pitch: i32) -> ParsedNote {
        ParsedNote {
            start_q: Tq::from_f64(start),
            dur_q: Tq::from_f64(dur),
            pitch,
            velocity: 90,
            channel: None,
            articulation: None,
        }
    }

    fn selection() -> Selection {
        Selection::new(Tq::from_quarters(16), (4, 4))
    }

    #[test]
    fn times_clamp_into_the_selection() {
        let notes = vec![parsed(-2.0, 1.0, 60), parsed(15.5, 4.0, 62)];
        let out = normalize(notes, &InstrumentProfile::default(), selection());
        assert_eq!(out[0].start_q, Tq::ZERO);
        assert_eq!(out[1].start_q, Tq::from_f64(15.5));
        // truncated at the selection end
        assert_eq!(out[1].dur_q, Tq::from_f64(0.5));
    }

    #[test]
    fn duration_floors_at_the_minimum() {
        let out = normalize(
            vec![parsed(0.0, 0.001, 60)],
            &InstrumentProfile::default(),
            selection(),
        );
        assert_eq!(out[0].dur_q, MIN_NOTE_DUR);
    }

    #[test]
    fn start_near_the_end_keeps_a_playable_sliver() {
        let out = normalize(
            vec![parsed(99.0, 1.0, 60)],
            &InstrumentProfile::default(),
            selection(),
        );
        assert_eq!(out[0].start_q, Tq::from_quarters(16) - MIN_NOTE_DUR);
        assert_eq!(out[0].dur_q, MIN_NOTE_DUR);
    }

    #[test]
    fn low_pitch_octave_shifts_up() {
        let mut profile = InstrumentProfile::default();
        profile.range.absolute = (48, 72);
        let out = normalize(vec![parsed(0.0, 1.0, 40)], &profile, selection());
        assert_eq!(out[0].pitch, 52);
    }

    #[test]
    fn high_pitch_octave_shifts_down() {
        let out = normalize(
            vec![parsed(0.0, 1.0, 115)],
            &InstrumentProfile::default(),
            selection(),
        );
        // default absolute range is (21, 108)
        assert_eq!(out[0].pitch, 103);
    }

    #[test]
    fn clamp_policy_pins_to_the_boundary() {
        let mut profile = InstrumentProfile::default();
        profile.range.absolute = (48, 72);
        profile.fix_policy.pitch = PitchFixPolicy::Clamp;
        let out = normalize(vec![parsed(0.0, 1.0, 40)], &profile, selection());
        assert_eq!(out[0].pitch, 48);
    }

    #[test]
    fn narrow_range_shift_falls_back_to_clamp() {
        assert_eq!(fit_pitch(70, (60, 65), PitchFixPolicy::OctaveShiftToFit), 60);
    }

    #[test]
    fn velocity_clamps_to_playable_values() {
        let mut quiet = parsed(0.0, 1.0, 60);
        quiet.velocity = 0;
        let mut loud = parsed(1.0, 1.0, 60);
        loud.velocity = 400;
        let out = normalize(vec![quiet, loud], &InstrumentProfile::default(), selection());
        assert_eq!(out[0].velocity, 1);
        assert_eq!(out[1].velocity, 127);
    }

    #[test]
    fn channel_normalization() {
        let mut profile = InstrumentProfile::default();
        profile.midi.channel = 3;
        let mut zero = parsed(0.0, 1.0, 60);
        zero.channel = Some(0);
        let mut five = parsed(1.0, 1.0, 60);
        five.channel = Some(5);
        let mut wild = parsed(2.0, 1.0, 60);
        wild.channel = Some(99);
        let absent = parsed(3.0, 1.0, 60);
        let out = normalize(vec![zero, five, wild, absent], &profile, selection());
        assert_eq!(out[0].channel, 1);
        assert_eq!(out[1].channel, 5);
        assert_eq!(out[2].channel, 3);
        assert_eq!(out[3].channel, 3);
    }

    #[test]
    fn mono_shrinks_overlapping_predecessor() {
        let mut profile = InstrumentProfile::default();
        profile.midi.polyphony = Polyphony::Mono;
        let out = normalize(
            vec![parsed(0.0, 2.0, 60), parsed(1.0, 2.0, 64)],
            &profile,
            selection(),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].dur_q, Tq::from_f64(0.9375));
        assert_eq!(out[1].dur_q, Tq::from_f64(2.0));
    }

    #[test]
    fn mono_drops_notes_with_no_room() {
        let mut profile = InstrumentProfile::default();
        profile.midi.polyphony = Polyphony::Mono;
        let out = normalize(
            vec![parsed(0.0, 2.0, 60), parsed(0.05, 2.0, 64)],
            &profile,
            selection(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pitch, 64);
    }

    #[test]
    fn mono_output_never_overlaps() {
        let mut profile = InstrumentProfile::default();
        profile.midi.polyphony = Polyphony::Mono;
        let notes = vec![
            parsed(0.0, 4.0, 60),
            parsed(0.5, 4.0, 62),
            parsed(0.5, 4.0, 64),
            parsed(2.0, 1.0, 65),
        ];
        let out = normalize(notes, &profile, selection());
        for pair in out.windows(2) {
            assert!(pair[0].end_q() <= pair[1].start_q);
        }
    }

    #[test]
    fn drum_profile_keeps_trigger_pitches() {
        let mut profile = InstrumentProfile::default();
        profile.midi.is_drum = true;
        profile.range.absolute = (48, 72);
        let out = normalize(vec![parsed(0.0, 0.25, 35)], &profile, selection());
        assert_eq!(out[0].pitch, 35);
    }

    #[test]
    fn degenerate_selection_yields_nothing() {
        let tiny = Selection::new(Tq::from_ticks(10), (4, 4));
        let out = normalize(
            vec![parsed(0.0, 1.0, 60)],
            &InstrumentProfile::default(),
            tiny,
        );
        assert!(out.is_empty());
    }
}

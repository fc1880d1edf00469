//! Overlap trimming: same-pitch repeats and chord-to-chord sustain bleed.

use std::collections::BTreeMap;

use crate::event::{NoteEvent, Tq, TICKS_PER_QUARTER};

use super::{MIN_NOTE_DUR, MIN_NOTE_GAP};

/// Onsets closer than this collapse into one chord event, 0.05 q.
pub(crate) const CHORD_TOLERANCE: Tq = Tq::from_ticks(TICKS_PER_QUARTER / 20);

/// Trim overlaps in two passes: first between same-(channel, pitch) repeats,
/// then between successive chord events on the same channel. Durations never
/// drop below the minimum.
pub fn resolve(notes: Vec<NoteEvent>) -> Vec<NoteEvent> {
    trim_chord_groups(trim_same_pitch(notes))
}

fn trim_same_pitch(mut notes: Vec<NoteEvent>) -> Vec<NoteEvent> {
    let mut groups: BTreeMap<(u8, u8), Vec<usize>> = BTreeMap::new();
    for (i, note) in notes.iter().enumerate() {
        groups.entry((note.channel, note.pitch)).or_default().push(i);
    }
    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| notes[i].start_q);
        for w in 0..indices.len().saturating_sub(1) {
            let next_start = notes[indices[w + 1]].start_q;
            let note = &mut notes[indices[w]];
            if note.end_q() > next_start - MIN_NOTE_GAP {
                note.dur_q = (next_start - MIN_NOTE_GAP - note.start_q).max(MIN_NOTE_DUR);
            }
        }
    }
    notes
}

fn trim_chord_groups(mut notes: Vec<NoteEvent>) -> Vec<NoteEvent> {
    let mut by_channel: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, note) in notes.iter().enumerate() {
        by_channel.entry(note.channel).or_default().push(i);
    }
    for indices in by_channel.values_mut() {
        indices.sort_by_key(|&i| notes[i].start_q);

        // chord events anchored at their first onset
        let mut events: Vec<(Tq, Vec<usize>)> = Vec::new();
        for &i in indices.iter() {
            match events.last_mut() {
                Some((anchor, group)) if notes[i].start_q - *anchor <= CHORD_TOLERANCE => {
                    group.push(i)
                }
                _ => events.push((notes[i].start_q, vec![i])),
            }
        }

        for e in 0..events.len().saturating_sub(1) {
            let next_time = events[e + 1].0;
            for &i in &events[e].1 {
                let note = &mut notes[i];
                if note.end_q() > next_time - MIN_NOTE_GAP {
                    note.dur_q = (next_time - MIN_NOTE_GAP - note.start_q).max(MIN_NOTE_DUR);
                }
            }
        }
    }
    notes
}

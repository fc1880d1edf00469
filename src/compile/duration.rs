//! Per-family duration limits: breath and bow splitting, short articulations.

use crate::event::{NoteEvent, Selection, Tq};
use crate::profile::{Family, InstrumentProfile};

use super::MIN_NOTE_DUR;

/// Built-in per-articulation duration caps in quarters. Profile entries
/// override these.
const SHORT_ARTICULATIONS: &[(&str, f64)] = &[
    ("staccato", 0.25),
    ("staccatissimo", 0.125),
    ("spiccato", 0.25),
    ("pizzicato", 0.5),
];

/// Generation types that count as arrangement contexts for bow splitting.
const BOW_SPLIT_CONTEXTS: &[&str] = &["arrangement", "accompaniment", "pad"];

/// Most segments a single note may split into.
const MAX_SPLIT_SEGMENTS: usize = 16;

/// Apply the instrument's physical duration limits. Short-articulation caps
/// run first, then winds and brass get breath splitting, and strings in
/// arrangement contexts get bow splitting.
pub fn apply(
    notes: Vec<NoteEvent>,
    profile: &InstrumentProfile,
    selection: Selection,
    generation_type: &str,
    global_articulation: Option<&str>,
) -> Vec<NoteEvent> {
    let mut notes: Vec<NoteEvent> = notes
        .into_iter()
        .map(|n| cap_short_articulation(n, profile, global_articulation))
        .collect();

    match profile.family {
        Family::Winds | Family::Brass => {
            let max_phrase = Tq::from_f64(profile.tuning.max_phrase_q);
            let gap = Tq::from_f64(profile.tuning.breath_gap_q);
            if max_phrase.is_positive() {
                notes = notes
                    .into_iter()
                    .flat_map(|n| split_long(n, max_phrase, gap))
                    .collect();
            }
        }
        Family::Strings if BOW_SPLIT_CONTEXTS.contains(&generation_type) => {
            let bar = selection.bar_len();
            let bow = bar.min(bar.scale(profile.tuning.bow_bars));
            let gap = Tq::from_f64(profile.tuning.bow_gap_q);
            if bow.is_positive() {
                notes = notes
                    .into_iter()
                    .flat_map(|n| split_long(n, bow, gap))
                    .collect();
                notes.sort_by_key(|n| (n.start_q, n.pitch));
            }
        }
        _ => {}
    }
    notes
}

/// Truncate a note to its articulation's maximum duration, if it has one.
/// An untagged note inherits the part's global articulation.
fn cap_short_articulation(
    mut note: NoteEvent,
    profile: &InstrumentProfile,
    global: Option<&str>,
) -> NoteEvent {
    let Some(tag) = note.articulation.as_deref().or(global) else {
        return note;
    };
    let tag = tag.to_ascii_lowercase();
    let cap = profile
        .articulations
        .short_articulations
        .get(&tag)
        .copied()
        .or_else(|| {
            SHORT_ARTICULATIONS
                .iter()
                .find(|(name, _)| *name == tag)
                .map(|&(_, q)| q)
        });
    if let Some(cap) = cap {
        let cap = Tq::from_f64(cap).max(MIN_NOTE_DUR);
        if note.dur_q > cap {
            note.dur_q = cap;
        }
    }
    note
}

/// Split a note into segments no longer than `max_len`, shortening every
/// segment but the last by `gap`. When the segment cap is reached the final
/// segment absorbs the remainder unsplit.
fn split_long(note: NoteEvent, max_len: Tq, gap: Tq) -> Vec<NoteEvent> {
    if note.dur_q <= max_len {
        return vec![note];
    }
    let end = note.end_q();
    let mut out = Vec::new();
    let mut start = note.start_q;
    while start < end {
        let last_allowed = out.len() + 1 == MAX_SPLIT_SEGMENTS;
        let seg_end = if last_allowed {
            end
        } else {
            (start + max_len).min(end)
        };
        let is_final = seg_end >= end;
        let dur_q = if is_final {
            seg_end - start
        } else {
            (seg_end - start - gap).max(MIN_NOTE_DUR)
        };
        out.push(NoteEvent {
            start_q: start,
            dur_q,
            ..note.clone()
        });
        if is_final {
            break;
        }
        start = seg_end;
    }
    out
}

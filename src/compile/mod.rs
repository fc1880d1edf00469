//! The compile pipeline: loose candidate JSON in, playable part bundle out.
//!
//! Every pass is a pure function over owned data, composed in a fixed order
//! by [`Compiler::compile`]. Malformed input is skipped, clamped, or filled
//! from defaults along the way; nothing on this path returns an error.

pub mod articulation;
pub mod duration;
pub mod dynamics;
pub mod harmony;
pub mod normalize;
pub mod overlap;
pub mod patterns;
pub mod tempo;

use log::debug;
use serde_json::{json, Value};

use crate::candidate::{self, ParsedDrum, ParsedNote};
use crate::curve;
use crate::event::{
    ChordSpan, ExtractedMotif, NoteEvent, PartBundle, Selection, Tq, TICKS_PER_QUARTER,
};
use crate::profile::{InstrumentProfile, Tuning};
use crate::theory;

/// Shortest note the pipeline emits, one sixteenth.
pub const MIN_NOTE_DUR: Tq = Tq::from_ticks(TICKS_PER_QUARTER / 16);
/// Silence carved between trimmed neighbors.
pub const MIN_NOTE_GAP: Tq = Tq::from_ticks(TICKS_PER_QUARTER / 16);

const MOTIF_MAX_NOTES: usize = 8;
const MOTIF_MAX_BARS: i64 = 2;

/// Compiles candidate records into playable parts for one instrument.
pub struct Compiler {
    profile: InstrumentProfile,
}

impl Compiler {
    pub fn new(profile: InstrumentProfile) -> Self {
        Self { profile }
    }

    /// Replace the profile's empirical tuning constants.
    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.profile.tuning = tuning;
        self
    }

    /// Compile one candidate against a selection and chord map.
    ///
    /// The bundle is always playable: every note fits the selection and the
    /// profile's range, polyphony, and duration rules, and every controller
    /// value is in 0..=127. Input the passes cannot save is dropped or
    /// clamped with a `debug!` trace.
    pub fn compile(
        &self,
        candidate: &Value,
        selection: Selection,
        chord_map: &[ChordSpan],
    ) -> PartBundle {
        let parsed = candidate::parse(candidate, selection);
        let mut chord_map = chord_map.to_vec();
        chord_map.sort_by_key(|span| span.time_q);

        let mut raw = parsed.notes;
        raw.extend(patterns::expand(&parsed.patterns, &parsed.repeats, selection));
        raw.extend(self.map_drums(&parsed.drums));

        let mut notes = normalize::normalize(raw, &self.profile, selection);

        if !chord_map.is_empty() && !self.profile.is_drum() {
            let (snapped, corrected) = harmony::apply_chord_map(notes, &chord_map, &self.profile);
            notes = snapped;
            if corrected > 0 {
                debug!("{corrected} pitches snapped to the chord map");
            }
        }

        let notes = overlap::resolve(notes);
        let mut notes = duration::apply(
            notes,
            &self.profile,
            selection,
            &parsed.generation_type,
            parsed.articulation.as_deref(),
        );

        let plan = articulation::resolve(
            &parsed.articulation_changes,
            &mut notes,
            parsed.articulation.as_deref(),
            &self.profile,
            selection,
        );
        if let Some(channel) = plan.channel_override {
            for note in &mut notes {
                note.channel = channel;
            }
        }

        let curves = dynamics::synthesize(&parsed.curves, &notes, &self.profile, selection);
        let mut cc_events = curve::build_cc_events(&curves, &self.profile, selection.length_q);
        cc_events.extend(plan.cc_events);
        cc_events.sort_by_key(|e| (e.time_q, e.controller));

        let markers = tempo::validate(&parsed.tempo_markers, selection);

        notes.sort_by_key(|n| (n.start_q, n.pitch));

        let handoff = parsed.handoff.or_else(|| harmony_summary(&notes));
        let extracted_motif = extract_motif(&notes, &chord_map, selection);

        PartBundle {
            notes,
            cc_events,
            keyswitches: plan.keyswitches,
            program_changes: plan.program_changes,
            articulation: plan.active_at_start,
            articulation_changes: if plan.changes.is_empty() {
                None
            } else {
                Some(plan.changes)
            },
            tempo_markers: if markers.is_empty() {
                None
            } else {
                Some(markers)
            },
            generation_type: parsed.generation_type,
            generation_style: parsed.generation_style,
            handoff,
            extracted_motif,
        }
    }

    /// Route drum-name events through the profile's drum map.
    fn map_drums(&self, drums: &[ParsedDrum]) -> Vec<ParsedNote> {
        if drums.is_empty() {
            return Vec::new();
        }
        if !self.profile.is_drum() {
            debug!("{} drum events on a non-drum profile, ignored", drums.len());
            return Vec::new();
        }
        let map = &self.profile.midi.drum_map;
        drums
            .iter()
            .filter_map(|drum| {
                let pitch = map.get(&drum.name).copied().or_else(|| {
                    let lower = drum.name.to_ascii_lowercase();
                    map.iter()
                        .find(|(name, _)| name.to_ascii_lowercase() == lower)
                        .map(|(_, &p)| p)
                });
                let Some(pitch) = pitch else {
                    debug!("unknown drum name {:?}, skipped", drum.name);
                    return None;
                };
                Some(ParsedNote {
                    start_q: drum.start_q,
                    dur_q: drum.dur_q,
                    pitch: i32::from(pitch),
                    velocity: drum.velocity,
                    channel: None,
                    articulation: None,
                })
            })
            .collect()
    }
}

/// Chord names and a key estimate from the final notes, for handoff to the
/// next generation. Notes must already be sorted by onset.
fn harmony_summary(notes: &[NoteEvent]) -> Option<Value> {
    if notes.is_empty() {
        return None;
    }
    let mut chords: Vec<String> = Vec::new();
    let mut roots: Vec<u8> = Vec::new();
    let mut group: Vec<u8> = Vec::new();
    let mut anchor = notes[0].start_q;
    for note in notes {
        if note.start_q - anchor > overlap::CHORD_TOLERANCE {
            summarize_group(&group, &mut chords, &mut roots);
            group.clear();
            anchor = note.start_q;
        }
        group.push(note.pitch);
    }
    summarize_group(&group, &mut chords, &mut roots);
    Some(json!({
        "harmony": {
            "chords": chords,
            "key": theory::detect_key(&roots),
        }
    }))
}

fn summarize_group(pitches: &[u8], chords: &mut Vec<String>, roots: &mut Vec<u8>) {
    let (name, root) = theory::detect_chord(pitches);
    if chords.last() != Some(&name) {
        chords.push(name);
        roots.push(root);
    }
}

/// The opening run of notes, re-based to zero, with its chord label.
fn extract_motif(
    notes: &[NoteEvent],
    chord_map: &[ChordSpan],
    selection: Selection,
) -> Option<ExtractedMotif> {
    let first = notes.first()?;
    let base = first.start_q;
    let window_end = base + Tq::from_ticks(selection.bar_len().ticks() * MOTIF_MAX_BARS);
    let mut motif: Vec<NoteEvent> = notes
        .iter()
        .take_while(|n| n.start_q < window_end)
        .take(MOTIF_MAX_NOTES)
        .cloned()
        .collect();
    for note in &mut motif {
        note.start_q = note.start_q - base;
    }
    let chord = chord_map
        .iter()
        .rev()
        .find(|span| span.time_q <= base)
        .map(|span| span.label.clone())
        .or_else(|| {
            let pitches: Vec<u8> = motif.iter().map(|n| n.pitch).collect();
            Some(theory::detect_chord(&pitches).0)
        });
    Some(ExtractedMotif {
        notes: motif,
        chord,
    })
}

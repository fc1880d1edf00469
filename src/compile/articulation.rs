//! Articulation resolution: intent to switching events, per profile mode.

use std::collections::BTreeMap;

use log::debug;

use crate::event::{
    ArticulationChange, CcEvent, KeyswitchEvent, NoteEvent, ProgramChangeEvent, Selection, Tq,
    TICKS_PER_QUARTER,
};
use crate::profile::{ArtMode, ArticulationSettings, InstrumentProfile};

/// Articulation reported when nothing is active at the selection start.
const DEFAULT_ARTICULATION: &str = "natural";

const KEYSWITCH_VELOCITY: u8 = 32;
const KEYSWITCH_DUR: Tq = Tq::from_ticks(TICKS_PER_QUARTER / 10);

/// What articulation resolution produced for the bundle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticulationPlan {
    pub keyswitches: Vec<KeyswitchEvent>,
    pub cc_events: Vec<CcEvent>,
    pub program_changes: Vec<ProgramChangeEvent>,
    /// The name active at the selection start.
    pub active_at_start: String,
    /// Sanitized change timeline, echoed when the candidate drove changes.
    pub changes: Vec<ArticulationChange>,
    /// Replacement channel for every note, under channel mode.
    pub channel_override: Option<u8>,
}

/// Resolve articulation intent into switching events.
///
/// Input shapes are tried in priority order: an explicit change timeline,
/// per-note tags (one change per tag transition, in onset order), then a
/// single global articulation at t=0. Names the profile's map cannot express
/// are dropped, from the change stream and from the notes themselves.
pub fn resolve(
    timeline: &[ArticulationChange],
    notes: &mut [NoteEvent],
    global: Option<&str>,
    profile: &InstrumentProfile,
    selection: Selection,
) -> ArticulationPlan {
    let settings = &profile.articulations;
    if settings.mode != ArtMode::None {
        clear_unknown_tags(notes, &settings.map);
    }
    let (raw_changes, echo) = gather_changes(timeline, notes, global, selection);

    // `none` mode has no map to validate against; names pass through
    let (changes, values) = if settings.mode == ArtMode::None {
        (raw_changes, Vec::new())
    } else {
        let mut kept = Vec::new();
        let mut values = Vec::new();
        for change in raw_changes {
            match lookup(&settings.map, &change.articulation) {
                Some(value) => {
                    kept.push(change);
                    values.push(value);
                }
                None => debug!("unknown articulation {:?}, dropped", change.articulation),
            }
        }
        (kept, values)
    };

    let channel = profile.default_channel();
    let mut plan = ArticulationPlan {
        active_at_start: changes
            .iter()
            .filter(|c| c.time_q <= Tq::ZERO)
            .last()
            .map(|c| c.articulation.clone())
            .unwrap_or_else(|| DEFAULT_ARTICULATION.to_string()),
        ..ArticulationPlan::default()
    };

    match settings.mode {
        ArtMode::None => {}
        ArtMode::Keyswitch => {
            plan.keyswitches = keyswitch_events(&changes, &values, settings, channel, selection)
        }
        ArtMode::Cc => plan.cc_events = cc_events(&changes, &values, settings, channel),
        ArtMode::ProgramChange => {
            plan.program_changes = program_events(&changes, &values, channel)
        }
        ArtMode::Channel => plan.channel_override = values.first().map(|&v| v.clamp(1, 16)),
    }

    if echo {
        plan.changes = changes;
    }
    plan
}

/// Collect changes by input priority. The second element says whether the
/// candidate drove changes (timeline or tags), which controls echoing.
fn gather_changes(
    timeline: &[ArticulationChange],
    notes: &[NoteEvent],
    global: Option<&str>,
    selection: Selection,
) -> (Vec<ArticulationChange>, bool) {
    if !timeline.is_empty() {
        let mut changes: Vec<ArticulationChange> = timeline
            .iter()
            .map(|c| ArticulationChange {
                time_q: c.time_q.clamp(Tq::ZERO, selection.length_q),
                articulation: c.articulation.clone(),
            })
            .collect();
        changes.sort_by_key(|c| c.time_q);
        return (changes, true);
    }

    let mut ordered: Vec<&NoteEvent> = notes.iter().collect();
    ordered.sort_by_key(|n| (n.start_q, n.pitch));
    let mut changes = Vec::new();
    let mut prev: Option<&str> = None;
    for note in ordered {
        let Some(tag) = note.articulation.as_deref() else {
            continue;
        };
        if prev == Some(tag) {
            continue;
        }
        changes.push(ArticulationChange {
            time_q: note.start_q,
            articulation: tag.to_string(),
        });
        prev = Some(tag);
    }
    if !changes.is_empty() {
        return (changes, true);
    }

    if let Some(name) = global {
        return (
            vec![ArticulationChange {
                time_q: Tq::ZERO,
                articulation: name.to_string(),
            }],
            false,
        );
    }
    (Vec::new(), false)
}

/// Clear note tags the profile's map cannot express. Runs before transition
/// detection so a dropped tag never counts as a transition.
fn clear_unknown_tags(notes: &mut [NoteEvent], map: &BTreeMap<String, u8>) {
    for note in notes.iter_mut() {
        let Some(tag) = note.articulation.as_deref() else {
            continue;
        };
        if lookup(map, tag).is_none() {
            debug!("unknown articulation tag {:?}, cleared from its note", tag);
            note.articulation = None;
        }
    }
}

/// Map lookup, falling back to a case-insensitive scan.
fn lookup(map: &BTreeMap<String, u8>, name: &str) -> Option<u8> {
    map.get(name).copied().or_else(|| {
        let lower = name.to_ascii_lowercase();
        map.iter()
            .find(|(key, _)| key.to_ascii_lowercase() == lower)
            .map(|(_, &value)| value)
    })
}

fn keyswitch_events(
    changes: &[ArticulationChange],
    values: &[u8],
    settings: &ArticulationSettings,
    channel: u8,
    selection: Selection,
) -> Vec<KeyswitchEvent> {
    let pre_roll = Tq::from_f64(settings.pre_roll_q);
    let mut events: Vec<KeyswitchEvent> = changes
        .iter()
        .zip(values)
        .map(|(change, &pitch)| KeyswitchEvent {
            time_q: (change.time_q - pre_roll).clamp_min_zero(),
            pitch,
            velocity: KEYSWITCH_VELOCITY,
            channel,
            dur_q: KEYSWITCH_DUR,
        })
        .collect();

    if settings.hold_keyswitches {
        for i in 0..events.len() {
            let until = if i + 1 < events.len() {
                events[i + 1].time_q
            } else {
                selection.length_q
            };
            events[i].dur_q = (until - events[i].time_q).max(KEYSWITCH_DUR);
        }
    }
    events
}

fn cc_events(
    changes: &[ArticulationChange],
    values: &[u8],
    settings: &ArticulationSettings,
    channel: u8,
) -> Vec<CcEvent> {
    let Some(controller) = settings.cc else {
        debug!("cc articulation mode without a controller number, nothing emitted");
        return Vec::new();
    };
    let pre_roll = Tq::from_f64(settings.pre_roll_q);
    changes
        .iter()
        .zip(values)
        .map(|(change, &value)| CcEvent {
            time_q: (change.time_q - pre_roll).clamp_min_zero(),
            controller,
            value,
            channel,
        })
        .collect()
}

fn program_events(
    changes: &[ArticulationChange],
    values: &[u8],
    channel: u8,
) -> Vec<ProgramChangeEvent> {
    changes
        .iter()
        .zip(values)
        .map(|(change, &program)| ProgramChangeEvent {
            time_q: change.time_q,
            program,
            channel,
        })
        .collect()
}

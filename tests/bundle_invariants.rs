//! Output contract checks: no matter how hostile the candidate, every
//! bundle that comes out of the compiler is playable as-is.
//!
//! These tests throw deliberately broken material at several profile
//! shapes and assert the guarantees hosts rely on: in-range values,
//! in-selection times, sorted streams, binary pedal, bounded tempo maps.

use cantus::compile::{Compiler, MIN_NOTE_DUR};
use cantus::event::{PartBundle, Selection, Tq};
use cantus::profile::InstrumentProfile;
use serde_json::json;

const LENGTH_Q: f64 = 16.0;

fn selection() -> Selection {
    Selection::new(Tq::from_f64(LENGTH_Q), (4, 4))
}

fn profiles() -> Vec<(&'static str, InstrumentProfile)> {
    let yaml = |text: &str| InstrumentProfile::from_yaml(text).expect("profile yaml");
    vec![
        ("default", InstrumentProfile::default()),
        ("mono", yaml("midi:\n  polyphony: mono\n")),
        (
            "drums",
            yaml("midi:\n  channel: 10\n  is_drum: true\n  drum_map:\n    kick: 36\n    snare: 38\n"),
        ),
        (
            "keyswitch",
            yaml("family: strings\nrange:\n  absolute: [55, 67]\narticulations:\n  mode: keyswitch\n  map:\n    legato: 24\n"),
        ),
    ]
}

// =============================================================================
// Hostile material
// =============================================================================

fn wild_notes() -> serde_json::Value {
    json!({
        "notes": [
            {"start_q": -50.0, "dur_q": 1.0, "pitch": 60, "vel": 90},
            {"start_q": 1e9, "dur_q": 1.0, "pitch": 60, "vel": 90},
            {"start_q": 2.0, "dur_q": -3.0, "pitch": 60, "vel": 90},
            {"start_q": 3.0, "dur_q": 0.0001, "pitch": 300, "vel": 90},
            {"start_q": 4.0, "dur_q": 1.0, "pitch": -20, "vel": 0},
            {"start_q": 5.0, "dur_q": 1.0, "pitch": 60, "vel": 9000},
            {"start_q": 6.0, "dur_q": 1.0, "pitch": 60, "vel": 90, "chan": 99},
            {"start_q": "soon", "dur_q": 1.0, "pitch": "high", "vel": 90},
            {"start_q": 15.99, "dur_q": 40.0, "pitch": 60, "vel": 90},
            "not a note",
        ]
    })
}

fn dense_cluster() -> serde_json::Value {
    let cluster: Vec<_> = (0..12)
        .map(|i| json!({"start_q": 0.0, "dur_q": 4.0, "pitch": 60 + i, "vel": 90}))
        .collect();
    let chain: Vec<_> = (0..10)
        .map(|i| json!({"start_q": i as f64 * 0.1, "dur_q": 2.0, "pitch": 72, "vel": 90}))
        .collect();
    let notes = [cluster, chain].concat();
    json!({"notes": notes})
}

fn unruly_curves() -> serde_json::Value {
    json!({
        "notes": [{"start_q": 0.0, "dur_q": 4.0, "pitch": 60, "vel": 90}],
        "curves": {
            "dynamics": {"breakpoints": [[8.0, 500.0], [-4.0, -90.0], [2.0, 64.0]]},
            "expression": {"interp": "cubic", "breakpoints": [[0.0, 127.0], [0.01, 0.0], [0.02, 127.0]]},
            "sustain_pedal": {"breakpoints": [
                [0.0, 63.9], [0.1, 64.0], [0.2, 10.0], [0.3, 120.0], [0.4, 2.0]
            ]}
        }
    })
}

fn tempo_spam() -> serde_json::Value {
    let mut markers: Vec<_> = (0..100)
        .map(|i| json!({"time_q": i as f64 * 0.01, "bpm": 40.0 + i as f64}))
        .collect();
    markers.push(json!({"time_q": 12.0, "bpm": 0.001}));
    markers.push(json!({"time_q": 13.0, "bpm": 1e9}));
    markers.push(json!({"time_q": 14.0, "bpm": "fast"}));
    markers.push(json!({"time_q": 15.0, "signature": [0, 0]}));
    markers.push(json!({"time_q": 15.5, "signature": [3, 4]}));
    json!({"notes": [], "tempo_markers": markers})
}

fn pattern_bomb() -> serde_json::Value {
    json!({
        "patterns": [{"id": "tick", "length_q": 0.5, "notes": [
            {"start_q": 0.0, "dur_q": 0.25, "pitch": 64, "vel": 90}
        ]}],
        "repeats": [
            {"pattern": "tick", "start_q": 0.0, "count": 1_000_000_000i64},
            {"pattern": "tick", "start_q": 0.25, "step_q": 0.0, "count": 50},
            {"pattern": "nobody-home", "start_q": 0.0, "count": 4},
        ]
    })
}

fn kitchen_sink() -> serde_json::Value {
    let mut value = wild_notes();
    value["curves"] = unruly_curves()["curves"].clone();
    value["tempo_markers"] = tempo_spam()["tempo_markers"].clone();
    value["drums"] = json!([
        {"drum": "kick", "start_q": 0.0},
        {"drum": "??", "start_q": 1.0},
    ]);
    value["articulation_changes"] = json!([
        {"time_q": -4.0, "articulation": "legato"},
        {"time_q": 2.0, "articulation": "nonsense"},
        {"time_q": 1e6, "articulation": "legato"},
    ]);
    value["handoff"] = json!({"anything": ["goes", 1, null]});
    value
}

fn hostile_candidates() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        ("wild notes", wild_notes()),
        ("dense cluster", dense_cluster()),
        ("unruly curves", unruly_curves()),
        ("tempo spam", tempo_spam()),
        ("pattern bomb", pattern_bomb()),
        ("kitchen sink", kitchen_sink()),
        ("null", json!(null)),
        ("array", json!([1, 2, 3])),
    ]
}

// =============================================================================
// The contract
// =============================================================================

fn check_bundle(bundle: &PartBundle, context: &str) {
    let length = Tq::from_f64(LENGTH_Q);

    for note in &bundle.notes {
        assert!(note.start_q >= Tq::ZERO, "{context}: note starts before zero");
        assert!(note.end_q() <= length, "{context}: note past the selection");
        assert!(note.dur_q >= MIN_NOTE_DUR, "{context}: note below minimum length");
        assert!(note.pitch <= 127, "{context}: pitch out of range");
        assert!(
            (1..=127).contains(&note.velocity),
            "{context}: velocity out of range"
        );
        assert!(
            (1..=16).contains(&note.channel),
            "{context}: channel out of range"
        );
    }
    for pair in bundle.notes.windows(2) {
        assert!(
            (pair[0].start_q, pair[0].pitch) <= (pair[1].start_q, pair[1].pitch),
            "{context}: notes out of order"
        );
    }

    for pair in bundle.cc_events.windows(2) {
        assert!(
            pair[0].time_q <= pair[1].time_q,
            "{context}: cc events out of order"
        );
    }
    for event in &bundle.cc_events {
        assert!(event.time_q >= Tq::ZERO, "{context}: cc before zero");
        if event.controller == 64 {
            assert!(
                event.value == 0 || event.value == 127,
                "{context}: sustain value {} is not binary",
                event.value
            );
        }
    }

    for ks in &bundle.keyswitches {
        assert!(ks.time_q >= Tq::ZERO, "{context}: keyswitch before zero");
        assert!(
            (1..=16).contains(&ks.channel),
            "{context}: keyswitch channel out of range"
        );
    }

    if let Some(markers) = &bundle.tempo_markers {
        assert!(markers.len() <= 32, "{context}: too many tempo markers");
        for pair in markers.windows(2) {
            assert!(
                pair[1].time_q - pair[0].time_q >= Tq::from_f64(0.25),
                "{context}: tempo markers too close"
            );
        }
        for marker in markers {
            if let Some(bpm) = marker.bpm {
                assert!(
                    (20.0..=300.0).contains(&bpm),
                    "{context}: bpm {bpm} out of range"
                );
            }
            if let Some((num, denom)) = marker.signature {
                assert!((1..=32).contains(&num), "{context}: bad signature numerator");
                assert!(
                    [1, 2, 4, 8, 16, 32].contains(&denom),
                    "{context}: bad signature denominator"
                );
            }
            assert!(
                marker.bpm.is_some() || marker.signature.is_some(),
                "{context}: marker carries nothing"
            );
        }
    }

    serde_json::to_string(bundle).unwrap_or_else(|e| panic!("{context}: serialize: {e}"));
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn every_bundle_honors_the_contract() {
    for (profile_name, profile) in profiles() {
        let compiler = Compiler::new(profile);
        for (candidate_name, candidate) in hostile_candidates() {
            let bundle = compiler.compile(&candidate, selection(), &[]);
            check_bundle(&bundle, &format!("{candidate_name} on {profile_name}"));
        }
    }
}

#[test]
fn mono_never_overlaps_even_under_clusters() {
    let compiler = Compiler::new(
        InstrumentProfile::from_yaml("midi:\n  polyphony: mono\n").expect("profile yaml"),
    );
    for (name, candidate) in [
        ("dense cluster", dense_cluster()),
        ("wild notes", wild_notes()),
        ("pattern bomb", pattern_bomb()),
    ] {
        let bundle = compiler.compile(&candidate, selection(), &[]);
        for pair in bundle.notes.windows(2) {
            assert!(
                pair[0].end_q() <= pair[1].start_q,
                "{name}: mono notes overlap at {}",
                pair[1].start_q
            );
        }
    }
}

#[test]
fn sustain_flutter_stays_binary_and_ordered() {
    let bundle = Compiler::new(InstrumentProfile::default()).compile(
        &unruly_curves(),
        selection(),
        &[],
    );
    let sustain: Vec<_> = bundle
        .cc_events
        .iter()
        .filter(|e| e.controller == 64)
        .collect();
    assert!(!sustain.is_empty());
    assert!(sustain.iter().all(|e| e.value == 0 || e.value == 127));
    for pair in sustain.windows(2) {
        assert!(pair[0].time_q <= pair[1].time_q);
        assert_ne!(pair[0].value, pair[1].value, "redundant pedal event");
    }
}

#[test]
fn tempo_spam_thins_to_a_bounded_ordered_map() {
    let bundle = Compiler::new(InstrumentProfile::default()).compile(
        &tempo_spam(),
        selection(),
        &[],
    );
    let markers = bundle.tempo_markers.expect("markers survive");
    assert!(markers.len() <= 32);
    // the spam collapses hard: 100 markers inside one quarter note
    assert!(markers.len() < 20, "expected heavy thinning, got {}", markers.len());
    for pair in markers.windows(2) {
        assert!(pair[1].time_q > pair[0].time_q);
    }
}

#[test]
fn pattern_bombs_expand_to_a_bounded_note_count() {
    let bundle = Compiler::new(InstrumentProfile::default()).compile(
        &pattern_bomb(),
        selection(),
        &[],
    );
    assert!(!bundle.notes.is_empty());
    assert!(
        bundle.notes.len() <= 256,
        "expansion unbounded: {} notes",
        bundle.notes.len()
    );
}

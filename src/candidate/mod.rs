//! Candidate record parsing: pulls a workable part out of loose model JSON.
//!
//! The upstream model may use either note schema, encode numbers as strings,
//! spell pitches as note names, or omit whole sections. Extraction is
//! per-element tolerant: a malformed note, breakpoint, pattern, or marker is
//! dropped with a debug log and everything else survives. Nothing here
//! fails; the worst outcome of a hopeless candidate is an empty part.

use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use crate::event::{ArticulationChange, Breakpoint, Interp, Selection, Tq};
use crate::theory::parse_note_name;

/// Velocity assumed when a note names no dynamic at all (mf).
const DEFAULT_VELOCITY: i32 = 80;

/// Duration names to quarter-note lengths. Dotted variants are derived.
const DURATION_NAMES: &[(&str, f64)] = &[
    ("whole", 4.0),
    ("half", 2.0),
    ("quarter", 1.0),
    ("eighth", 0.5),
    ("8th", 0.5),
    ("sixteenth", 0.25),
    ("16th", 0.25),
    ("thirty-second", 0.125),
    ("thirtysecond", 0.125),
    ("32nd", 0.125),
];

/// Dynamic names to velocities.
const DYNAMIC_NAMES: &[(&str, i32)] = &[
    ("ppp", 16),
    ("pp", 33),
    ("p", 49),
    ("mp", 64),
    ("mf", 80),
    ("f", 96),
    ("ff", 112),
    ("fff", 126),
];

/// A note in canonical form, before normalization. Values are raw: pitch and
/// velocity may be out of MIDI range, times may be negative or past the
/// selection end. Normalization owns the clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNote {
    pub start_q: Tq,
    pub dur_q: Tq,
    pub pitch: i32,
    pub velocity: i32,
    /// Raw channel; `None` falls back to the profile default.
    pub channel: Option<i64>,
    pub articulation: Option<String>,
}

/// A named reusable note group with pattern-relative times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPattern {
    pub length_q: Option<Tq>,
    pub notes: Vec<ParsedNote>,
}

/// One expansion instruction referencing a pattern by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRepeat {
    pub pattern: String,
    pub start_q: Tq,
    pub step_q: Option<Tq>,
    pub count: i64,
}

/// A drum hit by name, resolved through the profile drum map later.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDrum {
    pub name: String,
    pub start_q: Tq,
    pub dur_q: Tq,
    pub velocity: i32,
}

/// A tempo/time-signature marker before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTempoMarker {
    pub time_q: Tq,
    pub bpm: Option<f64>,
    pub signature: Option<(i64, i64)>,
    pub linear: bool,
}

/// A controller curve before clamping. `interp == None` defers to the
/// profile's smoothing default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCurve {
    pub interp: Option<Interp>,
    pub points: Vec<Breakpoint>,
}

/// Everything usable that could be extracted from one candidate record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCandidate {
    pub notes: Vec<ParsedNote>,
    pub curves: BTreeMap<String, ParsedCurve>,
    pub patterns: BTreeMap<String, ParsedPattern>,
    pub repeats: Vec<ParsedRepeat>,
    pub drums: Vec<ParsedDrum>,
    pub articulation: Option<String>,
    pub articulation_changes: Vec<ArticulationChange>,
    pub tempo_markers: Vec<RawTempoMarker>,
    pub handoff: Option<Value>,
    pub generation_type: String,
    pub generation_style: String,
}

/// Extract a candidate from a JSON value. Never fails.
pub fn parse(candidate: &Value, selection: Selection) -> ParsedCandidate {
    let mut parsed = ParsedCandidate {
        generation_type: string_field(candidate, "generation_type", "freeform"),
        generation_style: string_field(candidate, "generation_style", "neutral"),
        ..ParsedCandidate::default()
    };

    if let Some(list) = candidate.get("notes").and_then(Value::as_array) {
        for (i, raw) in list.iter().enumerate() {
            match parse_note(raw, selection) {
                Some(note) => parsed.notes.push(note),
                None => debug!("dropped malformed note at index {i}"),
            }
        }
    }
    if let Some(curves) = candidate.get("curves") {
        parsed.curves = parse_curves(curves, selection);
    }
    if let Some(patterns) = candidate.get("patterns") {
        parsed.patterns = parse_patterns(patterns, selection);
    }
    if let Some(repeats) = candidate.get("repeats") {
        parsed.repeats = parse_repeats(repeats, selection);
    }
    if let Some(drums) = candidate.get("drums") {
        parsed.drums = parse_drums(drums, selection);
    }
    parsed.articulation = candidate
        .get("articulation")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(changes) = candidate.get("articulation_changes") {
        parsed.articulation_changes = parse_articulation_changes(changes, selection);
    }
    if let Some(markers) = candidate.get("tempo_markers") {
        parsed.tempo_markers = parse_tempo_markers(markers, selection);
    }
    parsed.handoff = candidate.get("handoff").cloned().filter(|v| !v.is_null());
    parsed
}

fn string_field(obj: &Value, name: &str, default: &str) -> String {
    obj.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// First non-null field among the accepted spellings.
fn field<'a>(obj: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|n| obj.get(n))
        .filter(|v| !v.is_null())
}

/// Lenient float: JSON number or numeric string.
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Lenient integer: JSON number (rounded if fractional) or numeric string.
fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    }
}

/// Pitch as an integer, a numeric string, or a note name like "C#4".
fn coerce_pitch(value: &Value) -> Option<i32> {
    match value {
        Value::Number(_) => coerce_i64(value).map(|p| p as i32),
        Value::String(s) => {
            if let Some(p) = parse_note_name(s) {
                return Some(p as i32);
            }
            coerce_i64(value).map(|p| p as i32)
        }
        _ => None,
    }
}

fn parse_note(obj: &Value, selection: Selection) -> Option<ParsedNote> {
    let pitch = field(obj, &["pitch", "note"]).and_then(coerce_pitch)?;
    let start_q = event_time(obj, selection).unwrap_or(Tq::ZERO);
    let dur_q = event_duration(obj).unwrap_or(Tq::from_quarters(1));
    let velocity = parse_velocity(obj).unwrap_or(DEFAULT_VELOCITY);
    let channel = field(obj, &["chan", "channel"]).and_then(coerce_i64);
    let articulation = field(obj, &["articulation", "art"])
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Some(ParsedNote {
        start_q,
        dur_q,
        pitch,
        velocity,
        channel,
        articulation,
    })
}

/// Event time from `start_q`/`time_q`, else 1-based bar/beat coordinates.
fn event_time(obj: &Value, selection: Selection) -> Option<Tq> {
    if let Some(t) = field(obj, &["start_q", "time_q"]).and_then(coerce_f64) {
        return Some(Tq::from_f64(t));
    }
    let bar = field(obj, &["bar"]).and_then(coerce_f64);
    let beat = field(obj, &["beat"]).and_then(coerce_f64);
    if bar.is_none() && beat.is_none() {
        return None;
    }
    Some(selection.bar_beat_to_tq(bar.unwrap_or(1.0), beat.unwrap_or(1.0)))
}

/// Duration from `dur_q`, a numeric `dur`, or a duration name like
/// "dotted eighth".
fn event_duration(obj: &Value) -> Option<Tq> {
    if let Some(d) = field(obj, &["dur_q"]).and_then(coerce_f64) {
        return Some(Tq::from_f64(d));
    }
    let dur = field(obj, &["dur", "duration"])?;
    if let Some(d) = coerce_f64(dur) {
        return Some(Tq::from_f64(d));
    }
    dur.as_str().and_then(duration_from_name).map(Tq::from_f64)
}

fn parse_velocity(obj: &Value) -> Option<i32> {
    if let Some(v) = field(obj, &["vel", "velocity"]).and_then(coerce_i64) {
        return Some(v as i32);
    }
    let dynamic = field(obj, &["dyn"])?;
    if let Some(name) = dynamic.as_str() {
        return velocity_from_dynamic(name);
    }
    coerce_i64(dynamic).map(|v| v as i32)
}

fn duration_from_name(name: &str) -> Option<f64> {
    let name = name.trim().to_ascii_lowercase();
    let (base, dotted) = match name.strip_prefix("dotted ") {
        Some(rest) => (rest.trim(), true),
        None => match name.strip_suffix('.') {
            Some(rest) => (rest.trim(), true),
            None => (name.as_str(), false),
        },
    };
    DURATION_NAMES
        .iter()
        .find(|(n, _)| *n == base)
        .map(|&(_, q)| if dotted { q * 1.5 } else { q })
}

fn velocity_from_dynamic(name: &str) -> Option<i32> {
    let name = name.trim().to_ascii_lowercase();
    DYNAMIC_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, v)| v)
}

fn parse_curves(value: &Value, selection: Selection) -> BTreeMap<String, ParsedCurve> {
    let mut curves = BTreeMap::new();
    let Some(map) = value.as_object() else {
        return curves;
    };
    for (name, spec) in map {
        let interp = spec
            .get("interp")
            .and_then(Value::as_str)
            .and_then(parse_interp);
        let mut points = Vec::new();
        if let Some(list) = spec.get("breakpoints").and_then(Value::as_array) {
            for bp in list {
                match parse_breakpoint(bp, selection) {
                    Some(point) => points.push(point),
                    None => debug!("curve {name}: dropped malformed breakpoint"),
                }
            }
        }
        curves.insert(name.clone(), ParsedCurve { interp, points });
    }
    curves
}

fn parse_interp(name: &str) -> Option<Interp> {
    match name.trim().to_ascii_lowercase().as_str() {
        "hold" | "step" => Some(Interp::Hold),
        "linear" => Some(Interp::Linear),
        "cubic" | "spline" => Some(Interp::Cubic),
        _ => None,
    }
}

/// A breakpoint is `{time_q|bar/beat, value}` or a bare `[time, value]` pair.
fn parse_breakpoint(bp: &Value, selection: Selection) -> Option<Breakpoint> {
    if let Some(pair) = bp.as_array() {
        if pair.len() != 2 {
            return None;
        }
        let t = coerce_f64(&pair[0])?;
        let v = coerce_f64(&pair[1])?;
        return Some(Breakpoint::new(Tq::from_f64(t), v));
    }
    let time_q = event_time(bp, selection)?;
    let value = field(bp, &["value", "val"]).and_then(coerce_f64)?;
    Some(Breakpoint::new(time_q, value))
}

fn parse_patterns(value: &Value, selection: Selection) -> BTreeMap<String, ParsedPattern> {
    let mut patterns = BTreeMap::new();
    let Some(list) = value.as_array() else {
        return patterns;
    };
    for entry in list {
        let Some(id) = field(entry, &["id", "name"]).and_then(Value::as_str) else {
            debug!("dropped pattern without an id");
            continue;
        };
        let length_q = field(entry, &["length_q", "length"])
            .and_then(coerce_f64)
            .map(Tq::from_f64);
        let mut notes = Vec::new();
        if let Some(raw_notes) = entry.get("notes").and_then(Value::as_array) {
            for raw in raw_notes {
                match parse_note(raw, selection) {
                    Some(note) => notes.push(note),
                    None => debug!("pattern {id}: dropped malformed note"),
                }
            }
        }
        patterns.insert(id.to_string(), ParsedPattern { length_q, notes });
    }
    patterns
}

fn parse_repeats(value: &Value, selection: Selection) -> Vec<ParsedRepeat> {
    let mut repeats = Vec::new();
    let Some(list) = value.as_array() else {
        return repeats;
    };
    for entry in list {
        let Some(pattern) = field(entry, &["pattern", "pattern_id", "id"]).and_then(Value::as_str)
        else {
            debug!("dropped repeat without a pattern reference");
            continue;
        };
        let start_q = event_time(entry, selection).unwrap_or(Tq::ZERO);
        let step_q = field(entry, &["step_q", "step"])
            .and_then(coerce_f64)
            .map(Tq::from_f64);
        let count = field(entry, &["count", "times"])
            .and_then(coerce_i64)
            .unwrap_or(1);
        repeats.push(ParsedRepeat {
            pattern: pattern.to_string(),
            start_q,
            step_q,
            count,
        });
    }
    repeats
}

fn parse_drums(value: &Value, selection: Selection) -> Vec<ParsedDrum> {
    let mut drums = Vec::new();
    let Some(list) = value.as_array() else {
        return drums;
    };
    for entry in list {
        let Some(name) = field(entry, &["drum", "name"]).and_then(Value::as_str) else {
            debug!("dropped drum hit without a name");
            continue;
        };
        let start_q = event_time(entry, selection).unwrap_or(Tq::ZERO);
        let dur_q = event_duration(entry).unwrap_or(Tq::from_f64(0.25));
        let velocity = parse_velocity(entry).unwrap_or(DEFAULT_VELOCITY);
        drums.push(ParsedDrum {
            name: name.trim().to_string(),
            start_q,
            dur_q,
            velocity,
        });
    }
    drums
}

fn parse_articulation_changes(value: &Value, selection: Selection) -> Vec<ArticulationChange> {
    let mut changes = Vec::new();
    let Some(list) = value.as_array() else {
        return changes;
    };
    for entry in list {
        let Some(name) = field(entry, &["articulation", "art", "name"]).and_then(Value::as_str)
        else {
            debug!("dropped articulation change without a name");
            continue;
        };
        let Some(time_q) = event_time(entry, selection) else {
            debug!("dropped articulation change without a time");
            continue;
        };
        changes.push(ArticulationChange {
            time_q,
            articulation: name.trim().to_string(),
        });
    }
    changes
}

fn parse_tempo_markers(value: &Value, selection: Selection) -> Vec<RawTempoMarker> {
    let mut markers = Vec::new();
    let Some(list) = value.as_array() else {
        return markers;
    };
    for entry in list {
        let Some(time_q) = event_time(entry, selection) else {
            debug!("dropped tempo marker without a time");
            continue;
        };
        let bpm = field(entry, &["bpm", "tempo"]).and_then(coerce_f64);
        let signature =
            field(entry, &["signature", "time_signature", "meter"]).and_then(parse_signature);
        let linear = field(entry, &["linear"])
            .and_then(Value::as_bool)
            .unwrap_or(false);
        markers.push(RawTempoMarker {
            time_q,
            bpm,
            signature,
            linear,
        });
    }
    markers
}

/// A signature is "3/4", a `[3, 4]` pair, or `{num, denom}`.
fn parse_signature(value: &Value) -> Option<(i64, i64)> {
    match value {
        Value::String(s) => {
            let (num, denom) = s.trim().split_once('/')?;
            Some((num.trim().parse().ok()?, denom.trim().parse().ok()?))
        }
        Value::Array(pair) if pair.len() == 2 => {
            Some((coerce_i64(&pair[0])?, coerce_i64(&pair[1])?))
        }
        Value::Object(_) => {
            let num = field(value, &["num", "numerator"]).and_then(coerce_i64)?;
            let denom = field(value, &["denom", "denominator"]).and_then(coerce_i64)?;
            Some((num, denom))
        }
        _ => None,
    }
}

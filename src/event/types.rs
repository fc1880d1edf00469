//! Event data model: the playable output types and the part bundle.
//!
//! Everything here is plain owned data, built fresh per compile call and
//! returned to the caller. Times serialize as `f64` quarter-note values
//! (`start_q`, `dur_q`, `time_q`), the field names the downstream player
//! expects.

use serde::{Deserialize, Serialize};

use super::time::Tq;

/// A single pitched note in the output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub start_q: Tq,
    pub dur_q: Tq,
    /// MIDI note number (0–127).
    pub pitch: u8,
    /// 1–127; zero would be a note-off in disguise, so it is never emitted.
    pub velocity: u8,
    /// MIDI channel, 1-based (1–16).
    pub channel: u8,
    /// Articulation tag carried through for players that render per-note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub articulation: Option<String>,
}

impl NoteEvent {
    pub fn new(start_q: Tq, dur_q: Tq, pitch: u8, velocity: u8, channel: u8) -> Self {
        Self {
            start_q,
            dur_q,
            pitch,
            velocity,
            channel,
            articulation: None,
        }
    }

    /// End of the note on the timeline.
    pub fn end_q(&self) -> Tq {
        self.start_q + self.dur_q
    }
}

/// A continuous-controller event (expression, mod wheel, sustain pedal, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcEvent {
    pub time_q: Tq,
    /// Controller number (0–127).
    pub controller: u8,
    /// Controller value (0–127).
    pub value: u8,
    pub channel: u8,
}

/// A low-velocity trigger note that selects an articulation on a sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyswitchEvent {
    pub time_q: Tq,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub dur_q: Tq,
}

/// A MIDI program change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramChangeEvent {
    pub time_q: Tq,
    /// Program number (0–127).
    pub program: u8,
    pub channel: u8,
}

/// A tempo and/or time-signature change.
///
/// At least one of `bpm` and `signature` is present on every marker that
/// survives validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoMarker {
    pub time_q: Tq,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    /// (numerator, denominator), e.g. (3, 4) for 3/4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<(u8, u8)>,
    /// Gradual transition toward this marker's tempo instead of a jump.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub linear: bool,
}

/// One entry of an explicit articulation timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticulationChange {
    pub time_q: Tq,
    pub articulation: String,
}

/// Interpolation flavor of a controller curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interp {
    Hold,
    Linear,
    Cubic,
}

impl Default for Interp {
    fn default() -> Self {
        Interp::Linear
    }
}

/// A (time, value) pair defining one point of a controller curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub time_q: Tq,
    pub value: f64,
}

impl Breakpoint {
    pub fn new(time_q: Tq, value: f64) -> Self {
        Self { time_q, value }
    }
}

/// One entry of a chord map: the intended harmony from `time_q` onward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSpan {
    pub time_q: Tq,
    /// Chord tones as pitch classes 0–11, deduplicated.
    pub tones: Vec<u8>,
    pub label: String,
}

impl ChordSpan {
    pub fn new(time_q: Tq, tones: Vec<u8>, label: impl Into<String>) -> Self {
        let mut tones: Vec<u8> = tones.into_iter().map(|t| t % 12).collect();
        tones.sort_unstable();
        tones.dedup();
        Self {
            time_q,
            tones,
            label: label.into(),
        }
    }

    pub fn contains_pitch(&self, pitch: u8) -> bool {
        self.tones.contains(&(pitch % 12))
    }
}

/// The span of music being compiled: its length and time signature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub length_q: Tq,
    /// (numerator, denominator), e.g. (4, 4) or (6, 8).
    pub meter: (u8, u8),
}

impl Selection {
    pub fn new(length_q: Tq, meter: (u8, u8)) -> Self {
        Self { length_q, meter }
    }

    /// One beat of the meter in quarter notes (a beat in 6/8 is 0.5 q).
    pub fn beat_len(&self) -> Tq {
        let denom = if self.meter.1 == 0 { 4 } else { self.meter.1 };
        Tq::from_f64(4.0 / denom as f64)
    }

    /// One bar of the meter in quarter notes.
    pub fn bar_len(&self) -> Tq {
        let num = if self.meter.0 == 0 { 4 } else { self.meter.0 };
        Tq::from_ticks(self.beat_len().ticks() * num as i64)
    }

    /// Convert 1-based bar/beat coordinates to an absolute time.
    ///
    /// Fractional beats are honored (`beat: 2.5` lands halfway through the
    /// second beat). Inputs below 1 floor at the selection start.
    pub fn bar_beat_to_tq(&self, bar: f64, beat: f64) -> Tq {
        let bars = (bar - 1.0).max(0.0);
        let beats = (beat - 1.0).max(0.0);
        let ticks = bars * self.bar_len().ticks() as f64 + beats * self.beat_len().ticks() as f64;
        Tq::from_ticks(ticks.round() as i64)
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            length_q: Tq::from_quarters(16),
            meter: (4, 4),
        }
    }
}

/// A short opening fragment of the compiled part, re-based to start at zero,
/// for reuse as thematic material in later generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMotif {
    pub notes: Vec<NoteEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chord: Option<String>,
}

/// The compiler's output: a guaranteed-valid playable part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartBundle {
    pub notes: Vec<NoteEvent>,
    pub cc_events: Vec<CcEvent>,
    pub keyswitches: Vec<KeyswitchEvent>,
    pub program_changes: Vec<ProgramChangeEvent>,
    /// The articulation active at the start of the selection.
    pub articulation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub articulation_changes: Option<Vec<ArticulationChange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo_markers: Option<Vec<TempoMarker>>,
    pub generation_type: String,
    pub generation_style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_motif: Option<ExtractedMotif>,
}

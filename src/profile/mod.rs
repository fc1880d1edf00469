//! Instrument profiles: the playability contract loaded from ~/.cantus/profiles/*.yaml.
//!
//! A profile is immutable for the duration of one compile. Every field has a
//! serde default so a partial YAML document (or none at all) still yields a
//! usable contract; a generic polyphonic keyboard is the zero-config profile.

pub mod error;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::event::Interp;

pub use error::ProfileError;

/// Broad instrument family, used by per-family duration policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Keys,
    Strings,
    Winds,
    Brass,
    Guitar,
    Percussion,
    Vocals,
    Synth,
    Other,
}

impl Default for Family {
    fn default() -> Self {
        Family::Keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polyphony {
    Poly,
    Mono,
}

impl Default for Polyphony {
    fn default() -> Self {
        Polyphony::Poly
    }
}

/// Playable pitch range. `absolute` is enforced; `preferred` documents the
/// comfortable register for hosts that build prompts or displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchRange {
    #[serde(default = "PitchRange::default_absolute")]
    pub absolute: (u8, u8),
    #[serde(default = "PitchRange::default_preferred")]
    pub preferred: (u8, u8),
}

impl PitchRange {
    fn default_absolute() -> (u8, u8) {
        (21, 108)
    }

    fn default_preferred() -> (u8, u8) {
        (36, 96)
    }

    /// Absolute bounds with lo ≤ hi, regardless of how the YAML ordered them.
    pub fn absolute_bounds(&self) -> (u8, u8) {
        let (a, b) = self.absolute;
        (a.min(b).min(127), a.max(b).min(127))
    }
}

impl Default for PitchRange {
    fn default() -> Self {
        Self {
            absolute: Self::default_absolute(),
            preferred: Self::default_preferred(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiSettings {
    /// Default output channel, 1-based.
    #[serde(default = "MidiSettings::default_channel")]
    pub channel: u8,
    #[serde(default)]
    pub polyphony: Polyphony,
    #[serde(default)]
    pub is_drum: bool,
    /// Drum name → trigger pitch, for drum-flagged profiles.
    #[serde(default)]
    pub drum_map: BTreeMap<String, u8>,
}

impl MidiSettings {
    fn default_channel() -> u8 {
        1
    }
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            channel: Self::default_channel(),
            polyphony: Polyphony::default(),
            is_drum: false,
            drum_map: BTreeMap::new(),
        }
    }
}

/// How sampled curves become CC events: one event per sample step, or only
/// when the rounded value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitMode {
    Dense,
    SparseOnChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Smoothing {
    /// Sampling step as a fraction of a whole note, e.g. "1/64".
    #[serde(default = "Smoothing::default_min_step")]
    pub min_step: String,
    /// Default interpolation for curves that do not name one.
    #[serde(default)]
    pub interp: Interp,
    /// Preferred emission strategy. Wins over `write_every_step` when both
    /// appear; the flag spelling is accepted from older profile files.
    #[serde(default)]
    pub mode: Option<EmitMode>,
    #[serde(default)]
    pub write_every_step: Option<bool>,
}

impl Smoothing {
    fn default_min_step() -> String {
        "1/64".to_string()
    }

    /// Resolve the emission strategy once per compile.
    pub fn emit_mode(&self) -> EmitMode {
        match (self.mode, self.write_every_step) {
            (Some(mode), _) => mode,
            (None, Some(true)) => EmitMode::Dense,
            (None, Some(false)) => EmitMode::SparseOnChange,
            (None, None) => EmitMode::SparseOnChange,
        }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            min_step: Self::default_min_step(),
            interp: Interp::default(),
            mode: None,
            write_every_step: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Semantic curve name → CC number (e.g. dynamics → CC1).
    #[serde(default = "ControllerSettings::default_semantic_to_cc")]
    pub semantic_to_cc: BTreeMap<String, u8>,
    #[serde(default)]
    pub smoothing: Smoothing,
}

impl ControllerSettings {
    fn default_semantic_to_cc() -> BTreeMap<String, u8> {
        let mut map = BTreeMap::new();
        map.insert("dynamics".to_string(), 1);
        map.insert("expression".to_string(), 11);
        map.insert("sustain_pedal".to_string(), 64);
        map
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            semantic_to_cc: Self::default_semantic_to_cc(),
            smoothing: Smoothing::default(),
        }
    }
}

/// The mechanism this instrument uses to switch articulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtMode {
    None,
    Keyswitch,
    Cc,
    ProgramChange,
    Channel,
}

impl Default for ArtMode {
    fn default() -> Self {
        ArtMode::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticulationSettings {
    #[serde(default)]
    pub mode: ArtMode,
    /// Controller number for `cc` mode.
    #[serde(default)]
    pub cc: Option<u8>,
    /// Articulation name → keyswitch pitch, CC value, program number, or
    /// channel, depending on the mode.
    #[serde(default)]
    pub map: BTreeMap<String, u8>,
    /// Per-articulation maximum note duration in quarters, overriding the
    /// built-in short-articulation table.
    #[serde(default, alias = "short")]
    pub short_articulations: BTreeMap<String, f64>,
    /// How far ahead of the note a switching event fires, in quarters.
    #[serde(default = "ArticulationSettings::default_pre_roll_q")]
    pub pre_roll_q: f64,
    /// Stretch each keyswitch until the next one instead of a short tap.
    #[serde(default)]
    pub hold_keyswitches: bool,
}

impl ArticulationSettings {
    fn default_pre_roll_q() -> f64 {
        0.1
    }
}

impl Default for ArticulationSettings {
    fn default() -> Self {
        Self {
            mode: ArtMode::default(),
            cc: None,
            map: BTreeMap::new(),
            short_articulations: BTreeMap::new(),
            pre_roll_q: Self::default_pre_roll_q(),
            hold_keyswitches: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchFixPolicy {
    OctaveShiftToFit,
    Clamp,
}

impl Default for PitchFixPolicy {
    fn default() -> Self {
        PitchFixPolicy::OctaveShiftToFit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixPolicy {
    #[serde(default)]
    pub pitch: PitchFixPolicy,
}

/// Empirically tuned pipeline constants, exposed as configuration so hosts
/// can adjust them per instrument library.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Delay before a sustain-pedal re-press registers, in quarters.
    #[serde(default = "Tuning::default_sustain_rearm_q")]
    pub sustain_rearm_q: f64,
    /// How early an out-of-chord note may anticipate the next chord.
    #[serde(default = "Tuning::default_pickup_window_q")]
    pub pickup_window_q: f64,
    /// Breakpoints closer than this are considered duplicates.
    #[serde(default = "Tuning::default_dedupe_window_q")]
    pub dedupe_window_q: f64,
    /// Longest unbroken wind/brass phrase, in quarters.
    #[serde(default = "Tuning::default_max_phrase_q")]
    pub max_phrase_q: f64,
    /// Gap carved out between breath segments.
    #[serde(default = "Tuning::default_breath_gap_q")]
    pub breath_gap_q: f64,
    /// Bow length for string splitting, in bars.
    #[serde(default = "Tuning::default_bow_bars")]
    pub bow_bars: f64,
    /// Gap between bow segments, in quarters.
    #[serde(default)]
    pub bow_gap_q: f64,
}

impl Tuning {
    fn default_sustain_rearm_q() -> f64 {
        0.1
    }

    fn default_pickup_window_q() -> f64 {
        0.5
    }

    fn default_dedupe_window_q() -> f64 {
        0.05
    }

    fn default_max_phrase_q() -> f64 {
        4.0
    }

    fn default_breath_gap_q() -> f64 {
        0.25
    }

    fn default_bow_bars() -> f64 {
        1.0
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            sustain_rearm_q: Self::default_sustain_rearm_q(),
            pickup_window_q: Self::default_pickup_window_q(),
            dedupe_window_q: Self::default_dedupe_window_q(),
            max_phrase_q: Self::default_max_phrase_q(),
            breath_gap_q: Self::default_breath_gap_q(),
            bow_gap_q: 0.0,
            bow_bars: Self::default_bow_bars(),
        }
    }
}

/// The full instrument contract.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstrumentProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub family: Family,
    #[serde(default)]
    pub range: PitchRange,
    #[serde(default)]
    pub midi: MidiSettings,
    #[serde(default)]
    pub controllers: ControllerSettings,
    #[serde(default)]
    pub articulations: ArticulationSettings,
    #[serde(default)]
    pub fix_policy: FixPolicy,
    #[serde(default)]
    pub tuning: Tuning,
}

impl InstrumentProfile {
    /// Parse a profile from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ProfileError> {
        serde_yaml::from_str(yaml).map_err(|e| ProfileError::parse(e.to_string()))
    }

    /// Load a profile from an explicit path.
    pub fn from_path(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProfileError::io(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    /// Load a named profile from the standard location
    /// (~/.cantus/profiles/<name>.yaml).
    /// Returns None if the file doesn't exist or fails to parse (graceful fallback).
    pub fn load(name: &str) -> Option<Self> {
        let home = dirs::home_dir()?;
        let path = home
            .join(".cantus")
            .join("profiles")
            .join(format!("{name}.yaml"));
        let content = std::fs::read_to_string(path).ok()?;
        serde_yaml::from_str(&content).ok()
    }

    /// The channel notes fall back to, forced into 1–16.
    pub fn default_channel(&self) -> u8 {
        self.midi.channel.clamp(1, 16)
    }

    pub fn is_mono(&self) -> bool {
        self.midi.polyphony == Polyphony::Mono
    }

    pub fn is_drum(&self) -> bool {
        self.midi.is_drum
    }
}

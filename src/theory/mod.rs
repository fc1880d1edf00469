//! Music theory primitives: pitch names, chord detection, key detection.

pub mod chords;
pub mod key;
pub mod pitch;

pub use chords::detect_chord;
pub use key::detect_key;
pub use pitch::{note_name, parse_note_name, pitch_class_name};

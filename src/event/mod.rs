//! Musical time and the event data model.
//!
//! [`Tq`] is integer musical time (960 ticks per quarter note); everything
//! else is the plain-data vocabulary the compiler consumes and produces,
//! culminating in [`PartBundle`].

pub mod time;
pub mod types;

pub use time::{Tq, TICKS_PER_QUARTER};
pub use types::{
    ArticulationChange, Breakpoint, CcEvent, ChordSpan, ExtractedMotif, Interp, KeyswitchEvent,
    NoteEvent, PartBundle, ProgramChangeEvent, Selection, TempoMarker,
};

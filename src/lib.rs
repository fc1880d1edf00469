//! Cantus turns a model's loose musical sketch into a playable part.

pub mod candidate;
pub mod compile;
pub mod curve;
pub mod event;
pub mod profile;
pub mod theory;

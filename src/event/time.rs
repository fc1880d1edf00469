//! Musical time representation using integer ticks.
//!
//! Uses 960 PPQN (Pulses Per Quarter Note) to avoid floating-point accumulation
//! errors across the repair pipeline. All internal time arithmetic is
//! integer-based; conversion to fractional quarter notes happens only at the
//! serialization boundary, where times are written as `f64` quarters.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Ticks per quarter note. 960 is a common PPQN that divides cleanly
/// by 2, 3, 4, 5, 6, 8, 10, 12, 15, 16, 20, 24, 32, etc., so every
/// duration the pipeline cares about (1/16 q, 0.05 q, 0.25 q) is exact.
pub const TICKS_PER_QUARTER: i64 = 960;

/// Musical time or duration in integer ticks at [`TICKS_PER_QUARTER`] resolution.
///
/// Signed so that intermediate subtraction (pre-roll offsets, gap math) cannot
/// silently wrap; callers clamp with [`Tq::max`] or [`Tq::clamp_min_zero`]
/// before emitting.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Tq {
    ticks: i64,
}

impl Tq {
    /// Zero time, the start of the selection.
    pub const ZERO: Tq = Tq { ticks: 0 };

    /// Create a `Tq` from a raw tick count.
    pub const fn from_ticks(ticks: i64) -> Self {
        Self { ticks }
    }

    /// Create a `Tq` from whole quarter notes.
    pub const fn from_quarters(quarters: i64) -> Self {
        Self {
            ticks: quarters * TICKS_PER_QUARTER,
        }
    }

    /// Create a `Tq` from a fractional quarter-note value (e.g. 1.5 = a dotted quarter).
    ///
    /// Non-finite input maps to zero; the pipeline treats NaN times as "missing".
    pub fn from_f64(quarters: f64) -> Self {
        if !quarters.is_finite() {
            return Self::ZERO;
        }
        Self {
            ticks: (quarters * TICKS_PER_QUARTER as f64).round() as i64,
        }
    }

    /// Return the raw tick count.
    pub fn ticks(self) -> i64 {
        self.ticks
    }

    /// Convert to a floating-point quarter-note value.
    pub fn as_f64(self) -> f64 {
        self.ticks as f64 / TICKS_PER_QUARTER as f64
    }

    /// Negative times snap to zero; everything on the wire starts at or after
    /// the selection origin.
    pub fn clamp_min_zero(self) -> Self {
        Self {
            ticks: self.ticks.max(0),
        }
    }

    /// Clamp into the inclusive range `[lo, hi]`.
    pub fn clamp(self, lo: Tq, hi: Tq) -> Self {
        Self {
            ticks: self.ticks.clamp(lo.ticks, hi.ticks),
        }
    }

    pub fn min(self, other: Tq) -> Self {
        if self.ticks <= other.ticks {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Tq) -> Self {
        if self.ticks >= other.ticks {
            self
        } else {
            other
        }
    }

    pub fn is_positive(self) -> bool {
        self.ticks > 0
    }

    /// Scale by a float factor, rounding to the nearest tick.
    pub fn scale(self, factor: f64) -> Self {
        Self {
            ticks: (self.ticks as f64 * factor).round() as i64,
        }
    }
}

impl fmt::Display for Tq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}q", self.as_f64())
    }
}

impl Ord for Tq {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks.cmp(&other.ticks)
    }
}

impl PartialOrd for Tq {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Tq {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks + rhs.ticks,
        }
    }
}

impl Sub for Tq {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks - rhs.ticks,
        }
    }
}

impl Serialize for Tq {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Tq {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let quarters = f64::deserialize(deserializer)?;
        if !quarters.is_finite() {
            return Err(de::Error::custom("non-finite quarter-note time"));
        }
        Ok(Tq::from_f64(quarters))
    }
}

//! Breakpoint curve evaluation and CC-event emission.
//!
//! Curves are named by semantic role (dynamics, expression, sustain_pedal)
//! and resolved to controller numbers through the profile's mapping. The
//! sustain pedal is special-cased to binary on/off output; everything else
//! is either held per breakpoint or sampled at the profile's smoothing step.

use log::debug;

use crate::event::{Breakpoint, CcEvent, Interp, Tq, TICKS_PER_QUARTER};
use crate::profile::{EmitMode, InstrumentProfile};

/// Curve name that triggers binary pedal emission.
pub(crate) const SUSTAIN_CURVE: &str = "sustain_pedal";

/// Pedal values at or above this count as "down".
const SUSTAIN_ON_THRESHOLD: f64 = 64.0;

/// Hard floor on the sampling step, 1/16 of a quarter note.
const MIN_STEP: Tq = Tq::from_ticks(TICKS_PER_QUARTER / 16);

/// A resolved controller curve: concrete interpolation, points sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCurve {
    pub name: String,
    pub interp: Interp,
    pub points: Vec<Breakpoint>,
}

impl NamedCurve {
    pub fn new(name: impl Into<String>, interp: Interp, mut points: Vec<Breakpoint>) -> Self {
        points.sort_by_key(|p| p.time_q);
        Self {
            name: name.into(),
            interp,
            points,
        }
    }

    /// Curve value at `t`.
    pub fn value_at(&self, t: Tq) -> f64 {
        evaluate(&self.points, self.interp, t)
    }
}

/// Evaluate a breakpoint list at time `t`.
///
/// No points yields 0; one point is constant everywhere. Otherwise the
/// bracketing interval is found by forward scan. Before the first point the
/// first value holds, past the last point the last value holds. `Hold` takes
/// the left breakpoint, `Linear` interpolates, `Cubic` runs a Catmull-Rom
/// spline with endpoints duplicated where a neighbor is missing.
///
/// `points` must be sorted by time; [`NamedCurve::new`] guarantees that.
pub fn evaluate(points: &[Breakpoint], interp: Interp, t: Tq) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    if points.len() == 1 {
        return points[0].value;
    }

    let mut i = 0;
    while i + 1 < points.len() && points[i + 1].time_q <= t {
        i += 1;
    }
    if i + 1 == points.len() {
        return points[i].value;
    }
    if interp == Interp::Hold {
        return points[i].value;
    }

    let span = (points[i + 1].time_q - points[i].time_q).ticks();
    let u = if span > 0 {
        ((t - points[i].time_q).ticks() as f64 / span as f64).clamp(0.0, 1.0)
    } else {
        1.0
    };

    if interp == Interp::Linear {
        let (a, b) = (points[i].value, points[i + 1].value);
        return a + (b - a) * u;
    }

    // Catmull-Rom through the four surrounding points
    let p0 = if i == 0 {
        points[0].value
    } else {
        points[i - 1].value
    };
    let p1 = points[i].value;
    let p2 = points[i + 1].value;
    let p3 = if i + 2 < points.len() {
        points[i + 2].value
    } else {
        points[i + 1].value
    };
    let u2 = u * u;
    let u3 = u2 * u;
    0.5 * (2.0 * p1
        + (p2 - p0) * u
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * u3)
}

/// Convert resolved curves into controller events on the profile's channel.
///
/// Curves whose name has no entry in `semantic_to_cc` are skipped. The
/// sustain pedal always takes the binary path regardless of its declared
/// interpolation, so its output never carries intermediate values.
pub fn build_cc_events(
    curves: &[NamedCurve],
    profile: &InstrumentProfile,
    length_q: Tq,
) -> Vec<CcEvent> {
    let channel = profile.default_channel();
    let smoothing = &profile.controllers.smoothing;
    let step = step_from_spec(&smoothing.min_step);
    let mode = smoothing.emit_mode();
    let rearm = Tq::from_f64(profile.tuning.sustain_rearm_q);

    let mut events = Vec::new();
    for curve in curves {
        let Some(&controller) = profile.controllers.semantic_to_cc.get(&curve.name) else {
            debug!("curve {} has no CC mapping, skipped", curve.name);
            continue;
        };
        let points = clamped_points(&curve.points, length_q);
        if points.is_empty() {
            continue;
        }
        let mut curve_events = if curve.name == SUSTAIN_CURVE {
            sustain_events(&points, controller, channel, rearm)
        } else if curve.interp == Interp::Hold {
            hold_events(&points, controller, channel)
        } else {
            sampled_events(&points, curve.interp, mode, step, length_q, controller, channel)
        };
        events.append(&mut curve_events);
    }
    events.sort_by_key(|e| (e.time_q, e.controller));
    events
}

/// Clamp times into the selection and values into controller range, keeping
/// the points sorted.
fn clamped_points(points: &[Breakpoint], length_q: Tq) -> Vec<Breakpoint> {
    let mut points: Vec<Breakpoint> = points
        .iter()
        .map(|p| {
            Breakpoint::new(
                p.time_q.clamp(Tq::ZERO, length_q),
                p.value.clamp(0.0, 127.0),
            )
        })
        .collect();
    points.sort_by_key(|p| p.time_q);
    points
}

/// Binary pedal emission. Breakpoints binarize at the threshold and merge
/// into constant segments. Every pedal-down is pushed late by the re-arm
/// delay so samplers register the preceding lift, unless the delay would
/// reach the next segment, in which case it fires on time.
fn sustain_events(points: &[Breakpoint], controller: u8, channel: u8, rearm: Tq) -> Vec<CcEvent> {
    let mut segments: Vec<(Tq, u8)> = Vec::new();
    for p in points {
        let value = if p.value >= SUSTAIN_ON_THRESHOLD { 127 } else { 0 };
        match segments.last() {
            Some(&(_, last)) if last == value => {}
            _ => segments.push((p.time_q, value)),
        }
    }

    let mut events = Vec::new();
    for (i, &(time_q, value)) in segments.iter().enumerate() {
        let at = if value == 127 {
            let delayed = time_q + rearm;
            match segments.get(i + 1) {
                Some(&(next_t, _)) if delayed >= next_t => time_q,
                _ => delayed,
            }
        } else {
            time_q
        };
        push_on_change(&mut events, at, controller, value, channel);
    }
    events
}

/// Held emission: the first value is asserted at the selection start, then
/// one event per breakpoint, with consecutive duplicates suppressed.
fn hold_events(points: &[Breakpoint], controller: u8, channel: u8) -> Vec<CcEvent> {
    let mut events = Vec::new();
    let first = points[0].value.round() as u8;
    push_on_change(&mut events, Tq::ZERO, controller, first, channel);
    for p in points {
        push_on_change(&mut events, p.time_q, controller, p.value.round() as u8, channel);
    }
    events
}

/// Sampled emission over `[0, length_q]` inclusive at the smoothing step.
fn sampled_events(
    points: &[Breakpoint],
    interp: Interp,
    mode: EmitMode,
    step: Tq,
    length_q: Tq,
    controller: u8,
    channel: u8,
) -> Vec<CcEvent> {
    let mut events = Vec::new();
    let step_ticks = step.ticks().max(1) as usize;
    let end = length_q.ticks().max(0);

    let mut times: Vec<i64> = (0..=end).step_by(step_ticks).collect();
    if times.last() != Some(&end) {
        times.push(end);
    }
    for t in times {
        let time_q = Tq::from_ticks(t);
        let value = evaluate(points, interp, time_q).round().clamp(0.0, 127.0) as u8;
        match mode {
            EmitMode::Dense => events.push(CcEvent {
                time_q,
                controller,
                value,
                channel,
            }),
            EmitMode::SparseOnChange => {
                push_on_change(&mut events, time_q, controller, value, channel)
            }
        }
    }
    events
}

fn push_on_change(events: &mut Vec<CcEvent>, time_q: Tq, controller: u8, value: u8, channel: u8) {
    if events.last().map_or(false, |e| e.value == value) {
        return;
    }
    events.push(CcEvent {
        time_q,
        controller,
        value,
        channel,
    });
}

/// Parse a `min_step` spec into a sampling step. A fraction like "1/64" is
/// of a whole note (so 1/64 is 0.0625 q); a bare number reads as quarter
/// notes. The result never drops below [`MIN_STEP`].
fn step_from_spec(spec: &str) -> Tq {
    parse_step_quarters(spec)
        .map(Tq::from_f64)
        .unwrap_or(MIN_STEP)
        .max(MIN_STEP)
}

fn parse_step_quarters(spec: &str) -> Option<f64> {
    let spec = spec.trim();
    if let Some((num, denom)) = spec.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let denom: f64 = denom.trim().parse().ok()?;
        if !num.is_finite() || !denom.is_finite() || num <= 0.0 || denom <= 0.0 {
            return None;
        }
        return Some(num / denom * 4.0);
    }
    spec.parse::<f64>()
        .ok()
        .filter(|q| q.is_finite() && *q > 0.0)
}

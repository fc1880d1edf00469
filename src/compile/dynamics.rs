//! Dynamics and expression synthesis for sparse candidate curves.

use std::collections::BTreeMap;

use crate::candidate::ParsedCurve;
use crate::curve::{NamedCurve, SUSTAIN_CURVE};
use crate::event::{Breakpoint, NoteEvent, Selection, Tq, TICKS_PER_QUARTER};
use crate::profile::InstrumentProfile;

const DYNAMICS_CURVE: &str = "dynamics";
const EXPRESSION_CURVE: &str = "expression";

/// Largest value change allowed between near-adjacent breakpoints.
const MAX_JUMP: f64 = 20.0;
const SMOOTH_WINDOW: Tq = Tq::from_ticks(TICKS_PER_QUARTER / 4);

const EXPRESSION_LOW: f64 = 64.0;
const EXPRESSION_HIGH: f64 = 96.0;

/// Swell shape as (position within the note, share of the note velocity).
/// The decay entry only applies to notes long enough for four points.
const SWELL: [(f64, f64); 4] = [(0.0, 0.65), (0.35, 1.0), (0.75, 0.8), (0.9, 0.55)];
const DECAY_INDEX: usize = 2;

/// Turn the candidate's curves into named curves, filling the gaps the
/// model left: sustained notes without dynamics coverage get a swell, a
/// missing expression curve gets a gentle arc, and abrupt steps get a
/// midpoint so no controller jumps by more than [`MAX_JUMP`] at once.
pub fn synthesize(
    curves: &BTreeMap<String, ParsedCurve>,
    notes: &[NoteEvent],
    profile: &InstrumentProfile,
    selection: Selection,
) -> Vec<NamedCurve> {
    let default_interp = profile.controllers.smoothing.interp;
    let dedupe_ticks = Tq::from_f64(profile.tuning.dedupe_window_q).ticks();

    let mut dynamics: Vec<Breakpoint> = curves
        .get(DYNAMICS_CURVE)
        .map(|c| c.points.clone())
        .unwrap_or_default();
    dynamics.sort_by_key(|p| p.time_q);

    for note in notes {
        if note.dur_q < Tq::from_quarters(1) {
            continue;
        }
        let needed = if note.dur_q >= Tq::from_quarters(2) { 4 } else { 3 };
        let end = note.end_q();
        let covered = dynamics
            .iter()
            .filter(|p| p.time_q >= note.start_q && p.time_q <= end)
            .count();
        if covered >= needed {
            continue;
        }
        for (i, &(pos, share)) in SWELL.iter().enumerate() {
            if needed == 3 && i == DECAY_INDEX {
                continue;
            }
            let time = note.start_q + note.dur_q.scale(pos);
            let occupied = dynamics
                .iter()
                .any(|p| (p.time_q.ticks() - time.ticks()).abs() <= dedupe_ticks);
            if !occupied {
                let value = (f64::from(note.velocity) * share).clamp(0.0, 127.0);
                dynamics.push(Breakpoint::new(time, value));
            }
        }
        dynamics.sort_by_key(|p| p.time_q);
    }

    let mut out = Vec::new();
    let mut have_dynamics = false;
    let mut have_expression = false;
    for (name, curve) in curves {
        let interp = curve.interp.unwrap_or(default_interp);
        let points = if name == DYNAMICS_CURVE {
            have_dynamics = true;
            dynamics.clone()
        } else if name == EXPRESSION_CURVE {
            have_expression = true;
            if curve.points.is_empty() {
                expression_fallback(selection)
            } else {
                curve.points.clone()
            }
        } else {
            curve.points.clone()
        };
        out.push(NamedCurve::new(name.clone(), interp, points));
    }
    if !have_dynamics && !dynamics.is_empty() {
        out.push(NamedCurve::new(DYNAMICS_CURVE, default_interp, dynamics));
    }
    if !have_expression {
        out.push(NamedCurve::new(
            EXPRESSION_CURVE,
            default_interp,
            expression_fallback(selection),
        ));
    }

    for curve in &mut out {
        // sustain is binary; a midpoint would undo that
        if curve.name != SUSTAIN_CURVE {
            smooth(&mut curve.points);
        }
    }
    out
}

fn expression_fallback(selection: Selection) -> Vec<Breakpoint> {
    let mid = Tq::from_ticks(selection.length_q.ticks() / 2);
    vec![
        Breakpoint::new(Tq::ZERO, EXPRESSION_LOW),
        Breakpoint::new(mid, EXPRESSION_HIGH),
        Breakpoint::new(selection.length_q, EXPRESSION_LOW),
    ]
}

/// One walk over the sorted list, inserting a midpoint between each pair of
/// near-adjacent points whose values differ by more than the allowed jump.
fn smooth(points: &mut Vec<Breakpoint>) {
    let mut i = 0;
    while i + 1 < points.len() {
        let (a, b) = (points[i], points[i + 1]);
        if b.time_q - a.time_q <= SMOOTH_WINDOW && (b.value - a.value).abs() > MAX_JUMP {
            let mid_t = Tq::from_ticks((a.time_q.ticks() + b.time_q.ticks()) / 2);
            points.insert(i + 1, Breakpoint::new(mid_t, (a.value + b.value) / 2.0));
            i += 2;
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Interp;
    use assert_approx_eq::assert_approx_eq;

    fn note(start: f64, dur: f64, velocity: u8) -> NoteEvent {
        NoteEvent::new(Tq::from_f64(start), Tq::from_f64(dur), 60, velocity, 1)
    }

    fn curve_map(entries: &[(&str, &[(f64, f64)])]) -> BTreeMap<String, ParsedCurve> {
        entries
            .iter()
            .map(|(name, points)| {
                let points = points
                    .iter()
                    .map(|&(t, v)| Breakpoint::new(Tq::from_f64(t), v))
                    .collect();
                (
                    name.to_string(),
                    ParsedCurve {
                        interp: None,
                        points,
                    },
                )
            })
            .collect()
    }

    fn selection() -> Selection {
        Selection::new(Tq::from_quarters(8), (4, 4))
    }

    fn find<'a>(curves: &'a [NamedCurve], name: &str) -> &'a NamedCurve {
        curves
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("no {name} curve"))
    }

    #[test]
    fn long_note_gets_a_four_point_swell() {
        let out = synthesize(
            &BTreeMap::new(),
            &[note(0.0, 2.0, 100)],
            &InstrumentProfile::default(),
            selection(),
        );
        let dynamics = find(&out, "dynamics");
        assert_eq!(dynamics.points.len(), 4);
        let expected = [(0.0, 65.0), (0.7, 100.0), (1.5, 80.0), (1.8, 55.0)];
        for (point, (t, v)) in dynamics.points.iter().zip(expected) {
            assert_eq!(point.time_q, Tq::from_f64(t));
            assert_approx_eq!(point.value, v);
        }
    }

    #[test]
    fn medium_note_gets_three_points() {
        let out = synthesize(
            &BTreeMap::new(),
            &[note(0.0, 1.5, 100)],
            &InstrumentProfile::default(),
            selection(),
        );
        let dynamics = find(&out, "dynamics");
        assert_eq!(dynamics.points.len(), 3);
        assert_approx_eq!(dynamics.points[0].value, 65.0);
        assert_approx_eq!(dynamics.points[1].value, 100.0);
        assert_eq!(dynamics.points[1].time_q, Tq::from_f64(0.525));
        assert_approx_eq!(dynamics.points[2].value, 55.0);
    }

    #[test]
    fn short_notes_are_left_alone() {
        let out = synthesize(
            &BTreeMap::new(),
            &[note(0.0, 0.5, 100)],
            &InstrumentProfile::default(),
            selection(),
        );
        assert!(out.iter().all(|c| c.name != "dynamics"));
    }

    #[test]
    fn existing_coverage_is_respected() {
        let curves = curve_map(&[("dynamics", &[(0.0, 50.0), (0.5, 60.0), (1.0, 70.0)])]);
        let out = synthesize(
            &curves,
            &[note(0.0, 1.0, 100)],
            &InstrumentProfile::default(),
            selection(),
        );
        assert_eq!(find(&out, "dynamics").points.len(), 3);
    }

    #[test]
    fn synthesized_points_avoid_existing_ones() {
        let curves = curve_map(&[("dynamics", &[(0.0, 50.0)])]);
        let out = synthesize(
            &curves,
            &[note(0.0, 1.0, 100)],
            &InstrumentProfile::default(),
            selection(),
        );
        let dynamics = find(&out, "dynamics");
        // t=0 is taken; only the peak and release slots are filled
        assert_eq!(dynamics.points.len(), 3);
        assert_approx_eq!(dynamics.points[0].value, 50.0);
        assert_eq!(dynamics.points[1].time_q, Tq::from_f64(0.35));
    }

    #[test]
    fn missing_expression_gets_the_fallback_arc() {
        let out = synthesize(
            &BTreeMap::new(),
            &[],
            &InstrumentProfile::default(),
            selection(),
        );
        let expression = find(&out, "expression");
        assert_eq!(expression.points.len(), 3);
        assert_approx_eq!(expression.points[0].value, 64.0);
        assert_eq!(expression.points[1].time_q, Tq::from_quarters(4));
        assert_approx_eq!(expression.points[1].value, 96.0);
        assert_approx_eq!(expression.points[2].value, 64.0);
    }

    #[test]
    fn empty_expression_entry_gets_the_fallback() {
        let curves = curve_map(&[("expression", &[])]);
        let out = synthesize(&curves, &[], &InstrumentProfile::default(), selection());
        assert_eq!(out.len(), 1);
        assert_eq!(find(&out, "expression").points.len(), 3);
    }

    #[test]
    fn authored_expression_is_kept() {
        let curves = curve_map(&[("expression", &[(0.0, 70.0)])]);
        let out = synthesize(&curves, &[], &InstrumentProfile::default(), selection());
        let expression = find(&out, "expression");
        assert_eq!(expression.points.len(), 1);
        assert_approx_eq!(expression.points[0].value, 70.0);
    }

    #[test]
    fn abrupt_steps_get_a_midpoint() {
        let curves = curve_map(&[("dynamics", &[(0.0, 0.0), (0.2, 60.0)])]);
        let out = synthesize(&curves, &[], &InstrumentProfile::default(), selection());
        let dynamics = find(&out, "dynamics");
        assert_eq!(dynamics.points.len(), 3);
        assert_eq!(dynamics.points[1].time_q, Tq::from_f64(0.1));
        assert_approx_eq!(dynamics.points[1].value, 30.0);
    }

    #[test]
    fn gentle_or_distant_steps_are_not_smoothed() {
        let gentle = curve_map(&[("dynamics", &[(0.0, 0.0), (0.2, 15.0)])]);
        let out = synthesize(&gentle, &[], &InstrumentProfile::default(), selection());
        assert_eq!(find(&out, "dynamics").points.len(), 2);

        let distant = curve_map(&[("dynamics", &[(0.0, 0.0), (1.0, 60.0)])]);
        let out = synthesize(&distant, &[], &InstrumentProfile::default(), selection());
        assert_eq!(find(&out, "dynamics").points.len(), 2);
    }

    #[test]
    fn sustain_is_never_smoothed() {
        let curves = curve_map(&[("sustain_pedal", &[(0.0, 0.0), (0.2, 127.0)])]);
        let out = synthesize(&curves, &[], &InstrumentProfile::default(), selection());
        assert_eq!(find(&out, "sustain_pedal").points.len(), 2);
    }

    #[test]
    fn curve_interp_falls_back_to_the_profile() {
        let mut curves = curve_map(&[("dynamics", &[(0.0, 50.0)])]);
        if let Some(c) = curves.get_mut("dynamics") {
            c.interp = Some(Interp::Hold);
        }
        let mut profile = InstrumentProfile::default();
        profile.controllers.smoothing.interp = Interp::Cubic;
        let out = synthesize(&curves, &[], &profile, selection());
        assert_eq!(find(&out, "dynamics").interp, Interp::Hold);
        // expression carries no interp of its own
        assert_eq!(find(&out, "expression").interp, Interp::Cubic);
    }
}

//! Tempo marker validation and thinning.

use log::debug;

use crate::candidate::RawTempoMarker;
use crate::event::{Selection, TempoMarker, Tq, TICKS_PER_QUARTER};

const BPM_MIN: f64 = 20.0;
const BPM_MAX: f64 = 300.0;
const MAX_TEMPO_MARKERS: usize = 32;
const MIN_MARKER_GAP: Tq = Tq::from_ticks(TICKS_PER_QUARTER / 4);
const MAX_SIG_NUMERATOR: i64 = 32;
const ALLOWED_DENOMS: [i64; 6] = [1, 2, 4, 8, 16, 32];

/// Clamp, thin, and cap the candidate's tempo markers.
///
/// Markers keep their relative order; ones that land closer than
/// [`MIN_MARKER_GAP`] to the previously kept marker are dropped, as is
/// anything past the [`MAX_TEMPO_MARKERS`] cap.
pub fn validate(markers: &[RawTempoMarker], selection: Selection) -> Vec<TempoMarker> {
    let mut sane: Vec<TempoMarker> = markers.iter().filter_map(|m| sanitize(m, selection)).collect();
    sane.sort_by_key(|m| m.time_q);

    let mut kept: Vec<TempoMarker> = Vec::new();
    for marker in sane {
        if let Some(last) = kept.last() {
            if marker.time_q - last.time_q < MIN_MARKER_GAP {
                debug!("tempo marker at {} too close to the previous one, dropped", marker.time_q);
                continue;
            }
        }
        if kept.len() >= MAX_TEMPO_MARKERS {
            debug!("tempo marker cap reached, dropping the rest");
            break;
        }
        kept.push(marker);
    }
    kept
}

fn sanitize(marker: &RawTempoMarker, selection: Selection) -> Option<TempoMarker> {
    let bpm = marker
        .bpm
        .filter(|b| b.is_finite())
        .map(|b| b.clamp(BPM_MIN, BPM_MAX));
    let signature = marker.signature.and_then(valid_signature);
    if bpm.is_none() && signature.is_none() {
        debug!("tempo marker at {} carries nothing usable, dropped", marker.time_q);
        return None;
    }
    Some(TempoMarker {
        time_q: marker.time_q.clamp(Tq::ZERO, selection.length_q),
        bpm,
        signature,
        linear: marker.linear,
    })
}

fn valid_signature((num, denom): (i64, i64)) -> Option<(u8, u8)> {
    if (1..=MAX_SIG_NUMERATOR).contains(&num) && ALLOWED_DENOMS.contains(&denom) {
        Some((num as u8, denom as u8))
    } else {
        debug!("time signature {num}/{denom} out of range, dropped");
        None
    }
}

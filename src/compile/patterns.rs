//! Pattern and repeat expansion into concrete notes.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::candidate::{ParsedNote, ParsedPattern, ParsedRepeat};
use crate::event::{Selection, Tq};

/// Hard cap on repetitions of a single repeat instruction.
const MAX_REPETITIONS: i64 = 128;

/// Hard cap on notes produced by expansion in one compile.
const MAX_EXPANDED_NOTES: usize = 4096;

/// Expand every repeat instruction against the pattern table, producing
/// absolute-time notes ready to join the candidate's own note list.
///
/// Unknown pattern ids and non-positive counts are skipped. A repeat with no
/// usable step advances by the pattern's length.
pub fn expand(
    patterns: &BTreeMap<String, ParsedPattern>,
    repeats: &[ParsedRepeat],
    selection: Selection,
) -> Vec<ParsedNote> {
    let mut out = Vec::new();
    'repeats: for repeat in repeats {
        let Some(pattern) = patterns.get(&repeat.pattern) else {
            debug!("repeat references unknown pattern {:?}, skipped", repeat.pattern);
            continue;
        };
        if repeat.count <= 0 {
            debug!("repeat of {:?} has non-positive count, skipped", repeat.pattern);
            continue;
        }
        let length = pattern_length(pattern, selection);
        let step = repeat
            .step_q
            .filter(|s| s.is_positive())
            .unwrap_or(length);
        let count = repeat.count.min(MAX_REPETITIONS);

        for rep in 0..count {
            let offset = repeat.start_q + Tq::from_ticks(step.ticks() * rep);
            for note in &pattern.notes {
                if out.len() >= MAX_EXPANDED_NOTES {
                    warn!("pattern expansion hit the {MAX_EXPANDED_NOTES}-note cap");
                    break 'repeats;
                }
                let mut note = note.clone();
                note.start_q = note.start_q + offset;
                out.push(note);
            }
        }
    }
    out
}

/// A pattern's length: explicit when given, else the furthest note end,
/// else one bar.
fn pattern_length(pattern: &ParsedPattern, selection: Selection) -> Tq {
    if let Some(length) = pattern.length_q.filter(|l| l.is_positive()) {
        return length;
    }
    pattern
        .notes
        .iter()
        .map(|n| n.start_q + n.dur_q)
        .max()
        .filter(|l| l.is_positive())
        .unwrap_or_else(|| selection.bar_len())
}

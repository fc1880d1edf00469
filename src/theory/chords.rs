//! Chord detection: names a set of sounding pitches from a fixed interval table.

use super::pitch::pitch_class_name;

/// Interval sets (semitones above the root, sorted) and their chord suffixes.
///
/// Exact matching compares the full distinct interval set against each entry;
/// fuzzy matching scores partial overlap. Entries are data so the naming
/// behavior can be inspected and tested without touching the matcher.
const CHORD_TABLE: &[(&[u8], &str)] = &[
    // dyads and triads
    (&[0, 7], "5"),
    (&[0, 4], "(no5)"),
    (&[0, 3], "m(no5)"),
    (&[0, 4, 7], ""),
    (&[0, 3, 7], "m"),
    (&[0, 3, 6], "dim"),
    (&[0, 4, 8], "aug"),
    (&[0, 2, 7], "sus2"),
    (&[0, 5, 7], "sus4"),
    (&[0, 2, 5, 7], "sus2sus4"),
    (&[0, 4, 6], "b5"),
    (&[0, 3, 8], "m#5"),
    (&[0, 3, 7, 8], "m(b6)"),
    // sixths
    (&[0, 4, 7, 9], "6"),
    (&[0, 3, 7, 9], "m6"),
    (&[0, 2, 4, 7, 9], "6/9"),
    (&[0, 2, 3, 7, 9], "m6/9"),
    (&[0, 5, 7, 9], "6sus4"),
    (&[0, 2, 7, 9], "6sus2"),
    (&[0, 4, 6, 9], "6b5"),
    // sevenths
    (&[0, 4, 7, 10], "7"),
    (&[0, 4, 7, 11], "maj7"),
    (&[0, 3, 7, 10], "m7"),
    (&[0, 3, 7, 11], "m(maj7)"),
    (&[0, 3, 6, 10], "m7b5"),
    (&[0, 3, 6, 9], "dim7"),
    (&[0, 3, 6, 11], "dim(maj7)"),
    (&[0, 5, 7, 10], "7sus4"),
    (&[0, 2, 7, 10], "7sus2"),
    (&[0, 5, 7, 11], "maj7sus4"),
    (&[0, 2, 7, 11], "maj7sus2"),
    (&[0, 4, 10], "7(no5)"),
    (&[0, 4, 11], "maj7(no5)"),
    (&[0, 3, 10], "m7(no5)"),
    (&[0, 7, 10], "7(no3)"),
    (&[0, 7, 11], "maj7(no3)"),
    (&[0, 5, 10], "7sus4(no5)"),
    // ninths
    (&[0, 2, 4, 7, 10], "9"),
    (&[0, 2, 4, 7, 11], "maj9"),
    (&[0, 2, 3, 7, 10], "m9"),
    (&[0, 2, 3, 7, 11], "m(maj9)"),
    (&[0, 2, 4, 7], "add9"),
    (&[0, 2, 3, 7], "m(add9)"),
    (&[0, 2, 4, 10], "9(no5)"),
    (&[0, 2, 4, 11], "maj9(no5)"),
    (&[0, 2, 3, 10], "m9(no5)"),
    (&[0, 2, 5, 7, 10], "9sus4"),
    (&[0, 2, 3, 6, 10], "m9b5"),
    (&[0, 1, 4, 7], "addb9"),
    (&[0, 2, 4, 8], "aug(add9)"),
    (&[0, 2, 3, 6], "dim(add9)"),
    // elevenths
    (&[0, 2, 4, 5, 7, 10], "11"),
    (&[0, 2, 3, 5, 7, 10], "m11"),
    (&[0, 2, 4, 5, 7, 11], "maj11"),
    (&[0, 4, 5, 7], "add11"),
    (&[0, 3, 5, 7], "m(add11)"),
    (&[0, 3, 5, 7, 10], "m7add11"),
    (&[0, 2, 3, 5, 6, 10], "m11b5"),
    // thirteenths
    (&[0, 2, 4, 7, 9, 10], "13"),
    (&[0, 2, 3, 5, 7, 9, 10], "m13"),
    (&[0, 2, 4, 7, 9, 11], "maj13"),
    (&[0, 2, 5, 7, 9, 10], "13sus4"),
    (&[0, 2, 3, 7, 9, 10], "m13(no11)"),
    (&[0, 4, 7, 9, 10], "7add13"),
    (&[0, 4, 7, 9, 11], "maj7add13"),
    (&[0, 2, 4, 6, 7, 9, 10], "13#11"),
    (&[0, 2, 4, 6, 7, 9, 11], "maj13#11"),
    // altered dominants and altered major sevenths
    (&[0, 1, 4, 7, 10], "7b9"),
    (&[0, 3, 4, 7, 10], "7#9"),
    (&[0, 4, 6, 10], "7b5"),
    (&[0, 4, 8, 10], "7#5"),
    (&[0, 4, 6, 7, 10], "7#11"),
    (&[0, 2, 4, 6, 7, 10], "9#11"),
    (&[0, 4, 7, 8, 10], "7b13"),
    (&[0, 1, 4, 7, 9, 10], "13b9"),
    (&[0, 3, 4, 8, 10], "7#5#9"),
    (&[0, 1, 4, 8, 10], "7#5b9"),
    (&[0, 2, 4, 8, 10], "9#5"),
    (&[0, 2, 4, 6, 10], "9b5"),
    (&[0, 1, 4, 6, 10], "7b5b9"),
    (&[0, 3, 4, 6, 10], "7b5#9"),
    (&[0, 1, 5, 7, 10], "7b9sus4"),
    (&[0, 4, 6, 11], "maj7b5"),
    (&[0, 4, 8, 11], "maj7#5"),
    (&[0, 4, 6, 7, 11], "maj7#11"),
    (&[0, 2, 4, 6, 7, 11], "maj9#11"),
    (&[0, 1, 3, 7, 10], "m7b9"),
    (&[0, 1, 4, 5, 7, 10], "11b9"),
];

/// Weights for fuzzy chord scoring. `missing` and `extra` are penalties and
/// carry their sign.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub common: i32,
    pub missing: i32,
    pub extra: i32,
    pub root_bonus: i32,
    pub third_bonus: i32,
    pub fifth_bonus: i32,
}

pub const SCORE_WEIGHTS: ScoreWeights = ScoreWeights {
    common: 10,
    missing: -5,
    extra: -2,
    root_bonus: 3,
    third_bonus: 2,
    fifth_bonus: 1,
};

/// A fuzzy candidate is rejected outright past these set differences.
const MAX_MISSING: usize = 2;
const MAX_EXTRA: usize = 2;

/// Detect a chord name and root pitch class from sounding pitches.
///
/// Works on the distinct pitch-class set, so input order and octave
/// doublings never change the result. The lowest sounding pitch decides the
/// bass; a root other than the bass is written slash-style (`C7/E`).
pub fn detect_chord(pitches: &[u8]) -> (String, u8) {
    let Some(&lowest) = pitches.iter().min() else {
        return ("N.C.".to_string(), 0);
    };
    let bass = lowest % 12;
    let mut classes: Vec<u8> = pitches.iter().map(|p| p % 12).collect();
    classes.sort_unstable();
    classes.dedup();

    if classes.len() == 1 {
        return (pitch_class_name(bass).to_string(), bass);
    }

    let roots = candidate_roots(&classes, bass);

    for &root in &roots {
        let intervals = intervals_from(&classes, root);
        for &(set, suffix) in CHORD_TABLE {
            if intervals.as_slice() == set {
                return (slash_name(root, suffix, bass), root);
            }
        }
    }

    if let Some((root, suffix, extras)) = best_fuzzy_match(&classes, &roots) {
        let mut name = format!("{}{}", pitch_class_name(root), suffix);
        let tensions: Vec<&str> = extras.iter().filter_map(|&i| tension_name(i)).collect();
        if !tensions.is_empty() {
            name.push_str(&format!("add({})", tensions.join(",")));
        }
        if root != bass {
            name.push('/');
            name.push_str(pitch_class_name(bass));
        }
        return (name, root);
    }

    let intervals = intervals_from(&classes, bass);
    if let Some(suffix) = assemble_suffix(&intervals) {
        return (format!("{}{}", pitch_class_name(bass), suffix), bass);
    }

    (format!("{}(?)", pitch_class_name(bass)), bass)
}

/// Bass pitch class first, then the remaining classes ascending. Inversions
/// resolve to the root-position name this way before any other spelling.
fn candidate_roots(classes: &[u8], bass: u8) -> Vec<u8> {
    let mut roots = vec![bass];
    roots.extend(classes.iter().copied().filter(|&c| c != bass));
    roots
}

fn intervals_from(classes: &[u8], root: u8) -> Vec<u8> {
    let mut intervals: Vec<u8> = classes.iter().map(|&c| (c + 12 - root) % 12).collect();
    intervals.sort_unstable();
    intervals
}

fn slash_name(root: u8, suffix: &str, bass: u8) -> String {
    if root == bass {
        format!("{}{}", pitch_class_name(root), suffix)
    } else {
        format!(
            "{}{}/{}",
            pitch_class_name(root),
            suffix,
            pitch_class_name(bass)
        )
    }
}

/// Best-scoring (root, table entry) pair within the missing/extra tolerance.
/// Ties keep the earlier root and the earlier table entry.
fn best_fuzzy_match(classes: &[u8], roots: &[u8]) -> Option<(u8, &'static str, Vec<u8>)> {
    let w = &SCORE_WEIGHTS;
    let mut best: Option<(i32, u8, &'static str, Vec<u8>)> = None;
    for &root in roots {
        let observed = intervals_from(classes, root);
        for &(set, suffix) in CHORD_TABLE {
            let common = set.iter().filter(|i| observed.contains(i)).count();
            let missing = set.iter().filter(|i| !observed.contains(i)).count();
            let extras: Vec<u8> = observed
                .iter()
                .copied()
                .filter(|i| !set.contains(i))
                .collect();
            if missing > MAX_MISSING || extras.len() > MAX_EXTRA {
                continue;
            }
            let mut score = w.common * common as i32
                + w.missing * missing as i32
                + w.extra * extras.len() as i32;
            if observed.contains(&0) {
                score += w.root_bonus;
            }
            if observed.contains(&3) || observed.contains(&4) {
                score += w.third_bonus;
            }
            if observed.contains(&7) {
                score += w.fifth_bonus;
            }
            if best.as_ref().map_or(true, |(b, ..)| score > *b) {
                best = Some((score, root, suffix, extras));
            }
        }
    }
    best.map(|(_, root, suffix, extras)| (root, suffix, extras))
}

fn tension_name(interval: u8) -> Option<&'static str> {
    match interval {
        1 => Some("b9"),
        2 => Some("9"),
        3 => Some("#9"),
        5 => Some("11"),
        6 => Some("#11"),
        8 => Some("b13"),
        9 => Some("13"),
        10 => Some("7"),
        11 => Some("maj7"),
        _ => None,
    }
}

/// Last-resort naming: describe whatever third/fifth/seventh structure is
/// audible. Returns None when the set has no structure worth naming.
fn assemble_suffix(intervals: &[u8]) -> Option<String> {
    let has = |i: u8| intervals.contains(&i);
    let minor_third = has(3) && !has(4);
    let major_third = has(4);
    let mut suffix = String::new();

    if minor_third {
        suffix.push('m');
    } else if !major_third {
        if has(5) {
            suffix.push_str("sus4");
        } else if has(2) {
            suffix.push_str("sus2");
        }
    }

    if has(11) {
        suffix.push_str("maj7");
    } else if has(10) {
        suffix.push('7');
    } else if has(9) {
        suffix.push('6');
    }

    if has(6) && !has(7) {
        suffix.push_str("b5");
    } else if has(8) && !has(7) {
        suffix.push_str("#5");
    }

    if has(2) && (minor_third || major_third) && !has(10) && !has(11) {
        suffix.push_str("add9");
    }

    if suffix.is_empty() {
        None
    } else {
        Some(suffix)
    }
}

//! Key detection from a sequence of chord roots.

use super::pitch::pitch_class_name;

/// Diatonic chord roots of a major key, as offsets from the tonic.
const MAJOR_DEGREES: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Diatonic chord roots of a natural minor key.
const MINOR_DEGREES: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Estimate a key label from observed chord roots.
///
/// The first tonic (0–11) whose diatonic major root set covers every
/// observed root wins, with major checked before minor at each tonic. When
/// no scale covers the roots, the most frequent root is reported as an
/// estimate (ties keep the first encountered).
pub fn detect_key(chord_roots: &[u8]) -> String {
    if chord_roots.is_empty() {
        return "unknown".to_string();
    }
    let roots: Vec<u8> = chord_roots.iter().map(|r| r % 12).collect();

    for tonic in 0..12u8 {
        if covers(&roots, tonic, &MAJOR_DEGREES) {
            return format!("{} major", pitch_class_name(tonic));
        }
        if covers(&roots, tonic, &MINOR_DEGREES) {
            return format!("{} minor", pitch_class_name(tonic));
        }
    }

    let mut counts = [0usize; 12];
    for &r in &roots {
        counts[r as usize] += 1;
    }
    let mut best = roots[0];
    for &r in &roots {
        if counts[r as usize] > counts[best as usize] {
            best = r;
        }
    }
    format!("{} (estimated)", pitch_class_name(best))
}

fn covers(roots: &[u8], tonic: u8, degrees: &[u8; 7]) -> bool {
    roots
        .iter()
        .all(|&r| degrees.iter().any(|&d| (tonic + d) % 12 == r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_unknown() {
        assert_eq!(detect_key(&[]), "unknown");
    }

    #[test]
    fn diatonic_progression_in_c() {
        // C F G Am roots
        assert_eq!(detect_key(&[0, 5, 7, 9]), "C major");
    }

    #[test]
    fn single_root_reads_as_major() {
        assert_eq!(detect_key(&[0]), "C major");
    }

    #[test]
    fn minor_wins_when_major_cannot_cover() {
        // C and Eb roots fit no major scale before C minor is tried
        assert_eq!(detect_key(&[0, 3]), "C minor");
    }

    #[test]
    fn first_matching_tonic_wins() {
        // Am-Dm-Em roots are also diatonic to C major, which is tried first
        assert_eq!(detect_key(&[9, 2, 4]), "C major");
    }

    #[test]
    fn chromatic_roots_fall_back_to_estimate() {
        // three consecutive semitones fit no diatonic set
        assert_eq!(detect_key(&[1, 0, 2, 0]), "C (estimated)");
    }

    #[test]
    fn estimate_tie_keeps_first_encountered() {
        assert_eq!(detect_key(&[2, 1, 0]), "D (estimated)");
    }

    #[test]
    fn roots_above_eleven_wrap() {
        assert_eq!(detect_key(&[12, 17, 19]), "C major");
    }
}

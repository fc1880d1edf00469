//! Note name parsing: converts "C2", "Eb4", "F#3" to MIDI note numbers.

/// Pitch-class spellings used for chord and key labels (sharp convention).
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Parse a note name string into a MIDI note number.
///
/// Format: `<letter><optional accidental><octave>`
/// - Letter: C, D, E, F, G, A, B (case-insensitive)
/// - Accidental: # (sharp) or b (flat)
/// - Octave: -1 to 9 (C4 = middle C = MIDI 60)
pub fn parse_note_name(name: &str) -> Option<u8> {
    let chars: Vec<char> = name.trim().chars().collect();
    if chars.is_empty() {
        return None;
    }

    let base = match chars[0].to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut i = 1;
    let accidental: i32 = if i < chars.len() && chars[i] == '#' {
        i += 1;
        1
    } else if i < chars.len() && chars[i] == 'b' {
        i += 1;
        -1
    } else {
        0
    };

    // Rest should be octave number (possibly negative)
    let octave_str: String = chars[i..].iter().collect();
    let octave: i32 = octave_str.parse().ok()?;

    // MIDI note = (octave + 1) * 12 + base + accidental
    // C-1 = 0, C4 = 60, A4 = 69
    let midi = (octave + 1) * 12 + base + accidental;

    if !(0..=127).contains(&midi) {
        None
    } else {
        Some(midi as u8)
    }
}

/// Name of a pitch class (0–11). Values ≥ 12 wrap.
pub fn pitch_class_name(pc: u8) -> &'static str {
    PITCH_CLASS_NAMES[(pc % 12) as usize]
}

/// Render a MIDI note number as a name, e.g. 60 → "C4".
pub fn note_name(midi: u8) -> String {
    let octave = (midi / 12) as i32 - 1;
    format!("{}{}", pitch_class_name(midi % 12), octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_c() {
        assert_eq!(parse_note_name("C4"), Some(60));
    }

    #[test]
    fn a4_concert() {
        assert_eq!(parse_note_name("A4"), Some(69));
    }

    #[test]
    fn c_minus_1() {
        assert_eq!(parse_note_name("C-1"), Some(0));
    }

    #[test]
    fn eb2() {
        assert_eq!(parse_note_name("Eb2"), Some(39));
    }

    #[test]
    fn f_sharp_3() {
        assert_eq!(parse_note_name("F#3"), Some(54));
    }

    #[test]
    fn g9_max() {
        assert_eq!(parse_note_name("G9"), Some(127));
    }

    #[test]
    fn lowercase_letter_accepted() {
        assert_eq!(parse_note_name("c4"), Some(60));
        assert_eq!(parse_note_name("eb2"), Some(39));
    }

    #[test]
    fn surrounding_whitespace_accepted() {
        assert_eq!(parse_note_name(" A4 "), Some(69));
    }

    #[test]
    fn invalid_empty() {
        assert_eq!(parse_note_name(""), None);
    }

    #[test]
    fn invalid_letter() {
        assert_eq!(parse_note_name("X4"), None);
    }

    #[test]
    fn invalid_no_octave() {
        assert_eq!(parse_note_name("C"), None);
    }

    #[test]
    fn out_of_range_octave() {
        assert_eq!(parse_note_name("A9"), None);
    }

    #[test]
    fn round_trip_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(69), "A4");
        assert_eq!(parse_note_name(&note_name(54)), Some(54));
    }

    #[test]
    fn pitch_class_wraps() {
        assert_eq!(pitch_class_name(0), "C");
        assert_eq!(pitch_class_name(13), "C#");
    }
}

//! Key-aware pitch spelling tables
//!
//! Heights are pitch classes, 0 = C to 11 = B. Fifths count sharps (positive)
//! or flats (negative) of the key signature.

use super::{Alter, NotatedPitch, Step};

/// Spell pitch class `height` in `octave` under a key signature
///
/// Ambiguous classes follow the signature: sharps as soon as the key holds
/// the matching sharp, flats otherwise. B♯ and C♭ move across the octave
/// boundary.
pub fn spell(height: u8, octave: i32, fifths: i8) -> NotatedPitch {
    use Alter::{Flat, Natural, Sharp};
    let f = fifths;
    let (step, alter, octave) = match height % 12 {
        0 if f >= 7 => (Step::B, Sharp, octave - 1),
        0 => (Step::C, Natural, octave),
        1 if f >= -3 => (Step::C, Sharp, octave),
        1 => (Step::D, Flat, octave),
        2 => (Step::D, Natural, octave),
        3 if f >= 4 => (Step::D, Sharp, octave),
        3 => (Step::E, Flat, octave),
        4 if f <= -7 => (Step::F, Flat, octave),
        4 => (Step::E, Natural, octave),
        5 if f >= 6 => (Step::E, Sharp, octave),
        5 => (Step::F, Natural, octave),
        6 if f >= -4 => (Step::F, Sharp, octave),
        6 => (Step::G, Flat, octave),
        7 => (Step::G, Natural, octave),
        8 if f > 0 => (Step::G, Sharp, octave),
        8 => (Step::A, Flat, octave),
        9 => (Step::A, Natural, octave),
        10 if f >= 5 => (Step::A, Sharp, octave),
        10 => (Step::B, Flat, octave),
        _ if f >= -5 => (Step::B, Natural, octave),
        _ => (Step::C, Flat, octave + 1),
    };
    NotatedPitch { step, alter, octave }
}

/// Whether pitch class `height` belongs to the diatonic scale of `fifths`
pub fn is_height_in_key(height: u8, fifths: i8) -> bool {
    let f = fifths;
    match height % 12 {
        0 => (-5..=1).contains(&f) || f == 7,
        1 => f >= 2 || f <= -4,
        2 => (-3..=3).contains(&f),
        3 => f >= 4 || f <= -2,
        4 => (-1..=5).contains(&f) || f == -7,
        5 => (-6..=0).contains(&f) || f >= 6,
        6 => f >= 1 || f <= -5,
        7 => (-4..=2).contains(&f),
        8 => f >= 3 || f <= -3,
        9 => (-2..=4).contains(&f),
        10 => f >= 5 || f <= -1,
        _ => (0..=6).contains(&f) || f <= -6,
    }
}

/// Pitch class of the major tonic of `fifths`
pub fn major_tonic_height(fifths: i8) -> u8 {
    (7 * fifths as i32).rem_euclid(12) as u8
}

/// Pitch class of the minor tonic of `fifths`
pub fn minor_tonic_height(fifths: i8) -> u8 {
    (major_tonic_height(fifths) + 9) % 12
}

/// Major tonic name of `fifths`
pub fn major_tonic(fifths: i8) -> (Step, Alter) {
    use Alter::{Flat, Natural, Sharp};
    match fifths {
        7 => (Step::C, Sharp),
        6 => (Step::F, Sharp),
        5 => (Step::B, Natural),
        4 => (Step::E, Natural),
        3 => (Step::A, Natural),
        2 => (Step::D, Natural),
        1 => (Step::G, Natural),
        -1 => (Step::F, Natural),
        -2 => (Step::B, Flat),
        -3 => (Step::E, Flat),
        -4 => (Step::A, Flat),
        -5 => (Step::D, Flat),
        -6 => (Step::G, Flat),
        f if f <= -7 => (Step::C, Flat),
        _ => (Step::C, Natural),
    }
}

/// Minor tonic name of `fifths`
pub fn minor_tonic(fifths: i8) -> (Step, Alter) {
    use Alter::{Flat, Natural, Sharp};
    match fifths {
        7 => (Step::A, Sharp),
        6 => (Step::D, Sharp),
        5 => (Step::G, Sharp),
        4 => (Step::C, Sharp),
        3 => (Step::F, Sharp),
        2 => (Step::B, Natural),
        1 => (Step::E, Natural),
        -1 => (Step::D, Natural),
        -2 => (Step::G, Natural),
        -3 => (Step::C, Natural),
        -4 => (Step::F, Natural),
        -5 => (Step::B, Flat),
        -6 => (Step::E, Flat),
        f if f <= -7 => (Step::A, Flat),
        _ => (Step::A, Natural),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semitone(step: Step, alter: Alter) -> i32 {
        let base = match step {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        };
        base + match alter {
            Alter::Flat => -1,
            Alter::Natural => 0,
            Alter::Sharp => 1,
        }
    }

    #[test]
    fn test_spelling_preserves_pitch() {
        for fifths in -7..=7 {
            for height in 0..12u8 {
                let pitch = spell(height, 4, fifths);
                let absolute = pitch.octave * 12 + semitone(pitch.step, pitch.alter);
                assert_eq!(absolute, 48 + height as i32, "Height {} in {} fifths gave {:?}", height, fifths, pitch);
            }
        }
    }

    #[test]
    fn test_boundary_spellings() {
        assert_eq!(spell(0, 4, 7), NotatedPitch { step: Step::B, alter: Alter::Sharp, octave: 3 });
        assert_eq!(spell(11, 4, -6), NotatedPitch { step: Step::C, alter: Alter::Flat, octave: 5 });
        assert_eq!(spell(4, 4, -7).step, Step::F);
        assert_eq!(spell(5, 4, 6), NotatedPitch { step: Step::E, alter: Alter::Sharp, octave: 4 });
        assert_eq!(spell(10, 2, 0).alter, Alter::Flat);
        assert_eq!(spell(6, 2, 0).alter, Alter::Sharp);
    }

    #[test]
    fn test_diatonic_sets_have_seven_classes() {
        for fifths in -7..=7 {
            let count = (0..12u8).filter(|&h| is_height_in_key(h, fifths)).count();
            assert_eq!(count, 7, "Key with {} fifths", fifths);
            assert!(is_height_in_key(major_tonic_height(fifths), fifths));
            assert!(is_height_in_key(minor_tonic_height(fifths), fifths));
        }
    }

    #[test]
    fn test_tonic_tables_agree_with_heights() {
        for fifths in -7..=7 {
            let (step, alter) = major_tonic(fifths);
            assert_eq!(semitone(step, alter).rem_euclid(12) as u8, major_tonic_height(fifths));
            let (step, alter) = minor_tonic(fifths);
            assert_eq!(semitone(step, alter).rem_euclid(12) as u8, minor_tonic_height(fifths));
        }
    }
}

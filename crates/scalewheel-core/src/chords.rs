//! Triads available on each active scale degree

use serde::{Deserialize, Serialize};

use crate::bits::{self, PITCH_CLASSES};
use crate::scale::ScaleState;

/// Triad shapes, root-relative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Triad {
    Augmented,
    Major,
    Minor,
    Diminished,
}

impl Triad {
    pub const ALL: [Triad; 4] = [
        Triad::Augmented,
        Triad::Major,
        Triad::Minor,
        Triad::Diminished,
    ];

    /// Chord tones as a root-relative mask
    pub fn pattern(&self) -> u16 {
        match self {
            Self::Augmented => 0b000100010001,  // 0 4 8
            Self::Major => 0b000010010001,      // 0 4 7
            Self::Minor => 0b000010001001,      // 0 3 7
            Self::Diminished => 0b000001001001, // 0 3 6
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Augmented => "Aug",
            Self::Major => "Major",
            Self::Minor => "Minor",
            Self::Diminished => "Dim",
        }
    }

    /// Roman numeral for this triad built `interval` semitones above the tonic
    pub fn roman_label(&self, interval: u8) -> String {
        const NUMERALS: [&str; 12] = [
            "I", "II", "II", "III", "III", "IV", "V", "V", "VI", "VI", "VII", "VII",
        ];
        let numeral = NUMERALS[(interval % PITCH_CLASSES) as usize];
        match self {
            Self::Augmented => format!("{numeral}⁺"),
            Self::Major => numeral.to_string(),
            Self::Minor => numeral.to_lowercase(),
            Self::Diminished => format!("{}°", numeral.to_lowercase()),
        }
    }
}

/// Triads buildable on one active degree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeChords {
    /// Absolute pitch class of the chord root
    pub pitch_class: u8,
    pub triads: Vec<Triad>,
}

impl DegreeChords {
    /// Roman-numeral labels relative to `root_note`
    pub fn labels(&self, root_note: u8) -> Vec<String> {
        let interval =
            (self.pitch_class + PITCH_CLASSES - root_note % PITCH_CLASSES) % PITCH_CLASSES;
        self.triads.iter().map(|t| t.roman_label(interval)).collect()
    }
}

/// Triads contained in the scale, per active degree in ascending pitch order
pub fn chord_table(state: &ScaleState) -> Vec<DegreeChords> {
    let absolute = state.absolute_mask();

    bits::pitch_set(absolute)
        .into_iter()
        .map(|degree| {
            // Bring the candidate chord root down to bit 0
            let shifted = bits::rotate(absolute, degree as i32);
            let triads = Triad::ALL
                .into_iter()
                .filter(|t| shifted & t.pattern() == t.pattern())
                .collect();
            DegreeChords {
                pitch_class: degree,
                triads,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{HARMONIC_MINOR, IONIAN};

    fn triads_at(table: &[DegreeChords], pitch_class: u8) -> &[Triad] {
        &table
            .iter()
            .find(|d| d.pitch_class == pitch_class)
            .unwrap()
            .triads
    }

    #[test]
    fn test_c_major_triads() {
        let table = chord_table(&ScaleState::default());
        assert_eq!(
            table.iter().map(|d| d.pitch_class).collect::<Vec<_>>(),
            vec![0, 2, 4, 5, 7, 9, 11]
        );
        assert_eq!(triads_at(&table, 0), &[Triad::Major]);
        assert_eq!(triads_at(&table, 2), &[Triad::Minor]);
        assert_eq!(triads_at(&table, 7), &[Triad::Major]);
        assert_eq!(triads_at(&table, 9), &[Triad::Minor]);
        assert_eq!(triads_at(&table, 11), &[Triad::Diminished]);
    }

    #[test]
    fn test_c_major_labels() {
        let table = chord_table(&ScaleState::default());
        let labels: Vec<String> = table.iter().flat_map(|d| d.labels(0)).collect();
        assert_eq!(labels, vec!["I", "ii", "iii", "IV", "V", "vi", "vii°"]);
    }

    #[test]
    fn test_labels_follow_root() {
        // A aeolian: same content as C major, read from A
        let mut state = ScaleState::default();
        state.set_root_note(9);
        let table = chord_table(&state);
        let a = table.iter().find(|d| d.pitch_class == 9).unwrap();
        assert_eq!(a.labels(state.root_note()), vec!["i"]);
        let c = table.iter().find(|d| d.pitch_class == 0).unwrap();
        assert_eq!(c.labels(state.root_note()), vec!["III"]);
    }

    #[test]
    fn test_harmonic_minor_augmented() {
        let table = chord_table(&ScaleState::new(HARMONIC_MINOR, 0));
        // E♭ G B
        assert_eq!(triads_at(&table, 3), &[Triad::Augmented]);
        // G B D and G B E♭
        assert_eq!(triads_at(&table, 7), &[Triad::Augmented, Triad::Major]);
        // B E♭ G and B D F
        assert_eq!(triads_at(&table, 11), &[Triad::Augmented, Triad::Diminished]);
    }

    #[test]
    fn test_multiple_triads_per_degree() {
        let mut chromatic = ScaleState::default();
        chromatic.activate_all();
        let table = chord_table(&chromatic);
        assert_eq!(table.len(), 12);
        assert!(table.iter().all(|d| d.triads == Triad::ALL.to_vec()));
    }

    #[test]
    fn test_transposed_table() {
        let table = chord_table(&ScaleState::new(IONIAN, 7));
        assert_eq!(triads_at(&table, 7), &[Triad::Major]);
        assert_eq!(triads_at(&table, 6), &[Triad::Diminished]);
    }

    #[test]
    fn test_empty_scale() {
        assert!(chord_table(&ScaleState::new(0, 0)).is_empty());
    }
}

//! Built-in named scale shapes

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScaleError};

/// Named scales, each a root-0 shape ready for `set_mask`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalePreset {
    Major,
    NaturalMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    WholeTone,
    Diminished,
    Chromatic,
}

impl ScalePreset {
    pub const ALL: [ScalePreset; 15] = [
        Self::Major,
        Self::NaturalMinor,
        Self::Dorian,
        Self::Phrygian,
        Self::Lydian,
        Self::Mixolydian,
        Self::Locrian,
        Self::HarmonicMinor,
        Self::MelodicMinor,
        Self::MajorPentatonic,
        Self::MinorPentatonic,
        Self::Blues,
        Self::WholeTone,
        Self::Diminished,
        Self::Chromatic,
    ];

    /// Semitones from the root
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Self::Major => &[0, 2, 4, 5, 7, 9, 11],
            Self::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            Self::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Self::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Self::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Self::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Self::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            Self::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Self::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            Self::MajorPentatonic => &[0, 2, 4, 7, 9],
            Self::MinorPentatonic => &[0, 3, 5, 7, 10],
            Self::Blues => &[0, 3, 5, 6, 7, 10],
            Self::WholeTone => &[0, 2, 4, 6, 8, 10],
            Self::Diminished => &[0, 2, 3, 5, 6, 8, 9, 11],
            Self::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    pub fn mask(&self) -> u16 {
        self.intervals().iter().fold(0, |mask, &i| mask | (1 << i))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::NaturalMinor => "Natural Minor",
            Self::Dorian => "Dorian",
            Self::Phrygian => "Phrygian",
            Self::Lydian => "Lydian",
            Self::Mixolydian => "Mixolydian",
            Self::Locrian => "Locrian",
            Self::HarmonicMinor => "Harmonic Minor",
            Self::MelodicMinor => "Melodic Minor",
            Self::MajorPentatonic => "Major Pentatonic",
            Self::MinorPentatonic => "Minor Pentatonic",
            Self::Blues => "Blues",
            Self::WholeTone => "Whole Tone",
            Self::Diminished => "Diminished",
            Self::Chromatic => "Chromatic",
        }
    }

    /// Case-insensitive lookup; spaces, dashes and underscores are ignored
    pub fn from_name(name: &str) -> Result<Self> {
        let key = normalize(name);
        match key.as_str() {
            "ionian" => return Ok(Self::Major),
            "minor" | "aeolian" => return Ok(Self::NaturalMinor),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|preset| normalize(preset.name()) == key)
            .ok_or_else(|| ScaleError::UnknownPreset(name.to_string()))
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

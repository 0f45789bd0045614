//! Enharmonic spelling: staff-letter names for the active pitch classes
//!
//! Each of the seven letters is a column offering two candidates, its natural
//! and its sharp (or flat) form. An ordered backtracking search picks at most
//! one candidate per column so that every active pitch class is named
//! exactly once. Both conventions are solved and the one with fewer
//! accidentals is shown.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bits::{FULL_MASK, PITCH_CLASSES};
use crate::error::{Result, ScaleError};
use crate::scale::ScaleState;

/// Roots whose spelling falls back to flats when both conventions tie
pub const FLAT_KEY_ROOTS: [u8; 5] = [1, 3, 5, 8, 10];

// ============================================================================
// Note names
// ============================================================================

/// Staff letter, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Pitch class of the unaltered letter
    pub fn natural_pitch_class(self) -> u8 {
        match self {
            Self::C => 0,
            Self::D => 2,
            Self::E => 4,
            Self::F => 5,
            Self::G => 7,
            Self::A => 9,
            Self::B => 11,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
            Self::G => 'G',
            Self::A => 'A',
            Self::B => 'B',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|letter| letter.as_char() == c.to_ascii_uppercase())
    }
}

/// Accidental attached to a letter
///
/// `Natural` is an explicit ♮ sign, shown only when a note that would
/// otherwise read as flat has been raised back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Accidental {
    #[default]
    Plain,
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
}

impl Accidental {
    /// Semitone offset from the natural letter
    pub fn offset(self) -> i32 {
        match self {
            Self::Plain | Self::Natural => 0,
            Self::Sharp => 1,
            Self::Flat => -1,
            Self::DoubleSharp => 2,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::Sharp => "♯",
            Self::Flat => "♭",
            Self::Natural => "♮",
            Self::DoubleSharp => "𝄪",
        }
    }

    /// Contribution to the accidental count used for arbitration
    pub fn weight(self) -> u32 {
        match self {
            Self::Plain | Self::Natural => 0,
            Self::Sharp | Self::Flat => 1,
            Self::DoubleSharp => 2,
        }
    }

    /// One semitone higher on the same letter (saturates at double sharp)
    pub fn raised(self) -> Self {
        match self {
            Self::Flat => Self::Natural,
            Self::Plain | Self::Natural => Self::Sharp,
            Self::Sharp | Self::DoubleSharp => Self::DoubleSharp,
        }
    }
}

/// A spelled note: letter plus accidental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteName {
    pub letter: Letter,
    pub accidental: Accidental,
}

impl NoteName {
    pub const fn new(letter: Letter, accidental: Accidental) -> Self {
        Self { letter, accidental }
    }

    pub const fn natural(letter: Letter) -> Self {
        Self::new(letter, Accidental::Plain)
    }

    pub fn pitch_class(&self) -> u8 {
        (self.letter.natural_pitch_class() as i32 + self.accidental.offset())
            .rem_euclid(PITCH_CLASSES as i32) as u8
    }

    /// Same letter, one semitone higher
    pub fn raised(&self) -> Self {
        Self::new(self.letter, self.accidental.raised())
    }

    pub fn has_accidental(&self) -> bool {
        self.accidental.weight() > 0
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter.as_char(), self.accidental.glyph())
    }
}

impl FromStr for NoteName {
    type Err = ScaleError;

    /// Accepts `C`, `C#`/`C♯`, `Db`/`D♭`, `Cx`/`C##`/`C𝄪`, `Cn`/`C♮`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ScaleError::InvalidNoteName(s.to_string());
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars
            .next()
            .and_then(Letter::from_char)
            .ok_or_else(invalid)?;

        let accidental = match chars.as_str() {
            "" => Accidental::Plain,
            "#" | "♯" => Accidental::Sharp,
            "b" | "♭" => Accidental::Flat,
            "x" | "##" | "𝄪" => Accidental::DoubleSharp,
            "n" | "♮" => Accidental::Natural,
            _ => return Err(invalid()),
        };
        Ok(Self::new(letter, accidental))
    }
}

/// Parse a pitch class from a note name or a plain number (taken mod 12)
pub fn parse_pitch_class(s: &str) -> Result<u8> {
    if let Ok(n) = s.trim().parse::<i32>() {
        return Ok(n.rem_euclid(PITCH_CLASSES as i32) as u8);
    }
    s.parse::<NoteName>().map(|name| name.pitch_class())
}

const fn plain(letter: Letter) -> NoteName {
    NoteName::new(letter, Accidental::Plain)
}

const fn sharp(letter: Letter) -> NoteName {
    NoteName::new(letter, Accidental::Sharp)
}

const fn flat(letter: Letter) -> NoteName {
    NoteName::new(letter, Accidental::Flat)
}

/// Fixed chromatic table, sharps on the black keys
pub const SHARP_NAMES: [NoteName; 12] = [
    plain(Letter::C),
    sharp(Letter::C),
    plain(Letter::D),
    sharp(Letter::D),
    plain(Letter::E),
    plain(Letter::F),
    sharp(Letter::F),
    plain(Letter::G),
    sharp(Letter::G),
    plain(Letter::A),
    sharp(Letter::A),
    plain(Letter::B),
];

/// Fixed chromatic table, flats on the black keys
pub const FLAT_NAMES: [NoteName; 12] = [
    plain(Letter::C),
    flat(Letter::D),
    plain(Letter::D),
    flat(Letter::E),
    plain(Letter::E),
    plain(Letter::F),
    flat(Letter::G),
    plain(Letter::G),
    flat(Letter::A),
    plain(Letter::A),
    flat(Letter::B),
    plain(Letter::B),
];

// ============================================================================
// Exact cover
// ============================================================================

/// Which accidental the non-natural candidates use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Convention {
    Sharp,
    Flat,
}

impl Convention {
    pub fn other(self) -> Self {
        match self {
            Self::Sharp => Self::Flat,
            Self::Flat => Self::Sharp,
        }
    }

    pub fn accidental(self) -> Accidental {
        match self {
            Self::Sharp => Accidental::Sharp,
            Self::Flat => Accidental::Flat,
        }
    }

    pub fn fixed_names(self) -> [NoteName; 12] {
        match self {
            Self::Sharp => SHARP_NAMES,
            Self::Flat => FLAT_NAMES,
        }
    }

    /// Letter order in which this convention's key signature is written
    pub fn signature_order(self) -> [Letter; 7] {
        use Letter::*;
        match self {
            Self::Sharp => [F, C, G, D, A, E, B],
            Self::Flat => [B, E, A, D, G, C, F],
        }
    }
}

/// Name every pitch class in `active` using each letter at most once
///
/// Columns are visited C to B; at each column the natural is tried before the
/// accidental, and leaving the column unused is tried last. Returns the
/// chosen names in column order, or `None` when no cover exists.
pub fn solve_exact_cover(active: u16, convention: Convention) -> Option<Vec<NoteName>> {
    let mut chosen = Vec::with_capacity(Letter::ALL.len());
    solve_column(0, active & FULL_MASK, convention, &mut chosen).then_some(chosen)
}

fn solve_column(
    column: usize,
    remaining: u16,
    convention: Convention,
    chosen: &mut Vec<NoteName>,
) -> bool {
    let Some(&letter) = Letter::ALL.get(column) else {
        return remaining == 0;
    };
    // Not enough columns left to cover what remains
    if remaining.count_ones() as usize > Letter::ALL.len() - column {
        return false;
    }

    let candidates = [
        NoteName::natural(letter),
        NoteName::new(letter, convention.accidental()),
    ];
    for candidate in candidates {
        let bit = 1u16 << candidate.pitch_class();
        if remaining & bit == 0 {
            continue;
        }
        chosen.push(candidate);
        if solve_column(column + 1, remaining & !bit, convention, chosen) {
            return true;
        }
        chosen.pop();
    }

    solve_column(column + 1, remaining, convention, chosen)
}

/// Weighted accidental count of a whole name table
pub fn accidental_count(names: &[NoteName]) -> u32 {
    names.iter().map(|name| name.accidental.weight()).sum()
}

fn apply_solution(names: &mut [NoteName; 12], solution: &[NoteName]) {
    for name in solution {
        names[name.pitch_class() as usize] = *name;
    }
}

/// Full name table for one convention, or `None` if the set cannot be spelled
///
/// A harmonic-minor shape is solved with its raised seventh lowered to the
/// diatonic neighbour; the neighbour's name is then raised one step and
/// given to the seventh.
pub fn spell_with(state: &ScaleState, convention: Convention) -> Option<[NoteName; 12]> {
    let active = state.absolute_mask();

    if let Some(offset) = state.is_harmonic_minor() {
        let root = state.root_note() as i32;
        let seventh = (11 - offset as i32 + root).rem_euclid(PITCH_CLASSES as i32) as usize;
        let proxy = (seventh + PITCH_CLASSES as usize - 1) % PITCH_CLASSES as usize;
        let proxy_set = (active & !(1 << seventh)) | (1 << proxy);

        if let Some(solution) = solve_exact_cover(proxy_set, convention) {
            let mut names = convention.fixed_names();
            apply_solution(&mut names, &solution);
            names[seventh] = names[proxy].raised();
            return Some(names);
        }
    }

    solve_exact_cover(active, convention).map(|solution| {
        let mut names = convention.fixed_names();
        apply_solution(&mut names, &solution);
        names
    })
}

fn prefer_fewer(sharp_count: u32, flat_count: u32, root_note: u8) -> Convention {
    match flat_count.cmp(&sharp_count) {
        std::cmp::Ordering::Less => Convention::Flat,
        std::cmp::Ordering::Greater => Convention::Sharp,
        std::cmp::Ordering::Equal if FLAT_KEY_ROOTS.contains(&root_note) => Convention::Flat,
        std::cmp::Ordering::Equal => Convention::Sharp,
    }
}

// ============================================================================
// Arbitrated spelling
// ============================================================================

/// The name table shown for a scale state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spelling {
    names: [NoteName; 12],
    convention: Convention,
    sharp_valid: bool,
    flat_valid: bool,
}

impl Default for Spelling {
    fn default() -> Self {
        spell(&ScaleState::default(), None)
    }
}

impl Spelling {
    /// Names indexed by absolute pitch class
    pub fn names(&self) -> &[NoteName; 12] {
        &self.names
    }

    pub fn name(&self, pitch_class: u8) -> NoteName {
        self.names[(pitch_class % PITCH_CLASSES) as usize]
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// Whether `convention` produced an exact cover
    pub fn is_valid(&self, convention: Convention) -> bool {
        match convention {
            Convention::Sharp => self.sharp_valid,
            Convention::Flat => self.flat_valid,
        }
    }

    /// `false` when the shown table is the fixed chromatic fallback
    pub fn is_spelled(&self) -> bool {
        self.is_valid(self.convention)
    }

    /// Names of the active pitch classes, ascending
    pub fn scale_names(&self, active: u16) -> Vec<NoteName> {
        (0..PITCH_CLASSES)
            .filter(|&pc| (active >> pc) & 1 == 1)
            .map(|pc| self.name(pc))
            .collect()
    }

    /// Altered notes of the active set, in key-signature order
    pub fn key_signature(&self, active: u16) -> Vec<NoteName> {
        let order = self.convention.signature_order();
        let mut altered: Vec<NoteName> = self
            .scale_names(active)
            .into_iter()
            .filter(|name| name.accidental != Accidental::Plain)
            .collect();
        altered.sort_by_key(|name| order.iter().position(|&l| l == name.letter));
        altered
    }
}

/// Spell a scale state, optionally forcing a convention
///
/// A forced convention is ignored only when it has no valid spelling while
/// the other one does. This never fails: with no exact cover under either
/// convention the fixed chromatic table is shown.
pub fn spell(state: &ScaleState, forced: Option<Convention>) -> Spelling {
    let sharp = spell_with(state, Convention::Sharp);
    let flat = spell_with(state, Convention::Flat);
    let root = state.root_note();

    let automatic = match (&sharp, &flat) {
        (Some(s), Some(f)) => prefer_fewer(accidental_count(s), accidental_count(f), root),
        (Some(_), None) => Convention::Sharp,
        (None, Some(_)) => Convention::Flat,
        (None, None) => prefer_fewer(
            accidental_count(&SHARP_NAMES),
            accidental_count(&FLAT_NAMES),
            root,
        ),
    };

    let sharp_valid = sharp.is_some();
    let flat_valid = flat.is_some();
    let valid = |c: Convention| match c {
        Convention::Sharp => sharp_valid,
        Convention::Flat => flat_valid,
    };
    let convention = match forced {
        Some(c) if valid(c) || !valid(c.other()) => c,
        _ => automatic,
    };

    let chosen = match convention {
        Convention::Sharp => sharp,
        Convention::Flat => flat,
    };

    Spelling {
        names: chosen.unwrap_or_else(|| convention.fixed_names()),
        convention,
        sharp_valid,
        flat_valid,
    }
}

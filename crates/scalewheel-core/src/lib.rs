//! scalewheel-core: Pitch-class set engine (bit math, scale model, spelling, chords)

pub mod bits;
pub mod chords;
pub mod engine;
mod error;
pub mod presets;
pub mod scale;
pub mod spelling;

pub use bits::{Direction, Fingerprint};
pub use chords::{chord_table, DegreeChords, Triad};
pub use engine::{Observer, ScaleEngine, SubscriptionId};
pub use error::{Result, ScaleError};
pub use presets::ScalePreset;
pub use scale::{ScaleSnapshot, ScaleState, HARMONIC_MINOR, IONIAN};
pub use spelling::{
    parse_pitch_class, spell, Accidental, Convention, Letter, NoteName, Spelling,
};

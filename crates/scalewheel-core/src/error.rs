//! Error types for scalewheel

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScaleError {
    #[error("Invalid note name: {0:?}")]
    InvalidNoteName(String),
    #[error("Expected 12 note flags, got {0}")]
    InvalidFlagCount(usize),
    #[error("Unknown scale preset: {0}")]
    UnknownPreset(String),
}

pub type Result<T> = std::result::Result<T, ScaleError>;

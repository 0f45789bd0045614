//! 12-bit pitch-class set arithmetic
//!
//! Every function here treats its input as a 12-bit field (bit *i* = pitch
//! class *i*). Anything above bit 11 is masked away.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScaleError};

/// Number of pitch classes in the chromatic octave
pub const PITCH_CLASSES: u8 = 12;

/// All twelve pitch classes active
pub const FULL_MASK: u16 = 0xFFF;

/// Direction to walk the cyclic set in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    /// Direction from the sign of a step; `None` for zero
    pub fn from_step(step: i32) -> Option<Self> {
        match step.signum() {
            1 => Some(Self::Ascending),
            -1 => Some(Self::Descending),
            _ => None,
        }
    }

    fn sign(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// Circular right rotation of the 12-bit field by `offset mod 12`
///
/// # Example
/// ```
/// use scalewheel_core::bits::rotate;
/// assert_eq!(rotate(0b1, -1), 0b10);
/// assert_eq!(rotate(0b10, 1), 0b1);
/// ```
pub fn rotate(value: u16, offset: i32) -> u16 {
    let value = value & FULL_MASK;
    let offset = offset.rem_euclid(PITCH_CLASSES as i32) as u32;
    if offset == 0 {
        return value;
    }
    ((value >> offset) | (value << (PITCH_CLASSES as u32 - offset))) & FULL_MASK
}

/// Mirror the field about bit 0 (bit *i* moves to bit `(12 - i) mod 12`)
pub fn reflect(value: u16) -> u16 {
    let mut reflected = value & 1;
    for i in 1..PITCH_CLASSES {
        if (value >> i) & 1 == 1 {
            reflected |= 1 << (PITCH_CLASSES - i);
        }
    }
    reflected
}

/// Number of active pitch classes
pub fn cardinality(value: u16) -> u32 {
    (value & FULL_MASK).count_ones()
}

/// Ascending list of active bit positions
pub fn pitch_set(value: u16) -> Vec<u8> {
    (0..PITCH_CLASSES).filter(|&i| (value >> i) & 1 == 1).collect()
}

/// Cyclic gaps (in semitones) between each active bit and its successor
///
/// The wrap-around gap is included, so a non-empty set yields exactly
/// `cardinality(value)` gaps summing to 12. Descending gaps are the
/// ascending gaps of the reflected set.
pub fn intervals(value: u16, direction: Direction) -> Vec<u8> {
    let value = match direction {
        Direction::Ascending => value,
        Direction::Descending => reflect(value),
    };

    let indices = pitch_set(value);
    let Some((&first, &last)) = indices.first().zip(indices.last()) else {
        return Vec::new();
    };

    let mut gaps: Vec<u8> = indices.windows(2).map(|pair| pair[1] - pair[0]).collect();
    gaps.push(PITCH_CLASSES + first - last);
    gaps
}

/// The `n`-th gap of [`intervals`], with `n` taken modulo the active count
pub fn interval_at(value: u16, n: usize, direction: Direction) -> Option<u8> {
    let gaps = intervals(value, direction);
    if gaps.is_empty() {
        return None;
    }
    Some(gaps[n % gaps.len()])
}

/// Signed rotation that lands on the nearest active bit strictly in `direction`
///
/// Returns `None` for an empty set. When only bit 0 is active the answer is a
/// full turn (±12).
pub fn next_active_offset(value: u16, direction: Direction) -> Option<i32> {
    let sign = direction.sign();
    (1..=PITCH_CLASSES as i32)
        .find(|k| {
            let bit = (k * sign).rem_euclid(PITCH_CLASSES as i32);
            (value >> bit) & 1 == 1
        })
        .map(|k| k * sign)
}

// ============================================================================
// Fingerprints
// ============================================================================

/// Rotation-invariant interval-content signature
///
/// Entry *k* (k = 1..6) counts how many active bits survive
/// `value & rotate(value, k)`. Two modes of the same scale always share a
/// fingerprint; the converse does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 6]);

impl Fingerprint {
    /// Per-distance counts, distance 1 first
    pub fn counts(&self) -> [u8; 6] {
        self.0
    }

    /// Counts packed as base-12 digits, distance 1 most significant
    pub fn value(&self) -> u32 {
        self.0.iter().fold(0u32, |acc, &count| acc * 12 + count as u32)
    }
}

impl fmt::Display for Fingerprint {
    /// Six characters, one per count, in base 12 (`0-9`, `a`, `b`)
    ///
    /// A count of 12 is written `c`; only the chromatic set produces one.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const DIGITS: &[u8; 13] = b"0123456789abc";
        let rendered: String = self
            .0
            .iter()
            .map(|&count| DIGITS[count.min(12) as usize] as char)
            .collect();
        f.write_str(&rendered)
    }
}

/// Compute the [`Fingerprint`] of a set
///
/// Every count is at most 11 except for the full chromatic set, where all
/// six are 12. [`Fingerprint::value`] still packs those as base-12 digits,
/// so its chromatic value carries into a seventh digit; the `Display` form
/// stays six characters for every set.
pub fn interval_count(value: u16) -> Fingerprint {
    let value = value & FULL_MASK;
    let mut counts = [0u8; 6];
    for (k, count) in (1..=6).zip(counts.iter_mut()) {
        *count = cardinality(value & rotate(value, k)) as u8;
    }
    Fingerprint(counts)
}

/// Smallest offset `i` with `rotate(canonical, i) == value`
///
/// Fingerprints are compared first; only sets with equal interval content
/// go through the exhaustive rotation check.
pub fn rotation_match(value: u16, canonical: u16) -> Option<u8> {
    let value = value & FULL_MASK;
    if interval_count(value) != interval_count(canonical) {
        return None;
    }
    (0..PITCH_CLASSES).find(|&i| rotate(canonical, i as i32) == value)
}

/// Convert a legacy 12-entry on/off list into a mask (index 0 = bit 0)
pub fn mask_from_flags(flags: &[bool]) -> Result<u16> {
    if flags.len() != PITCH_CLASSES as usize {
        return Err(ScaleError::InvalidFlagCount(flags.len()));
    }
    Ok(flags
        .iter()
        .enumerate()
        .filter(|(_, active)| **active)
        .fold(0u16, |mask, (i, _)| mask | (1 << i)))
}

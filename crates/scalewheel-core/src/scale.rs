//! Pitch-class set model: a root-relative shape plus the root it hangs from

use serde::{Deserialize, Serialize};

use crate::bits::{self, Direction, Fingerprint, FULL_MASK, PITCH_CLASSES};

/// Ionian shape, root-relative (C D E F G A B)
pub const IONIAN: u16 = 0b101010110101;

/// Harmonic minor shape, root-relative (C D E♭ F G A♭ B)
pub const HARMONIC_MINOR: u16 = 0b100110101101;

fn pitch_class(value: i32) -> u8 {
    value.rem_euclid(PITCH_CLASSES as i32) as u8
}

/// Read-only `(root_note, shape)` pair handed to collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleSnapshot {
    pub root_note: u8,
    pub shape: u16,
}

/// The active-note set, stored relative to its root
///
/// `shape` bit 0 is the root. The absolute view is the shape rotated left by
/// `root_note`. Both fields are always normalised, so every operation is
/// total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleState {
    shape: u16,
    root_note: u8,
}

impl Default for ScaleState {
    fn default() -> Self {
        Self {
            shape: IONIAN,
            root_note: 0,
        }
    }
}

impl ScaleState {
    pub fn new(shape: u16, root_note: i32) -> Self {
        Self {
            shape: shape & FULL_MASK,
            root_note: pitch_class(root_note),
        }
    }

    pub fn shape(&self) -> u16 {
        self.shape
    }

    pub fn root_note(&self) -> u8 {
        self.root_note
    }

    /// Active set in absolute pitch-class coordinates
    pub fn absolute_mask(&self) -> u16 {
        bits::rotate(self.shape, -(self.root_note as i32))
    }

    pub fn is_active(&self, absolute_pitch: i32) -> bool {
        (self.absolute_mask() >> pitch_class(absolute_pitch)) & 1 == 1
    }

    /// Ascending absolute pitch classes that are active
    pub fn active_pitch_classes(&self) -> Vec<u8> {
        bits::pitch_set(self.absolute_mask())
    }

    pub fn cardinality(&self) -> u32 {
        bits::cardinality(self.shape)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        bits::interval_count(self.shape)
    }

    pub fn snapshot(&self) -> ScaleSnapshot {
        ScaleSnapshot {
            root_note: self.root_note,
            shape: self.shape,
        }
    }

    /// Absolute mask shifted up by `semitones`, without mutating
    pub fn transposed_mask(&self, semitones: i32) -> u16 {
        bits::rotate(self.absolute_mask(), -semitones)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Flip one absolute pitch class. Toggling the root itself is allowed.
    pub fn toggle_note(&mut self, absolute_pitch: i32) {
        let idx = pitch_class(absolute_pitch - self.root_note as i32);
        self.shape ^= 1 << idx;
    }

    /// Replace the shape wholesale (root-relative, masked to 12 bits)
    pub fn set_mask(&mut self, raw: u16) {
        self.shape = raw & FULL_MASK;
    }

    pub fn deactivate_all(&mut self) {
        self.shape = 0;
    }

    pub fn activate_all(&mut self) {
        self.shape = FULL_MASK;
    }

    /// Move the root to the next active note in the direction of `direction`
    ///
    /// The absolute content is unchanged; only the mode it is read in moves.
    /// Returns `false` (and does nothing) for an empty set or a zero step.
    pub fn rotate_mode(&mut self, direction: i32) -> bool {
        let Some(direction) = Direction::from_step(direction) else {
            return false;
        };
        let Some(shift) = bits::next_active_offset(self.shape, direction) else {
            return false;
        };

        self.root_note = pitch_class(self.root_note as i32 + shift);
        self.shape = bits::rotate(self.shape, shift);
        true
    }

    /// Shift the actual pitch content; the shape stays as it is
    pub fn transpose(&mut self, semitones: i32) {
        self.root_note = pitch_class(self.root_note as i32 + semitones);
    }

    /// Re-root on an arbitrary pitch class, keeping the absolute content
    pub fn set_root_note(&mut self, target: i32) {
        let target = pitch_class(target);
        let diff = pitch_class(target as i32 - self.root_note as i32);
        self.root_note = target;
        self.shape = bits::rotate(self.shape, diff as i32);
    }

    // ========================================================================
    // Classification
    // ========================================================================

    /// Whether the shape is a mode of the major scale
    pub fn is_diatonic(&self) -> bool {
        bits::rotation_match(self.shape, IONIAN).is_some()
    }

    /// Rotation of the harmonic-minor shape that equals this shape, if any
    ///
    /// The raised seventh of the matched scale sits at relative bit
    /// `(11 - offset) mod 12`.
    pub fn is_harmonic_minor(&self) -> Option<u8> {
        bits::rotation_match(self.shape, HARMONIC_MINOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_masks() {
        assert_eq!(IONIAN, 2741);
        assert_eq!(HARMONIC_MINOR, 2477);
        assert_eq!(bits::pitch_set(HARMONIC_MINOR), vec![0, 2, 3, 5, 7, 8, 11]);
    }

    #[test]
    fn test_default_is_c_major() {
        let state = ScaleState::default();
        assert_eq!(state.shape(), 2741);
        assert_eq!(state.root_note(), 0);
        assert_eq!(state.active_pitch_classes(), vec![0, 2, 4, 5, 7, 9, 11]);
    }

    #[test]
    fn test_absolute_mask_follows_root() {
        let state = ScaleState::new(IONIAN, 2); // D major
        assert_eq!(state.active_pitch_classes(), vec![1, 2, 4, 6, 7, 9, 11]);
        assert!(state.is_active(2));
        assert!(state.is_active(14));
        assert!(!state.is_active(0));
    }

    #[test]
    fn test_new_normalises() {
        let state = ScaleState::new(0xFFFF, -1);
        assert_eq!(state.shape(), 0xFFF);
        assert_eq!(state.root_note(), 11);
    }

    #[test]
    fn test_toggle_note() {
        let mut state = ScaleState::new(IONIAN, 7); // G major
        state.toggle_note(6); // F# off
        assert!(!state.is_active(6));
        state.toggle_note(5); // F on
        assert!(state.is_active(5));
        assert_eq!(state.cardinality(), 7);

        // Root may be switched off
        state.toggle_note(7);
        assert!(!state.is_active(7));
        assert_eq!(state.shape() & 1, 0);
    }

    #[test]
    fn test_set_mask_masks_to_twelve_bits() {
        let mut state = ScaleState::default();
        state.set_mask(0xF000 | 0b10010001);
        assert_eq!(state.shape(), 0b10010001);
    }

    #[test]
    fn test_activate_deactivate_idempotent() {
        let mut state = ScaleState::default();
        state.activate_all();
        let once = state;
        state.activate_all();
        assert_eq!(state, once);
        assert_eq!(state.shape(), 0xFFF);

        state.deactivate_all();
        let once = state;
        state.deactivate_all();
        assert_eq!(state, once);
        assert_eq!(state.absolute_mask(), 0);
    }

    #[test]
    fn test_rotate_mode_cycles_through_major() {
        let mut state = ScaleState::default();
        let start = state;
        let absolute = state.absolute_mask();

        let mut roots = Vec::new();
        for _ in 0..7 {
            assert!(state.rotate_mode(1));
            assert_eq!(state.absolute_mask(), absolute);
            assert_eq!(state.cardinality(), 7);
            assert_eq!(state.fingerprint(), start.fingerprint());
            roots.push(state.root_note());
        }
        assert_eq!(roots, vec![2, 4, 5, 7, 9, 11, 0]);
        assert_eq!(state, start);
    }

    #[test]
    fn test_rotate_mode_descending() {
        let mut state = ScaleState::default();
        assert!(state.rotate_mode(-1));
        // C Ionian down to B Locrian
        assert_eq!(state.root_note(), 11);
        assert_eq!(state.shape(), bits::rotate(IONIAN, -1));
        assert_eq!(state.absolute_mask(), IONIAN);

        assert!(state.rotate_mode(-3)); // only the sign matters
        assert_eq!(state.root_note(), 9);
    }

    #[test]
    fn test_rotate_mode_noop_on_empty() {
        let mut state = ScaleState::new(0, 4);
        assert!(!state.rotate_mode(1));
        assert_eq!(state, ScaleState::new(0, 4));

        let mut state = ScaleState::default();
        assert!(!state.rotate_mode(0));
        assert_eq!(state, ScaleState::default());
    }

    #[test]
    fn test_rotate_mode_without_active_root() {
        let mut state = ScaleState::default();
        state.toggle_note(0);
        assert!(state.rotate_mode(1));
        assert_eq!(state.root_note(), 2);
        assert_eq!(state.shape() & 1, 1);
    }

    #[test]
    fn test_transpose_keeps_shape() {
        let mut state = ScaleState::default();
        for n in [-25, -1, 0, 3, 7, 12, 100] {
            let before = state.shape();
            state.transpose(n);
            assert_eq!(state.shape(), before);
        }
        let mut state = ScaleState::default();
        state.transpose(-3);
        assert_eq!(state.root_note(), 9);
        assert_eq!(state.active_pitch_classes(), vec![1, 2, 4, 6, 8, 9, 11]);
    }

    #[test]
    fn test_set_root_note_keeps_content() {
        let mut state = ScaleState::default();
        state.set_root_note(9); // A aeolian
        assert_eq!(state.root_note(), 9);
        assert_eq!(state.absolute_mask(), IONIAN);
        assert_eq!(bits::pitch_set(state.shape()), vec![0, 2, 3, 5, 7, 8, 10]);

        // Inactive roots are allowed
        state.set_root_note(13);
        assert_eq!(state.root_note(), 1);
        assert_eq!(state.absolute_mask(), IONIAN);
        assert_eq!(state.shape() & 1, 0);
    }

    #[test]
    fn test_transposed_mask() {
        let state = ScaleState::default();
        assert_eq!(bits::pitch_set(state.transposed_mask(2)), vec![1, 2, 4, 6, 7, 9, 11]);
        assert_eq!(state.absolute_mask(), IONIAN);
    }

    #[test]
    fn test_is_diatonic() {
        for root in 0..12 {
            assert!(ScaleState::new(IONIAN, root).is_diatonic());
            assert!(!ScaleState::new(0xFFF, root).is_diatonic());
            assert!(!ScaleState::new(HARMONIC_MINOR, root).is_diatonic());
        }
        let mut dorian = ScaleState::default();
        dorian.rotate_mode(1);
        assert!(dorian.is_diatonic());
    }

    #[test]
    fn test_is_harmonic_minor() {
        assert_eq!(ScaleState::new(HARMONIC_MINOR, 0).is_harmonic_minor(), Some(0));
        assert_eq!(ScaleState::default().is_harmonic_minor(), None);

        let mut state = ScaleState::new(HARMONIC_MINOR, 0);
        state.set_root_note(11); // raised seventh becomes the root
        let offset = state.is_harmonic_minor().unwrap();
        assert_eq!(offset, 11);
        assert_eq!((11 + 12 - offset) % 12, 0);
    }
}

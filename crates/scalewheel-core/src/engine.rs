//! Observable scale engine
//!
//! Owns the single mutable [`ScaleState`] and keeps the spelling and chord
//! table in step with it. Observers are called synchronously after every
//! mutation, once the derived views have been rebuilt.

use std::fmt;

use tracing::debug;

use crate::chords::{chord_table, DegreeChords};
use crate::presets::ScalePreset;
use crate::scale::{ScaleSnapshot, ScaleState};
use crate::spelling::{spell, Convention, NoteName, Spelling};

/// Handle returned by [`ScaleEngine::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Update callback; receives the engine after the change
pub type Observer = Box<dyn FnMut(&ScaleEngine)>;

pub struct ScaleEngine {
    state: ScaleState,
    spelling_override: Option<Convention>,
    spelling: Spelling,
    chords: Vec<DegreeChords>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl fmt::Debug for ScaleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaleEngine")
            .field("state", &self.state)
            .field("spelling_override", &self.spelling_override)
            .field("convention", &self.spelling.convention())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for ScaleEngine {
    fn default() -> Self {
        Self::new(ScaleState::default())
    }
}

impl ScaleEngine {
    pub fn new(state: ScaleState) -> Self {
        Self {
            state,
            spelling_override: None,
            spelling: spell(&state, None),
            chords: chord_table(&state),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    // ========================================================================
    // Read API
    // ========================================================================

    pub fn state(&self) -> &ScaleState {
        &self.state
    }

    pub fn snapshot(&self) -> ScaleSnapshot {
        self.state.snapshot()
    }

    pub fn root_note(&self) -> u8 {
        self.state.root_note()
    }

    pub fn shape(&self) -> u16 {
        self.state.shape()
    }

    pub fn absolute_mask(&self) -> u16 {
        self.state.absolute_mask()
    }

    pub fn spelling(&self) -> &Spelling {
        &self.spelling
    }

    /// Display name for every absolute pitch class
    pub fn note_names(&self) -> &[NoteName; 12] {
        self.spelling.names()
    }

    /// Spelled names of the active notes, ascending
    pub fn scale_names(&self) -> Vec<NoteName> {
        self.spelling.scale_names(self.absolute_mask())
    }

    pub fn key_signature(&self) -> Vec<NoteName> {
        self.spelling.key_signature(self.absolute_mask())
    }

    pub fn chord_table(&self) -> &[DegreeChords] {
        &self.chords
    }

    pub fn spelling_override(&self) -> Option<Convention> {
        self.spelling_override
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn subscribe(&mut self, observer: impl FnMut(&ScaleEngine) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns `false` if the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    fn notify(&mut self) {
        let mut observers = std::mem::take(&mut self.observers);
        for (_, observer) in observers.iter_mut() {
            observer(self);
        }
        self.observers = observers;
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn toggle_note(&mut self, absolute_pitch: i32) {
        self.mutate("toggle_note", |s| s.toggle_note(absolute_pitch));
    }

    pub fn set_mask(&mut self, raw: u16) {
        self.mutate("set_mask", |s| s.set_mask(raw));
    }

    pub fn load_preset(&mut self, preset: ScalePreset) {
        self.mutate("load_preset", |s| s.set_mask(preset.mask()));
    }

    pub fn deactivate_all(&mut self) {
        self.mutate("deactivate_all", ScaleState::deactivate_all);
    }

    pub fn activate_all(&mut self) {
        self.mutate("activate_all", ScaleState::activate_all);
    }

    /// Step to the neighbouring mode; no notification when nothing moved
    pub fn rotate_mode(&mut self, direction: i32) -> bool {
        let mut next = self.state;
        if !next.rotate_mode(direction) {
            return false;
        }
        self.mutate("rotate_mode", |s| *s = next);
        true
    }

    pub fn transpose(&mut self, semitones: i32) {
        self.mutate("transpose", |s| s.transpose(semitones));
    }

    pub fn set_root_note(&mut self, target: i32) {
        self.mutate("set_root_note", |s| s.set_root_note(target));
    }

    /// Force a spelling convention until the next state change
    ///
    /// `None` returns to automatic arbitration. A convention with no valid
    /// spelling is not shown while the other one has one.
    pub fn set_spelling_override(&mut self, convention: Option<Convention>) {
        self.spelling_override = convention;
        self.refresh("set_spelling_override");
    }

    /// Ask for the other convention than the one currently shown
    pub fn toggle_enharmonic(&mut self) {
        self.set_spelling_override(Some(self.spelling.convention().other()));
    }

    fn mutate(&mut self, action: &'static str, f: impl FnOnce(&mut ScaleState)) {
        f(&mut self.state);
        self.spelling_override = None;
        self.refresh(action);
    }

    fn refresh(&mut self, action: &'static str) {
        self.spelling = spell(&self.state, self.spelling_override);
        self.chords = chord_table(&self.state);
        debug!(
            action,
            root_note = self.state.root_note(),
            shape = self.state.shape(),
            convention = ?self.spelling.convention(),
            "Scale updated"
        );
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::chords::Triad;
    use crate::scale::IONIAN;

    fn names(engine: &ScaleEngine) -> Vec<String> {
        engine.scale_names().iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_default_engine() {
        let engine = ScaleEngine::default();
        assert_eq!(engine.shape(), IONIAN);
        assert_eq!(engine.root_note(), 0);
        assert_eq!(names(&engine), vec!["C", "D", "E", "F", "G", "A", "B"]);
        assert_eq!(engine.chord_table().len(), 7);
    }

    #[test]
    fn test_observers_see_fresh_state() {
        let mut engine = ScaleEngine::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.subscribe(move |e| {
            sink.borrow_mut()
                .push((e.root_note(), e.spelling().convention(), e.chord_table().len()));
        });

        engine.transpose(1); // D♭ major
        engine.toggle_note(0);

        assert_eq!(
            *seen.borrow(),
            vec![(1, Convention::Flat, 7), (1, Convention::Flat, 6)]
        );
    }

    #[test]
    fn test_every_mutation_notifies() {
        let mut engine = ScaleEngine::default();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        engine.subscribe(move |_| counter.set(counter.get() + 1));

        engine.toggle_note(1);
        engine.set_mask(IONIAN);
        engine.load_preset(ScalePreset::Dorian);
        engine.activate_all();
        engine.deactivate_all();
        engine.set_root_note(4);
        engine.transpose(-2);
        engine.set_spelling_override(Some(Convention::Flat));
        engine.toggle_enharmonic();
        assert_eq!(count.get(), 9);

        // Empty set: mode rotation changes nothing and stays quiet
        assert!(!engine.rotate_mode(1));
        assert_eq!(count.get(), 9);
    }

    #[test]
    fn test_unsubscribe() {
        let mut engine = ScaleEngine::default();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let id = engine.subscribe(move |_| counter.set(counter.get() + 1));

        engine.transpose(2);
        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
        engine.transpose(2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_observers_called_in_subscription_order() {
        let mut engine = ScaleEngine::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["render", "audio"] {
            let order = order.clone();
            engine.subscribe(move |_| order.borrow_mut().push(tag));
        }
        engine.activate_all();
        assert_eq!(*order.borrow(), vec!["render", "audio"]);
    }

    #[test]
    fn test_rotate_mode_through_engine() {
        let mut engine = ScaleEngine::default();
        for _ in 0..7 {
            assert!(engine.rotate_mode(1));
            assert_eq!(engine.absolute_mask(), IONIAN);
        }
        assert_eq!(engine.snapshot(), ScaleState::default().snapshot());
    }

    #[test]
    fn test_toggle_enharmonic() {
        let mut engine = ScaleEngine::default();
        assert_eq!(engine.spelling().convention(), Convention::Sharp);
        engine.toggle_enharmonic();
        assert_eq!(engine.spelling().convention(), Convention::Flat);
        engine.toggle_enharmonic();
        assert_eq!(engine.spelling().convention(), Convention::Sharp);

        // F major has no sharp spelling, so the toggle is refused
        engine.transpose(5);
        engine.toggle_enharmonic();
        assert_eq!(engine.spelling_override(), Some(Convention::Sharp));
        assert_eq!(engine.spelling().convention(), Convention::Flat);
    }

    #[test]
    fn test_state_change_clears_override() {
        let mut engine = ScaleEngine::default();
        engine.set_spelling_override(Some(Convention::Flat));
        assert_eq!(engine.spelling().convention(), Convention::Flat);

        engine.transpose(7); // G major
        assert_eq!(engine.spelling_override(), None);
        assert_eq!(engine.spelling().convention(), Convention::Sharp);
        let signature: Vec<String> = engine.key_signature().iter().map(|n| n.to_string()).collect();
        assert_eq!(signature, vec!["F♯"]);
    }

    #[test]
    fn test_chord_table_follows_state() {
        let mut engine = ScaleEngine::default();
        engine.load_preset(ScalePreset::HarmonicMinor);
        let degree = engine
            .chord_table()
            .iter()
            .find(|d| d.pitch_class == 3)
            .unwrap();
        assert_eq!(degree.triads, vec![Triad::Augmented]);
        assert_eq!(names(&engine), vec!["C", "D", "E♭", "F", "G", "A♭", "B♮"]);
    }
}

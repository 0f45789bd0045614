//! Scale playback worker
//!
//! Plays the current scale as an ascending run on a background thread. The
//! engine never waits on the worker: it pushes `(root_note, shape)` snapshots
//! through a [`SnapshotFeed`] and the worker picks the latest one up at the
//! start of every pass. Turning notes into sound is the [`NoteSink`]'s job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use scalewheel_core::bits::PITCH_CLASSES;
use scalewheel_core::ScaleSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, trace};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Tempo must be positive, got {0} BPM")]
    InvalidTempo(u32),
    #[error("Playback worker panicked")]
    WorkerPanicked,
}

/// Tempo and voicing for the playback run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// One note per beat
    pub bpm: u32,
    /// Repeat the run until stopped
    pub looping: bool,
    /// MIDI note of pitch class 0 in the played octave
    pub base_note: u8,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            bpm: 120,
            looping: false,
            base_note: 60, // Middle C
        }
    }
}

impl PlaybackSettings {
    pub fn note_duration(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.bpm.max(1) as f64)
    }
}

/// MIDI notes for one pass: active degrees upward from the root, then the
/// root an octave up. Empty when no note is active.
pub fn sequence_for(snapshot: ScaleSnapshot, base_note: u8) -> Vec<u8> {
    let root = base_note.saturating_add(snapshot.root_note);
    let mut sequence: Vec<u8> = (0..PITCH_CLASSES)
        .filter(|&i| (snapshot.shape >> i) & 1 == 1)
        .map(|i| root.saturating_add(i).min(127))
        .collect();

    if let Some(&first) = sequence.first() {
        sequence.push(first.saturating_add(12).min(127));
    }
    sequence
}

/// Receiver of played notes (synthesis lives behind this)
pub trait NoteSink: Send + 'static {
    /// Sound `note` for `duration`; returns once the note is over
    fn play_note(&mut self, note: u8, duration: Duration);
}

/// Sink that only keeps time
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl NoteSink for SilentSink {
    fn play_note(&mut self, _note: u8, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Notifications from the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    NoteStarted(u8),
    Stopped,
}

/// Cloneable handle for pushing scale snapshots to the player
#[derive(Debug, Clone)]
pub struct SnapshotFeed {
    latest: Arc<Mutex<ScaleSnapshot>>,
}

impl SnapshotFeed {
    pub fn push(&self, snapshot: ScaleSnapshot) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = snapshot;
        }
    }

    fn current(&self) -> Option<ScaleSnapshot> {
        self.latest.lock().ok().map(|s| *s)
    }
}

/// Background scale player
pub struct ScalePlayer {
    feed: SnapshotFeed,
    settings: Arc<Mutex<PlaybackSettings>>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    events_tx: Sender<PlayerEvent>,
    events_rx: Receiver<PlayerEvent>,
}

impl ScalePlayer {
    /// Fails with [`PlaybackError::InvalidTempo`] when `settings.bpm` is zero
    pub fn new(
        initial: ScaleSnapshot,
        settings: PlaybackSettings,
    ) -> Result<Self, PlaybackError> {
        if settings.bpm == 0 {
            return Err(PlaybackError::InvalidTempo(settings.bpm));
        }
        let (events_tx, events_rx) = unbounded();
        Ok(Self {
            feed: SnapshotFeed {
                latest: Arc::new(Mutex::new(initial)),
            },
            settings: Arc::new(Mutex::new(settings)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
            events_tx,
            events_rx,
        })
    }

    /// Handle for observers that forward engine updates
    pub fn feed(&self) -> SnapshotFeed {
        self.feed.clone()
    }

    pub fn update_scale(&self, snapshot: ScaleSnapshot) {
        self.feed.push(snapshot);
    }

    /// Worker notifications (note starts and the final stop)
    pub fn events(&self) -> Receiver<PlayerEvent> {
        self.events_rx.clone()
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.settings.lock().map(|s| *s).unwrap_or_default()
    }

    pub fn set_bpm(&self, bpm: u32) -> Result<(), PlaybackError> {
        if bpm == 0 {
            return Err(PlaybackError::InvalidTempo(bpm));
        }
        if let Ok(mut settings) = self.settings.lock() {
            settings.bpm = bpm;
        }
        Ok(())
    }

    pub fn set_looping(&self, looping: bool) {
        if let Ok(mut settings) = self.settings.lock() {
            settings.looping = looping;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Start a run, stopping any run already in progress
    pub fn play<S: NoteSink>(&mut self, sink: S) -> Result<(), PlaybackError> {
        self.stop()?;
        self.stop_flag.store(false, Ordering::SeqCst);

        let feed = self.feed.clone();
        let settings = self.settings.clone();
        let stop_flag = self.stop_flag.clone();
        let events = self.events_tx.clone();

        let current = self.settings();
        info!(bpm = current.bpm, looping = current.looping, "Playback started");

        self.worker = Some(thread::spawn(move || {
            Self::run(sink, feed, settings, stop_flag, events);
        }));
        Ok(())
    }

    /// Cancel the run and wait for the worker to finish its current note
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        self.stop_flag.store(true, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker.join().map_err(|_| PlaybackError::WorkerPanicked)?;
        info!("Playback stopped");
        Ok(())
    }

    fn run<S: NoteSink>(
        mut sink: S,
        feed: SnapshotFeed,
        settings: Arc<Mutex<PlaybackSettings>>,
        stop_flag: Arc<AtomicBool>,
        events: Sender<PlayerEvent>,
    ) {
        'passes: while !stop_flag.load(Ordering::SeqCst) {
            let Some(snapshot) = feed.current() else {
                break;
            };
            let Ok(pass_settings) = settings.lock().map(|s| *s) else {
                break;
            };

            let sequence = sequence_for(snapshot, pass_settings.base_note);
            if sequence.is_empty() {
                trace!("Nothing active, ending playback");
                break;
            }

            for note in sequence {
                if stop_flag.load(Ordering::SeqCst) {
                    break 'passes;
                }
                // Tempo changes apply from the next note
                let duration = settings
                    .lock()
                    .map(|s| s.note_duration())
                    .unwrap_or_else(|_| pass_settings.note_duration());
                let _ = events.send(PlayerEvent::NoteStarted(note));
                sink.play_note(note, duration);
            }

            let looping = settings.lock().map(|s| s.looping).unwrap_or(false);
            if !looping {
                break;
            }
        }

        let _ = events.send(PlayerEvent::Stopped);
    }
}

impl Drop for ScalePlayer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

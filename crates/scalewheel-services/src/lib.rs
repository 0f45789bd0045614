//! scalewheel-services: Playback worker and other engine-facing services

pub mod playback;

pub use playback::{
    sequence_for, NoteSink, PlaybackError, PlaybackSettings, PlayerEvent, ScalePlayer,
    SilentSink, SnapshotFeed,
};

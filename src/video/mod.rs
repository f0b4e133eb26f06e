//! Video node lifecycle: loading, trim-window playback, disposal.

pub mod controller;

pub use controller::{MIN_TRIM_GAP_SECS, PlaybackState, VideoNode};

//! Video node lifecycle and trim-window playback state.

use crate::assets::loader::{ResourceLoader, VideoHandle};
use crate::foundation::error::{EngineError, EngineResult};

/// Minimum width of the trim window in seconds.
pub const MIN_TRIM_GAP_SECS: f64 = 0.1;

/// Playback lifecycle of a video node.
///
/// `Loading → Ready(paused) ⇄ Ready(playing) → Disposed`. A node re-enters
/// `Loading` only when its handle was lost (scene round-trip, restored clone)
/// and is reconstructed from the retained source url.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// Handle not yet available; trim and playback operations are guarded no-ops.
    Loading,
    /// Metadata and first frame are available.
    Ready {
        /// Whether the playhead advances on `advance`.
        playing: bool,
    },
    /// Media released; the node is inert.
    Disposed,
}

/// Video-backed scene node: a media handle plus the trim window that playback,
/// looping, and export are constrained to.
#[derive(Clone, Debug)]
pub struct VideoNode {
    source: String,
    handle: Option<VideoHandle>,
    state: PlaybackState,

    start_time: Option<f64>,
    end_time: Option<f64>,
    position: f64,

    /// Paint-time brightness in percent (100 = identity).
    pub brightness: f64,
    /// Paint-time contrast in percent (100 = identity).
    pub contrast: f64,
    /// Paint-time saturation in percent (100 = identity).
    pub saturation: f64,
    /// Playback volume, 0..=1.
    pub volume: f64,
    /// Playback rate multiplier applied to `advance` ticks.
    pub playback_rate: f64,
}

impl VideoNode {
    /// Build a ready node from a loaded handle.
    pub fn from_handle(handle: VideoHandle) -> Self {
        let duration = handle.duration_secs();
        Self {
            source: handle.source.clone(),
            handle: Some(handle),
            state: PlaybackState::Ready { playing: false },
            start_time: Some(0.0),
            end_time: Some(duration),
            position: 0.0,
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            volume: 1.0,
            playback_rate: 1.0,
        }
    }

    /// Build a loading node from a bare source url (handle reconstructed later).
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            handle: None,
            state: PlaybackState::Loading,
            start_time: None,
            end_time: None,
            position: 0.0,
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            volume: 1.0,
            playback_rate: 1.0,
        }
    }

    /// Source url this node was created from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// `true` once metadata and first frame are available.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, PlaybackState::Ready { .. })
    }

    /// `true` while the playhead advances on `advance`.
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Ready { playing: true })
    }

    /// Container duration in seconds, once known.
    pub fn duration_secs(&self) -> Option<f64> {
        self.handle.as_ref().map(VideoHandle::duration_secs)
    }

    /// Trim window start in seconds, once resolved.
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Trim window end in seconds, once resolved.
    pub fn end_time(&self) -> Option<f64> {
        self.end_time
    }

    /// Current playhead position in source seconds.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Borrow the media handle, if attached.
    pub fn handle(&self) -> Option<&VideoHandle> {
        self.handle.as_ref()
    }

    /// Reconstruct the media handle through `loader` if it was lost.
    ///
    /// Must succeed before any trim or playback operation takes effect; other
    /// operations treat a still-loading node as a guarded no-op.
    pub fn ensure_ready(&mut self, loader: &mut ResourceLoader) -> EngineResult<()> {
        match self.state {
            PlaybackState::Disposed => Err(EngineError::validation(
                "video node has been disposed and cannot be revived",
            )),
            PlaybackState::Ready { .. } => Ok(()),
            PlaybackState::Loading => {
                let handle = loader.load_video(&self.source)?;
                self.attach(handle);
                Ok(())
            }
        }
    }

    fn attach(&mut self, handle: VideoHandle) {
        let duration = handle.duration_secs();
        self.handle = Some(handle);
        self.state = PlaybackState::Ready { playing: false };

        // Default to the full asset, then re-clamp trims carried over from a
        // clone whose source may have changed underneath them.
        let start = self
            .start_time
            .unwrap_or(0.0)
            .clamp(0.0, (duration - MIN_TRIM_GAP_SECS).max(0.0));
        let end = self
            .end_time
            .unwrap_or(duration)
            .clamp(start + MIN_TRIM_GAP_SECS, duration)
            .min(duration);
        self.start_time = Some(start);
        self.end_time = Some(end.max(start + MIN_TRIM_GAP_SECS).min(duration));
        self.position = self.position.clamp(start, end);
    }

    /// Move the trim window start, clamped to `[0, end − MIN_TRIM_GAP_SECS]`.
    ///
    /// Guarded no-op before `Ready`. If the playhead sits before the new start
    /// it is sought forward to it.
    pub fn set_start_time(&mut self, t: f64) {
        let (Some(end), true) = (self.end_time, self.is_ready()) else {
            return;
        };
        let start = t.clamp(0.0, end - MIN_TRIM_GAP_SECS);
        self.start_time = Some(start);
        if self.position < start {
            self.position = start;
        }
    }

    /// Move the trim window end, clamped to `[start + MIN_TRIM_GAP_SECS, duration]`.
    ///
    /// Guarded no-op before `Ready`. If the playhead sits past the new end it
    /// is sought back to the window start.
    pub fn set_end_time(&mut self, t: f64) {
        let (Some(start), Some(duration), true) =
            (self.start_time, self.duration_secs(), self.is_ready())
        else {
            return;
        };
        let end = t.clamp(start + MIN_TRIM_GAP_SECS, duration);
        self.end_time = Some(end);
        if self.position > end {
            self.position = start;
        }
    }

    /// Begin advancing the playhead. Guarded no-op before `Ready`.
    pub fn play(&mut self) {
        if self.is_ready() {
            self.state = PlaybackState::Ready { playing: true };
        }
    }

    /// Stop advancing the playhead. Guarded no-op before `Ready`.
    pub fn pause(&mut self) {
        if self.is_ready() {
            self.state = PlaybackState::Ready { playing: false };
        }
    }

    /// Seek the playhead, clamped into the trim window.
    pub fn seek(&mut self, t: f64) {
        let (Some(start), Some(end)) = (self.start_time, self.end_time) else {
            return;
        };
        self.position = t.clamp(start, end);
    }

    /// Advance the playhead by `dt_secs` of engine time.
    ///
    /// Looping always respects the trim window, never the full asset: a
    /// position at or past `end_time` resumes from `start_time` while
    /// continuing to play.
    pub fn advance(&mut self, dt_secs: f64) {
        if !self.is_playing() {
            return;
        }
        let (Some(start), Some(end)) = (self.start_time, self.end_time) else {
            return;
        };

        self.position += dt_secs * self.playback_rate;
        if self.position < start {
            self.position = start;
        } else if self.position >= end {
            self.position = start;
        }
    }

    /// Release the media handle and make the node inert.
    pub fn dispose(&mut self) {
        self.handle = None;
        self.state = PlaybackState::Disposed;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/video/controller.rs"]
mod tests;
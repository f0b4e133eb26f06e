//! Tween primitives: easing curves, animatable properties, and keyframe tracks.

use crate::foundation::error::{EngineError, EngineResult};

/// Easing functions used to map normalized segment progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    /// Linear interpolation.
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in/out.
    InOutQuad,
}

impl Ease {
    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
        }
    }
}

/// Node transform property driven by a [`Track`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweenProperty {
    /// Horizontal position in stage units.
    X,
    /// Vertical position in stage units.
    Y,
    /// Rotation in degrees.
    RotationDeg,
    /// Horizontal scale factor.
    ScaleX,
    /// Vertical scale factor.
    ScaleY,
}

/// One keyframe of a periodic track, positioned on the normalized cycle.
#[derive(Clone, Copy, Debug)]
pub struct Key {
    /// Position within the cycle, `0.0..=1.0`.
    pub at: f64,
    /// Value at this key.
    pub value: f64,
    /// Easing applied toward the next key.
    pub ease: Ease,
}

impl Key {
    pub(crate) fn linear(at: f64, value: f64) -> Self {
        Self {
            at,
            value,
            ease: Ease::Linear,
        }
    }
}

/// Periodic keyframe track over one transform property.
///
/// Yoyo motion is encoded in the key list itself (out and back within one
/// cycle); wrap-around motion (spin) simply ends the cycle at a value congruent
/// with the start.
#[derive(Clone, Debug)]
pub struct Track {
    /// Property this track drives.
    pub property: TweenProperty,
    /// Duration of one full cycle in seconds.
    pub period_secs: f64,
    /// Keys sorted by `at`, first at 0.0, last at 1.0.
    pub keys: Vec<Key>,
}

impl Track {
    /// Build a validated track.
    pub fn new(property: TweenProperty, period_secs: f64, keys: Vec<Key>) -> EngineResult<Self> {
        let track = Self {
            property,
            period_secs,
            keys,
        };
        track.validate()?;
        Ok(track)
    }

    /// Out-and-back track: base at 0 and 1, `peak` at the midpoint.
    pub fn yoyo(property: TweenProperty, period_secs: f64, base: f64, peak: f64) -> Self {
        Self {
            property,
            period_secs,
            keys: vec![
                Key::linear(0.0, base),
                Key::linear(0.5, peak),
                Key::linear(1.0, base),
            ],
        }
    }

    /// Monotone sweep from `from` to `to` across the cycle (wraps, no yoyo).
    pub fn sweep(property: TweenProperty, period_secs: f64, from: f64, to: f64) -> Self {
        Self {
            property,
            period_secs,
            keys: vec![Key::linear(0.0, from), Key::linear(1.0, to)],
        }
    }

    /// Validate key ordering and cycle coverage.
    pub fn validate(&self) -> EngineResult<()> {
        if !self.period_secs.is_finite() || self.period_secs <= 0.0 {
            return Err(EngineError::validation(
                "track period must be finite and > 0",
            ));
        }
        if self.keys.len() < 2 {
            return Err(EngineError::validation("track needs at least two keys"));
        }
        if !self.keys.windows(2).all(|w| w[0].at <= w[1].at) {
            return Err(EngineError::validation("track keys must be sorted by `at`"));
        }
        let first = self.keys[0].at;
        let last = self.keys[self.keys.len() - 1].at;
        if first != 0.0 || last != 1.0 {
            return Err(EngineError::validation(
                "track keys must start at 0.0 and end at 1.0",
            ));
        }
        Ok(())
    }

    /// Sample the track at absolute time `t_secs` since attach.
    pub fn sample(&self, t_secs: f64) -> f64 {
        let u = (t_secs / self.period_secs).rem_euclid(1.0);

        let idx = self.keys.partition_point(|k| k.at <= u);
        if idx == 0 {
            return self.keys[0].value;
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value;
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        let span = b.at - a.at;
        if span <= 0.0 {
            return a.value;
        }
        let t = a.ease.apply((u - a.at) / span);
        a.value + (b.value - a.value) * t
    }
}

/// Hold-then-retract track used by the pet overlay: `rest` at the cycle edges,
/// `contact` held through the `dwell` window around the midpoint.
pub(crate) fn dwell_track(
    property: TweenProperty,
    period_secs: f64,
    rest: f64,
    contact: f64,
    dwell: (f64, f64),
) -> Track {
    Track {
        property,
        period_secs,
        keys: vec![
            Key::linear(0.0, rest),
            Key::linear(dwell.0, contact),
            Key::linear(dwell.1, contact),
            Key::linear(1.0, rest),
        ],
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/tween.rs"]
mod tests;
//! Serializable animation configuration describing per-node tween tracks.

use serde::{Deserialize, Serialize};

use crate::foundation::error::{EngineError, EngineResult};

/// Declarative animation attached to a node.
///
/// One full cycle of any type lasts `2 / speed` seconds. At most one config is
/// attached per node; installing a new one atomically tears down the previous
/// tween set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnimationConfig {
    /// No animation (explicit off state).
    None,
    /// Horizontal jitter through base ± 10 units (yoyo).
    Shake {
        /// Cycles per 2 seconds; must be > 0.
        speed: f64,
    },
    /// Full 360° rotation per cycle (wraps, no yoyo).
    Spin {
        /// Cycles per 2 seconds; must be > 0.
        speed: f64,
    },
    /// Vertical hop 20 units up and back (yoyo).
    Bounce {
        /// Cycles per 2 seconds; must be > 0.
        speed: f64,
    },
    /// Uniform scale up to 1.2× and back (yoyo).
    Zoom {
        /// Cycles per 2 seconds; must be > 0.
        speed: f64,
    },
    /// Horizontal glide 40 units right and back (yoyo).
    Slide {
        /// Cycles per 2 seconds; must be > 0.
        speed: f64,
    },
    /// Horizontal mirror flip through scale_x = 0 (yoyo).
    Flip {
        /// Cycles per 2 seconds; must be > 0.
        speed: f64,
    },
    /// Patting hand overlay above the node; the node itself is untouched.
    Pet {
        /// Cycles per 2 seconds; must be > 0.
        speed: f64,
        /// Horizontal hand position, 0..=100 (50 is centered).
        hand_x: f64,
        /// Vertical bias in percent of node height, -20..=20.
        hand_y: f64,
        /// Rest height of the hand above the node in percent, 20..=100.
        pat_distance: f64,
    },
}

impl AnimationConfig {
    /// `true` for the explicit off state.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Cycle speed, or `None` for the off state.
    pub fn speed(&self) -> Option<f64> {
        match *self {
            Self::None => None,
            Self::Shake { speed }
            | Self::Spin { speed }
            | Self::Bounce { speed }
            | Self::Zoom { speed }
            | Self::Slide { speed }
            | Self::Flip { speed }
            | Self::Pet { speed, .. } => Some(speed),
        }
    }

    /// Duration of one full cycle in seconds (`2 / speed`).
    pub fn cycle_secs(&self) -> Option<f64> {
        self.speed().map(|s| 2.0 / s)
    }

    /// Validate static invariants for this config.
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(speed) = self.speed()
            && (!speed.is_finite() || speed <= 0.0)
        {
            return Err(EngineError::validation(
                "animation speed must be finite and > 0",
            ));
        }
        if let Self::Pet {
            hand_x,
            hand_y,
            pat_distance,
            ..
        } = *self
        {
            if !(0.0..=100.0).contains(&hand_x) {
                return Err(EngineError::validation("pet hand_x must be in 0..=100"));
            }
            if !(-20.0..=20.0).contains(&hand_y) {
                return Err(EngineError::validation("pet hand_y must be in -20..=20"));
            }
            if !(20.0..=100.0).contains(&pat_distance) {
                return Err(EngineError::validation(
                    "pet pat_distance must be in 20..=100",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/config.rs"]
mod tests;
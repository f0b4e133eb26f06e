//! Declarative node animations compiled to periodic keyframe tracks.

pub mod config;
pub mod engine;
pub mod tween;

pub use config::AnimationConfig;
pub use engine::{AnimationEngine, PetOverlay, TransformOverride};
pub use tween::{Ease, Track, TweenProperty};

//! Emoteforge is the canvas editing and export engine behind an emote
//! creation studio.
//!
//! The engine owns the hard parts and nothing else: a mutable scene graph of
//! heterogeneous nodes ([`scene::Stage`]), trim-window video playback
//! ([`video::VideoNode`]), a declarative tween system
//! ([`animation::AnimationEngine`]), whole-layer snapshot undo/redo, and a
//! multi-format export pipeline ([`export`]) that coordinates with an external
//! transcoding collaborator and verifies its output. Product glue (listing,
//! checkout, persistence, auth) stays behind the narrow traits in
//! [`services`].
//!
//! Scheduling is single-threaded and cooperative: callers drive the clock via
//! [`scene::Stage::advance`] and the exporters' virtual frame loops. The one
//! parallel section is GIF frame quantization, which fans out over a rayon
//! worker pool while pixel capture stays on the calling thread.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod animation;
pub mod assets;
pub mod export;
pub mod history;
pub mod render;
pub mod scene;
pub mod services;
pub mod video;

pub use crate::foundation::core::{Affine, BezPath, Canvas, Point, Rect, Rgba8Premul, Vec2};
pub use crate::foundation::error::{EngineError, EngineResult};

pub use crate::animation::config::AnimationConfig;
pub use crate::animation::engine::{AnimationEngine, PetOverlay, TransformOverride};
pub use crate::assets::loader::{LocalFetcher, ResourceLoader};
pub use crate::export::gif::{GifArtifact, GifOpts, render_gif};
pub use crate::export::raster::{PngArtifact, SizePreset, render_png, render_sized_png};
pub use crate::export::video::{TrimService, VideoArtifact, render_trimmed_video};
pub use crate::render::compositor::{CpuCompositor, FrameRGBA, Rasterizer};
pub use crate::scene::layer::LayerKind;
pub use crate::scene::node::{Color, Node, NodeId, NodeKind, ShapeKind, TextOptions};
pub use crate::scene::stage::Stage;
pub use crate::video::controller::{MIN_TRIM_GAP_SECS, PlaybackState, VideoNode};

//! The mutable scene graph: stage, fixed layers, heterogeneous nodes.

pub mod layer;
pub mod node;
pub mod stage;

pub use layer::{Layer, LayerKind};
pub use node::{Color, Node, NodeId, NodeKind, ShapeKind, TextOptions};
pub use stage::{
    IMAGE_FIT_FRACTION, MAX_LAYER_NODES, STAGE_EDGE, Stage, VIDEO_FIT_FRACTION,
};

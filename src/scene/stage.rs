//! The stage: the mutable root of the scene graph and its clock.

use std::collections::HashSet;

use crate::animation::config::AnimationConfig;
use crate::animation::engine::{AnimationEngine, TweenBase};
use crate::assets::loader::ResourceLoader;
use crate::foundation::core::Canvas;
use crate::foundation::error::{EngineError, EngineResult};
use crate::history::History;
use crate::scene::layer::{Layer, LayerKind};
use crate::scene::node::{
    Color, ImageNode, Node, NodeId, NodeKind, PathNode, ShapeKind, ShapeNode, TextNode,
    TextOptions,
};
use crate::video::controller::VideoNode;

/// Logical edge length of the square stage in units.
pub const STAGE_EDGE: u32 = 512;

/// Fraction of the stage edge newly added images are scaled to fit.
pub const IMAGE_FIT_FRACTION: f64 = 0.3;

/// Fraction of the stage edge newly added videos are scaled to fit.
pub const VIDEO_FIT_FRACTION: f64 = 0.8;

/// Node ceiling per layer; keeps whole-layer history snapshots cheap.
pub const MAX_LAYER_NODES: usize = 30;

const DEFAULT_SHAPE_SIZE: f64 = 100.0;
const DEFAULT_SHAPE_FILL: Color = Color::rgb(0x4d, 0x94, 0xff);

/// The scene graph manager: five fixed layers of nodes, active-layer and
/// selection state, and the snapshot-before-mutate history hook.
pub struct Stage {
    canvas: Canvas,
    layers: Vec<Layer>,
    active: LayerKind,
    selection: Option<NodeId>,
    overlays_enabled: bool,
    clock_secs: f64,
    next_id: u64,
    history: History,
    anim: AnimationEngine,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    /// Create an empty stage with the fixed layer set.
    pub fn new() -> Self {
        Self {
            canvas: Canvas {
                width: STAGE_EDGE,
                height: STAGE_EDGE,
            },
            layers: LayerKind::ALL.iter().map(|&k| Layer::new(k)).collect(),
            active: LayerKind::Main,
            selection: None,
            overlays_enabled: true,
            clock_secs: 0.0,
            next_id: 1,
            history: History::new(),
            anim: AnimationEngine::new(),
        }
    }

    /// Stage surface dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Engine clock in seconds, advanced by [`Stage::advance`].
    pub fn clock_secs(&self) -> f64 {
        self.clock_secs
    }

    /// Advance the engine clock and tick every playing video.
    pub fn advance(&mut self, dt_secs: f64) {
        self.clock_secs += dt_secs.max(0.0);
        for layer in &mut self.layers {
            for node in layer.nodes_mut() {
                if let NodeKind::Video(v) = &mut node.kind {
                    v.advance(dt_secs.max(0.0));
                }
            }
        }
    }

    /// Layers in paint order, back to front.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Borrow one fixed layer.
    pub fn layer(&self, kind: LayerKind) -> &Layer {
        &self.layers[kind.index()]
    }

    fn layer_mut(&mut self, kind: LayerKind) -> &mut Layer {
        &mut self.layers[kind.index()]
    }

    /// The layer new nodes land on and history snapshots track.
    pub fn active_layer(&self) -> LayerKind {
        self.active
    }

    /// Switch the active layer. Never reparents existing nodes.
    pub fn set_active_layer(&mut self, kind: LayerKind) {
        self.active = kind;
    }

    /// Currently selected node id, if any.
    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    /// Borrow the currently selected node, if any.
    pub fn selected_node(&self) -> Option<&Node> {
        self.selection.and_then(|id| self.node(id))
    }

    /// Select `id` (or clear with `None`). The selection is exclusive:
    /// selecting a node implicitly deselects the previous one.
    pub fn select(&mut self, id: Option<NodeId>) -> EngineResult<()> {
        if let Some(id) = id
            && self.node(id).is_none()
        {
            return Err(EngineError::validation(format!(
                "cannot select unknown node {}",
                id.0
            )));
        }
        self.selection = id;
        Ok(())
    }

    /// Whether the selection transformer overlay is drawn.
    pub fn overlays_enabled(&self) -> bool {
        self.overlays_enabled
    }

    pub(crate) fn set_overlays_enabled(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.overlays_enabled, enabled)
    }

    /// Read-only view of the animation engine.
    pub fn animations(&self) -> &AnimationEngine {
        &self.anim
    }

    /// Find a node anywhere on the stage.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.layers.iter().find_map(|l| l.get(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.layers.iter_mut().find_map(|l| l.get_mut(id))
    }

    /// The layer a node currently lives on.
    pub fn layer_of(&self, id: NodeId) -> Option<LayerKind> {
        self.layers
            .iter()
            .find(|l| l.index_of(id).is_some())
            .map(Layer::kind)
    }

    /// Total node count across all layers.
    pub fn total_nodes(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn require_selection(&self) -> EngineResult<NodeId> {
        self.selection
            .ok_or_else(|| EngineError::invalid_selection("no node selected"))
    }

    fn snapshot_active(&mut self) {
        self.history
            .snapshot(self.layers[self.active.index()].nodes());
    }

    fn ensure_capacity(&self) -> EngineResult<()> {
        if self.layer(self.active).len() >= MAX_LAYER_NODES {
            return Err(EngineError::validation(format!(
                "layer '{}' is full ({MAX_LAYER_NODES} nodes)",
                self.active.name()
            )));
        }
        Ok(())
    }

    fn place_centered(node: &mut Node, fraction: f64) {
        let (w, h) = node.intrinsic_size();
        if w > 0.0 && h > 0.0 {
            // Rounding the fitted scale avoids sub-pixel sampling blur.
            let scale = (f64::from(STAGE_EDGE) * fraction / w.max(h) * 100.0).round() / 100.0;
            let scale = scale.max(0.01);
            node.scale_x = scale;
            node.scale_y = scale;
        }
        node.x = f64::from(STAGE_EDGE) / 2.0;
        node.y = f64::from(STAGE_EDGE) / 2.0;
    }

    fn insert(&mut self, mut node: Node, fit_fraction: Option<f64>) -> NodeId {
        if let Some(fraction) = fit_fraction {
            Self::place_centered(&mut node, fraction);
        } else {
            node.x = f64::from(STAGE_EDGE) / 2.0;
            node.y = f64::from(STAGE_EDGE) / 2.0;
        }
        let id = node.id;
        self.snapshot_active();
        self.layer_mut(self.active).push(node);
        self.selection = Some(id);
        id
    }

    /// Load `url` and add it as an image node on the active layer.
    ///
    /// A load failure aborts before any mutation: the scene, selection and
    /// history are left exactly as they were.
    pub fn add_image(&mut self, loader: &mut ResourceLoader, url: &str) -> EngineResult<NodeId> {
        self.ensure_capacity()?;
        let handle = loader.load(url)?;
        let node = Node::new(self.alloc_id(), NodeKind::Image(ImageNode { handle }));
        Ok(self.insert(node, Some(IMAGE_FIT_FRACTION)))
    }

    /// Load `url` and add it as a video node on the active layer.
    pub fn add_video(&mut self, loader: &mut ResourceLoader, url: &str) -> EngineResult<NodeId> {
        self.ensure_capacity()?;
        let handle = loader.load_video(url)?;
        let node = Node::new(
            self.alloc_id(),
            NodeKind::Video(VideoNode::from_handle(handle)),
        );
        Ok(self.insert(node, Some(VIDEO_FIT_FRACTION)))
    }

    /// Add a shape node on the active layer.
    pub fn add_shape(&mut self, kind: ShapeKind) -> EngineResult<NodeId> {
        self.ensure_capacity()?;
        let node = Node::new(
            self.alloc_id(),
            NodeKind::Shape(ShapeNode {
                kind,
                fill: DEFAULT_SHAPE_FILL,
                stroke: None,
                stroke_width: 0.0,
                size: DEFAULT_SHAPE_SIZE,
            }),
        );
        Ok(self.insert(node, None))
    }

    /// Add a text node on the active layer.
    pub fn add_text(&mut self, text: impl Into<String>, options: TextOptions) -> EngineResult<NodeId> {
        self.ensure_capacity()?;
        let text = text.into();
        if text.is_empty() {
            return Err(EngineError::validation("text nodes must be non-empty"));
        }
        let node = Node::new(
            self.alloc_id(),
            NodeKind::Text(TextNode {
                text,
                font_source: options.font_source,
                size: options.size,
                fill: options.fill,
            }),
        );
        Ok(self.insert(node, None))
    }

    /// Add a free-form path node on the active layer.
    pub fn add_path(&mut self, path: crate::foundation::core::BezPath, fill: Color) -> EngineResult<NodeId> {
        self.ensure_capacity()?;
        let node = Node::new(self.alloc_id(), NodeKind::Path(PathNode { path, fill }));
        Ok(self.insert(node, None))
    }

    /// Remove the selected node and return it (its media resources are
    /// released when the returned node is dropped).
    pub fn remove_selected(&mut self) -> EngineResult<Node> {
        let id = self.require_selection()?;
        self.snapshot_active();
        let node = self
            .layers
            .iter_mut()
            .find_map(|l| l.remove(id))
            .ok_or_else(|| EngineError::validation("selected node missing from all layers"))?;
        self.anim.clear(id);
        self.selection = None;
        Ok(node)
    }

    /// Swap the selected node with its next-upper neighbor in its own layer.
    /// Returns `false` when the node is already on top.
    pub fn bring_forward(&mut self) -> EngineResult<bool> {
        self.reorder_selected(1)
    }

    /// Swap the selected node with its next-lower neighbor in its own layer.
    /// Returns `false` when the node is already at the bottom.
    pub fn send_backward(&mut self) -> EngineResult<bool> {
        self.reorder_selected(-1)
    }

    fn reorder_selected(&mut self, dir: i64) -> EngineResult<bool> {
        let id = self.require_selection()?;
        let kind = self
            .layer_of(id)
            .ok_or_else(|| EngineError::validation("selected node missing from all layers"))?;
        let layer = self.layer(kind);
        let Some(idx) = layer.index_of(id) else {
            return Ok(false);
        };
        let target = idx as i64 + dir;
        if target < 0 || target >= layer.len() as i64 {
            return Ok(false);
        }
        self.snapshot_active();
        self.layer_mut(kind).nodes_mut().swap(idx, target as usize);
        Ok(true)
    }

    /// Set the fill color of the selected node. No-op on variants without a fill.
    pub fn set_fill(&mut self, color: Color) -> EngineResult<()> {
        let id = self.require_selection()?;
        if !self.node(id).is_some_and(Node::supports_fill) {
            return Ok(());
        }
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.set_fill(color);
        }
        Ok(())
    }

    /// Set the stroke color of the selected node. No-op on variants without a stroke.
    pub fn set_stroke(&mut self, color: Option<Color>) -> EngineResult<()> {
        let id = self.require_selection()?;
        if !self.node(id).is_some_and(Node::supports_stroke) {
            return Ok(());
        }
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.set_stroke(color);
        }
        Ok(())
    }

    /// Set the stroke width of the selected node. No-op on variants without a stroke.
    pub fn set_stroke_width(&mut self, width: f64) -> EngineResult<()> {
        let id = self.require_selection()?;
        if !self.node(id).is_some_and(Node::supports_stroke) {
            return Ok(());
        }
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.set_stroke_width(width);
        }
        Ok(())
    }

    /// Set the opacity of the selected node, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f64) -> EngineResult<()> {
        let id = self.require_selection()?;
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.opacity = opacity.clamp(0.0, 1.0);
        }
        Ok(())
    }

    /// Set the font source of the selected node. No-op on non-text variants.
    pub fn set_font_family(&mut self, font_source: &str) -> EngineResult<()> {
        let id = self.require_selection()?;
        if !self.node(id).is_some_and(Node::supports_font) {
            return Ok(());
        }
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.set_font_source(font_source);
        }
        Ok(())
    }

    /// Set the font size of the selected node. No-op on non-text variants.
    pub fn set_font_size(&mut self, size: f64) -> EngineResult<()> {
        let id = self.require_selection()?;
        if !self.node(id).is_some_and(Node::supports_font) {
            return Ok(());
        }
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.set_font_size(size);
        }
        Ok(())
    }

    /// Move the selected node.
    pub fn set_position(&mut self, x: f64, y: f64) -> EngineResult<()> {
        let id = self.require_selection()?;
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.x = x;
            n.y = y;
        }
        Ok(())
    }

    /// Scale the selected node.
    pub fn set_scale(&mut self, sx: f64, sy: f64) -> EngineResult<()> {
        let id = self.require_selection()?;
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.scale_x = sx;
            n.scale_y = sy;
        }
        Ok(())
    }

    /// Rotate the selected node.
    pub fn set_rotation(&mut self, degrees: f64) -> EngineResult<()> {
        let id = self.require_selection()?;
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.rotation_deg = degrees;
        }
        Ok(())
    }

    /// Toggle dragging for the selected node.
    pub fn set_draggable(&mut self, draggable: bool) -> EngineResult<()> {
        let id = self.require_selection()?;
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.draggable = draggable;
        }
        Ok(())
    }

    /// Tag or untag the selected node for local mask generation.
    pub fn set_mask_tag(&mut self, mask_tag: bool) -> EngineResult<()> {
        let id = self.require_selection()?;
        self.snapshot_active();
        if let Some(n) = self.node_mut(id) {
            n.mask_tag = mask_tag;
        }
        Ok(())
    }

    /// Swap the selected image node's pixels for `handle`, preserving its
    /// transform. Used by the background-removal and inpainting bridges.
    pub fn replace_selected_image(
        &mut self,
        handle: crate::assets::loader::ImageHandle,
    ) -> EngineResult<()> {
        let id = self.require_selection()?;
        let is_image = matches!(
            self.node(id).map(|n| &n.kind),
            Some(NodeKind::Image(_))
        );
        if !is_image {
            return Err(EngineError::invalid_selection(
                "selected node is not an image",
            ));
        }
        self.snapshot_active();
        if let Some(node) = self.node_mut(id)
            && let NodeKind::Image(img) = &mut node.kind
        {
            img.handle = handle;
        }
        Ok(())
    }

    /// Remove every node on `kind`, clearing the selection if it lived there.
    pub fn clear(&mut self, kind: LayerKind) {
        self.snapshot_active();
        let ids: Vec<NodeId> = self.layer(kind).nodes().iter().map(|n| n.id).collect();
        for id in &ids {
            self.anim.clear(*id);
        }
        self.layer_mut(kind).replace_nodes(Vec::new());
        if let Some(sel) = self.selection
            && ids.contains(&sel)
        {
            self.selection = None;
        }
    }

    /// Attach (or with `None` detach) an animation on the selected node.
    ///
    /// The previous tween set is torn down before the new one is installed;
    /// there is never a moment with two overlapping sets on one node.
    pub fn set_animation(&mut self, config: Option<AnimationConfig>) -> EngineResult<()> {
        let id = self
            .selection
            .ok_or_else(|| EngineError::animation_target("no node selected"))?;
        if let Some(cfg) = &config {
            cfg.validate()?;
        }

        self.snapshot_active();
        let normalized = config.filter(|c| !c.is_none());
        self.anim.clear(id);
        if let Some(cfg) = normalized {
            let base = self
                .node(id)
                .map(tween_base_of)
                .ok_or_else(|| EngineError::validation("selected node missing from all layers"))?;
            self.anim.install(id, base, &cfg)?;
        }
        if let Some(n) = self.node_mut(id) {
            n.animation = normalized;
        }
        Ok(())
    }

    /// Undo the last mutation of the active layer. Returns `false` when the
    /// undo stack is empty.
    pub fn undo(&mut self) -> bool {
        let idx = self.active.index();
        let Some(restored) = self.history.undo(self.layers[idx].nodes()) else {
            return false;
        };
        self.layers[idx].replace_nodes(restored);
        self.after_history_restore();
        true
    }

    /// Re-apply the last undone mutation. Returns `false` when the redo stack
    /// is empty.
    pub fn redo(&mut self) -> bool {
        let idx = self.active.index();
        let Some(restored) = self.history.redo(self.layers[idx].nodes()) else {
            return false;
        };
        self.layers[idx].replace_nodes(restored);
        self.after_history_restore();
        true
    }

    /// Number of undoable history entries.
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Number of redoable history entries.
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Re-sync selection and tween sets after a history restore: drop state
    /// for nodes that vanished and re-install tweens for restored nodes whose
    /// animation attribute survived the snapshot.
    fn after_history_restore(&mut self) {
        let live: HashSet<NodeId> = self
            .layers
            .iter()
            .flat_map(|l| l.nodes().iter().map(|n| n.id))
            .collect();

        if let Some(sel) = self.selection
            && !live.contains(&sel)
        {
            self.selection = None;
        }
        self.anim.retain_nodes(&live);

        let stale: Vec<NodeId> = self
            .layers
            .iter()
            .flat_map(|l| l.nodes().iter())
            .filter(|n| n.animation.is_none() && self.anim.is_attached(n.id))
            .map(|n| n.id)
            .collect();
        for id in stale {
            self.anim.clear(id);
        }

        let missing: Vec<(NodeId, TweenBase, AnimationConfig)> = self
            .layers
            .iter()
            .flat_map(|l| l.nodes().iter())
            .filter(|n| !self.anim.is_attached(n.id))
            .filter_map(|n| n.animation.map(|cfg| (n.id, tween_base_of(n), cfg)))
            .collect();
        for (id, base, cfg) in missing {
            // Config was validated when first attached; a failure here would
            // only repeat that validation, so it is safe to ignore.
            let _ = self.anim.install(id, base, &cfg);
        }
    }

    // ------------------------------------------------------------------
    // Video controller surface (delegates to the selected video node)
    // ------------------------------------------------------------------

    fn require_selected_video(&self) -> EngineResult<NodeId> {
        let id = self.require_selection()?;
        if self.node(id).and_then(Node::as_video).is_none() {
            return Err(EngineError::invalid_selection(
                "selected node is not a video",
            ));
        }
        Ok(id)
    }

    /// Reconstruct the selected video's media handle if it was lost.
    pub fn ensure_video_ready(&mut self, loader: &mut ResourceLoader) -> EngineResult<()> {
        let id = self.require_selected_video()?;
        self.node_mut(id)
            .and_then(Node::as_video_mut)
            .ok_or_else(|| EngineError::validation("selected node missing from all layers"))?
            .ensure_ready(loader)
    }

    /// Move the selected video's trim window start (clamped). Guarded no-op
    /// before the video is ready.
    pub fn set_trim_start(&mut self, t: f64) -> EngineResult<()> {
        let id = self.require_selected_video()?;
        let ready = self
            .node(id)
            .and_then(Node::as_video)
            .is_some_and(VideoNode::is_ready);
        if !ready {
            return Ok(());
        }
        self.snapshot_active();
        if let Some(v) = self.node_mut(id).and_then(Node::as_video_mut) {
            v.set_start_time(t);
        }
        Ok(())
    }

    /// Move the selected video's trim window end (clamped). Guarded no-op
    /// before the video is ready.
    pub fn set_trim_end(&mut self, t: f64) -> EngineResult<()> {
        let id = self.require_selected_video()?;
        let ready = self
            .node(id)
            .and_then(Node::as_video)
            .is_some_and(VideoNode::is_ready);
        if !ready {
            return Ok(());
        }
        self.snapshot_active();
        if let Some(v) = self.node_mut(id).and_then(Node::as_video_mut) {
            v.set_end_time(t);
        }
        Ok(())
    }

    /// Start playback of the selected video. Multiple videos may play at once.
    pub fn play_video(&mut self) -> EngineResult<()> {
        let id = self.require_selected_video()?;
        if let Some(v) = self.node_mut(id).and_then(Node::as_video_mut) {
            v.play();
        }
        Ok(())
    }

    /// Pause playback of the selected video.
    pub fn pause_video(&mut self) -> EngineResult<()> {
        let id = self.require_selected_video()?;
        if let Some(v) = self.node_mut(id).and_then(Node::as_video_mut) {
            v.pause();
        }
        Ok(())
    }

    /// Seek the selected video inside its trim window.
    pub fn seek_video(&mut self, t: f64) -> EngineResult<()> {
        let id = self.require_selected_video()?;
        if let Some(v) = self.node_mut(id).and_then(Node::as_video_mut) {
            v.seek(t);
        }
        Ok(())
    }

    /// Set a paint-time visual parameter of the selected video.
    pub fn set_video_brightness(&mut self, percent: f64) -> EngineResult<()> {
        self.set_video_param(|v, value| v.brightness = value, percent, 0.0, 200.0)
    }

    /// Set the selected video's contrast in percent.
    pub fn set_video_contrast(&mut self, percent: f64) -> EngineResult<()> {
        self.set_video_param(|v, value| v.contrast = value, percent, 0.0, 200.0)
    }

    /// Set the selected video's saturation in percent.
    pub fn set_video_saturation(&mut self, percent: f64) -> EngineResult<()> {
        self.set_video_param(|v, value| v.saturation = value, percent, 0.0, 200.0)
    }

    /// Set the selected video's volume in `[0, 1]`.
    pub fn set_video_volume(&mut self, volume: f64) -> EngineResult<()> {
        self.set_video_param(|v, value| v.volume = value, volume, 0.0, 1.0)
    }

    /// Set the selected video's playback rate multiplier.
    pub fn set_video_playback_rate(&mut self, rate: f64) -> EngineResult<()> {
        self.set_video_param(|v, value| v.playback_rate = value, rate, 0.1, 4.0)
    }

    fn set_video_param(
        &mut self,
        apply: impl FnOnce(&mut VideoNode, f64),
        value: f64,
        min: f64,
        max: f64,
    ) -> EngineResult<()> {
        let id = self.require_selected_video()?;
        self.snapshot_active();
        if let Some(v) = self.node_mut(id).and_then(Node::as_video_mut) {
            apply(v, value.clamp(min, max));
        }
        Ok(())
    }
}

fn tween_base_of(node: &Node) -> TweenBase {
    TweenBase {
        x: node.x,
        y: node.y,
        rotation_deg: node.rotation_deg,
        scale_x: node.scale_x,
        scale_y: node.scale_y,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/stage.rs"]
mod tests;
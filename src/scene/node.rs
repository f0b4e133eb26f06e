//! Heterogeneous scene-graph nodes and their kinds.

use kurbo::Shape;
use serde::{Deserialize, Serialize};

use crate::animation::config::AnimationConfig;
use crate::assets::loader::ImageHandle;
use crate::foundation::core::{BezPath, Point, Rect};
use crate::video::controller::VideoNode;

/// Stable node identifier, unique within one stage.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

/// Straight-alpha RGBA8 color used for fills and strokes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Opaque color from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color from RGBA components.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Closed set of shape variants supported by the shape tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// Axis-aligned square.
    Rect,
    /// Circle.
    Circle,
    /// Upward-pointing triangle.
    Triangle,
    /// Downward-pointing triangle.
    InvertedTriangle,
    /// Diamond (square rotated 45°).
    Diamond,
}

/// Options for the text tool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextOptions {
    /// Loader-relative path of the font file to shape with.
    pub font_source: String,
    /// Font size in stage units.
    pub size: f64,
    /// Fill color.
    pub fill: Color,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font_source: "fonts/default.ttf".to_owned(),
            size: 32.0,
            fill: Color::rgb(0, 0, 0),
        }
    }
}

/// Image node payload.
#[derive(Clone, Debug)]
pub struct ImageNode {
    /// Loaded pixels plus the source url that produced them.
    pub handle: ImageHandle,
}

/// Shape node payload.
#[derive(Clone, Debug)]
pub struct ShapeNode {
    /// Shape variant.
    pub kind: ShapeKind,
    /// Fill color.
    pub fill: Color,
    /// Optional stroke color.
    pub stroke: Option<Color>,
    /// Stroke width in stage units.
    pub stroke_width: f64,
    /// Base edge/diameter in stage units before node scale.
    pub size: f64,
}

impl ShapeNode {
    /// Outline of this shape centered on the origin.
    pub fn outline(&self) -> BezPath {
        let h = self.size / 2.0;
        match self.kind {
            ShapeKind::Rect => Rect::new(-h, -h, h, h).to_path(0.1),
            ShapeKind::Circle => kurbo::Circle::new(Point::ORIGIN, h).to_path(0.1),
            ShapeKind::Triangle => polygon(&[(0.0, -h), (h, h), (-h, h)]),
            ShapeKind::InvertedTriangle => polygon(&[(-h, -h), (h, -h), (0.0, h)]),
            ShapeKind::Diamond => polygon(&[(0.0, -h), (h, 0.0), (0.0, h), (-h, 0.0)]),
        }
    }
}

fn polygon(points: &[(f64, f64)]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(&(x, y)) = iter.next() {
        path.move_to(Point::new(x, y));
        for &(x, y) in iter {
            path.line_to(Point::new(x, y));
        }
        path.close_path();
    }
    path
}

/// Text node payload.
#[derive(Clone, Debug)]
pub struct TextNode {
    /// Text content.
    pub text: String,
    /// Loader-relative path of the font file.
    pub font_source: String,
    /// Font size in stage units.
    pub size: f64,
    /// Fill color.
    pub fill: Color,
}

/// Free-form path node payload (pen/line tool output).
#[derive(Clone, Debug)]
pub struct PathNode {
    /// Outline to fill, in node-local coordinates around the origin.
    pub path: BezPath,
    /// Fill color.
    pub fill: Color,
}

/// Tagged node payload.
///
/// Matching is exhaustive everywhere; there is deliberately no "is this image
/// secretly part of a video group" escape hatch.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Raster image.
    Image(ImageNode),
    /// Vector shape.
    Shape(ShapeNode),
    /// Laid-out text.
    Text(TextNode),
    /// Free-form filled path.
    Path(PathNode),
    /// Video-backed surface with a trim window.
    Video(VideoNode),
}

/// One visual object in the scene graph.
#[derive(Clone, Debug)]
pub struct Node {
    /// Identifier, stable across history snapshots.
    pub id: NodeId,
    /// Horizontal center position in stage units.
    pub x: f64,
    /// Vertical center position in stage units.
    pub y: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in degrees.
    pub rotation_deg: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Whether interactive dragging is allowed (UI concern, carried on the model).
    pub draggable: bool,
    /// Whether this node participates in local mask generation.
    pub mask_tag: bool,
    /// Attached animation, if any.
    pub animation: Option<AnimationConfig>,
    /// Variant payload.
    pub kind: NodeKind,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation_deg: 0.0,
            opacity: 1.0,
            draggable: true,
            mask_tag: false,
            animation: None,
            kind,
        }
    }

    /// Unscaled width/height of the node's visual content in stage units.
    ///
    /// Text measures as a rough glyph-box estimate; exact metrics belong to
    /// the compositor's layout pass.
    pub fn intrinsic_size(&self) -> (f64, f64) {
        match &self.kind {
            NodeKind::Image(img) => (f64::from(img.handle.image.width), f64::from(img.handle.image.height)),
            NodeKind::Shape(s) => (s.size, s.size),
            NodeKind::Text(t) => (t.text.chars().count() as f64 * t.size * 0.6, t.size * 1.2),
            NodeKind::Path(p) => {
                let bbox = p.path.bounding_box();
                (bbox.width(), bbox.height())
            }
            NodeKind::Video(v) => v
                .handle()
                .map(|h| (f64::from(h.probe.width), f64::from(h.probe.height)))
                .unwrap_or((0.0, 0.0)),
        }
    }

    /// Borrow the video payload, if this is a video node.
    pub fn as_video(&self) -> Option<&VideoNode> {
        match &self.kind {
            NodeKind::Video(v) => Some(v),
            _ => None,
        }
    }

    /// Mutably borrow the video payload, if this is a video node.
    pub fn as_video_mut(&mut self) -> Option<&mut VideoNode> {
        match &mut self.kind {
            NodeKind::Video(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn supports_fill(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Shape(_) | NodeKind::Text(_) | NodeKind::Path(_)
        )
    }

    pub(crate) fn set_fill(&mut self, color: Color) {
        match &mut self.kind {
            NodeKind::Shape(s) => s.fill = color,
            NodeKind::Text(t) => t.fill = color,
            NodeKind::Path(p) => p.fill = color,
            NodeKind::Image(_) | NodeKind::Video(_) => {}
        }
    }

    pub(crate) fn supports_stroke(&self) -> bool {
        matches!(self.kind, NodeKind::Shape(_))
    }

    pub(crate) fn set_stroke(&mut self, color: Option<Color>) {
        if let NodeKind::Shape(s) = &mut self.kind {
            s.stroke = color;
        }
    }

    pub(crate) fn set_stroke_width(&mut self, width: f64) {
        if let NodeKind::Shape(s) = &mut self.kind {
            s.stroke_width = width.max(0.0);
        }
    }

    pub(crate) fn supports_font(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    pub(crate) fn set_font_source(&mut self, source: &str) {
        if let NodeKind::Text(t) = &mut self.kind {
            t.font_source = source.to_owned();
        }
    }

    pub(crate) fn set_font_size(&mut self, size: f64) {
        if let NodeKind::Text(t) = &mut self.kind {
            t.size = size.max(1.0);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/node.rs"]
mod tests;
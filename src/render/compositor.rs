//! CPU compositor that rasterizes the stage into premultiplied RGBA frames.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::decode::PreparedImage;
use crate::assets::loader::normalize_rel_path;
use crate::assets::media::{FfmpegDecoder, VideoDecoder};
use crate::foundation::core::Affine;
use crate::foundation::error::{EngineError, EngineResult};
use crate::render::text::{TextBrushRgba8, TextLayoutEngine};
use crate::scene::node::{Color, Node, NodeKind};
use crate::scene::stage::Stage;
use crate::video::controller::VideoNode;

/// One rendered frame in row-major premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

/// Renders the live stage into frames.
///
/// The export pipeline is generic over this trait so tests can substitute a
/// failing or counting rasterizer.
pub trait Rasterizer {
    /// Rasterize the full stage at `time_secs` on the animation clock.
    fn rasterize(&mut self, stage: &Stage, time_secs: f64) -> EngineResult<FrameRGBA>;

    /// Composite mask-tagged nodes over an opaque black background.
    fn rasterize_mask(&mut self, stage: &Stage) -> EngineResult<FrameRGBA>;
}

const VIDEO_FRAME_CACHE_CAPACITY: usize = 64;

struct VideoFrameCache {
    frames: HashMap<u64, PreparedImage>,
    lru: VecDeque<u64>,
}

impl VideoFrameCache {
    fn new() -> Self {
        Self {
            frames: HashMap::new(),
            lru: VecDeque::new(),
        }
    }

    fn key_for_time(source_time_secs: f64) -> u64 {
        (source_time_secs.max(0.0) * 1000.0).round() as u64
    }

    fn get(&mut self, key: u64) -> Option<PreparedImage> {
        let hit = self.frames.get(&key).cloned();
        if hit.is_some() {
            self.touch(key);
        }
        hit
    }

    fn insert(&mut self, key: u64, frame: PreparedImage) {
        self.frames.insert(key, frame);
        self.touch(key);
        while self.lru.len() > VIDEO_FRAME_CACHE_CAPACITY {
            if let Some(old) = self.lru.pop_front() {
                self.frames.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.lru.iter().position(|x| *x == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }
}

struct CachedFont {
    bytes: Vec<u8>,
    font: vello_cpu::peniko::FontData,
}

/// CPU compositor powered by `vello_cpu` for vector/text rasterization.
pub struct CpuCompositor {
    assets_root: PathBuf,
    decoder: Box<dyn VideoDecoder>,

    ctx: Option<vello_cpu::RenderContext>,
    text_engine: TextLayoutEngine,
    font_cache: HashMap<String, Arc<CachedFont>>,
    video_cache: HashMap<String, VideoFrameCache>,
    matrix_scratch: Vec<u8>,
}

impl CpuCompositor {
    /// Create a compositor reading fonts below `assets_root`, decoding video
    /// frames with the system ffmpeg.
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
            decoder: Box::new(FfmpegDecoder),
            ctx: None,
            text_engine: TextLayoutEngine::new(),
            font_cache: HashMap::new(),
            video_cache: HashMap::new(),
            matrix_scratch: Vec::new(),
        }
    }

    /// Replace the video frame decoder (tests substitute a stub here).
    pub fn with_decoder(mut self, decoder: Box<dyn VideoDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    fn read_bytes(&self, rel: &str) -> EngineResult<Vec<u8>> {
        let norm = normalize_rel_path(rel)?;
        let p = self.assets_root.join(Path::new(&norm));
        std::fs::read(&p).map_err(|e| {
            EngineError::render(format!("failed to read asset '{}': {e}", p.display()))
        })
    }

    fn font_for(&mut self, source: &str) -> EngineResult<Arc<CachedFont>> {
        if let Some(hit) = self.font_cache.get(source) {
            return Ok(hit.clone());
        }
        let bytes = self.read_bytes(source)?;
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.clone()),
            0,
        );
        let cached = Arc::new(CachedFont { bytes, font });
        self.font_cache.insert(source.to_owned(), cached.clone());
        Ok(cached)
    }

    fn video_frame_for(&mut self, video: &VideoNode) -> EngineResult<PreparedImage> {
        let handle = video
            .handle()
            .ok_or_else(|| EngineError::render("video node has no media handle"))?;
        if video.position() == 0.0 {
            // The loader already decoded the first frame as the poster.
            return Ok(handle.poster.clone());
        }
        let source_key = handle.probe.source_path.display().to_string();
        let key = VideoFrameCache::key_for_time(video.position());

        let cache = self
            .video_cache
            .entry(source_key)
            .or_insert_with(VideoFrameCache::new);
        if let Some(frame) = cache.get(key) {
            return Ok(frame);
        }

        let frame = self.decoder.decode_frame(&handle.probe, video.position())?;
        self.video_cache
            .entry(handle.probe.source_path.display().to_string())
            .or_insert_with(VideoFrameCache::new)
            .insert(key, frame.clone());
        Ok(frame)
    }

    fn render_frame(
        &mut self,
        stage: &Stage,
        time_secs: f64,
        mask_only: bool,
    ) -> EngineResult<FrameRGBA> {
        let canvas = stage.canvas();
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| EngineError::render("stage width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| EngineError::render("stage height exceeds u16"))?;

        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        self.with_ctx_mut(width, height, |this, ctx| {
            if mask_only {
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(canvas.width),
                    f64::from(canvas.height),
                ));
            }

            for layer in stage.layers() {
                for node in layer.nodes() {
                    if mask_only && !node.mask_tag {
                        continue;
                    }
                    this.draw_node(stage, node, time_secs, ctx)?;
                }
            }

            if !mask_only
                && stage.overlays_enabled()
                && let Some(selected) = stage.selected_node()
            {
                draw_selection_overlay(stage, selected, time_secs, ctx);
            }

            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(())
        })?;

        Ok(FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
        })
    }

    fn draw_node(
        &mut self,
        stage: &Stage,
        node: &Node,
        time_secs: f64,
        ctx: &mut vello_cpu::RenderContext,
    ) -> EngineResult<()> {
        let placement = animated_placement(stage, node, time_secs);
        let opacity = node.opacity.clamp(0.0, 1.0) as f32;
        if opacity <= 0.0 {
            return Ok(());
        }

        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        match &node.kind {
            NodeKind::Image(img) => {
                let prepared = &img.handle.image;
                let paint = image_paint(prepared)?;
                let (w, h) = (f64::from(prepared.width), f64::from(prepared.height));
                let tr = placement.content_transform(w, h);
                ctx.set_transform(affine_to_cpu(tr));
                ctx.set_paint(paint);
                if opacity < 1.0 {
                    ctx.push_opacity_layer(opacity);
                }
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
                if opacity < 1.0 {
                    ctx.pop_layer();
                }
            }
            NodeKind::Video(video) => {
                let frame = self.video_frame_for(video)?;
                let frame = self.apply_video_matrix(video, frame)?;
                let paint = image_paint(&frame)?;
                let (w, h) = (f64::from(frame.width), f64::from(frame.height));
                let tr = placement.content_transform(w, h);
                ctx.set_transform(affine_to_cpu(tr));
                ctx.set_paint(paint);
                if opacity < 1.0 {
                    ctx.push_opacity_layer(opacity);
                }
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
                if opacity < 1.0 {
                    ctx.pop_layer();
                }
            }
            NodeKind::Shape(shape) => {
                ctx.set_transform(affine_to_cpu(placement.centered_transform()));
                if opacity < 1.0 {
                    ctx.push_opacity_layer(opacity);
                }
                if let Some(stroke) = shape.stroke
                    && shape.stroke_width > 0.0
                {
                    // Stroke as a grown silhouette underneath the fill.
                    let grown = shape_outline_grown(shape, shape.stroke_width);
                    ctx.set_paint(color_paint(stroke));
                    ctx.fill_path(&bezpath_to_cpu(&grown));
                }
                ctx.set_paint(color_paint(shape.fill));
                ctx.fill_path(&bezpath_to_cpu(&shape.outline()));
                if opacity < 1.0 {
                    ctx.pop_layer();
                }
            }
            NodeKind::Path(path) => {
                ctx.set_transform(affine_to_cpu(placement.centered_transform()));
                ctx.set_paint(color_paint(path.fill));
                if opacity < 1.0 {
                    ctx.push_opacity_layer(opacity);
                }
                ctx.fill_path(&bezpath_to_cpu(&path.path));
                if opacity < 1.0 {
                    ctx.pop_layer();
                }
            }
            NodeKind::Text(text) => {
                let cached = self.font_for(&text.font_source)?;
                let brush = TextBrushRgba8 {
                    r: text.fill.r,
                    g: text.fill.g,
                    b: text.fill.b,
                    a: text.fill.a,
                };
                let layout = self.text_engine.layout_plain(
                    &text.text,
                    &cached.bytes,
                    text.size as f32,
                    brush,
                )?;
                let (w, h) = (f64::from(layout.width()), f64::from(layout.height()));
                let tr = placement.content_transform(w, h);
                ctx.set_transform(affine_to_cpu(tr));
                if opacity < 1.0 {
                    ctx.push_opacity_layer(opacity);
                }
                for line in layout.lines() {
                    for item in line.items() {
                        let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                            continue;
                        };
                        let b = run.style().brush;
                        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                        let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        });
                        ctx.glyph_run(&cached.font)
                            .font_size(run.run().font_size())
                            .fill_glyphs(glyphs);
                    }
                }
                if opacity < 1.0 {
                    ctx.pop_layer();
                }
            }
        }

        Ok(())
    }

    fn apply_video_matrix(
        &mut self,
        video: &VideoNode,
        frame: PreparedImage,
    ) -> EngineResult<PreparedImage> {
        let Some(matrix) = video_color_matrix(video.brightness, video.contrast, video.saturation)
        else {
            return Ok(frame);
        };

        self.matrix_scratch.resize(frame.rgba8_premul.len(), 0);
        color_matrix_rgba8_premul(&frame.rgba8_premul, &mut self.matrix_scratch, matrix);
        Ok(PreparedImage {
            width: frame.width,
            height: frame.height,
            rgba8_premul: Arc::new(self.matrix_scratch.clone()),
        })
    }
}

impl Rasterizer for CpuCompositor {
    fn rasterize(&mut self, stage: &Stage, time_secs: f64) -> EngineResult<FrameRGBA> {
        self.render_frame(stage, time_secs, false)
    }

    fn rasterize_mask(&mut self, stage: &Stage) -> EngineResult<FrameRGBA> {
        self.render_frame(stage, stage.clock_secs(), true)
    }
}

/// Resolved node placement with animation overrides folded in.
struct Placement {
    x: f64,
    y: f64,
    scale_x: f64,
    scale_y: f64,
    rotation_deg: f64,
}

impl Placement {
    /// Transform for content drawn from `(0,0)..(w,h)` (images, video, text).
    fn content_transform(&self, w: f64, h: f64) -> Affine {
        self.centered_transform() * Affine::translate((-w / 2.0, -h / 2.0))
    }

    /// Transform for content already centered on the origin (shapes, paths).
    fn centered_transform(&self) -> Affine {
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation_deg.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

fn animated_placement(stage: &Stage, node: &Node, time_secs: f64) -> Placement {
    let ov = stage.animations().sample(node.id, time_secs).unwrap_or_default();
    Placement {
        x: ov.x.unwrap_or(node.x),
        y: ov.y.unwrap_or(node.y),
        scale_x: ov.scale_x.unwrap_or(node.scale_x),
        scale_y: ov.scale_y.unwrap_or(node.scale_y),
        rotation_deg: ov.rotation_deg.unwrap_or(node.rotation_deg),
    }
}

const OVERLAY_STROKE: f64 = 2.0;
const OVERLAY_ANCHOR: f64 = 8.0;
const OVERLAY_COLOR: Color = Color::rgb(0x4d, 0x94, 0xff);

fn draw_selection_overlay(
    stage: &Stage,
    node: &Node,
    time_secs: f64,
    ctx: &mut vello_cpu::RenderContext,
) {
    let placement = animated_placement(stage, node, time_secs);
    let (w, h) = node.intrinsic_size();
    let hw = w * placement.scale_x.abs() / 2.0;
    let hh = h * placement.scale_y.abs() / 2.0;
    if hw <= 0.0 || hh <= 0.0 {
        return;
    }

    // Transformer box is drawn in rotated-but-unscaled node space so the
    // stroke and anchors keep a constant pixel size.
    let tr = Affine::translate((placement.x, placement.y))
        * Affine::rotate(placement.rotation_deg.to_radians());
    ctx.set_transform(affine_to_cpu(tr));
    ctx.set_paint(color_paint(OVERLAY_COLOR));

    let s = OVERLAY_STROKE;
    // Border strips: top, bottom, left, right.
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(-hw - s, -hh - s, hw + s, -hh));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(-hw - s, hh, hw + s, hh + s));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(-hw - s, -hh, -hw, hh));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(hw, -hh, hw + s, hh));

    let a = OVERLAY_ANCHOR / 2.0;
    for (cx, cy) in [(-hw, -hh), (hw, -hh), (-hw, hh), (hw, hh)] {
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            cx - a,
            cy - a,
            cx + a,
            cy + a,
        ));
    }
}

fn color_paint(c: Color) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn shape_outline_grown(shape: &crate::scene::node::ShapeNode, by: f64) -> crate::foundation::core::BezPath {
    let mut grown = shape.clone();
    grown.size = shape.size + by * 2.0;
    grown.outline()
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &crate::foundation::core::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> EngineResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| EngineError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| EngineError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(EngineError::render("pixmap byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn image_paint(prepared: &PreparedImage) -> EngineResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(&prepared.rgba8_premul, prepared.width, prepared.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Compose brightness/contrast/saturation (percent, 100 = identity) into one
/// 4×5 color matrix. Returns `None` for the identity case.
fn video_color_matrix(brightness: f64, contrast: f64, saturation: f64) -> Option<[f32; 20]> {
    if brightness == 100.0 && contrast == 100.0 && saturation == 100.0 {
        return None;
    }

    let b = (brightness / 100.0) as f32;
    let c = (contrast / 100.0) as f32;
    let s = (saturation / 100.0) as f32;

    // Rec. 709 luma weights, as used by CSS saturate().
    let (lr, lg, lb) = (0.2126f32, 0.7152f32, 0.0722f32);
    let sr = (1.0 - s) * lr;
    let sg = (1.0 - s) * lg;
    let sb = (1.0 - s) * lb;

    // Per channel: saturate, then brightness scale, then contrast pivot at 0.5.
    let scale = b * c;
    let offset = 0.5 - 0.5 * c;

    Some([
        (sr + s) * scale,
        sg * scale,
        sb * scale,
        0.0,
        offset,
        sr * scale,
        (sg + s) * scale,
        sb * scale,
        0.0,
        offset,
        sr * scale,
        sg * scale,
        (sb + s) * scale,
        0.0,
        offset,
        0.0,
        0.0,
        0.0,
        1.0,
        0.0,
    ])
}

fn color_matrix_rgba8_premul(src: &[u8], dst: &mut [u8], m: [f32; 20]) {
    debug_assert_eq!(src.len(), dst.len());
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let pr = s[0] as f32 / 255.0;
        let pg = s[1] as f32 / 255.0;
        let pb = s[2] as f32 / 255.0;
        let pa = s[3] as f32 / 255.0;

        // Convert premul -> straight for matrix application.
        let inv_a = if pa > 0.0 { 1.0 / pa } else { 0.0 };
        let r = pr * inv_a;
        let g = pg * inv_a;
        let b = pb * inv_a;
        let a = pa;

        let out_r = (m[0] * r + m[1] * g + m[2] * b + m[3] * a + m[4]).clamp(0.0, 1.0);
        let out_g = (m[5] * r + m[6] * g + m[7] * b + m[8] * a + m[9]).clamp(0.0, 1.0);
        let out_b = (m[10] * r + m[11] * g + m[12] * b + m[13] * a + m[14]).clamp(0.0, 1.0);
        let out_a = (m[15] * r + m[16] * g + m[17] * b + m[18] * a + m[19]).clamp(0.0, 1.0);

        // Convert straight -> premul.
        let pr = (out_r * out_a).clamp(0.0, 1.0);
        let pg = (out_g * out_a).clamp(0.0, 1.0);
        let pb = (out_b * out_a).clamp(0.0, 1.0);

        d[0] = (pr * 255.0).round().clamp(0.0, 255.0) as u8;
        d[1] = (pg * 255.0).round().clamp(0.0, 255.0) as u8;
        d[2] = (pb * 255.0).round().clamp(0.0, 255.0) as u8;
        d[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
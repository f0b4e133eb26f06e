//! Animated GIF export with parallel frame quantization.

use rayon::prelude::*;

use crate::export::raster::OverlayGuard;
use crate::foundation::error::{EngineError, EngineResult};
use crate::foundation::math::unpremultiply_rgba8_in_place;
use crate::render::compositor::{FrameRGBA, Rasterizer};
use crate::scene::node::NodeId;
use crate::scene::stage::Stage;

/// GIF sampling configuration.
///
/// The defaults mirror the studio's fixed behavior (120 frames at a virtual
/// 60 fps, i.e. one 2-second capture window); they are options rather than
/// hard-wired constants.
#[derive(Clone, Copy, Debug)]
pub struct GifOpts {
    /// Number of frames to capture.
    pub frame_count: u32,
    /// Virtual sampling rate in frames per second.
    pub sample_fps: u32,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for GifOpts {
    fn default() -> Self {
        Self {
            frame_count: 120,
            sample_fps: 60,
            threads: None,
        }
    }
}

/// Exported GIF bytes plus a suggested download name.
#[derive(Clone, Debug)]
pub struct GifArtifact {
    /// Encoded GIF bytes.
    pub bytes: Vec<u8>,
    /// Number of frames encoded.
    pub frame_count: u32,
    /// Suggested download file name.
    pub file_name: String,
}

/// Sample the animated stage into a looping GIF.
///
/// Frame capture is strictly sequential on the calling thread (pixel reads
/// never cross a worker boundary); the CPU-bound per-frame quantization runs
/// on a rayon worker pool before the frames are written in order.
pub fn render_gif(
    stage: &mut Stage,
    raster: &mut dyn Rasterizer,
    node: NodeId,
    opts: &GifOpts,
) -> EngineResult<GifArtifact> {
    if opts.frame_count == 0 || opts.sample_fps == 0 {
        return Err(EngineError::validation(
            "gif frame_count and sample_fps must be > 0",
        ));
    }
    let animated = stage
        .node(node)
        .ok_or_else(|| EngineError::validation(format!("unknown node {}", node.0)))?
        .animation
        .is_some_and(|cfg| !cfg.is_none());
    if !animated {
        return Err(EngineError::validation(
            "gif export requires a node with an attached animation",
        ));
    }

    // Capture phase: one virtual animation-frame tick per captured frame,
    // overlay hidden for every one of them.
    let guard = OverlayGuard::hide(stage);
    let mut captured: Vec<FrameRGBA> = Vec::with_capacity(opts.frame_count as usize);
    let mut capture_err = None;
    for i in 0..opts.frame_count {
        let t = f64::from(i) / f64::from(opts.sample_fps);
        match raster.rasterize(stage, t) {
            Ok(frame) => captured.push(frame),
            Err(e) => {
                capture_err = Some(e);
                break;
            }
        }
    }
    guard.restore(stage);
    if let Some(e) = capture_err {
        return Err(e);
    }

    let (width, height) = match captured.first() {
        Some(f) => (f.width, f.height),
        None => return Err(EngineError::render("gif capture produced no frames")),
    };
    let w16: u16 = width
        .try_into()
        .map_err(|_| EngineError::render("gif width exceeds u16"))?;
    let h16: u16 = height
        .try_into()
        .map_err(|_| EngineError::render("gif height exceeds u16"))?;
    let delay_cs = (100.0 / f64::from(opts.sample_fps)).round().max(1.0) as u16;

    // Encode phase: quantization is the CPU-bound part and parallelizes per
    // frame; the writer below restores timeline order.
    let quantize = move |frame: FrameRGBA| -> gif::Frame<'static> {
        let mut data = frame.data;
        unpremultiply_rgba8_in_place(&mut data);
        let mut out = gif::Frame::from_rgba_speed(w16, h16, &mut data, 10);
        out.delay = delay_cs;
        out
    };
    let encode = move || -> Vec<gif::Frame<'static>> {
        captured.into_par_iter().map(quantize).collect()
    };
    let frames = match opts.threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| EngineError::render(format!("gif worker pool failed to start: {e}")))?
            .install(encode),
        None => encode(),
    };

    let mut bytes = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut bytes, w16, h16, &[])
            .map_err(|e| EngineError::render(format!("gif encoder init failed: {e}")))?;
        encoder
            .set_repeat(gif::Repeat::Infinite)
            .map_err(|e| EngineError::render(format!("gif repeat flag failed: {e}")))?;
        for frame in &frames {
            encoder
                .write_frame(frame)
                .map_err(|e| EngineError::render(format!("gif frame write failed: {e}")))?;
        }
    }

    Ok(GifArtifact {
        bytes,
        frame_count: opts.frame_count,
        file_name: "emote.gif".to_owned(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/export/gif.rs"]
mod tests;
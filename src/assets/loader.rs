//! Byte fetching and handle-based resource loading for images and video.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::decode::{PreparedImage, decode_image};
use crate::assets::media::{FfmpegDecoder, VideoDecoder, VideoProbe};
use crate::foundation::error::{EngineError, EngineResult};

/// Normalize and validate loader-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects
/// absolute paths or parent traversals (`..`).
pub(crate) fn normalize_rel_path(source: &str) -> EngineResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(EngineError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(EngineError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(EngineError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(EngineError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
    out
}

/// Materializes a url as a readable local file.
///
/// This is the narrow seam behind which network transport lives; the engine
/// itself never opens sockets.
pub trait ResourceFetcher {
    /// Resolve `url` to a local file path, downloading it first if necessary.
    fn fetch(&self, url: &str) -> EngineResult<PathBuf>;
}

/// [`ResourceFetcher`] that serves loader-relative paths under a root directory.
#[derive(Clone, Debug)]
pub struct LocalFetcher {
    root: PathBuf,
}

impl LocalFetcher {
    /// Create a fetcher rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceFetcher for LocalFetcher {
    fn fetch(&self, url: &str) -> EngineResult<PathBuf> {
        if is_remote(url) {
            return Err(EngineError::resource_load(format!(
                "local fetcher cannot materialize remote url '{url}'"
            )));
        }
        let norm = normalize_rel_path(url)?;
        let path = self.root.join(Path::new(&norm));
        if !path.is_file() {
            return Err(EngineError::resource_load(format!(
                "asset '{}' not found",
                path.display()
            )));
        }
        Ok(path)
    }
}

#[derive(Clone, Debug)]
/// Loaded image resource: decoded pixels plus the source url that produced them.
pub struct ImageHandle {
    /// Source url as given to the loader (pre-proxy).
    pub source: String,
    /// Decoded premultiplied pixels.
    pub image: PreparedImage,
}

#[derive(Clone, Debug)]
/// Loaded video resource: probe metadata plus a decoded first frame.
///
/// A handle exists only once BOTH the metadata probe and the first-frame decode
/// have succeeded; a zero-duration or black-frame object can therefore never
/// enter the scene.
pub struct VideoHandle {
    /// Source url as given to the loader (pre-proxy).
    pub source: String,
    /// Probed metadata (dimensions, duration).
    pub probe: Arc<VideoProbe>,
    /// First frame, used as the poster surface while paused at 0.
    pub poster: PreparedImage,
}

impl VideoHandle {
    /// Container duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.probe.duration_secs
    }
}

/// Loads and caches image/video resources, rewriting cross-origin urls through
/// a same-origin relay when one is configured.
pub struct ResourceLoader {
    fetcher: Box<dyn ResourceFetcher>,
    decoder: Box<dyn VideoDecoder>,
    proxy_base: Option<String>,
    images: HashMap<String, ImageHandle>,
}

impl ResourceLoader {
    /// Create a loader over `fetcher` with the default ffmpeg-backed decoder.
    pub fn new(fetcher: Box<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            decoder: Box::new(FfmpegDecoder),
            proxy_base: None,
            images: HashMap::new(),
        }
    }

    /// Route remote urls through a same-origin relay at `base`.
    pub fn with_proxy(mut self, base: impl Into<String>) -> Self {
        self.proxy_base = Some(base.into());
        self
    }

    /// Replace the video decoder (tests substitute a stub here).
    pub fn with_decoder(mut self, decoder: Box<dyn VideoDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Resolve `url` through the configured relay.
    ///
    /// Remote urls become `{base}?url={encoded}` so pixel reads stay
    /// same-origin; local paths pass through untouched.
    pub fn resolve(&self, url: &str) -> String {
        match (&self.proxy_base, is_remote(url)) {
            (Some(base), true) => format!("{base}?url={}", percent_encode(url)),
            _ => url.to_owned(),
        }
    }

    /// Load and decode an image resource.
    pub fn load(&mut self, url: &str) -> EngineResult<ImageHandle> {
        let resolved = self.resolve(url);
        if let Some(hit) = self.images.get(&resolved) {
            return Ok(hit.clone());
        }

        let path = self.fetcher.fetch(&resolved)?;
        let bytes = std::fs::read(&path).map_err(|e| {
            EngineError::resource_load(format!("failed to read '{}': {e}", path.display()))
        })?;
        let image = decode_image(&bytes)?;
        tracing::debug!(url, width = image.width, height = image.height, "image loaded");

        let handle = ImageHandle {
            source: url.to_owned(),
            image,
        };
        self.images.insert(resolved, handle.clone());
        Ok(handle)
    }

    /// Load a video resource.
    ///
    /// Resolves only after both the metadata probe (duration, dimensions) and
    /// the first-frame decode succeed; either failing rejects the load and the
    /// caller must leave the scene unchanged.
    pub fn load_video(&mut self, url: &str) -> EngineResult<VideoHandle> {
        let resolved = self.resolve(url);
        let path = self.fetcher.fetch(&resolved)?;

        let probe = self.decoder.probe(&path)?;
        let poster = self.decoder.decode_frame(&probe, 0.0)?;
        tracing::debug!(url, duration = probe.duration_secs, "video loaded");

        Ok(VideoHandle {
            source: url.to_owned(),
            probe: Arc::new(probe),
            poster,
        })
    }

    /// Read the raw bytes of a resource (used by export download paths).
    pub fn fetch_bytes(&self, url: &str) -> EngineResult<Vec<u8>> {
        let resolved = self.resolve(url);
        let path = self.fetcher.fetch(&resolved)?;
        std::fs::read(&path).map_err(|e| {
            EngineError::resource_load(format!("failed to read '{}': {e}", path.display()))
        })
    }

    /// Borrow the video decoder.
    pub fn decoder(&self) -> &dyn VideoDecoder {
        self.decoder.as_ref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
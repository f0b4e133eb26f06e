//! Video probing and decoding via the external media collaborator.

use std::path::{Path, PathBuf};

use crate::assets::decode::PreparedImage;
#[cfg(feature = "media-ffmpeg")]
use crate::assets::decode::prepare_straight_rgba8;
use crate::foundation::error::{EngineError, EngineResult};

#[derive(Clone, Debug)]
/// Metadata about a probed video source.
pub struct VideoProbe {
    /// Local path used for probing and frame decoding.
    pub source_path: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Container duration in seconds.
    pub duration_secs: f64,
    /// Whether at least one audio stream was detected.
    pub has_audio: bool,
}

/// Probing and frame decoding for video sources.
///
/// The default implementation shells out to `ffprobe`/`ffmpeg`. The trait seam
/// exists so the trim verification and fallback paths are unit-testable
/// without media tooling installed.
pub trait VideoDecoder {
    /// Probe source metadata (dimensions, duration, audio presence).
    fn probe(&self, source_path: &Path) -> EngineResult<VideoProbe>;

    /// Decode a single straight-alpha RGBA frame at `source_time_secs`.
    fn decode_frame(&self, probe: &VideoProbe, source_time_secs: f64)
    -> EngineResult<PreparedImage>;
}

/// [`VideoDecoder`] backed by the system `ffprobe` and `ffmpeg` binaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegDecoder;

#[cfg(feature = "media-ffmpeg")]
impl VideoDecoder for FfmpegDecoder {
    fn probe(&self, source_path: &Path) -> EngineResult<VideoProbe> {
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            streams: Vec<ProbeStream>,
            format: Option<ProbeFormat>,
        }

        let out = std::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(source_path)
            .output()
            .map_err(|e| EngineError::resource_load(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(EngineError::resource_load(format!(
                "ffprobe failed for '{}': {}",
                source_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| EngineError::resource_load(format!("ffprobe json parse failed: {e}")))?;
        let video_stream = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| EngineError::resource_load("no video stream found"))?;
        let width = video_stream
            .width
            .ok_or_else(|| EngineError::resource_load("missing video width from ffprobe"))?;
        let height = video_stream
            .height
            .ok_or_else(|| EngineError::resource_load("missing video height from ffprobe"))?;
        let duration_secs = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| EngineError::resource_load("missing container duration from ffprobe"))?;
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(EngineError::resource_load(
                "probed video duration must be finite and > 0",
            ));
        }
        let has_audio = parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        Ok(VideoProbe {
            source_path: source_path.to_path_buf(),
            width,
            height,
            duration_secs,
            has_audio,
        })
    }

    fn decode_frame(
        &self,
        probe: &VideoProbe,
        source_time_secs: f64,
    ) -> EngineResult<PreparedImage> {
        let t = source_time_secs.max(0.0);
        let out = std::process::Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{t:.9}")])
            .arg("-i")
            .arg(&probe.source_path)
            .args([
                "-frames:v",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .output()
            .map_err(|e| {
                EngineError::resource_load(format!("failed to run ffmpeg for video decode: {e}"))
            })?;

        if !out.status.success() {
            return Err(EngineError::resource_load(format!(
                "ffmpeg frame decode failed for '{}': {}",
                probe.source_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let expected = (probe.width as usize)
            .saturating_mul(probe.height as usize)
            .saturating_mul(4);
        if expected == 0 || out.stdout.len() < expected {
            return Err(EngineError::resource_load(format!(
                "ffmpeg returned {} bytes for '{}', expected {expected}",
                out.stdout.len(),
                probe.source_path.display()
            )));
        }

        prepare_straight_rgba8(out.stdout[..expected].to_vec(), probe.width, probe.height)
    }
}

#[cfg(not(feature = "media-ffmpeg"))]
impl VideoDecoder for FfmpegDecoder {
    fn probe(&self, _source_path: &Path) -> EngineResult<VideoProbe> {
        Err(EngineError::resource_load(
            "video sources require the 'media-ffmpeg' feature",
        ))
    }

    fn decode_frame(
        &self,
        _probe: &VideoProbe,
        _source_time_secs: f64,
    ) -> EngineResult<PreparedImage> {
        Err(EngineError::resource_load(
            "video sources require the 'media-ffmpeg' feature",
        ))
    }
}

// No unit tests for `FfmpegDecoder`: it shells out to `ffprobe`/`ffmpeg` and is
// validated via integration tests that are skipped when the tools are absent.
// The stub decoders used by loader/export tests live in `tests/unit/`.
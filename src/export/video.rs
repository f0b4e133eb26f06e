//! Trimmed-video export coordinated with the external trim service.

use serde::{Deserialize, Serialize};

use crate::assets::loader::ResourceLoader;
use crate::foundation::error::{EngineError, EngineResult};
use crate::scene::node::{Node, NodeId};
use crate::scene::stage::Stage;

/// Tolerance when verifying a trimmed artifact's duration, in seconds.
pub const TRIM_TOLERANCE_SECS: f64 = 0.5;

/// Payload sent to the external trim service.
#[derive(Clone, Debug, Serialize)]
pub struct TrimRequest {
    /// Source video url.
    pub video_url: String,
    /// Trim window start in seconds.
    pub start_time: f64,
    /// Trim window end in seconds.
    pub end_time: f64,
}

/// Response from the external trim service.
#[derive(Clone, Debug, Deserialize)]
pub struct TrimResponse {
    /// Whether the service produced an artifact.
    pub success: bool,
    /// Url of the trimmed artifact when `success` is true.
    pub video_url: String,
}

/// Server-side video trimming collaborator.
///
/// The engine never trusts the response: the artifact's actual duration is
/// verified after download.
pub trait TrimService {
    /// Request a trimmed rendition of `[start_time, end_time]`.
    fn trim(&self, request: &TrimRequest) -> EngineResult<TrimResponse>;
}

/// Downloadable video artifact: either the trimmed rendition or, on service
/// failure, the original asset under a name encoding the intended bounds.
#[derive(Clone, Debug)]
pub struct VideoArtifact {
    /// Container bytes.
    pub bytes: Vec<u8>,
    /// Suggested download file name.
    pub file_name: String,
    /// Non-fatal warning (verification mismatch or fallback reason).
    pub warning: Option<String>,
    /// `false` when this is the untrimmed fallback asset.
    pub trimmed: bool,
}

/// Produce a downloadable video for the node's trim window.
///
/// Delegates transcoding to `service`, downloads and VERIFIES the result
/// (duration within [`TRIM_TOLERANCE_SECS`] of the window), and falls back to
/// the original untrimmed asset when the service fails. Trimming never
/// silently fails to produce *some* downloadable file; only failing to read
/// even the original asset is an error.
pub fn render_trimmed_video(
    stage: &Stage,
    node: NodeId,
    service: &dyn TrimService,
    loader: &mut ResourceLoader,
) -> EngineResult<VideoArtifact> {
    let video = stage
        .node(node)
        .and_then(Node::as_video)
        .ok_or_else(|| EngineError::invalid_selection("node is not a video"))?;
    let (Some(start), Some(end)) = (video.start_time(), video.end_time()) else {
        return Err(EngineError::invalid_selection(
            "video trim window is not resolved yet",
        ));
    };

    let request = TrimRequest {
        video_url: video.source().to_owned(),
        start_time: start,
        end_time: end,
    };

    let failure = match service.trim(&request) {
        Ok(response) if response.success => {
            match download_and_verify(loader, &response.video_url, end - start) {
                Ok(artifact) => return Ok(artifact),
                Err(e) => format!("trimmed artifact unusable: {e}"),
            }
        }
        Ok(_) => "trim service reported failure".to_owned(),
        Err(e) => format!("trim service call failed: {e}"),
    };

    tracing::warn!(
        video_url = %request.video_url,
        start,
        end,
        %failure,
        "falling back to the untrimmed source asset"
    );
    let bytes = loader.fetch_bytes(video.source())?;
    Ok(VideoArtifact {
        bytes,
        file_name: format!("emote_full_{start:.2}s_to_{end:.2}s.mp4"),
        warning: Some(format!(
            "{failure}; delivering the original asset instead (intended trim {start:.2}s..{end:.2}s)"
        )),
        trimmed: false,
    })
}

fn download_and_verify(
    loader: &mut ResourceLoader,
    artifact_url: &str,
    expected_secs: f64,
) -> EngineResult<VideoArtifact> {
    // load_video re-runs the full readiness contract on the artifact: metadata
    // probe plus first-frame decode.
    let handle = loader.load_video(artifact_url)?;
    let bytes = loader.fetch_bytes(artifact_url)?;

    let actual = handle.duration_secs();
    let warning = if (actual - expected_secs).abs() > TRIM_TOLERANCE_SECS {
        tracing::warn!(
            artifact_url,
            actual,
            expected = expected_secs,
            "trimmed artifact duration differs from the requested window"
        );
        Some(format!(
            "trimmed artifact is {actual:.2}s, expected {expected_secs:.2}s"
        ))
    } else {
        None
    };

    Ok(VideoArtifact {
        bytes,
        file_name: "emote_trimmed.mp4".to_owned(),
        warning,
        trimmed: true,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/export/video.rs"]
mod tests;
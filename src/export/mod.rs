//! On-demand export artifacts: static raster, animated GIF, trimmed video.

pub mod gif;
pub mod raster;
pub mod video;

pub use gif::{GifArtifact, GifOpts, render_gif};
pub use raster::{PngArtifact, SizePreset, render_png, render_sized_png};
pub use video::{
    TRIM_TOLERANCE_SECS, TrimRequest, TrimResponse, TrimService, VideoArtifact,
    render_trimmed_video,
};

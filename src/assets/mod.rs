//! Resource loading: byte fetching, image decode, video probing.

pub mod decode;
pub mod loader;
pub mod media;

pub use decode::PreparedImage;
pub use loader::{ImageHandle, LocalFetcher, ResourceFetcher, ResourceLoader, VideoHandle};
pub use media::{FfmpegDecoder, VideoDecoder, VideoProbe};

//! Panelfeed Media Source
//!
//! Seekable, playable video sources that hand out decoded frames:
//! - [`MediaSource`]: the interface both drivers consume
//! - [`FfmpegSource`]: video files decoded through the `ffmpeg` CLI
//! - [`SyntheticSource`]: deterministic generated test patterns
//! - [`SourceSlot`]: the single loaded source, leased to one driver at a time

pub mod ffmpeg;
pub mod slot;
pub mod source;
pub mod synthetic;

pub use ffmpeg::{ffmpeg_available, probe, FfmpegSource, MediaInfo};
pub use slot::{SourceLease, SourceSlot};
pub use source::MediaSource;
pub use synthetic::SyntheticSource;

//! Panelfeed Export Engine
//!
//! Renders a trim window of the loaded source into a raw frame dump: every
//! frame at `i / fps` for `i` in `floor(start*fps)..floor(end*fps)`, seeked
//! deterministically, transformed and concatenated. The source's position
//! and play state are restored afterwards whether or not the export
//! succeeds.

pub mod artifact;
pub mod export;

pub use artifact::{ExportArtifact, ExportManifest};
pub use export::{export_frames, ExportProgress, ExportStage, ProgressCallback};

//! Panelfeed Frame Transform
//!
//! Converts one decoded source frame into one panel-ready frame:
//!
//! ```text
//! SourceFrame (any WxH) ── crop (panel aspect, x offset)
//!                              │
//!                              ├── resample to 40x96
//!                              │
//!                              ├── contrast → brightness → tone zones → gain
//!                              ▼
//!                     PanelFrame (40x96x3 bytes)
//! ```
//!
//! This crate is pure computation: no I/O, no clocks. Parameters are passed
//! in by value for every call.

pub mod adjust;
pub mod crop;
pub mod resample;
pub mod transform;

pub use adjust::{adjust_channel, ToneCurve};
pub use crop::{compute_crop, CropRect};
pub use transform::{preview_rgba, transform, TransformError};

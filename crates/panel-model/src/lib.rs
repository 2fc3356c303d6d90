//! Panelfeed Panel Model
//!
//! Defines the core data contracts shared by the transform and both drivers:
//! - **Panel:** fixed 40x96 RGB geometry and the [`PanelFrame`] buffer
//! - **Source frames:** decoded pixel buffers of arbitrary size
//! - **Color parameters:** tone/color adjustment settings and the live
//!   parameter channel
//! - **Trim window:** the clamped `[start, end]` export range
//! - **Artifact:** naming of exported frame dumps

pub mod artifact;
pub mod frame;
pub mod panel;
pub mod params;
pub mod trim;

pub use artifact::*;
pub use frame::*;
pub use panel::*;
pub use params::*;
pub use trim::*;

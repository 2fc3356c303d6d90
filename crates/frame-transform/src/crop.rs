//! Crop selection: the sub-rectangle of the source that matches the panel
//! aspect ratio.

use panelfeed_panel_model::{panel_aspect, X_OFFSET_RANGE};

/// A sub-rectangle of the source frame, in source pixels.
///
/// Invariant: `source_width / source_height` equals the panel aspect and
/// the rectangle lies inside the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub source_x: f64,
    pub source_y: f64,
    pub source_width: f64,
    pub source_height: f64,
}

impl CropRect {
    /// Integer pixel bounds `(x, y, width, height)` for a source of the given
    /// size. Always at least 1x1 and always inside the source.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let w = (self.source_width.round() as u32).clamp(1, width.max(1));
        let h = (self.source_height.round() as u32).clamp(1, height.max(1));
        let x = (self.source_x.round() as u32).min(width.saturating_sub(w));
        let y = (self.source_y.round() as u32).min(height.saturating_sub(h));
        (x, y, w, h)
    }

    /// Width over height.
    pub fn aspect(&self) -> f64 {
        self.source_width / self.source_height
    }
}

/// Compute the crop for a `width x height` source.
///
/// Wider sources are cropped left/right; the window starts centered and is
/// shifted by `x_offset` percent of half the spare width, then clamped.
/// Taller sources are cropped top/bottom symmetrically. Matching aspect
/// ratios are not cropped.
pub fn compute_crop(width: u32, height: u32, x_offset: i32) -> CropRect {
    let target_aspect = panel_aspect();
    let width = width as f64;
    let height = height as f64;
    let source_aspect = width / height;

    let mut rect = CropRect {
        source_x: 0.0,
        source_y: 0.0,
        source_width: width,
        source_height: height,
    };

    if source_aspect > target_aspect {
        rect.source_width = height * target_aspect;
        let spare = width - rect.source_width;
        let offset = x_offset.clamp(*X_OFFSET_RANGE.start(), *X_OFFSET_RANGE.end()) as f64;

        let centered = spare / 2.0;
        rect.source_x = (centered + (spare / 2.0) * (offset / 100.0)).clamp(0.0, spare);
    } else if source_aspect < target_aspect {
        rect.source_height = width / target_aspect;
        rect.source_y = (height - rect.source_height) / 2.0;
    }

    rect
}

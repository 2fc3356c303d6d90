//! The full per-frame transform.

use image::RgbaImage;
use panelfeed_common::PanelfeedError;
use panelfeed_panel_model::{ColorParams, PanelFrame, SourceFrame};

use crate::adjust::ToneCurve;
use crate::crop::compute_crop;
use crate::resample::{resample_to_panel, resample_to_panel_rgba};

/// Transform failures.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("source frame {width}x{height} could not be resampled")]
    Resample { width: u32, height: u32 },

    #[error("resampled frame has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
}

impl From<TransformError> for PanelfeedError {
    fn from(err: TransformError) -> Self {
        PanelfeedError::transform(err.to_string())
    }
}

/// Crop, resize and color-adjust one source frame into a panel frame.
///
/// `params` is a snapshot; the result depends only on the two arguments.
///
/// Identity parameters skip the tone curve and return the resampled bytes
/// unchanged. Evaluating the curve at identity would give the same bytes
/// for most values but one less for a handful, since the float result is
/// truncated.
pub fn transform(frame: &SourceFrame, params: &ColorParams) -> Result<PanelFrame, TransformError> {
    let mut rgb = resample(frame, params)?;

    if !params.is_identity() {
        ToneCurve::new(params).apply_in_place(&mut rgb, 3);
    }

    let actual = rgb.len();
    PanelFrame::from_rgb(rgb).ok_or(TransformError::FrameSize {
        expected: panelfeed_panel_model::FRAME_SIZE,
        actual,
    })
}

/// The transformed frame as an RGBA image, for writing a preview PNG.
///
/// Color adjustment touches R, G and B only; source alpha passes through.
/// Channels are truncated exactly as in [`transform`], so the preview
/// shows the bytes the panel receives rather than a rounded rendering.
pub fn preview_rgba(frame: &SourceFrame, params: &ColorParams) -> Result<RgbaImage, TransformError> {
    let crop = compute_crop(frame.width(), frame.height(), params.x_offset);
    let mut image = resample_to_panel_rgba(frame, &crop).ok_or(TransformError::Resample {
        width: frame.width(),
        height: frame.height(),
    })?;

    if !params.is_identity() {
        let curve = ToneCurve::new(params);
        curve.apply_in_place(&mut image, 4);
    }
    Ok(image)
}

fn resample(frame: &SourceFrame, params: &ColorParams) -> Result<Vec<u8>, TransformError> {
    let crop = compute_crop(frame.width(), frame.height(), params.x_offset);
    tracing::trace!(
        width = frame.width(),
        height = frame.height(),
        source_x = crop.source_x,
        source_width = crop.source_width,
        "Cropping source frame"
    );
    resample_to_panel(frame, &crop)
        .map(|image| image.into_raw())
        .ok_or(TransformError::Resample {
            width: frame.width(),
            height: frame.height(),
        })
}

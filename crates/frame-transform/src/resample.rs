//! Crop and resize a source frame down to panel resolution.

use image::{imageops, ImageBuffer, Pixel, Rgb, RgbImage, Rgba, RgbaImage};
use panelfeed_panel_model::{PixelLayout, SourceFrame, PANEL_HEIGHT, PANEL_WIDTH};

use crate::crop::CropRect;

/// Filter used for the downscale. Triangle averages over the whole
/// footprint, so small panels do not alias on large sources.
const FILTER: imageops::FilterType = imageops::FilterType::Triangle;

/// Crop `frame` to `crop` and resize the result to 40x96 RGB.
///
/// Alpha in RGBA sources is dropped. Returns `None` only if the frame buffer
/// does not match its declared dimensions, which `SourceFrame` rules out.
pub fn resample_to_panel(frame: &SourceFrame, crop: &CropRect) -> Option<RgbImage> {
    let bounds = crop.pixel_bounds(frame.width(), frame.height());
    match frame.layout() {
        PixelLayout::Rgb8 => crop_and_resize::<Rgb<u8>>(frame, bounds),
        PixelLayout::Rgba8 => crop_and_resize::<Rgba<u8>>(frame, bounds).map(drop_alpha),
    }
}

/// Like [`resample_to_panel`] but keeps the source alpha channel.
/// RGB sources come back fully opaque.
pub fn resample_to_panel_rgba(frame: &SourceFrame, crop: &CropRect) -> Option<RgbaImage> {
    let bounds = crop.pixel_bounds(frame.width(), frame.height());
    match frame.layout() {
        PixelLayout::Rgb8 => crop_and_resize::<Rgb<u8>>(frame, bounds).map(add_alpha),
        PixelLayout::Rgba8 => crop_and_resize::<Rgba<u8>>(frame, bounds),
    }
}

fn crop_and_resize<P>(
    frame: &SourceFrame,
    (x, y, width, height): (u32, u32, u32, u32),
) -> Option<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let bpp = P::CHANNEL_COUNT as usize;
    let stride = frame.width() as usize * bpp;
    let row_bytes = width as usize * bpp;

    let mut cropped = Vec::with_capacity(row_bytes * height as usize);
    for row in y..y + height {
        let start = row as usize * stride + x as usize * bpp;
        cropped.extend_from_slice(frame.data().get(start..start + row_bytes)?);
    }

    let cropped = ImageBuffer::<P, Vec<u8>>::from_raw(width, height, cropped)?;
    Some(imageops::resize(&cropped, PANEL_WIDTH, PANEL_HEIGHT, FILTER))
}

fn drop_alpha(image: ImageBuffer<Rgba<u8>, Vec<u8>>) -> RgbImage {
    let (width, height) = image.dimensions();
    let data = image
        .into_raw()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(width, height, data).unwrap_or_else(|| RgbImage::new(width, height))
}

fn add_alpha(image: RgbImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let data = image
        .into_raw()
        .chunks_exact(3)
        .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
        .collect();
    RgbaImage::from_raw(width, height, data).unwrap_or_else(|| RgbaImage::new(width, height))
}

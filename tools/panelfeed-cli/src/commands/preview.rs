//! Render one panel frame to a PNG.

use std::path::PathBuf;

use anyhow::Context;
use image::imageops::{self, FilterType};
use panelfeed_frame_transform::preview_rgba;
use panelfeed_panel_model::{PANEL_HEIGHT, PANEL_WIDTH};

use super::{ColorArgs, SourceArgs};

pub async fn run(
    source: SourceArgs,
    color: ColorArgs,
    at: f64,
    output: PathBuf,
    scale: u32,
) -> anyhow::Result<()> {
    let slot = source.load().await?;
    let params = color.resolve()?;

    let frame = {
        let mut lease = slot.try_acquire()?;
        lease.seek(at).await?;
        lease.current_frame().await?
    };

    let mut image = preview_rgba(&frame, &params)?;
    let scale = scale.max(1);
    if scale > 1 {
        image = imageops::resize(
            &image,
            PANEL_WIDTH * scale,
            PANEL_HEIGHT * scale,
            FilterType::Nearest,
        );
    }

    image
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Preview at {at:.2}s written to {} ({}x{})",
        output.display(),
        image.width(),
        image.height()
    );
    Ok(())
}

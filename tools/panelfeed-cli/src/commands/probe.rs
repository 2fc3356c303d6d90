//! Show video information as the panel pipeline sees it.

use std::path::PathBuf;

use panelfeed_frame_transform::compute_crop;
use panelfeed_media_source::{ffmpeg_available, probe};
use panelfeed_panel_model::{TrimWindow, DEFAULT_TARGET_FPS, FRAME_SIZE};

pub async fn run(path: PathBuf) -> anyhow::Result<()> {
    if !ffmpeg_available() {
        anyhow::bail!("ffmpeg/ffprobe not found on PATH");
    }

    let info = probe(&path).await?;

    println!("Video: {}", path.display());
    println!("  Resolution: {}x{}", info.width, info.height);
    println!("  Duration: {:.2}s", info.duration_secs);
    println!("  Frame rate: {:.3} fps", info.frame_rate);
    println!();

    let crop = compute_crop(info.width, info.height, 0);
    let (x, y, w, h) = crop.pixel_bounds(info.width, info.height);
    println!("Panel crop (x offset 0):");
    println!("  Region: {w}x{h} at ({x}, {y})");
    println!();

    let frames = TrimWindow::full(info.duration_secs).total_frames(DEFAULT_TARGET_FPS);
    println!("Full export at {DEFAULT_TARGET_FPS} fps:");
    println!("  Frames: {frames}");
    println!("  Size: {} bytes", frames as usize * FRAME_SIZE);

    Ok(())
}

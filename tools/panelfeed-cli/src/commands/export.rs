//! Export a trimmed, color-corrected clip as a raw frame dump.

use std::io::Write;
use std::path::PathBuf;

use panelfeed_common::AppConfig;
use panelfeed_export_engine::{export_frames, ExportProgress, ExportStage, ProgressCallback};
use panelfeed_panel_model::{ParamsHandle, FRAME_SIZE};

use super::{ColorArgs, SourceArgs, TrimArgs};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &AppConfig,
    source: SourceArgs,
    color: ColorArgs,
    trim: TrimArgs,
    fps: Option<u32>,
    output_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    manifest: bool,
) -> anyhow::Result<()> {
    let slot = source.load().await?;
    let trim = trim.window(&slot)?;
    let params = ParamsHandle::fixed(color.resolve()?);
    let fps = fps.unwrap_or(config.export.fps).max(1);

    println!("Exporting frame dump");
    if let Some(trim) = trim {
        println!(
            "  Trim: {:.2}s - {:.2}s ({:.2}s)",
            trim.start(),
            trim.end(),
            trim.span()
        );
    }
    println!("  FPS: {fps}");

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        if p.stage == ExportStage::Rendering {
            print!(
                "\r  Progress: {}% ({}/{} frames, ETA: {:.0}s)  ",
                p.percent, p.frames_done, p.total_frames, p.eta_secs,
            );
            std::io::stdout().flush().ok();
        }
    });

    let artifact = match export_frames(&slot, trim, &params, fps, Some(progress_cb)).await {
        Ok(artifact) => artifact,
        Err(e) => {
            println!("\nExport failed: {}", e.status_message());
            return Err(e.into());
        }
    };
    println!();

    let path = match output {
        Some(path) => {
            artifact.write_to(&path)?;
            path
        }
        None => {
            let dir = output_dir.unwrap_or_else(|| config.export.output_dir.clone());
            artifact.write_to_dir(&dir)?
        }
    };

    println!("Export complete: {}", path.display());
    println!(
        "  Frames: {} x {} bytes = {} bytes",
        artifact.total_frames(),
        FRAME_SIZE,
        artifact.as_bytes().len()
    );

    if manifest {
        let manifest_path = artifact.write_manifest(&path)?;
        println!("  Manifest: {}", manifest_path.display());
    }

    Ok(())
}

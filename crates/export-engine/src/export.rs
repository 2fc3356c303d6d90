//! Export loop and progress reporting.

use std::ops::Range;
use std::time::Instant;

use panelfeed_common::{PanelfeedError, PanelfeedResult};
use panelfeed_frame_transform::transform;
use panelfeed_media_source::{MediaSource, SourceSlot};
use panelfeed_panel_model::{ParamsHandle, TrimWindow, FRAME_SIZE};

use crate::artifact::ExportArtifact;

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Whole percent complete, rounded down. 100 only once every frame is in.
    pub percent: u8,

    /// Frames rendered so far.
    pub frames_done: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Restoring,
    Complete,
    Failed,
}

/// Playback state captured before the export takes over the source.
#[derive(Debug, Clone, Copy)]
struct SavedPlayback {
    position_secs: f64,
    was_playing: bool,
}

struct Reporter {
    callback: Option<ProgressCallback>,
    total_frames: u64,
    started: Instant,
}

impl Reporter {
    fn report(&self, frames_done: u64, stage: ExportStage) {
        let Some(cb) = &self.callback else {
            return;
        };
        let percent = if self.total_frames == 0 {
            0
        } else {
            (frames_done * 100 / self.total_frames) as u8
        };
        let eta_secs = if frames_done == 0 {
            0.0
        } else {
            let per_frame = self.started.elapsed().as_secs_f64() / frames_done as f64;
            per_frame * (self.total_frames - frames_done.min(self.total_frames)) as f64
        };
        cb(ExportProgress {
            percent,
            frames_done,
            total_frames: self.total_frames,
            eta_secs,
            stage,
        });
    }
}

/// Export the trim window of the slot's source at `fps`.
///
/// Holds the source lease for the whole run, so a live stream cannot start
/// meanwhile (and an export cannot start during a stream). Parameters are
/// snapshotted per frame; the artifact records those in effect when
/// rendering began. On failure the partial output is dropped.
pub async fn export_frames(
    slot: &SourceSlot,
    trim: Option<TrimWindow>,
    params: &ParamsHandle,
    fps: u32,
    progress: Option<ProgressCallback>,
) -> PanelfeedResult<ExportArtifact> {
    let mut lease = slot.try_acquire()?;
    let fps = fps.max(1);
    let trim = trim.unwrap_or_else(|| TrimWindow::full(lease.duration_secs()));
    let frames = trim.frame_range(fps);
    let total_frames = frames.end - frames.start;

    let mut reporter = Reporter {
        callback: progress,
        total_frames,
        started: Instant::now(),
    };

    tracing::info!(
        source = lease.name(),
        trim_start = trim.start(),
        trim_end = trim.end(),
        fps,
        total_frames,
        bytes = total_frames as usize * FRAME_SIZE,
        "Starting export"
    );

    if total_frames == 0 {
        reporter.report(0, ExportStage::Failed);
        return Err(PanelfeedError::export(format!(
            "trim window {:.2}s-{:.2}s holds no frames at {fps} fps",
            trim.start(),
            trim.end()
        )));
    }

    reporter.report(0, ExportStage::Preparing);

    let saved = SavedPlayback {
        position_secs: lease.position_secs(),
        was_playing: lease.is_playing(),
    };
    lease.pause();

    let initial_params = params.snapshot();
    let rendered = render_frames(&mut *lease, frames, fps, params, &mut reporter).await;

    reporter.report(
        rendered.as_ref().map(|b| (b.len() / FRAME_SIZE) as u64).unwrap_or(0),
        ExportStage::Restoring,
    );
    restore_playback(&mut *lease, saved).await;

    match rendered {
        Ok(bytes) => {
            if params.snapshot() != initial_params {
                tracing::warn!("Parameters changed during export; recording the starting values");
            }
            reporter.report(total_frames, ExportStage::Complete);
            tracing::info!(
                total_frames,
                elapsed_secs = reporter.started.elapsed().as_secs_f64(),
                "Export complete"
            );
            Ok(ExportArtifact::new(
                lease.name().to_string(),
                trim,
                fps,
                initial_params,
                bytes,
            ))
        }
        Err(e) => {
            reporter.report(0, ExportStage::Failed);
            tracing::warn!(error = %e, "Export failed");
            Err(e)
        }
    }
}

async fn render_frames(
    source: &mut dyn MediaSource,
    frames: Range<u64>,
    fps: u32,
    params: &ParamsHandle,
    reporter: &mut Reporter,
) -> PanelfeedResult<Vec<u8>> {
    let first = frames.start;
    let total = (frames.end - frames.start) as usize;
    let mut buffer = vec![0u8; total * FRAME_SIZE];

    for index in frames {
        let timestamp = index as f64 / fps as f64;
        source.seek(timestamp).await?;
        let frame = source.current_frame().await?;
        let panel = transform(&frame, &params.snapshot())?;

        let offset = (index - first) as usize * FRAME_SIZE;
        buffer[offset..offset + FRAME_SIZE].copy_from_slice(panel.as_bytes());

        let done = index - first + 1;
        tracing::trace!(frame = index, timestamp, "Exported frame");
        reporter.report(done, ExportStage::Rendering);
    }

    Ok(buffer)
}

async fn restore_playback(source: &mut dyn MediaSource, saved: SavedPlayback) {
    if let Err(e) = source.seek(saved.position_secs).await {
        tracing::warn!(
            error = %e,
            position_secs = saved.position_secs,
            "Failed to restore source position after export"
        );
    }
    if saved.was_playing {
        source.play();
    }
}

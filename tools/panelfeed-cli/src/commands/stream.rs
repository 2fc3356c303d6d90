//! Stream a video (or test pattern) to the panel in real time.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use panelfeed_common::AppConfig;
use panelfeed_panel_model::{params_channel, ParamsController};
use panelfeed_stream_engine::{LiveStreamer, StreamEnd, StreamSettings, StreamState};

use super::{read_params_file, ColorArgs, SourceArgs, TransportArgs, TrimArgs};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &AppConfig,
    source: SourceArgs,
    color: ColorArgs,
    transport: TransportArgs,
    trim: TrimArgs,
    fps: Option<u32>,
    no_loop: bool,
    watch_params: bool,
) -> anyhow::Result<()> {
    let slot = source.load().await?;
    let trim = trim.window(&slot)?;
    let (controller, params) = params_channel(color.resolve()?);

    let mut settings = StreamSettings::from_config(config);
    if let Some(fps) = fps {
        settings.target_fps = fps.max(1);
    }
    let looping = config.stream.loop_playback && !no_loop;

    println!("Streaming to panel");
    let mut streamer = LiveStreamer::new(settings);
    streamer.connect(transport.open(config).await?)?;
    println!("  Target FPS: {}", settings.target_fps);
    if let Some(trim) = trim {
        println!(
            "  Trim: {:.2}s - {:.2}s ({:.2}s)",
            trim.start(),
            trim.end(),
            trim.span()
        );
    }
    println!("  Loop: {looping}");
    println!();

    streamer.start_live(&slot, params, trim, looping)?;

    let mut watcher = match (&color.params, watch_params) {
        (Some(path), true) => Some(ParamsWatcher::new(path.clone(), color.clone())),
        _ => None,
    };

    println!("Press Ctrl+C to stop streaming...");
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                println!();
                streamer.stop();
                break;
            }
            _ = ticker.tick() => {
                if streamer.state() == StreamState::Idle {
                    break;
                }
                if let Some(watcher) = watcher.as_mut() {
                    watcher.poll(&controller);
                }
                print!("\r  {} fps  ", streamer.current_fps());
                std::io::stdout().flush().ok();
            }
        }
    }

    let report = streamer.wait().await;
    streamer.disconnect();
    let Some(report) = report else {
        return Ok(());
    };
    println!();
    match &report.end {
        StreamEnd::Stopped => println!("Stream stopped."),
        StreamEnd::EndOfRange => println!("Reached end of trim window."),
        StreamEnd::Failed(e) => println!("Stream failed: {}", e.status_message()),
    }
    println!(
        "  Frames: {} ({} bytes) in {:.1}s, avg {:.1} fps",
        report.frames_sent,
        report.bytes_sent,
        report.elapsed_secs,
        report.average_fps()
    );

    match report.end {
        StreamEnd::Failed(e) => Err(e.into()),
        _ => Ok(()),
    }
}

/// Re-reads the params file whenever its modification time changes.
struct ParamsWatcher {
    path: PathBuf,
    overrides: ColorArgs,
    modified: Option<SystemTime>,
}

impl ParamsWatcher {
    fn new(path: PathBuf, overrides: ColorArgs) -> Self {
        let modified = modified_time(&path);
        Self {
            path,
            overrides,
            modified,
        }
    }

    /// Returns whether new parameters were pushed.
    fn poll(&mut self, controller: &ParamsController) -> bool {
        let modified = modified_time(&self.path);
        if modified == self.modified {
            return false;
        }
        self.modified = modified;

        match read_params_file(&self.path) {
            Ok(params) => {
                let params = self.overrides.apply_overrides(params).sanitized();
                if params == controller.current() {
                    return false;
                }
                tracing::info!(path = %self.path.display(), ?params, "Params file changed");
                controller.set(params);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring params file update");
                false
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

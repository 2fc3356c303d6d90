//! Stream an exported `.bin` frame dump to the panel.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use panelfeed_common::AppConfig;
use panelfeed_stream_engine::{DumpFeed, LiveStreamer, StreamEnd, StreamSettings, StreamState};

use super::TransportArgs;

pub async fn run(
    config: &AppConfig,
    dump: PathBuf,
    transport: TransportArgs,
    fps: Option<u32>,
    no_loop: bool,
) -> anyhow::Result<()> {
    let feed = DumpFeed::open(&dump, !no_loop)
        .await
        .with_context(|| format!("Failed to open dump {}", dump.display()))?;

    let mut settings = StreamSettings::from_config(config);
    if let Some(fps) = fps {
        settings.target_fps = fps.max(1);
    }

    println!("Replaying {}", dump.display());
    println!("  Frames: {}", feed.total_frames());
    println!("  FPS: {}", settings.target_fps);
    println!("  Loop: {}", !no_loop);

    let mut streamer = LiveStreamer::new(settings);
    streamer.connect(transport.open(config).await?)?;
    streamer.start(Box::new(feed))?;

    println!();
    println!("Press Ctrl+C to stop...");

    let ended_early = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            true
        }
        _ = wait_until_idle(&streamer) => false,
    };
    if ended_early {
        streamer.stop();
    }

    let report = streamer.wait().await;
    streamer.disconnect();
    let Some(report) = report else {
        return Ok(());
    };
    match &report.end {
        StreamEnd::Stopped => println!("Replay stopped."),
        StreamEnd::EndOfRange => println!("Replay finished."),
        StreamEnd::Failed(e) => println!("Replay failed: {}", e.status_message()),
    }
    println!(
        "  Sent {} frames in {:.1}s (avg {:.1} fps)",
        report.frames_sent,
        report.elapsed_secs,
        report.average_fps()
    );

    match report.end {
        StreamEnd::Failed(e) => Err(e.into()),
        _ => Ok(()),
    }
}

async fn wait_until_idle(streamer: &LiveStreamer) {
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        ticker.tick().await;
        if streamer.state() == StreamState::Idle {
            return;
        }
    }
}

//! Live streaming session.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use panelfeed_common::{AppConfig, FpsMeter, FramePacer, PanelfeedError, PanelfeedResult};
use panelfeed_media_source::SourceSlot;
use panelfeed_panel_model::{ParamsHandle, TrimWindow, DEFAULT_TARGET_FPS};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::feed::{FrameFeed, LiveFeed};
use crate::transport::{write_frame, ChunkPolicy, Transport};

/// Timing and chunking for a stream session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSettings {
    pub target_fps: u32,
    pub chunks: ChunkPolicy,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            chunks: ChunkPolicy::default(),
        }
    }
}

impl StreamSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            target_fps: config.stream.target_fps.max(1),
            chunks: ChunkPolicy::from_config(&config.serial),
        }
    }
}

/// State of the streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No session running.
    Idle,
    /// A session is sending frames.
    Streaming,
}

/// Why a session ended.
#[derive(Debug)]
pub enum StreamEnd {
    /// `stop()` was called.
    Stopped,
    /// Playback reached the end of the trim window (or dump) without looping.
    EndOfRange,
    /// The session aborted. Transport failures also disconnect the transport.
    Failed(PanelfeedError),
}

/// Summary of a finished session.
#[derive(Debug)]
pub struct StreamReport {
    pub end: StreamEnd,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub elapsed_secs: f64,
}

impl StreamReport {
    /// Average frame rate over the whole session.
    pub fn average_fps(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.frames_sent as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// The failure, if the session failed.
    pub fn error(&self) -> Option<&PanelfeedError> {
        match &self.end {
            StreamEnd::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Shared {
    stop: AtomicBool,
    streaming: AtomicBool,
    fps: AtomicU32,
    wake: Notify,
}

type SessionOutcome = (StreamReport, Option<Box<dyn Transport>>);

/// Drives one stream session at a time over a connected transport.
///
/// The session runs on its own task. Each tick pulls a frame from the feed,
/// writes it in chunks, then sleeps for whatever is left of the frame
/// period. Under load the loop simply runs late; the source clock keeps
/// moving, so frames are skipped rather than queued.
pub struct LiveStreamer {
    settings: StreamSettings,
    transport: Option<Box<dyn Transport>>,
    shared: Arc<Shared>,
    task: Option<JoinHandle<SessionOutcome>>,
}

impl LiveStreamer {
    pub fn new(settings: StreamSettings) -> Self {
        Self {
            settings,
            transport: None,
            shared: Arc::new(Shared::default()),
            task: None,
        }
    }

    pub fn settings(&self) -> StreamSettings {
        self.settings
    }

    /// Attach the transport frames are written to.
    pub fn connect(&mut self, transport: Box<dyn Transport>) -> PanelfeedResult<()> {
        if self.state() == StreamState::Streaming {
            return Err(PanelfeedError::stream("cannot change transport while streaming"));
        }
        tracing::info!(transport = transport.name(), "Transport connected");
        self.transport = Some(transport);
        Ok(())
    }

    /// Detach the transport.
    pub fn disconnect(&mut self) -> Option<Box<dyn Transport>> {
        if self.state() == StreamState::Streaming {
            return None;
        }
        let transport = self.transport.take()?;
        tracing::info!(transport = transport.name(), "Transport disconnected");
        Some(transport)
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Current state. A session that ended on its own reads as `Idle`.
    pub fn state(&self) -> StreamState {
        if self.task.is_some() && self.shared.streaming.load(Ordering::Acquire) {
            StreamState::Streaming
        } else {
            StreamState::Idle
        }
    }

    /// Frames sent during the last completed one-second window.
    pub fn current_fps(&self) -> u32 {
        self.shared.fps.load(Ordering::Relaxed)
    }

    /// Stream the slot's source.
    ///
    /// Requires a connected transport and a loaded, unleased source. The
    /// source is leased for the whole session and paused when it ends.
    pub fn start_live(
        &mut self,
        slot: &SourceSlot,
        params: ParamsHandle,
        trim: Option<TrimWindow>,
        looping: bool,
    ) -> PanelfeedResult<()> {
        self.ensure_ready()?;
        let feed = LiveFeed::acquire(slot, params, trim, looping)?;
        self.start(Box::new(feed))
    }

    /// Stream frames from any feed.
    pub fn start(&mut self, feed: Box<dyn FrameFeed>) -> PanelfeedResult<()> {
        self.ensure_ready()?;
        let transport = self
            .transport
            .take()
            .ok_or_else(|| PanelfeedError::transport_unavailable("not connected"))?;

        // Fresh per-session state: a stop requested while idle must not
        // leave a wake permit behind for this session's first sleep.
        self.shared = Arc::new(Shared {
            streaming: AtomicBool::new(true),
            ..Shared::default()
        });

        tracing::info!(
            transport = transport.name(),
            target_fps = self.settings.target_fps,
            chunk_size = self.settings.chunks.chunk_size,
            "Starting stream session"
        );

        let settings = self.settings;
        let shared = self.shared.clone();
        self.task = Some(tokio::spawn(run_session(feed, transport, settings, shared)));
        Ok(())
    }

    fn ensure_ready(&self) -> PanelfeedResult<()> {
        if self.state() == StreamState::Streaming {
            return Err(PanelfeedError::stream("already streaming"));
        }
        if self.task.is_some() {
            return Err(PanelfeedError::stream(
                "previous session has not been collected; call wait() first",
            ));
        }
        if self.transport.is_none() {
            return Err(PanelfeedError::transport_unavailable("not connected"));
        }
        Ok(())
    }

    /// Ask the running session to stop. The frame being written finishes
    /// first. Calling this while idle does nothing.
    pub fn stop(&self) {
        if self.task.is_some() {
            tracing::debug!("Stop requested");
        }
        self.shared.stop.store(true, Ordering::Release);
        self.shared.wake.notify_one();
    }

    /// Wait for the current session to end and collect its report.
    ///
    /// Returns `None` when no session was started since the last call.
    pub async fn wait(&mut self) -> Option<StreamReport> {
        let task = self.task.take()?;
        let report = match task.await {
            Ok((report, transport)) => {
                if transport.is_none() {
                    tracing::warn!("Transport dropped after failure; reconnect to stream again");
                }
                self.transport = transport;
                report
            }
            Err(e) => StreamReport {
                end: StreamEnd::Failed(PanelfeedError::stream(format!("session task failed: {e}"))),
                frames_sent: 0,
                bytes_sent: 0,
                elapsed_secs: 0.0,
            },
        };
        self.shared.streaming.store(false, Ordering::Release);
        Some(report)
    }

    /// [`stop`](Self::stop) followed by [`wait`](Self::wait).
    pub async fn stop_and_wait(&mut self) -> Option<StreamReport> {
        self.stop();
        self.wait().await
    }
}

impl Drop for LiveStreamer {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.wake.notify_one();
    }
}

async fn run_session(
    mut feed: Box<dyn FrameFeed>,
    mut transport: Box<dyn Transport>,
    settings: StreamSettings,
    shared: Arc<Shared>,
) -> SessionOutcome {
    let pacer = FramePacer::new(settings.target_fps);
    let started = Instant::now();
    let mut meter = FpsMeter::new(started);
    let mut frames_sent = 0u64;
    let mut bytes_sent = 0u64;

    let end = match feed.start().await {
        Err(e) => StreamEnd::Failed(e),
        Ok(()) => loop {
            if shared.stop.load(Ordering::Acquire) {
                break StreamEnd::Stopped;
            }

            let tick = Instant::now();

            let frame = match feed.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break StreamEnd::EndOfRange,
                Err(e) => break StreamEnd::Failed(e),
            };

            if let Err(e) = write_frame(transport.as_mut(), frame.as_bytes(), &settings.chunks).await {
                break StreamEnd::Failed(e);
            }
            frames_sent += 1;
            bytes_sent += frame.as_bytes().len() as u64;

            if let Some(fps) = meter.record_frame(Instant::now()) {
                shared.fps.store(fps, Ordering::Relaxed);
                tracing::debug!(fps, frames_sent, "Streaming");
            }

            let delay = pacer.delay_after(tick.elapsed());
            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shared.wake.notified() => {}
                }
            }
        },
    };

    feed.finish().await;
    shared.streaming.store(false, Ordering::Release);

    let elapsed = started.elapsed();
    log_end(&end, frames_sent, elapsed);

    let transport = match end {
        StreamEnd::Failed(PanelfeedError::TransportWrite { .. }) => None,
        _ => Some(transport),
    };

    (
        StreamReport {
            end,
            frames_sent,
            bytes_sent,
            elapsed_secs: elapsed.as_secs_f64(),
        },
        transport,
    )
}

fn log_end(end: &StreamEnd, frames_sent: u64, elapsed: Duration) {
    match end {
        StreamEnd::Stopped => {
            tracing::info!(frames_sent, elapsed_secs = elapsed.as_secs_f64(), "Stream stopped")
        }
        StreamEnd::EndOfRange => tracing::info!(
            frames_sent,
            elapsed_secs = elapsed.as_secs_f64(),
            "Stream reached end of range"
        ),
        StreamEnd::Failed(e) => tracing::warn!(frames_sent, error = %e, "Stream failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelfeed_media_source::SyntheticSource;
    use panelfeed_panel_model::{ColorParams, PanelFrame, FRAME_SIZE};

    struct CountingFeed {
        remaining: u32,
    }

    #[async_trait::async_trait]
    impl FrameFeed for CountingFeed {
        async fn next_frame(&mut self) -> PanelfeedResult<Option<PanelFrame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(PanelFrame::black()))
        }
    }

    fn fast_settings() -> StreamSettings {
        StreamSettings {
            target_fps: 200,
            chunks: ChunkPolicy {
                chunk_size: 1024,
                chunk_delay: Duration::ZERO,
            },
        }
    }

    fn memory_transport() -> Box<dyn Transport> {
        Box::new(crate::transport::WriterTransport::new("memory", tokio::io::sink()))
    }

    #[tokio::test]
    async fn test_start_without_transport_is_unavailable() {
        let slot = SourceSlot::with_source(SyntheticSource::new(8, 8, 1.0, 30.0));
        let mut streamer = LiveStreamer::new(fast_settings());
        let err = streamer
            .start_live(&slot, ParamsHandle::fixed(ColorParams::default()), None, true)
            .unwrap_err();
        assert!(matches!(err, PanelfeedError::TransportUnavailable { .. }));
        assert_eq!(streamer.state(), StreamState::Idle);
    }

    #[tokio::test]
    async fn test_start_without_source_fails() {
        let mut streamer = LiveStreamer::new(fast_settings());
        streamer.connect(memory_transport()).unwrap();
        let err = streamer
            .start_live(&SourceSlot::new(), ParamsHandle::fixed(ColorParams::default()), None, true)
            .unwrap_err();
        assert!(matches!(err, PanelfeedError::NoSourceLoaded));
        assert!(streamer.is_connected());
    }

    #[tokio::test]
    async fn test_finite_feed_ends_and_returns_transport() {
        let mut streamer = LiveStreamer::new(fast_settings());
        streamer.connect(memory_transport()).unwrap();
        streamer.start(Box::new(CountingFeed { remaining: 4 })).unwrap();

        let report = streamer.wait().await.unwrap();
        assert!(matches!(report.end, StreamEnd::EndOfRange));
        assert_eq!(report.frames_sent, 4);
        assert_eq!(report.bytes_sent, 4 * FRAME_SIZE as u64);
        assert_eq!(streamer.state(), StreamState::Idle);
        assert!(streamer.is_connected());
        assert!(streamer.wait().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let slot = SourceSlot::with_source(SyntheticSource::new(32, 32, 5.0, 30.0));
        let mut streamer = LiveStreamer::new(fast_settings());
        streamer.stop();
        streamer.connect(memory_transport()).unwrap();
        streamer
            .start_live(&slot, ParamsHandle::fixed(ColorParams::default()), None, true)
            .unwrap();
        assert_eq!(streamer.state(), StreamState::Streaming);
        assert!(matches!(
            streamer.start(Box::new(CountingFeed { remaining: 1 })),
            Err(PanelfeedError::Stream { .. })
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        streamer.stop();
        streamer.stop();
        let report = streamer.wait().await.unwrap();
        assert!(matches!(report.end, StreamEnd::Stopped));
        assert!(report.frames_sent > 0);

        streamer.stop();
        assert_eq!(streamer.state(), StreamState::Idle);

        // Source released and paused.
        let lease = slot.try_acquire().unwrap();
        assert!(!lease.is_playing());
    }

    #[tokio::test]
    async fn test_stop_while_idle_does_not_shorten_next_session() {
        let settings = StreamSettings {
            target_fps: 5,
            ..fast_settings()
        };
        let mut streamer = LiveStreamer::new(settings);
        streamer.connect(memory_transport()).unwrap();
        streamer.stop();

        let started = Instant::now();
        streamer.start(Box::new(CountingFeed { remaining: 3 })).unwrap();
        let report = streamer.wait().await.unwrap();
        let elapsed = started.elapsed();

        assert!(matches!(report.end, StreamEnd::EndOfRange));
        assert_eq!(report.frames_sent, 3);
        // Three full 200 ms periods: one after every frame.
        assert!(elapsed >= Duration::from_millis(550), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_stop_between_sessions_does_not_leak() {
        let settings = StreamSettings {
            target_fps: 10,
            ..fast_settings()
        };
        let mut streamer = LiveStreamer::new(settings);
        streamer.connect(memory_transport()).unwrap();
        streamer.start(Box::new(CountingFeed { remaining: 1 })).unwrap();
        streamer.wait().await.unwrap();
        streamer.stop();

        let started = Instant::now();
        streamer.start(Box::new(CountingFeed { remaining: 2 })).unwrap();
        let report = streamer.wait().await.unwrap();
        assert!(matches!(report.end, StreamEnd::EndOfRange));
        assert_eq!(report.frames_sent, 2);
        assert!(started.elapsed() >= Duration::from_millis(180));
    }
}

//! Clock and timing utilities for playback and frame pacing.
//!
//! - [`PlaybackClock`] tracks a media position that advances with wall-clock
//!   time while playing.
//! - [`FramePacer`] computes how long to wait before the next tick.
//! - [`FpsMeter`] counts frames over rolling one-second windows.

use std::time::{Duration, Instant};

/// A media playback position that advances in real time while playing.
///
/// The position is anchored at the last seek/play/pause and extrapolated
/// from a monotonic instant, so a slow consumer observes later positions
/// rather than every frame.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Position (seconds) at the anchor instant.
    anchor_secs: f64,

    /// Set while playing: the instant the anchor was taken.
    playing_since: Option<Instant>,
}

impl PlaybackClock {
    /// A paused clock at position zero.
    pub fn new() -> Self {
        Self {
            anchor_secs: 0.0,
            playing_since: None,
        }
    }

    /// Current position in seconds.
    pub fn position_secs(&self) -> f64 {
        self.position_at(Instant::now())
    }

    /// Position the clock reports at `now`.
    pub fn position_at(&self, now: Instant) -> f64 {
        match self.playing_since {
            Some(since) => self.anchor_secs + now.saturating_duration_since(since).as_secs_f64(),
            None => self.anchor_secs,
        }
    }

    /// Jump to a position, keeping the play/pause state.
    pub fn seek(&mut self, secs: f64) {
        self.anchor_secs = secs.max(0.0);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    /// Start advancing. No-op when already playing.
    pub fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
    }

    /// Freeze the position. No-op when already paused.
    pub fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.anchor_secs = self.position_secs();
            self.playing_since = None;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Self-pacing helper for a fixed target frame rate.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    period: Duration,
}

impl FramePacer {
    /// Create a pacer targeting the given frames per second.
    pub fn new(target_fps: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / target_fps.max(1) as f64),
        }
    }

    /// Target period between ticks.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Delay before the next tick given the time spent on this one:
    /// `max(0, period - elapsed)`.
    pub fn delay_after(&self, elapsed: Duration) -> Duration {
        self.period.saturating_sub(elapsed)
    }
}

/// Rolling one-second frame counter.
#[derive(Debug)]
pub struct FpsMeter {
    window_start: Instant,
    frames: u32,
}

impl FpsMeter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Count one frame at `now`.
    ///
    /// Returns the number of frames in the window that just closed when at
    /// least one second has passed since the window opened.
    pub fn record_frame(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.saturating_duration_since(self.window_start) >= Duration::from_secs(1) {
            let sample = self.frames;
            self.frames = 0;
            self.window_start = now;
            return Some(sample);
        }
        None
    }
}

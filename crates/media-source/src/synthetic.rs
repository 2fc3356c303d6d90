//! Generated test-pattern source.
//!
//! Frames are a pure function of the frame index, so two sources built with
//! the same parameters always produce identical frames at identical
//! positions. Used by `--test-pattern` and throughout the driver tests.

use panelfeed_common::{PanelfeedError, PanelfeedResult, PlaybackClock};
use panelfeed_panel_model::SourceFrame;

use crate::source::{check_seek_target, MediaSource};

/// A moving diagonal gradient with a per-frame color shift.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    duration_secs: f64,
    frame_rate: f64,
    clock: PlaybackClock,
    unseekable_from: Option<f64>,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, duration_secs: f64, frame_rate: f64) -> Self {
        Self {
            name: format!("test-pattern-{width}x{height}"),
            width: width.max(1),
            height: height.max(1),
            duration_secs: duration_secs.max(0.0),
            frame_rate: if frame_rate > 0.0 { frame_rate } else { 30.0 },
            clock: PlaybackClock::new(),
            unseekable_from: None,
        }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every seek at or past `secs` fail, as a broken decoder would.
    pub fn with_unseekable_from(mut self, secs: f64) -> Self {
        self.unseekable_from = Some(secs);
        self
    }

    /// Index of the frame showing at `secs`.
    pub fn frame_index_at(&self, secs: f64) -> u64 {
        let last = ((self.duration_secs * self.frame_rate).ceil() as u64).saturating_sub(1);
        // Nudge so i/fps lands on frame i despite float error.
        ((secs.max(0.0) * self.frame_rate + 1e-6).floor() as u64).min(last)
    }

    /// The frame with the given index.
    pub fn render(&self, index: u64) -> PanelfeedResult<SourceFrame> {
        let shift = (index % 256) as u32;
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let r = (x * 255 / self.width + shift) % 256;
                let g = (y * 255 / self.height) % 256;
                let b = (x + y + shift * 7) % 256;
                data.extend_from_slice(&[r as u8, g as u8, b as u8]);
            }
        }
        SourceFrame::new(
            self.width,
            self.height,
            panelfeed_panel_model::PixelLayout::Rgb8,
            data,
        )
        .map_err(|e| PanelfeedError::decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MediaSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn position_secs(&self) -> f64 {
        self.clock.position_secs().min(self.duration_secs)
    }

    async fn seek(&mut self, secs: f64) -> PanelfeedResult<()> {
        check_seek_target(secs, self.duration_secs)?;
        if let Some(limit) = self.unseekable_from {
            if secs >= limit {
                return Err(PanelfeedError::seek(secs, "decoder refused timestamp"));
            }
        }
        self.clock.seek(secs);
        Ok(())
    }

    async fn current_frame(&mut self) -> PanelfeedResult<SourceFrame> {
        self.render(self.frame_index_at(self.position_secs()))
    }

    fn play(&mut self) {
        self.clock.play();
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_position_same_frame() {
        let mut a = SyntheticSource::new(64, 48, 5.0, 30.0);
        let mut b = SyntheticSource::new(64, 48, 5.0, 30.0);
        a.seek(1.25).await.unwrap();
        b.seek(1.25).await.unwrap();
        assert_eq!(a.current_frame().await.unwrap(), b.current_frame().await.unwrap());
    }

    #[tokio::test]
    async fn test_frames_differ_between_indices() {
        let source = SyntheticSource::new(16, 16, 5.0, 30.0);
        assert_ne!(source.render(0).unwrap(), source.render(1).unwrap());
    }

    #[tokio::test]
    async fn test_seek_outside_duration_fails() {
        let mut source = SyntheticSource::new(16, 16, 2.0, 30.0);
        assert!(matches!(
            source.seek(2.5).await,
            Err(PanelfeedError::Seek { .. })
        ));
        assert!(source.seek(-0.1).await.is_err());
        assert!(source.seek(2.0).await.is_ok());
    }

    #[tokio::test]
    async fn test_unseekable_region() {
        let mut source = SyntheticSource::new(16, 16, 10.0, 30.0).with_unseekable_from(3.0);
        assert!(source.seek(2.9).await.is_ok());
        assert!(source.seek(3.0).await.is_err());
        assert!((source.position_secs() - 2.9).abs() < 1e-9);
    }

    #[test]
    fn test_frame_index_clamps_to_last_frame() {
        let source = SyntheticSource::new(8, 8, 2.0, 30.0);
        assert_eq!(source.frame_index_at(0.0), 0);
        assert_eq!(source.frame_index_at(1.0), 30);
        assert_eq!(source.frame_index_at(2.0), 59);
    }
}

use panelfeed_common::PanelfeedResult;
use panelfeed_panel_model::SourceFrame;

/// A seekable, playable video source.
///
/// While playing, the position advances with wall-clock time and
/// [`current_frame`](MediaSource::current_frame) returns whatever frame is
/// showing at the moment of the call. A consumer slower than the source's
/// frame rate therefore skips frames rather than falling behind.
#[async_trait::async_trait]
pub trait MediaSource: Send {
    /// Display name, usually the file name.
    fn name(&self) -> &str;

    /// Natural frame size `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Total length in seconds.
    fn duration_secs(&self) -> f64;

    /// Current playback position in seconds.
    fn position_secs(&self) -> f64;

    /// Move to `secs`. Completes only once a frame for that timestamp is
    /// available; fails for positions outside `[0, duration]`.
    async fn seek(&mut self, secs: f64) -> PanelfeedResult<()>;

    /// The decoded frame at the current position.
    async fn current_frame(&mut self) -> PanelfeedResult<SourceFrame>;

    /// Start advancing the position.
    fn play(&mut self);

    /// Freeze the position.
    fn pause(&mut self);

    fn is_playing(&self) -> bool;
}

/// Reject positions a source cannot seek to.
pub(crate) fn check_seek_target(secs: f64, duration_secs: f64) -> PanelfeedResult<()> {
    if !secs.is_finite() || secs < 0.0 || secs > duration_secs {
        return Err(panelfeed_common::PanelfeedError::seek(
            secs,
            format!("position outside 0..{duration_secs:.3}s"),
        ));
    }
    Ok(())
}

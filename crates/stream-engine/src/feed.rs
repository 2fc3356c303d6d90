//! Frame producers for the stream loop.

use std::io::SeekFrom;
use std::path::Path;

use panelfeed_common::{PanelfeedError, PanelfeedResult};
use panelfeed_frame_transform::transform;
use panelfeed_media_source::{SourceLease, SourceSlot};
use panelfeed_panel_model::{PanelFrame, ParamsHandle, TrimWindow, FRAME_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Something the stream loop can pull panel frames from.
#[async_trait::async_trait]
pub trait FrameFeed: Send {
    /// Prepare for the first frame.
    async fn start(&mut self) -> PanelfeedResult<()> {
        Ok(())
    }

    /// The next frame to send, or `None` when the feed has ended.
    async fn next_frame(&mut self) -> PanelfeedResult<Option<PanelFrame>>;

    /// Release whatever the feed holds. Called once, on every exit path.
    async fn finish(&mut self) {}
}

/// Frames sampled from a playing source and transformed with the current
/// parameters.
pub struct LiveFeed {
    lease: SourceLease,
    params: ParamsHandle,
    trim: TrimWindow,
    looping: bool,
}

impl LiveFeed {
    /// Take exclusive use of the slot's source.
    ///
    /// Without a trim window the whole source plays.
    pub fn acquire(
        slot: &SourceSlot,
        params: ParamsHandle,
        trim: Option<TrimWindow>,
        looping: bool,
    ) -> PanelfeedResult<Self> {
        let lease = slot.try_acquire()?;
        let trim = trim.unwrap_or_else(|| TrimWindow::full(lease.duration_secs()));
        Ok(Self {
            lease,
            params,
            trim,
            looping,
        })
    }

    pub fn trim(&self) -> TrimWindow {
        self.trim
    }
}

#[async_trait::async_trait]
impl FrameFeed for LiveFeed {
    async fn start(&mut self) -> PanelfeedResult<()> {
        let position = self.lease.position_secs();
        if !self.trim.contains(position) {
            self.lease.seek(self.trim.start()).await?;
        }
        self.lease.play();
        tracing::info!(
            source = self.lease.name(),
            trim_start = self.trim.start(),
            trim_end = self.trim.end(),
            looping = self.looping,
            "Source playing"
        );
        Ok(())
    }

    async fn next_frame(&mut self) -> PanelfeedResult<Option<PanelFrame>> {
        let position = self.lease.position_secs();
        if self.trim.reached_end(position) {
            if !self.looping {
                tracing::info!(position_secs = position, "Reached end of trim window");
                self.lease.pause();
                return Ok(None);
            }
            tracing::debug!(position_secs = position, "Looping to trim start");
            self.lease.seek(self.trim.start()).await?;
            self.lease.play();
        }

        let frame = self.lease.current_frame().await?;
        let params = self.params.snapshot();
        Ok(Some(transform(&frame, &params)?))
    }

    async fn finish(&mut self) {
        self.lease.pause();
    }
}

/// Replay of a previously exported `.bin` dump.
pub struct DumpFeed<R> {
    reader: R,
    total_frames: u64,
    index: u64,
    looping: bool,
}

impl DumpFeed<tokio::fs::File> {
    /// Open a dump file.
    pub async fn open(path: &Path, looping: bool) -> PanelfeedResult<Self> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PanelfeedError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                e.into()
            }
        })?;
        let len = file.metadata().await?.len();
        Self::from_reader(file, len, looping)
    }
}

impl<R> DumpFeed<R>
where
    R: AsyncRead + AsyncSeek + Unpin + Send,
{
    /// Wrap a reader over `len` bytes of concatenated frames.
    ///
    /// Trailing bytes short of a whole frame are ignored.
    pub fn from_reader(reader: R, len: u64, looping: bool) -> PanelfeedResult<Self> {
        let frame_size = FRAME_SIZE as u64;
        let total_frames = len / frame_size;
        if total_frames == 0 {
            return Err(PanelfeedError::stream(format!(
                "dump holds {len} bytes, less than one {FRAME_SIZE}-byte frame"
            )));
        }
        let trailing = len % frame_size;
        if trailing != 0 {
            tracing::warn!(
                trailing_bytes = trailing,
                total_frames,
                "Dump ends with a partial frame; ignoring it"
            );
        }
        Ok(Self {
            reader,
            total_frames,
            index: 0,
            looping,
        })
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

#[async_trait::async_trait]
impl<R> FrameFeed for DumpFeed<R>
where
    R: AsyncRead + AsyncSeek + Unpin + Send,
{
    async fn next_frame(&mut self) -> PanelfeedResult<Option<PanelFrame>> {
        if self.index == self.total_frames {
            if !self.looping {
                return Ok(None);
            }
            tracing::debug!(total_frames = self.total_frames, "Rewinding dump");
            self.reader.seek(SeekFrom::Start(0)).await?;
            self.index = 0;
        }

        let mut data = vec![0u8; FRAME_SIZE];
        self.reader.read_exact(&mut data).await?;
        self.index += 1;

        PanelFrame::from_rgb(data)
            .map(Some)
            .ok_or_else(|| PanelfeedError::stream("dump frame has the wrong size"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelfeed_media_source::SyntheticSource;
    use panelfeed_panel_model::ColorParams;
    use std::io::Cursor;

    fn dump(frames: &[u8], extra: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &fill in frames {
            bytes.extend(std::iter::repeat(fill).take(FRAME_SIZE));
        }
        bytes.extend(std::iter::repeat(0xEE).take(extra));
        bytes
    }

    #[tokio::test]
    async fn test_dump_counts_whole_frames() {
        let bytes = dump(&[1, 2], 100);
        let len = bytes.len() as u64;
        let feed = DumpFeed::from_reader(Cursor::new(bytes), len, false).unwrap();
        assert_eq!(feed.total_frames(), 2);
    }

    #[tokio::test]
    async fn test_short_dump_is_rejected() {
        let bytes = dump(&[], 500);
        let len = bytes.len() as u64;
        assert!(DumpFeed::from_reader(Cursor::new(bytes), len, false).is_err());
        assert!(DumpFeed::from_reader(Cursor::new(Vec::new()), 0, false).is_err());
    }

    #[tokio::test]
    async fn test_dump_without_loop_ends() {
        let bytes = dump(&[7, 9], 0);
        let len = bytes.len() as u64;
        let mut feed = DumpFeed::from_reader(Cursor::new(bytes), len, false).unwrap();
        assert_eq!(feed.next_frame().await.unwrap().unwrap().as_bytes()[0], 7);
        assert_eq!(feed.next_frame().await.unwrap().unwrap().as_bytes()[0], 9);
        assert!(feed.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dump_loop_rewinds() {
        let bytes = dump(&[3, 4], 10);
        let len = bytes.len() as u64;
        let mut feed = DumpFeed::from_reader(Cursor::new(bytes), len, true).unwrap();
        let firsts: Vec<u8> = {
            let mut v = Vec::new();
            for _ in 0..5 {
                v.push(feed.next_frame().await.unwrap().unwrap().as_bytes()[0]);
            }
            v
        };
        assert_eq!(firsts, vec![3, 4, 3, 4, 3]);
    }

    #[tokio::test]
    async fn test_missing_dump_file() {
        let err = DumpFeed::open(Path::new("/no/such/dump.bin"), false)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PanelfeedError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_live_feed_starts_inside_trim_window() {
        let slot = SourceSlot::with_source(SyntheticSource::new(64, 64, 10.0, 30.0));
        let trim = TrimWindow::new(2.0, 4.0, 10.0);
        let mut feed =
            LiveFeed::acquire(&slot, ParamsHandle::fixed(ColorParams::default()), Some(trim), true)
                .unwrap();
        feed.start().await.unwrap();
        let frame = feed.next_frame().await.unwrap();
        assert!(frame.is_some());
        feed.finish().await;
        drop(feed);

        let lease = slot.try_acquire().unwrap();
        assert!(!lease.is_playing());
        assert!(lease.position_secs() >= 2.0 && lease.position_secs() < 4.0);
    }

    #[tokio::test]
    async fn test_live_feed_without_loop_stops_at_trim_end() {
        let slot = SourceSlot::with_source(SyntheticSource::new(16, 16, 10.0, 30.0));
        {
            let mut lease = slot.try_acquire().unwrap();
            lease.seek(5.0).await.unwrap();
        }
        let trim = TrimWindow::new(1.0, 5.0, 10.0);
        let mut feed =
            LiveFeed::acquire(&slot, ParamsHandle::fixed(ColorParams::default()), Some(trim), false)
                .unwrap();
        // Position 5.0 is outside [1, 5), so start rewinds to 1.0.
        feed.start().await.unwrap();
        assert!(feed.next_frame().await.unwrap().is_some());
        feed.lease.seek(5.0).await.unwrap();
        assert!(feed.next_frame().await.unwrap().is_none());
        assert!(!feed.lease.is_playing());
    }

    #[tokio::test]
    async fn test_live_feed_loops_back_at_trim_end() {
        let slot = SourceSlot::with_source(SyntheticSource::new(16, 16, 10.0, 30.0));
        let trim = TrimWindow::new(1.0, 2.0, 10.0);
        let mut feed =
            LiveFeed::acquire(&slot, ParamsHandle::fixed(ColorParams::default()), Some(trim), true)
                .unwrap();
        feed.start().await.unwrap();
        feed.lease.seek(2.0).await.unwrap();

        assert!(feed.next_frame().await.unwrap().is_some());
        assert!(feed.lease.is_playing());
        let position = feed.lease.position_secs();
        assert!((1.0..2.0).contains(&position), "position {position}");
    }
}

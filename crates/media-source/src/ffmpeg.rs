//! Video files decoded through the `ffmpeg`/`ffprobe` command line tools.
//!
//! Two decode paths share one source:
//! - while playing, a long-running `ffmpeg` process streams raw RGB frames
//!   sequentially and frames older than the playback clock are discarded;
//! - while paused (and after every seek), a one-shot `ffmpeg -ss <t>`
//!   decodes exactly the frame at the requested timestamp.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use panelfeed_common::{PanelfeedError, PanelfeedResult, PlaybackClock};
use panelfeed_panel_model::{PixelLayout, SourceFrame};
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

use crate::source::{check_seek_target, MediaSource};

/// How far ahead of the running decoder the clock may get before the
/// decoder is restarted at the clock position instead of read forward.
const MAX_DECODE_LAG_SECS: f64 = 1.0;

/// Stream properties reported by `ffprobe`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub frame_rate: f64,
}

impl MediaInfo {
    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * PixelLayout::Rgb8.bytes_per_pixel()
    }

    fn frame_period(&self) -> f64 {
        1.0 / self.frame_rate
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Whether `binary` is on `PATH`.
fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Whether both `ffmpeg` and `ffprobe` are installed.
pub fn ffmpeg_available() -> bool {
    command_exists("ffmpeg") && command_exists("ffprobe")
}

/// Read dimensions, duration and frame rate of the first video stream.
pub async fn probe(path: &Path) -> PanelfeedResult<MediaInfo> {
    if !path.exists() {
        return Err(PanelfeedError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,duration:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| PanelfeedError::decode(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PanelfeedError::decode(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(json: &[u8]) -> PanelfeedResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_slice(json)?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| PanelfeedError::decode("no video stream found"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(PanelfeedError::decode("video stream has no dimensions")),
    };

    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .or(stream.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| PanelfeedError::decode("video has no known duration"))?;

    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .unwrap_or(30.0);

    Ok(MediaInfo {
        width,
        height,
        duration_secs,
        frame_rate,
    })
}

/// Parse `"30000/1001"` or `"25"`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Running sequential decoder.
struct Decoder {
    // Held so the process is killed when the decoder is dropped.
    _child: Child,
    stdout: ChildStdout,
    /// Timestamp of the next frame the pipe will yield.
    next_pts: f64,
}

/// A video file played and sampled through ffmpeg.
pub struct FfmpegSource {
    path: PathBuf,
    name: String,
    info: MediaInfo,
    clock: PlaybackClock,
    decoder: Option<Decoder>,
    /// Last decoded frame and the position it was decoded for.
    cached: Option<(f64, SourceFrame)>,
}

impl FfmpegSource {
    /// Probe `path` and open it paused at position zero.
    pub async fn open(path: impl AsRef<Path>) -> PanelfeedResult<Self> {
        let path = path.as_ref().to_path_buf();
        let info = probe(&path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::info!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            duration_secs = info.duration_secs,
            frame_rate = info.frame_rate,
            "Opened video source"
        );

        Ok(Self {
            path,
            name,
            info,
            clock: PlaybackClock::new(),
            decoder: None,
            cached: None,
        })
    }

    pub fn info(&self) -> MediaInfo {
        self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ffmpeg_at(&self, secs: f64) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-nostdin", "-ss"])
            .arg(format!("{secs:.6}"))
            .arg("-i")
            .arg(&self.path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn wrap(&self, data: Vec<u8>) -> PanelfeedResult<SourceFrame> {
        SourceFrame::new(self.info.width, self.info.height, PixelLayout::Rgb8, data)
            .map_err(|e| PanelfeedError::decode(e.to_string()))
    }

    /// Decode exactly the frame at `secs` with a one-shot process.
    async fn decode_single(&self, secs: f64) -> PanelfeedResult<SourceFrame> {
        let mut cmd = self.ffmpeg_at(secs);
        cmd.args(["-frames:v", "1", "-"]);

        let output = cmd
            .output()
            .await
            .map_err(|e| PanelfeedError::seek(secs, format!("failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PanelfeedError::seek(secs, stderr.trim().to_string()));
        }
        if output.stdout.len() != self.info.frame_bytes() {
            return Err(PanelfeedError::seek(
                secs,
                format!(
                    "decoder returned {} bytes, expected {}",
                    output.stdout.len(),
                    self.info.frame_bytes()
                ),
            ));
        }

        self.wrap(output.stdout)
    }

    fn start_decoder(&mut self, secs: f64) -> PanelfeedResult<()> {
        let mut cmd = self.ffmpeg_at(secs);
        cmd.arg("-").stderr(Stdio::null());
        let mut child = cmd
            .spawn()
            .map_err(|e| PanelfeedError::decode(format!("failed to start ffmpeg: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PanelfeedError::decode("ffmpeg stdout not captured"))?;

        tracing::debug!(position_secs = secs, "Started sequential decoder");
        self.decoder = Some(Decoder {
            _child: child,
            stdout,
            next_pts: secs,
        });
        Ok(())
    }

    /// Read forward from the running decoder up to `target`.
    async fn decode_playing(&mut self, target: f64) -> PanelfeedResult<SourceFrame> {
        let period = self.info.frame_period();
        let restart = match &self.decoder {
            None => true,
            Some(d) => target + period < d.next_pts || target > d.next_pts + MAX_DECODE_LAG_SECS,
        };
        if restart {
            self.decoder = None;
            self.start_decoder(target)?;
        }

        let frame_bytes = self.info.frame_bytes();
        let mut latest: Option<Vec<u8>> = None;

        loop {
            let Some(decoder) = self.decoder.as_mut() else {
                break;
            };
            // After a restart at least one frame must be read.
            let have_frame = latest.is_some() || (!restart && self.cached.is_some());
            if decoder.next_pts > target && have_frame {
                break;
            }

            let mut buf = vec![0u8; frame_bytes];
            match decoder.stdout.read_exact(&mut buf).await {
                Ok(_) => {
                    decoder.next_pts += period;
                    latest = Some(buf);
                }
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    tracing::debug!(position_secs = target, "Sequential decoder reached end of stream");
                    self.decoder = None;
                    break;
                }
                Err(e) => {
                    self.decoder = None;
                    return Err(PanelfeedError::decode(format!("reading decoded frame: {e}")));
                }
            }
        }

        match latest {
            Some(data) => {
                let frame = self.wrap(data)?;
                self.cached = Some((target, frame.clone()));
                Ok(frame)
            }
            None => match &self.cached {
                Some((_, frame)) => Ok(frame.clone()),
                None => self.decode_single(target.min(self.last_frame_secs())).await,
            },
        }
    }

    fn last_frame_secs(&self) -> f64 {
        (self.info.duration_secs - self.info.frame_period()).max(0.0)
    }
}

#[async_trait::async_trait]
impl MediaSource for FfmpegSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn duration_secs(&self) -> f64 {
        self.info.duration_secs
    }

    fn position_secs(&self) -> f64 {
        self.clock.position_secs().min(self.info.duration_secs)
    }

    async fn seek(&mut self, secs: f64) -> PanelfeedResult<()> {
        check_seek_target(secs, self.info.duration_secs)?;

        // A seek completes once its frame is decoded; decode from the last
        // real frame when asked for the very end of the stream.
        let frame = self.decode_single(secs.min(self.last_frame_secs())).await?;
        self.decoder = None;
        self.cached = Some((secs, frame));
        self.clock.seek(secs);
        Ok(())
    }

    async fn current_frame(&mut self) -> PanelfeedResult<SourceFrame> {
        let position = self.position_secs();

        if self.clock.is_playing() {
            return self.decode_playing(position).await;
        }

        if let Some((at, frame)) = &self.cached {
            if (*at - position).abs() < f64::EPSILON {
                return Ok(frame.clone());
            }
        }

        let frame = self.decode_single(position.min(self.last_frame_secs())).await?;
        self.cached = Some((position, frame.clone()));
        Ok(frame)
    }

    fn play(&mut self) {
        self.clock.play();
    }

    fn pause(&mut self) {
        self.clock.pause();
        self.decoder = None;
    }

    fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }
}

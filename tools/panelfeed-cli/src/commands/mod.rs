//! Subcommands and the argument groups they share.

pub mod config;
pub mod export;
pub mod ports;
pub mod preview;
pub mod probe;
pub mod replay;
pub mod stream;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use panelfeed_common::{AppConfig, SerialConfig};
use panelfeed_media_source::{FfmpegSource, SourceSlot, SyntheticSource};
use panelfeed_panel_model::{ColorParams, TrimWindow};
use panelfeed_stream_engine::{open_file, open_serial, Transport};
use rand::Rng;

/// Where frames come from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Video file to load
    #[arg(required_unless_present = "test_pattern")]
    pub input: Option<PathBuf>,

    /// Use a generated test pattern instead of a video file
    #[arg(long, conflicts_with = "input")]
    pub test_pattern: bool,

    /// Test pattern length in seconds
    #[arg(long, default_value = "10.0")]
    pub pattern_secs: f64,
}

impl SourceArgs {
    /// Open the source and put it in a fresh slot.
    pub async fn load(&self) -> anyhow::Result<SourceSlot> {
        if self.test_pattern {
            let source = SyntheticSource::new(1280, 720, self.pattern_secs, 30.0)
                .with_name("test-pattern");
            return Ok(SourceSlot::with_source(source));
        }

        let path = self
            .input
            .as_deref()
            .context("no video file given (pass a path or --test-pattern)")?;
        let source = FfmpegSource::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let info = source.info();
        println!(
            "Loaded {} ({}x{}, {:.2}s @ {:.2} fps)",
            path.display(),
            info.width,
            info.height,
            info.duration_secs,
            info.frame_rate
        );
        Ok(SourceSlot::with_source(source))
    }
}

/// Tone and color parameters: an optional JSON file plus per-field overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct ColorArgs {
    /// JSON file with color parameters (missing fields use defaults)
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Start from random parameters (contrast and gains 0.5..1.5, offsets -50..50)
    #[arg(long, conflicts_with = "params")]
    pub randomize: bool,

    /// Contrast multiplier (1.0 = unchanged)
    #[arg(long, allow_negative_numbers = true)]
    pub contrast: Option<f64>,

    /// Brightness offset, -100..100
    #[arg(long, allow_negative_numbers = true)]
    pub brightness: Option<i32>,

    /// Shadows adjustment, -100..100
    #[arg(long, allow_negative_numbers = true)]
    pub shadows: Option<i32>,

    /// Midtones adjustment, -100..100
    #[arg(long, allow_negative_numbers = true)]
    pub midtones: Option<i32>,

    /// Highlights adjustment, -100..100
    #[arg(long, allow_negative_numbers = true)]
    pub highlights: Option<i32>,

    /// Red channel gain
    #[arg(long)]
    pub red_gain: Option<f64>,

    /// Green channel gain
    #[arg(long)]
    pub green_gain: Option<f64>,

    /// Blue channel gain
    #[arg(long)]
    pub blue_gain: Option<f64>,

    /// Horizontal crop offset, -100 (left) to 100 (right)
    #[arg(long, allow_negative_numbers = true)]
    pub x_offset: Option<i32>,
}

impl ColorArgs {
    /// Read the params file (or draw random parameters) and apply flag
    /// overrides on top.
    pub fn resolve(&self) -> anyhow::Result<ColorParams> {
        self.resolve_with(&mut rand::thread_rng())
    }

    fn resolve_with<R: Rng + ?Sized>(&self, rng: &mut R) -> anyhow::Result<ColorParams> {
        let base = match &self.params {
            Some(path) => read_params_file(path)?,
            None if self.randomize => {
                let params = ColorParams::randomized(rng);
                tracing::info!(?params, "Randomized color parameters");
                params
            }
            None => ColorParams::default(),
        };
        Ok(self.apply_overrides(base))
    }

    pub fn apply_overrides(&self, mut params: ColorParams) -> ColorParams {
        if let Some(v) = self.contrast {
            params.contrast = v;
        }
        if let Some(v) = self.brightness {
            params.brightness = v;
        }
        if let Some(v) = self.shadows {
            params.shadows = v;
        }
        if let Some(v) = self.midtones {
            params.midtones = v;
        }
        if let Some(v) = self.highlights {
            params.highlights = v;
        }
        if let Some(v) = self.red_gain {
            params.red_gain = v;
        }
        if let Some(v) = self.green_gain {
            params.green_gain = v;
        }
        if let Some(v) = self.blue_gain {
            params.blue_gain = v;
        }
        if let Some(v) = self.x_offset {
            params.x_offset = v;
        }
        params.sanitized()
    }
}

pub fn read_params_file(path: &Path) -> anyhow::Result<ColorParams> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read params file {}", path.display()))?;
    ColorParams::from_json(&json)
        .with_context(|| format!("Invalid params file {}", path.display()))
}

/// Trim window bounds in seconds.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct TrimArgs {
    /// Trim start in seconds (default: 0)
    #[arg(long)]
    pub trim_start: Option<f64>,

    /// Trim end in seconds (default: source duration)
    #[arg(long)]
    pub trim_end: Option<f64>,
}

impl TrimArgs {
    /// The clamped window for the slot's source, or `None` for the whole source.
    pub fn window(&self, slot: &SourceSlot) -> anyhow::Result<Option<TrimWindow>> {
        if self.trim_start.is_none() && self.trim_end.is_none() {
            return Ok(None);
        }
        let duration = slot.try_acquire()?.duration_secs();
        let window = TrimWindow::new(
            self.trim_start.unwrap_or(0.0),
            self.trim_end.unwrap_or(duration),
            duration,
        );
        Ok(Some(window))
    }
}

/// Where the byte stream goes.
#[derive(Args, Debug, Clone, Default)]
pub struct TransportArgs {
    /// Serial port (config: serial.port)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate (config: serial.baud_rate)
    #[arg(long)]
    pub baud: Option<u32>,

    /// Write the raw stream to a file or FIFO instead of a serial port
    #[arg(long, conflicts_with_all = ["port", "baud"])]
    pub output_file: Option<PathBuf>,
}

impl TransportArgs {
    pub fn serial_config(&self, config: &AppConfig) -> SerialConfig {
        let mut serial = config.serial.clone();
        if let Some(port) = &self.port {
            serial.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            serial.baud_rate = baud;
        }
        serial
    }

    pub async fn open(&self, config: &AppConfig) -> anyhow::Result<Box<dyn Transport>> {
        if let Some(path) = &self.output_file {
            let file = open_file(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            println!("  Output: {}", path.display());
            return Ok(Box::new(file));
        }

        let serial = self.serial_config(config);
        if serial.port.is_none() {
            anyhow::bail!(
                "No serial port configured. Pass --port or set serial.port \
                 (run `panelfeed ports` to list devices)"
            );
        }
        let port = open_serial(&serial).await?;
        println!(
            "  Port: {} @ {} baud",
            serial.port.as_deref().unwrap_or_default(),
            serial.baud_rate
        );
        Ok(Box::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"contrast": 1.5, "brightness": 20}"#).unwrap();

        let args = ColorArgs {
            params: Some(path),
            brightness: Some(-10),
            x_offset: Some(250),
            ..ColorArgs::default()
        };
        let params = args.resolve().unwrap();
        assert_eq!(params.contrast, 1.5);
        assert_eq!(params.brightness, -10);
        assert_eq!(params.x_offset, 100);
        assert_eq!(params.red_gain, 1.0);
    }

    #[test]
    fn test_missing_params_file_is_an_error() {
        let args = ColorArgs {
            params: Some(PathBuf::from("/nonexistent/params.json")),
            ..ColorArgs::default()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_randomize_draws_base_then_applies_overrides() {
        use rand::{rngs::StdRng, SeedableRng};

        let args = ColorArgs {
            randomize: true,
            contrast: Some(1.0),
            ..ColorArgs::default()
        };
        let params = args.resolve_with(&mut StdRng::seed_from_u64(7)).unwrap();
        let drawn = ColorParams::randomized(&mut StdRng::seed_from_u64(7));
        assert_eq!(params.contrast, 1.0);
        assert_eq!(params.brightness, drawn.brightness);
        assert_eq!(params.red_gain, drawn.red_gain);
        assert_eq!(params.x_offset, drawn.x_offset);
        assert!((-50..=50).contains(&params.x_offset));
    }

    #[test]
    fn test_no_trim_flags_means_whole_source() {
        let slot = SourceSlot::with_source(SyntheticSource::new(8, 8, 5.0, 30.0));
        assert!(TrimArgs::default().window(&slot).unwrap().is_none());

        let trim = TrimArgs {
            trim_start: Some(1.0),
            trim_end: None,
        }
        .window(&slot)
        .unwrap()
        .unwrap();
        assert_eq!((trim.start(), trim.end()), (1.0, 5.0));
    }

    #[test]
    fn test_port_flag_overrides_config() {
        let config = AppConfig::default();
        let args = TransportArgs {
            port: Some("/dev/ttyACM1".to_string()),
            baud: Some(115_200),
            output_file: None,
        };
        let serial = args.serial_config(&config);
        assert_eq!(serial.port.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(serial.baud_rate, 115_200);
        assert_eq!(serial.chunk_size, config.serial.chunk_size);
    }
}

//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PanelfeedError, PanelfeedResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial link to the panel controller.
    pub serial: SerialConfig,

    /// Live streaming defaults.
    pub stream: StreamDefaults,

    /// Batch export defaults.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Serial transport parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path (e.g. `/dev/ttyACM0`). `None` means "ask on the command line".
    pub port: Option<String>,

    /// Baud rate. USB CDC devices ignore it, but it must be accepted.
    pub baud_rate: u32,

    /// Bytes per transport write.
    pub chunk_size: usize,

    /// Pause between chunk writes, in milliseconds.
    pub chunk_delay_ms: u64,

    /// Delay after opening the port before the first write, in milliseconds.
    pub settle_ms: u64,
}

/// Default live streaming parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamDefaults {
    /// Target frame rate of the streaming loop.
    pub target_fps: u32,

    /// Rewind to the trim start when playback reaches the trim end.
    pub loop_playback: bool,
}

/// Default batch export parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Sampling rate of the exported frame dump.
    pub fps: u32,

    /// Directory where `.bin` artifacts are written.
    pub output_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "panelfeed=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 2_000_000,
            chunk_size: 1024,
            chunk_delay_ms: 1,
            settle_ms: 0,
        }
    }
}

impl Default for StreamDefaults {
    fn default() -> Self {
        Self {
            target_fps: 30,
            loop_playback: true,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Reject values the drivers cannot work with.
    pub fn validate(&self) -> PanelfeedResult<()> {
        if self.serial.baud_rate == 0 {
            return Err(PanelfeedError::config("serial.baud_rate must be positive"));
        }
        if self.serial.chunk_size == 0 {
            return Err(PanelfeedError::config("serial.chunk_size must be positive"));
        }
        if self.stream.target_fps == 0 {
            return Err(PanelfeedError::config("stream.target_fps must be positive"));
        }
        if self.export.fps == 0 {
            return Err(PanelfeedError::config("export.fps must be positive"));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("panelfeed").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_panel_link() {
        let config = AppConfig::default();
        assert_eq!(config.serial.baud_rate, 2_000_000);
        assert_eq!(config.serial.chunk_size, 1024);
        assert_eq!(config.stream.target_fps, 30);
        assert!(config.stream.loop_playback);
        assert_eq!(config.export.fps, 30);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"serial": {"port": "/dev/ttyACM0"}}"#).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.serial.baud_rate, 2_000_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.stream.loop_playback = false;
        config.serial.settle_ms = 2000;
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path), config);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_rates() {
        assert!(AppConfig::default().validate().is_ok());

        let mut config = AppConfig::default();
        config.stream.target_fps = 0;
        assert!(matches!(
            config.validate(),
            Err(PanelfeedError::Config { .. })
        ));

        let mut config = AppConfig::default();
        config.serial.chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
